//! Seed Vault - owns every seed of a session
//!
//! Ids are minted from a counter that only ever moves forward, including
//! across a serialize/restore cycle. Seeds live in one of two mappings:
//! `live` for active seeds and `buried` for seeds that were archived with
//! [`SeedVault::bury`].

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    carbon_cost, format_id, id_suffix, Seed, SeedGenerator, BOOTSTRAP_PHRASE, ROOT_PARENT,
    ROOT_SEED_ID,
};

/// Planter recorded on the root seed of a vault created without an actor
const DEFAULT_ROOT_PLANTER: &str = "init";

/// Planter recorded when a stored record has none
const UNKNOWN_PLANTER: &str = "unknown";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    #[error("no live seed with id {0}")]
    UnknownSeed(String),
    #[error("seed {0} is already buried")]
    AlreadyBuried(String),
    #[error("seed id counter exhausted at {0}")]
    CounterExhausted(u64),
    #[error("seed id {0} is already taken")]
    IdTaken(String),
}

/// Persisted layout of a vault
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub live: BTreeMap<String, Seed>,
    pub buried: BTreeMap<String, Seed>,
    pub counter: u64,
}

/// A stored seed record where every field may be missing
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SeedRecord {
    id: Option<String>,
    content: Option<String>,
    parent: Option<String>,
    planter: Option<String>,
    carbon: Option<f64>,
    stamp: Option<String>,
    buried: Option<bool>,
    burial_reason: Option<String>,
}

/// Collection of seeds with monotonic id assignment and lineage
#[derive(Debug, Clone, PartialEq)]
pub struct SeedVault {
    live: BTreeMap<String, Seed>,
    buried: BTreeMap<String, Seed>,
    counter: u64,
}

impl Default for SeedVault {
    fn default() -> Self {
        Self::new()
    }
}

impl SeedVault {
    /// Fresh vault holding only the bootstrap root seed
    pub fn new() -> Self {
        Self::bootstrap(DEFAULT_ROOT_PLANTER)
    }

    /// Fresh vault whose root seed is planted by `planter`
    pub fn bootstrap(planter: &str) -> Self {
        let content = SeedGenerator::transform(BOOTSTRAP_PHRASE);
        let root = Seed::new(ROOT_SEED_ID.to_string(), content, ROOT_PARENT, planter);

        let mut live = BTreeMap::new();
        live.insert(root.id.clone(), root);

        Self {
            live,
            buried: BTreeMap::new(),
            counter: 1,
        }
    }

    fn empty() -> Self {
        Self {
            live: BTreeMap::new(),
            buried: BTreeMap::new(),
            counter: 1,
        }
    }

    /// Mint a seed from `phrase` under `parent`.
    ///
    /// Fails instead of reusing an id when the counter cannot advance or the
    /// next id is already held by a live or buried seed.
    pub fn new_seed(&mut self, phrase: &str, parent: &str, planter: &str) -> Result<&Seed, VaultError> {
        self.new_seed_with(phrase, parent, planter, &mut rand::rng())
    }

    /// Same as [`new_seed`](Self::new_seed) with a caller-supplied RNG
    pub fn new_seed_with<R: Rng + ?Sized>(
        &mut self,
        phrase: &str,
        parent: &str,
        planter: &str,
        rng: &mut R,
    ) -> Result<&Seed, VaultError> {
        if parent != ROOT_PARENT && !self.is_known(parent) {
            warn!("Planting seed under unknown parent {}", parent);
        }

        let next = self
            .counter
            .checked_add(1)
            .ok_or(VaultError::CounterExhausted(self.counter))?;
        let id = format_id(next);
        if self.buried.contains_key(&id) {
            return Err(VaultError::IdTaken(id));
        }
        let slot = match self.live.entry(id) {
            Entry::Vacant(slot) => slot,
            Entry::Occupied(taken) => return Err(VaultError::IdTaken(taken.key().clone())),
        };

        self.counter = next;
        let content = SeedGenerator::transform_with(phrase, rng);
        let seed = Seed::new(slot.key().clone(), content, parent, planter);

        info!("Planted {} (parent {}, planter {})", seed.id, parent, planter);
        Ok(&*slot.insert(seed))
    }

    /// Up to `n` live seeds, newest first; equal stamps ordered by id
    pub fn recent(&self, n: usize) -> Vec<&Seed> {
        let mut seeds: Vec<&Seed> = self.live.values().collect();
        seeds.sort_by_key(|s| (Reverse(s.stamp), id_suffix(&s.id), s.id.clone()));
        seeds.truncate(n);
        seeds
    }

    /// Archive a live seed: flag it and move it to the buried mapping
    pub fn bury(&mut self, id: &str, reason: &str) -> Result<&Seed, VaultError> {
        if self.buried.contains_key(id) {
            return Err(VaultError::AlreadyBuried(id.to_string()));
        }

        let mut seed = self
            .live
            .remove(id)
            .ok_or_else(|| VaultError::UnknownSeed(id.to_string()))?;
        seed.bury(reason);

        info!("Buried {}: {}", id, reason);
        Ok(&*self.buried.entry(id.to_string()).or_insert(seed))
    }

    /// Look a seed up in either mapping
    pub fn get(&self, id: &str) -> Option<&Seed> {
        self.live.get(id).or_else(|| self.buried.get(id))
    }

    /// Whether `id` was minted by this vault and is still on record
    pub fn is_known(&self, id: &str) -> bool {
        self.live.contains_key(id) || self.buried.contains_key(id)
    }

    /// The seed followed by its ancestors, ending below the root sentinel.
    ///
    /// Stops early at an unknown parent or a cycle.
    pub fn lineage(&self, id: &str) -> Vec<&Seed> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.get(id);

        while let Some(seed) = cursor {
            if !seen.insert(seed.id.as_str()) {
                warn!("Lineage cycle detected at {}", seed.id);
                break;
            }
            chain.push(seed);
            if seed.is_root() {
                break;
            }
            cursor = self.get(&seed.parent);
        }

        chain
    }

    /// Seeds (live or buried) whose parent is `id`, in mint order
    pub fn children(&self, id: &str) -> Vec<&Seed> {
        let mut kids: Vec<&Seed> = self
            .live
            .values()
            .chain(self.buried.values())
            .filter(|s| s.parent == id)
            .collect();
        kids.sort_by_key(|s| (id_suffix(&s.id), s.id.clone()));
        kids
    }

    pub fn live(&self) -> &BTreeMap<String, Seed> {
        &self.live
    }

    pub fn buried(&self) -> &BTreeMap<String, Seed> {
        &self.buried
    }

    /// Highest counter value handed out so far
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Number of live seeds
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Copy of the persisted state
    pub fn snapshot(&self) -> VaultSnapshot {
        VaultSnapshot {
            live: self.live.clone(),
            buried: self.buried.clone(),
            counter: self.counter,
        }
    }

    /// Serialize to the persisted layout
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self.snapshot())
    }

    /// Rebuild a vault from the persisted layout.
    ///
    /// Missing sections and fields are defaulted rather than rejected, and the
    /// counter never ends up below the highest id suffix present.
    pub fn from_json(data: &Value) -> Self {
        if !data.is_object() {
            warn!("Vault snapshot is not an object, starting empty");
        }

        let mut vault = Self::empty();
        vault.load_bucket(data.get("live"), false);
        vault.load_bucket(data.get("buried"), true);

        let stored = match data.get("counter") {
            Some(value) => value.as_u64().unwrap_or_else(|| {
                warn!("Ignoring invalid vault counter {}", value);
                1
            }),
            None => 1,
        };
        let observed = vault
            .live
            .keys()
            .chain(vault.buried.keys())
            .filter_map(|id| id_suffix(id))
            .max()
            .unwrap_or(0);
        if observed > stored {
            warn!("Vault counter {} behind minted ids, raising to {}", stored, observed);
        }
        vault.counter = stored.max(observed).max(1);

        debug!(
            "Restored vault: {} live, {} buried, counter {}",
            vault.live.len(),
            vault.buried.len(),
            vault.counter
        );
        vault
    }

    fn load_bucket(&mut self, bucket: Option<&Value>, in_buried: bool) {
        let Some(bucket) = bucket else { return };
        let Some(entries) = bucket.as_object() else {
            warn!("Ignoring vault section that is not an object");
            return;
        };

        for (key, value) in entries {
            let record: SeedRecord = match serde_json::from_value(value.clone()) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping malformed seed record {}: {}", key, e);
                    continue;
                }
            };

            let seed = seed_from_record(key, record, in_buried);
            if seed.buried {
                self.buried.insert(key.clone(), seed);
            } else {
                self.live.insert(key.clone(), seed);
            }
        }
    }
}

fn seed_from_record(key: &str, record: SeedRecord, in_buried: bool) -> Seed {
    if let Some(id) = record.id.as_deref() {
        if id != key {
            warn!("Seed record id {} does not match key {}, using key", id, key);
        }
    }

    let content = record.content.unwrap_or_default();
    let carbon = record.carbon.unwrap_or_else(|| carbon_cost(&content));
    let stamp = record
        .stamp
        .as_deref()
        .and_then(parse_stamp)
        .unwrap_or(DateTime::UNIX_EPOCH);

    // A flagged seed belongs in the buried mapping whichever section it came from
    let buried = in_buried || record.buried.unwrap_or(false);

    Seed {
        id: key.to_string(),
        content,
        parent: record.parent.unwrap_or_else(|| ROOT_PARENT.to_string()),
        planter: record.planter.unwrap_or_else(|| UNKNOWN_PLANTER.to_string()),
        carbon,
        stamp,
        buried,
        burial_reason: record.burial_reason,
    }
}

/// RFC 3339, or the `YYYY-MM-DD HH:MM:SS[.f]+00:00` form older snapshots used
fn parse_stamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.with_timezone(&Utc));
    }
    if let Ok(stamp) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(stamp.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    warn!("Unparseable seed stamp {:?}", raw);
    None
}
