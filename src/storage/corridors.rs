//! Corridor Data Store
//!
//! Read-only cache of precomputed corridor requirements, keyed by the
//! normalized `origin-destination` string. The built-in set is embedded at
//! compile time; an extra file from configuration is merged over it.

use std::collections::HashMap;
use std::path::Path;

use crate::models::corridor::{corridor_key, CorridorRecord};
use crate::utils::error::{AppError, AppResult};

const BUILTIN_CORRIDORS: &str = include_str!("../../data/corridors.json");

/// In-memory corridor lookup table
#[derive(Debug, Clone, Default)]
pub struct CorridorStore {
    entries: HashMap<String, CorridorRecord>,
}

impl CorridorStore {
    /// Empty store (every lookup misses)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Store with the embedded corridor set
    pub fn builtin() -> AppResult<Self> {
        Self::from_json(BUILTIN_CORRIDORS)
    }

    /// Parse a JSON object of `key → record`. Keys are re-normalized.
    pub fn from_json(json: &str) -> AppResult<Self> {
        let raw: HashMap<String, CorridorRecord> = serde_json::from_str(json)?;
        let mut store = Self::default();
        for (key, record) in raw {
            store.insert_raw(&key, record);
        }
        Ok(store)
    }

    /// Merge records from a file, replacing existing keys
    pub fn merge_file(&mut self, path: &Path) -> AppResult<usize> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("cannot read corridor file {}: {}", path.display(), e))
        })?;
        let extra = Self::from_json(&content)?;
        let added = extra.entries.len();
        self.entries.extend(extra.entries);
        tracing::info!(
            "[Corridors] merged {} corridors from {}",
            added,
            path.display()
        );
        Ok(added)
    }

    fn insert_raw(&mut self, key: &str, record: CorridorRecord) {
        let normalized = match key.split_once('-') {
            Some((origin, destination)) => corridor_key(origin, destination),
            None => key.trim().to_lowercase(),
        };
        self.entries.insert(normalized, record);
    }

    /// Insert a record for an origin/destination pair
    pub fn insert(&mut self, origin: &str, destination: &str, record: CorridorRecord) {
        self.entries.insert(corridor_key(origin, destination), record);
    }

    /// Get a record by normalized key
    pub fn get(&self, key: &str) -> Option<&CorridorRecord> {
        self.entries.get(key)
    }

    /// Find the first passport with stored data for the destination
    pub fn lookup(
        &self,
        passports: &[String],
        destination: &str,
    ) -> Option<(String, &CorridorRecord)> {
        passports.iter().find_map(|passport| {
            let key = corridor_key(passport, destination);
            self.entries.get(&key).map(|record| (key, record))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
