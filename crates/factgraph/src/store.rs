//! The writable value store: per-user persisted fact values.
//!
//! Keys are canonical concrete path strings. The store round-trips through
//! `{"facts": {"<path>": <tagged-value>, ...}, "migrations": n}` and is the
//! only part of graph state that outlives a process.

use std::collections::BTreeMap;

use serde_json::json;

use crate::dictionary::Dictionary;
use crate::error::FactGraphError;
use crate::migration::MigrationRegistry;
use crate::path::Path;
use crate::value::Value;

/// Persisted writable fact values plus the migration watermark.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    facts: BTreeMap<String, Value>,
    migrations_applied: usize,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    pub fn get(&self, path: &Path) -> Option<&Value> {
        self.facts.get(&path.to_string())
    }

    /// Unconditionally replace; inserts on first write.
    pub fn put(&mut self, path: &Path, value: Value) {
        self.facts.insert(path.to_string(), value);
    }

    /// Remove a single entry; `false` when absent.
    pub fn delete(&mut self, path: &Path) -> bool {
        self.facts.remove(&path.to_string()).is_some()
    }

    /// Remove the entry at `prefix` and every entry beneath it.
    pub fn delete_subtree(&mut self, prefix: &Path) -> usize {
        let before = self.facts.len();
        self.facts
            .retain(|key, _| !Path::parse(key).map(|p| p.starts_with(prefix)).unwrap_or(false));
        before - self.facts.len()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn clear(&mut self) {
        self.facts.clear();
    }

    /// Iterate stored `(path, value)` pairs in path order.
    pub fn enumerate_writables(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.facts.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn migrations_applied(&self) -> usize {
        self.migrations_applied
    }

    /// Drop entries whose abstract paths are no longer defined as writable
    /// facts in `dictionary`. Returns the dropped keys.
    pub fn sync_with_dictionary(&mut self, dictionary: &Dictionary) -> Vec<String> {
        let mut dropped = Vec::new();
        self.facts.retain(|key, _| {
            let keep = Path::parse(key)
                .ok()
                .map(|p| dictionary.writable_spec(&p.to_abstract()).is_some())
                .unwrap_or(false);
            if !keep {
                dropped.push(key.clone());
            }
            keep
        });
        dropped
    }

    // ── JSON round-trip ──

    pub fn to_json_value(&self) -> serde_json::Value {
        let facts: serde_json::Map<String, serde_json::Value> = self
            .facts
            .iter()
            .map(|(k, v)| (k.clone(), v.to_tagged_json()))
            .collect();
        json!({ "facts": facts, "migrations": self.migrations_applied })
    }

    pub fn to_json(&self, indent: bool) -> String {
        let v = self.to_json_value();
        if indent {
            serde_json::to_string_pretty(&v).unwrap_or_else(|_| v.to_string())
        } else {
            v.to_string()
        }
    }

    /// Parse a persisted blob as-is, without running migrations.
    pub fn from_json(raw: &str) -> Result<Store, FactGraphError> {
        let v: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| FactGraphError::parse(format!("bad store JSON: {}", e)))?;
        Store::from_json_value(&v)
    }

    pub fn from_json_value(v: &serde_json::Value) -> Result<Store, FactGraphError> {
        let migrations_applied = v
            .get("migrations")
            .and_then(|m| m.as_u64())
            .unwrap_or(0) as usize;
        let facts_obj = v
            .get("facts")
            .and_then(|f| f.as_object())
            .ok_or_else(|| FactGraphError::parse("store JSON missing 'facts' object"))?;
        let mut facts = BTreeMap::new();
        for (key, tagged) in facts_obj {
            let path = Path::parse(key)?;
            if path.is_abstract() || !path.is_absolute() {
                return Err(FactGraphError::parse(format!(
                    "store key '{}' is not a concrete absolute path",
                    key
                )));
            }
            let value = Value::from_tagged_json(tagged)?;
            value.revalidate()?;
            facts.insert(path.to_string(), value);
        }
        Ok(Store {
            facts,
            migrations_applied,
        })
    }

    /// Load protocol: parse the blob, apply pending migrations to the raw
    /// facts map, advance the watermark to the registry total, then parse the
    /// migrated values.
    pub fn from_json_with_migrations(
        raw: &str,
        registry: &MigrationRegistry,
    ) -> Result<Store, FactGraphError> {
        let mut v: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| FactGraphError::parse(format!("bad store JSON: {}", e)))?;
        let applied = v
            .get("migrations")
            .and_then(|m| m.as_u64())
            .unwrap_or(0) as usize;
        let facts = v
            .get_mut("facts")
            .and_then(|f| f.as_object_mut())
            .ok_or_else(|| FactGraphError::parse("store JSON missing 'facts' object"))?;
        let total = registry.run_pending(facts, applied)?;
        let mut store = Store::from_json_value(&json!({
            "facts": v["facts"],
            "migrations": total,
        }))?;
        store.migrations_applied = total;
        Ok(store)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
