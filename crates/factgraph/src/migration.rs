//! Linear, monotonic migrations over persisted store JSON.
//!
//! A migration is a pure transform of the raw `facts` map, tagged with a
//! strictly increasing ordinal. The registry is append-only: migrations are
//! never reordered or deleted, and ordinals are contiguous from 1. A blob
//! persisted at watermark `k` replays migrations `k+1..=TOTAL` on load.

use crate::error::FactGraphError;

type FactsMap = serde_json::Map<String, serde_json::Value>;

/// One step of the pipeline.
pub struct Migration {
    pub ordinal: usize,
    pub name: &'static str,
    pub apply: fn(&mut FactsMap),
}

/// The ordered, validated migration list.
#[derive(Default)]
pub struct MigrationRegistry {
    migrations: Vec<Migration>,
}

impl MigrationRegistry {
    /// An empty registry: every blob loads unchanged at watermark 0.
    pub fn empty() -> MigrationRegistry {
        MigrationRegistry::default()
    }

    /// Validate contiguity: ordinals must run 1, 2, ... without gaps.
    pub fn new(migrations: Vec<Migration>) -> Result<MigrationRegistry, FactGraphError> {
        for (i, m) in migrations.iter().enumerate() {
            if m.ordinal != i + 1 {
                return Err(FactGraphError::dictionary(format!(
                    "migration '{}' has ordinal {}, expected {}",
                    m.name,
                    m.ordinal,
                    i + 1
                )));
            }
        }
        Ok(MigrationRegistry { migrations })
    }

    pub fn total(&self) -> usize {
        self.migrations.len()
    }

    /// Apply migrations `applied+1..=TOTAL` in order. Returns the new
    /// watermark (always `TOTAL`). A watermark beyond the registry means the
    /// blob was written by a newer build and is refused.
    pub fn run_pending(
        &self,
        facts: &mut FactsMap,
        applied: usize,
    ) -> Result<usize, FactGraphError> {
        let total = self.total();
        if applied > total {
            return Err(FactGraphError::parse(format!(
                "store migrated to {} but registry only knows {}",
                applied, total
            )));
        }
        for m in &self.migrations[applied..] {
            (m.apply)(facts);
        }
        Ok(total)
    }
}

/// Rename a stored path, preserving the value. A no-op when the old key is
/// absent; an existing value at the new key is left alone.
pub fn rename_path(facts: &mut FactsMap, from: &str, to: &str) {
    if let Some(v) = facts.remove(from) {
        facts.entry(to.to_string()).or_insert(v);
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn m1(facts: &mut FactsMap) {
        rename_path(facts, "/old", "/new");
    }

    fn m2(facts: &mut FactsMap) {
        facts.remove("/obsolete");
    }

    fn registry() -> MigrationRegistry {
        MigrationRegistry::new(vec![
            Migration {
                ordinal: 1,
                name: "rename-old-to-new",
                apply: m1,
            },
            Migration {
                ordinal: 2,
                name: "drop-obsolete",
                apply: m2,
            },
        ])
        .unwrap()
    }

    #[test]
    fn rejects_non_contiguous_ordinals() {
        let bad = MigrationRegistry::new(vec![Migration {
            ordinal: 2,
            name: "skipped-one",
            apply: m1,
        }]);
        assert!(bad.is_err());
    }

    #[test]
    fn runs_only_pending_migrations() {
        let reg = registry();
        let mut facts = json!({
            "/old": {"$type": "Int", "item": 1},
            "/obsolete": {"$type": "Int", "item": 2},
        })
        .as_object()
        .unwrap()
        .clone();
        let total = reg.run_pending(&mut facts, 0).unwrap();
        assert_eq!(total, 2);
        assert!(facts.contains_key("/new"));
        assert!(!facts.contains_key("/old"));
        assert!(!facts.contains_key("/obsolete"));
    }

    #[test]
    fn watermark_skips_already_applied() {
        let reg = registry();
        // At watermark 1, only m2 runs: /old stays put.
        let mut facts = json!({
            "/old": {"$type": "Int", "item": 1},
            "/obsolete": {"$type": "Int", "item": 2},
        })
        .as_object()
        .unwrap()
        .clone();
        reg.run_pending(&mut facts, 1).unwrap();
        assert!(facts.contains_key("/old"));
        assert!(!facts.contains_key("/obsolete"));
    }

    #[test]
    fn split_application_equals_direct() {
        let reg = registry();
        let original = json!({
            "/old": {"$type": "Int", "item": 1},
            "/obsolete": {"$type": "Int", "item": 2},
        })
        .as_object()
        .unwrap()
        .clone();

        let mut direct = original.clone();
        reg.run_pending(&mut direct, 0).unwrap();

        // Apply 1..=1, then resume from watermark 1.
        let partial_reg = MigrationRegistry::new(vec![Migration {
            ordinal: 1,
            name: "rename-old-to-new",
            apply: m1,
        }])
        .unwrap();
        let mut staged = original;
        partial_reg.run_pending(&mut staged, 0).unwrap();
        reg.run_pending(&mut staged, 1).unwrap();

        assert_eq!(direct, staged);
    }

    #[test]
    fn future_watermark_refused() {
        let reg = registry();
        let mut facts = FactsMap::new();
        assert!(reg.run_pending(&mut facts, 5).is_err());
    }
}
