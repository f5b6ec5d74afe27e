//! Collection membership values.

use std::fmt;

use crate::error::FactGraphError;

/// An ordered list of collection member identifiers.
///
/// Member ids are caller-chosen opaque strings (UUIDs at the boundary,
/// readable ids in tests). Insertion order is preserved; duplicates are
/// rejected on add.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Collection {
    members: Vec<String>,
}

impl Collection {
    pub fn new() -> Collection {
        Collection::default()
    }

    pub fn from_members(members: Vec<String>) -> Result<Collection, FactGraphError> {
        let mut c = Collection::new();
        for m in members {
            c.add(m)?;
        }
        Ok(c)
    }

    pub fn add(&mut self, id: impl Into<String>) -> Result<(), FactGraphError> {
        let id = id.into();
        if id.is_empty() {
            return Err(FactGraphError::invalid("Collection", "empty member id"));
        }
        if self.members.iter().any(|m| m == &id) {
            return Err(FactGraphError::invalid(
                "Collection",
                format!("duplicate member id {}", id),
            ));
        }
        self.members.push(id);
        Ok(())
    }

    /// Remove a member; `false` when absent.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.members.iter().position(|m| m == id) {
            Some(idx) => {
                self.members.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m == id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.members.get(index).map(String::as_str)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.members.join(", "))
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let c = Collection::from_members(vec!["b".into(), "a".into(), "c".into()]).unwrap();
        assert_eq!(c.members(), &["b", "a", "c"]);
    }

    #[test]
    fn rejects_duplicates_and_empty_ids() {
        let mut c = Collection::new();
        c.add("a").unwrap();
        assert!(c.add("a").is_err());
        assert!(c.add("").is_err());
    }

    #[test]
    fn remove_reports_presence() {
        let mut c = Collection::from_members(vec!["a".into(), "b".into()]).unwrap();
        assert!(c.remove("a"));
        assert!(!c.remove("a"));
        assert_eq!(c.members(), &["b"]);
    }
}
