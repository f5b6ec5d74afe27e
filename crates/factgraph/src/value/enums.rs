//! Enum values bound to an option-set path.
//!
//! An enum value remembers where its option set is defined so that equality
//! and the intrinsic membership limit can distinguish `"yes"` drawn from one
//! question from `"yes"` drawn from another.

use std::fmt;

use crate::error::FactGraphError;

/// A single choice from a declared option set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    options_path: String,
    value: String,
}

impl EnumValue {
    pub fn new(
        options_path: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<EnumValue, FactGraphError> {
        let (options_path, value) = (options_path.into(), value.into());
        if options_path.is_empty() {
            return Err(FactGraphError::invalid("Enum", "empty options path"));
        }
        if value.is_empty() {
            return Err(FactGraphError::invalid("Enum", "empty value"));
        }
        Ok(EnumValue {
            options_path,
            value,
        })
    }

    pub fn options_path(&self) -> &str {
        &self.options_path
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// A set of choices from a declared option set.
///
/// Equality is order-insensitive: the same selections in a different order
/// compare equal.
#[derive(Debug, Clone, Eq)]
pub struct MultiEnumValue {
    options_path: String,
    values: Vec<String>,
}

impl MultiEnumValue {
    pub fn new(
        options_path: impl Into<String>,
        values: Vec<String>,
    ) -> Result<MultiEnumValue, FactGraphError> {
        let options_path = options_path.into();
        if options_path.is_empty() {
            return Err(FactGraphError::invalid("MultiEnum", "empty options path"));
        }
        let mut seen: Vec<&str> = Vec::with_capacity(values.len());
        for v in &values {
            if v.is_empty() {
                return Err(FactGraphError::invalid("MultiEnum", "empty value"));
            }
            if seen.contains(&v.as_str()) {
                return Err(FactGraphError::invalid(
                    "MultiEnum",
                    format!("duplicate value {}", v),
                ));
            }
            seen.push(v);
        }
        Ok(MultiEnumValue {
            options_path,
            values,
        })
    }

    pub fn options_path(&self) -> &str {
        &self.options_path
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

impl PartialEq for MultiEnumValue {
    fn eq(&self, other: &Self) -> bool {
        if self.options_path != other.options_path || self.values.len() != other.values.len() {
            return false;
        }
        self.values.iter().all(|v| other.values.contains(v))
    }
}

impl fmt::Display for MultiEnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.values.join(", "))
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_equality_requires_same_option_set() {
        let a = EnumValue::new("/opts/filing", "single").unwrap();
        let b = EnumValue::new("/opts/filing", "single").unwrap();
        let c = EnumValue::new("/opts/other", "single").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn multi_enum_equality_ignores_order() {
        let a = MultiEnumValue::new("/opts", vec!["x".into(), "y".into()]).unwrap();
        let b = MultiEnumValue::new("/opts", vec!["y".into(), "x".into()]).unwrap();
        let c = MultiEnumValue::new("/opts", vec!["x".into()]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn multi_enum_rejects_duplicates() {
        assert!(MultiEnumValue::new("/opts", vec!["x".into(), "x".into()]).is_err());
    }
}
