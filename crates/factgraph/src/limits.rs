//! Declarative validators attached to writable facts.
//!
//! A limit pairs a check kind with a severity and a bound expression. Bounds
//! are full expressions over the graph, evaluated with the owning fact as
//! current; a bound that evaluates `Incomplete` cannot be checked and the
//! limit passes. Violations are data, never errors: they aggregate on `set`
//! and `save` instead of unwinding.

use std::cmp::Ordering;
use std::fmt;

use crate::error::FactGraphError;
use crate::expr::arith;
use crate::expr::Expr;
use crate::value::{cached_regex, Value};

// ──────────────────────────────────────────────
// Declarations
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        })
    }
}

/// The supported limit checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    /// Value within an inclusive lower bound (Int, Dollar, Rational, Day, Days).
    Min,
    /// Value within an inclusive upper bound.
    Max,
    /// String or collection length at least the bound.
    MinLength,
    /// String length at most the bound.
    MaxLength,
    /// Collection member count at most the bound.
    MaxCollectionSize,
    /// String matches the bound regex.
    Match,
}

impl LimitKind {
    pub fn name(self) -> &'static str {
        match self {
            LimitKind::Min => "Min",
            LimitKind::Max => "Max",
            LimitKind::MinLength => "MinLength",
            LimitKind::MaxLength => "MaxLength",
            LimitKind::MaxCollectionSize => "MaxCollectionSize",
            LimitKind::Match => "Match",
        }
    }
}

/// A declared limit on a writable fact.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitSpec {
    pub kind: LimitKind,
    pub severity: Severity,
    pub bound: Expr,
}

impl LimitSpec {
    pub fn new(kind: LimitKind, severity: Severity, bound: Expr) -> LimitSpec {
        LimitSpec {
            kind,
            severity,
            bound,
        }
    }

    /// Error-severity limit with a constant bound, the common declaration.
    pub fn errored(kind: LimitKind, bound: Value) -> LimitSpec {
        LimitSpec::new(kind, Severity::Error, Expr::Const(bound))
    }
}

/// One failed limit, reported from `set` and `save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitViolation {
    pub path: String,
    pub limit: String,
    pub severity: Severity,
    /// Rendered actual value.
    pub actual: String,
    /// Rendered bound value.
    pub bound: String,
    pub message: String,
}

impl fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.path, self.limit, self.message)
    }
}

// ──────────────────────────────────────────────
// Checks
// ──────────────────────────────────────────────

/// Evaluate one check against a concrete value and bound. `Ok(true)` means
/// the limit holds. A bound/value pairing the kind does not support is a
/// dictionary bug.
pub fn check(kind: LimitKind, actual: &Value, bound: &Value) -> Result<bool, FactGraphError> {
    let unsupported = || {
        Err(FactGraphError::dictionary(format!(
            "{} limit cannot compare {} against {}",
            kind.name(),
            actual.type_name(),
            bound.type_name()
        )))
    };
    match kind {
        LimitKind::Min | LimitKind::Max => match arith::compare(actual, bound) {
            Some(ord) => Ok(if kind == LimitKind::Min {
                ord != Ordering::Less
            } else {
                ord != Ordering::Greater
            }),
            None => unsupported(),
        },
        LimitKind::MinLength | LimitKind::MaxLength => {
            let len = match actual {
                Value::Str(s) => s.chars().count(),
                Value::Collection(c) if kind == LimitKind::MinLength => c.len(),
                _ => return unsupported(),
            };
            let bound = match bound {
                Value::Int(i) if *i >= 0 => *i as usize,
                _ => return unsupported(),
            };
            Ok(if kind == LimitKind::MinLength {
                len >= bound
            } else {
                len <= bound
            })
        }
        LimitKind::MaxCollectionSize => match (actual, bound) {
            (Value::Collection(c), Value::Int(max)) if *max >= 0 => Ok(c.len() <= *max as usize),
            _ => unsupported(),
        },
        LimitKind::Match => match (actual, bound) {
            (Value::Str(s), Value::Str(pattern)) => {
                let re = cached_regex(pattern)?;
                Ok(re.is_match(s))
            }
            _ => unsupported(),
        },
    }
}

/// Build the violation record for a failed check.
pub fn violation(
    path: &str,
    spec: &LimitSpec,
    actual: &Value,
    bound: &Value,
) -> LimitViolation {
    LimitViolation {
        path: path.to_string(),
        limit: spec.kind.name().to_string(),
        severity: spec.severity,
        actual: actual.to_string(),
        bound: bound.to_string(),
        message: format!(
            "{} violates {} {}",
            actual,
            spec.kind.name(),
            bound
        ),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Collection, Day, Dollar};

    #[test]
    fn min_max_are_inclusive() {
        assert!(check(LimitKind::Min, &Value::Int(0), &Value::Int(0)).unwrap());
        assert!(!check(LimitKind::Min, &Value::Int(-1), &Value::Int(0)).unwrap());
        assert!(check(LimitKind::Max, &Value::Int(150), &Value::Int(150)).unwrap());
        assert!(!check(LimitKind::Max, &Value::Int(200), &Value::Int(150)).unwrap());
    }

    #[test]
    fn min_max_cover_ordered_types() {
        let d = |c| Value::Dollar(Dollar::from_cents(c));
        assert!(check(LimitKind::Max, &d(100), &d(200)).unwrap());
        let day = |s: &str| Value::Day(Day::parse(s).unwrap());
        assert!(check(LimitKind::Min, &day("2024-06-01"), &day("2024-01-01")).unwrap());
        // Int bound against Dollar actual promotes.
        assert!(check(LimitKind::Max, &d(15_000), &Value::Int(200)).unwrap());
    }

    #[test]
    fn length_checks() {
        assert!(check(LimitKind::MinLength, &Value::Str("ab".into()), &Value::Int(2)).unwrap());
        assert!(!check(LimitKind::MaxLength, &Value::Str("abc".into()), &Value::Int(2)).unwrap());
        let c = Value::Collection(Collection::from_members(vec!["a".into()]).unwrap());
        assert!(check(LimitKind::MinLength, &c, &Value::Int(1)).unwrap());
        assert!(check(LimitKind::MaxCollectionSize, &c, &Value::Int(3)).unwrap());
    }

    #[test]
    fn match_uses_regex() {
        let v = Value::Str("AB-12".into());
        assert!(check(LimitKind::Match, &v, &Value::Str(r"^[A-Z]{2}-\d{2}$".into())).unwrap());
        assert!(!check(LimitKind::Match, &v, &Value::Str(r"^\d+$".into())).unwrap());
    }

    #[test]
    fn unsupported_pairings_are_dictionary_bugs() {
        assert!(check(LimitKind::Min, &Value::Bool(true), &Value::Int(0)).is_err());
        assert!(check(LimitKind::Match, &Value::Int(1), &Value::Str(".*".into())).is_err());
    }
}
