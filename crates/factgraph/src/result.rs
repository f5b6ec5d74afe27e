//! Three-state completeness and single/multi result packaging.
//!
//! Every fact evaluation produces a `MaybeVector<FactResult<T>>`: one result
//! per concrete fact, or one per collection member when a wildcard path is
//! involved. Completeness propagates pessimistically -- an `Incomplete` input
//! poisons the output, a `Placeholder` input demotes it.

use crate::error::FactGraphError;

// ──────────────────────────────────────────────
// FactResult
// ──────────────────────────────────────────────

/// Completeness-tagged evaluation result.
///
/// `Complete` is definitive. `Placeholder` carries a usable value but signals
/// that some input is still missing (a default was substituted somewhere).
/// `Incomplete` has no value at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactResult<T> {
    Complete(T),
    Placeholder(T),
    Incomplete,
}

impl<T> FactResult<T> {
    pub fn has_value(&self) -> bool {
        !matches!(self, FactResult::Incomplete)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, FactResult::Complete(_))
    }

    /// The carried value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            FactResult::Complete(v) | FactResult::Placeholder(v) => Some(v),
            FactResult::Incomplete => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            FactResult::Complete(v) | FactResult::Placeholder(v) => Some(v),
            FactResult::Incomplete => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FactResult<U> {
        match self {
            FactResult::Complete(v) => FactResult::Complete(f(v)),
            FactResult::Placeholder(v) => FactResult::Placeholder(f(v)),
            FactResult::Incomplete => FactResult::Incomplete,
        }
    }

    /// Chain a fallible step. The completeness of the output is the weaker of
    /// this result's completeness and the step's.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> FactResult<U>) -> FactResult<U> {
        match self {
            FactResult::Complete(v) => f(v),
            FactResult::Placeholder(v) => f(v).demote_to_placeholder(),
            FactResult::Incomplete => FactResult::Incomplete,
        }
    }

    /// `Complete -> Placeholder`; other states unchanged.
    pub fn demote_to_placeholder(self) -> FactResult<T> {
        match self {
            FactResult::Complete(v) => FactResult::Placeholder(v),
            other => other,
        }
    }

    pub fn as_ref(&self) -> FactResult<&T> {
        match self {
            FactResult::Complete(v) => FactResult::Complete(v),
            FactResult::Placeholder(v) => FactResult::Placeholder(v),
            FactResult::Incomplete => FactResult::Incomplete,
        }
    }
}

// ──────────────────────────────────────────────
// MaybeVector
// ──────────────────────────────────────────────

/// A value that is either singular or a vector of equal-shape siblings.
///
/// `Multiple.complete` tracks whether the backing collection itself is fully
/// enumerated -- membership knowledge, independent of whether each element is
/// `Complete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaybeVector<T> {
    Single(T),
    Multiple { items: Vec<T>, complete: bool },
}

impl<T> MaybeVector<T> {
    pub fn multiple(items: Vec<T>, complete: bool) -> Self {
        MaybeVector::Multiple { items, complete }
    }

    pub fn is_single(&self) -> bool {
        matches!(self, MaybeVector::Single(_))
    }

    /// Number of elements: 1 for `Single`.
    pub fn len(&self) -> usize {
        match self {
            MaybeVector::Single(_) => 1,
            MaybeVector::Multiple { items, .. } => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten to a list regardless of shape.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            MaybeVector::Single(v) => vec![v],
            MaybeVector::Multiple { items, .. } => items,
        }
    }

    /// The single element, or `None` when this is a vector.
    pub fn into_single(self) -> Option<T> {
        match self {
            MaybeVector::Single(v) => Some(v),
            MaybeVector::Multiple { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> MaybeVector<U> {
        let mut f = f;
        match self {
            MaybeVector::Single(v) => MaybeVector::Single(f(v)),
            MaybeVector::Multiple { items, complete } => MaybeVector::Multiple {
                items: items.into_iter().map(f).collect(),
                complete,
            },
        }
    }
}

/// A fact evaluation outcome: per-lane completeness-tagged results.
pub type ResultVector<T> = MaybeVector<FactResult<T>>;

// ──────────────────────────────────────────────
// Vectorization
// ──────────────────────────────────────────────

/// Apply the completeness propagation rule across a tuple of lane inputs and
/// invoke `f` on the unwrapped values.
///
/// `f` may itself report a data-driven failure by returning `Incomplete`
/// (division by zero) or a fatal error (type mismatch in the dictionary).
fn combine_lane<T, U>(
    inputs: &[&FactResult<T>],
    f: impl FnOnce(&[&T]) -> Result<FactResult<U>, FactGraphError>,
) -> Result<FactResult<U>, FactGraphError> {
    let mut values: Vec<&T> = Vec::with_capacity(inputs.len());
    let mut demote = false;
    for input in inputs {
        match input {
            FactResult::Complete(v) => values.push(v),
            FactResult::Placeholder(v) => {
                values.push(v);
                demote = true;
            }
            FactResult::Incomplete => return Ok(FactResult::Incomplete),
        }
    }
    let out = f(&values)?;
    Ok(if demote { out.demote_to_placeholder() } else { out })
}

/// Lift an n-ary pure function over `ResultVector` inputs with broadcasting.
///
/// Shape rules: all-`Single` inputs yield `Single`; any `Multiple` input
/// fixes the output length, `Single` inputs broadcast, and every `Multiple`
/// input must agree on that length or the operation fails with
/// `ShapeMismatch`. The output's `complete` flag is the AND across the
/// `Multiple` inputs' flags.
pub fn vectorize_list<T: Clone, U>(
    operator: &str,
    inputs: &[ResultVector<T>],
    mut f: impl FnMut(&[&T]) -> Result<FactResult<U>, FactGraphError>,
) -> Result<ResultVector<U>, FactGraphError> {
    let mut width: Option<usize> = None;
    let mut complete = true;
    for input in inputs {
        if let MaybeVector::Multiple {
            items,
            complete: flag,
        } = input
        {
            match width {
                None => width = Some(items.len()),
                Some(w) if w != items.len() => {
                    return Err(FactGraphError::ShapeMismatch {
                        operator: operator.to_string(),
                        left: w,
                        right: items.len(),
                    });
                }
                Some(_) => {}
            }
            complete = complete && *flag;
        }
    }

    match width {
        None => {
            let lane: Vec<&FactResult<T>> = inputs
                .iter()
                .map(|i| match i {
                    MaybeVector::Single(r) => r,
                    MaybeVector::Multiple { .. } => unreachable!(),
                })
                .collect();
            Ok(MaybeVector::Single(combine_lane(&lane, &mut f)?))
        }
        Some(w) => {
            let mut out = Vec::with_capacity(w);
            for idx in 0..w {
                let lane: Vec<&FactResult<T>> = inputs
                    .iter()
                    .map(|i| match i {
                        MaybeVector::Single(r) => r,
                        MaybeVector::Multiple { items, .. } => &items[idx],
                    })
                    .collect();
                out.push(combine_lane(&lane, &mut f)?);
            }
            Ok(MaybeVector::Multiple {
                items: out,
                complete,
            })
        }
    }
}

/// Binary convenience wrapper over [`vectorize_list`].
pub fn vectorize2<T: Clone, U>(
    operator: &str,
    a: ResultVector<T>,
    b: ResultVector<T>,
    mut f: impl FnMut(&T, &T) -> Result<FactResult<U>, FactGraphError>,
) -> Result<ResultVector<U>, FactGraphError> {
    vectorize_list(operator, &[a, b], |vals| f(vals[0], vals[1]))
}

/// Elementwise binary combine that bypasses the propagation rule.
///
/// Short-circuit logic (`All`, `Any`) needs to see each operand's
/// completeness directly: a `Complete(false)` operand must dominate an
/// `Incomplete` one. Broadcasting and shape checking match
/// [`vectorize_list`].
pub fn zip2<T: Clone, U>(
    operator: &str,
    a: ResultVector<T>,
    b: ResultVector<T>,
    mut f: impl FnMut(&FactResult<T>, &FactResult<T>) -> Result<FactResult<U>, FactGraphError>,
) -> Result<ResultVector<U>, FactGraphError> {
    match (&a, &b) {
        (MaybeVector::Single(ra), MaybeVector::Single(rb)) => Ok(MaybeVector::Single(f(ra, rb)?)),
        (
            MaybeVector::Multiple {
                items: xs,
                complete: cx,
            },
            MaybeVector::Multiple {
                items: ys,
                complete: cy,
            },
        ) => {
            if xs.len() != ys.len() {
                return Err(FactGraphError::ShapeMismatch {
                    operator: operator.to_string(),
                    left: xs.len(),
                    right: ys.len(),
                });
            }
            Ok(MaybeVector::Multiple {
                items: xs
                    .iter()
                    .zip(ys)
                    .map(|(x, y)| f(x, y))
                    .collect::<Result<Vec<_>, _>>()?,
                complete: *cx && *cy,
            })
        }
        (MaybeVector::Single(ra), MaybeVector::Multiple { items, complete }) => {
            Ok(MaybeVector::Multiple {
                items: items
                    .iter()
                    .map(|y| f(ra, y))
                    .collect::<Result<Vec<_>, _>>()?,
                complete: *complete,
            })
        }
        (MaybeVector::Multiple { items, complete }, MaybeVector::Single(rb)) => {
            Ok(MaybeVector::Multiple {
                items: items
                    .iter()
                    .map(|x| f(x, rb))
                    .collect::<Result<Vec<_>, _>>()?,
                complete: *complete,
            })
        }
    }
}

/// Unary convenience wrapper over [`vectorize_list`].
pub fn vectorize1<T: Clone, U>(
    operator: &str,
    a: ResultVector<T>,
    mut f: impl FnMut(&T) -> Result<FactResult<U>, FactGraphError>,
) -> Result<ResultVector<U>, FactGraphError> {
    vectorize_list(operator, &[a], |vals| f(vals[0]))
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_preserves_completeness() {
        assert_eq!(
            FactResult::Complete(2).map(|v| v * 2),
            FactResult::Complete(4)
        );
        assert_eq!(
            FactResult::Placeholder(2).map(|v| v * 2),
            FactResult::Placeholder(4)
        );
        assert_eq!(
            FactResult::<i32>::Incomplete.map(|v| v * 2),
            FactResult::Incomplete
        );
    }

    #[test]
    fn and_then_demotes_through_placeholder() {
        let out = FactResult::Placeholder(3).and_then(|v| FactResult::Complete(v + 1));
        assert_eq!(out, FactResult::Placeholder(4));
    }

    #[test]
    fn demote_leaves_incomplete() {
        assert_eq!(
            FactResult::<i32>::Incomplete.demote_to_placeholder(),
            FactResult::Incomplete
        );
        assert_eq!(
            FactResult::Complete(1).demote_to_placeholder(),
            FactResult::Placeholder(1)
        );
    }

    #[test]
    fn vectorize_all_single() {
        let out = vectorize2(
            "add",
            MaybeVector::Single(FactResult::Complete(2)),
            MaybeVector::Single(FactResult::Complete(3)),
            |a, b| Ok(FactResult::Complete(a + b)),
        )
        .unwrap();
        assert_eq!(out, MaybeVector::Single(FactResult::Complete(5)));
    }

    #[test]
    fn vectorize_broadcasts_single() {
        let out = vectorize2(
            "add",
            MaybeVector::multiple(
                vec![FactResult::Complete(1), FactResult::Complete(2)],
                true,
            ),
            MaybeVector::Single(FactResult::Complete(10)),
            |a, b| Ok(FactResult::Complete(a + b)),
        )
        .unwrap();
        assert_eq!(
            out,
            MaybeVector::multiple(
                vec![FactResult::Complete(11), FactResult::Complete(12)],
                true
            )
        );
    }

    #[test]
    fn vectorize_incomplete_poisons_lane_only() {
        let out = vectorize2(
            "add",
            MaybeVector::multiple(
                vec![FactResult::Complete(1), FactResult::Incomplete],
                true,
            ),
            MaybeVector::Single(FactResult::Complete(10)),
            |a, b| Ok(FactResult::Complete(a + b)),
        )
        .unwrap();
        assert_eq!(
            out,
            MaybeVector::multiple(vec![FactResult::Complete(11), FactResult::Incomplete], true)
        );
    }

    #[test]
    fn vectorize_placeholder_demotes_lane() {
        let out = vectorize2(
            "add",
            MaybeVector::Single(FactResult::Placeholder(1)),
            MaybeVector::Single(FactResult::Complete(2)),
            |a, b| Ok(FactResult::Complete(a + b)),
        )
        .unwrap();
        assert_eq!(out, MaybeVector::Single(FactResult::Placeholder(3)));
    }

    #[test]
    fn vectorize_length_mismatch_is_fatal() {
        let out = vectorize2(
            "add",
            MaybeVector::multiple(
                vec![FactResult::Complete(1), FactResult::Complete(2)],
                true,
            ),
            MaybeVector::multiple(
                vec![
                    FactResult::Complete(1),
                    FactResult::Complete(2),
                    FactResult::Complete(3),
                ],
                true,
            ),
            |a, b| Ok(FactResult::Complete(a + b)),
        );
        assert!(matches!(out, Err(FactGraphError::ShapeMismatch { .. })));
    }

    #[test]
    fn vectorize_complete_flag_is_and() {
        let out = vectorize2(
            "add",
            MaybeVector::multiple(vec![FactResult::Complete(1)], true),
            MaybeVector::multiple(vec![FactResult::Complete(2)], false),
            |a, b| Ok(FactResult::Complete(a + b)),
        )
        .unwrap();
        match out {
            MaybeVector::Multiple { complete, .. } => assert!(!complete),
            _ => panic!("expected Multiple"),
        }
    }
}
