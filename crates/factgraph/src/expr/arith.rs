//! Numeric semantics for the operator family.
//!
//! Promotion ladder: `Int` promotes to `Dollar` (whole dollars) or
//! `Rational`; `Dollar`/`Rational` arithmetic yields `Dollar`, rounding
//! half-to-even back onto the cent grid. Overflow and division by zero are
//! data conditions and collapse to `Incomplete`; combining types that have
//! no common arithmetic is a dictionary bug and fails the operation.

use std::cmp::Ordering;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::FactGraphError;
use crate::result::FactResult;
use crate::value::{Dollar, Rational, Value};

fn type_error(op: &str, a: &Value, b: &Value) -> FactGraphError {
    FactGraphError::dictionary(format!(
        "{} cannot combine {} and {}",
        op,
        a.type_name(),
        b.type_name()
    ))
}

fn unary_type_error(op: &str, a: &Value) -> FactGraphError {
    FactGraphError::dictionary(format!("{} cannot apply to {}", op, a.type_name()))
}

fn int_to_dollar(i: i32) -> Option<Dollar> {
    i64::from(i).checked_mul(100).map(Dollar::from_cents)
}

fn bankers_cents(d: Decimal) -> FactResult<Value> {
    match d
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
    {
        Some(cents) => FactResult::Complete(Value::Dollar(Dollar::from_cents(cents))),
        None => FactResult::Incomplete,
    }
}

fn complete<T: Into<Value>>(v: T) -> FactResult<Value> {
    FactResult::Complete(v.into())
}

fn or_incomplete<T: Into<Value>>(v: Option<T>) -> FactResult<Value> {
    match v {
        Some(v) => FactResult::Complete(v.into()),
        None => FactResult::Incomplete,
    }
}

// ──────────────────────────────────────────────
// Addition / subtraction
// ──────────────────────────────────────────────

pub fn add(a: &Value, b: &Value) -> Result<FactResult<Value>, FactGraphError> {
    use Value::*;
    Ok(match (a, b) {
        (Int(x), Int(y)) => or_incomplete(x.checked_add(*y)),
        (Dollar(x), Dollar(y)) => or_incomplete(x.checked_add(*y)),
        (Int(x), Dollar(y)) | (Dollar(y), Int(x)) => {
            or_incomplete(int_to_dollar(*x).and_then(|d| d.checked_add(*y)))
        }
        (Rational(x), Rational(y)) => or_incomplete(x.checked_add(*y)),
        (Int(x), Rational(y)) | (Rational(y), Int(x)) => {
            or_incomplete(crate::value::Rational::from_int(i64::from(*x)).checked_add(*y))
        }
        (Dollar(x), Rational(y)) | (Rational(y), Dollar(x)) => {
            bankers_cents(Decimal::from(x.cents()) + y.to_decimal() * Decimal::ONE_HUNDRED)
        }
        (Days(x), Days(y)) => or_incomplete(x.checked_add(*y)),
        (Days(x), Int(y)) | (Int(y), Days(x)) => or_incomplete(x.checked_add(i64::from(*y))),
        (Day(d), Days(n)) | (Days(n), Day(d)) => match d.checked_add_days(*n) {
            Some(day) => complete_day(day),
            None => FactResult::Incomplete,
        },
        _ => return Err(type_error("Add", a, b)),
    })
}

fn complete_day(d: crate::value::Day) -> FactResult<Value> {
    FactResult::Complete(Value::Day(d))
}

pub fn subtract(a: &Value, b: &Value) -> Result<FactResult<Value>, FactGraphError> {
    use Value::*;
    Ok(match (a, b) {
        (Int(x), Int(y)) => or_incomplete(x.checked_sub(*y)),
        (Dollar(x), Dollar(y)) => or_incomplete(x.checked_sub(*y)),
        (Int(x), Dollar(y)) => or_incomplete(int_to_dollar(*x).and_then(|d| d.checked_sub(*y))),
        (Dollar(x), Int(y)) => or_incomplete(int_to_dollar(*y).and_then(|d| x.checked_sub(d))),
        (Rational(x), Rational(y)) => or_incomplete(x.checked_sub(*y)),
        (Int(x), Rational(y)) => {
            or_incomplete(crate::value::Rational::from_int(i64::from(*x)).checked_sub(*y))
        }
        (Rational(x), Int(y)) => {
            or_incomplete(x.checked_sub(crate::value::Rational::from_int(i64::from(*y))))
        }
        (Dollar(x), Rational(y)) => {
            bankers_cents(Decimal::from(x.cents()) - y.to_decimal() * Decimal::ONE_HUNDRED)
        }
        (Days(x), Days(y)) => or_incomplete(x.checked_sub(*y)),
        (Days(x), Int(y)) => or_incomplete(x.checked_sub(i64::from(*y))),
        (Day(d), Days(n)) => match n.checked_neg().and_then(|n| d.checked_add_days(n)) {
            Some(day) => complete_day(day),
            None => FactResult::Incomplete,
        },
        (Day(x), Day(y)) => complete(x.days_since(*y)),
        _ => return Err(type_error("Subtract", a, b)),
    })
}

// ──────────────────────────────────────────────
// Multiplication / division
// ──────────────────────────────────────────────

pub fn multiply(a: &Value, b: &Value) -> Result<FactResult<Value>, FactGraphError> {
    use Value::*;
    Ok(match (a, b) {
        (Int(x), Int(y)) => or_incomplete(x.checked_mul(*y)),
        (Int(x), Dollar(y)) | (Dollar(y), Int(x)) => {
            or_incomplete(y.cents().checked_mul(i64::from(*x)).map(crate::value::Dollar::from_cents))
        }
        (Rational(x), Rational(y)) => or_incomplete(x.checked_mul(*y)),
        (Int(x), Rational(y)) | (Rational(y), Int(x)) => {
            or_incomplete(crate::value::Rational::from_int(i64::from(*x)).checked_mul(*y))
        }
        (Dollar(x), Rational(y)) | (Rational(y), Dollar(x)) => match x.mul_rational(*y) {
            Ok(d) => complete(d),
            Err(_) => FactResult::Incomplete,
        },
        (Days(x), Int(y)) | (Int(y), Days(x)) => or_incomplete(x.checked_mul(i64::from(*y))),
        _ => return Err(type_error("Multiply", a, b)),
    })
}

pub fn divide(a: &Value, b: &Value) -> Result<FactResult<Value>, FactGraphError> {
    use Value::*;
    let rational = |n: i64, d: i64| match crate::value::Rational::new(n, d) {
        Ok(r) => FactResult::Complete(Value::Rational(r)),
        Err(_) => FactResult::Incomplete,
    };
    Ok(match (a, b) {
        (_, Int(0)) => FactResult::Incomplete,
        (_, Rational(r)) if r.is_zero() => FactResult::Incomplete,
        (_, Dollar(d)) if d.cents() == 0 => FactResult::Incomplete,
        (Int(x), Int(y)) => rational(i64::from(*x), i64::from(*y)),
        (Dollar(x), Int(y)) => {
            bankers_cents(Decimal::from(x.cents()) / Decimal::from(*y))
        }
        (Dollar(x), Rational(y)) => {
            bankers_cents(Decimal::from(x.cents()) * Decimal::from(y.denominator())
                / Decimal::from(y.numerator()))
        }
        (Dollar(x), Dollar(y)) => rational(x.cents(), y.cents()),
        (Rational(x), Rational(y)) => or_incomplete(x.checked_div(*y)),
        (Rational(x), Int(y)) => {
            or_incomplete(x.checked_div(crate::value::Rational::from_int(i64::from(*y))))
        }
        (Int(x), Rational(y)) => {
            or_incomplete(crate::value::Rational::from_int(i64::from(*x)).checked_div(*y))
        }
        _ => return Err(type_error("Divide", a, b)),
    })
}

// ──────────────────────────────────────────────
// Comparison
// ──────────────────────────────────────────────

/// Ordering with numeric promotion. `None` when the two types have no
/// common order (a dictionary bug for ordered comparisons; `Equal` treats
/// it as plain inequality only for identical kinds).
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    use Value::*;
    match (a, b) {
        (Int(x), Int(y)) => Some(x.cmp(y)),
        (Dollar(x), Dollar(y)) => Some(x.cmp(y)),
        (Rational(x), Rational(y)) => Some(x.cmp(y)),
        (Int(x), Dollar(y)) => Some(Decimal::from(*x).cmp(&y.to_decimal())),
        (Dollar(x), Int(y)) => Some(x.to_decimal().cmp(&Decimal::from(*y))),
        (Int(x), Rational(y)) => Some(Decimal::from(*x).cmp(&y.to_decimal())),
        (Rational(x), Int(y)) => Some(x.to_decimal().cmp(&Decimal::from(*y))),
        (Dollar(x), Rational(y)) => Some(x.to_decimal().cmp(&y.to_decimal())),
        (Rational(x), Dollar(y)) => Some(x.to_decimal().cmp(&y.to_decimal())),
        (Day(x), Day(y)) => Some(x.cmp(y)),
        (Days(x), Days(y)) => Some(x.cmp(y)),
        (Days(x), Int(y)) => Some(x.cmp(&i64::from(*y))),
        (Int(x), Days(y)) => Some(i64::from(*x).cmp(y)),
        (Str(x), Str(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Equality across promoted numeric kinds; same-kind values fall back to
/// structural equality. An enum compares equal to the bare string of its
/// chosen value, so dictionaries can test selections against literals.
pub fn values_equal(a: &Value, b: &Value) -> Result<bool, FactGraphError> {
    if a.kind() == b.kind() {
        return Ok(a == b);
    }
    match (a, b) {
        (Value::Enum(e), Value::Str(s)) | (Value::Str(s), Value::Enum(e)) => {
            return Ok(e.value() == s);
        }
        _ => {}
    }
    match compare(a, b) {
        Some(ord) => Ok(ord == Ordering::Equal),
        None => Err(type_error("Equal", a, b)),
    }
}

pub fn ordered(
    op: &str,
    a: &Value,
    b: &Value,
    accept: impl Fn(Ordering) -> bool,
) -> Result<FactResult<Value>, FactGraphError> {
    match compare(a, b) {
        Some(ord) => Ok(FactResult::Complete(Value::Bool(accept(ord)))),
        None => Err(type_error(op, a, b)),
    }
}

// ──────────────────────────────────────────────
// Rounding
// ──────────────────────────────────────────────

fn rational_to_int(r: Rational, strategy: RoundingStrategy) -> FactResult<Value> {
    match r.to_decimal().round_dp_with_strategy(0, strategy).to_i64() {
        Some(i) => match i32::try_from(i) {
            Ok(i) => FactResult::Complete(Value::Int(i)),
            Err(_) => FactResult::Incomplete,
        },
        None => FactResult::Incomplete,
    }
}

/// Round to whole units, half-to-even. Dollars stay dollars; rationals
/// become integers.
pub fn round(a: &Value) -> Result<FactResult<Value>, FactGraphError> {
    match a {
        Value::Dollar(d) => Ok(complete(d.round_to_whole())),
        Value::Rational(r) => Ok(rational_to_int(*r, RoundingStrategy::MidpointNearestEven)),
        Value::Int(i) => Ok(complete(*i)),
        other => Err(unary_type_error("Round", other)),
    }
}

pub fn round_to_int(a: &Value) -> Result<FactResult<Value>, FactGraphError> {
    match a {
        Value::Dollar(d) => {
            let whole = d.round_to_whole().cents() / 100;
            match i32::try_from(whole) {
                Ok(i) => Ok(complete(i)),
                Err(_) => Ok(FactResult::Incomplete),
            }
        }
        Value::Rational(r) => Ok(rational_to_int(*r, RoundingStrategy::MidpointNearestEven)),
        Value::Int(i) => Ok(complete(*i)),
        other => Err(unary_type_error("RoundToInt", other)),
    }
}

pub fn ceiling(a: &Value) -> Result<FactResult<Value>, FactGraphError> {
    match a {
        Value::Dollar(d) => Ok(complete(d.ceiling())),
        Value::Rational(r) => {
            match r.to_decimal().ceil().to_i64().and_then(|i| i32::try_from(i).ok()) {
                Some(i) => Ok(complete(i)),
                None => Ok(FactResult::Incomplete),
            }
        }
        Value::Int(i) => Ok(complete(*i)),
        other => Err(unary_type_error("Ceiling", other)),
    }
}

pub fn floor(a: &Value) -> Result<FactResult<Value>, FactGraphError> {
    match a {
        Value::Dollar(d) => Ok(complete(d.floor())),
        Value::Rational(r) => {
            match r.to_decimal().floor().to_i64().and_then(|i| i32::try_from(i).ok()) {
                Some(i) => Ok(complete(i)),
                None => Ok(FactResult::Incomplete),
            }
        }
        Value::Int(i) => Ok(complete(*i)),
        other => Err(unary_type_error("Floor", other)),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn dollar(cents: i64) -> Value {
        Value::Dollar(Dollar::from_cents(cents))
    }

    fn rational(n: i64, d: i64) -> Value {
        Value::Rational(Rational::new(n, d).unwrap())
    }

    #[test]
    fn int_promotes_to_whole_dollars() {
        assert_eq!(
            add(&Value::Int(5), &dollar(50)).unwrap(),
            FactResult::Complete(dollar(550))
        );
    }

    #[test]
    fn dollar_rational_multiply_rounds_half_even() {
        // 1.25 * 1/10 = 12.5 cents -> 12 (nearest even)
        assert_eq!(
            multiply(&dollar(125), &rational(1, 10)).unwrap(),
            FactResult::Complete(dollar(12))
        );
    }

    #[test]
    fn divide_by_zero_is_incomplete() {
        assert_eq!(
            divide(&Value::Int(1), &Value::Int(0)).unwrap(),
            FactResult::Incomplete
        );
        assert_eq!(
            divide(&dollar(100), &rational(0, 5)).unwrap(),
            FactResult::Incomplete
        );
    }

    #[test]
    fn int_division_yields_rational() {
        assert_eq!(
            divide(&Value::Int(2), &Value::Int(4)).unwrap(),
            FactResult::Complete(rational(1, 2))
        );
    }

    #[test]
    fn dollar_division_rounds_half_even() {
        // 1.01 / 2 = 50.5 cents -> 50
        assert_eq!(
            divide(&dollar(101), &Value::Int(2)).unwrap(),
            FactResult::Complete(dollar(50))
        );
    }

    #[test]
    fn overflow_is_incomplete_not_fatal() {
        assert_eq!(
            add(&Value::Int(i32::MAX), &Value::Int(1)).unwrap(),
            FactResult::Incomplete
        );
    }

    #[test]
    fn incompatible_types_are_a_dictionary_bug() {
        assert!(add(&Value::Bool(true), &Value::Int(1)).is_err());
        assert!(multiply(&dollar(100), &dollar(100)).is_err());
    }

    #[test]
    fn date_arithmetic() {
        let day = Value::Day(crate::value::Day::parse("2024-02-28").unwrap());
        assert_eq!(
            add(&day, &Value::Days(2)).unwrap(),
            FactResult::Complete(Value::Day(crate::value::Day::parse("2024-03-01").unwrap()))
        );
        let other = Value::Day(crate::value::Day::parse("2024-01-01").unwrap());
        assert_eq!(
            subtract(&day, &other).unwrap(),
            FactResult::Complete(Value::Days(58))
        );
    }

    #[test]
    fn compare_promotes_across_numeric_kinds() {
        assert_eq!(compare(&Value::Int(1), &dollar(100)), Some(Ordering::Equal));
        assert_eq!(compare(&Value::Int(1), &rational(3, 2)), Some(Ordering::Less));
        assert_eq!(compare(&Value::Bool(true), &Value::Int(1)), None);
    }

    #[test]
    fn equal_same_kind_uses_structural_equality() {
        assert!(values_equal(&Value::Str("a".into()), &Value::Str("a".into())).unwrap());
        assert!(!values_equal(&Value::Bool(true), &Value::Bool(false)).unwrap());
        assert!(values_equal(&Value::Bool(true), &Value::Int(1)).is_err());
    }

    #[test]
    fn enum_compares_against_bare_strings() {
        let e = Value::Enum(crate::value::EnumValue::new("/opts", "open").unwrap());
        assert!(values_equal(&e, &Value::Str("open".into())).unwrap());
        assert!(!values_equal(&Value::Str("closed".into()), &e).unwrap());
    }

    #[test]
    fn rounding_family() {
        assert_eq!(round(&dollar(250)).unwrap(), FactResult::Complete(dollar(200)));
        assert_eq!(
            round_to_int(&dollar(34_950)).unwrap(),
            FactResult::Complete(Value::Int(350))
        );
        assert_eq!(
            ceiling(&rational(5, 2)).unwrap(),
            FactResult::Complete(Value::Int(3))
        );
        assert_eq!(
            floor(&rational(-5, 2)).unwrap(),
            FactResult::Complete(Value::Int(-3))
        );
    }
}
