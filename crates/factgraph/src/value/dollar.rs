//! Exact dollar amounts as signed integer cents.
//!
//! All arithmetic is integer arithmetic on cents. Conversions that leave the
//! cent grid (multiplication or division by a `Rational`) go through
//! `rust_decimal::Decimal` and round back with
//! `RoundingStrategy::MidpointNearestEven`. No `f64` anywhere.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::FactGraphError;
use crate::value::rational::Rational;

/// A signed count of cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dollar(i64);

impl Dollar {
    pub const ZERO: Dollar = Dollar(0);

    pub fn from_cents(cents: i64) -> Dollar {
        Dollar(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    /// Parse a decimal string such as `"500"` or `"-12.50"`.
    ///
    /// More than two fractional digits is rejected rather than rounded: a
    /// literal that does not sit on the cent grid is a bad literal.
    pub fn parse(s: &str) -> Result<Dollar, FactGraphError> {
        let d: Decimal = s
            .trim()
            .parse::<Decimal>()
            .map_err(|e| FactGraphError::invalid("Dollar", format!("{}: {}", s, e)))?
            .normalize();
        if d.scale() > 2 {
            return Err(FactGraphError::invalid(
                "Dollar",
                format!("{} has sub-cent precision", s),
            ));
        }
        Self::from_decimal_exact(d)
    }

    /// Convert a decimal dollar amount to cents; must be exact.
    fn from_decimal_exact(d: Decimal) -> Result<Dollar, FactGraphError> {
        (d * Decimal::ONE_HUNDRED)
            .normalize()
            .to_i64()
            .map(Dollar)
            .ok_or_else(|| FactGraphError::invalid("Dollar", format!("{} out of range", d)))
    }

    /// Convert a decimal dollar amount to cents with banker's rounding.
    pub fn from_decimal_rounded(d: Decimal) -> Result<Dollar, FactGraphError> {
        (d * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
            .to_i64()
            .map(Dollar)
            .ok_or_else(|| FactGraphError::invalid("Dollar", format!("{} out of range", d)))
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn checked_add(self, other: Dollar) -> Option<Dollar> {
        self.0.checked_add(other.0).map(Dollar)
    }

    pub fn checked_sub(self, other: Dollar) -> Option<Dollar> {
        self.0.checked_sub(other.0).map(Dollar)
    }

    pub fn checked_neg(self) -> Option<Dollar> {
        self.0.checked_neg().map(Dollar)
    }

    /// Multiply by a rational factor, rounding half-to-even back to cents.
    pub fn mul_rational(self, r: Rational) -> Result<Dollar, FactGraphError> {
        let product = Decimal::from(self.0) * Decimal::from(r.numerator())
            / Decimal::from(r.denominator());
        product
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
            .to_i64()
            .map(Dollar)
            .ok_or_else(|| FactGraphError::invalid("Dollar", "product out of range"))
    }

    /// Round to whole dollars, half-to-even.
    pub fn round_to_whole(self) -> Dollar {
        let d = self
            .to_decimal()
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        // Whole-dollar decimals always fit back on the cent grid.
        Dollar((d * Decimal::ONE_HUNDRED).to_i64().unwrap_or(self.0))
    }

    /// Round up to whole dollars.
    pub fn ceiling(self) -> Dollar {
        let whole = self.0.div_euclid(100);
        if self.0.rem_euclid(100) == 0 {
            Dollar(whole * 100)
        } else {
            Dollar((whole + 1) * 100)
        }
    }

    /// Round down to whole dollars.
    pub fn floor(self) -> Dollar {
        Dollar(self.0.div_euclid(100) * 100)
    }
}

impl fmt::Display for Dollar {
    /// Canonical rendering: always two fractional digits, e.g. `550.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
