//! Reduced rational numbers with a positive denominator.

use std::fmt;

use rust_decimal::Decimal;

use crate::error::FactGraphError;

/// A fraction stored reduced, denominator always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    numerator: i64,
    denominator: i64,
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl Rational {
    pub const ZERO: Rational = Rational {
        numerator: 0,
        denominator: 1,
    };

    /// Construct and reduce. A zero denominator is invalid.
    pub fn new(numerator: i64, denominator: i64) -> Result<Rational, FactGraphError> {
        if denominator == 0 {
            return Err(FactGraphError::invalid("Rational", "zero denominator"));
        }
        let sign = if denominator < 0 { -1 } else { 1 };
        let g = gcd(numerator, denominator).max(1);
        Ok(Rational {
            numerator: sign * numerator / g,
            denominator: (denominator / g).abs(),
        })
    }

    pub fn from_int(n: i64) -> Rational {
        Rational {
            numerator: n,
            denominator: 1,
        }
    }

    /// Parse the canonical `"n/d"` form; a bare integer is accepted as `n/1`.
    pub fn parse(s: &str) -> Result<Rational, FactGraphError> {
        let s = s.trim();
        let (n, d) = match s.split_once('/') {
            Some((n, d)) => (n, d),
            None => (s, "1"),
        };
        let numerator: i64 = n
            .trim()
            .parse()
            .map_err(|_| FactGraphError::invalid("Rational", format!("bad numerator in {}", s)))?;
        let denominator: i64 = d.trim().parse().map_err(|_| {
            FactGraphError::invalid("Rational", format!("bad denominator in {}", s))
        })?;
        Rational::new(numerator, denominator)
    }

    pub fn numerator(self) -> i64 {
        self.numerator
    }

    pub fn denominator(self) -> i64 {
        self.denominator
    }

    pub fn checked_add(self, other: Rational) -> Option<Rational> {
        let n = self
            .numerator
            .checked_mul(other.denominator)?
            .checked_add(other.numerator.checked_mul(self.denominator)?)?;
        let d = self.denominator.checked_mul(other.denominator)?;
        Rational::new(n, d).ok()
    }

    pub fn checked_sub(self, other: Rational) -> Option<Rational> {
        self.checked_add(Rational {
            numerator: -other.numerator,
            denominator: other.denominator,
        })
    }

    pub fn checked_mul(self, other: Rational) -> Option<Rational> {
        let n = self.numerator.checked_mul(other.numerator)?;
        let d = self.denominator.checked_mul(other.denominator)?;
        Rational::new(n, d).ok()
    }

    /// Division; `None` when `other` is zero or on overflow.
    pub fn checked_div(self, other: Rational) -> Option<Rational> {
        if other.numerator == 0 {
            return None;
        }
        self.checked_mul(Rational {
            numerator: other.denominator,
            denominator: other.numerator,
        })
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.numerator) / Decimal::from(self.denominator)
    }

    pub fn is_zero(self) -> bool {
        self.numerator == 0
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Cross-multiply in i128 so comparison never overflows.
        let lhs = self.numerator as i128 * other.denominator as i128;
        let rhs = other.numerator as i128 * self.denominator as i128;
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
