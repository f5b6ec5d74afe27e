//! Mailing addresses and bank accounts.

use std::fmt;

use serde_json::json;

use crate::error::FactGraphError;

/// United States state, district, territory, and military-mail codes.
const US_REGIONS: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY", "AS", "GU", "MP", "PR", "VI", "AA", "AE", "AP",
];

// ──────────────────────────────────────────────
// Address
// ──────────────────────────────────────────────

/// A structured mailing address.
///
/// For `US` addresses the region must be a known two-letter code and the
/// postal code a ZIP or ZIP+4; other countries keep their fields free-form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub street: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal: String,
    pub country: String,
}

impl Address {
    pub fn new(
        street: impl Into<String>,
        line2: Option<String>,
        city: impl Into<String>,
        region: impl Into<String>,
        postal: impl Into<String>,
        country: impl Into<String>,
    ) -> Result<Address, FactGraphError> {
        let addr = Address {
            street: street.into().trim().to_string(),
            line2: line2.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            city: city.into().trim().to_string(),
            region: region.into().trim().to_ascii_uppercase(),
            postal: postal.into().trim().to_string(),
            country: {
                let c = country.into().trim().to_ascii_uppercase();
                if c.is_empty() {
                    "US".to_string()
                } else {
                    c
                }
            },
        };
        addr.validate()?;
        Ok(addr)
    }

    /// Region and postal format checks; this is also the intrinsic limit
    /// re-run at save time.
    pub fn validate(&self) -> Result<(), FactGraphError> {
        if self.street.is_empty() {
            return Err(FactGraphError::invalid("Address", "empty street"));
        }
        if self.city.is_empty() {
            return Err(FactGraphError::invalid("Address", "empty city"));
        }
        if self.country == "US" {
            if !US_REGIONS.contains(&self.region.as_str()) {
                return Err(FactGraphError::invalid(
                    "Address",
                    format!("unknown region {}", self.region),
                ));
            }
            let ok = match self.postal.len() {
                5 => self.postal.bytes().all(|b| b.is_ascii_digit()),
                10 => {
                    self.postal.as_bytes()[5] == b'-'
                        && self.postal[0..5].bytes().all(|b| b.is_ascii_digit())
                        && self.postal[6..].bytes().all(|b| b.is_ascii_digit())
                }
                _ => false,
            };
            if !ok {
                return Err(FactGraphError::invalid(
                    "Address",
                    format!("bad ZIP code {}", self.postal),
                ));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "street": self.street,
            "line2": self.line2,
            "city": self.city,
            "region": self.region,
            "postal": self.postal,
            "country": self.country,
        })
    }

    pub fn from_json(v: &serde_json::Value) -> Result<Address, FactGraphError> {
        let field = |name: &str| -> Result<String, FactGraphError> {
            v.get(name)
                .and_then(|s| s.as_str())
                .map(str::to_string)
                .ok_or_else(|| FactGraphError::parse(format!("Address missing '{}'", name)))
        };
        Address::new(
            field("street")?,
            v.get("line2").and_then(|s| s.as_str()).map(str::to_string),
            field("city")?,
            field("region")?,
            field("postal")?,
            v.get("country")
                .and_then(|s| s.as_str())
                .unwrap_or("US")
                .to_string(),
        )
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.street)?;
        if let Some(line2) = &self.line2 {
            write!(f, ", {}", line2)?;
        }
        write!(
            f,
            ", {}, {} {}, {}",
            self.city, self.region, self.postal, self.country
        )
    }
}

// ──────────────────────────────────────────────
// BankAccount
// ──────────────────────────────────────────────

/// Checking or savings designation for direct deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BankAccountType {
    Checking,
    Savings,
}

impl BankAccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            BankAccountType::Checking => "Checking",
            BankAccountType::Savings => "Savings",
        }
    }

    pub fn parse(s: &str) -> Result<BankAccountType, FactGraphError> {
        match s.trim() {
            "Checking" => Ok(BankAccountType::Checking),
            "Savings" => Ok(BankAccountType::Savings),
            other => Err(FactGraphError::invalid(
                "BankAccount",
                format!("unknown account type {}", other),
            )),
        }
    }
}

/// A routing/account number pair for direct deposit.
///
/// The routing number must pass the ABA check digit; the account number is
/// 4 to 17 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BankAccount {
    pub account_type: BankAccountType,
    pub routing: String,
    pub account: String,
}

impl BankAccount {
    pub fn new(
        account_type: BankAccountType,
        routing: impl Into<String>,
        account: impl Into<String>,
    ) -> Result<BankAccount, FactGraphError> {
        let acct = BankAccount {
            account_type,
            routing: routing.into().trim().to_string(),
            account: account.into().trim().to_string(),
        };
        acct.validate()?;
        Ok(acct)
    }

    pub fn validate(&self) -> Result<(), FactGraphError> {
        if self.routing.len() != 9 || !self.routing.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FactGraphError::invalid(
                "BankAccount",
                "routing number must have 9 digits",
            ));
        }
        let digit = |i: usize| (self.routing.as_bytes()[i] - b'0') as u32;
        let checksum: u32 = (0..9)
            .map(|i| digit(i) * [3, 7, 1][i % 3])
            .sum();
        if checksum % 10 != 0 {
            return Err(FactGraphError::invalid(
                "BankAccount",
                "routing number fails check digit",
            ));
        }
        if self.account.len() < 4
            || self.account.len() > 17
            || !self.account.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(FactGraphError::invalid(
                "BankAccount",
                "account number must have 4 to 17 digits",
            ));
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "type": self.account_type.as_str(),
            "routing": self.routing,
            "account": self.account,
        })
    }

    pub fn from_json(v: &serde_json::Value) -> Result<BankAccount, FactGraphError> {
        let field = |name: &str| -> Result<&str, FactGraphError> {
            v.get(name)
                .and_then(|s| s.as_str())
                .ok_or_else(|| FactGraphError::parse(format!("BankAccount missing '{}'", name)))
        };
        BankAccount::new(
            BankAccountType::parse(field("type")?)?,
            field("routing")?,
            field("account")?,
        )
    }
}

impl fmt::Display for BankAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}",
            self.account_type.as_str(),
            self.routing,
            self.account
        )
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
