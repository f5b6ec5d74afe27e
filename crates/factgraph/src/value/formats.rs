//! Validated string types: taxpayer/employer identifiers, PINs, phone, email.
//!
//! Each type rejects malformed raw input at construction and renders a single
//! canonical form, so equality and persistence never see separator noise.

use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};

use crate::error::FactGraphError;

const REGEX_CACHE_MAX: usize = 256;

static REGEX_CACHE: OnceLock<RwLock<HashMap<String, regex::Regex>>> = OnceLock::new();

/// Compile-once regex lookup shared by validated strings and `Match` limits.
pub(crate) fn cached_regex(pattern: &str) -> Result<regex::Regex, FactGraphError> {
    let cache = REGEX_CACHE.get_or_init(|| RwLock::new(HashMap::new()));

    if let Ok(guard) = cache.read() {
        if let Some(re) = guard.get(pattern) {
            return Ok(re.clone());
        }
    }

    let compiled = regex::Regex::new(pattern)
        .map_err(|e| FactGraphError::parse(format!("invalid regex '{}': {}", pattern, e)))?;

    if let Ok(mut guard) = cache.write() {
        if guard.len() >= REGEX_CACHE_MAX {
            // Keep the cache bounded.
            guard.clear();
        }
        guard
            .entry(pattern.to_string())
            .or_insert_with(|| compiled.clone());
    }
    Ok(compiled)
}

/// Strip common separators and return the digit string, or an error naming
/// `kind` when a non-separator, non-digit character appears.
fn digits_only(kind: &str, raw: &str) -> Result<String, FactGraphError> {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '0'..='9' => out.push(c),
            ' ' | '-' | '(' | ')' | '.' => {}
            other => {
                return Err(FactGraphError::invalid(
                    kind,
                    format!("unexpected character '{}'", other),
                ));
            }
        }
    }
    Ok(out)
}

// ──────────────────────────────────────────────
// Tin (SSN / ITIN shape)
// ──────────────────────────────────────────────

/// A taxpayer identification number, canonically `XXX-XX-XXXX`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tin(String);

impl Tin {
    pub fn parse(raw: &str) -> Result<Tin, FactGraphError> {
        let d = digits_only("Tin", raw)?;
        if d.len() != 9 {
            return Err(FactGraphError::invalid("Tin", "must have 9 digits"));
        }
        let (area, group, serial) = (&d[0..3], &d[3..5], &d[5..9]);
        if area == "000" || area == "666" {
            return Err(FactGraphError::invalid("Tin", format!("invalid area {}", area)));
        }
        if group == "00" {
            return Err(FactGraphError::invalid("Tin", "invalid group 00"));
        }
        if serial == "0000" {
            return Err(FactGraphError::invalid("Tin", "invalid serial 0000"));
        }
        Ok(Tin(format!("{}-{}-{}", area, group, serial)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ──────────────────────────────────────────────
// Ein
// ──────────────────────────────────────────────

/// An employer identification number, canonically `XX-XXXXXXX`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ein(String);

impl Ein {
    pub fn parse(raw: &str) -> Result<Ein, FactGraphError> {
        let d = digits_only("Ein", raw)?;
        if d.len() != 9 {
            return Err(FactGraphError::invalid("Ein", "must have 9 digits"));
        }
        let prefix = &d[0..2];
        if matches!(prefix, "00" | "07" | "08" | "09" | "17" | "18" | "19" | "28" | "29") {
            return Err(FactGraphError::invalid(
                "Ein",
                format!("unassigned prefix {}", prefix),
            ));
        }
        Ok(Ein(format!("{}-{}", prefix, &d[2..9])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ein {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ──────────────────────────────────────────────
// IpPin / Pin
// ──────────────────────────────────────────────

/// An identity-protection PIN: exactly six digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpPin(String);

impl IpPin {
    pub fn parse(raw: &str) -> Result<IpPin, FactGraphError> {
        let d = digits_only("IpPin", raw)?;
        if d.len() != 6 {
            return Err(FactGraphError::invalid("IpPin", "must have 6 digits"));
        }
        Ok(IpPin(d))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IpPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A self-select signature PIN: exactly five digits, not all zeros.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pin(String);

impl Pin {
    pub fn parse(raw: &str) -> Result<Pin, FactGraphError> {
        let d = digits_only("Pin", raw)?;
        if d.len() != 5 {
            return Err(FactGraphError::invalid("Pin", "must have 5 digits"));
        }
        if d == "00000" {
            return Err(FactGraphError::invalid("Pin", "must not be all zeros"));
        }
        Ok(Pin(d))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ──────────────────────────────────────────────
// Phone
// ──────────────────────────────────────────────

/// A ten-digit NANP phone number, canonically bare digits.
///
/// A leading `+1` or `1` country prefix is accepted and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Phone(String);

impl Phone {
    pub fn parse(raw: &str) -> Result<Phone, FactGraphError> {
        let trimmed = raw.trim().strip_prefix("+1").unwrap_or(raw.trim());
        let mut d = digits_only("Phone", trimmed)?;
        if d.len() == 11 && d.starts_with('1') {
            d.remove(0);
        }
        if d.len() != 10 {
            return Err(FactGraphError::invalid("Phone", "must have 10 digits"));
        }
        if d.starts_with('0') || d.starts_with('1') {
            return Err(FactGraphError::invalid("Phone", "invalid area code"));
        }
        Ok(Phone(d))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ──────────────────────────────────────────────
// Email
// ──────────────────────────────────────────────

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$";

/// An email address, canonically lowercased in the domain part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Email, FactGraphError> {
        let s = raw.trim();
        let re = cached_regex(EMAIL_PATTERN)?;
        if !re.is_match(s) {
            return Err(FactGraphError::invalid("Email", format!("malformed address {}", s)));
        }
        let (local, domain) = s
            .split_once('@')
            .ok_or_else(|| FactGraphError::invalid("Email", "missing '@'"))?;
        Ok(Email(format!("{}@{}", local, domain.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
