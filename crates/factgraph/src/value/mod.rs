//! Runtime value types and JSON codecs.
//!
//! `Value` is the tagged union of every writable type. Each variant has a
//! canonical in-memory representation, an equality predicate, and two JSON
//! encodings: the *plain* form used at the boundary (`true`, `55000`,
//! `"2024-02-29"`, ...) and the *tagged* container
//! `{"$type": "<tag>", "item": <json>}` used by persistence and migrations.

pub mod address;
pub mod collection;
pub mod day;
pub mod dollar;
pub mod enums;
pub mod formats;
pub mod rational;

use std::fmt;

use serde_json::json;

use crate::error::FactGraphError;

pub use address::{Address, BankAccount, BankAccountType};
pub use collection::Collection;
pub use day::Day;
pub use dollar::Dollar;
pub use enums::{EnumValue, MultiEnumValue};
pub use formats::{Ein, Email, IpPin, Phone, Pin, Tin};
pub use rational::Rational;

pub(crate) use formats::cached_regex;

// ──────────────────────────────────────────────
// Writable type tags
// ──────────────────────────────────────────────

/// The closed set of writable type tags.
///
/// This is the stable enumeration exposed through the dictionary API; the
/// boundary never string-matches ad hoc tag names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WritableKind {
    Bool,
    Int,
    Str,
    Dollar,
    Rational,
    Day,
    Days,
    Enum,
    MultiEnum,
    Tin,
    Ein,
    IpPin,
    Pin,
    Phone,
    Email,
    Address,
    BankAccount,
    Collection,
}

impl WritableKind {
    pub const ALL: &'static [WritableKind] = &[
        WritableKind::Bool,
        WritableKind::Int,
        WritableKind::Str,
        WritableKind::Dollar,
        WritableKind::Rational,
        WritableKind::Day,
        WritableKind::Days,
        WritableKind::Enum,
        WritableKind::MultiEnum,
        WritableKind::Tin,
        WritableKind::Ein,
        WritableKind::IpPin,
        WritableKind::Pin,
        WritableKind::Phone,
        WritableKind::Email,
        WritableKind::Address,
        WritableKind::BankAccount,
        WritableKind::Collection,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            WritableKind::Bool => "Bool",
            WritableKind::Int => "Int",
            WritableKind::Str => "Str",
            WritableKind::Dollar => "Dollar",
            WritableKind::Rational => "Rational",
            WritableKind::Day => "Day",
            WritableKind::Days => "Days",
            WritableKind::Enum => "Enum",
            WritableKind::MultiEnum => "MultiEnum",
            WritableKind::Tin => "Tin",
            WritableKind::Ein => "Ein",
            WritableKind::IpPin => "IpPin",
            WritableKind::Pin => "Pin",
            WritableKind::Phone => "Phone",
            WritableKind::Email => "Email",
            WritableKind::Address => "Address",
            WritableKind::BankAccount => "BankAccount",
            WritableKind::Collection => "Collection",
        }
    }

    pub fn from_tag(tag: &str) -> Result<WritableKind, FactGraphError> {
        WritableKind::ALL
            .iter()
            .copied()
            .find(|k| k.tag() == tag)
            .ok_or_else(|| FactGraphError::parse(format!("unknown type tag '{}'", tag)))
    }
}

impl fmt::Display for WritableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ──────────────────────────────────────────────
// Value
// ──────────────────────────────────────────────

/// A typed runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Str(String),
    Dollar(Dollar),
    Rational(Rational),
    Day(Day),
    Days(i64),
    Enum(EnumValue),
    MultiEnum(MultiEnumValue),
    Tin(Tin),
    Ein(Ein),
    IpPin(IpPin),
    Pin(Pin),
    Phone(Phone),
    Email(Email),
    Address(Address),
    BankAccount(BankAccount),
    Collection(Collection),
}

impl Value {
    pub fn kind(&self) -> WritableKind {
        match self {
            Value::Bool(_) => WritableKind::Bool,
            Value::Int(_) => WritableKind::Int,
            Value::Str(_) => WritableKind::Str,
            Value::Dollar(_) => WritableKind::Dollar,
            Value::Rational(_) => WritableKind::Rational,
            Value::Day(_) => WritableKind::Day,
            Value::Days(_) => WritableKind::Days,
            Value::Enum(_) => WritableKind::Enum,
            Value::MultiEnum(_) => WritableKind::MultiEnum,
            Value::Tin(_) => WritableKind::Tin,
            Value::Ein(_) => WritableKind::Ein,
            Value::IpPin(_) => WritableKind::IpPin,
            Value::Pin(_) => WritableKind::Pin,
            Value::Phone(_) => WritableKind::Phone,
            Value::Email(_) => WritableKind::Email,
            Value::Address(_) => WritableKind::Address,
            Value::BankAccount(_) => WritableKind::BankAccount,
            Value::Collection(_) => WritableKind::Collection,
        }
    }

    /// Human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        self.kind().tag()
    }

    /// Re-run the intrinsic format invariants of the carried value.
    ///
    /// Construction already enforces these; persistence paths re-check after
    /// migrations have rewritten raw JSON.
    pub fn revalidate(&self) -> Result<(), FactGraphError> {
        match self {
            Value::Address(a) => a.validate(),
            Value::BankAccount(b) => b.validate(),
            _ => Ok(()),
        }
    }

    // ── plain JSON (boundary form) ──

    pub fn to_plain_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => json!(b),
            Value::Int(i) => json!(i),
            Value::Str(s) => json!(s),
            Value::Dollar(d) => json!(d.cents()),
            Value::Rational(r) => json!(r.to_string()),
            Value::Day(d) => json!(d.to_string()),
            Value::Days(n) => json!(n),
            Value::Enum(e) => json!(e.value()),
            Value::MultiEnum(m) => json!(m.values()),
            Value::Tin(t) => json!(t.as_str()),
            Value::Ein(e) => json!(e.as_str()),
            Value::IpPin(p) => json!(p.as_str()),
            Value::Pin(p) => json!(p.as_str()),
            Value::Phone(p) => json!(p.as_str()),
            Value::Email(e) => json!(e.as_str()),
            Value::Address(a) => a.to_json(),
            Value::BankAccount(b) => b.to_json(),
            Value::Collection(c) => json!(c.members()),
        }
    }

    /// Decode the plain boundary form against a declared writable type.
    ///
    /// `options_path` supplies the option-set binding for `Enum` and
    /// `MultiEnum`, which the plain form does not carry.
    pub fn from_plain_json(
        kind: WritableKind,
        options_path: Option<&str>,
        v: &serde_json::Value,
    ) -> Result<Value, FactGraphError> {
        let want_str = |v: &serde_json::Value| -> Result<String, FactGraphError> {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| FactGraphError::parse(format!("expected string, got {}", v)))
        };
        let want_options = || -> Result<String, FactGraphError> {
            options_path.map(str::to_string).ok_or_else(|| {
                FactGraphError::parse("enum value without a declared option set".to_string())
            })
        };
        match kind {
            WritableKind::Bool => v
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| FactGraphError::parse(format!("expected boolean, got {}", v))),
            WritableKind::Int => v
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map(Value::Int)
                .ok_or_else(|| FactGraphError::parse(format!("expected 32-bit integer, got {}", v))),
            WritableKind::Str => Ok(Value::Str(want_str(v)?)),
            WritableKind::Dollar => match v {
                serde_json::Value::Number(n) => n
                    .as_i64()
                    .map(|cents| Value::Dollar(Dollar::from_cents(cents)))
                    .ok_or_else(|| FactGraphError::parse(format!("expected cents, got {}", v))),
                serde_json::Value::String(s) => Ok(Value::Dollar(Dollar::parse(s)?)),
                _ => Err(FactGraphError::parse(format!("expected cents, got {}", v))),
            },
            WritableKind::Rational => Ok(Value::Rational(Rational::parse(&want_str(v)?)?)),
            WritableKind::Day => Ok(Value::Day(Day::parse(&want_str(v)?)?)),
            WritableKind::Days => v
                .as_i64()
                .map(Value::Days)
                .ok_or_else(|| FactGraphError::parse(format!("expected day count, got {}", v))),
            WritableKind::Enum => Ok(Value::Enum(EnumValue::new(want_options()?, want_str(v)?)?)),
            WritableKind::MultiEnum => {
                let arr = v
                    .as_array()
                    .ok_or_else(|| FactGraphError::parse(format!("expected array, got {}", v)))?;
                let values = arr
                    .iter()
                    .map(|e| want_str(e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::MultiEnum(MultiEnumValue::new(want_options()?, values)?))
            }
            WritableKind::Tin => Ok(Value::Tin(Tin::parse(&want_str(v)?)?)),
            WritableKind::Ein => Ok(Value::Ein(Ein::parse(&want_str(v)?)?)),
            WritableKind::IpPin => Ok(Value::IpPin(IpPin::parse(&want_str(v)?)?)),
            WritableKind::Pin => Ok(Value::Pin(Pin::parse(&want_str(v)?)?)),
            WritableKind::Phone => Ok(Value::Phone(Phone::parse(&want_str(v)?)?)),
            WritableKind::Email => Ok(Value::Email(Email::parse(&want_str(v)?)?)),
            WritableKind::Address => Ok(Value::Address(Address::from_json(v)?)),
            WritableKind::BankAccount => Ok(Value::BankAccount(BankAccount::from_json(v)?)),
            WritableKind::Collection => {
                let arr = v
                    .as_array()
                    .ok_or_else(|| FactGraphError::parse(format!("expected array, got {}", v)))?;
                let members = arr
                    .iter()
                    .map(|e| want_str(e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Collection(Collection::from_members(members)?))
            }
        }
    }

    // ── tagged JSON (persistence form) ──

    pub fn to_tagged_json(&self) -> serde_json::Value {
        let item = match self {
            // Enum values persist their option-set binding alongside the
            // chosen value; the plain form drops it.
            Value::Enum(e) => json!({ "options": e.options_path(), "value": e.value() }),
            Value::MultiEnum(m) => json!({ "options": m.options_path(), "values": m.values() }),
            other => other.to_plain_json(),
        };
        json!({ "$type": self.type_name(), "item": item })
    }

    pub fn from_tagged_json(v: &serde_json::Value) -> Result<Value, FactGraphError> {
        let tag = v
            .get("$type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| FactGraphError::parse("tagged value missing '$type'"))?;
        let kind = WritableKind::from_tag(tag)?;
        let item = v
            .get("item")
            .ok_or_else(|| FactGraphError::parse("tagged value missing 'item'"))?;
        match kind {
            WritableKind::Enum => {
                let options = item
                    .get("options")
                    .and_then(|o| o.as_str())
                    .ok_or_else(|| FactGraphError::parse("Enum item missing 'options'"))?;
                let value = item
                    .get("value")
                    .and_then(|o| o.as_str())
                    .ok_or_else(|| FactGraphError::parse("Enum item missing 'value'"))?;
                Ok(Value::Enum(EnumValue::new(options, value)?))
            }
            WritableKind::MultiEnum => {
                let options = item
                    .get("options")
                    .and_then(|o| o.as_str())
                    .ok_or_else(|| FactGraphError::parse("MultiEnum item missing 'options'"))?;
                let values = item
                    .get("values")
                    .and_then(|o| o.as_array())
                    .ok_or_else(|| FactGraphError::parse("MultiEnum item missing 'values'"))?
                    .iter()
                    .map(|e| {
                        e.as_str().map(str::to_string).ok_or_else(|| {
                            FactGraphError::parse("MultiEnum values must be strings")
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::MultiEnum(MultiEnumValue::new(options, values)?))
            }
            other => Value::from_plain_json(other, None, item),
        }
    }

    // ── accessors used by expression evaluation ──

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Value::Collection(c) => Some(c),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::Int(v)
    }
}

/// Bare 64-bit integers are day counts; dollar amounts go through [`Dollar`].
impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Days(v)
    }
}

impl From<Dollar> for Value {
    fn from(v: Dollar) -> Value {
        Value::Dollar(v)
    }
}

impl From<Rational> for Value {
    fn from(v: Rational) -> Value {
        Value::Rational(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl fmt::Display for Value {
    /// Canonical rendering, used by `Paste`/`AsString` and in traces.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => f.write_str(s),
            Value::Dollar(d) => write!(f, "{}", d),
            Value::Rational(r) => write!(f, "{}", r),
            Value::Day(d) => write!(f, "{}", d),
            Value::Days(n) => write!(f, "{}", n),
            Value::Enum(e) => write!(f, "{}", e),
            Value::MultiEnum(m) => write!(f, "{}", m),
            Value::Tin(t) => write!(f, "{}", t),
            Value::Ein(e) => write!(f, "{}", e),
            Value::IpPin(p) => write!(f, "{}", p),
            Value::Pin(p) => write!(f, "{}", p),
            Value::Phone(p) => write!(f, "{}", p),
            Value::Email(e) => write!(f, "{}", e),
            Value::Address(a) => write!(f, "{}", a),
            Value::BankAccount(b) => write!(f, "{}", b),
            Value::Collection(c) => write!(f, "{}", c),
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(v: Value) {
        let tagged = v.to_tagged_json();
        let back = Value::from_tagged_json(&tagged).unwrap();
        assert_eq!(v, back, "tagged roundtrip for {:?}", tagged);
    }

    #[test]
    fn tagged_roundtrips() {
        roundtrip(Value::Bool(true));
        roundtrip(Value::Int(-7));
        roundtrip(Value::Str("hello".into()));
        roundtrip(Value::Dollar(Dollar::from_cents(55_000)));
        roundtrip(Value::Rational(Rational::new(3, 4).unwrap()));
        roundtrip(Value::Day(Day::parse("2024-02-29").unwrap()));
        roundtrip(Value::Days(-30));
        roundtrip(Value::Enum(EnumValue::new("/opts", "single").unwrap()));
        roundtrip(Value::MultiEnum(
            MultiEnumValue::new("/opts", vec!["a".into(), "b".into()]).unwrap(),
        ));
        roundtrip(Value::Tin(Tin::parse("123-45-6789").unwrap()));
        roundtrip(Value::Phone(Phone::parse("415-555-0123").unwrap()));
        roundtrip(Value::Collection(
            Collection::from_members(vec!["a".into(), "b".into()]).unwrap(),
        ));
    }

    #[test]
    fn tagged_enum_keeps_option_binding() {
        let v = Value::Enum(EnumValue::new("/opts/filing", "single").unwrap());
        let tagged = v.to_tagged_json();
        assert_eq!(tagged["$type"], "Enum");
        assert_eq!(tagged["item"]["options"], "/opts/filing");
        assert_eq!(tagged["item"]["value"], "single");
    }

    #[test]
    fn plain_dollar_is_cents() {
        let v = Value::Dollar(Dollar::from_cents(50_000));
        assert_eq!(v.to_plain_json(), serde_json::json!(50_000));
        let back = Value::from_plain_json(WritableKind::Dollar, None, &serde_json::json!(50_000))
            .unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn plain_enum_requires_options_path() {
        let err = Value::from_plain_json(WritableKind::Enum, None, &serde_json::json!("single"));
        assert!(err.is_err());
        let ok = Value::from_plain_json(
            WritableKind::Enum,
            Some("/opts"),
            &serde_json::json!("single"),
        )
        .unwrap();
        assert_eq!(ok, Value::Enum(EnumValue::new("/opts", "single").unwrap()));
    }

    #[test]
    fn from_tag_rejects_unknown() {
        assert!(WritableKind::from_tag("DollarNode").is_err());
        assert_eq!(WritableKind::from_tag("Dollar").unwrap(), WritableKind::Dollar);
    }

    #[test]
    fn int_bounds_checked() {
        let too_big = serde_json::json!(i64::from(i32::MAX) + 1);
        assert!(Value::from_plain_json(WritableKind::Int, None, &too_big).is_err());
    }
}
