//! String operator semantics.

use crate::error::FactGraphError;
use crate::result::FactResult;
use crate::value::Value;

const MEF_NAME_LINE_LIMIT: usize = 35;

pub fn length(a: &Value) -> Result<FactResult<Value>, FactGraphError> {
    let n = match a {
        Value::Str(s) => s.chars().count(),
        Value::Collection(c) => c.len(),
        other => {
            return Err(FactGraphError::dictionary(format!(
                "Length cannot apply to {}",
                other.type_name()
            )));
        }
    };
    Ok(match i32::try_from(n) {
        Ok(n) => FactResult::Complete(Value::Int(n)),
        Err(_) => FactResult::Incomplete,
    })
}

/// Lossless string conversion shared by `Paste` and `AsString`.
pub fn as_string(a: &Value) -> Value {
    Value::Str(a.to_string())
}

/// Dollar to decimal string; other renderable values pass through their
/// canonical form.
pub fn as_decimal_string(a: &Value) -> Result<FactResult<Value>, FactGraphError> {
    match a {
        Value::Dollar(d) => Ok(FactResult::Complete(Value::Str(d.to_string()))),
        other => Err(FactGraphError::dictionary(format!(
            "AsDecimalString cannot apply to {}",
            other.type_name()
        ))),
    }
}

fn expect_str<'v>(op: &str, a: &'v Value) -> Result<&'v str, FactGraphError> {
    match a {
        Value::Str(s) => Ok(s),
        other => Err(FactGraphError::dictionary(format!(
            "{} cannot apply to {}",
            op,
            other.type_name()
        ))),
    }
}

pub fn trim(a: &Value) -> Result<FactResult<Value>, FactGraphError> {
    let s = expect_str("Trim", a)?;
    Ok(FactResult::Complete(Value::Str(s.trim().to_string())))
}

pub fn to_upper(a: &Value) -> Result<FactResult<Value>, FactGraphError> {
    let s = expect_str("ToUpper", a)?;
    Ok(FactResult::Complete(Value::Str(s.to_uppercase())))
}

pub fn strip_chars(value: &Value, chars: &Value) -> Result<FactResult<Value>, FactGraphError> {
    let s = expect_str("StripChars", value)?;
    let strip = expect_str("StripChars", chars)?;
    let out: String = s.chars().filter(|c| !strip.contains(*c)).collect();
    Ok(FactResult::Complete(Value::Str(out)))
}

/// Prepare a name for the 35-character MeF name line.
///
/// Uppercases, strips characters MeF rejects (keeping letters, digits,
/// hyphen, ampersand, and spaces), collapses runs of whitespace, then drops
/// middle tokens before hard-truncating so the surname survives when
/// possible.
pub fn truncate_name_for_mef(a: &Value) -> Result<FactResult<Value>, FactGraphError> {
    let s = expect_str("TruncateNameForMef", a)?;
    let cleaned: String = s
        .to_uppercase()
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '&'))
        .collect();
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();

    let joined_len =
        |tokens: &[&str]| tokens.iter().map(|t| t.len()).sum::<usize>() + tokens.len().saturating_sub(1);

    // Drop middle tokens (second, third, ...) until the line fits or only
    // first and last remain.
    while tokens.len() > 2 && joined_len(&tokens) > MEF_NAME_LINE_LIMIT {
        tokens.remove(1);
    }
    let mut out = tokens.join(" ");
    if out.len() > MEF_NAME_LINE_LIMIT {
        out.truncate(MEF_NAME_LINE_LIMIT);
        out = out.trim_end().to_string();
    }
    Ok(FactResult::Complete(Value::Str(out)))
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Collection, Dollar};

    #[test]
    fn length_counts_chars_and_members() {
        assert_eq!(
            length(&Value::Str("héllo".into())).unwrap(),
            FactResult::Complete(Value::Int(5))
        );
        let c = Collection::from_members(vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(
            length(&Value::Collection(c)).unwrap(),
            FactResult::Complete(Value::Int(2))
        );
        assert!(length(&Value::Int(1)).is_err());
    }

    #[test]
    fn decimal_string_renders_cents() {
        assert_eq!(
            as_decimal_string(&Value::Dollar(Dollar::from_cents(55_000))).unwrap(),
            FactResult::Complete(Value::Str("550.00".into()))
        );
    }

    #[test]
    fn strip_chars_removes_each_listed_char() {
        assert_eq!(
            strip_chars(&Value::Str("1-2-3".into()), &Value::Str("-".into())).unwrap(),
            FactResult::Complete(Value::Str("123".into()))
        );
    }

    #[test]
    fn mef_truncation_prefers_dropping_middle_names() {
        let long = Value::Str("Wolfgang Amadeus Theophilus Gottlieb Mozart".into());
        let out = truncate_name_for_mef(&long).unwrap();
        // "AMADEUS" is dropped first; the remaining tokens fit in 35 chars.
        assert_eq!(
            out,
            FactResult::Complete(Value::Str("WOLFGANG THEOPHILUS GOTTLIEB MOZART".into()))
        );
        let longer = Value::Str("Maximiliana Josepha Carolina von Habsburg-Lothringen".into());
        match truncate_name_for_mef(&longer).unwrap() {
            FactResult::Complete(Value::Str(s)) => assert!(s.len() <= 35),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn mef_truncation_strips_disallowed_chars() {
        let name = Value::Str("O'Brien, Jr.".into());
        assert_eq!(
            truncate_name_for_mef(&name).unwrap(),
            FactResult::Complete(Value::Str("OBRIEN JR".into()))
        );
    }

    #[test]
    fn mef_truncation_hard_limit() {
        let name = Value::Str("A".repeat(50));
        let out = truncate_name_for_mef(&name).unwrap();
        match out {
            FactResult::Complete(Value::Str(s)) => assert_eq!(s.len(), 35),
            other => panic!("unexpected {:?}", other),
        }
    }
}
