//! Dictionary-on-disk loader.
//!
//! The engine consumes dictionaries through `DictionaryBuilder`; this module
//! is the file-format collaborator, reading a JSON document of fact
//! declarations and expression trees:
//!
//! ```json
//! {
//!   "facts": [
//!     { "path": "/income", "writable": { "type": "Dollar" } },
//!     { "path": "/total",
//!       "derived": { "op": "Add",
//!                    "args": [ { "dep": "/income" }, { "dep": "/bonus" } ] } }
//!   ]
//! }
//! ```
//!
//! Literal values inside `const` nodes use the engine's tagged form.

use std::sync::Arc;

use factgraph::{
    Dictionary, DictionaryBuilder, EnumOption, Expr, FactGraphError, FactMeta, LimitKind,
    LimitSpec, Path, Severity, Value, WritableKind, WritableSpec,
};

fn parse_err(message: impl Into<String>) -> FactGraphError {
    FactGraphError::Parse {
        message: message.into(),
    }
}

/// Parse a dictionary document and freeze it.
pub fn load_dictionary(raw: &str) -> Result<Arc<Dictionary>, FactGraphError> {
    let doc: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| parse_err(format!("bad dictionary JSON: {}", e)))?;
    let facts = doc
        .get("facts")
        .and_then(|f| f.as_array())
        .ok_or_else(|| parse_err("dictionary missing 'facts' array"))?;

    let mut builder = DictionaryBuilder::new();
    for fact in facts {
        let path = fact
            .get("path")
            .and_then(|p| p.as_str())
            .ok_or_else(|| parse_err("fact missing 'path'"))?;
        match (fact.get("writable"), fact.get("derived")) {
            (Some(w), None) => builder.writable(path, parse_writable(w)?)?,
            (None, Some(d)) => builder.derived(path, parse_expr(d)?)?,
            _ => {
                return Err(parse_err(format!(
                    "fact '{}' must have exactly one of 'writable' or 'derived'",
                    path
                )));
            }
        }
        let meta = FactMeta {
            name: fact.get("name").and_then(|v| v.as_str()).map(str::to_string),
            description: fact
                .get("description")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            exported: fact.get("exported").and_then(|v| v.as_bool()).unwrap_or(false),
        };
        if meta != FactMeta::default() {
            builder.set_meta(path, meta)?;
        }
    }
    builder.freeze()
}

fn parse_writable(w: &serde_json::Value) -> Result<WritableSpec, FactGraphError> {
    let kind_tag = w
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| parse_err("writable missing 'type'"))?;
    let mut spec = WritableSpec::of(WritableKind::from_tag(kind_tag)?);

    if let Some(options) = w.get("options").and_then(|o| o.as_str()) {
        spec = spec.with_options_path(Path::parse(options)?);
    }
    if let Some(placeholder) = w.get("placeholder") {
        spec = spec.with_placeholder(parse_expr(placeholder)?);
    }
    if let Some(limits) = w.get("limits").and_then(|l| l.as_array()) {
        for limit in limits {
            spec = spec.with_limit(parse_limit(limit)?);
        }
    }
    if let Some(overrides) = w.get("overrides").and_then(|o| o.as_array()) {
        for o in overrides {
            let when = o
                .get("when")
                .ok_or_else(|| parse_err("override missing 'when'"))?;
            let then = o
                .get("then")
                .ok_or_else(|| parse_err("override missing 'then'"))?;
            spec = spec.with_override(parse_expr(when)?, parse_expr(then)?);
        }
    }
    Ok(spec)
}

fn parse_limit(l: &serde_json::Value) -> Result<LimitSpec, FactGraphError> {
    let kind = match l.get("kind").and_then(|k| k.as_str()) {
        Some("Min") => LimitKind::Min,
        Some("Max") => LimitKind::Max,
        Some("MinLength") => LimitKind::MinLength,
        Some("MaxLength") => LimitKind::MaxLength,
        Some("MaxCollectionSize") => LimitKind::MaxCollectionSize,
        Some("Match") => LimitKind::Match,
        other => return Err(parse_err(format!("unknown limit kind {:?}", other))),
    };
    let severity = match l.get("severity").and_then(|s| s.as_str()) {
        None | Some("Error") => Severity::Error,
        Some("Warning") => Severity::Warning,
        Some(other) => return Err(parse_err(format!("unknown severity '{}'", other))),
    };
    let bound = l
        .get("bound")
        .ok_or_else(|| parse_err("limit missing 'bound'"))?;
    Ok(LimitSpec::new(kind, severity, parse_expr(bound)?))
}

/// Decode one expression node.
pub fn parse_expr(v: &serde_json::Value) -> Result<Expr, FactGraphError> {
    if let Some(dep) = v.get("dep").and_then(|d| d.as_str()) {
        return Ok(Expr::Dep(Path::parse(dep)?));
    }
    if let Some(c) = v.get("const") {
        return Ok(Expr::Const(Value::from_tagged_json(c)?));
    }
    let op = v
        .get("op")
        .and_then(|o| o.as_str())
        .ok_or_else(|| parse_err(format!("expression missing 'op': {}", v)))?;

    let args = || -> Result<Vec<Expr>, FactGraphError> {
        v.get("args")
            .and_then(|a| a.as_array())
            .ok_or_else(|| parse_err(format!("'{}' missing 'args'", op)))?
            .iter()
            .map(parse_expr)
            .collect()
    };
    let one = |name: &str| -> Result<Box<Expr>, FactGraphError> {
        let node = v
            .get(name)
            .ok_or_else(|| parse_err(format!("'{}' missing '{}'", op, name)))?;
        Ok(Box::new(parse_expr(node)?))
    };
    let unary = || -> Result<Box<Expr>, FactGraphError> {
        let list = args()?;
        match list.len() {
            1 => Ok(Box::new(list.into_iter().next().expect("len checked"))),
            n => Err(parse_err(format!("'{}' takes one argument, got {}", op, n))),
        }
    };
    let binary = || -> Result<(Box<Expr>, Box<Expr>), FactGraphError> {
        let list = args()?;
        if list.len() != 2 {
            return Err(parse_err(format!(
                "'{}' takes two arguments, got {}",
                op,
                list.len()
            )));
        }
        let mut iter = list.into_iter();
        Ok((
            Box::new(iter.next().expect("len checked")),
            Box::new(iter.next().expect("len checked")),
        ))
    };
    let cases = || -> Result<Vec<(Expr, Expr)>, FactGraphError> {
        v.get("cases")
            .and_then(|c| c.as_array())
            .ok_or_else(|| parse_err(format!("'{}' missing 'cases'", op)))?
            .iter()
            .map(|case| {
                let pair = case
                    .as_array()
                    .filter(|p| p.len() == 2)
                    .ok_or_else(|| parse_err("case must be a [condition, value] pair"))?;
                Ok((parse_expr(&pair[0])?, parse_expr(&pair[1])?))
            })
            .collect()
    };

    Ok(match op {
        "Switch" => Expr::Switch(cases()?),
        "ConditionalList" => Expr::ConditionalList(cases()?),
        "Add" => Expr::Add(args()?),
        "Multiply" => Expr::Multiply(args()?),
        "Subtract" => Expr::Subtract {
            minuend: one("minuend")?,
            subtrahends: v
                .get("subtrahends")
                .and_then(|s| s.as_array())
                .ok_or_else(|| parse_err("'Subtract' missing 'subtrahends'"))?
                .iter()
                .map(parse_expr)
                .collect::<Result<Vec<_>, _>>()?,
        },
        "Divide" => Expr::Divide {
            dividend: one("dividend")?,
            divisor: one("divisor")?,
        },
        "GreaterOf" => Expr::GreaterOf(args()?),
        "LesserOf" => Expr::LesserOf(args()?),
        "Maximum" => Expr::Maximum(unary()?),
        "Minimum" => Expr::Minimum(unary()?),
        "Round" => Expr::Round(unary()?),
        "RoundToInt" => Expr::RoundToInt(unary()?),
        "Ceiling" => Expr::Ceiling(unary()?),
        "Floor" => Expr::Floor(unary()?),
        "Not" => Expr::Not(unary()?),
        "All" => Expr::All(args()?),
        "Any" => Expr::Any(args()?),
        "Equal" => {
            let (a, b) = binary()?;
            Expr::Equal(a, b)
        }
        "NotEqual" => {
            let (a, b) = binary()?;
            Expr::NotEqual(a, b)
        }
        "GreaterThan" => {
            let (a, b) = binary()?;
            Expr::GreaterThan(a, b)
        }
        "GreaterOrEqual" => {
            let (a, b) = binary()?;
            Expr::GreaterOrEqual(a, b)
        }
        "LessThan" => {
            let (a, b) = binary()?;
            Expr::LessThan(a, b)
        }
        "LessOrEqual" => {
            let (a, b) = binary()?;
            Expr::LessOrEqual(a, b)
        }
        "Length" => Expr::Length(unary()?),
        "Paste" => Expr::Paste(args()?),
        "AsString" => Expr::AsString(unary()?),
        "AsDecimalString" => Expr::AsDecimalString(unary()?),
        "Trim" => Expr::Trim(unary()?),
        "ToUpper" => Expr::ToUpper(unary()?),
        "StripChars" => Expr::StripChars {
            value: one("value")?,
            chars: one("chars")?,
        },
        "TruncateNameForMef" => Expr::TruncateNameForMef(unary()?),
        "Today" => Expr::Today,
        "LastDayOfMonth" => Expr::LastDayOfMonth(unary()?),
        "AddPayrollMonths" => Expr::AddPayrollMonths {
            date: one("date")?,
            months: one("months")?,
        },
        "Count" => Expr::Count(unary()?),
        "CollectionSum" => Expr::CollectionSum(unary()?),
        "Filter" | "Find" => {
            let collection = v
                .get("collection")
                .and_then(|c| c.as_str())
                .ok_or_else(|| parse_err(format!("'{}' missing 'collection'", op)))?;
            let predicate = one("predicate")?;
            let collection = Path::parse(collection)?;
            if op == "Filter" {
                Expr::Filter {
                    collection,
                    predicate,
                }
            } else {
                Expr::Find {
                    collection,
                    predicate,
                }
            }
        }
        "IndexOf" => Expr::IndexOf {
            collection: one("collection")?,
            index: one("index")?,
        },
        "EnumOptions" => {
            let options = v
                .get("options")
                .and_then(|o| o.as_array())
                .ok_or_else(|| parse_err("'EnumOptions' missing 'options'"))?
                .iter()
                .map(|o| {
                    let value = o
                        .get("value")
                        .and_then(|s| s.as_str())
                        .ok_or_else(|| parse_err("option missing 'value'"))?
                        .to_string();
                    Ok(match o.get("when") {
                        Some(cond) => EnumOption::Conditional {
                            condition: parse_expr(cond)?,
                            value,
                        },
                        None => EnumOption::Static(value),
                    })
                })
                .collect::<Result<Vec<_>, FactGraphError>>()?;
            Expr::EnumOptions(options)
        }
        "EnumOptionsContains" => Expr::EnumOptionsContains {
            options: one("options")?,
            value: one("value")?,
        },
        "EnumOptionsSize" => Expr::EnumOptionsSize(unary()?),
        "IsComplete" => Expr::IsComplete(unary()?),
        other => return Err(parse_err(format!("unknown operator '{}'", other))),
    })
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use factgraph::{FactResult, Graph, Store};

    const SAMPLE: &str = r#"{
      "facts": [
        { "path": "/income", "writable": { "type": "Dollar" },
          "name": "Household income" },
        { "path": "/bonus", "writable": { "type": "Dollar" } },
        { "path": "/total",
          "derived": { "op": "Add",
                       "args": [ { "dep": "/income" }, { "dep": "/bonus" } ] } }
      ]
    }"#;

    #[test]
    fn loads_and_evaluates_a_dictionary_file() {
        let dict = load_dictionary(SAMPLE).unwrap();
        let mut graph = Graph::new(dict, Store::new());
        graph
            .set("/income", dict_value(50_000))
            .unwrap();
        graph.set("/bonus", dict_value(5_000)).unwrap();
        assert_eq!(
            graph.get("/total").unwrap(),
            FactResult::Complete(dict_value(55_000))
        );
    }

    fn dict_value(cents: i64) -> Value {
        Value::Dollar(factgraph::value::Dollar::from_cents(cents))
    }

    #[test]
    fn rejects_unknown_operators_and_malformed_facts() {
        let bad_op = r#"{ "facts": [
            { "path": "/x", "derived": { "op": "Frobnicate", "args": [] } } ] }"#;
        assert!(load_dictionary(bad_op).is_err());

        let both = r#"{ "facts": [
            { "path": "/x",
              "writable": { "type": "Int" },
              "derived": { "op": "Add", "args": [] } } ] }"#;
        assert!(load_dictionary(both).is_err());
    }

    #[test]
    fn parses_switch_limits_and_placeholders() {
        let raw = r#"{
          "facts": [
            { "path": "/age",
              "writable": {
                "type": "Int",
                "placeholder": { "const": { "$type": "Int", "item": 0 } },
                "limits": [
                  { "kind": "Min", "bound": { "const": { "$type": "Int", "item": 0 } } },
                  { "kind": "Max", "severity": "Warning",
                    "bound": { "const": { "$type": "Int", "item": 150 } } }
                ] } },
            { "path": "/label",
              "derived": { "op": "Switch", "cases": [
                [ { "op": "GreaterOrEqual",
                    "args": [ { "dep": "/age" },
                              { "const": { "$type": "Int", "item": 18 } } ] },
                  { "const": { "$type": "Str", "item": "adult" } } ],
                [ { "const": { "$type": "Bool", "item": true } },
                  { "const": { "$type": "Str", "item": "minor" } } ]
              ] } }
          ]
        }"#;
        let dict = load_dictionary(raw).unwrap();
        let graph = Graph::new(dict, Store::new());
        assert_eq!(
            graph.get("/label").unwrap(),
            FactResult::Placeholder(Value::Str("minor".into()))
        );
    }
}
