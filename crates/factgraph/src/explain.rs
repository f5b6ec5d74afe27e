//! Human-readable derivation traces.
//!
//! `explain` renders a fact, its evaluated result, and the expression tree
//! that produced it, recursing into dependency facts. Facts already shown
//! are referenced instead of re-expanded, so shared dependencies stay
//! readable.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::dictionary::FactSpec;
use crate::error::FactGraphError;
use crate::expr::Expr;
use crate::graph::Graph;
use crate::path::Path;
use crate::result::{FactResult, MaybeVector};
use crate::value::Value;

/// Render the derivation of the fact(s) at `path`.
pub fn explain(graph: &Graph, path: &str) -> Result<String, FactGraphError> {
    let parsed = Path::parse(path)?;
    if !parsed.is_absolute() {
        return Err(FactGraphError::parse(format!(
            "'{}': explain takes absolute paths",
            path
        )));
    }
    let mut out = String::new();
    let mut seen = HashSet::new();
    if parsed.is_abstract() {
        for concrete in expand_for_explain(graph, &parsed)? {
            render_fact(graph, &concrete, 0, &mut seen, &mut out)?;
        }
    } else {
        render_fact(graph, &parsed, 0, &mut seen, &mut out)?;
    }
    Ok(out)
}

fn expand_for_explain(graph: &Graph, path: &Path) -> Result<Vec<Path>, FactGraphError> {
    // get_vect validates the template; re-resolve the concrete paths by
    // populating against the same collection state.
    let mut members_by_position = Vec::new();
    let mut prefix = Path::root();
    for seg in path.segments() {
        if *seg == crate::path::Segment::Wildcard {
            let members = match graph.store().get(&prefix) {
                Some(Value::Collection(c)) => {
                    c.members().iter().cloned().collect::<Vec<String>>()
                }
                _ => Vec::new(),
            };
            members_by_position.push(members);
        }
        prefix = prefix.child(seg.clone());
    }
    path.populate(&members_by_position)
}

fn render_fact(
    graph: &Graph,
    path: &Path,
    indent: usize,
    seen: &mut HashSet<String>,
    out: &mut String,
) -> Result<(), FactGraphError> {
    let pad = "  ".repeat(indent);
    let key = path.to_string();
    let result = graph.result_for(path)?;
    if !seen.insert(key.clone()) {
        let _ = writeln!(out, "{}{} = {}  (shown above)", pad, key, fmt_vector(&result));
        return Ok(());
    }
    let def = graph
        .definition_for(path)
        .ok_or_else(|| FactGraphError::UnknownPath { path: key.clone() })?;
    match &def.spec {
        FactSpec::Writable(w) => {
            let source = if graph.store().get(path).is_some() {
                "set"
            } else if w.placeholder.is_some() {
                "placeholder"
            } else {
                "unset"
            };
            let _ = writeln!(
                out,
                "{}{} = {}  [writable {}, {}]",
                pad,
                key,
                fmt_vector(&result),
                w.kind.tag(),
                source
            );
        }
        FactSpec::Derived(expr) => {
            let _ = writeln!(out, "{}{} = {}", pad, key, fmt_vector(&result));
            render_expr(graph, expr, path, indent + 1, seen, out)?;
        }
    }
    Ok(())
}

fn render_expr(
    graph: &Graph,
    expr: &Expr,
    current: &Path,
    indent: usize,
    seen: &mut HashSet<String>,
    out: &mut String,
) -> Result<(), FactGraphError> {
    let pad = "  ".repeat(indent);
    match expr {
        Expr::Const(v) => {
            let _ = writeln!(out, "{}Const {}", pad, v);
        }
        Expr::Dep(path) => {
            let resolved = path.resolve(current)?;
            if resolved.is_abstract() {
                let _ = writeln!(out, "{}Dependency {}", pad, resolved);
                for concrete in expand_for_explain(graph, &resolved)? {
                    render_fact(graph, &concrete, indent + 1, seen, out)?;
                }
            } else {
                render_fact(graph, &resolved, indent, seen, out)?;
            }
        }
        other => {
            let _ = writeln!(out, "{}{}", pad, other.operator_name());
            for child in other.children() {
                render_expr(graph, child, current, indent + 1, seen, out)?;
            }
        }
    }
    Ok(())
}

fn fmt_result(r: &FactResult<Value>) -> String {
    match r {
        FactResult::Complete(v) => format!("Complete({})", v),
        FactResult::Placeholder(v) => format!("Placeholder({})", v),
        FactResult::Incomplete => "Incomplete".to_string(),
    }
}

fn fmt_vector(rv: &MaybeVector<FactResult<Value>>) -> String {
    match rv {
        MaybeVector::Single(r) => fmt_result(r),
        MaybeVector::Multiple { items, complete } => {
            let lanes: Vec<String> = items.iter().map(fmt_result).collect();
            format!(
                "[{}]{}",
                lanes.join(", "),
                if *complete { "" } else { " (partial)" }
            )
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{DictionaryBuilder, WritableSpec};
    use crate::store::Store;
    use crate::value::{Dollar, WritableKind};

    #[test]
    fn trace_shows_operator_and_dependencies() {
        let mut b = DictionaryBuilder::new();
        b.writable("/income", WritableSpec::of(WritableKind::Dollar))
            .unwrap();
        b.writable("/bonus", WritableSpec::of(WritableKind::Dollar))
            .unwrap();
        b.derived(
            "/total",
            Expr::Add(vec![
                Expr::Dep(Path::parse("/income").unwrap()),
                Expr::Dep(Path::parse("/bonus").unwrap()),
            ]),
        )
        .unwrap();
        let mut graph = Graph::new(b.freeze().unwrap(), Store::new());
        graph
            .set("/income", Value::Dollar(Dollar::from_cents(50_000)))
            .unwrap();

        let trace = graph.explain("/total").unwrap();
        assert!(trace.contains("/total = Incomplete"));
        assert!(trace.contains("Add"));
        assert!(trace.contains("/income = Complete(500.00)  [writable Dollar, set]"));
        assert!(trace.contains("/bonus = Incomplete  [writable Dollar, unset]"));
    }

    #[test]
    fn repeated_dependencies_are_referenced_once() {
        let mut b = DictionaryBuilder::new();
        b.writable("/x", WritableSpec::of(WritableKind::Int)).unwrap();
        b.derived(
            "/twice",
            Expr::Add(vec![
                Expr::Dep(Path::parse("/x").unwrap()),
                Expr::Dep(Path::parse("/x").unwrap()),
            ]),
        )
        .unwrap();
        let mut graph = Graph::new(b.freeze().unwrap(), Store::new());
        graph.set("/x", Value::Int(2)).unwrap();
        let trace = graph.explain("/twice").unwrap();
        assert!(trace.contains("(shown above)"));
    }
}
