//! End-to-end scenarios over small hand-built dictionaries.
//!
//! Each test constructs a dictionary, drives the graph through the public
//! API, and checks results, completeness states, violations, and persisted
//! JSON.

use std::sync::Arc;

use factgraph::expr::EnumOption;
use factgraph::value::{Dollar, EnumValue};
use factgraph::{
    DictionaryBuilder, Expr, FactGraphError, FactResult, Graph, LimitKind, LimitSpec, Migration,
    MigrationRegistry, Path, Severity, Store, Value, WritableKind, WritableSpec,
};

fn p(s: &str) -> Path {
    Path::parse(s).unwrap()
}

fn dollar(cents: i64) -> Value {
    Value::Dollar(Dollar::from_cents(cents))
}

// ──────────────────────────────────────────────
// S1: derived sum over two writables
// ──────────────────────────────────────────────

fn income_dictionary() -> Arc<factgraph::Dictionary> {
    let mut b = DictionaryBuilder::new();
    b.writable("/income", WritableSpec::of(WritableKind::Dollar))
        .unwrap();
    b.writable("/bonus", WritableSpec::of(WritableKind::Dollar))
        .unwrap();
    b.derived(
        "/total",
        Expr::Add(vec![Expr::Dep(p("/income")), Expr::Dep(p("/bonus"))]),
    )
    .unwrap();
    b.freeze().unwrap()
}

#[test]
fn s1_sum_completes_then_loses_an_input() {
    let mut graph = Graph::new(income_dictionary(), Store::new());
    graph.set("/income", dollar(50_000)).unwrap();
    graph.set("/bonus", dollar(5_000)).unwrap();
    assert_eq!(graph.get("/total").unwrap(), FactResult::Complete(dollar(55_000)));

    graph.delete("/bonus").unwrap();
    assert_eq!(graph.get("/total").unwrap(), FactResult::Incomplete);
}

// ──────────────────────────────────────────────
// S2: collection sum with wildcard vectorization
// ──────────────────────────────────────────────

fn expenses_dictionary() -> Arc<factgraph::Dictionary> {
    let mut b = DictionaryBuilder::new();
    b.writable("/exp", WritableSpec::of(WritableKind::Collection))
        .unwrap();
    b.writable("/exp/*/amount", WritableSpec::of(WritableKind::Dollar))
        .unwrap();
    b.derived("/sum", Expr::CollectionSum(Box::new(Expr::Dep(p("/exp/*/amount")))))
        .unwrap();
    b.freeze().unwrap()
}

#[test]
fn s2_collection_sum_skips_incomplete_members() {
    let mut graph = Graph::new(expenses_dictionary(), Store::new());
    graph.add_member("/exp", "a").unwrap();
    graph.add_member("/exp", "b").unwrap();
    graph.set("/exp/#a/amount", dollar(100)).unwrap();
    graph.set("/exp/#b/amount", dollar(250)).unwrap();
    assert_eq!(graph.get("/sum").unwrap(), FactResult::Complete(dollar(350)));

    graph.add_member("/exp", "c").unwrap();
    assert_eq!(graph.get("/sum").unwrap(), FactResult::Complete(dollar(350)));

    let lanes = graph.get_vect("/exp/*/amount").unwrap();
    assert_eq!(lanes.len(), 3);
    assert_eq!(lanes.iter().filter(|r| !r.has_value()).count(), 1);
}

// ──────────────────────────────────────────────
// S3: switch over a placeholder-backed writable
// ──────────────────────────────────────────────

fn age_dictionary() -> Arc<factgraph::Dictionary> {
    let mut b = DictionaryBuilder::new();
    b.writable(
        "/age",
        WritableSpec::of(WritableKind::Int).with_placeholder(Expr::Const(Value::Int(0))),
    )
    .unwrap();
    b.derived(
        "/label",
        Expr::Switch(vec![
            (
                Expr::GreaterOrEqual(
                    Box::new(Expr::Dep(p("/age"))),
                    Box::new(Expr::Const(Value::Int(18))),
                ),
                Expr::Const(Value::Str("adult".into())),
            ),
            (
                Expr::Const(Value::Bool(true)),
                Expr::Const(Value::Str("minor".into())),
            ),
        ]),
    )
    .unwrap();
    b.freeze().unwrap()
}

#[test]
fn s3_placeholder_flows_through_switch() {
    let mut graph = Graph::new(age_dictionary(), Store::new());
    assert_eq!(graph.get("/age").unwrap(), FactResult::Placeholder(Value::Int(0)));
    assert_eq!(
        graph.get("/label").unwrap(),
        FactResult::Placeholder(Value::Str("minor".into()))
    );

    graph.set("/age", Value::Int(30)).unwrap();
    assert_eq!(graph.get("/age").unwrap(), FactResult::Complete(Value::Int(30)));
    assert_eq!(
        graph.get("/label").unwrap(),
        FactResult::Complete(Value::Str("adult".into()))
    );
}

// ──────────────────────────────────────────────
// S4: declared limits on set and save
// ──────────────────────────────────────────────

#[test]
fn s4_limit_violations_aggregate_without_blocking_the_write() {
    let mut b = DictionaryBuilder::new();
    b.writable(
        "/age",
        WritableSpec::of(WritableKind::Int)
            .with_limit(LimitSpec::errored(LimitKind::Min, Value::Int(0)))
            .with_limit(LimitSpec::errored(LimitKind::Max, Value::Int(150))),
    )
    .unwrap();
    let mut graph = Graph::new(b.freeze().unwrap(), Store::new());

    let outcome = graph.set("/age", Value::Int(200)).unwrap();
    assert!(!outcome.ok);
    assert_eq!(outcome.violations.len(), 1);
    assert_eq!(outcome.violations[0].limit, "Max");
    assert_eq!(outcome.violations[0].severity, Severity::Error);

    // The write landed anyway; save independently reports the aggregate.
    assert_eq!(graph.get("/age").unwrap(), FactResult::Complete(Value::Int(200)));
    let saved = graph.save().unwrap();
    assert!(!saved.ok);
    assert_eq!(saved.violations, outcome.violations);

    let ok = graph.set("/age", Value::Int(80)).unwrap();
    assert!(ok.ok && ok.violations.is_empty());
    assert!(graph.save().unwrap().ok);
}

// ──────────────────────────────────────────────
// S5: migration on load
// ──────────────────────────────────────────────

#[test]
fn s5_pending_migration_renames_on_load() {
    fn rename(facts: &mut serde_json::Map<String, serde_json::Value>) {
        factgraph::migration::rename_path(facts, "/old", "/new");
    }
    let registry = MigrationRegistry::new(vec![Migration {
        ordinal: 1,
        name: "rename-old-to-new",
        apply: rename,
    }])
    .unwrap();

    let mut b = DictionaryBuilder::new();
    b.writable("/new", WritableSpec::of(WritableKind::Dollar))
        .unwrap();
    let dict = b.freeze().unwrap();

    let blob = serde_json::json!({
        "facts": { "/old": { "$type": "Dollar", "item": 12_345 } },
        "migrations": 0,
    })
    .to_string();

    let graph = Graph::load(dict, &registry, &blob).unwrap();
    assert_eq!(graph.get("/new").unwrap(), FactResult::Complete(dollar(12_345)));

    let persisted: serde_json::Value = serde_json::from_str(&graph.to_json(false)).unwrap();
    assert_eq!(persisted["migrations"], 1);
    assert!(persisted["facts"].get("/old").is_none());
}

// ──────────────────────────────────────────────
// S6: vector length mismatch is fatal
// ──────────────────────────────────────────────

#[test]
fn s6_mismatched_wildcard_lengths_raise_shape_mismatch() {
    let mut b = DictionaryBuilder::new();
    b.writable("/a", WritableSpec::of(WritableKind::Collection))
        .unwrap();
    b.writable("/a/*/x", WritableSpec::of(WritableKind::Int))
        .unwrap();
    b.writable("/b", WritableSpec::of(WritableKind::Collection))
        .unwrap();
    b.writable("/b/*/y", WritableSpec::of(WritableKind::Int))
        .unwrap();
    b.derived(
        "/mismatch",
        Expr::Add(vec![Expr::Dep(p("/a/*/x")), Expr::Dep(p("/b/*/y"))]),
    )
    .unwrap();
    let mut graph = Graph::new(b.freeze().unwrap(), Store::new());
    for id in ["m", "n"] {
        graph.add_member("/a", id).unwrap();
        graph.set(&format!("/a/#{}/x", id), Value::Int(1)).unwrap();
    }
    for id in ["q", "r", "s"] {
        graph.add_member("/b", id).unwrap();
        graph.set(&format!("/b/#{}/y", id), Value::Int(1)).unwrap();
    }
    assert!(matches!(
        graph.get("/mismatch"),
        Err(FactGraphError::ShapeMismatch { left: 2, right: 3, .. })
    ));
}

// ──────────────────────────────────────────────
// Engine invariants
// ──────────────────────────────────────────────

/// Adding writables never reduces completeness.
#[test]
fn completeness_is_monotonic_in_the_store() {
    let dict = income_dictionary();
    let mut sparse = Graph::new(dict.clone(), Store::new());
    sparse.set("/income", dollar(100)).unwrap();
    assert_eq!(sparse.get("/total").unwrap(), FactResult::Incomplete);

    let mut fuller = Graph::new(dict, Store::new());
    fuller.set("/income", dollar(100)).unwrap();
    fuller.set("/bonus", dollar(1)).unwrap();
    assert!(fuller.get("/total").unwrap().is_complete());
}

/// Memoized reads match recomputation from a fresh
/// cache, before and after writes.
#[test]
fn cached_reads_equal_fresh_recomputation() {
    let dict = expenses_dictionary();
    let mut graph = Graph::new(dict.clone(), Store::new());
    graph.add_member("/exp", "a").unwrap();
    graph.set("/exp/#a/amount", dollar(75)).unwrap();

    let warm = graph.get("/sum").unwrap();
    let warm_again = graph.get("/sum").unwrap();
    let fresh = Graph::new(dict.clone(), graph.store().clone())
        .get("/sum")
        .unwrap();
    assert_eq!(warm, warm_again);
    assert_eq!(warm, fresh);

    graph.add_member("/exp", "b").unwrap();
    graph.set("/exp/#b/amount", dollar(25)).unwrap();
    let after_write = graph.get("/sum").unwrap();
    let fresh_after = Graph::new(dict, graph.store().clone()).get("/sum").unwrap();
    assert_eq!(after_write, fresh_after);
    assert_eq!(after_write, FactResult::Complete(dollar(100)));
}

/// Store JSON round-trips exactly.
#[test]
fn store_roundtrip_is_identity() {
    let mut graph = Graph::new(expenses_dictionary(), Store::new());
    graph.add_member("/exp", "a").unwrap();
    graph.set("/exp/#a/amount", dollar(42)).unwrap();
    let raw = graph.to_json(true);
    let reloaded = Store::from_json(&raw).unwrap();
    assert_eq!(&reloaded, graph.store());
}

/// Short-circuit combinators agree with the full fold whenever
/// every input is Complete, and stay decisive under Incomplete inputs.
#[test]
fn short_circuit_preserves_truth_and_completeness() {
    let mut b = DictionaryBuilder::new();
    b.writable("/p", WritableSpec::of(WritableKind::Bool)).unwrap();
    b.writable("/q", WritableSpec::of(WritableKind::Bool)).unwrap();
    b.derived("/all", Expr::All(vec![Expr::Dep(p("/p")), Expr::Dep(p("/q"))]))
        .unwrap();
    b.derived("/any", Expr::Any(vec![Expr::Dep(p("/p")), Expr::Dep(p("/q"))]))
        .unwrap();
    let dict = b.freeze().unwrap();

    // All inputs complete: agrees with the plain fold.
    for (pv, qv) in [(false, false), (false, true), (true, false), (true, true)] {
        let mut graph = Graph::new(dict.clone(), Store::new());
        graph.set("/p", Value::Bool(pv)).unwrap();
        graph.set("/q", Value::Bool(qv)).unwrap();
        assert_eq!(
            graph.get("/all").unwrap(),
            FactResult::Complete(Value::Bool(pv && qv))
        );
        assert_eq!(
            graph.get("/any").unwrap(),
            FactResult::Complete(Value::Bool(pv || qv))
        );
    }

    // A decisive first operand wins even when the second is unknown.
    let mut graph = Graph::new(dict, Store::new());
    graph.set("/p", Value::Bool(false)).unwrap();
    assert_eq!(
        graph.get("/all").unwrap(),
        FactResult::Complete(Value::Bool(false))
    );
    assert_eq!(graph.get("/any").unwrap(), FactResult::Incomplete);
}

/// The intrinsic membership limit accepts exactly the settable
/// option values, and never fires while the option set is still unknown.
#[test]
fn enum_membership_tracks_the_option_set() {
    let mut b = DictionaryBuilder::new();
    b.writable("/allowClosed", WritableSpec::of(WritableKind::Bool))
        .unwrap();
    b.derived(
        "/statusOptions",
        Expr::EnumOptions(vec![
            EnumOption::Static("open".into()),
            EnumOption::Conditional {
                condition: Expr::Dep(p("/allowClosed")),
                value: "closed".into(),
            },
        ]),
    )
    .unwrap();
    b.writable(
        "/status",
        WritableSpec::of(WritableKind::Enum).with_options_path(p("/statusOptions")),
    )
    .unwrap();
    let dict = b.freeze().unwrap();

    // Option set not fully enumerated: no violation yet.
    let mut graph = Graph::new(dict.clone(), Store::new());
    let chosen = Value::Enum(EnumValue::new("/statusOptions", "closed").unwrap());
    let outcome = graph.set("/status", chosen.clone()).unwrap();
    assert!(outcome.ok, "unknown option set must not report violations");

    // Enumerated and excluded: violation.
    graph.set("/allowClosed", Value::Bool(false)).unwrap();
    let saved = graph.save().unwrap();
    assert!(!saved.ok);
    assert_eq!(saved.violations[0].limit, "EnumMembership");

    // Enumerated and included: clean.
    graph.set("/allowClosed", Value::Bool(true)).unwrap();
    assert!(graph.save().unwrap().ok);

    // A value that can be set never violates (the "open" option is static).
    let mut graph = Graph::new(dict, Store::new());
    let open = Value::Enum(EnumValue::new("/statusOptions", "open").unwrap());
    assert!(graph.set("/status", open).unwrap().ok);
}

// ──────────────────────────────────────────────
// Additional coverage: overrides, filter/find, member-scoped derivations
// ──────────────────────────────────────────────

#[test]
fn overrides_shadow_stored_values_and_placeholders() {
    let mut b = DictionaryBuilder::new();
    b.writable("/locked", WritableSpec::of(WritableKind::Bool))
        .unwrap();
    b.writable(
        "/amount",
        WritableSpec::of(WritableKind::Dollar)
            .with_placeholder(Expr::Const(dollar(0)))
            .with_override(Expr::Dep(p("/locked")), Expr::Const(dollar(99_900))),
    )
    .unwrap();
    let mut graph = Graph::new(b.freeze().unwrap(), Store::new());

    assert_eq!(graph.get("/amount").unwrap(), FactResult::Placeholder(dollar(0)));
    graph.set("/amount", dollar(123)).unwrap();
    assert_eq!(graph.get("/amount").unwrap(), FactResult::Complete(dollar(123)));

    graph.set("/locked", Value::Bool(true)).unwrap();
    assert_eq!(graph.get("/amount").unwrap(), FactResult::Complete(dollar(99_900)));

    graph.set("/locked", Value::Bool(false)).unwrap();
    assert_eq!(graph.get("/amount").unwrap(), FactResult::Complete(dollar(123)));
}

#[test]
fn filter_and_find_evaluate_predicates_per_member() {
    let mut b = DictionaryBuilder::new();
    b.writable("/exp", WritableSpec::of(WritableKind::Collection))
        .unwrap();
    b.writable("/exp/*/amount", WritableSpec::of(WritableKind::Dollar))
        .unwrap();
    b.derived(
        "/big",
        Expr::Filter {
            collection: p("/exp"),
            predicate: Box::new(Expr::GreaterThan(
                Box::new(Expr::Dep(p("amount"))),
                Box::new(Expr::Const(dollar(100))),
            )),
        },
    )
    .unwrap();
    b.derived(
        "/firstBig",
        Expr::Find {
            collection: p("/exp"),
            predicate: Box::new(Expr::GreaterThan(
                Box::new(Expr::Dep(p("amount"))),
                Box::new(Expr::Const(dollar(100))),
            )),
        },
    )
    .unwrap();
    let mut graph = Graph::new(b.freeze().unwrap(), Store::new());
    for (id, cents) in [("a", 50), ("b", 150), ("c", 500)] {
        graph.add_member("/exp", id).unwrap();
        graph.set(&format!("/exp/#{}/amount", id), dollar(cents)).unwrap();
    }

    match graph.get("/big").unwrap() {
        FactResult::Complete(Value::Collection(c)) => {
            assert_eq!(c.members(), &["b", "c"]);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        graph.get("/firstBig").unwrap(),
        FactResult::Complete(Value::Str("b".into()))
    );
}

#[test]
fn member_scoped_derivations_resolve_relative_paths() {
    let mut b = DictionaryBuilder::new();
    b.writable("/exp", WritableSpec::of(WritableKind::Collection))
        .unwrap();
    b.writable("/exp/*/amount", WritableSpec::of(WritableKind::Dollar))
        .unwrap();
    b.derived(
        "/exp/*/half",
        Expr::Divide {
            dividend: Box::new(Expr::Dep(p("../amount"))),
            divisor: Box::new(Expr::Const(Value::Int(2))),
        },
    )
    .unwrap();
    let mut graph = Graph::new(b.freeze().unwrap(), Store::new());
    graph.add_member("/exp", "a").unwrap();
    graph.set("/exp/#a/amount", dollar(101)).unwrap();
    // 50.5 cents rounds half-to-even.
    assert_eq!(graph.get("/exp/#a/half").unwrap(), FactResult::Complete(dollar(50)));
}

#[test]
fn removing_a_member_shrinks_every_dependent_vector() {
    let mut graph = Graph::new(expenses_dictionary(), Store::new());
    graph.add_member("/exp", "a").unwrap();
    graph.add_member("/exp", "b").unwrap();
    graph.set("/exp/#a/amount", dollar(10)).unwrap();
    graph.set("/exp/#b/amount", dollar(20)).unwrap();
    assert_eq!(graph.get("/sum").unwrap(), FactResult::Complete(dollar(30)));

    graph.remove_member("/exp", "a").unwrap();
    assert_eq!(graph.get("/sum").unwrap(), FactResult::Complete(dollar(20)));
    assert_eq!(graph.get_vect("/exp/*/amount").unwrap().len(), 1);
}
