//! Expression forcing.
//!
//! Evaluation is driven by an explicit [`EvalContext`]: the graph plus the
//! concrete path of the owning fact. Relative `Dep` paths resolve against
//! that path, so one shared expression tree serves every instantiation of an
//! abstract fact.

use crate::error::FactGraphError;
use crate::expr::{arith, strings, EnumOption, Expr};
use crate::graph::Graph;
use crate::path::{Path, Segment};
use crate::result::{vectorize1, vectorize2, vectorize_list, zip2, FactResult, MaybeVector};
use crate::value::{Collection, Value};

/// Per-lane evaluation outcome.
pub type ResultVector = MaybeVector<FactResult<Value>>;

/// Evaluation context: the graph and the owning fact instance.
pub struct EvalContext<'g> {
    pub graph: &'g Graph,
    /// Concrete path of the fact whose expression is being forced.
    pub current: Path,
}

impl<'g> EvalContext<'g> {
    pub fn new(graph: &'g Graph, current: Path) -> EvalContext<'g> {
        EvalContext { graph, current }
    }

    fn rebased(&self, current: Path) -> EvalContext<'g> {
        EvalContext {
            graph: self.graph,
            current,
        }
    }
}

fn single(r: FactResult<Value>) -> ResultVector {
    MaybeVector::Single(r)
}

/// Unwrap a result that must be singular; a vector here is a dictionary bug
/// (a scalar position fed by an unaggregated wildcard).
fn expect_single(op: &str, rv: ResultVector) -> Result<FactResult<Value>, FactGraphError> {
    let len = rv.len();
    rv.into_single().ok_or_else(|| FactGraphError::ShapeMismatch {
        operator: op.to_string(),
        left: 1,
        right: len,
    })
}

fn expect_bool(op: &str, r: &FactResult<Value>) -> Result<FactResult<bool>, FactGraphError> {
    match r {
        FactResult::Incomplete => Ok(FactResult::Incomplete),
        FactResult::Complete(v) | FactResult::Placeholder(v) => match v.as_bool() {
            Some(b) => Ok(if r.is_complete() {
                FactResult::Complete(b)
            } else {
                FactResult::Placeholder(b)
            }),
            None => Err(FactGraphError::dictionary(format!(
                "{} condition is {}, not Bool",
                op,
                v.type_name()
            ))),
        },
    }
}

/// Force an expression in a context, producing one result per lane.
pub fn force(expr: &Expr, ctx: &EvalContext) -> Result<ResultVector, FactGraphError> {
    match expr {
        // ── leaves ──
        Expr::Const(v) => Ok(single(FactResult::Complete(v.clone()))),
        Expr::Dep(path) => ctx.graph.dep(path, &ctx.current),
        Expr::Today => Ok(single(FactResult::Complete(Value::Day(ctx.graph.today())))),

        // ── control ──
        Expr::Switch(cases) => eval_switch(cases, ctx),
        Expr::ConditionalList(cases) => eval_conditional_list(cases, ctx),

        // ── arithmetic ──
        Expr::Add(args) => fold_binary("Add", args, ctx, arith::add),
        Expr::Multiply(args) => fold_binary("Multiply", args, ctx, arith::multiply),
        Expr::Subtract {
            minuend,
            subtrahends,
        } => {
            let mut acc = force(minuend, ctx)?;
            for s in subtrahends {
                let rhs = force(s, ctx)?;
                acc = vectorize2("Subtract", acc, rhs, |a, b| arith::subtract(a, b))?;
            }
            Ok(acc)
        }
        Expr::Divide { dividend, divisor } => {
            let a = force(dividend, ctx)?;
            let b = force(divisor, ctx)?;
            vectorize2("Divide", a, b, |a, b| arith::divide(a, b))
        }
        Expr::GreaterOf(args) => fold_binary("GreaterOf", args, ctx, pick_extreme(true)),
        Expr::LesserOf(args) => fold_binary("LesserOf", args, ctx, pick_extreme(false)),
        Expr::Maximum(arg) => aggregate_extreme("Maximum", force(arg, ctx)?, true),
        Expr::Minimum(arg) => aggregate_extreme("Minimum", force(arg, ctx)?, false),
        Expr::Round(arg) => vectorize1("Round", force(arg, ctx)?, |v| arith::round(v)),
        Expr::RoundToInt(arg) => {
            vectorize1("RoundToInt", force(arg, ctx)?, |v| arith::round_to_int(v))
        }
        Expr::Ceiling(arg) => vectorize1("Ceiling", force(arg, ctx)?, |v| arith::ceiling(v)),
        Expr::Floor(arg) => vectorize1("Floor", force(arg, ctx)?, |v| arith::floor(v)),

        // ── logic ──
        Expr::Not(arg) => vectorize1("Not", force(arg, ctx)?, |v| match v.as_bool() {
            Some(b) => Ok(FactResult::Complete(Value::Bool(!b))),
            None => Err(FactGraphError::dictionary(format!(
                "Not cannot apply to {}",
                v.type_name()
            ))),
        }),
        Expr::All(args) => short_circuit("All", args, ctx, false),
        Expr::Any(args) => short_circuit("Any", args, ctx, true),
        Expr::Equal(a, b) => binary_equal("Equal", a, b, ctx, false),
        Expr::NotEqual(a, b) => binary_equal("NotEqual", a, b, ctx, true),
        Expr::GreaterThan(a, b) => binary_ordered("GreaterThan", a, b, ctx, |o| o.is_gt()),
        Expr::GreaterOrEqual(a, b) => binary_ordered("GreaterOrEqual", a, b, ctx, |o| o.is_ge()),
        Expr::LessThan(a, b) => binary_ordered("LessThan", a, b, ctx, |o| o.is_lt()),
        Expr::LessOrEqual(a, b) => binary_ordered("LessOrEqual", a, b, ctx, |o| o.is_le()),

        // ── strings ──
        Expr::Length(arg) => vectorize1("Length", force(arg, ctx)?, |v| strings::length(v)),
        Expr::Paste(args) => {
            let forced = args
                .iter()
                .map(|a| force(a, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            vectorize_list("Paste", &forced, |vals| {
                let mut out = String::new();
                for v in vals {
                    out.push_str(&v.to_string());
                }
                Ok(FactResult::Complete(Value::Str(out)))
            })
        }
        Expr::AsString(arg) => vectorize1("AsString", force(arg, ctx)?, |v| {
            Ok(FactResult::Complete(strings::as_string(v)))
        }),
        Expr::AsDecimalString(arg) => vectorize1("AsDecimalString", force(arg, ctx)?, |v| {
            strings::as_decimal_string(v)
        }),
        Expr::Trim(arg) => vectorize1("Trim", force(arg, ctx)?, |v| strings::trim(v)),
        Expr::ToUpper(arg) => vectorize1("ToUpper", force(arg, ctx)?, |v| strings::to_upper(v)),
        Expr::StripChars { value, chars } => {
            let v = force(value, ctx)?;
            let c = force(chars, ctx)?;
            vectorize2("StripChars", v, c, |v, c| strings::strip_chars(v, c))
        }
        Expr::TruncateNameForMef(arg) => {
            vectorize1("TruncateNameForMef", force(arg, ctx)?, |v| {
                strings::truncate_name_for_mef(v)
            })
        }

        // ── dates ──
        Expr::LastDayOfMonth(arg) => vectorize1("LastDayOfMonth", force(arg, ctx)?, |v| match v {
            Value::Day(d) => Ok(FactResult::Complete(Value::Day(d.last_day_of_month()))),
            other => Err(FactGraphError::dictionary(format!(
                "LastDayOfMonth cannot apply to {}",
                other.type_name()
            ))),
        }),
        Expr::AddPayrollMonths { date, months } => {
            let d = force(date, ctx)?;
            let m = force(months, ctx)?;
            vectorize2("AddPayrollMonths", d, m, |d, m| match (d, m) {
                (Value::Day(d), Value::Int(n)) => Ok(match d.add_payroll_months(*n) {
                    Some(day) => FactResult::Complete(Value::Day(day)),
                    None => FactResult::Incomplete,
                }),
                (d, m) => Err(FactGraphError::dictionary(format!(
                    "AddPayrollMonths expects Day and Int, got {} and {}",
                    d.type_name(),
                    m.type_name()
                ))),
            })
        }

        // ── collections ──
        Expr::Count(arg) => eval_count(force(arg, ctx)?),
        Expr::CollectionSum(arg) => eval_collection_sum(force(arg, ctx)?),
        Expr::Filter {
            collection,
            predicate,
        } => eval_filter(collection, predicate, ctx, FilterMode::All),
        Expr::Find {
            collection,
            predicate,
        } => eval_filter(collection, predicate, ctx, FilterMode::First),
        Expr::IndexOf { collection, index } => {
            let c = expect_single("IndexOf", force(collection, ctx)?)?;
            let i = expect_single("IndexOf", force(index, ctx)?)?;
            let lane = [&c, &i];
            let mut demote = false;
            for r in lane {
                match r {
                    FactResult::Incomplete => return Ok(single(FactResult::Incomplete)),
                    FactResult::Placeholder(_) => demote = true,
                    FactResult::Complete(_) => {}
                }
            }
            let out = match (c.value(), i.value()) {
                (Some(Value::Collection(c)), Some(Value::Int(i))) => {
                    match usize::try_from(*i).ok().and_then(|i| c.get(i)) {
                        Some(id) => FactResult::Complete(Value::Str(id.to_string())),
                        None => FactResult::Incomplete,
                    }
                }
                (Some(c), Some(i)) => {
                    return Err(FactGraphError::dictionary(format!(
                        "IndexOf expects Collection and Int, got {} and {}",
                        c.type_name(),
                        i.type_name()
                    )));
                }
                _ => unreachable!("Incomplete handled above"),
            };
            Ok(single(if demote {
                out.demote_to_placeholder()
            } else {
                out
            }))
        }
        Expr::EnumOptions(options) => eval_enum_options(options, ctx),
        Expr::EnumOptionsContains { options, value } => {
            let opts = force(options, ctx)?;
            let target = expect_single("EnumOptionsContains", force(value, ctx)?)?;
            eval_options_contains(opts, target)
        }
        Expr::EnumOptionsSize(arg) => {
            let (lanes, enumerated) = match force(arg, ctx)? {
                MaybeVector::Single(r) => (vec![r], true),
                MaybeVector::Multiple { items, complete } => (items, complete),
            };
            let known = lanes.iter().filter(|r| r.has_value()).count();
            let complete = enumerated && lanes.iter().all(|r| r.is_complete());
            let n = i32::try_from(known).unwrap_or(i32::MAX);
            Ok(single(if complete {
                FactResult::Complete(Value::Int(n))
            } else {
                FactResult::Placeholder(Value::Int(n))
            }))
        }

        // ── introspection ──
        Expr::IsComplete(arg) => {
            let rv = force(arg, ctx)?;
            let b = match &rv {
                MaybeVector::Single(r) => r.is_complete(),
                MaybeVector::Multiple { items, complete } => {
                    *complete && items.iter().all(|r| r.is_complete())
                }
            };
            Ok(single(FactResult::Complete(Value::Bool(b))))
        }
    }
}

// ──────────────────────────────────────────────
// Control
// ──────────────────────────────────────────────

/// Branches are tried in declaration order. A `Complete(true)` condition
/// selects its branch; an `Incomplete` condition stops the scan (an earlier
/// unknown can decide the result); placeholder conditions participate but
/// demote whatever the expression produces.
fn eval_switch(cases: &[(Expr, Expr)], ctx: &EvalContext) -> Result<ResultVector, FactGraphError> {
    let mut demote = false;
    for (condition, branch) in cases {
        let cond = expect_single("Switch", force(condition, ctx)?)?;
        match expect_bool("Switch", &cond)? {
            FactResult::Incomplete => return Ok(single(FactResult::Incomplete)),
            FactResult::Complete(true) => {
                let out = force(branch, ctx)?;
                return Ok(if demote {
                    out.map(FactResult::demote_to_placeholder)
                } else {
                    out
                });
            }
            FactResult::Placeholder(true) => {
                let out = force(branch, ctx)?;
                return Ok(out.map(FactResult::demote_to_placeholder));
            }
            FactResult::Complete(false) => {}
            FactResult::Placeholder(false) => demote = true,
        }
    }
    Ok(single(FactResult::Incomplete))
}

/// The values of every branch whose condition holds, in declaration order.
/// Unknown conditions exclude their branch and mark the vector as not fully
/// enumerated.
fn eval_conditional_list(
    cases: &[(Expr, Expr)],
    ctx: &EvalContext,
) -> Result<ResultVector, FactGraphError> {
    let mut items = Vec::new();
    let mut complete = true;
    for (condition, branch) in cases {
        let cond = expect_single("ConditionalList", force(condition, ctx)?)?;
        match expect_bool("ConditionalList", &cond)? {
            FactResult::Complete(true) => {
                items.push(expect_single("ConditionalList", force(branch, ctx)?)?);
            }
            FactResult::Placeholder(true) => {
                let lane = expect_single("ConditionalList", force(branch, ctx)?)?;
                items.push(lane.demote_to_placeholder());
            }
            FactResult::Complete(false) => {}
            FactResult::Placeholder(false) | FactResult::Incomplete => complete = false,
        }
    }
    Ok(MaybeVector::multiple(items, complete))
}

// ──────────────────────────────────────────────
// Arithmetic folds
// ──────────────────────────────────────────────

type BinaryOp = fn(&Value, &Value) -> Result<FactResult<Value>, FactGraphError>;

fn fold_binary(
    op: &str,
    args: &[Expr],
    ctx: &EvalContext,
    f: BinaryOp,
) -> Result<ResultVector, FactGraphError> {
    let mut iter = args.iter();
    let first = iter.next().ok_or_else(|| {
        FactGraphError::dictionary(format!("{} needs at least one operand", op))
    })?;
    let mut acc = force(first, ctx)?;
    for arg in iter {
        let rhs = force(arg, ctx)?;
        acc = vectorize2(op, acc, rhs, |a, b| f(a, b))?;
    }
    Ok(acc)
}

fn pick_extreme(greater: bool) -> BinaryOp {
    if greater {
        |a, b| match arith::compare(a, b) {
            Some(ord) => Ok(FactResult::Complete(if ord.is_ge() {
                a.clone()
            } else {
                b.clone()
            })),
            None => Err(FactGraphError::dictionary(format!(
                "GreaterOf cannot order {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        }
    } else {
        |a, b| match arith::compare(a, b) {
            Some(ord) => Ok(FactResult::Complete(if ord.is_le() {
                a.clone()
            } else {
                b.clone()
            })),
            None => Err(FactGraphError::dictionary(format!(
                "LesserOf cannot order {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        }
    }
}

/// Largest/smallest element of a vector operand. Elements without a value
/// are skipped; placeholder elements and incomplete enumeration demote.
fn aggregate_extreme(
    op: &str,
    rv: ResultVector,
    greater: bool,
) -> Result<ResultVector, FactGraphError> {
    let (lanes, enumerated) = match rv {
        MaybeVector::Single(r) => (vec![r], true),
        MaybeVector::Multiple { items, complete } => (items, complete),
    };
    let mut best: Option<Value> = None;
    let mut demote = !enumerated;
    for lane in lanes {
        match lane {
            FactResult::Incomplete => demote = true,
            FactResult::Placeholder(v) => {
                demote = true;
                best = Some(pick_best(op, best, v, greater)?);
            }
            FactResult::Complete(v) => {
                best = Some(pick_best(op, best, v, greater)?);
            }
        }
    }
    Ok(single(match best {
        None => FactResult::Incomplete,
        Some(v) if demote => FactResult::Placeholder(v),
        Some(v) => FactResult::Complete(v),
    }))
}

fn pick_best(
    op: &str,
    best: Option<Value>,
    candidate: Value,
    greater: bool,
) -> Result<Value, FactGraphError> {
    match best {
        None => Ok(candidate),
        Some(b) => match arith::compare(&candidate, &b) {
            Some(ord) if (greater && ord.is_gt()) || (!greater && ord.is_lt()) => Ok(candidate),
            Some(_) => Ok(b),
            None => Err(FactGraphError::dictionary(format!(
                "{} cannot order {} and {}",
                op,
                candidate.type_name(),
                b.type_name()
            ))),
        },
    }
}

// ──────────────────────────────────────────────
// Logic
// ──────────────────────────────────────────────

/// Kleene conjunction/disjunction over completeness-tagged booleans.
/// `decisive` is the value that settles the result (`false` for All,
/// `true` for Any).
fn kleene(
    a: &FactResult<Value>,
    b: &FactResult<Value>,
    decisive: bool,
) -> Result<FactResult<Value>, FactGraphError> {
    let as_bool = |r: &FactResult<Value>| -> Result<FactResult<bool>, FactGraphError> {
        expect_bool(if decisive { "Any" } else { "All" }, r)
    };
    let (x, y) = (as_bool(a)?, as_bool(b)?);
    // A Complete decisive operand settles the lane regardless of the other.
    for r in [&x, &y] {
        if let FactResult::Complete(v) = r {
            if *v == decisive {
                return Ok(FactResult::Complete(Value::Bool(decisive)));
            }
        }
    }
    for r in [&x, &y] {
        if let FactResult::Placeholder(v) = r {
            if *v == decisive {
                return Ok(FactResult::Placeholder(Value::Bool(decisive)));
            }
        }
    }
    if matches!(x, FactResult::Incomplete) || matches!(y, FactResult::Incomplete) {
        return Ok(FactResult::Incomplete);
    }
    // Both lanes carry the non-decisive value.
    Ok(if x.is_complete() && y.is_complete() {
        FactResult::Complete(Value::Bool(!decisive))
    } else {
        FactResult::Placeholder(Value::Bool(!decisive))
    })
}

fn short_circuit(
    op: &str,
    args: &[Expr],
    ctx: &EvalContext,
    decisive: bool,
) -> Result<ResultVector, FactGraphError> {
    let mut acc = single(FactResult::Complete(Value::Bool(!decisive)));
    for arg in args {
        let rhs = force(arg, ctx)?;
        acc = zip2(op, acc, rhs, |a, b| kleene(a, b, decisive))?;
        // Stop once every lane is settled by a Complete decisive value.
        let settled = |r: &FactResult<Value>| {
            matches!(r, FactResult::Complete(Value::Bool(b)) if *b == decisive)
        };
        let done = match &acc {
            MaybeVector::Single(r) => settled(r),
            MaybeVector::Multiple { items, .. } => items.iter().all(settled),
        };
        if done {
            break;
        }
    }
    Ok(acc)
}

fn binary_equal(
    op: &str,
    a: &Expr,
    b: &Expr,
    ctx: &EvalContext,
    negate: bool,
) -> Result<ResultVector, FactGraphError> {
    let x = force(a, ctx)?;
    let y = force(b, ctx)?;
    vectorize2(op, x, y, |a, b| {
        let eq = arith::values_equal(a, b)?;
        Ok(FactResult::Complete(Value::Bool(eq != negate)))
    })
}

fn binary_ordered(
    op: &'static str,
    a: &Expr,
    b: &Expr,
    ctx: &EvalContext,
    accept: fn(std::cmp::Ordering) -> bool,
) -> Result<ResultVector, FactGraphError> {
    let x = force(a, ctx)?;
    let y = force(b, ctx)?;
    vectorize2(op, x, y, |a, b| arith::ordered(op, a, b, accept))
}

// ──────────────────────────────────────────────
// Collections
// ──────────────────────────────────────────────

/// `Count` over a vector counts its `Complete` elements; over a collection
/// value it counts members. Unknown enumeration demotes.
fn eval_count(rv: ResultVector) -> Result<ResultVector, FactGraphError> {
    match rv {
        MaybeVector::Single(r) => Ok(single(r.and_then(|v| match v.as_collection() {
            Some(c) => match i32::try_from(c.len()) {
                Ok(n) => FactResult::Complete(Value::Int(n)),
                Err(_) => FactResult::Incomplete,
            },
            None => FactResult::Incomplete,
        }))),
        MaybeVector::Multiple { items, complete } => {
            let n = items.iter().filter(|r| r.is_complete()).count();
            let n = i32::try_from(n).unwrap_or(i32::MAX);
            Ok(single(if complete {
                FactResult::Complete(Value::Int(n))
            } else {
                FactResult::Placeholder(Value::Int(n))
            }))
        }
    }
}

/// Element-type sum. `Incomplete` elements are skipped; placeholder
/// elements and unknown enumeration demote the result. An empty sum is the
/// additive identity, promoted by downstream arithmetic.
fn eval_collection_sum(rv: ResultVector) -> Result<ResultVector, FactGraphError> {
    let (lanes, enumerated) = match rv {
        MaybeVector::Single(r) => (vec![r], true),
        MaybeVector::Multiple { items, complete } => (items, complete),
    };
    let mut acc = Value::Int(0);
    let mut demote = !enumerated;
    for lane in lanes {
        match lane {
            FactResult::Incomplete => {}
            FactResult::Placeholder(v) => {
                demote = true;
                match arith::add(&acc, &v)? {
                    FactResult::Complete(sum) | FactResult::Placeholder(sum) => acc = sum,
                    FactResult::Incomplete => return Ok(single(FactResult::Incomplete)),
                }
            }
            FactResult::Complete(v) => match arith::add(&acc, &v)? {
                FactResult::Complete(sum) | FactResult::Placeholder(sum) => acc = sum,
                FactResult::Incomplete => return Ok(single(FactResult::Incomplete)),
            },
        }
    }
    Ok(single(if demote {
        FactResult::Placeholder(acc)
    } else {
        FactResult::Complete(acc)
    }))
}

enum FilterMode {
    All,
    First,
}

/// Shared walk for `Filter` and `Find`: evaluate the predicate with each
/// member as current.
fn eval_filter(
    collection: &Path,
    predicate: &Expr,
    ctx: &EvalContext,
    mode: FilterMode,
) -> Result<ResultVector, FactGraphError> {
    let coll_path = collection.resolve(&ctx.current)?;
    if coll_path.is_abstract() {
        return Err(FactGraphError::dictionary(format!(
            "Filter/Find collection path '{}' must name one collection",
            coll_path
        )));
    }
    let coll = expect_single("Filter", ctx.graph.result_for(&coll_path)?)?;
    let (members, coll_demote) = match &coll {
        FactResult::Incomplete => return Ok(single(FactResult::Incomplete)),
        FactResult::Complete(Value::Collection(c)) => (c.clone(), false),
        FactResult::Placeholder(Value::Collection(c)) => (c.clone(), true),
        FactResult::Complete(v) | FactResult::Placeholder(v) => {
            return Err(FactGraphError::dictionary(format!(
                "Filter/Find target '{}' is {}, not a collection",
                coll_path,
                v.type_name()
            )));
        }
    };

    let mut matched: Vec<String> = Vec::new();
    let mut demote = coll_demote;
    for id in members.members() {
        let member_path = coll_path.child(Segment::Member(id.clone()));
        let member_ctx = ctx.rebased(member_path);
        let verdict = expect_single("Filter", force(predicate, &member_ctx)?)?;
        match expect_bool("Filter", &verdict)? {
            FactResult::Complete(true) => match mode {
                FilterMode::All => matched.push(id.clone()),
                FilterMode::First => {
                    // An earlier unknown predicate means an earlier member
                    // could still turn out to match first.
                    if demote && !coll_demote {
                        return Ok(single(FactResult::Incomplete));
                    }
                    let out = FactResult::Complete(Value::Str(id.clone()));
                    return Ok(single(if coll_demote {
                        out.demote_to_placeholder()
                    } else {
                        out
                    }));
                }
            },
            FactResult::Complete(false) => {}
            FactResult::Placeholder(_) | FactResult::Incomplete => demote = true,
        }
    }
    match mode {
        FilterMode::All => {
            let out = Collection::from_members(matched)
                .map(Value::Collection)
                .map(FactResult::Complete)
                .unwrap_or(FactResult::Incomplete);
            Ok(single(if demote {
                out.demote_to_placeholder()
            } else {
                out
            }))
        }
        FilterMode::First => Ok(single(FactResult::Incomplete)),
    }
}

// ──────────────────────────────────────────────
// Enum options
// ──────────────────────────────────────────────

fn eval_enum_options(
    options: &[EnumOption],
    ctx: &EvalContext,
) -> Result<ResultVector, FactGraphError> {
    let mut items = Vec::with_capacity(options.len());
    let mut complete = true;
    for option in options {
        match option {
            EnumOption::Static(v) => items.push(FactResult::Complete(Value::Str(v.clone()))),
            EnumOption::Conditional { condition, value } => {
                let cond = expect_single("EnumOptions", force(condition, ctx)?)?;
                match expect_bool("EnumOptions", &cond)? {
                    FactResult::Complete(true) => {
                        items.push(FactResult::Complete(Value::Str(value.clone())));
                    }
                    FactResult::Placeholder(true) => {
                        items.push(FactResult::Placeholder(Value::Str(value.clone())));
                    }
                    FactResult::Complete(false) => {}
                    FactResult::Placeholder(false) | FactResult::Incomplete => complete = false,
                }
            }
        }
    }
    Ok(MaybeVector::multiple(items, complete))
}

fn eval_options_contains(
    options: ResultVector,
    target: FactResult<Value>,
) -> Result<ResultVector, FactGraphError> {
    let target_str = match &target {
        FactResult::Incomplete => return Ok(single(FactResult::Incomplete)),
        FactResult::Complete(v) | FactResult::Placeholder(v) => match v {
            Value::Str(s) => s.clone(),
            Value::Enum(e) => e.value().to_string(),
            other => {
                return Err(FactGraphError::dictionary(format!(
                    "EnumOptionsContains expects Str or Enum, got {}",
                    other.type_name()
                )));
            }
        },
    };
    let target_demote = !target.is_complete();
    let (lanes, enumerated) = match options {
        MaybeVector::Single(r) => (vec![r], true),
        MaybeVector::Multiple { items, complete } => (items, complete),
    };
    let mut unknown = !enumerated;
    for lane in &lanes {
        match lane {
            FactResult::Complete(Value::Str(s)) if *s == target_str => {
                let out = FactResult::Complete(Value::Bool(true));
                return Ok(single(if target_demote {
                    out.demote_to_placeholder()
                } else {
                    out
                }));
            }
            FactResult::Placeholder(Value::Str(s)) if *s == target_str => {
                return Ok(single(FactResult::Placeholder(Value::Bool(true))));
            }
            FactResult::Incomplete | FactResult::Placeholder(_) => unknown = true,
            FactResult::Complete(_) => {}
        }
    }
    Ok(single(if unknown {
        FactResult::Incomplete
    } else if target_demote {
        FactResult::Placeholder(Value::Bool(false))
    } else {
        FactResult::Complete(Value::Bool(false))
    }))
}
