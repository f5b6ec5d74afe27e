//! The typed operator AST.
//!
//! Expressions form a closed family dispatched by pattern match. Evaluation
//! (in [`eval`]) is context-driven: the same tree serves every instantiation
//! of an abstract fact, with relative `Dep` paths resolved against the
//! owning fact's concrete path at force time.

pub mod arith;
pub mod eval;
mod strings;

use crate::path::Path;
use crate::value::Value;

/// An option-set entry inside [`Expr::EnumOptions`].
#[derive(Debug, Clone, PartialEq)]
pub enum EnumOption {
    /// Always present.
    Static(String),
    /// Present only while the condition holds.
    Conditional { condition: Expr, value: String },
}

/// A typed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // ── leaves ──
    Const(Value),
    /// Resolve a path against the owning fact and read its value.
    Dep(Path),

    // ── control ──
    /// First branch whose condition is `Complete(true)` wins; an earlier
    /// unknown condition makes the whole expression `Incomplete`.
    Switch(Vec<(Expr, Expr)>),
    /// The values of every branch whose condition holds, as a vector.
    ConditionalList(Vec<(Expr, Expr)>),

    // ── arithmetic ──
    Add(Vec<Expr>),
    Subtract {
        minuend: Box<Expr>,
        subtrahends: Vec<Expr>,
    },
    Multiply(Vec<Expr>),
    /// Division by zero evaluates to `Incomplete`.
    Divide {
        dividend: Box<Expr>,
        divisor: Box<Expr>,
    },
    /// Largest / smallest of the listed arguments.
    GreaterOf(Vec<Expr>),
    LesserOf(Vec<Expr>),
    /// Largest / smallest element of a vector operand.
    Maximum(Box<Expr>),
    Minimum(Box<Expr>),
    /// Round to whole units, half-to-even.
    Round(Box<Expr>),
    RoundToInt(Box<Expr>),
    Ceiling(Box<Expr>),
    Floor(Box<Expr>),

    // ── logic ──
    Not(Box<Expr>),
    /// Short-circuit AND: `Complete(false)` decides immediately.
    All(Vec<Expr>),
    /// Short-circuit OR: `Complete(true)` decides immediately.
    Any(Vec<Expr>),
    Equal(Box<Expr>, Box<Expr>),
    NotEqual(Box<Expr>, Box<Expr>),
    GreaterThan(Box<Expr>, Box<Expr>),
    GreaterOrEqual(Box<Expr>, Box<Expr>),
    LessThan(Box<Expr>, Box<Expr>),
    LessOrEqual(Box<Expr>, Box<Expr>),

    // ── strings ──
    Length(Box<Expr>),
    /// Concatenate after lossless string conversion.
    Paste(Vec<Expr>),
    AsString(Box<Expr>),
    /// Dollar to decimal string (`"550.00"`).
    AsDecimalString(Box<Expr>),
    Trim(Box<Expr>),
    ToUpper(Box<Expr>),
    StripChars {
        value: Box<Expr>,
        chars: Box<Expr>,
    },
    /// IRS MeF name-control truncation to the 35-character line.
    TruncateNameForMef(Box<Expr>),

    // ── dates ──
    Today,
    LastDayOfMonth(Box<Expr>),
    /// Calendar-month offset preserving last-day-of-month anchors.
    AddPayrollMonths {
        date: Box<Expr>,
        months: Box<Expr>,
    },

    // ── collections ──
    /// Count of `Complete` elements of a vector, or member count of a
    /// collection value.
    Count(Box<Expr>),
    /// Element-type sum; `Incomplete` elements are skipped, `Placeholder`
    /// elements demote the result.
    CollectionSum(Box<Expr>),
    /// Member ids of `collection` for which `predicate`, evaluated with the
    /// member as current, is `Complete(true)`.
    Filter {
        collection: Path,
        predicate: Box<Expr>,
    },
    /// First member satisfying the predicate; `Incomplete` when none does.
    Find {
        collection: Path,
        predicate: Box<Expr>,
    },
    /// Member at a position; out of bounds is `Incomplete`.
    IndexOf {
        collection: Box<Expr>,
        index: Box<Expr>,
    },
    EnumOptions(Vec<EnumOption>),
    EnumOptionsContains {
        options: Box<Expr>,
        value: Box<Expr>,
    },
    EnumOptionsSize(Box<Expr>),

    // ── introspection ──
    /// Always-`Complete` boolean reflecting the inner expression's
    /// completeness.
    IsComplete(Box<Expr>),
}

impl Expr {
    /// Operator name for traces and shape-mismatch reports.
    pub fn operator_name(&self) -> &'static str {
        match self {
            Expr::Const(_) => "Const",
            Expr::Dep(_) => "Dependency",
            Expr::Switch(_) => "Switch",
            Expr::ConditionalList(_) => "ConditionalList",
            Expr::Add(_) => "Add",
            Expr::Subtract { .. } => "Subtract",
            Expr::Multiply(_) => "Multiply",
            Expr::Divide { .. } => "Divide",
            Expr::GreaterOf(_) => "GreaterOf",
            Expr::LesserOf(_) => "LesserOf",
            Expr::Maximum(_) => "Maximum",
            Expr::Minimum(_) => "Minimum",
            Expr::Round(_) => "Round",
            Expr::RoundToInt(_) => "RoundToInt",
            Expr::Ceiling(_) => "Ceiling",
            Expr::Floor(_) => "Floor",
            Expr::Not(_) => "Not",
            Expr::All(_) => "All",
            Expr::Any(_) => "Any",
            Expr::Equal(_, _) => "Equal",
            Expr::NotEqual(_, _) => "NotEqual",
            Expr::GreaterThan(_, _) => "GreaterThan",
            Expr::GreaterOrEqual(_, _) => "GreaterOrEqual",
            Expr::LessThan(_, _) => "LessThan",
            Expr::LessOrEqual(_, _) => "LessOrEqual",
            Expr::Length(_) => "Length",
            Expr::Paste(_) => "Paste",
            Expr::AsString(_) => "AsString",
            Expr::AsDecimalString(_) => "AsDecimalString",
            Expr::Trim(_) => "Trim",
            Expr::ToUpper(_) => "ToUpper",
            Expr::StripChars { .. } => "StripChars",
            Expr::TruncateNameForMef(_) => "TruncateNameForMef",
            Expr::Today => "Today",
            Expr::LastDayOfMonth(_) => "LastDayOfMonth",
            Expr::AddPayrollMonths { .. } => "AddPayrollMonths",
            Expr::Count(_) => "Count",
            Expr::CollectionSum(_) => "CollectionSum",
            Expr::Filter { .. } => "Filter",
            Expr::Find { .. } => "Find",
            Expr::IndexOf { .. } => "IndexOf",
            Expr::EnumOptions(_) => "EnumOptions",
            Expr::EnumOptionsContains { .. } => "EnumOptionsContains",
            Expr::EnumOptionsSize(_) => "EnumOptionsSize",
            Expr::IsComplete(_) => "IsComplete",
        }
    }

    /// Child expressions in declaration (evaluation) order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Const(_) | Expr::Dep(_) | Expr::Today => vec![],
            Expr::Switch(cases) | Expr::ConditionalList(cases) => cases
                .iter()
                .flat_map(|(c, b)| [c, b])
                .collect(),
            Expr::Add(args)
            | Expr::Multiply(args)
            | Expr::GreaterOf(args)
            | Expr::LesserOf(args)
            | Expr::All(args)
            | Expr::Any(args)
            | Expr::Paste(args) => args.iter().collect(),
            Expr::Subtract {
                minuend,
                subtrahends,
            } => std::iter::once(minuend.as_ref())
                .chain(subtrahends.iter())
                .collect(),
            Expr::Divide { dividend, divisor } => vec![dividend, divisor],
            Expr::Maximum(a)
            | Expr::Minimum(a)
            | Expr::Round(a)
            | Expr::RoundToInt(a)
            | Expr::Ceiling(a)
            | Expr::Floor(a)
            | Expr::Not(a)
            | Expr::Length(a)
            | Expr::AsString(a)
            | Expr::AsDecimalString(a)
            | Expr::Trim(a)
            | Expr::ToUpper(a)
            | Expr::TruncateNameForMef(a)
            | Expr::LastDayOfMonth(a)
            | Expr::Count(a)
            | Expr::CollectionSum(a)
            | Expr::EnumOptionsSize(a)
            | Expr::IsComplete(a) => vec![a],
            Expr::Equal(a, b)
            | Expr::NotEqual(a, b)
            | Expr::GreaterThan(a, b)
            | Expr::GreaterOrEqual(a, b)
            | Expr::LessThan(a, b)
            | Expr::LessOrEqual(a, b) => vec![a, b],
            Expr::StripChars { value, chars } => vec![value, chars],
            Expr::AddPayrollMonths { date, months } => vec![date, months],
            Expr::Filter { predicate, .. } | Expr::Find { predicate, .. } => vec![predicate],
            Expr::IndexOf { collection, index } => vec![collection, index],
            Expr::EnumOptions(options) => options
                .iter()
                .filter_map(|o| match o {
                    EnumOption::Static(_) => None,
                    EnumOption::Conditional { condition, .. } => Some(condition),
                })
                .collect(),
            Expr::EnumOptionsContains { options, value } => vec![options, value],
        }
    }

    /// Every `Dep`/`Filter`/`Find` path mentioned anywhere in the tree, in
    /// declaration order, duplicates included.
    pub fn dep_paths(&self) -> Vec<&Path> {
        let mut out = Vec::new();
        self.collect_deps(&mut out);
        out
    }

    fn collect_deps<'a>(&'a self, out: &mut Vec<&'a Path>) {
        match self {
            Expr::Dep(path) => out.push(path),
            Expr::Filter { collection, .. } | Expr::Find { collection, .. } => {
                out.push(collection);
            }
            _ => {}
        }
        for child in self.children() {
            child.collect_deps(out);
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(s: &str) -> Expr {
        Expr::Dep(Path::parse(s).unwrap())
    }

    #[test]
    fn dep_paths_walks_the_whole_tree() {
        let e = Expr::Add(vec![
            dep("/a"),
            Expr::Switch(vec![(dep("/cond"), dep("/b"))]),
        ]);
        let paths: Vec<String> = e.dep_paths().iter().map(|p| p.to_string()).collect();
        assert_eq!(paths, vec!["/a", "/cond", "/b"]);
    }

    #[test]
    fn filter_reports_collection_and_predicate_deps() {
        let e = Expr::Filter {
            collection: Path::parse("/exp").unwrap(),
            predicate: Box::new(dep("deductible")),
        };
        let paths: Vec<String> = e.dep_paths().iter().map(|p| p.to_string()).collect();
        assert_eq!(paths, vec!["/exp", "deductible"]);
    }
}
