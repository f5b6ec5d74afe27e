//! factgraph -- a declarative fact graph engine.
//!
//! A [`Dictionary`] defines named facts: user-writable inputs with declared
//! types and limits, and derived values computed by expression trees over
//! other facts. A [`Graph`] binds a dictionary to a per-user [`Store`];
//! reading a fact triggers lazy, memoized evaluation of its expression and,
//! recursively, its dependencies. Writing validates against declared limits
//! and invalidates cached derivations. State is JSON-serializable and
//! versioned through a linear [`migration`] pipeline.
//!
//! Evaluation is three-state: every read produces `Complete`, `Placeholder`,
//! or `Incomplete` (see [`FactResult`]), and wildcard paths vectorize
//! transparently through [`MaybeVector`].

pub mod dictionary;
pub mod error;
pub mod expr;
pub mod explain;
pub mod graph;
pub mod limits;
pub mod migration;
pub mod path;
pub mod result;
pub mod store;
pub mod value;

pub use dictionary::{
    Dictionary, DictionaryBuilder, FactDefinition, FactMeta, FactSpec, OverrideSpec, WritableSpec,
};
pub use error::FactGraphError;
pub use expr::{EnumOption, Expr};
pub use graph::{FactInstance, Graph, SaveOutcome};
pub use limits::{LimitKind, LimitSpec, LimitViolation, Severity};
pub use migration::{Migration, MigrationRegistry};
pub use path::{Path, Segment};
pub use result::{FactResult, MaybeVector};
pub use store::Store;
pub use value::{Value, WritableKind};
