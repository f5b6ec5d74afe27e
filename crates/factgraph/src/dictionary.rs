//! The fact dictionary: an immutable set of definitions keyed by abstract
//! path.
//!
//! Definitions accumulate in a [`DictionaryBuilder`]; `freeze` validates the
//! whole set (wildcards under collections, option paths defined, member-free
//! definition paths) and produces a [`Dictionary`] shareable across graphs.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::FactGraphError;
use crate::expr::Expr;
use crate::limits::LimitSpec;
use crate::path::{Path, Segment};
use crate::value::WritableKind;

// ──────────────────────────────────────────────
// Definitions
// ──────────────────────────────────────────────

/// Side metadata attached to a definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactMeta {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Whether the boundary may export this fact downstream.
    pub exported: bool,
}

/// A conditional substitution of a writable's effective value.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideSpec {
    pub condition: Expr,
    pub replacement: Expr,
}

/// Declaration of a user-writable fact.
#[derive(Debug, Clone, PartialEq)]
pub struct WritableSpec {
    pub kind: WritableKind,
    /// Option-set fact for `Enum`/`MultiEnum` writables.
    pub options_path: Option<Path>,
    pub limits: Vec<LimitSpec>,
    /// Evaluated (and demoted) when the store has no value.
    pub placeholder: Option<Expr>,
    pub overrides: Vec<OverrideSpec>,
}

impl WritableSpec {
    pub fn of(kind: WritableKind) -> WritableSpec {
        WritableSpec {
            kind,
            options_path: None,
            limits: Vec::new(),
            placeholder: None,
            overrides: Vec::new(),
        }
    }

    pub fn with_options_path(mut self, path: Path) -> WritableSpec {
        self.options_path = Some(path);
        self
    }

    pub fn with_limit(mut self, limit: LimitSpec) -> WritableSpec {
        self.limits.push(limit);
        self
    }

    pub fn with_placeholder(mut self, placeholder: Expr) -> WritableSpec {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn with_override(mut self, condition: Expr, replacement: Expr) -> WritableSpec {
        self.overrides.push(OverrideSpec {
            condition,
            replacement,
        });
        self
    }
}

/// What a fact is: a writable input or a derived computation.
#[derive(Debug, Clone, PartialEq)]
pub enum FactSpec {
    Writable(WritableSpec),
    Derived(Expr),
}

/// One immutable fact definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FactDefinition {
    pub path: Path,
    pub spec: FactSpec,
    pub meta: FactMeta,
}

impl FactDefinition {
    pub fn is_writable(&self) -> bool {
        matches!(self.spec, FactSpec::Writable(_))
    }

    pub fn writable(&self) -> Option<&WritableSpec> {
        match &self.spec {
            FactSpec::Writable(w) => Some(w),
            FactSpec::Derived(_) => None,
        }
    }

    /// Every expression attached to this definition: the derivation, or a
    /// writable's placeholder, overrides, and limit bounds.
    pub fn expressions(&self) -> Vec<&Expr> {
        match &self.spec {
            FactSpec::Derived(e) => vec![e],
            FactSpec::Writable(w) => {
                let mut out: Vec<&Expr> = Vec::new();
                if let Some(p) = &w.placeholder {
                    out.push(p);
                }
                for o in &w.overrides {
                    out.push(&o.condition);
                    out.push(&o.replacement);
                }
                for l in &w.limits {
                    out.push(&l.bound);
                }
                out
            }
        }
    }
}

// ──────────────────────────────────────────────
// Builder
// ──────────────────────────────────────────────

/// Accumulates definitions before freeze.
#[derive(Default)]
pub struct DictionaryBuilder {
    defs: BTreeMap<String, FactDefinition>,
}

impl DictionaryBuilder {
    pub fn new() -> DictionaryBuilder {
        DictionaryBuilder::default()
    }

    fn define(&mut self, def: FactDefinition) -> Result<(), FactGraphError> {
        if !def.path.is_absolute() {
            return Err(FactGraphError::dictionary(format!(
                "definition path '{}' must be absolute",
                def.path
            )));
        }
        for seg in def.path.segments() {
            if matches!(seg, Segment::Member(_)) {
                return Err(FactGraphError::dictionary(format!(
                    "definition path '{}' must be abstract, not member-bound",
                    def.path
                )));
            }
        }
        let key = def.path.to_string();
        if self.defs.contains_key(&key) {
            return Err(FactGraphError::dictionary(format!(
                "duplicate definition for '{}'",
                key
            )));
        }
        self.defs.insert(key, def);
        Ok(())
    }

    /// Declare a writable fact.
    pub fn writable(&mut self, path: &str, spec: WritableSpec) -> Result<(), FactGraphError> {
        self.define(FactDefinition {
            path: Path::parse(path)?,
            spec: FactSpec::Writable(spec),
            meta: FactMeta::default(),
        })
    }

    /// Declare a derived fact.
    pub fn derived(&mut self, path: &str, expr: Expr) -> Result<(), FactGraphError> {
        self.define(FactDefinition {
            path: Path::parse(path)?,
            spec: FactSpec::Derived(expr),
            meta: FactMeta::default(),
        })
    }

    /// Attach metadata to an existing definition.
    pub fn set_meta(&mut self, path: &str, meta: FactMeta) -> Result<(), FactGraphError> {
        let key = Path::parse(path)?.to_string();
        match self.defs.get_mut(&key) {
            Some(def) => {
                def.meta = meta;
                Ok(())
            }
            None => Err(FactGraphError::UnknownPath { path: key }),
        }
    }

    /// Validate the whole set and produce the immutable dictionary.
    pub fn freeze(self) -> Result<Arc<Dictionary>, FactGraphError> {
        let dict = Dictionary { defs: self.defs };
        for def in dict.defs.values() {
            // Every wildcard must sit directly under a collection-typed fact.
            let mut prefix = Path::root();
            for seg in def.path.segments() {
                if *seg == Segment::Wildcard && !dict.is_collection(&prefix) {
                    return Err(FactGraphError::dictionary(format!(
                        "'{}': wildcard under '{}', which is not a collection",
                        def.path, prefix
                    )));
                }
                prefix = prefix.child(seg.clone());
            }
            if let Some(w) = def.writable() {
                match w.kind {
                    WritableKind::Enum | WritableKind::MultiEnum => {
                        let options = w.options_path.as_ref().ok_or_else(|| {
                            FactGraphError::dictionary(format!(
                                "'{}': {} writable without an options path",
                                def.path,
                                w.kind.tag()
                            ))
                        })?;
                        if dict.get(options).is_none() {
                            return Err(FactGraphError::dictionary(format!(
                                "'{}': options path '{}' is not defined",
                                def.path, options
                            )));
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(Arc::new(dict))
    }
}

// ──────────────────────────────────────────────
// Dictionary
// ──────────────────────────────────────────────

/// The frozen, immutable definition set. Shareable across graphs and
/// threads; a graph holds it behind `Arc`.
#[derive(Debug)]
pub struct Dictionary {
    defs: BTreeMap<String, FactDefinition>,
}

impl Dictionary {
    /// Look up a definition by abstract path.
    pub fn get(&self, path: &Path) -> Option<&FactDefinition> {
        self.defs.get(&path.to_string())
    }

    /// Look up the definition matching a concrete path's template.
    pub fn get_for_concrete(&self, path: &Path) -> Option<&FactDefinition> {
        self.get(&path.to_abstract())
    }

    pub fn writable_spec(&self, path: &Path) -> Option<&WritableSpec> {
        self.get(path).and_then(FactDefinition::writable)
    }

    /// True when the path names a `Collection`-typed writable.
    pub fn is_collection(&self, path: &Path) -> bool {
        self.writable_spec(&path.to_abstract())
            .map(|w| w.kind == WritableKind::Collection)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// All definitions, in path order.
    pub fn definitions(&self) -> impl Iterator<Item = &FactDefinition> {
        self.defs.values()
    }

    /// Decode a plain boundary JSON value against the writable type declared
    /// at `path`, supplying the option-set binding for enum kinds.
    pub fn coerce_plain(
        &self,
        path: &Path,
        v: &serde_json::Value,
    ) -> Result<crate::value::Value, FactGraphError> {
        let w = self
            .writable_spec(&path.to_abstract())
            .ok_or_else(|| FactGraphError::UnknownPath {
                path: path.to_string(),
            })?;
        let options = w.options_path.as_ref().map(|p| p.to_string());
        crate::value::Value::from_plain_json(w.kind, options.as_deref(), v)
    }

    /// Paths this definition reads, resolved against its own path and
    /// reported abstractly.
    pub fn forward_deps(&self, path: &Path) -> Result<Vec<Path>, FactGraphError> {
        let def = self.get(path).ok_or_else(|| FactGraphError::UnknownPath {
            path: path.to_string(),
        })?;
        let mut out: Vec<Path> = Vec::new();
        for expr in def.expressions() {
            for dep in expr.dep_paths() {
                let resolved = dep.resolve(&def.path)?.to_abstract();
                if !out.contains(&resolved) {
                    out.push(resolved);
                }
            }
        }
        Ok(out)
    }

    /// Definitions that read `path`, directly.
    pub fn reverse_deps(&self, path: &Path) -> Result<Vec<Path>, FactGraphError> {
        let target = path.to_abstract();
        if self.get(&target).is_none() {
            return Err(FactGraphError::UnknownPath {
                path: path.to_string(),
            });
        }
        let mut out = Vec::new();
        for def in self.defs.values() {
            if self.forward_deps(&def.path)?.contains(&target) {
                out.push(def.path.clone());
            }
        }
        Ok(out)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn duplicate_definitions_rejected() {
        let mut b = DictionaryBuilder::new();
        b.writable("/x", WritableSpec::of(WritableKind::Int)).unwrap();
        assert!(b.writable("/x", WritableSpec::of(WritableKind::Int)).is_err());
    }

    #[test]
    fn member_bound_definition_paths_rejected() {
        let mut b = DictionaryBuilder::new();
        assert!(b
            .writable("/exp/#a/amount", WritableSpec::of(WritableKind::Int))
            .is_err());
    }

    #[test]
    fn wildcard_requires_enclosing_collection() {
        let mut b = DictionaryBuilder::new();
        b.writable("/exp/*/amount", WritableSpec::of(WritableKind::Dollar))
            .unwrap();
        // No /exp collection declared.
        assert!(b.freeze().is_err());

        let mut b = DictionaryBuilder::new();
        b.writable("/exp", WritableSpec::of(WritableKind::Collection))
            .unwrap();
        b.writable("/exp/*/amount", WritableSpec::of(WritableKind::Dollar))
            .unwrap();
        assert!(b.freeze().is_ok());
    }

    #[test]
    fn enum_requires_defined_options_path() {
        let mut b = DictionaryBuilder::new();
        b.writable(
            "/status",
            WritableSpec::of(WritableKind::Enum).with_options_path(p("/statusOptions")),
        )
        .unwrap();
        assert!(b.freeze().is_err());

        let mut b = DictionaryBuilder::new();
        b.derived(
            "/statusOptions",
            Expr::EnumOptions(vec![crate::expr::EnumOption::Static("open".into())]),
        )
        .unwrap();
        b.writable(
            "/status",
            WritableSpec::of(WritableKind::Enum).with_options_path(p("/statusOptions")),
        )
        .unwrap();
        assert!(b.freeze().is_ok());
    }

    #[test]
    fn dependency_listing_resolves_relative_paths() {
        let mut b = DictionaryBuilder::new();
        b.writable("/exp", WritableSpec::of(WritableKind::Collection))
            .unwrap();
        b.writable("/exp/*/amount", WritableSpec::of(WritableKind::Dollar))
            .unwrap();
        b.derived(
            "/exp/*/double",
            Expr::Multiply(vec![
                Expr::Dep(p("../amount")),
                Expr::Const(Value::Int(2)),
            ]),
        )
        .unwrap();
        let dict = b.freeze().unwrap();
        assert_eq!(
            dict.forward_deps(&p("/exp/*/double")).unwrap(),
            vec![p("/exp/*/amount")]
        );
        assert_eq!(
            dict.reverse_deps(&p("/exp/*/amount")).unwrap(),
            vec![p("/exp/*/double")]
        );
    }
}
