//! The graph runtime: lazy, memoized fact evaluation over a dictionary and
//! a writable store.
//!
//! A graph is single-threaded and exclusively owns its store and caches.
//! Reads memoize per concrete path; any write clears the whole result cache
//! rather than tracking fine-grained dependencies. Re-entrant evaluation is
//! cycle-checked with an in-progress set keyed by concrete path.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::dictionary::{Dictionary, FactDefinition, FactSpec, WritableSpec};
use crate::error::FactGraphError;
use crate::expr::eval::{force, EvalContext, ResultVector};
use crate::limits::{self, LimitViolation, Severity};
use crate::migration::MigrationRegistry;
use crate::path::{Path, Segment};
use crate::result::{FactResult, MaybeVector};
use crate::store::Store;
use crate::value::{Collection, Day, Value, WritableKind};

/// Aggregate outcome of `set` and `save`: `ok` is false when any
/// error-severity limit failed. Violations never unwind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub ok: bool,
    pub violations: Vec<LimitViolation>,
}

impl SaveOutcome {
    fn from_violations(violations: Vec<LimitViolation>) -> SaveOutcome {
        let ok = !violations.iter().any(|v| v.severity == Severity::Error);
        SaveOutcome { ok, violations }
    }
}

/// A materialized fact: one concrete path bound to its definition. Created
/// lazily on first resolution and cached for the life of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct FactInstance {
    pub path: Path,
    pub abstract_path: Path,
    /// Enclosing fact, used by `..` in child expressions.
    pub parent: Option<Path>,
}

/// A per-user fact graph.
pub struct Graph {
    dictionary: Arc<Dictionary>,
    store: Store,
    today: Day,
    fact_cache: RefCell<HashMap<String, FactInstance>>,
    result_cache: RefCell<HashMap<String, ResultVector>>,
    in_progress: RefCell<HashSet<String>>,
}

impl Graph {
    /// Construct with `Today` anchored to the system clock.
    pub fn new(dictionary: Arc<Dictionary>, store: Store) -> Graph {
        let today = Day::new(chrono::Utc::now().date_naive());
        Graph::with_today(dictionary, store, today)
    }

    /// Construct with an explicit `Today`, keeping evaluation deterministic.
    pub fn with_today(dictionary: Arc<Dictionary>, store: Store, today: Day) -> Graph {
        Graph {
            dictionary,
            store,
            today,
            fact_cache: RefCell::new(HashMap::new()),
            result_cache: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    /// Load persisted state, replaying pending migrations, and type-check
    /// entries against the dictionary's declared writable types.
    pub fn load(
        dictionary: Arc<Dictionary>,
        registry: &MigrationRegistry,
        raw: &str,
    ) -> Result<Graph, FactGraphError> {
        let store = Store::from_json_with_migrations(raw, registry)?;
        for (key, value) in store.enumerate_writables() {
            let path = Path::parse(key)?;
            if let Some(w) = dictionary.writable_spec(&path.to_abstract()) {
                if w.kind != value.kind() {
                    return Err(FactGraphError::TypeMismatch {
                        path: key.to_string(),
                        expected: w.kind.tag().to_string(),
                        got: value.type_name().to_string(),
                    });
                }
            }
        }
        Ok(Graph::new(dictionary, store))
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn today(&self) -> Day {
        self.today
    }

    /// Serialize the store.
    pub fn to_json(&self, indent: bool) -> String {
        self.store.to_json(indent)
    }

    fn invalidate(&mut self) {
        self.result_cache.get_mut().clear();
    }

    // ──────────────────────────────────────────
    // Resolution
    // ──────────────────────────────────────────

    fn parse_operand(path: &str) -> Result<Path, FactGraphError> {
        let parsed = Path::parse(path)?;
        if !parsed.is_absolute() {
            return Err(FactGraphError::parse(format!(
                "'{}': graph operations take absolute paths",
                path
            )));
        }
        Ok(parsed)
    }

    /// Materialize (and cache) the fact instance at a concrete path,
    /// validating that every `#id` segment names a live member of a declared
    /// collection.
    fn fact_for(&self, path: &Path) -> Result<FactInstance, FactGraphError> {
        let key = path.to_string();
        let def = self
            .dictionary
            .get_for_concrete(path)
            .ok_or_else(|| FactGraphError::UnknownPath { path: key.clone() })?;
        let mut prefix = Path::root();
        for seg in path.segments() {
            if let Segment::Member(id) = seg {
                if !self.dictionary.is_collection(&prefix.to_abstract()) {
                    return Err(FactGraphError::UnknownPath { path: key });
                }
                let live = matches!(
                    self.store.get(&prefix),
                    Some(Value::Collection(c)) if c.contains(id)
                );
                if !live {
                    return Err(FactGraphError::UnknownPath { path: key });
                }
            }
            prefix = prefix.child(seg.clone());
        }
        let instance = FactInstance {
            path: path.clone(),
            abstract_path: def.path.clone(),
            parent: path.parent(),
        };
        self.fact_cache
            .borrow_mut()
            .entry(key)
            .or_insert_with(|| instance.clone());
        Ok(instance)
    }

    /// Expand an abstract path against current collection populations.
    /// The flag is false when any traversed collection is unwritten.
    fn expand(&self, path: &Path) -> Result<(Vec<Path>, bool), FactGraphError> {
        let mut prefixes = vec![Path::root()];
        let mut complete = true;
        for seg in path.segments() {
            match seg {
                Segment::Wildcard => {
                    let mut next = Vec::new();
                    for p in &prefixes {
                        if !self.dictionary.is_collection(&p.to_abstract()) {
                            return Err(FactGraphError::dictionary(format!(
                                "wildcard in '{}' under '{}', which is not a collection",
                                path, p
                            )));
                        }
                        match self.store.get(p) {
                            Some(Value::Collection(c)) => {
                                for id in c.members() {
                                    next.push(p.child(Segment::Member(id.clone())));
                                }
                            }
                            Some(other) => {
                                return Err(FactGraphError::TypeMismatch {
                                    path: p.to_string(),
                                    expected: WritableKind::Collection.tag().to_string(),
                                    got: other.type_name().to_string(),
                                });
                            }
                            None => complete = false,
                        }
                    }
                    prefixes = next;
                }
                other => {
                    for p in &mut prefixes {
                        *p = p.child(other.clone());
                    }
                }
            }
        }
        Ok((prefixes, complete))
    }

    // ──────────────────────────────────────────
    // Evaluation
    // ──────────────────────────────────────────

    /// Memoized evaluation of one concrete fact.
    pub(crate) fn result_for(&self, path: &Path) -> Result<ResultVector, FactGraphError> {
        let key = path.to_string();
        if let Some(hit) = self.result_cache.borrow().get(&key) {
            return Ok(hit.clone());
        }
        if !self.in_progress.borrow_mut().insert(key.clone()) {
            return Err(FactGraphError::EvaluationCycle { path: key });
        }
        let out = self.evaluate_uncached(path);
        self.in_progress.borrow_mut().remove(&key);
        let out = out?;
        self.result_cache.borrow_mut().insert(key, out.clone());
        Ok(out)
    }

    fn evaluate_uncached(&self, path: &Path) -> Result<ResultVector, FactGraphError> {
        self.fact_for(path)?;
        let def = self
            .dictionary
            .get_for_concrete(path)
            .ok_or_else(|| FactGraphError::UnknownPath {
                path: path.to_string(),
            })?;
        let ctx = EvalContext::new(self, path.clone());
        match &def.spec {
            FactSpec::Derived(expr) => force(expr, &ctx),
            FactSpec::Writable(w) => self.eval_writable(w, path, &ctx),
        }
    }

    /// Writable semantics: overrides first, then the stored value, then the
    /// placeholder (demoted), otherwise `Incomplete`.
    fn eval_writable(
        &self,
        w: &WritableSpec,
        path: &Path,
        ctx: &EvalContext,
    ) -> Result<ResultVector, FactGraphError> {
        for o in &w.overrides {
            let cond = match force(&o.condition, ctx)?.into_single() {
                Some(r) => r,
                None => {
                    return Err(FactGraphError::dictionary(format!(
                        "override condition on '{}' is not singular",
                        path
                    )));
                }
            };
            if matches!(cond, FactResult::Complete(Value::Bool(true))) {
                return force(&o.replacement, ctx);
            }
        }
        if let Some(v) = self.store.get(path) {
            return Ok(MaybeVector::Single(FactResult::Complete(v.clone())));
        }
        if let Some(placeholder) = &w.placeholder {
            let rv = force(placeholder, ctx)?;
            return Ok(rv.map(FactResult::demote_to_placeholder));
        }
        Ok(MaybeVector::Single(FactResult::Incomplete))
    }

    /// Dependency resolution for expression evaluation: resolve against the
    /// owning fact, expand wildcards against current populations, evaluate.
    pub(crate) fn dep(
        &self,
        path: &Path,
        current: &Path,
    ) -> Result<ResultVector, FactGraphError> {
        let resolved = path.resolve(current)?;
        if !resolved.is_abstract() {
            return self.result_for(&resolved);
        }
        let (concretes, complete) = self.expand(&resolved)?;
        let mut items = Vec::with_capacity(concretes.len());
        for concrete in &concretes {
            let rv = self.result_for(concrete)?;
            let len = rv.len();
            let lane = rv.into_single().ok_or_else(|| FactGraphError::ShapeMismatch {
                operator: "Dependency".to_string(),
                left: 1,
                right: len,
            })?;
            items.push(lane);
        }
        Ok(MaybeVector::multiple(items, complete))
    }

    // ──────────────────────────────────────────
    // Reads
    // ──────────────────────────────────────────

    /// Resolve to exactly one fact and return its result.
    pub fn get(&self, path: &str) -> Result<FactResult<Value>, FactGraphError> {
        let parsed = Self::parse_operand(path)?;
        if parsed.is_abstract() {
            let (concretes, _) = self.expand(&parsed)?;
            return Err(FactGraphError::ShapeMismatch {
                operator: "get".to_string(),
                left: 1,
                right: concretes.len(),
            });
        }
        let rv = self.result_for(&parsed)?;
        let len = rv.len();
        rv.into_single().ok_or(FactGraphError::ShapeMismatch {
            operator: "get".to_string(),
            left: 1,
            right: len,
        })
    }

    /// Resolve to any number of facts and flatten their results.
    pub fn get_vect(&self, path: &str) -> Result<Vec<FactResult<Value>>, FactGraphError> {
        let parsed = Self::parse_operand(path)?;
        if !parsed.is_abstract() {
            return Ok(self.result_for(&parsed)?.into_vec());
        }
        let (concretes, _) = self.expand(&parsed)?;
        let mut out = Vec::with_capacity(concretes.len());
        for concrete in &concretes {
            out.extend(self.result_for(concrete)?.into_vec());
        }
        Ok(out)
    }

    // ──────────────────────────────────────────
    // Writes
    // ──────────────────────────────────────────

    /// Type-check and store a value, then report this fact's limit
    /// violations. The value is stored even when limits fail, so a later
    /// `save` reports the same aggregate.
    pub fn set(&mut self, path: &str, value: Value) -> Result<SaveOutcome, FactGraphError> {
        let parsed = Self::parse_operand(path)?;
        if parsed.is_abstract() {
            return Err(FactGraphError::parse(format!(
                "cannot set abstract path '{}'",
                parsed
            )));
        }
        self.fact_for(&parsed)?;
        let def = self
            .dictionary
            .get_for_concrete(&parsed)
            .ok_or_else(|| FactGraphError::UnknownPath {
                path: parsed.to_string(),
            })?;
        let w = writable_or_mismatch(def, &parsed)?;
        if w.kind != value.kind() {
            return Err(FactGraphError::TypeMismatch {
                path: parsed.to_string(),
                expected: w.kind.tag().to_string(),
                got: value.type_name().to_string(),
            });
        }
        if let Some(declared) = &w.options_path {
            let bound = match &value {
                Value::Enum(e) => Some(e.options_path()),
                Value::MultiEnum(m) => Some(m.options_path()),
                _ => None,
            };
            if let Some(bound) = bound {
                if declared.to_string() != bound {
                    return Err(FactGraphError::TypeMismatch {
                        path: parsed.to_string(),
                        expected: declared.to_string(),
                        got: bound.to_string(),
                    });
                }
            }
        }
        let w = w.clone();
        self.store.put(&parsed, value);
        self.invalidate();
        let violations = self.check_limits(&parsed, &w)?;
        Ok(SaveOutcome::from_violations(violations))
    }

    /// Remove a stored value. Reading the fact afterwards falls back to its
    /// placeholder or `Incomplete`.
    pub fn delete(&mut self, path: &str) -> Result<bool, FactGraphError> {
        let parsed = Self::parse_operand(path)?;
        self.fact_for(&parsed)?;
        let removed = self.store.delete(&parsed);
        self.invalidate();
        Ok(removed)
    }

    /// Append a member to a collection; duplicates are rejected.
    pub fn add_member(&mut self, collection: &str, id: &str) -> Result<(), FactGraphError> {
        let parsed = Self::parse_operand(collection)?;
        self.require_collection(&parsed)?;
        let mut members = match self.store.get(&parsed) {
            Some(Value::Collection(c)) => c.clone(),
            _ => Collection::new(),
        };
        members.add(id)?;
        self.store.put(&parsed, Value::Collection(members));
        self.invalidate();
        Ok(())
    }

    /// Remove a member and every stored value beneath it.
    pub fn remove_member(&mut self, collection: &str, id: &str) -> Result<(), FactGraphError> {
        let parsed = Self::parse_operand(collection)?;
        self.require_collection(&parsed)?;
        let mut members = match self.store.get(&parsed) {
            Some(Value::Collection(c)) => c.clone(),
            _ => Collection::new(),
        };
        let member_path = parsed.child(Segment::Member(id.to_string()));
        if !members.remove(id) {
            return Err(FactGraphError::UnknownPath {
                path: member_path.to_string(),
            });
        }
        self.store.delete_subtree(&member_path);
        self.store.put(&parsed, Value::Collection(members));
        // Instances under the removed member no longer resolve.
        self.fact_cache
            .get_mut()
            .retain(|key, _| {
                Path::parse(key)
                    .map(|p| !p.starts_with(&member_path))
                    .unwrap_or(true)
            });
        self.invalidate();
        Ok(())
    }

    fn require_collection(&self, path: &Path) -> Result<(), FactGraphError> {
        self.fact_for(path)?;
        match self.dictionary.writable_spec(&path.to_abstract()) {
            Some(w) if w.kind == WritableKind::Collection => Ok(()),
            Some(w) => Err(FactGraphError::TypeMismatch {
                path: path.to_string(),
                expected: WritableKind::Collection.tag().to_string(),
                got: w.kind.tag().to_string(),
            }),
            None => Err(FactGraphError::TypeMismatch {
                path: path.to_string(),
                expected: WritableKind::Collection.tag().to_string(),
                got: "derived fact".to_string(),
            }),
        }
    }

    /// Clear the store, keeping the dictionary.
    pub fn reset(&mut self) {
        self.store.clear();
        self.fact_cache.get_mut().clear();
        self.invalidate();
    }

    // ──────────────────────────────────────────
    // Limits
    // ──────────────────────────────────────────

    /// Evaluate every writable's limits against the current store.
    pub fn save(&mut self) -> Result<SaveOutcome, FactGraphError> {
        self.invalidate();
        let entries: Vec<String> = self
            .store
            .enumerate_writables()
            .map(|(k, _)| k.to_string())
            .collect();
        let mut violations = Vec::new();
        for key in entries {
            let path = Path::parse(&key)?;
            let Some(w) = self.dictionary.writable_spec(&path.to_abstract()) else {
                // Stale entry from an older dictionary; sync_with_dictionary
                // is the remedy, not a violation.
                continue;
            };
            let w = w.clone();
            violations.extend(self.check_limits(&path, &w)?);
        }
        Ok(SaveOutcome::from_violations(violations))
    }

    /// Declared limits plus the intrinsic checks of the stored value.
    fn check_limits(
        &self,
        path: &Path,
        w: &WritableSpec,
    ) -> Result<Vec<LimitViolation>, FactGraphError> {
        let Some(actual) = self.store.get(path).cloned() else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        let ctx = EvalContext::new(self, path.clone());

        for spec in &w.limits {
            let bound_rv = force(&spec.bound, &ctx)?;
            let bound = match bound_rv.into_single() {
                Some(r) => r,
                None => {
                    return Err(FactGraphError::dictionary(format!(
                        "limit bound on '{}' is not singular",
                        path
                    )));
                }
            };
            // An unknowable bound cannot be checked.
            let Some(bound_value) = bound.value() else {
                continue;
            };
            if !limits::check(spec.kind, &actual, bound_value)? {
                out.push(limits::violation(
                    &path.to_string(),
                    spec,
                    &actual,
                    bound_value,
                ));
            }
        }

        if let Err(e) = actual.revalidate() {
            out.push(LimitViolation {
                path: path.to_string(),
                limit: "Format".to_string(),
                severity: Severity::Error,
                actual: actual.to_string(),
                bound: String::new(),
                message: e.to_string(),
            });
        }

        match (&actual, &w.options_path) {
            (Value::Enum(e), Some(options)) => {
                out.extend(self.check_enum_membership(path, options, &[e.value().to_string()])?);
            }
            (Value::MultiEnum(m), Some(options)) => {
                out.extend(self.check_enum_membership(path, options, m.values())?);
            }
            _ => {}
        }
        Ok(out)
    }

    /// Intrinsic option-set membership. Only a fully enumerated option set
    /// can produce a violation: a value that could still become settable is
    /// never reported.
    fn check_enum_membership(
        &self,
        path: &Path,
        options_path: &Path,
        chosen: &[String],
    ) -> Result<Vec<LimitViolation>, FactGraphError> {
        let resolved = options_path.resolve(path)?;
        let rv = self.result_for(&resolved)?;
        let (lanes, enumerated) = match rv {
            MaybeVector::Single(r) => (vec![r], true),
            MaybeVector::Multiple { items, complete } => (items, complete),
        };
        if !enumerated || lanes.iter().any(|l| !l.is_complete()) {
            return Ok(Vec::new());
        }
        let available: Vec<&str> = lanes
            .iter()
            .filter_map(|l| match l.value() {
                Some(Value::Str(s)) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        Ok(chosen
            .iter()
            .filter(|c| !available.contains(&c.as_str()))
            .map(|c| LimitViolation {
                path: path.to_string(),
                limit: "EnumMembership".to_string(),
                severity: Severity::Error,
                actual: c.clone(),
                bound: available.join(", "),
                message: format!("'{}' is not an available option", c),
            })
            .collect())
    }

    // ──────────────────────────────────────────
    // Introspection
    // ──────────────────────────────────────────

    /// Human-readable derivation trace.
    pub fn explain(&self, path: &str) -> Result<String, FactGraphError> {
        crate::explain::explain(self, path)
    }

    /// The materialized instance at a concrete path, resolving it if needed.
    pub fn fact_instance(&self, path: &Path) -> Result<FactInstance, FactGraphError> {
        self.fact_for(path)
    }

    pub(crate) fn definition_for(&self, path: &Path) -> Option<&FactDefinition> {
        self.dictionary.get_for_concrete(path)
    }
}

fn writable_or_mismatch<'d>(
    def: &'d FactDefinition,
    path: &Path,
) -> Result<&'d WritableSpec, FactGraphError> {
    def.writable().ok_or_else(|| FactGraphError::TypeMismatch {
        path: path.to_string(),
        expected: "writable fact".to_string(),
        got: "derived fact".to_string(),
    })
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
