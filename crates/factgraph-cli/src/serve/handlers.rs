//! Route handlers: describe, read, write, snapshot, collection edits.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use factgraph::{FactGraphError, FactResult, Path, SaveOutcome};

use super::{json_error, AppState};

fn error_response(e: &FactGraphError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match e {
        FactGraphError::UnknownPath { .. } => StatusCode::NOT_FOUND,
        FactGraphError::Parse { .. }
        | FactGraphError::InvalidValue { .. }
        | FactGraphError::TypeMismatch { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    json_error(status, &e.to_string())
}

fn result_json(r: &FactResult<factgraph::Value>) -> serde_json::Value {
    match r {
        FactResult::Complete(v) => json!({ "value": v.to_plain_json(), "complete": true }),
        FactResult::Placeholder(v) => json!({ "value": v.to_plain_json(), "complete": false }),
        FactResult::Incomplete => json!({ "complete": false }),
    }
}

fn outcome_json(outcome: &SaveOutcome) -> serde_json::Value {
    let violations: Vec<serde_json::Value> = outcome
        .violations
        .iter()
        .map(|v| {
            json!({
                "path": v.path,
                "limit": v.limit,
                "severity": v.severity.to_string(),
                "actual": v.actual,
                "bound": v.bound,
                "message": v.message,
            })
        })
        .collect();
    json!({ "success": outcome.ok, "violations": violations })
}

#[derive(Deserialize)]
pub(crate) struct PathQuery {
    path: String,
}

#[derive(Deserialize)]
pub(crate) struct PathBody {
    path: String,
}

#[derive(Deserialize)]
pub(crate) struct SetBody {
    path: String,
    value: serde_json::Value,
}

#[derive(Deserialize)]
pub(crate) struct SetBatchBody {
    sets: Vec<SetBody>,
}

#[derive(Deserialize)]
pub(crate) struct MemberBody {
    path: String,
    id: String,
}

pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") })),
    )
}

/// GET /paths -- abstract paths declared in the dictionary.
pub(crate) async fn handle_paths(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let paths: Vec<String> = state
        .dictionary
        .definitions()
        .map(|d| d.path.to_string())
        .collect();
    (StatusCode::OK, Json(json!({ "paths": paths })))
}

/// GET /fact?path=/x -- type tag and writability.
pub(crate) async fn handle_describe(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PathQuery>,
) -> impl IntoResponse {
    let parsed = match Path::parse(&q.path) {
        Ok(p) => p,
        Err(e) => return error_response(&e).into_response(),
    };
    let Some(def) = state.dictionary.get(&parsed.to_abstract()) else {
        return json_error(StatusCode::NOT_FOUND, &format!("unknown path: {}", q.path))
            .into_response();
    };
    let body = match def.writable() {
        Some(w) => json!({
            "path": def.path.to_string(),
            "writable": true,
            "type": w.kind.tag(),
            "options": w.options_path.as_ref().map(|p| p.to_string()),
            "name": def.meta.name,
            "description": def.meta.description,
        }),
        None => json!({
            "path": def.path.to_string(),
            "writable": false,
            "name": def.meta.name,
            "description": def.meta.description,
        }),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// GET /deps?path=/x -- forward dependencies.
pub(crate) async fn handle_deps(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PathQuery>,
) -> impl IntoResponse {
    dep_listing(&state, &q.path, true)
}

/// GET /rdeps?path=/x -- reverse dependencies.
pub(crate) async fn handle_rdeps(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PathQuery>,
) -> impl IntoResponse {
    dep_listing(&state, &q.path, false)
}

fn dep_listing(state: &AppState, raw: &str, forward: bool) -> axum::response::Response {
    let parsed = match Path::parse(raw) {
        Ok(p) => p,
        Err(e) => return error_response(&e).into_response(),
    };
    let deps = if forward {
        state.dictionary.forward_deps(&parsed.to_abstract())
    } else {
        state.dictionary.reverse_deps(&parsed.to_abstract())
    };
    match deps {
        Ok(paths) => {
            let rendered: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
            (StatusCode::OK, Json(json!({ "paths": rendered }))).into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /get -- evaluate one fact.
pub(crate) async fn handle_get(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PathBody>,
) -> impl IntoResponse {
    let graph = state.graph.lock().await;
    match graph.get(&body.path) {
        Ok(result) => (StatusCode::OK, Json(result_json(&result))).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /set -- coerce a plain JSON value against the declared type, store
/// it, and report this fact's violations.
pub(crate) async fn handle_set(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetBody>,
) -> impl IntoResponse {
    let mut graph = state.graph.lock().await;
    match set_one(&state, &mut graph, &body) {
        Ok(outcome) => (StatusCode::OK, Json(outcome_json(&outcome))).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

fn set_one(
    state: &AppState,
    graph: &mut factgraph::Graph,
    body: &SetBody,
) -> Result<SaveOutcome, FactGraphError> {
    let parsed = Path::parse(&body.path)?;
    let value = state.dictionary.coerce_plain(&parsed, &body.value)?;
    graph.set(&body.path, value)
}

/// POST /set-batch -- independent per-item results; one bad item does not
/// abort the rest.
pub(crate) async fn handle_set_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetBatchBody>,
) -> impl IntoResponse {
    let mut graph = state.graph.lock().await;
    let results: Vec<serde_json::Value> = body
        .sets
        .iter()
        .map(|item| match set_one(&state, &mut graph, item) {
            Ok(outcome) => {
                let mut v = outcome_json(&outcome);
                v["path"] = json!(item.path);
                v
            }
            Err(e) => json!({ "path": item.path, "success": false, "error": e.to_string() }),
        })
        .collect();
    (StatusCode::OK, Json(json!({ "results": results })))
}

/// POST /save -- aggregate limit evaluation across all writables.
pub(crate) async fn handle_save(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut graph = state.graph.lock().await;
    match graph.save() {
        Ok(outcome) => (StatusCode::OK, Json(outcome_json(&outcome))).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /explain -- derivation trace.
pub(crate) async fn handle_explain(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PathBody>,
) -> impl IntoResponse {
    let graph = state.graph.lock().await;
    match graph.explain(&body.path) {
        Ok(trace) => (StatusCode::OK, Json(json!({ "trace": trace }))).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// GET /snapshot -- persisted store state.
pub(crate) async fn handle_snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let graph = state.graph.lock().await;
    (StatusCode::OK, Json(graph.store().to_json_value()))
}

/// POST /load -- replace graph state with a persisted blob, replaying
/// pending migrations.
pub(crate) async fn handle_load(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    let raw = body.to_string();
    match factgraph::Graph::load(state.dictionary.clone(), &state.registry, &raw) {
        Ok(loaded) => {
            let mut graph = state.graph.lock().await;
            *graph = loaded;
            (StatusCode::OK, Json(json!({ "success": true }))).into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /diff -- compare a persisted blob against the live store. Reports
/// paths added since the snapshot, removed since it, and changed in place.
pub(crate) async fn handle_diff(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    let Some(snapshot) = body.get("facts").and_then(|f| f.as_object()).cloned() else {
        return json_error(StatusCode::BAD_REQUEST, "blob missing 'facts' object")
            .into_response();
    };
    let graph = state.graph.lock().await;
    let live = graph.store().to_json_value();
    let live = live
        .get("facts")
        .and_then(|f| f.as_object())
        .cloned()
        .unwrap_or_default();

    let mut added: Vec<&String> = live.keys().filter(|k| !snapshot.contains_key(*k)).collect();
    let mut removed: Vec<&String> = snapshot.keys().filter(|k| !live.contains_key(*k)).collect();
    let mut changed: Vec<&String> = live
        .iter()
        .filter(|(k, v)| snapshot.get(*k).is_some_and(|old| old != *v))
        .map(|(k, _)| k)
        .collect();
    added.sort();
    removed.sort();
    changed.sort();
    (
        StatusCode::OK,
        Json(json!({ "added": added, "removed": removed, "changed": changed })),
    )
        .into_response()
}

/// POST /collection/add
pub(crate) async fn handle_collection_add(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MemberBody>,
) -> impl IntoResponse {
    let mut graph = state.graph.lock().await;
    match graph.add_member(&body.path, &body.id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /collection/remove
pub(crate) async fn handle_collection_remove(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MemberBody>,
) -> impl IntoResponse {
    let mut graph = state.graph.lock().await;
    match graph.remove_member(&body.path, &body.id) {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// POST /reset -- clear the store, keep the dictionary.
pub(crate) async fn handle_reset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut graph = state.graph.lock().await;
    graph.reset();
    (StatusCode::OK, Json(json!({ "success": true })))
}
