//! Shared state for the serve adapter.

use std::sync::Arc;

use factgraph::{Dictionary, Graph, MigrationRegistry};
use tokio::sync::Mutex;

/// One dictionary, one graph, one mutex. The core is single-threaded by
/// contract; the boundary serializes access here.
pub struct AppState {
    pub dictionary: Arc<Dictionary>,
    pub graph: Mutex<Graph>,
    pub registry: MigrationRegistry,
}

impl AppState {
    pub fn new(dictionary: Arc<Dictionary>, graph: Graph, registry: MigrationRegistry) -> AppState {
        AppState {
            dictionary,
            graph: Mutex::new(graph),
            registry,
        }
    }
}
