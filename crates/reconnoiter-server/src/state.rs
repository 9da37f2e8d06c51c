use std::sync::Arc;

use reconnoiter::registry::AgentRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AgentRegistry>,
    pub debug_mode: bool,
}

impl AppState {
    pub fn new(registry: AgentRegistry, debug_mode: bool) -> Self {
        Self {
            registry: Arc::new(registry),
            debug_mode,
        }
    }
}
