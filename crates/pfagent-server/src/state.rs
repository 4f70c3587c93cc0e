use pfagent::factory::AgentFactory;
use pfagent::session::SessionStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub factory: Arc<AgentFactory>,
    pub tools_enabled: bool,
}

impl AppState {
    pub fn new(factory: AgentFactory, tools_enabled: bool) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new()),
            factory: Arc::new(factory),
            tools_enabled,
        }
    }
}
