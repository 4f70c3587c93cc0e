use std::sync::Arc;

use crate::agent::{Agent, DEFAULT_MAX_TURNS};
use crate::backend::BackendClient;
use crate::models::tool::Tool;
use crate::portfolio::PortfolioConfig;
use crate::providers::base::Provider;
use crate::systems::{DemoSystem, PortfolioSystem};

/// Builds a fresh agent for each chat session.
///
/// The provider and backend client are shared; every agent gets its own systems, so
/// session-scoped state such as the work cache never leaks between sessions.
#[derive(Clone)]
pub struct AgentFactory {
    provider: Arc<dyn Provider>,
    backend: BackendClient,
    portfolio: PortfolioConfig,
    max_turns: usize,
}

impl AgentFactory {
    pub fn new(provider: Arc<dyn Provider>, backend: BackendClient, portfolio: PortfolioConfig) -> Self {
        Self {
            provider,
            backend,
            portfolio,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn build(&self) -> Agent {
        let mut agent = Agent::new(self.provider.clone()).with_max_turns(self.max_turns);
        agent.add_system(Box::new(PortfolioSystem::new(
            self.backend.clone(),
            self.provider.clone(),
            self.portfolio.clone(),
        )));
        agent.add_system(Box::new(DemoSystem::new()));
        agent
    }

    /// Every tool an agent built by this factory offers to the model
    pub fn tools(&self) -> Vec<Tool> {
        self.build().get_prefixed_tools()
    }
}
