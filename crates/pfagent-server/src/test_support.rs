use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use pfagent::backend::{BackendClient, BackendConfig};
use pfagent::factory::AgentFactory;
use pfagent::models::message::Message;
use pfagent::models::tool::{Tool, ToolCall};
use pfagent::portfolio::PortfolioConfig;
use pfagent::providers::base::{Provider, Usage};

use crate::state::AppState;

/// Replays canned model replies in order, then answers with empty text.
///
/// The library's mock provider is only compiled for its own unit tests.
pub struct ScriptedProvider {
    responses: Mutex<Vec<Message>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete_with_max_tokens(
        &self,
        _system_prompt: &str,
        _messages: &[Message],
        _tools: &[Tool],
        _max_tokens: Option<i32>,
    ) -> Result<(Message, Usage)> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok((Message::assistant().with_text(""), Usage::default()))
        } else {
            Ok((responses.remove(0), Usage::default()))
        }
    }
}

/// App state whose agents read from `responses` and stop after three model turns
pub fn scripted_state(responses: Vec<Message>) -> AppState {
    let backend = BackendClient::new(BackendConfig::default()).unwrap();
    let factory = AgentFactory::new(
        Arc::new(ScriptedProvider::new(responses)),
        backend,
        PortfolioConfig::default(),
    )
    .with_max_turns(3);
    AppState::new(factory, true)
}

pub fn tool_use_reply(name: &str, arguments: Value) -> Message {
    Message::assistant().with_tool_request("toolu_1", ToolCall::new(name, arguments))
}
