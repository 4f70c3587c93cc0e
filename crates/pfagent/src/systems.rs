pub mod demo;
pub mod portfolio;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RequestContext;
use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

pub use demo::DemoSystem;
pub use portfolio::PortfolioSystem;

/// A named group of tools the agent can offer to the model
#[async_trait]
pub trait System: Send + Sync {
    /// Get the name of the system
    fn name(&self) -> &str;

    /// Get the system description
    fn description(&self) -> &str;

    /// Get system instructions
    fn instructions(&self) -> &str;

    /// Get available tools
    fn tools(&self) -> &[Tool];

    /// Call a tool on behalf of the request described by `ctx`
    async fn call(&self, tool_call: ToolCall, ctx: &RequestContext) -> AgentResult<Vec<Content>>;
}

/// Envelope returned by structured tools: `{"type": ..., "data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ToolOutput {
    /// Data to show the user as is
    Text(Value),
    /// The user's view of the backend changed and should be refreshed
    Reload(Value),
    /// Send the user to a URL
    Redirect(Value),
}

impl ToolOutput {
    pub fn text<V: Into<Value>>(data: V) -> Self {
        ToolOutput::Text(data.into())
    }

    pub fn reload<V: Into<Value>>(data: V) -> Self {
        ToolOutput::Reload(data.into())
    }

    pub fn redirect<V: Into<Value>>(data: V) -> Self {
        ToolOutput::Redirect(data.into())
    }

    pub fn into_content(self) -> AgentResult<Vec<Content>> {
        let value = serde_json::to_value(self).map_err(|e| AgentError::Internal(e.to_string()))?;
        Ok(vec![Content::json(&value)])
    }
}

/// Parse a call into a system's typed call enum.
///
/// Call enums are adjacently tagged on `name`/`arguments`, so the `ToolCall` wire shape maps
/// straight onto them.
pub fn parse_call<T: DeserializeOwned>(tools: &[Tool], tool_call: ToolCall) -> AgentResult<T> {
    if !tools.iter().any(|tool| tool.name == tool_call.name) {
        return Err(AgentError::ToolNotFound(tool_call.name));
    }
    let name = tool_call.name.clone();
    serde_json::to_value(tool_call)
        .and_then(serde_json::from_value)
        .map_err(|e| AgentError::InvalidParameters(format!("{}: {}", name, e)))
}
