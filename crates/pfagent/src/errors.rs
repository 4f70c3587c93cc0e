use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Tool {tool} returned a malformed structured result: {reason}")]
    MalformedToolResult { tool: String, reason: String },

    #[error("Model request failed: {0}")]
    Provider(String),

    #[error("Conversation exceeded {0} model turns")]
    TurnLimitExceeded(usize),

    #[error("Request was cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
