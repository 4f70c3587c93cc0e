use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{parse_call, System, ToolOutput};
use crate::context::RequestContext;
use crate::errors::AgentResult;
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};

#[derive(Debug, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
enum DemoCall {
    Add { a: i64, b: i64 },
    Subtract { a: i64, b: i64 },
    SampleRedirectUrl { url: String },
    Greeting { name: String },
}

/// Small tools for trying out each kind of tool result
pub struct DemoSystem {
    tools: Vec<Tool>,
}

impl Default for DemoSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoSystem {
    pub fn new() -> Self {
        let operands = json!({
            "type": "object",
            "required": ["a", "b"],
            "properties": {
                "a": {"type": "integer"},
                "b": {"type": "integer"}
            }
        });

        let tools = vec![
            Tool::new("add", "Add two numbers", operands.clone()).structured(),
            Tool::new("subtract", "Subtract b from a", operands).structured(),
            Tool::new(
                "sample_redirect_url",
                "Redirect the user to a url",
                json!({
                    "type": "object",
                    "required": ["url"],
                    "properties": {"url": {"type": "string"}}
                }),
            )
            .structured(),
            Tool::new(
                "greeting",
                "Get a personalized greeting",
                json!({
                    "type": "object",
                    "required": ["name"],
                    "properties": {"name": {"type": "string"}}
                }),
            ),
        ];

        Self { tools }
    }
}

#[async_trait]
impl System for DemoSystem {
    fn name(&self) -> &str {
        "demo"
    }

    fn description(&self) -> &str {
        "Arithmetic, redirects and greetings"
    }

    fn instructions(&self) -> &str {
        "Use these tools when the user asks for simple arithmetic, a redirect or a greeting."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall, _ctx: &RequestContext) -> AgentResult<Vec<Content>> {
        match parse_call(&self.tools, tool_call)? {
            DemoCall::Add { a, b } => ToolOutput::text(a.saturating_add(b)).into_content(),
            DemoCall::Subtract { a, b } => ToolOutput::text(a.saturating_sub(b)).into_content(),
            DemoCall::SampleRedirectUrl { url } => ToolOutput::redirect(url).into_content(),
            DemoCall::Greeting { name } => Ok(vec![Content::text(format!("Hello, {}!", name))]),
        }
    }
}
