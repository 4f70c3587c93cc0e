use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::message::{Message, MessageContent};
use crate::models::tool::{ResultKind, Tool, ToolCall};
use crate::prompt_template::load_prompt_file;
use crate::providers::base::Provider;
use crate::systems::System;

pub const DEFAULT_MAX_TURNS: usize = 10;

#[derive(Clone, Debug, Serialize)]
struct SystemInfo {
    name: String,
    description: String,
    instructions: String,
}

impl SystemInfo {
    fn new(name: &str, description: &str, instructions: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            instructions: instructions.to_string(),
        }
    }
}

/// What the caller gets back from one reply round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    /// Model text joined with newlines, including tool call traces
    Text(String),
    /// The document returned by a structured tool
    Structured(Value),
}

impl Reply {
    /// The reply as it is stored in a chat history
    pub fn to_value(&self) -> Value {
        match self {
            Reply::Text(text) => Value::String(text.clone()),
            Reply::Structured(value) => value.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentReply {
    pub reply: Reply,
    /// The full exchange, including the incoming messages and any tool round trips
    pub messages: Vec<Message>,
}

/// Agent integrates a foundational LLM with the systems it needs to pilot
pub struct Agent {
    systems: Vec<Box<dyn System>>,
    provider: Arc<dyn Provider>,
    max_turns: usize,
}

impl Agent {
    /// Create a new Agent with the specified provider
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            systems: Vec::new(),
            provider,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    /// Limit how many model calls a single reply may make
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    /// Add a system to the agent
    pub fn add_system(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
    }

    /// Get all tools from all systems with proper system prefixing
    pub fn get_prefixed_tools(&self) -> Vec<Tool> {
        let mut tools = Vec::new();
        for system in &self.systems {
            for tool in system.tools() {
                tools.push(Tool {
                    name: format!("{}__{}", system.name(), tool.name),
                    ..tool.clone()
                });
            }
        }
        tools
    }

    /// Find the system and tool behind a prefixed name
    fn resolve_tool(&self, prefixed_name: &str) -> Option<(&dyn System, &Tool)> {
        let (system_name, tool_name) = prefixed_name.split_once("__")?;
        let system = self.systems.iter().find(|sys| sys.name() == system_name)?;
        let tool = system.tools().iter().find(|tool| tool.name == tool_name)?;
        Some((&**system, tool))
    }

    fn get_system_prompt(&self, tools_enabled: bool) -> AgentResult<String> {
        let systems_info: Vec<SystemInfo> = if tools_enabled {
            self.systems
                .iter()
                .map(|system| {
                    SystemInfo::new(system.name(), system.description(), system.instructions())
                })
                .collect()
        } else {
            Vec::new()
        };

        let mut context = HashMap::new();
        context.insert("systems", systems_info);
        load_prompt_file("system.md", &context).map_err(|e| AgentError::Internal(e.to_string()))
    }

    async fn call_tool(
        &self,
        system: &dyn System,
        tool: &Tool,
        arguments: Value,
        ctx: &RequestContext,
    ) -> AgentResult<Vec<Content>> {
        tracing::info!(system = system.name(), tool = %tool.name, "calling tool");
        let call = ToolCall::new(tool.name.clone(), arguments);
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(AgentError::Cancelled),
            result = system.call(call, ctx) => result,
        }
    }

    /// Run the tool-calling loop over `messages` until the model stops asking for tools.
    ///
    /// A structured tool ends the round with its parsed result and no further model call.
    /// Unknown tools and failing tools are reported back to the model as error results.
    /// The incoming messages are left untouched; the updated exchange is returned.
    pub async fn reply(
        &self,
        messages: &[Message],
        ctx: &RequestContext,
        tools_enabled: bool,
    ) -> AgentResult<AgentReply> {
        let mut messages = messages.to_vec();
        let tools = if tools_enabled {
            self.get_prefixed_tools()
        } else {
            Vec::new()
        };
        let system_prompt = self.get_system_prompt(tools_enabled)?;
        let mut text_parts: Vec<String> = Vec::new();

        for turn in 1..=self.max_turns {
            tracing::debug!(turn, messages = messages.len(), "requesting completion");
            let (response, usage) = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return Err(AgentError::Cancelled),
                result = self.provider.complete(&system_prompt, &messages, &tools) => {
                    result.map_err(|e| AgentError::Provider(e.to_string()))?
                }
            };
            tracing::debug!(turn, input_tokens = ?usage.input_tokens, output_tokens = ?usage.output_tokens, "completion received");

            let mut assistant = Message::assistant();
            let mut tool_results = Message::user();
            let mut called_tool = false;

            for content in response.content {
                let request = match content {
                    MessageContent::Text(text) => {
                        text_parts.push(text.text.clone());
                        assistant = assistant.with_content(MessageContent::Text(text));
                        continue;
                    }
                    MessageContent::ToolRequest(request) => request,
                    MessageContent::ToolResponse(_) => continue,
                };

                assistant = assistant.with_tool_request(request.id.clone(), request.tool_call.clone());
                let ToolCall { name, arguments } = request.tool_call;

                let Some((system, tool)) = self.resolve_tool(&name) else {
                    tracing::warn!(tool = %name, "model requested an unknown tool");
                    text_parts.push(trace_line(&name, &arguments));
                    tool_results = tool_results
                        .with_tool_response(request.id, Err(AgentError::ToolNotFound(name)));
                    called_tool = true;
                    continue;
                };

                let result = self.call_tool(system, tool, arguments.clone(), ctx).await;
                if matches!(result, Err(AgentError::Cancelled)) {
                    return Err(AgentError::Cancelled);
                }

                if tool.result == ResultKind::Structured {
                    if let Ok(contents) = &result {
                        let value = structured_result(&name, contents)?;
                        messages.push(assistant);
                        messages.push(tool_results.with_tool_response(request.id, result));
                        return Ok(AgentReply {
                            reply: Reply::Structured(value),
                            messages,
                        });
                    }
                }

                if let Err(e) = &result {
                    tracing::warn!(tool = %name, error = %e, "tool call failed");
                }
                text_parts.push(trace_line(&name, &arguments));
                tool_results = tool_results.with_tool_response(request.id, result);
                called_tool = true;
            }

            messages.push(assistant);
            if !called_tool {
                return Ok(AgentReply {
                    reply: Reply::Text(text_parts.join("\n")),
                    messages,
                });
            }
            messages.push(tool_results);
        }

        tracing::warn!(max_turns = self.max_turns, "turn limit reached");
        Err(AgentError::TurnLimitExceeded(self.max_turns))
    }
}

fn trace_line(name: &str, arguments: &Value) -> String {
    format!("[Calling tool {} with args {}]", name, arguments)
}

/// Parse the first text block of a structured tool result
fn structured_result(tool: &str, contents: &[Content]) -> AgentResult<Value> {
    let text = contents
        .iter()
        .find_map(|content| content.as_text())
        .ok_or_else(|| AgentError::MalformedToolResult {
            tool: tool.to_string(),
            reason: "no text content".to_string(),
        })?;
    serde_json::from_str(text).map_err(|e| AgentError::MalformedToolResult {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;
    use tokio_util::sync::CancellationToken;

    // Mock system for testing
    struct MockSystem {
        tools: Vec<Tool>,
    }

    impl MockSystem {
        fn new() -> Self {
            let schema = json!({
                "type": "object",
                "properties": {"message": {"type": "string"}},
                "required": ["message"]
            });
            Self {
                tools: vec![
                    Tool::new("echo", "Echoes back the input", schema.clone()),
                    Tool::new("report", "Returns the input as a report", schema.clone())
                        .structured(),
                    Tool::new("fail", "Always fails", schema),
                ],
            }
        }
    }

    #[async_trait]
    impl System for MockSystem {
        fn name(&self) -> &str {
            "test"
        }

        fn description(&self) -> &str {
            "A mock system for testing"
        }

        fn instructions(&self) -> &str {
            "Mock system instructions"
        }

        fn tools(&self) -> &[Tool] {
            &self.tools
        }

        async fn call(&self, tool_call: ToolCall, ctx: &RequestContext) -> AgentResult<Vec<Content>> {
            let message = tool_call.arguments["message"].as_str().unwrap_or("");
            match tool_call.name.as_str() {
                "echo" => Ok(vec![Content::text(format!(
                    "{} ({})",
                    message,
                    ctx.login_cert.as_deref().unwrap_or("anonymous")
                ))]),
                "report" => Ok(vec![Content::text(message)]),
                "fail" => Err(AgentError::ExecutionError("boom".to_string())),
                _ => Err(AgentError::ToolNotFound(tool_call.name)),
            }
        }
    }

    // Tool that never finishes once started
    struct StallingSystem {
        tools: Vec<Tool>,
        started: Arc<Notify>,
    }

    #[async_trait]
    impl System for StallingSystem {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "A system whose tool never returns"
        }

        fn instructions(&self) -> &str {
            ""
        }

        fn tools(&self) -> &[Tool] {
            &self.tools
        }

        async fn call(&self, _tool_call: ToolCall, _ctx: &RequestContext) -> AgentResult<Vec<Content>> {
            self.started.notify_one();
            std::future::pending().await
        }
    }

    fn agent_with(responses: Vec<Message>) -> (Agent, Arc<MockProvider>) {
        let provider = Arc::new(MockProvider::new(responses));
        let mut agent = Agent::new(provider.clone());
        agent.add_system(Box::new(MockSystem::new()));
        (agent, provider)
    }

    fn tool_request(id: &str, name: &str, message: &str) -> Message {
        Message::assistant().with_tool_request(id, ToolCall::new(name, json!({"message": message})))
    }

    fn last_tool_result(provider: &MockProvider) -> AgentResult<Vec<Content>> {
        let requests = provider.requests();
        let last = requests.last().unwrap().messages.last().unwrap().clone();
        last.content[0].as_tool_response().unwrap().tool_result.clone()
    }

    #[tokio::test]
    async fn test_simple_response() {
        let (agent, provider) = agent_with(vec![Message::assistant().with_text("Hello!")]);
        let history = vec![Message::user().with_text("Hi")];

        let result = agent
            .reply(&history, &RequestContext::default(), true)
            .await
            .unwrap();

        assert_eq!(result.reply, Reply::Text("Hello!".to_string()));
        assert_eq!(result.messages.len(), 2);
        assert_eq!(history.len(), 1);
        assert_eq!(provider.requests().len(), 1);
        assert_eq!(
            provider.requests()[0].tool_names,
            vec!["test__echo", "test__report", "test__fail"]
        );
    }

    #[tokio::test]
    async fn test_text_tool_feeds_result_back() {
        let (agent, provider) = agent_with(vec![
            tool_request("1", "test__echo", "ping"),
            Message::assistant().with_text("Done!"),
        ]);
        let ctx = RequestContext::new(Some("cert-1".to_string()));

        let result = agent
            .reply(&[Message::user().with_text("Echo ping")], &ctx, true)
            .await
            .unwrap();

        assert_eq!(
            result.reply,
            Reply::Text(
                "[Calling tool test__echo with args {\"message\":\"ping\"}]\nDone!".to_string()
            )
        );
        assert_eq!(provider.requests().len(), 2);
        assert_eq!(
            last_tool_result(&provider),
            Ok(vec![Content::text("ping (cert-1)")])
        );
        // user, assistant tool request, tool results, final assistant
        assert_eq!(result.messages.len(), 4);
    }

    #[tokio::test]
    async fn test_structured_tool_short_circuits() {
        let (agent, provider) = agent_with(vec![
            Message::assistant()
                .with_text("Working on it")
                .with_tool_request("1", ToolCall::new("test__report", json!({"message": "{\"a\":1}"}))),
            Message::assistant().with_text("never requested"),
        ]);

        let result = agent
            .reply(&[Message::user().with_text("Report")], &RequestContext::default(), true)
            .await
            .unwrap();

        assert_eq!(result.reply, Reply::Structured(json!({"a": 1})));
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_structured_tool_with_invalid_json() {
        let (agent, _) = agent_with(vec![tool_request("1", "test__report", "{not json}")]);

        let err = agent
            .reply(&[Message::user().with_text("Report")], &RequestContext::default(), true)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::MalformedToolResult { tool, .. } if tool == "test__report"));
    }

    #[tokio::test]
    async fn test_unknown_and_failing_tools_are_reported_to_model() {
        let (agent, provider) = agent_with(vec![
            tool_request("1", "test__missing", "x"),
            tool_request("2", "test__fail", "x"),
            Message::assistant().with_text("Sorry about that"),
        ]);

        let result = agent
            .reply(&[Message::user().with_text("Try")], &RequestContext::default(), true)
            .await
            .unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        let first_result = requests[1].messages.last().unwrap().content[0]
            .as_tool_response()
            .unwrap()
            .tool_result
            .clone();
        assert_eq!(
            first_result,
            Err(AgentError::ToolNotFound("test__missing".to_string()))
        );
        assert_eq!(
            last_tool_result(&provider),
            Err(AgentError::ExecutionError("boom".to_string()))
        );
        match result.reply {
            Reply::Text(text) => assert!(text.ends_with("Sorry about that")),
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_turn_limit() {
        let responses = (0..5)
            .map(|i| tool_request(&i.to_string(), "test__echo", "again"))
            .collect();
        let (agent, provider) = agent_with(responses);
        let agent = agent.with_max_turns(3);

        let err = agent
            .reply(&[Message::user().with_text("Loop")], &RequestContext::default(), true)
            .await
            .unwrap_err();

        assert_eq!(err, AgentError::TurnLimitExceeded(3));
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_tools_disabled() {
        let (agent, provider) = agent_with(vec![Message::assistant().with_text("Plain answer")]);

        let result = agent
            .reply(&[Message::user().with_text("Hi")], &RequestContext::default(), false)
            .await
            .unwrap();

        assert_eq!(result.reply, Reply::Text("Plain answer".to_string()));
        assert!(provider.requests()[0].tool_names.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_request() {
        let (agent, provider) = agent_with(vec![Message::assistant().with_text("Hello!")]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = RequestContext::default().with_cancellation(cancel);

        let err = agent
            .reply(&[Message::user().with_text("Hi")], &ctx, true)
            .await
            .unwrap_err();

        assert_eq!(err, AgentError::Cancelled);
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_structured_tool_after_text_tool_keeps_all_results() {
        let (agent, provider) = agent_with(vec![Message::assistant()
            .with_tool_request("t1", ToolCall::new("test__echo", json!({"message": "ping"})))
            .with_tool_request("t2", ToolCall::new("test__report", json!({"message": "{\"a\":1}"})))]);

        let result = agent
            .reply(&[Message::user().with_text("Both")], &RequestContext::default(), true)
            .await
            .unwrap();

        assert_eq!(result.reply, Reply::Structured(json!({"a": 1})));
        assert_eq!(provider.requests().len(), 1);

        // user, assistant with both requests, one user message answering both
        assert_eq!(result.messages.len(), 3);
        let request_ids: Vec<&str> = result.messages[1]
            .content
            .iter()
            .filter_map(|content| content.as_tool_request())
            .map(|request| request.id.as_str())
            .collect();
        let responses: Vec<_> = result.messages[2]
            .content
            .iter()
            .filter_map(|content| content.as_tool_response())
            .collect();
        assert_eq!(request_ids, vec!["t1", "t2"]);
        assert_eq!(
            responses.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            request_ids
        );
        assert_eq!(
            responses[0].tool_result,
            Ok(vec![Content::text("ping (anonymous)")])
        );
    }

    #[tokio::test]
    async fn test_cancelled_during_tool_call() {
        let provider = Arc::new(MockProvider::new(vec![Message::assistant()
            .with_tool_request("1", ToolCall::new("slow__wait", json!({})))]));
        let started = Arc::new(Notify::new());
        let mut agent = Agent::new(provider.clone());
        agent.add_system(Box::new(StallingSystem {
            tools: vec![Tool::new("wait", "Never returns", json!({"type": "object"}))],
            started: started.clone(),
        }));
        let cancel = CancellationToken::new();
        let ctx = RequestContext::default().with_cancellation(cancel.clone());

        let messages = [Message::user().with_text("Wait")];
        let (result, _) = tokio::join!(
            agent.reply(&messages, &ctx, true),
            async {
                started.notified().await;
                cancel.cancel();
            }
        );

        assert_eq!(result.unwrap_err(), AgentError::Cancelled);
        assert_eq!(provider.requests().len(), 1);
    }

    #[test]
    fn test_system_prompt_lists_systems() {
        let (agent, _) = agent_with(vec![]);
        let prompt = agent.get_system_prompt(true).unwrap();
        assert!(prompt.contains("## test"));
        assert!(prompt.contains("Mock system instructions"));

        let prompt = agent.get_system_prompt(false).unwrap();
        assert!(!prompt.contains("## test"));
    }
}
