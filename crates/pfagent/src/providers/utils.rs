use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use crate::models::content::Content;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

/// Convert internal Message format to Anthropic's messages API specification
pub fn messages_to_anthropic_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let content: Vec<Value> = message
                .content
                .iter()
                .map(|content| match content {
                    MessageContent::Text(text) => json!({
                        "type": "text",
                        "text": text.text,
                    }),
                    MessageContent::ToolRequest(request) => json!({
                        "type": "tool_use",
                        "id": request.id,
                        "name": request.tool_call.name,
                        "input": request.tool_call.arguments,
                    }),
                    MessageContent::ToolResponse(response) => match &response.tool_result {
                        Ok(contents) => json!({
                            "type": "tool_result",
                            "tool_use_id": response.id,
                            "content": contents_to_anthropic_spec(contents),
                        }),
                        // A tool error is shown as output so the model can interpret it
                        Err(e) => json!({
                            "type": "tool_result",
                            "tool_use_id": response.id,
                            "content": format!("The tool call returned the following error:\n{}", e),
                            "is_error": true,
                        }),
                    },
                })
                .collect();

            json!({
                "role": message.role.as_str(),
                "content": content,
            })
        })
        .collect()
}

fn contents_to_anthropic_spec(contents: &[Content]) -> Value {
    if contents.is_empty() {
        return json!("");
    }
    Value::Array(
        contents
            .iter()
            .filter_map(|content| content.as_text())
            .map(|text| json!({"type": "text", "text": text}))
            .collect(),
    )
}

/// Convert internal Tool format to Anthropic's tool specification
pub fn tools_to_anthropic_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": tool.input_schema,
        }));
    }

    Ok(result)
}

/// Convert Anthropic's API response to internal Message format
pub fn anthropic_response_to_message(response: &Value) -> Result<Message> {
    let blocks = response
        .get("content")
        .and_then(|c| c.as_array())
        .ok_or_else(|| anyhow!("Invalid response format from Anthropic API"))?;

    let mut content = Vec::new();
    for block in blocks {
        match block.get("type").and_then(|t| t.as_str()) {
            Some("text") => {
                let text = block["text"].as_str().unwrap_or_default();
                content.push(MessageContent::text(text));
            }
            Some("tool_use") => {
                let id = block["id"].as_str().unwrap_or_default();
                let name = block["name"].as_str().unwrap_or_default();
                let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                content.push(MessageContent::tool_request(id, ToolCall::new(name, input)));
            }
            other => {
                tracing::debug!(block_type = ?other, "skipping unsupported content block");
            }
        }
    }

    Ok(Message {
        role: Role::Assistant,
        created: chrono::Utc::now().timestamp(),
        content,
    })
}
