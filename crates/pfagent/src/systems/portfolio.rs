use async_trait::async_trait;
use indoc::indoc;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{parse_call, System, ToolOutput};
use crate::backend::{endpoints, BackendClient};
use crate::context::RequestContext;
use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};
use crate::portfolio::{
    create_work_structure, format_strategy_summary, CreatedWork, PortfolioApi, PortfolioConfig,
    WorkStructure,
};
use crate::prompt_template::load_prompt_file;
use crate::providers::base::Provider;

lazy_static! {
    static ref FENCED_JSON: Regex = Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").unwrap();
}

const STRUCTURE_SYSTEM_PROMPT: &str =
    "You design work breakdown structures for a portfolio management system. Reply with JSON only.";

#[derive(Debug, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
enum PortfolioCall {
    CreateWork {
        work_type: String,
        #[serde(default)]
        work_name: Option<String>,
    },
    CreateResourceAllocation {
        resource_name: String,
        work_name: String,
        task_name: String,
    },
    SmartTimeentry {
        #[allow(dead_code)]
        #[serde(default)]
        id: Option<String>,
    },
    GetStrategyDetail {
        id: String,
    },
}

/// Codes of a work created earlier in this session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkEntry {
    pub project_code: String,
    pub tasks: HashMap<String, String>,
}

impl From<&CreatedWork> for WorkEntry {
    fn from(work: &CreatedWork) -> Self {
        Self {
            project_code: work.project_code.clone(),
            tasks: work.task_codes(),
        }
    }
}

/// Tools that act on the portfolio-management backend
pub struct PortfolioSystem {
    tools: Vec<Tool>,
    backend: BackendClient,
    provider: Arc<dyn Provider>,
    config: PortfolioConfig,
    work_cache: Mutex<HashMap<String, WorkEntry>>,
}

impl PortfolioSystem {
    pub fn new(backend: BackendClient, provider: Arc<dyn Provider>, config: PortfolioConfig) -> Self {
        let create_work = Tool::new(
            "create_work",
            "Create a work and its breakdown structure. Use this when the user asks to create \
            a project or a piece of work, with or without an explicit structure.",
            json!({
                "type": "object",
                "required": ["work_type"],
                "properties": {
                    "work_type": {
                        "type": "string",
                        "description": "What kind of work this is, e.g. 'car delivery system'."
                    },
                    "work_name": {
                        "type": "string",
                        "default": null,
                        "description": "Name of the work. Defaults to the work type."
                    }
                }
            }),
        )
        .structured();

        let allocation = Tool::new(
            "create_resource_allocation",
            "Create an allocation under a task for a resource, or assign a task to a resource. \
            The work must have been created earlier in this conversation.",
            json!({
                "type": "object",
                "required": ["resource_name", "work_name", "task_name"],
                "properties": {
                    "resource_name": {"type": "string"},
                    "work_name": {"type": "string"},
                    "task_name": {"type": "string"}
                }
            }),
        )
        .structured();

        let timeentry = Tool::new(
            "smart_timeentry",
            "Fill in the user's timesheet automatically.",
            json!({
                "type": "object",
                "required": [],
                "properties": {
                    "id": {"type": "string", "default": null}
                }
            }),
        )
        .structured();

        let strategy = Tool::new(
            "get_strategy_detail",
            "Get the details of a strategy.",
            json!({
                "type": "object",
                "required": ["id"],
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "Structure code of the strategy"
                    }
                }
            }),
        );

        Self {
            tools: vec![create_work, allocation, timeentry, strategy],
            backend,
            provider,
            config,
            work_cache: Mutex::new(HashMap::new()),
        }
    }

    fn api(&self, ctx: &RequestContext) -> PortfolioApi {
        PortfolioApi::new(
            self.backend.clone(),
            self.config.clone(),
            ctx.login_cert.clone(),
        )
    }

    /// Codes of a work created earlier in this session
    pub fn cached_work(&self, work_name: &str) -> Option<WorkEntry> {
        self.work_cache.lock().unwrap().get(work_name).cloned()
    }

    async fn generate_structure(&self, work_type: &str, work_name: &str) -> anyhow::Result<WorkStructure> {
        let example = json!({
            "items": [
                {
                    "id": "project-1",
                    "type": "project",
                    "name": work_name,
                    "description": "A comprehensive system for managing and tracking car deliveries",
                    "parent_id": null
                },
                {
                    "id": "epic-1",
                    "type": "epic",
                    "name": "User Management",
                    "description": "System for managing users, roles, and permissions",
                    "parent_id": "project-1"
                },
                {
                    "id": "story-1",
                    "type": "story",
                    "name": "Driver Management",
                    "description": "Management of driver profiles and operations",
                    "parent_id": "epic-1"
                }
            ]
        });
        let prompt = load_prompt_file(
            "work_structure.md",
            &json!({
                "work_type": work_type,
                "work_name": work_name,
                "example": example.to_string(),
            }),
        )?;

        let (reply, _usage) = self
            .provider
            .complete_with_max_tokens(
                STRUCTURE_SYSTEM_PROMPT,
                &[Message::user().with_text(prompt)],
                &[],
                Some(self.config.structure_max_tokens),
            )
            .await?;
        let text = reply.text();
        let structure = serde_json::from_str(extract_json(&text))?;
        Ok(structure)
    }

    async fn create_work(
        &self,
        work_type: &str,
        work_name: Option<&str>,
        ctx: &RequestContext,
    ) -> anyhow::Result<String> {
        let work_name = work_name.filter(|name| !name.is_empty()).unwrap_or(work_type);
        let structure = self.generate_structure(work_type, work_name).await?;

        let api = self.api(ctx);
        let created = create_work_structure(&api, &structure.items).await?;
        self.work_cache
            .lock()
            .unwrap()
            .insert(work_name.to_string(), WorkEntry::from(&created));

        tracing::info!(work_name, project_code = %created.project_code, items = created.items.len(), "work created");
        Ok(api.plan_page_url(&created.project_code))
    }

    async fn create_allocation(
        &self,
        resource_name: &str,
        work_name: &str,
        task_name: &str,
        ctx: &RequestContext,
    ) -> AgentResult<ToolOutput> {
        let Some(work) = self.cached_work(work_name) else {
            return Ok(ToolOutput::text(format!(
                "The work '{}' was not found. Create it in this conversation first.",
                work_name
            )));
        };
        let Some(task_code) = work.tasks.get(task_name) else {
            return Ok(ToolOutput::text(format!(
                "The work '{}' has no task named '{}'.",
                work_name, task_name
            )));
        };

        let outcome = self
            .api(ctx)
            .create_allocation(&work.project_code, task_code, resource_name)
            .await
            .map_err(|e| AgentError::ExecutionError(e.to_string()))?;
        tracing::info!(resource_name, project_code = %work.project_code, %outcome, "allocation requested");
        Ok(ToolOutput::reload(outcome.to_string()))
    }
}

/// The JSON object inside a model reply, with or without a markdown code fence
fn extract_json(text: &str) -> &str {
    if let Some(captures) = FENCED_JSON.captures(text) {
        if let Some(body) = captures.get(1) {
            return body.as_str();
        }
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

#[async_trait]
impl System for PortfolioSystem {
    fn name(&self) -> &str {
        "portfolio"
    }

    fn description(&self) -> &str {
        "Plans work, allocates resources and reads strategies in the portfolio management system"
    }

    fn instructions(&self) -> &str {
        indoc! {"
            Create work with create_work whenever the user describes a project, even without a structure.
            Only allocate resources to work created earlier in this conversation, using the exact
            work and task names from that work.
            Summarize strategy details for the user in plain language.
        "}
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall, ctx: &RequestContext) -> AgentResult<Vec<Content>> {
        match parse_call(&self.tools, tool_call)? {
            PortfolioCall::CreateWork {
                work_type,
                work_name,
            } => {
                let data = match self.create_work(&work_type, work_name.as_deref(), ctx).await {
                    Ok(url) => format!("Work created: {}", url),
                    Err(e) => {
                        tracing::warn!(error = %e, %work_type, "work creation failed");
                        format!("Something went wrong when creating the work: {}", e)
                    }
                };
                ToolOutput::text(data).into_content()
            }
            PortfolioCall::CreateResourceAllocation {
                resource_name,
                work_name,
                task_name,
            } => self
                .create_allocation(&resource_name, &work_name, &task_name, ctx)
                .await?
                .into_content(),
            PortfolioCall::SmartTimeentry { .. } => {
                let data = if self.api(ctx).smart_timeentry().await {
                    "Time entry completed".to_string()
                } else {
                    format!("Unable to reach the endpoint: {}", endpoints::SMART_TIMEENTRY)
                };
                ToolOutput::text(data).into_content()
            }
            PortfolioCall::GetStrategyDetail { id } => {
                let summary = match self.api(ctx).strategy_detail(&id).await {
                    Some(strategy) => format_strategy_summary(&strategy),
                    None => format!("Unable to reach the endpoint: {}", endpoints::strategy_by_id(&id)),
                };
                Ok(vec![Content::text(summary)])
            }
        }
    }
}
