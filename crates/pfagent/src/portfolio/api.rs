use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::fmt;

use super::payloads::{allocation_payload, project_payload, task_payload};
use super::work::WorkApi;
use super::PortfolioConfig;
use crate::backend::{endpoints, BackendClient, BackendError, BackendResult, RequestOptions};

/// Portfolio operations bound to one caller's credential
pub struct PortfolioApi {
    backend: BackendClient,
    config: PortfolioConfig,
    login_cert: Option<String>,
}

/// Outcome of an allocation insert; the API reports validation problems in the body
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationOutcome {
    Created,
    Rejected(Vec<Value>),
}

impl fmt::Display for AllocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationOutcome::Created => write!(f, "Allocation created"),
            AllocationOutcome::Rejected(errors) => write!(
                f,
                "Something went wrong when creating the allocation - {}",
                Value::Array(errors.clone())
            ),
        }
    }
}

impl PortfolioApi {
    pub fn new(backend: BackendClient, config: PortfolioConfig, login_cert: Option<String>) -> Self {
        Self {
            backend,
            config,
            login_cert,
        }
    }

    fn options(&self) -> RequestOptions {
        RequestOptions::default().with_login_cert(self.login_cert.as_deref())
    }

    pub fn plan_page_url(&self, project_code: &str) -> String {
        endpoints::plan_page(self.backend.base_url(), project_code)
    }

    async fn structure_template(&self, endpoint: &str) -> BackendResult<(String, Value)> {
        let template = self
            .backend
            .request_json(endpoint, Method::GET, self.options())
            .await?;
        let code = structure_code(&template).ok_or(BackendError::MissingField("StructureCode"))?;
        Ok((code, template))
    }

    pub async fn create_allocation(
        &self,
        project_code: &str,
        task_code: &str,
        resource_name: &str,
    ) -> BackendResult<AllocationOutcome> {
        let resource_code = &self.config.resource_code;
        let payload = allocation_payload(
            project_code,
            task_code,
            resource_code,
            &format!("{}|{}", resource_code, resource_name),
        );

        let response = self
            .backend
            .request_json(
                endpoints::INSERT_ALLOCATION,
                Method::POST,
                self.options().with_body(payload),
            )
            .await?;

        let errors = response["d"]["Errors"].as_array().cloned().unwrap_or_default();
        if errors.is_empty() {
            Ok(AllocationOutcome::Created)
        } else {
            Ok(AllocationOutcome::Rejected(errors))
        }
    }

    pub async fn strategy_detail(&self, id: &str) -> Option<Value> {
        self.backend
            .request_or_none(&endpoints::strategy_by_id(id), Method::POST, self.options())
            .await
    }

    /// Returns false when the endpoint could not be reached
    pub async fn smart_timeentry(&self) -> bool {
        self.backend
            .request_or_none(endpoints::SMART_TIMEENTRY, Method::PUT, self.options())
            .await
            .is_some()
    }
}

#[async_trait]
impl WorkApi for PortfolioApi {
    async fn create_project(&self, name: &str, description: &str) -> BackendResult<String> {
        let (code, template) = self.structure_template(endpoints::PROJECT_TEMPLATE).await?;
        let payload = project_payload(template, name, description, &self.config.root_parent_code);
        self.backend
            .request(
                endpoints::CREATE_PROJECT,
                Method::POST,
                self.options().with_body(payload),
            )
            .await?;
        Ok(code)
    }

    async fn create_task(
        &self,
        name: &str,
        description: &str,
        parent_code: &str,
    ) -> BackendResult<String> {
        let (code, template) = self
            .structure_template(&endpoints::structure_template(parent_code))
            .await?;
        let payload = task_payload(template, name, description);
        self.backend
            .request(
                endpoints::CREATE_STRUCTURE,
                Method::POST,
                self.options().with_body(payload),
            )
            .await?;
        Ok(code)
    }
}

/// Structure codes arrive as strings or numbers depending on the endpoint
fn structure_code(document: &Value) -> Option<String> {
    match document.get("StructureCode")? {
        Value::String(code) if !code.is_empty() => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}

/// One-paragraph summary of a strategy document
pub fn format_strategy_summary(strategy: &Value) -> String {
    let field = |value: &Value, default: &str| value.as_str().unwrap_or(default).to_string();
    format!(
        "Strategy '{}' (ID: {}) is a {} currently in '{}'. Scheduled from {} to {}. Parent strategy: {}.",
        field(&strategy["Description"], "N/A"),
        structure_code(strategy).unwrap_or_else(|| "N/A".to_string()),
        field(&strategy["StrategyType"]["Description"], "N/A"),
        field(&strategy["Status"]["Description"], "N/A"),
        field(&strategy["TargetStart"], "N/A"),
        field(&strategy["TargetFinish"], "N/A"),
        field(&strategy["Parent"]["Description"], "None"),
    )
}
