//! Creating a flat forest of work items so every parent exists before its children.
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::backend::{BackendError, BackendResult};

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Work structure has no items")]
    Empty,

    #[error("Work item {id} references unknown parent {parent_id}")]
    UnknownParent { id: String, parent_id: String },

    #[error("Work item {0} is its own ancestor")]
    Cycle(String),

    #[error("Work item id {0} appears more than once")]
    DuplicateId(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkStructure {
    pub items: Vec<WorkItem>,
}

/// One item as it now exists in the backend
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedItem {
    pub id: String,
    pub name: String,
    pub code: String,
    pub is_root: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedWork {
    /// Code of the first root item
    pub project_code: String,
    /// Items in creation order
    pub items: Vec<CreatedItem>,
}

impl CreatedWork {
    /// Backend codes of every non-root item, keyed by name
    pub fn task_codes(&self) -> HashMap<String, String> {
        self.items
            .iter()
            .filter(|item| !item.is_root)
            .map(|item| (item.name.clone(), item.code.clone()))
            .collect()
    }
}

/// The two creation calls the workflow needs
#[async_trait]
pub trait WorkApi: Send + Sync {
    /// Create a root item and return its structure code
    async fn create_project(&self, name: &str, description: &str) -> BackendResult<String>;

    /// Create an item under `parent_code` and return its structure code
    async fn create_task(
        &self,
        name: &str,
        description: &str,
        parent_code: &str,
    ) -> BackendResult<String>;
}

/// Create every item of `items` in the backend.
///
/// Items are visited in input order. An item whose parent has not been created yet pulls its
/// whole uncreated ancestor chain in first, top-down. Each id is created exactly once.
/// The structure is validated before any backend call; backend failures stop the run and
/// leave already-created items in place.
pub async fn create_work_structure<A>(api: &A, items: &[WorkItem]) -> Result<CreatedWork, WorkflowError>
where
    A: WorkApi + ?Sized,
{
    let by_id = index_items(items)?;
    validate_ancestry(items, &by_id)?;

    let mut created: HashMap<&str, CreatedItem> = HashMap::new();
    let mut order: Vec<CreatedItem> = Vec::with_capacity(items.len());

    for item in items {
        let mut chain = Vec::new();
        let mut current = Some(item);
        while let Some(next) = current {
            if created.contains_key(next.id.as_str()) {
                break;
            }
            chain.push(next);
            current = next.parent_id.as_deref().map(|parent| by_id[parent]);
        }

        for pending in chain.into_iter().rev() {
            let entry = match pending.parent_id.as_deref() {
                None => {
                    let code = api.create_project(&pending.name, &pending.description).await?;
                    tracing::info!(id = %pending.id, %code, "created project");
                    CreatedItem {
                        id: pending.id.clone(),
                        name: pending.name.clone(),
                        code,
                        is_root: true,
                    }
                }
                Some(parent) => {
                    let parent_code = &created[parent].code;
                    let code = api
                        .create_task(&pending.name, &pending.description, parent_code)
                        .await?;
                    tracing::info!(id = %pending.id, %code, %parent_code, "created task");
                    CreatedItem {
                        id: pending.id.clone(),
                        name: pending.name.clone(),
                        code,
                        is_root: false,
                    }
                }
            };
            order.push(entry.clone());
            created.insert(pending.id.as_str(), entry);
        }
    }

    let project_code = order
        .iter()
        .find(|item| item.is_root)
        .map(|item| item.code.clone())
        .ok_or(WorkflowError::Empty)?;

    Ok(CreatedWork {
        project_code,
        items: order,
    })
}

fn index_items(items: &[WorkItem]) -> Result<HashMap<&str, &WorkItem>, WorkflowError> {
    if items.is_empty() {
        return Err(WorkflowError::Empty);
    }
    let mut by_id = HashMap::with_capacity(items.len());
    for item in items {
        if by_id.insert(item.id.as_str(), item).is_some() {
            return Err(WorkflowError::DuplicateId(item.id.clone()));
        }
    }
    Ok(by_id)
}

fn validate_ancestry(
    items: &[WorkItem],
    by_id: &HashMap<&str, &WorkItem>,
) -> Result<(), WorkflowError> {
    let mut rooted: HashSet<&str> = HashSet::new();
    for item in items {
        let mut seen = HashSet::new();
        let mut current = item;
        while let Some(parent) = current.parent_id.as_deref() {
            if rooted.contains(current.id.as_str()) {
                break;
            }
            if !seen.insert(current.id.as_str()) {
                return Err(WorkflowError::Cycle(current.id.clone()));
            }
            current = by_id
                .get(parent)
                .copied()
                .ok_or_else(|| WorkflowError::UnknownParent {
                    id: current.id.clone(),
                    parent_id: parent.to_string(),
                })?;
        }
        rooted.extend(seen);
    }
    Ok(())
}

fn id_from_value(value: Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(format!("expected a string or number id, got {}", other)),
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    id_from_value(Value::deserialize(deserializer)?)
        .map_err(serde::de::Error::custom)?
        .ok_or_else(|| serde::de::Error::custom("work item id must not be empty"))
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    id_from_value(Value::deserialize(deserializer)?).map_err(serde::de::Error::custom)
}
