//! Portfolio-management domain: request documents, the typed API wrapper and the
//! work-creation workflow.
pub mod api;
pub mod payloads;
pub mod work;

use serde::{Deserialize, Serialize};

pub use api::{format_strategy_summary, AllocationOutcome, PortfolioApi};
pub use work::{create_work_structure, CreatedWork, WorkApi, WorkItem, WorkStructure, WorkflowError};

pub const DEFAULT_ROOT_PARENT_CODE: &str = "9";
pub const DEFAULT_RESOURCE_CODE: &str = "20556";
pub const DEFAULT_STRUCTURE_MAX_TOKENS: i32 = 4000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// Structure every new project is placed under
    pub root_parent_code: String,
    /// Resource used for allocations
    pub resource_code: String,
    /// Output budget for the model-generated work structure
    pub structure_max_tokens: i32,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            root_parent_code: DEFAULT_ROOT_PARENT_CODE.to_string(),
            resource_code: DEFAULT_RESOURCE_CODE.to_string(),
            structure_max_tokens: DEFAULT_STRUCTURE_MAX_TOKENS,
        }
    }
}
