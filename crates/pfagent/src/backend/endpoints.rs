//! Endpoint templates of the portfolio-management API.

/// Blank structure document for a new child under `father_code`
pub fn structure_template(father_code: &str) -> String {
    format!("/internal-api/structures/new?fatherCode={}", father_code)
}

/// Blank structure document for a new root work item
pub const PROJECT_TEMPLATE: &str = "/internal-api/structures/new/partial";

/// Create a child structure from a filled-in template
pub const CREATE_STRUCTURE: &str = "/internal-api/structures";

/// Create a root work item from a filled-in template
pub const CREATE_PROJECT: &str = "/internal-api/structures/partial";

pub const INSERT_ALLOCATION: &str = "/services/AllocateListAttributeServiceJson.svc/InsertRow?pt=PROJECT";

pub const SMART_TIMEENTRY: &str = "/internal-api/timesheet/smart-timeentry";

pub fn strategy_by_id(id: &str) -> String {
    format!("/internal-api/strategies/byId/{}", id)
}

/// Human-facing planning page of a project
pub fn plan_page(base_url: &str, project_id: &str) -> String {
    format!(
        "{}/ProjectPlanning/Plan?projectId={}",
        base_url.trim_end_matches('/'),
        project_id
    )
}
