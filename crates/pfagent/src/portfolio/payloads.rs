//! Fixed-shape request documents for the portfolio API.
//!
//! Task and project documents start from the blank structure the API hands out and only
//! fill in a few fields; the allocation document is a static row template.
use serde_json::{json, Value};

/// Attribute that holds a structure's long description
pub const DESCRIPTION_ATTRIBUTE: &str = "PE01";

const ALLOCATION_START: &str = "2025-04-12T08:00:00";
const ALLOCATION_FINISH: &str = "2025-09-19T17:00:00";
const PROFILE_START: &str = "2021-09-12T08:00:00";
const CALENDAR: &str = "STANDARD";

/// Fill a blank structure document for a task or sub-item
pub fn task_payload(template: Value, name: &str, description: &str) -> Value {
    let mut payload = as_object(template);
    payload["Description"] = json!(name);
    payload["Attributes"] = json!({ DESCRIPTION_ATTRIBUTE: description });
    payload
}

/// Fill a blank structure document for a root work item placed under `father_code`
pub fn project_payload(template: Value, name: &str, description: &str, father_code: &str) -> Value {
    let mut payload = task_payload(template, name, description);
    payload["Parent"] = json!({ "StructureCode": father_code });
    payload
}

fn as_object(template: Value) -> Value {
    if template.is_object() {
        template
    } else {
        json!({})
    }
}

fn cell(column_id: &str, current: Value, original: Value, cell_type: u8, display: Value) -> Value {
    json!({
        "ColumnId": column_id,
        "CurrentValue": current,
        "OriginalValue": original,
        "Type": cell_type,
        "DisplayText": display,
        "IsReadOnly": false,
        "LinkPath": "",
    })
}

fn same(column_id: &str, value: Value, cell_type: u8, display: Value) -> Value {
    cell(column_id, value.clone(), value, cell_type, display)
}

/// Row insert document assigning `resource_code` to `task_code` inside `project_code`
pub fn allocation_payload(
    project_code: &str,
    task_code: &str,
    resource_code: &str,
    resource_description: &str,
) -> Value {
    let cells = vec![
        same("ALLO_PLANNING_CODE", json!(task_code), 8, json!("")),
        same("ALLO_RESOURCE_CODE", json!(resource_code), 8, json!("")),
        same("ALLO_TEAM", Value::Null, 7, Value::Null),
        same("ALLO_RESERVE_CODE", Value::Null, 8, json!("")),
        same("ALLO_PPL_CODE", json!(project_code), 8, json!("")),
        same("ALLO_CALENDAR_CODE", json!(CALENDAR), 8, json!("")),
        same("ALLO_RESOURCE_DESCRIPTION", json!(resource_description), 7, Value::Null),
        same("ALLO_REQUIREMENT_DESCRIPTION", Value::Null, 7, Value::Null),
        same("ALLO_STATE", json!("APR"), 8, json!("")),
        same("ALLO_START_DATE", json!(ALLOCATION_START), 10, Value::Null),
        same("ALLO_FINISH_DATE", json!(ALLOCATION_FINISH), 10, Value::Null),
        cell("ALLO_DURATION", json!("8.00:00:00"), json!("2.00:00:00"), 1, json!("")),
        cell("ALLO_REMAIN", json!("8.00:00:00"), json!("2.00:00:00"), 2, json!("")),
        same("ALLO_PCT_UTILIZATION", json!(1), 6, Value::Null),
        same("ALLO_LID", Value::Null, 10, Value::Null),
        same("ALLO_RESOURCE_NB", json!(1), 4, json!("0")),
        same("ALLO_WORKSET_CODE", Value::Null, 4, json!("0")),
    ];

    json!({
        "pplCode": project_code,
        "rowDto": { "Cells": cells },
        "fatherRowDto": {
            "Cells": [same("PE_PLANNING_CODE", json!(task_code), 8, json!(task_code))]
        },
        "profileDto": {
            "ProfileId": format!("ALO:{}:{}:0", task_code, resource_code),
            "CalendarId": CALENDAR,
            "StartTimes": [PROFILE_START, ALLOCATION_FINISH],
            "Heights": [1, 0],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_payload_keeps_template_fields() {
        let template = json!({"StructureCode": "101", "Status": {"Id": 3}, "Description": ""});
        let payload = task_payload(template, "Driver Management", "Driver profiles");

        assert_eq!(payload["StructureCode"], "101");
        assert_eq!(payload["Status"]["Id"], 3);
        assert_eq!(payload["Description"], "Driver Management");
        assert_eq!(payload["Attributes"]["PE01"], "Driver profiles");
        assert!(payload.get("Parent").is_none());
    }

    #[test]
    fn test_project_payload_sets_parent() {
        let payload = project_payload(json!({"StructureCode": "100"}), "Fleet", "Deliveries", "9");
        assert_eq!(payload["Parent"]["StructureCode"], "9");
        assert_eq!(payload["Description"], "Fleet");
    }

    #[test]
    fn test_non_object_template_is_replaced() {
        let payload = task_payload(json!(["unexpected"]), "A", "B");
        assert_eq!(payload, json!({"Description": "A", "Attributes": {"PE01": "B"}}));
    }

    #[test]
    fn test_allocation_payload_shape() {
        let payload = allocation_payload("20276", "20300", "20556", "20556|M Davis");

        assert_eq!(payload["pplCode"], "20276");
        let cells = payload["rowDto"]["Cells"].as_array().unwrap();
        assert_eq!(cells.len(), 17);

        let find = |id: &str| cells.iter().find(|c| c["ColumnId"] == id).unwrap().clone();
        assert_eq!(find("ALLO_PLANNING_CODE")["CurrentValue"], "20300");
        assert_eq!(find("ALLO_RESOURCE_CODE")["OriginalValue"], "20556");
        assert_eq!(find("ALLO_PPL_CODE")["CurrentValue"], "20276");
        assert_eq!(find("ALLO_RESOURCE_DESCRIPTION")["CurrentValue"], "20556|M Davis");
        assert_eq!(find("ALLO_DURATION")["OriginalValue"], "2.00:00:00");
        assert_eq!(find("ALLO_TEAM")["DisplayText"], Value::Null);

        assert_eq!(payload["fatherRowDto"]["Cells"][0]["DisplayText"], "20300");
        assert_eq!(payload["profileDto"]["ProfileId"], "ALO:20300:20556:0");
        assert_eq!(payload["profileDto"]["Heights"], json!([1, 0]));
    }
}
