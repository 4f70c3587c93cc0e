use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
struct ToolSummary {
    name: String,
    description: String,
}

async fn ready() -> Json<Value> {
    Json(json!({ "status": "ready" }))
}

async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    let tools: Vec<ToolSummary> = state
        .factory
        .tools()
        .into_iter()
        .map(|tool| ToolSummary {
            name: tool.name,
            description: tool.description,
        })
        .collect();
    Json(json!({ "tools": tools }))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(ready))
        .route("/tools", get(list_tools))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scripted_state;
    use axum::{
        body::{self, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn get_json(app: Router, uri: &str) -> Value {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ready() {
        let app = routes(scripted_state(vec![]));
        assert_eq!(get_json(app, "/").await, json!({"status": "ready"}));
    }

    #[tokio::test]
    async fn test_list_tools() {
        let app = routes(scripted_state(vec![]));
        let body = get_json(app, "/tools").await;

        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 8);
        assert_eq!(tools[0]["name"], "portfolio__create_work");
        assert!(tools
            .iter()
            .any(|tool| tool["name"] == "demo__greeting"
                && tool["description"] == "Get a personalized greeting"));
    }
}
