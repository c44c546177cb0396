use rmcp::model::{CallToolResult, Content, JsonObject};
use rmcp::ErrorData as McpError;
use websift_core::{
    Focus, SearchOutcome, ValidationError, DEFAULT_NUM_RESULTS, MAX_NUM_RESULTS, MIN_NUM_RESULTS,
};

pub(crate) fn search_web_schema() -> JsonObject {
    let focus: Vec<&str> = Focus::ALL.iter().map(|f| f.as_str()).collect();
    let schema = serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "The search query string",
                "minLength": 1
            },
            "num_results": {
                "type": "integer",
                "description": format!(
                    "Number of search results to return ({MIN_NUM_RESULTS}-{MAX_NUM_RESULTS}, default {DEFAULT_NUM_RESULTS})"
                ),
                "minimum": MIN_NUM_RESULTS,
                "maximum": MAX_NUM_RESULTS
            },
            "focus": {
                "type": "string",
                "description": "Focus area for search results (default technical)",
                "enum": focus
            }
        },
        "required": ["query"]
    });
    match schema {
        serde_json::Value::Object(m) => m,
        _ => JsonObject::new(),
    }
}

/// The outcome as pretty JSON text; failure outcomes also set `isError`.
pub(crate) fn outcome_result(outcome: &SearchOutcome) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(outcome)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    let content = vec![Content::text(text)];
    Ok(if outcome.is_success() {
        CallToolResult::success(content)
    } else {
        CallToolResult::error(content)
    })
}

pub(crate) fn invalid_params_result(e: &ValidationError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!("Invalid parameters: {e}"))])
}
