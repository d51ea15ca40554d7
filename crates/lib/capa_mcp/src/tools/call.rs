// @awa-component: MCP-CapabilityCall
//
//! Tool-call preparation: checks LLM arguments against the capability and
//! compiles the outbound request.

use rmcp::model::{CallToolResult, Content, ErrorCode, ErrorData};
use serde_json::{Map, Value};
use thiserror::Error;

use capa_core::models::capability::{Capability, TestExecutionResponse};
use capa_core::schema::collector::missing_required;
use capa_core::schema::compiler::{CompileError, Compiled};

use super::types::PreparedCall;

/// Errors rejecting a tool call before it is sent.
#[derive(Debug, Error, PartialEq)]
pub enum ToolCallError {
    #[error("Arguments must be a JSON object")]
    NotAnObject,

    #[error("Missing required arguments: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("Arguments not accepted by this tool: {}", .0.join(", "))]
    FixedOverride(Vec<String>),

    #[error("Cannot build request: {0}")]
    Compile(#[from] CompileError),
}

impl From<ToolCallError> for ErrorData {
    fn from(e: ToolCallError) -> Self {
        let code = match e {
            ToolCallError::Compile(_) => ErrorCode::INTERNAL_ERROR,
            _ => ErrorCode::INVALID_PARAMS,
        };
        ErrorData::new(code, e.to_string(), None)
    }
}

/// Validate LLM arguments and compile the request.
///
/// Arguments naming a fixed parameter are rejected: the LLM never sees
/// those names and must not override operator values.
pub fn prepare_call(
    capability: &Capability,
    arguments: Option<&Value>,
) -> Result<PreparedCall, ToolCallError> {
    let empty = Map::new();
    let args = match arguments {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => return Err(ToolCallError::NotAnObject),
    };

    let params = capability.editable_params();
    let overrides: Vec<String> = args
        .keys()
        .filter(|k| params.fixed_params.contains_key(*k))
        .cloned()
        .collect();
    if !overrides.is_empty() {
        return Err(ToolCallError::FixedOverride(overrides));
    }

    let missing = missing_required(&params.llm_params_schema, args);
    if !missing.is_empty() {
        return Err(ToolCallError::MissingRequired(missing));
    }

    let (url, body) = match capability.compile_call(args)? {
        Compiled::Query(query) if query.pairs.is_empty() => (capability.url.clone(), None),
        Compiled::Query(query) => {
            let sep = if capability.url.contains('?') { '&' } else { '?' };
            (format!("{}{sep}{}", capability.url, query.encoded()), None)
        }
        Compiled::Body(body) => (capability.url.clone(), Some(body)),
    };
    log::debug!("Prepared {} call for tool '{}'", capability.method, capability.name);

    Ok(PreparedCall {
        tool_name: capability.name.clone(),
        method: capability.method,
        url,
        body,
    })
}

/// Convert an execution response into an MCP tool result.
pub fn call_result(response: &TestExecutionResponse) -> CallToolResult {
    if response.success {
        let data = response.data.clone().unwrap_or(Value::Null);
        let text = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());
        CallToolResult::success(vec![Content::text(text)])
    } else {
        let error = match &response.error {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => match response.status_code {
                Some(code) => format!("Capability call failed with status {code}"),
                None => "Capability call failed".to_string(),
            },
        };
        CallToolResult::error(vec![Content::text(error)])
    }
}
