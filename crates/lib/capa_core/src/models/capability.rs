//! Capability domain models.
//!
//! A capability is one operator-described HTTP call exposed to an LLM as a
//! tool. Its `body_params` holds the stored parameter schema; everything
//! else in this crate reads it through [`crate::schema::codec`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::codec::{self, EditableParams};
use crate::schema::compiler::{self, CompileError, CompileMode, Compiled};
use crate::schema::model::ParameterNode;
use crate::schema::SchemaError;

// =============================================================================
// Enums
// =============================================================================

/// HTTP method of a capability call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether parameters travel in the query string rather than a JSON body.
    pub fn uses_query(&self) -> bool {
        matches!(self, Self::Get | Self::Delete)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("Unsupported HTTP method: {other}")),
        }
    }
}

// =============================================================================
// Capability
// =============================================================================

/// A capability as exchanged with the capability API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub url: String,
    /// Stored parameter schema. May arrive as JSON text.
    #[serde(default)]
    pub body_params: Value,
}

impl Capability {
    /// Decoded `{fixedParams, llmParamsSchema}` pair.
    pub fn editable_params(&self) -> EditableParams {
        codec::decode(&self.body_params)
    }

    /// Parameter tree for the editor.
    pub fn parameters(&self) -> Vec<ParameterNode> {
        match &self.body_params {
            Value::String(text) => serde_json::from_str(text)
                .map(|v| codec::parse_tree(&v))
                .unwrap_or_default(),
            stored => codec::parse_tree(stored),
        }
    }

    /// Replace the stored schema with an edited tree.
    pub fn set_parameters(&mut self, nodes: &[ParameterNode]) -> Result<(), SchemaError> {
        self.body_params = codec::encode_tree(nodes)?;
        Ok(())
    }

    /// Replace the stored schema with an edited pair.
    pub fn set_editable_params(&mut self, params: &EditableParams) -> Result<(), SchemaError> {
        self.body_params = codec::encode(params)?;
        Ok(())
    }

    /// JSON Schema handed to the tool-calling layer. Fixed params never appear.
    pub fn llm_tool_schema(&self) -> Value {
        self.editable_params().llm_params_schema.to_json_schema()
    }

    /// Preview of the request with placeholders for LLM parameters.
    pub fn preview(&self) -> Result<Compiled, CompileError> {
        compiler::preview(&self.parameters(), self.method)
    }

    /// Outbound request for real arguments.
    pub fn compile_call(&self, arguments: &Map<String, Value>) -> Result<Compiled, CompileError> {
        compiler::compile(
            &self.parameters(),
            self.method,
            Some(arguments),
            CompileMode::Execute,
        )
    }
}

// =============================================================================
// Test execution
// =============================================================================

/// Body of `POST capability/{id}/test`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestExecutionRequest {
    pub params: Map<String, Value>,
}

/// Result of a test execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestExecutionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}
