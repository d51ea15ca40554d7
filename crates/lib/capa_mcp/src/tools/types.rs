//! Types for prepared capability calls.

use serde::Serialize;
use serde_json::Value;

use capa_core::models::capability::HttpMethod;

/// An outbound request ready for the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedCall {
    pub tool_name: String,
    pub method: HttpMethod,
    /// Target URL, including the encoded query string for query-based methods.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}
