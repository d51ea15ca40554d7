//! # capa_mcp
//!
//! MCP (Model Context Protocol) surface for Capa capabilities.
//!
//! Exposes each capability as an MCP tool whose input schema is the
//! LLM-visible half of its parameter schema, and turns an LLM tool call's
//! arguments into the outbound request.

pub mod tools;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
