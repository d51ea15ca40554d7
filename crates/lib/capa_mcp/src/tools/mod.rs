// @awa-component: MCP-CapabilityTools
//
//! Capability tools: MCP tool definitions and call preparation.

pub mod call;
pub mod types;


use std::sync::Arc;

use rmcp::model::{JsonObject, Tool};
use serde_json::Value;

use capa_core::models::capability::Capability;

/// MCP tool definition for a capability. Fixed params never appear in the
/// input schema.
pub fn capability_tool(capability: &Capability) -> Tool {
    let schema: JsonObject = match capability.llm_tool_schema() {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    };
    Tool::new(
        capability.name.clone(),
        capability.description.clone(),
        Arc::new(schema),
    )
}

/// Tool definitions for a set of capabilities, in the given order.
///
/// Capabilities with an empty name cannot be called and are skipped.
pub fn capability_tools(capabilities: &[Capability]) -> Vec<Tool> {
    capabilities
        .iter()
        .filter(|c| {
            let named = !c.name.trim().is_empty();
            if !named {
                log::warn!("Skipping capability without a name in tool listing");
            }
            named
        })
        .map(capability_tool)
        .collect()
}
