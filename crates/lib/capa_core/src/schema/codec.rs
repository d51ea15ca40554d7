// @awa-component: CAP-SchemaCodec
//
//! Schema codec: converts between the stored capability schema, the
//! parameter tree, and the editable `{fixedParams, llmParamsSchema}` pair.
//!
//! Stored form:
//!
//! ```json
//! {
//!   "properties": {
//!     "lang":  { "type": "string", "const": "en" },
//!     "query": { "type": "string", "required": true }
//!   },
//!   "required": ["query"]
//! }
//! ```
//!
//! Decoding is total: malformed input degrades to an empty pair.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::compiler::compiled_fixed_value;
use super::model::{ArrayItems, Binding, ParamType, ParameterNode, validate_tree};
use super::{MAX_DEPTH, PathSegment, SchemaError, child_path, items_path, split_path};

/// The LLM-visible half of a capability schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmParamsSchema {
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl LlmParamsSchema {
    /// Standard JSON Schema object handed to the tool-calling layer.
    pub fn to_json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// Decoded, editable pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableParams {
    /// Operator constants keyed by path (`lang`, `address.country`, `lines[].currency`).
    #[serde(default)]
    pub fixed_params: Map<String, Value>,
    #[serde(default)]
    pub llm_params_schema: LlmParamsSchema,
}

// =============================================================================
// Stored form → tree
// =============================================================================

/// Parse a stored schema into a parameter tree. Never fails; entries that
/// cannot be read are skipped with a warning.
pub fn parse_tree(stored: &Value) -> Vec<ParameterNode> {
    let Some(properties) = stored.get("properties").and_then(Value::as_object) else {
        if !stored.is_null() {
            log::warn!("Stored parameter schema has no properties object; treating as empty");
        }
        return Vec::new();
    };
    let required = string_list(stored.get("required"));
    parse_properties(properties, &required, "", 0)
}

/// Parse one JSON Schema property into a node.
pub fn node_from_schema(name: &str, schema: &Value, required: bool) -> Option<ParameterNode> {
    let parent_required = if required { vec![name.to_string()] } else { Vec::new() };
    parse_node(name, schema, &parent_required, "", 0)
}

fn parse_properties(
    properties: &Map<String, Value>,
    required: &[String],
    parent: &str,
    depth: usize,
) -> Vec<ParameterNode> {
    if depth >= MAX_DEPTH {
        log::warn!("Parameter schema nested deeper than {MAX_DEPTH} levels at '{parent}'; truncating");
        return Vec::new();
    }
    properties
        .iter()
        .filter_map(|(name, encoded)| parse_node(name, encoded, required, parent, depth))
        .collect()
}

fn parse_node(
    name: &str,
    encoded: &Value,
    parent_required: &[String],
    parent: &str,
    depth: usize,
) -> Option<ParameterNode> {
    let path = child_path(parent, name);
    let Some(obj) = encoded.as_object() else {
        log::warn!("Skipping parameter '{path}': encoded node is not an object");
        return None;
    };

    let enum_values = string_list(obj.get("enum"));
    let binding = match obj.get("const") {
        Some(value) => Binding::Fixed(value.clone()),
        None => Binding::Llm {
            required: obj.get("required").and_then(Value::as_bool).unwrap_or(false)
                || parent_required.iter().any(|r| r == name),
            default: obj.get("default").cloned(),
        },
    };
    let kind = declared_kind(obj, &binding, !enum_values.is_empty());
    let extra = unmodeled(obj, NODE_KEYS, kind == ParamType::Enum);
    let enum_values = if kind == ParamType::Enum { enum_values } else { Vec::new() };

    let mut node = ParameterNode {
        name: name.to_string(),
        kind,
        description: obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        binding,
        enum_values,
        items: None,
        children: Vec::new(),
        extra,
    };

    match node.kind {
        ParamType::Object => {
            if let Some(props) = obj.get("properties").and_then(Value::as_object) {
                let child_required = string_list(obj.get("required"));
                node.children = parse_properties(props, &child_required, &path, depth + 1);
            }
        }
        ParamType::Array => {
            node.items = obj
                .get("items")
                .and_then(Value::as_object)
                .map(|items| parse_items(items, &items_path(&path), depth));
        }
        _ => {}
    }

    Some(node)
}

fn parse_items(items: &Map<String, Value>, path: &str, depth: usize) -> ArrayItems {
    let enum_values = string_list(items.get("enum"));
    let items_type = match items.get("type").and_then(Value::as_str) {
        Some("string") if !enum_values.is_empty() => ParamType::Enum,
        Some(t) => ParamType::parse(t),
        None if !enum_values.is_empty() => ParamType::Enum,
        None if items.contains_key("properties") => ParamType::Object,
        None if items.contains_key("items") => ParamType::Array,
        None => ParamType::String,
    };
    let mut parsed = ArrayItems::new(items_type.clone());
    parsed.extra = unmodeled(items, ITEMS_KEYS, items_type == ParamType::Enum);

    match items_type {
        ParamType::Object => {
            if let Some(props) = items.get("properties").and_then(Value::as_object) {
                let required = string_list(items.get("required"));
                parsed.item_properties = parse_properties(props, &required, path, depth + 1);
            }
        }
        ParamType::Enum => parsed.enum_values = enum_values,
        ParamType::Array => {
            if let Some(inner) = items.get("items").and_then(Value::as_object) {
                if depth + 1 >= MAX_DEPTH {
                    log::warn!("Array items nested deeper than {MAX_DEPTH} levels at '{path}'; truncating");
                } else {
                    parsed.items = Some(Box::new(parse_items(inner, &items_path(path), depth + 1)));
                }
            }
        }
        _ => {}
    }
    parsed
}

fn declared_kind(obj: &Map<String, Value>, binding: &Binding, has_enum: bool) -> ParamType {
    match obj.get("type").and_then(Value::as_str) {
        Some("string") if has_enum => ParamType::Enum,
        Some(t) => ParamType::parse(t),
        None => match binding {
            Binding::Fixed(value) => ParamType::infer(value),
            Binding::Llm { .. } if has_enum => ParamType::Enum,
            Binding::Llm { .. } if obj.contains_key("properties") => ParamType::Object,
            Binding::Llm { .. } if obj.contains_key("items") => ParamType::Array,
            Binding::Llm { .. } => ParamType::Unknown(String::new()),
        },
    }
}

/// Keywords a node interprets. `enum` is interpreted only on enum nodes.
const NODE_KEYS: &[&str] = &[
    "type",
    "description",
    "const",
    "default",
    "required",
    "properties",
    "items",
];

/// Keywords an `items` descriptor interprets.
const ITEMS_KEYS: &[&str] = &["type", "required", "properties", "items"];

fn unmodeled(obj: &Map<String, Value>, modeled: &[&str], enum_modeled: bool) -> Map<String, Value> {
    obj.iter()
        .filter(|(k, _)| !modeled.contains(&k.as_str()) && !(enum_modeled && k.as_str() == "enum"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn write_extra(out: &mut Map<String, Value>, extra: &Map<String, Value>) {
    for (key, value) in extra {
        out.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

// =============================================================================
// Tree → stored form
// =============================================================================

/// Encode a parameter tree into the stored form. The tree is validated first
/// and every violation is reported.
pub fn encode_tree(nodes: &[ParameterNode]) -> Result<Value, SchemaError> {
    validate_tree(nodes)?;

    let mut properties = Map::new();
    let mut required = Vec::new();
    for node in nodes {
        if node.is_required() {
            required.push(Value::String(node.name.clone()));
        }
        properties.insert(node.name.clone(), encode_node(node));
    }
    Ok(json!({ "properties": properties, "required": required }))
}

fn encode_node(node: &ParameterNode) -> Value {
    let mut out = Map::new();
    if let Some(t) = node.kind.json_type() {
        out.insert("type".into(), Value::String(t.to_string()));
    }
    if let Some(description) = &node.description {
        out.insert("description".into(), Value::String(description.clone()));
    }
    match &node.binding {
        Binding::Fixed(value) => {
            out.insert("const".into(), value.clone());
        }
        Binding::Llm { required, default } => {
            if let Some(default) = default {
                out.insert("default".into(), default.clone());
            }
            if *required {
                out.insert("required".into(), Value::Bool(true));
            }
        }
    }
    if node.kind == ParamType::Enum {
        out.insert("enum".into(), json!(node.enum_values));
    }
    if node.kind == ParamType::Object && !node.children.is_empty() {
        out.insert("properties".into(), encode_properties(&node.children));
    }
    if let Some(items) = &node.items {
        out.insert("items".into(), encode_items(items));
    }
    write_extra(&mut out, &node.extra);
    Value::Object(out)
}

fn encode_items(items: &ArrayItems) -> Value {
    let mut out = items_header(items);
    if !items.item_properties.is_empty() {
        out.insert("properties".into(), encode_properties(&items.item_properties));
    }
    if let Some(inner) = &items.items {
        out.insert("items".into(), encode_items(inner));
    }
    write_extra(&mut out, &items.extra);
    Value::Object(out)
}

fn items_header(items: &ArrayItems) -> Map<String, Value> {
    let mut out = Map::new();
    if let Some(t) = items.items_type.json_type() {
        out.insert("type".into(), Value::String(t.to_string()));
    }
    if items.items_type == ParamType::Enum {
        out.insert("enum".into(), json!(items.enum_values));
    }
    out
}

fn encode_properties(nodes: &[ParameterNode]) -> Value {
    Value::Object(
        nodes
            .iter()
            .map(|n| (n.name.clone(), encode_node(n)))
            .collect(),
    )
}

// =============================================================================
// Tree ↔ editable pair
// =============================================================================

/// Split a tree into its fixed values and its LLM-visible JSON Schema.
///
/// Fixed nodes nested inside LLM containers are moved out under their path key,
/// so no fixed node appears in the LLM schema at any depth.
pub fn split(nodes: &[ParameterNode]) -> EditableParams {
    let mut params = EditableParams::default();
    for node in nodes {
        match &node.binding {
            Binding::Fixed(_) => {
                params
                    .fixed_params
                    .insert(node.name.clone(), pair_fixed_value(node, &node.name));
            }
            Binding::Llm { required, .. } => {
                let schema = llm_schema_node(node, &node.name, &mut params.fixed_params);
                params
                    .llm_params_schema
                    .properties
                    .insert(node.name.clone(), schema);
                if *required {
                    params.llm_params_schema.required.push(node.name.clone());
                }
            }
        }
    }
    params
}

/// Value a fixed node carries in the pair: what the compiler would send, so
/// the pair and the tree produce the same request. Operator text that does not
/// compile is kept as written.
fn pair_fixed_value(node: &ParameterNode, path: &str) -> Value {
    match compiled_fixed_value(node, path) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("{e}; keeping the stored text");
            node.const_value().cloned().unwrap_or(Value::Null)
        }
    }
}

fn llm_schema_node(node: &ParameterNode, path: &str, fixed: &mut Map<String, Value>) -> Value {
    let mut out = Map::new();
    if let Some(t) = node.kind.json_type() {
        out.insert("type".into(), Value::String(t.to_string()));
    }
    if let Some(description) = &node.description {
        out.insert("description".into(), Value::String(description.clone()));
    }
    if let Some(default) = node.default_value() {
        out.insert("default".into(), default.clone());
    }
    if node.kind == ParamType::Enum {
        out.insert("enum".into(), json!(node.enum_values));
    }
    if node.kind == ParamType::Object && !node.children.is_empty() {
        let (properties, required) = llm_container(&node.children, path, fixed);
        out.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            out.insert("required".into(), json!(required));
        }
    }
    if let Some(items) = &node.items {
        out.insert("items".into(), llm_items(items, &items_path(path), fixed));
    }
    write_extra(&mut out, &node.extra);
    Value::Object(out)
}

fn llm_items(items: &ArrayItems, path: &str, fixed: &mut Map<String, Value>) -> Value {
    let mut out = items_header(items);
    if !items.item_properties.is_empty() {
        let (properties, required) = llm_container(&items.item_properties, path, fixed);
        out.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            out.insert("required".into(), json!(required));
        }
    }
    if let Some(inner) = &items.items {
        out.insert("items".into(), llm_items(inner, &items_path(path), fixed));
    }
    write_extra(&mut out, &items.extra);
    Value::Object(out)
}

fn llm_container(
    nodes: &[ParameterNode],
    parent: &str,
    fixed: &mut Map<String, Value>,
) -> (Map<String, Value>, Vec<String>) {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for node in nodes {
        let path = child_path(parent, &node.name);
        match &node.binding {
            Binding::Fixed(_) => {
                let value = pair_fixed_value(node, &path);
                fixed.insert(path, value);
            }
            Binding::Llm { required: r, .. } => {
                properties.insert(node.name.clone(), llm_schema_node(node, &path, fixed));
                if *r {
                    required.push(node.name.clone());
                }
            }
        }
    }
    (properties, required)
}

/// Rebuild a tree from an editable pair: fixed nodes first, then LLM nodes, at
/// every level. Fails when a nested fixed path has no LLM container to live in.
pub fn join(params: &EditableParams) -> Result<Vec<ParameterNode>, SchemaError> {
    let llm = &params.llm_params_schema;
    let mut nodes: Vec<ParameterNode> = llm
        .properties
        .iter()
        .filter_map(|(name, schema)| parse_node(name, schema, &llm.required, "", 0))
        .collect();

    let mut errors = Vec::new();
    for (path, value) in &params.fixed_params {
        let Some((segments, leaf)) = split_path(path) else {
            errors.push(format!("{path}: malformed fixed parameter path"));
            continue;
        };
        let node = ParameterNode::fixed(leaf, ParamType::infer(value), value.clone());
        match container_mut(&mut nodes, &segments) {
            Some(container) => {
                let at = container.iter().take_while(|n| n.is_fixed()).count();
                container.insert(at, node);
            }
            None => errors.push(format!("{path}: no LLM container for this fixed parameter")),
        }
    }

    if errors.is_empty() {
        Ok(nodes)
    } else {
        Err(SchemaError::Invalid(errors))
    }
}

fn container_mut<'a>(
    nodes: &'a mut Vec<ParameterNode>,
    segments: &[PathSegment<'_>],
) -> Option<&'a mut Vec<ParameterNode>> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(nodes);
    };
    let (name, levels) = match first {
        PathSegment::Child(n) => (*n, 0),
        PathSegment::Items(n, levels) => (*n, *levels),
    };
    let node = nodes.iter_mut().find(|n| n.name == name && !n.is_fixed())?;
    if levels == 0 {
        if node.kind != ParamType::Object {
            return None;
        }
        return container_mut(&mut node.children, rest);
    }
    let mut items = node.items.as_mut()?;
    for _ in 1..levels {
        items = items.items.as_deref_mut()?;
    }
    if items.items_type != ParamType::Object {
        return None;
    }
    container_mut(&mut items.item_properties, rest)
}

// =============================================================================
// Stored form ↔ editable pair
// =============================================================================

/// Decode a stored schema into the editable pair. Never fails: malformed input
/// (including unparsable JSON text) decodes to an empty pair.
pub fn decode(stored: &Value) -> EditableParams {
    if let Value::String(text) = stored {
        return decode_str(text);
    }
    let nodes = parse_tree(stored);
    let mut params = split(&nodes);

    // Flagged entries first, then the stored list in its own order.
    let flagged = nodes.iter().filter(|n| {
        !n.is_fixed()
            && stored
                .pointer(&format!("/properties/{}/required", pointer_escape(&n.name)))
                .and_then(Value::as_bool)
                .unwrap_or(false)
    });
    let mut required: Vec<String> = flagged.map(|n| n.name.clone()).collect();
    for name in string_list(stored.get("required")) {
        if !params.fixed_params.contains_key(&name) && !required.contains(&name) {
            required.push(name);
        }
    }
    params.llm_params_schema.required = required;
    params
}

fn pointer_escape(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}

/// Decode stored schema text.
pub fn decode_str(text: &str) -> EditableParams {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::String(_)) | Err(_) => {
            log::warn!("Stored parameter schema is not valid JSON; treating as empty");
            EditableParams::default()
        }
        Ok(value) => decode(&value),
    }
}

/// Encode an editable pair into the stored form.
pub fn encode(params: &EditableParams) -> Result<Value, SchemaError> {
    let nodes = join(params)?;
    let mut stored = encode_tree(&nodes)?;
    // Required names with no declared property survive in the top-level list.
    let declared: Vec<&String> = params.llm_params_schema.properties.keys().collect();
    let extra: Vec<Value> = params
        .llm_params_schema
        .required
        .iter()
        .filter(|r| !declared.contains(r) && !params.fixed_params.contains_key(*r))
        .map(|r| Value::String(r.clone()))
        .collect();
    if let Some(Value::Array(required)) = stored.get_mut("required") {
        required.extend(extra);
    }
    Ok(stored)
}
