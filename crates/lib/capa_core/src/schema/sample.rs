// @awa-component: CAP-SampleGenerator
//
//! Sample and placeholder generation.
//!
//! Produces the value shown in previews before real arguments exist: fixed
//! nodes contribute their literal constant, LLM nodes a type-tagged stand-in.

use serde_json::{Map, Value};

use super::MAX_DEPTH;
use super::codec::LlmParamsSchema;
use super::collector::{FormInput, FormValue};
use super::model::{ArrayItems, Binding, ParamType, ParameterNode, emit_order};

pub const STRING_PLACEHOLDER: &str = "<string>";
pub const NUMBER_PLACEHOLDER: &str = "<number>";
pub const BOOLEAN_PLACEHOLDER: &str = "<boolean>";
pub const ENUM_PLACEHOLDER: &str = "<enum>";
pub const VALUE_PLACEHOLDER: &str = "<value>";

/// Placeholder for a scalar type.
pub fn placeholder(kind: &ParamType) -> Value {
    let token = match kind {
        ParamType::String => STRING_PLACEHOLDER,
        ParamType::Number | ParamType::Integer => NUMBER_PLACEHOLDER,
        ParamType::Boolean => BOOLEAN_PLACEHOLDER,
        ParamType::Enum => ENUM_PLACEHOLDER,
        _ => VALUE_PLACEHOLDER,
    };
    Value::String(token.to_string())
}

/// Representative value for a node.
pub fn sample(node: &ParameterNode) -> Value {
    sample_at(node, 0)
}

/// Sample object for a container, fixed members first.
pub fn sample_object(nodes: &[ParameterNode]) -> Map<String, Value> {
    sample_members(nodes, 0)
}

fn sample_members(nodes: &[ParameterNode], depth: usize) -> Map<String, Value> {
    emit_order(nodes)
        .map(|n| (n.name.clone(), sample_at(n, depth)))
        .collect()
}

fn sample_at(node: &ParameterNode, depth: usize) -> Value {
    if let Binding::Fixed(value) = &node.binding {
        return value.clone();
    }
    if depth >= MAX_DEPTH {
        return Value::String(VALUE_PLACEHOLDER.to_string());
    }
    match &node.kind {
        ParamType::Enum => node
            .enum_values
            .first()
            .map(|v| Value::String(v.clone()))
            .unwrap_or_else(|| placeholder(&ParamType::Enum)),
        ParamType::Object => Value::Object(sample_members(&node.children, depth + 1)),
        ParamType::Array => {
            let element = match &node.items {
                Some(items) => sample_items_at(items, depth),
                None => placeholder(&ParamType::String),
            };
            Value::Array(vec![element])
        }
        scalar => placeholder(scalar),
    }
}

/// Representative element of an array.
pub fn sample_items(items: &ArrayItems) -> Value {
    sample_items_at(items, 0)
}

fn sample_items_at(items: &ArrayItems, depth: usize) -> Value {
    if depth >= MAX_DEPTH {
        return Value::String(VALUE_PLACEHOLDER.to_string());
    }
    match &items.items_type {
        ParamType::Object => Value::Object(sample_members(&items.item_properties, depth + 1)),
        ParamType::Enum => items
            .enum_values
            .first()
            .map(|v| Value::String(v.clone()))
            .unwrap_or_else(|| placeholder(&ParamType::Enum)),
        ParamType::Array => {
            let inner = match items.items.as_deref() {
                Some(inner) => sample_items_at(inner, depth + 1),
                None => placeholder(&ParamType::String),
            };
            Value::Array(vec![inner])
        }
        scalar => placeholder(scalar),
    }
}

/// Representative value for a JSON Schema node, without building a tree.
pub fn sample_from_schema(schema: &Value) -> Value {
    schema_sample_at(schema, 0)
}

/// Sample argument object for the LLM half of a capability.
pub fn sample_params(schema: &LlmParamsSchema) -> Map<String, Value> {
    schema
        .properties
        .iter()
        .map(|(name, node)| (name.clone(), sample_from_schema(node)))
        .collect()
}

fn schema_sample_at(schema: &Value, depth: usize) -> Value {
    if let Some(value) = schema.get("const") {
        return value.clone();
    }
    if depth >= MAX_DEPTH {
        return Value::String(VALUE_PLACEHOLDER.to_string());
    }
    if let Some(first) = schema
        .get("enum")
        .and_then(Value::as_array)
        .and_then(|values| values.first())
    {
        return first.clone();
    }
    let kind = schema
        .get("type")
        .and_then(Value::as_str)
        .map(ParamType::parse)
        .unwrap_or(ParamType::Unknown(String::new()));
    match kind {
        ParamType::Object => {
            let members = schema
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| {
                    props
                        .iter()
                        .map(|(k, v)| (k.clone(), schema_sample_at(v, depth + 1)))
                        .collect()
                })
                .unwrap_or_default();
            Value::Object(members)
        }
        ParamType::Array => {
            let element = schema
                .get("items")
                .map(|items| schema_sample_at(items, depth + 1))
                .unwrap_or_else(|| placeholder(&ParamType::String));
            Value::Array(vec![element])
        }
        scalar => placeholder(&scalar),
    }
}

/// Fallback default for a type.
pub fn default_for_type(kind: &ParamType) -> Value {
    match kind {
        ParamType::String | ParamType::Enum => Value::String(String::new()),
        ParamType::Number | ParamType::Integer => Value::from(0),
        ParamType::Boolean => Value::Bool(false),
        ParamType::Array => Value::Array(Vec::new()),
        ParamType::Object => Value::Object(Map::new()),
        ParamType::Unknown(_) => Value::Null,
    }
}

/// Default of one node: its declared default, else the first enum value,
/// else the type default.
pub fn default_value(node: &ParameterNode) -> Value {
    if let Some(default) = node.default_value() {
        return default.clone();
    }
    match node.kind {
        ParamType::Enum => node
            .enum_values
            .first()
            .map(|v| Value::String(v.clone()))
            .unwrap_or_else(|| default_for_type(&node.kind)),
        _ => default_for_type(&node.kind),
    }
}

/// Initial test-form values for the LLM half of a capability.
///
/// Scalars start from their default; containers start from the sample
/// rendered as JSON text so the operator edits a realistic shape.
pub fn default_inputs(schema: &LlmParamsSchema) -> FormInput {
    let mut inputs = FormInput::new();
    for (name, property) in &schema.properties {
        let Some(node) =
            super::codec::node_from_schema(name, property, schema.is_required(name))
        else {
            continue;
        };
        let value = match node.kind {
            ParamType::Boolean => FormValue::Choice(default_value(&node).as_bool().unwrap_or(false)),
            ParamType::Array | ParamType::Object => {
                let shape = node.default_value().cloned().unwrap_or_else(|| sample(&node));
                FormValue::Text(serde_json::to_string_pretty(&shape).unwrap_or_default())
            }
            _ => match default_value(&node) {
                Value::String(s) => FormValue::Text(s),
                Value::Null => FormValue::Text(String::new()),
                other if node.default_value().is_some() => FormValue::Text(other.to_string()),
                _ => FormValue::Text(String::new()),
            },
        };
        inputs.insert(name.clone(), value);
    }
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_placeholders() {
        assert_eq!(sample(&ParameterNode::llm("s", ParamType::String)), json!("<string>"));
        assert_eq!(sample(&ParameterNode::llm("n", ParamType::Number)), json!("<number>"));
        assert_eq!(sample(&ParameterNode::llm("i", ParamType::Integer)), json!("<number>"));
        assert_eq!(sample(&ParameterNode::llm("b", ParamType::Boolean)), json!("<boolean>"));
        assert_eq!(
            sample(&ParameterNode::llm("x", ParamType::Unknown("date".into()))),
            json!("<value>")
        );
    }

    #[test]
    fn enum_samples_first_value() {
        let node = ParameterNode::llm("mode", ParamType::Enum).with_enum(["fast", "slow"]);
        assert_eq!(sample(&node), json!("fast"));
        assert_eq!(sample(&ParameterNode::llm("e", ParamType::Enum)), json!("<enum>"));
    }

    #[test]
    fn fixed_nodes_contribute_their_constant() {
        let node = ParameterNode::fixed("ids", ParamType::Array, json!("1,2"));
        assert_eq!(sample(&node), json!("1,2"));
    }

    #[test]
    fn array_of_objects_samples_one_element() {
        let node = ParameterNode::llm("items", ParamType::Array).with_items(
            ParamType::Object,
            vec![ParameterNode::llm("sku", ParamType::String)],
        );
        assert_eq!(sample(&node), json!([{"sku": "<string>"}]));
    }

    #[test]
    fn array_of_scalars_and_untyped_arrays() {
        let ints = ParameterNode::llm("ids", ParamType::Array).with_items(ParamType::Integer, vec![]);
        assert_eq!(sample(&ints), json!(["<number>"]));
        assert_eq!(sample(&ParameterNode::llm("tags", ParamType::Array)), json!(["<string>"]));
    }

    #[test]
    fn object_sample_lists_fixed_members_first() {
        let node = ParameterNode::llm("address", ParamType::Object).with_children(vec![
            ParameterNode::llm("city", ParamType::String),
            ParameterNode::fixed("country", ParamType::String, json!("US")),
        ]);
        let value = sample(&node);
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["country", "city"]);
        assert_eq!(value, json!({"country": "US", "city": "<string>"}));
    }

    #[test]
    fn schema_sample_matches_tree_sample() {
        let schema = json!({
            "type": "array",
            "items": { "type": "object", "properties": { "sku": { "type": "string" } } }
        });
        assert_eq!(sample_from_schema(&schema), json!([{"sku": "<string>"}]));
        assert_eq!(
            sample_from_schema(&json!({"type": "string", "enum": ["a", "b"]})),
            json!("a")
        );
        assert_eq!(sample_from_schema(&json!({})), json!("<value>"));
        assert_eq!(sample_from_schema(&json!({"type": "array"})), json!(["<string>"]));
    }

    #[test]
    fn type_defaults() {
        assert_eq!(default_for_type(&ParamType::String), json!(""));
        assert_eq!(default_for_type(&ParamType::Number), json!(0));
        assert_eq!(default_for_type(&ParamType::Boolean), json!(false));
        assert_eq!(default_for_type(&ParamType::Array), json!([]));
        assert_eq!(default_for_type(&ParamType::Object), json!({}));
    }

    #[test]
    fn default_value_prefers_declared_default() {
        let node = ParameterNode::llm("limit", ParamType::Integer).with_default(json!(20));
        assert_eq!(default_value(&node), json!(20));
        let node = ParameterNode::llm("mode", ParamType::Enum).with_enum(["x", "y"]);
        assert_eq!(default_value(&node), json!("x"));
    }

    #[test]
    fn default_inputs_cover_every_kind() {
        let schema = LlmParamsSchema {
            properties: json!({
                "q": { "type": "string" },
                "limit": { "type": "integer", "default": 20 },
                "page": { "type": "integer" },
                "exact": { "type": "boolean", "default": true },
                "tags": { "type": "array", "items": { "type": "string" } }
            })
            .as_object()
            .unwrap()
            .clone(),
            required: vec![],
        };
        let inputs = default_inputs(&schema);
        assert_eq!(inputs["q"], FormValue::Text(String::new()));
        assert_eq!(inputs["limit"], FormValue::Text("20".into()));
        assert_eq!(inputs["page"], FormValue::Text(String::new()));
        assert_eq!(inputs["exact"], FormValue::Choice(true));
        assert_eq!(
            inputs["tags"],
            FormValue::Text(serde_json::to_string_pretty(&json!(["<string>"])).unwrap())
        );
    }
}
