// @awa-component: CAP-TestInputCollector
//
//! Test-input collection: coerces raw form values into typed call arguments.
//!
//! Collection never fails: every problem becomes a field-scoped entry in
//! [`Collected::errors`] so the operator sees all of them in one pass.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::codec::{LlmParamsSchema, node_from_schema};
use super::model::{ArrayItems, ParamType, ParameterNode};
use super::{MAX_DEPTH, child_path};

/// One raw value from the test form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    /// An exclusive true/false selection.
    Choice(bool),
    /// Free text, exactly as typed.
    Text(String),
}

impl FormValue {
    fn text(&self) -> String {
        match self {
            Self::Choice(b) => b.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// Raw form values keyed by parameter name.
pub type FormInput = HashMap<String, FormValue>;

/// Outcome of collecting test input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collected {
    pub params: Map<String, Value>,
    pub errors: Vec<String>,
}

impl Collected {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The collected params, or every error when any field was invalid.
    pub fn into_result(self) -> Result<Map<String, Value>, Vec<String>> {
        if self.errors.is_empty() {
            Ok(self.params)
        } else {
            Err(self.errors)
        }
    }
}

/// Collect typed arguments for every LLM parameter, in declaration order.
pub fn collect(schema: &LlmParamsSchema, input: &FormInput) -> Collected {
    let mut collected = Collected::default();
    for (name, property) in &schema.properties {
        let Some(node) = node_from_schema(name, property, schema.is_required(name)) else {
            continue;
        };
        collect_field(&node, input.get(name), &mut collected);
    }
    collected
}

fn collect_field(node: &ParameterNode, raw: Option<&FormValue>, out: &mut Collected) {
    let name = node.name.as_str();
    let required = node.is_required();

    match &node.kind {
        ParamType::Boolean => {
            let choice = match raw {
                Some(FormValue::Choice(b)) => Some(*b),
                Some(FormValue::Text(t)) if t.trim().eq_ignore_ascii_case("true") => Some(true),
                Some(FormValue::Text(t)) if t.trim().eq_ignore_ascii_case("false") => Some(false),
                _ => None,
            };
            match choice {
                Some(b) => {
                    out.params.insert(name.to_string(), Value::Bool(b));
                }
                None if required => out.errors.push(name.to_string()),
                None => {
                    out.params.insert(name.to_string(), Value::Bool(false));
                }
            }
        }
        ParamType::Number | ParamType::Integer => {
            let text = raw.map(FormValue::text).unwrap_or_default();
            let text = text.trim();
            if text.is_empty() {
                if required {
                    out.errors.push(name.to_string());
                }
                return;
            }
            match parse_number(text, node.kind == ParamType::Integer) {
                Some(n) => {
                    out.params.insert(name.to_string(), Value::Number(n));
                }
                None => out.errors.push(name.to_string()),
            }
        }
        ParamType::Array | ParamType::Object => {
            let text = raw.map(FormValue::text).unwrap_or_default();
            let text = text.trim();
            if text.is_empty() || text == "[]" || text == "{}" {
                if required {
                    out.errors.push(name.to_string());
                }
                return;
            }
            let value: Value = match serde_json::from_str(text) {
                Ok(v) => v,
                Err(_) => {
                    out.errors.push(format!("{name} (invalid JSON)"));
                    return;
                }
            };
            if node.kind == ParamType::Array && !value.is_array() {
                out.errors.push(format!("{name} (expected array)"));
                return;
            }
            if node.kind == ParamType::Object && !value.is_object() {
                out.errors.push(format!("{name} (expected object)"));
                return;
            }
            let mut gaps = Vec::new();
            nested_gaps(node, &value, name, 0, &mut gaps);
            if !gaps.is_empty() {
                for (at, child) in gaps {
                    out.errors.push(format!("{at} (missing {child})"));
                }
                return;
            }
            out.params.insert(name.to_string(), value);
        }
        _ => {
            let text = raw.map(FormValue::text).unwrap_or_default();
            if text.trim().is_empty() {
                if required {
                    out.errors.push(name.to_string());
                }
                return;
            }
            if node.kind == ParamType::Enum
                && !node.enum_values.is_empty()
                && !node.enum_values.contains(&text)
            {
                out.errors.push(format!(
                    "{name} (not one of {})",
                    node.enum_values.join(", ")
                ));
                return;
            }
            out.params.insert(name.to_string(), Value::String(text));
        }
    }
}

/// Paths of required LLM parameters absent from `args`, at every depth:
/// `q`, `address.geo.lat`, `lines[0].sku`.
pub fn missing_required(schema: &LlmParamsSchema, args: &Map<String, Value>) -> Vec<String> {
    let nodes: Vec<ParameterNode> = schema
        .properties
        .iter()
        .filter_map(|(name, property)| node_from_schema(name, property, schema.is_required(name)))
        .collect();
    let mut gaps = Vec::new();
    member_gaps(&nodes, args, "", 0, &mut gaps);

    let mut missing: Vec<String> = gaps
        .into_iter()
        .map(|(at, child)| child_path(&at, &child))
        .collect();
    for name in &schema.required {
        if !schema.properties.contains_key(name) && !args.contains_key(name) {
            missing.push(name.clone());
        }
    }
    missing
}

/// Required members missing from one object, then from everything below it.
/// Each gap is `(container path, missing name)`.
fn member_gaps(
    nodes: &[ParameterNode],
    members: &Map<String, Value>,
    path: &str,
    depth: usize,
    gaps: &mut Vec<(String, String)>,
) {
    if depth >= MAX_DEPTH {
        return;
    }
    for node in nodes.iter().filter(|n| !n.is_fixed()) {
        match members.get(&node.name) {
            Some(value) => nested_gaps(node, value, &child_path(path, &node.name), depth, gaps),
            None if node.is_required() => gaps.push((path.to_string(), node.name.clone())),
            None => {}
        }
    }
}

fn nested_gaps(
    node: &ParameterNode,
    value: &Value,
    path: &str,
    depth: usize,
    gaps: &mut Vec<(String, String)>,
) {
    match (&node.kind, value, &node.items) {
        (ParamType::Object, Value::Object(members), _) => {
            member_gaps(&node.children, members, path, depth + 1, gaps);
        }
        (ParamType::Array, Value::Array(elements), Some(items)) => {
            element_gaps(items, elements, path, depth + 1, gaps);
        }
        _ => {}
    }
}

fn element_gaps(
    items: &ArrayItems,
    elements: &[Value],
    path: &str,
    depth: usize,
    gaps: &mut Vec<(String, String)>,
) {
    if depth >= MAX_DEPTH {
        return;
    }
    for (i, element) in elements.iter().enumerate() {
        let at = format!("{path}[{i}]");
        match (element, items.items.as_deref()) {
            (Value::Object(members), _) => {
                member_gaps(items.object_properties(), members, &at, depth, gaps);
            }
            (Value::Array(inner), Some(inner_items)) => {
                element_gaps(inner_items, inner, &at, depth + 1, gaps);
            }
            _ => {}
        }
    }
}

/// `integer` truncates toward zero; `number` keeps the fraction.
fn parse_number(text: &str, integer: bool) -> Option<Number> {
    if integer {
        if let Ok(i) = text.parse::<i64>() {
            return Some(Number::from(i));
        }
        let f = text.parse::<f64>().ok().filter(|f| f.is_finite())?;
        let truncated = f.trunc();
        if truncated < i64::MIN as f64 || truncated > i64::MAX as f64 {
            return None;
        }
        Some(Number::from(truncated as i64))
    } else {
        text.parse::<f64>().ok().and_then(Number::from_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(properties: Value, required: &[&str]) -> LlmParamsSchema {
        LlmParamsSchema {
            properties: properties.as_object().unwrap().clone(),
            required: required.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn input(pairs: &[(&str, FormValue)]) -> FormInput {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn text(s: &str) -> FormValue {
        FormValue::Text(s.to_string())
    }

    #[test]
    fn optional_blank_integer_is_omitted() {
        let s = schema(json!({"amount": {"type": "integer"}}), &[]);
        let out = collect(&s, &input(&[("amount", text(""))]));
        assert!(!out.params.contains_key("amount"));
        assert!(out.errors.is_empty());
    }

    #[test]
    fn required_blank_number_is_an_error() {
        let s = schema(json!({"amount": {"type": "number"}}), &["amount"]);
        let out = collect(&s, &input(&[]));
        assert_eq!(out.errors, vec!["amount"]);
    }

    #[test]
    fn integer_truncates_and_number_keeps_fraction() {
        let s = schema(
            json!({"count": {"type": "integer"}, "price": {"type": "number"}}),
            &[],
        );
        let out = collect(&s, &input(&[("count", text("3.9")), ("price", text(" 2.5 "))]));
        assert_eq!(out.params["count"], json!(3));
        assert_eq!(out.params["price"], json!(2.5));
        let out = collect(&s, &input(&[("count", text("-7"))]));
        assert_eq!(out.params["count"], json!(-7));
    }

    #[test]
    fn non_numeric_text_is_reported() {
        let s = schema(json!({"count": {"type": "integer"}}), &[]);
        let out = collect(&s, &input(&[("count", text("abc"))]));
        assert_eq!(out.errors, vec!["count"]);
        assert!(out.params.is_empty());
    }

    #[test]
    fn boolean_defaults_to_false_unless_required() {
        let s = schema(json!({"exact": {"type": "boolean"}}), &[]);
        assert_eq!(collect(&s, &input(&[])).params["exact"], json!(false));

        let s = schema(json!({"exact": {"type": "boolean"}}), &["exact"]);
        assert_eq!(collect(&s, &input(&[])).errors, vec!["exact"]);

        let out = collect(&s, &input(&[("exact", FormValue::Choice(true))]));
        assert_eq!(out.params["exact"], json!(true));
        let out = collect(&s, &input(&[("exact", text("FALSE"))]));
        assert_eq!(out.params["exact"], json!(false));
    }

    #[test]
    fn containers_skip_canonical_empty_literals() {
        let s = schema(
            json!({"tags": {"type": "array"}, "meta": {"type": "object"}}),
            &[],
        );
        let out = collect(&s, &input(&[("tags", text("[]")), ("meta", text("{}"))]));
        assert!(out.params.is_empty());
        assert!(out.errors.is_empty());

        let s = schema(json!({"tags": {"type": "array"}}), &["tags"]);
        assert_eq!(collect(&s, &input(&[("tags", text("[]"))])).errors, vec!["tags"]);
    }

    #[test]
    fn containers_parse_json_and_check_shape() {
        let s = schema(
            json!({"tags": {"type": "array"}, "meta": {"type": "object"}}),
            &[],
        );
        let out = collect(
            &s,
            &input(&[("tags", text(r#"["a","b"]"#)), ("meta", text(r#"{"k":1}"#))]),
        );
        assert_eq!(out.params["tags"], json!(["a", "b"]));
        assert_eq!(out.params["meta"], json!({"k": 1}));

        let out = collect(&s, &input(&[("tags", text(r#"{"a":1}"#)), ("meta", text("[1]"))]));
        assert_eq!(out.errors, vec!["tags (expected array)", "meta (expected object)"]);
    }

    #[test]
    fn incomplete_object_is_rejected_at_its_own_level() {
        let s = schema(
            json!({
                "address": {
                    "type": "object",
                    "properties": { "city": { "type": "string" }, "zip": { "type": "string" } },
                    "required": ["city"]
                }
            }),
            &[],
        );
        let out = collect(&s, &input(&[("address", text(r#"{"zip":"1"}"#))]));
        assert_eq!(out.errors, vec!["address (missing city)"]);
        assert!(out.params.is_empty());
    }

    #[test]
    fn nested_objects_and_array_elements_are_checked() {
        let s = schema(
            json!({
                "address": {
                    "type": "object",
                    "properties": {
                        "geo": {
                            "type": "object",
                            "properties": { "lat": { "type": "number" }, "lng": { "type": "number" } },
                            "required": ["lat"]
                        }
                    }
                },
                "lines": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "sku": { "type": "string" }, "qty": { "type": "integer" } },
                        "required": ["sku"]
                    }
                }
            }),
            &[],
        );
        let out = collect(
            &s,
            &input(&[
                ("address", text(r#"{"geo":{}}"#)),
                ("lines", text(r#"[{"sku":"A"},{"qty":1}]"#)),
            ]),
        );
        assert_eq!(out.errors, vec!["address.geo (missing lat)", "lines[1] (missing sku)"]);
        assert!(out.params.is_empty());

        let out = collect(
            &s,
            &input(&[
                ("address", text(r#"{"geo":{"lat":1.5}}"#)),
                ("lines", text(r#"[{"sku":"A"}]"#)),
            ]),
        );
        assert!(out.is_valid());
        assert_eq!(out.params["address"], json!({"geo": {"lat": 1.5}}));
    }

    #[test]
    fn missing_required_reports_full_paths() {
        let s = schema(
            json!({
                "q": { "type": "string" },
                "address": {
                    "type": "object",
                    "properties": {
                        "geo": {
                            "type": "object",
                            "properties": { "lat": { "type": "number" } },
                            "required": ["lat"]
                        }
                    }
                },
                "grid": {
                    "type": "array",
                    "items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": { "v": { "type": "integer" } },
                            "required": ["v"]
                        }
                    }
                }
            }),
            &["q", "ghost"],
        );
        let args = json!({"address": {"geo": {}}, "grid": [[{"v": 1}, {}]]});
        assert_eq!(
            missing_required(&s, args.as_object().unwrap()),
            vec!["q", "address.geo.lat", "grid[0][1].v", "ghost"]
        );
    }

    #[test]
    fn strings_are_kept_verbatim() {
        let s = schema(json!({"q": {"type": "string"}}), &[]);
        let out = collect(&s, &input(&[("q", text("  hello "))]));
        assert_eq!(out.params["q"], json!("  hello "));
        let out = collect(&s, &input(&[("q", text(""))]));
        assert!(out.params.is_empty());
    }

    #[test]
    fn enum_values_are_checked() {
        let s = schema(json!({"mode": {"type": "string", "enum": ["fast", "slow"]}}), &[]);
        let out = collect(&s, &input(&[("mode", text("medium"))]));
        assert_eq!(out.errors, vec!["mode (not one of fast, slow)"]);
        let out = collect(&s, &input(&[("mode", text("slow"))]));
        assert_eq!(out.params["mode"], json!("slow"));
    }

    #[test]
    fn errors_accumulate_across_fields() {
        let s = schema(
            json!({
                "title": { "type": "string" },
                "meta": { "type": "object" },
                "mode": { "type": "string", "enum": ["a", "b"] },
                "limit": { "type": "integer" }
            }),
            &["title", "mode"],
        );
        let out = collect(
            &s,
            &input(&[
                ("title", text("")),
                ("meta", text("{broken")),
                ("mode", text("")),
                ("limit", text("5")),
            ]),
        );
        assert_eq!(out.errors, vec!["title", "meta (invalid JSON)", "mode"]);
        assert_eq!(out.params["limit"], json!(5));
        assert!(out.clone().into_result().is_err());
        assert!(!out.is_valid());
    }

    #[test]
    fn form_values_deserialize_untagged() {
        let raw: FormInput = serde_json::from_value(json!({"a": true, "b": "x"})).unwrap();
        assert_eq!(raw["a"], FormValue::Choice(true));
        assert_eq!(raw["b"], FormValue::Text("x".into()));
    }
}
