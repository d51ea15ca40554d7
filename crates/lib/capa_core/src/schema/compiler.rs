// @awa-component: CAP-RequestCompiler
//
//! Request compiler: merges fixed values with LLM values (supplied or
//! placeholder) into a query string or a JSON body.
//!
//! Key order is fixed members first, then LLM members, each in declaration
//! order, at every level, so previews are reproducible.

use serde_json::{Map, Value};
use thiserror::Error;

use super::codec::{EditableParams, join};
use super::model::{ArrayItems, Binding, ParamType, ParameterNode, emit_order, find_conflicts};
use super::sample::{placeholder, sample, sample_items};
use super::{MAX_DEPTH, SchemaError, child_path, items_path};
use crate::models::capability::HttpMethod;

/// Compilation errors. Every variant names the offending parameter.
#[derive(Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("Conflicting parameter names: {}", .0.join(", "))]
    Conflict(Vec<String>),

    #[error("Parameter '{name}' is a container and cannot be sent in a query string")]
    NestedQueryValue { name: String },

    #[error("Parameter '{name}' has an invalid fixed value: {reason}")]
    InvalidFixedValue { name: String, reason: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// What to do with LLM parameters that have no supplied value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileMode {
    /// Show a placeholder so the operator sees the full request shape.
    Preview,
    /// Leave the parameter out of the outbound request.
    Execute,
}

/// Ordered `key=value` pairs of a query-based request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    pub pairs: Vec<(String, String)>,
}

impl QueryString {
    /// URL-encoded form for the outbound request.
    pub fn encoded(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

/// Unencoded `key=value&...` rendering used for previews.
impl std::fmt::Display for QueryString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// A compiled request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Compiled {
    Query(QueryString),
    Body(Value),
}

impl Compiled {
    /// JSON rendering: the body itself, or the query string as a JSON string.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Query(q) => Value::String(q.to_string()),
            Self::Body(body) => body.clone(),
        }
    }
}

/// Compile a parameter tree for `method`.
pub fn compile(
    nodes: &[ParameterNode],
    method: HttpMethod,
    supplied: Option<&Map<String, Value>>,
    mode: CompileMode,
) -> Result<Compiled, CompileError> {
    let conflicts = find_conflicts(nodes);
    if !conflicts.is_empty() {
        return Err(CompileError::Conflict(conflicts));
    }
    if let Some(supplied) = supplied {
        report_ignored(nodes, supplied, "");
    }

    if method.uses_query() {
        compile_query(nodes, supplied, mode).map(Compiled::Query)
    } else {
        compile_members(nodes, supplied, "", mode, 0).map(|m| Compiled::Body(Value::Object(m)))
    }
}

/// Preview a tree with placeholders for every LLM parameter.
pub fn preview(nodes: &[ParameterNode], method: HttpMethod) -> Result<Compiled, CompileError> {
    compile(nodes, method, None, CompileMode::Preview)
}

/// Compile from the editable pair.
pub fn compile_editable(
    params: &EditableParams,
    method: HttpMethod,
    supplied: Option<&Map<String, Value>>,
    mode: CompileMode,
) -> Result<Compiled, CompileError> {
    let nodes = join(params)?;
    compile(&nodes, method, supplied, mode)
}

fn report_ignored(nodes: &[ParameterNode], supplied: &Map<String, Value>, parent: &str) {
    for key in supplied.keys() {
        let path = child_path(parent, key);
        match nodes.iter().find(|n| n.name == *key) {
            Some(node) if node.is_fixed() => {
                log::warn!("Ignoring supplied value for fixed parameter '{path}'");
            }
            Some(_) => {}
            None => log::debug!("Dropping supplied value for undeclared parameter '{path}'"),
        }
    }
}

fn compile_query(
    nodes: &[ParameterNode],
    supplied: Option<&Map<String, Value>>,
    mode: CompileMode,
) -> Result<QueryString, CompileError> {
    let mut query = QueryString::default();
    for node in emit_order(nodes) {
        let value = match &node.binding {
            Binding::Fixed(value) => Some(value.clone()),
            Binding::Llm { .. } => match supplied.and_then(|s| s.get(&node.name)) {
                Some(v) => Some(v.clone()),
                None if mode == CompileMode::Preview => Some(sample(node)),
                None => None,
            },
        };
        let Some(value) = value else { continue };
        let Some(text) = query_text(&value) else {
            return Err(CompileError::NestedQueryValue {
                name: node.name.clone(),
            });
        };
        query.pairs.push((node.name.clone(), text));
    }
    Ok(query)
}

/// Query text of one value. Scalar arrays are comma-joined, the way fixed
/// array text is written; objects and nested arrays have no query form.
fn query_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => Some(String::new()),
        Value::Object(_) => None,
        Value::Array(elements) => {
            let parts = elements
                .iter()
                .map(|e| match e {
                    Value::Array(_) | Value::Object(_) => None,
                    scalar => query_text(scalar),
                })
                .collect::<Option<Vec<_>>>()?;
            Some(parts.join(","))
        }
        other => Some(other.to_string()),
    }
}

fn compile_members(
    nodes: &[ParameterNode],
    supplied: Option<&Map<String, Value>>,
    parent: &str,
    mode: CompileMode,
    depth: usize,
) -> Result<Map<String, Value>, CompileError> {
    let mut out = Map::new();
    for node in emit_order(nodes) {
        let path = child_path(parent, &node.name);
        let value = match &node.binding {
            Binding::Fixed(_) => Some(fixed_value(node, &path, depth)?),
            Binding::Llm { .. } => {
                let given = supplied.and_then(|s| s.get(&node.name));
                compile_llm(node, given, &path, mode, depth)?
            }
        };
        if let Some(value) = value {
            out.insert(node.name.clone(), value);
        }
    }
    Ok(out)
}

fn compile_llm(
    node: &ParameterNode,
    given: Option<&Value>,
    path: &str,
    mode: CompileMode,
    depth: usize,
) -> Result<Option<Value>, CompileError> {
    if depth >= MAX_DEPTH {
        return Ok(given.cloned().or_else(|| {
            (mode == CompileMode::Preview).then(|| placeholder(&ParamType::Unknown(String::new())))
        }));
    }

    match (&node.kind, given) {
        (ParamType::Object, Some(Value::Object(members))) => {
            report_ignored(&node.children, members, path);
            let compiled = compile_members(&node.children, Some(members), path, mode, depth + 1)?;
            Ok(Some(Value::Object(compiled)))
        }
        (ParamType::Object, None) if mode == CompileMode::Preview => {
            let compiled = compile_members(&node.children, None, path, mode, depth + 1)?;
            Ok(Some(Value::Object(compiled)))
        }
        (ParamType::Array, Some(Value::Array(elements))) => match &node.items {
            Some(items) => {
                let compiled = compile_elements(items, elements, &items_path(path), mode, depth + 1)?;
                Ok(Some(compiled))
            }
            None => Ok(Some(Value::Array(elements.clone()))),
        },
        (ParamType::Array, None) if mode == CompileMode::Preview => {
            let element = match &node.items {
                Some(items) => preview_element(items, &items_path(path), depth + 1)?,
                None => placeholder(&ParamType::String),
            };
            Ok(Some(Value::Array(vec![element])))
        }
        (_, Some(value)) => Ok(Some(value.clone())),
        (_, None) if mode == CompileMode::Preview => Ok(Some(sample(node))),
        (_, None) => Ok(None),
    }
}

/// Merge supplied array elements with the fixed members of their items,
/// through any number of array layers.
fn compile_elements(
    items: &ArrayItems,
    elements: &[Value],
    prefix: &str,
    mode: CompileMode,
    depth: usize,
) -> Result<Value, CompileError> {
    if depth >= MAX_DEPTH {
        return Ok(Value::Array(elements.to_vec()));
    }
    let props = items.object_properties();
    let mut compiled = Vec::with_capacity(elements.len());
    for element in elements {
        let value = match (element, items.items.as_deref()) {
            (Value::Object(members), _) if !props.is_empty() => {
                Value::Object(compile_members(props, Some(members), prefix, mode, depth)?)
            }
            (Value::Array(inner), Some(inner_items)) => {
                compile_elements(inner_items, inner, &items_path(prefix), mode, depth + 1)?
            }
            (other, _) => other.clone(),
        };
        compiled.push(value);
    }
    Ok(Value::Array(compiled))
}

fn preview_element(items: &ArrayItems, prefix: &str, depth: usize) -> Result<Value, CompileError> {
    if depth >= MAX_DEPTH {
        return Ok(placeholder(&ParamType::Unknown(String::new())));
    }
    let element = match items.items_type {
        ParamType::Object => Value::Object(compile_members(
            &items.item_properties,
            None,
            prefix,
            CompileMode::Preview,
            depth,
        )?),
        ParamType::Array => {
            let inner = match items.items.as_deref() {
                Some(inner) => preview_element(inner, &items_path(prefix), depth + 1)?,
                None => placeholder(&ParamType::String),
            };
            Value::Array(vec![inner])
        }
        _ => sample_items(items),
    };
    Ok(element)
}

/// What the compiler sends for a fixed node: array text typed by its items,
/// fixed objects built from their declared children, anything else verbatim.
pub(crate) fn compiled_fixed_value(node: &ParameterNode, path: &str) -> Result<Value, CompileError> {
    fixed_value(node, path, 0)
}

/// Compiled value of a fixed node.
///
/// Operator text for arrays is parsed into a typed sequence; fixed objects with
/// declared children are compiled member by member.
fn fixed_value(node: &ParameterNode, path: &str, depth: usize) -> Result<Value, CompileError> {
    let Some(value) = node.const_value() else {
        return Ok(sample(node));
    };
    match (&node.kind, value) {
        (ParamType::Array, Value::String(text)) => match node.items_type() {
            ParamType::Object => parse_object_list(text, path),
            items_type => parse_scalar_list(text, &items_type, path),
        },
        (ParamType::Object, _) if !node.children.is_empty() && depth < MAX_DEPTH => {
            let compiled =
                compile_members(&node.children, None, path, CompileMode::Execute, depth + 1)?;
            Ok(Value::Object(compiled))
        }
        _ => Ok(value.clone()),
    }
}

/// Split comma-separated operator text into a typed sequence.
fn parse_scalar_list(text: &str, items_type: &ParamType, path: &str) -> Result<Value, CompileError> {
    let mut values = Vec::new();
    for piece in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let value = match items_type {
            ParamType::Number => piece
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            ParamType::Integer => piece
                .parse::<i64>()
                .ok()
                .or_else(|| piece.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .map(Value::from),
            ParamType::Boolean => Some(Value::Bool(piece.eq_ignore_ascii_case("true"))),
            _ => Some(Value::String(piece.to_string())),
        };
        match value {
            Some(v) => values.push(v),
            None => {
                return Err(CompileError::InvalidFixedValue {
                    name: path.to_string(),
                    reason: format!("'{piece}' is not a valid {items_type}"),
                });
            }
        }
    }
    Ok(Value::Array(values))
}

/// Parse operator text holding object literals: a JSON array, or
/// comma-separated objects such as `{"a":1},{"a":2}`.
fn parse_object_list(text: &str, path: &str) -> Result<Value, CompileError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }
    let source = if trimmed.starts_with('[') {
        trimmed.to_string()
    } else {
        format!("[{trimmed}]")
    };
    let invalid = |reason: String| CompileError::InvalidFixedValue {
        name: path.to_string(),
        reason,
    };
    let elements: Vec<Value> = serde_json::from_str(&source).map_err(|e| invalid(e.to_string()))?;
    if let Some(pos) = elements.iter().position(|e| !e.is_object()) {
        return Err(invalid(format!("element {pos} is not an object")));
    }
    Ok(Value::Array(elements))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_tree() -> Vec<ParameterNode> {
        vec![
            ParameterNode::llm("q", ParamType::String).required(),
            ParameterNode::fixed("lang", ParamType::String, json!("en")),
        ]
    }

    #[test]
    fn get_preview_renders_query_string() {
        let compiled = preview(&search_tree(), HttpMethod::Get).unwrap();
        let Compiled::Query(query) = compiled else {
            panic!("expected query");
        };
        assert_eq!(query.to_string(), "lang=en&q=<string>");
    }

    #[test]
    fn query_encoding_escapes_values() {
        let supplied = json!({"q": "a b&c"});
        let compiled = compile(
            &search_tree(),
            HttpMethod::Get,
            supplied.as_object(),
            CompileMode::Execute,
        )
        .unwrap();
        let Compiled::Query(query) = compiled else {
            panic!("expected query");
        };
        assert_eq!(query.encoded(), "lang=en&q=a+b%26c");
    }

    #[test]
    fn execute_mode_omits_unsupplied_llm_values() {
        let compiled = compile(&search_tree(), HttpMethod::Get, None, CompileMode::Execute).unwrap();
        assert_eq!(compiled.to_json(), json!("lang=en"));
    }

    #[test]
    fn query_joins_scalar_arrays() {
        let nodes = vec![
            ParameterNode::fixed("ids", ParamType::Array, json!([1, 2, 3])),
            ParameterNode::fixed("raw", ParamType::Array, json!("4,5")),
        ];
        let compiled = compile(&nodes, HttpMethod::Get, None, CompileMode::Execute).unwrap();
        assert_eq!(compiled.to_json(), json!("ids=1,2,3&raw=4,5"));

        let nested = vec![ParameterNode::fixed("m", ParamType::Array, json!([[1]]))];
        let err = compile(&nested, HttpMethod::Get, None, CompileMode::Execute).unwrap_err();
        assert_eq!(err, CompileError::NestedQueryValue { name: "m".into() });
    }

    #[test]
    fn query_refuses_container_values() {
        let nodes = vec![ParameterNode::llm("filter", ParamType::Object)];
        let err = preview(&nodes, HttpMethod::Get).unwrap_err();
        assert_eq!(
            err,
            CompileError::NestedQueryValue {
                name: "filter".into()
            }
        );
    }

    #[test]
    fn body_preview_orders_fixed_then_llm() {
        let compiled = preview(&search_tree(), HttpMethod::Post).unwrap();
        let Compiled::Body(body) = compiled else {
            panic!("expected body");
        };
        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["lang", "q"]);
        assert_eq!(body, json!({"lang": "en", "q": "<string>"}));
    }

    #[test]
    fn fixed_scalar_arrays_are_parsed_by_item_type() {
        let nodes = vec![
            ParameterNode::fixed("ids", ParamType::Array, json!("1, 2,,3"))
                .with_items(ParamType::Integer, vec![]),
            ParameterNode::fixed("weights", ParamType::Array, json!("0.5,1"))
                .with_items(ParamType::Number, vec![]),
            ParameterNode::fixed("flags", ParamType::Array, json!("TRUE,no"))
                .with_items(ParamType::Boolean, vec![]),
            ParameterNode::fixed("tags", ParamType::Array, json!("a, b")),
            ParameterNode::fixed("raw", ParamType::Array, json!([1, "x"])),
        ];
        let body = preview(&nodes, HttpMethod::Put).unwrap().to_json();
        assert_eq!(
            body,
            json!({
                "ids": [1, 2, 3],
                "weights": [0.5, 1.0],
                "flags": [true, false],
                "tags": ["a", "b"],
                "raw": [1, "x"]
            })
        );
    }

    #[test]
    fn invalid_fixed_number_names_the_field() {
        let nodes = vec![
            ParameterNode::fixed("ids", ParamType::Array, json!("1,x"))
                .with_items(ParamType::Number, vec![]),
        ];
        let err = preview(&nodes, HttpMethod::Post).unwrap_err();
        assert_eq!(
            err,
            CompileError::InvalidFixedValue {
                name: "ids".into(),
                reason: "'x' is not a valid number".into(),
            }
        );
    }

    #[test]
    fn fixed_object_lists_are_parsed() {
        let nodes = vec![
            ParameterNode::fixed("rules", ParamType::Array, json!(r#"{"a":1}, {"a":2}"#))
                .with_items(ParamType::Object, vec![]),
            ParameterNode::fixed("more", ParamType::Array, json!(r#"[{"b":true}]"#))
                .with_items(ParamType::Object, vec![]),
        ];
        let body = preview(&nodes, HttpMethod::Post).unwrap().to_json();
        assert_eq!(body, json!({"rules": [{"a": 1}, {"a": 2}], "more": [{"b": true}]}));

        let bad = vec![
            ParameterNode::fixed("rules", ParamType::Array, json!("{oops"))
                .with_items(ParamType::Object, vec![]),
        ];
        let err = preview(&bad, HttpMethod::Post).unwrap_err();
        assert!(matches!(err, CompileError::InvalidFixedValue { name, .. } if name == "rules"));
    }

    #[test]
    fn fixed_object_compiles_declared_children() {
        let nodes = vec![
            ParameterNode::fixed("auth", ParamType::Object, json!({"scopes": "read,write"}))
                .with_children(vec![
                    ParameterNode::fixed("scopes", ParamType::Array, json!("read,write")),
                    ParameterNode::fixed("realm", ParamType::String, json!("main")),
                ]),
        ];
        let body = preview(&nodes, HttpMethod::Post).unwrap().to_json();
        assert_eq!(body, json!({"auth": {"scopes": ["read", "write"], "realm": "main"}}));
    }

    #[test]
    fn supplied_values_override_placeholders() {
        let nodes = vec![
            ParameterNode::fixed("key", ParamType::String, json!("secret")),
            ParameterNode::llm("q", ParamType::String),
            ParameterNode::llm("limit", ParamType::Integer),
        ];
        let supplied = json!({"q": "rust", "key": "stolen", "extra": 1});
        let body = compile(&nodes, HttpMethod::Post, supplied.as_object(), CompileMode::Preview)
            .unwrap()
            .to_json();
        assert_eq!(body, json!({"key": "secret", "q": "rust", "limit": "<number>"}));
    }

    #[test]
    fn array_of_objects_injects_fixed_item_properties() {
        let nodes = vec![ParameterNode::llm("lines", ParamType::Array).with_items(
            ParamType::Object,
            vec![
                ParameterNode::llm("sku", ParamType::String),
                ParameterNode::fixed("currency", ParamType::String, json!("USD")),
                ParameterNode::llm("qty", ParamType::Integer),
            ],
        )];
        let supplied = json!({"lines": [{"sku": "A", "qty": 2}, {"sku": "B"}]});
        let body = compile(&nodes, HttpMethod::Post, supplied.as_object(), CompileMode::Execute)
            .unwrap()
            .to_json();
        assert_eq!(
            body,
            json!({"lines": [
                {"currency": "USD", "sku": "A", "qty": 2},
                {"currency": "USD", "sku": "B"}
            ]})
        );

        let preview_body = preview(&nodes, HttpMethod::Post).unwrap().to_json();
        assert_eq!(
            preview_body,
            json!({"lines": [{"currency": "USD", "sku": "<string>", "qty": "<number>"}]})
        );
    }

    #[test]
    fn nested_objects_merge_supplied_members() {
        let nodes = vec![ParameterNode::llm("address", ParamType::Object).with_children(vec![
            ParameterNode::fixed("country", ParamType::String, json!("US")),
            ParameterNode::llm("city", ParamType::String),
        ])];
        let supplied = json!({"address": {"city": "Austin"}});
        let body = compile(&nodes, HttpMethod::Patch, supplied.as_object(), CompileMode::Execute)
            .unwrap()
            .to_json();
        assert_eq!(body, json!({"address": {"country": "US", "city": "Austin"}}));

        let body = compile(&nodes, HttpMethod::Patch, None, CompileMode::Execute)
            .unwrap()
            .to_json();
        assert_eq!(body, json!({}));
    }

    #[test]
    fn conflicts_are_refused_with_every_name() {
        let nodes = vec![
            ParameterNode::fixed("q", ParamType::String, json!("x")),
            ParameterNode::llm("q", ParamType::String),
            ParameterNode::llm("addr", ParamType::Object).with_children(vec![
                ParameterNode::fixed("zip", ParamType::String, json!("1")),
                ParameterNode::llm("zip", ParamType::String),
            ]),
        ];
        let err = preview(&nodes, HttpMethod::Post).unwrap_err();
        assert_eq!(err, CompileError::Conflict(vec!["q".into(), "addr.zip".into()]));
    }

    #[test]
    fn compile_from_editable_pair() {
        let params = crate::schema::codec::decode(&json!({
            "properties": {
                "lang": { "type": "string", "const": "en" },
                "q": { "type": "string", "required": true }
            }
        }));
        let compiled = compile_editable(&params, HttpMethod::Get, None, CompileMode::Preview).unwrap();
        assert_eq!(compiled.to_json(), json!("lang=en&q=<string>"));
    }
}
