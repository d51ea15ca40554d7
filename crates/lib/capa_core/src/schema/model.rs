// @awa-component: CAP-ParameterModel
//
//! Parameter tree: the in-memory form used by the editor and the compiler.
//!
//! Whether a node is operator-controlled or LLM-visible is carried by an
//! explicit [`Binding`], decided once when the stored schema is parsed.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::{MAX_DEPTH, SchemaError, child_path, items_path};

/// Declared parameter type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Enum,
    Array,
    Object,
    /// A type string this model does not know. Empty when the schema had no `type`.
    Unknown(String),
}

impl ParamType {
    /// Parse a type name as written in a schema or by the editor.
    pub fn parse(s: &str) -> Self {
        match s {
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            "enum" => Self::Enum,
            "array" => Self::Array,
            "object" => Self::Object,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Editor-facing name (`enum` is its own type here).
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Enum => "enum",
            Self::Array => "array",
            Self::Object => "object",
            Self::Unknown(s) => s,
        }
    }

    /// JSON Schema `type` keyword. An enum is a string with an `enum` list.
    /// `None` for an untyped node.
    pub fn json_type(&self) -> Option<&str> {
        match self {
            Self::Enum => Some("string"),
            Self::Unknown(s) if s.is_empty() => None,
            other => Some(other.as_str()),
        }
    }

    /// Infer the type of an operator-supplied constant.
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
            Value::Null => Self::Unknown(String::new()),
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::Array | Self::Object)
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who supplies a parameter's value.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Operator constant, never shown to the LLM.
    Fixed(Value),
    /// Supplied by the LLM caller at invocation time.
    Llm {
        required: bool,
        default: Option<Value>,
    },
}

/// Element description of an array parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayItems {
    pub items_type: ParamType,
    /// Only populated when `items_type` is [`ParamType::Object`].
    pub item_properties: Vec<ParameterNode>,
    /// Only populated when `items_type` is [`ParamType::Enum`].
    pub enum_values: Vec<String>,
    /// Element description of the inner array when `items_type` is [`ParamType::Array`].
    pub items: Option<Box<ArrayItems>>,
    /// JSON Schema keywords this model does not interpret (`description`, `format`, ...).
    pub extra: Map<String, Value>,
}

impl ArrayItems {
    pub fn new(items_type: ParamType) -> Self {
        Self {
            items_type,
            item_properties: Vec::new(),
            enum_values: Vec::new(),
            items: None,
            extra: Map::new(),
        }
    }

    pub fn with_properties(mut self, properties: Vec<ParameterNode>) -> Self {
        self.item_properties = properties;
        self
    }

    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Elements that are themselves arrays.
    pub fn with_inner(mut self, inner: ArrayItems) -> Self {
        self.items = Some(Box::new(inner));
        self
    }

    /// Properties of object elements (empty otherwise).
    pub fn object_properties(&self) -> &[ParameterNode] {
        if self.items_type == ParamType::Object {
            &self.item_properties
        } else {
            &[]
        }
    }
}

/// One named parameter, leaf or container.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterNode {
    pub name: String,
    pub kind: ParamType,
    pub description: Option<String>,
    pub binding: Binding,
    /// Only meaningful when `kind` is [`ParamType::Enum`].
    pub enum_values: Vec<String>,
    /// Only meaningful when `kind` is [`ParamType::Array`].
    pub items: Option<ArrayItems>,
    /// Only meaningful when `kind` is [`ParamType::Object`].
    pub children: Vec<ParameterNode>,
    /// JSON Schema keywords this model does not interpret, written back verbatim.
    pub extra: Map<String, Value>,
}

impl ParameterNode {
    /// An optional LLM-visible parameter.
    pub fn llm(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            binding: Binding::Llm {
                required: false,
                default: None,
            },
            enum_values: Vec::new(),
            items: None,
            children: Vec::new(),
            extra: Map::new(),
        }
    }

    /// An operator-fixed parameter.
    pub fn fixed(name: impl Into<String>, kind: ParamType, value: Value) -> Self {
        Self {
            binding: Binding::Fixed(value),
            ..Self::llm(name, kind)
        }
    }

    /// Mark an LLM parameter as required. No effect on fixed nodes.
    pub fn required(mut self) -> Self {
        if let Binding::Llm { required, .. } = &mut self.binding {
            *required = true;
        }
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the default of an LLM parameter. No effect on fixed nodes.
    pub fn with_default(mut self, value: Value) -> Self {
        if let Binding::Llm { default, .. } = &mut self.binding {
            *default = Some(value);
        }
        self
    }

    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_items(mut self, items_type: ParamType, item_properties: Vec<ParameterNode>) -> Self {
        self.items = Some(ArrayItems::new(items_type).with_properties(item_properties));
        self
    }

    pub fn with_array_items(mut self, items: ArrayItems) -> Self {
        self.items = Some(items);
        self
    }

    /// Attach a JSON Schema keyword the model does not interpret.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn with_children(mut self, children: Vec<ParameterNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.binding, Binding::Fixed(_))
    }

    /// Required by the LLM caller. Always false for fixed nodes.
    pub fn is_required(&self) -> bool {
        matches!(self.binding, Binding::Llm { required: true, .. })
    }

    pub fn const_value(&self) -> Option<&Value> {
        match &self.binding {
            Binding::Fixed(v) => Some(v),
            Binding::Llm { .. } => None,
        }
    }

    pub fn default_value(&self) -> Option<&Value> {
        match &self.binding {
            Binding::Llm { default, .. } => default.as_ref(),
            Binding::Fixed(_) => None,
        }
    }

    /// Element type of an array; arrays without an `items` descriptor hold strings.
    pub fn items_type(&self) -> ParamType {
        self.items
            .as_ref()
            .map(|i| i.items_type.clone())
            .unwrap_or(ParamType::String)
    }

    /// Item properties of an array of objects (empty otherwise).
    pub fn item_properties(&self) -> &[ParameterNode] {
        match &self.items {
            Some(items) => items.object_properties(),
            None => &[],
        }
    }
}

/// Iterate a container in emission order: fixed nodes first, then LLM nodes,
/// each group in declaration order.
pub fn emit_order(nodes: &[ParameterNode]) -> impl Iterator<Item = &ParameterNode> {
    nodes
        .iter()
        .filter(|n| n.is_fixed())
        .chain(nodes.iter().filter(|n| !n.is_fixed()))
}

/// Check every tree invariant, collecting all violations.
pub fn validate_tree(nodes: &[ParameterNode]) -> Result<(), SchemaError> {
    let mut errors = Vec::new();
    validate_container(nodes, "", 0, false, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::Invalid(errors))
    }
}

/// Paths of names shared by more than one node in the same container,
/// at any depth. A fixed and an LLM node sharing a name is the common case.
pub fn find_conflicts(nodes: &[ParameterNode]) -> Vec<String> {
    let mut conflicts = Vec::new();
    collect_conflicts(nodes, "", 0, &mut conflicts);
    conflicts
}

fn collect_conflicts(nodes: &[ParameterNode], parent: &str, depth: usize, out: &mut Vec<String>) {
    if depth > MAX_DEPTH {
        return;
    }
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for node in nodes {
        let count = seen.entry(node.name.as_str()).or_default();
        *count += 1;
        if *count == 2 {
            out.push(child_path(parent, &node.name));
        }
    }
    for node in nodes {
        let path = child_path(parent, &node.name);
        collect_conflicts(&node.children, &path, depth + 1, out);
        let mut items = node.items.as_ref();
        let mut prefix = path;
        let mut level = depth + 1;
        while let Some(layer) = items {
            prefix = items_path(&prefix);
            collect_conflicts(layer.object_properties(), &prefix, level, out);
            items = layer.items.as_deref();
            level += 1;
        }
    }
}

fn validate_container(
    nodes: &[ParameterNode],
    parent: &str,
    depth: usize,
    inside_fixed: bool,
    errors: &mut Vec<String>,
) {
    if nodes.is_empty() {
        return;
    }
    if depth >= MAX_DEPTH {
        errors.push(format!(
            "{parent}: nesting deeper than {MAX_DEPTH} levels"
        ));
        return;
    }

    let mut seen: HashMap<&str, &ParameterNode> = HashMap::new();
    for node in nodes {
        let path = child_path(parent, &node.name);

        if node.name.trim().is_empty() {
            let at = if parent.is_empty() { "<root>" } else { parent };
            errors.push(format!("{at}: parameter name is empty"));
        } else if node.name.contains(['.', '[', ']']) {
            errors.push(format!("{path}: name contains a reserved character"));
        }

        if let Some(prev) = seen.insert(node.name.as_str(), node) {
            if prev.is_fixed() != node.is_fixed() {
                errors.push(format!("{path}: fixed and LLM parameters share this name"));
            } else {
                errors.push(format!("{path}: duplicate parameter name"));
            }
        }

        if inside_fixed && !node.is_fixed() {
            errors.push(format!("{path}: LLM parameter inside a fixed container"));
        }

        validate_node(node, &path, depth, inside_fixed, errors);
    }
}

fn validate_node(
    node: &ParameterNode,
    path: &str,
    depth: usize,
    inside_fixed: bool,
    errors: &mut Vec<String>,
) {
    if node.kind == ParamType::Enum {
        if node.enum_values.is_empty() {
            errors.push(format!("{path}: enum has no values"));
        }
        if let Some(default) = node.default_value() {
            let listed = default
                .as_str()
                .is_some_and(|d| node.enum_values.iter().any(|v| v == d));
            if !listed {
                errors.push(format!("{path}: default is not one of the enum values"));
            }
        }
    }

    if node.items.is_some() && node.kind != ParamType::Array {
        errors.push(format!("{path}: items declared on a non-array parameter"));
    }
    if !node.children.is_empty() && node.kind != ParamType::Object {
        errors.push(format!("{path}: properties declared on a non-object parameter"));
    }

    let fixed = inside_fixed || node.is_fixed();
    validate_container(&node.children, path, depth + 1, fixed, errors);
    if let Some(items) = &node.items {
        validate_items(items, &items_path(path), depth + 1, fixed, errors);
    }
}

fn validate_items(
    items: &ArrayItems,
    path: &str,
    depth: usize,
    inside_fixed: bool,
    errors: &mut Vec<String>,
) {
    if items.items_type != ParamType::Object && !items.item_properties.is_empty() {
        errors.push(format!("{path}: item properties declared on non-object items"));
    }
    if items.items_type == ParamType::Enum && items.enum_values.is_empty() {
        errors.push(format!("{path}: enum has no values"));
    }
    validate_container(&items.item_properties, path, depth, inside_fixed, errors);
    if let Some(inner) = &items.items {
        if items.items_type != ParamType::Array {
            errors.push(format!("{path}: nested items declared on non-array items"));
        } else if depth + 1 >= MAX_DEPTH {
            errors.push(format!("{path}: nesting deeper than {MAX_DEPTH} levels"));
        } else {
            validate_items(inner, &items_path(path), depth + 1, inside_fixed, errors);
        }
    }
}
