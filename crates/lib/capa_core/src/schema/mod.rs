// @awa-component: CAP-ParameterSchema
//
//! Parameter schema module: tree model, codec, samples, compiler and collector.
//!
//! # Public API
//!
//! - [`codec::decode`] / [`codec::encode`]: stored schema ↔ editable pair
//! - [`codec::parse_tree`] / [`codec::encode_tree`]: stored schema ↔ parameter tree
//! - [`sample::sample`]: representative value for a node
//! - [`compiler::compile`]: query string or JSON body for a request
//! - [`collector::collect`]: typed test arguments from raw form input
//! - [`collector::missing_required`]: required LLM parameters absent at any depth

pub mod codec;
pub mod collector;
pub mod compiler;
pub mod model;
pub mod sample;


use thiserror::Error;

pub use codec::{EditableParams, LlmParamsSchema};
pub use model::{ArrayItems, Binding, ParamType, ParameterNode};

/// Maximum container nesting accepted by the parser and the tree walkers.
pub const MAX_DEPTH: usize = 16;

/// Structural schema errors. Each entry names the offending parameter path.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Invalid parameter schema: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl SchemaError {
    /// Offending entries, one per violation.
    pub fn violations(&self) -> &[String] {
        match self {
            Self::Invalid(v) => v,
        }
    }
}

/// Path of an object child: `parent.name`, or `name` at the top level.
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// Path prefix for the item properties of an array: `parent[]`.
pub fn items_path(parent: &str) -> String {
    format!("{parent}[]")
}

/// One step of a parameter path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment<'a> {
    /// Descend into an object child.
    Child(&'a str),
    /// Descend into the item properties of an array, through `levels` array
    /// layers (`grid[][]` is two).
    Items(&'a str, usize),
}

/// Split a path key such as `orders[].lines[].sku` into container segments and
/// the final leaf name. Returns `None` for malformed paths.
pub fn split_path(path: &str) -> Option<(Vec<PathSegment<'_>>, &str)> {
    let mut parts: Vec<&str> = path.split('.').collect();
    let leaf = parts.pop()?;
    if leaf.is_empty() || leaf.contains(['[', ']']) {
        return None;
    }
    let mut segments = Vec::with_capacity(parts.len());
    for part in parts {
        let mut name = part;
        let mut levels = 0;
        while let Some(stripped) = name.strip_suffix("[]") {
            name = stripped;
            levels += 1;
        }
        if name.is_empty() || name.contains(['[', ']']) {
            return None;
        }
        segments.push(match levels {
            0 => PathSegment::Child(name),
            n => PathSegment::Items(name, n),
        });
    }
    Some((segments, leaf))
}
