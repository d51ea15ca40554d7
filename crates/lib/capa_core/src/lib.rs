//! # capa_core
//!
//! Core domain logic for Capa: the parameter tree behind a capability, the
//! codec between its stored and editable forms, sample generation, request
//! compilation and test-input collection.

pub mod api;
pub mod config;
pub mod models;
pub mod schema;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
