//! Domain models shared across Capa crates.

pub mod capability;
