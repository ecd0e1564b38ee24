//! Read-only identity wrapper over resolved principal data.

mod factory;
mod types;

pub use factory::*;
pub use types::*;

/// A resolved principal record as returned by resolvers and identifiers.
pub type Record = serde_json::Map<String, serde_json::Value>;
