pub mod key;
pub mod target;

pub use key::{KeyFile, KeyMaterial};
pub use target::{ConnectionTarget, DirectLink};

/// Untyped query or document, passed through to the backend.
pub type Record = serde_json::Map<String, serde_json::Value>;
