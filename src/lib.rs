//! Client for storing documents in MongoDB, either straight through the
//! driver or through an AsterDB HTTP server, with optional field-level
//! encryption (RSA or Fernet).

pub mod aster;
pub mod http;
pub mod install;
pub mod routes;
pub mod settings;
pub mod store;
pub mod types;
pub mod utils;

pub use aster::Aster;
pub use handle_errors::{Error, Result};
pub use http::HttpClient;
pub use settings::Settings;
pub use store::DirectClient;
pub use types::{ConnectionTarget, DirectLink, KeyFile, KeyMaterial, Record};
