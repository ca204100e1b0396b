use handle_errors::{Error, Result};
use std::fmt;

const DIRECT_PREFIXES: [&str; 2] = ["mongodb://", "mongodb+srv://"];

/// A MongoDB connection string, checked for a driver prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectLink(String);

impl DirectLink {
    pub fn new(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        if DIRECT_PREFIXES.iter().any(|prefix| uri.starts_with(prefix)) {
            Ok(Self(uri))
        } else {
            Err(Error::invalid_argument("Invalid MONGO URI provided."))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DirectLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a facade sends its calls. Fixed once the facade exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    Direct(DirectLink),
    Http(String),
}

impl ConnectionTarget {
    pub fn parse(target: &str) -> Self {
        match DirectLink::new(target) {
            Ok(link) => ConnectionTarget::Direct(link),
            Err(_) => ConnectionTarget::Http(target.trim_end_matches('/').to_string()),
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, ConnectionTarget::Direct(_))
    }
}

impl From<DirectLink> for ConnectionTarget {
    fn from(link: DirectLink) -> Self {
        ConnectionTarget::Direct(link)
    }
}
