use config::{Config, Environment, File};
use handle_errors::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_log_level() -> String {
    "info".to_string()
}

/// Client settings: an optional file layered under `ASTER_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub url: String,
    pub key: Option<String>,
    pub key_file: Option<PathBuf>,
    pub payload_key_file: Option<PathBuf>,
    pub database: Option<String>,
    pub collection: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Settings {
    pub fn load(file: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(Environment::with_prefix("ASTER"))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_file_with_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "url = \"http://127.0.0.1:8080\"\nkey_file = \"/etc/aster/key\"\ndatabase = \"main\""
        )
        .unwrap();

        let settings = Settings::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.url, "http://127.0.0.1:8080");
        assert_eq!(settings.key_file, Some(PathBuf::from("/etc/aster/key")));
        assert_eq!(settings.database.as_deref(), Some("main"));
        assert_eq!(settings.collection, None);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn url_is_required() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "database = \"main\"").unwrap();
        assert!(Settings::load(file.path().to_str().unwrap()).is_err());
    }
}
