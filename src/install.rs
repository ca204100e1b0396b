use config::{Config, File, FileFormat};
use handle_errors::{Error, Result};
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const KEY_BITS: u32 = 2048;
const PRIVATE_KEY_FILE: &str = "aster";
const PUBLIC_KEY_FILE: &str = "aster.pub";

/// Server config written by `aster install`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallConfig {
    pub host: String,
    pub port: u16,
    pub mongo: Option<String>,
    pub private_key: String,
    pub public_key: String,
}

impl InstallConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path).format(FileFormat::Json))
            .build()?
            .try_deserialize::<InstallConfig>()?;
        Ok(config)
    }
}

#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub host: String,
    pub port: u16,
    /// Existing private key; its public half is read from `<key>.pub`.
    pub key: Option<PathBuf>,
    pub mongo: Option<String>,
    pub key_dir: PathBuf,
    pub config_path: PathBuf,
}

impl InstallOptions {
    pub fn default_key_dir() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ssh")
            .join("aster.db")
    }
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 80,
            key: None,
            mongo: None,
            key_dir: Self::default_key_dir(),
            config_path: PathBuf::from("./config.json"),
        }
    }
}

fn refuse_existing(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(Error::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("{} already exists", path.display()),
        )));
    }
    Ok(())
}

fn write_new(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    if let Err(e) = file.write_all(contents) {
        drop(file);
        discard(path);
        return Err(e.into());
    }
    Ok(())
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "could not remove partial install file");
    }
}

/// Creates every file or none of them: on the first failure the files this
/// call already created are removed again.
fn write_all(files: &[(&str, &Path, &[u8])]) -> Result<()> {
    let mut created = Vec::with_capacity(files.len());
    for (what, path, contents) in files {
        if let Err(e) = write_new(path, contents) {
            created.into_iter().for_each(discard);
            return Err(e);
        }
        tracing::info!(path = %path.display(), "{} created", what);
        created.push(*path);
    }
    Ok(())
}

fn generate_key_pair() -> Result<(String, String)> {
    let pkey = PKey::from_rsa(Rsa::generate(KEY_BITS)?)?;
    let private_key = String::from_utf8(pkey.private_key_to_pem_pkcs8()?).map_err(Error::encoding)?;
    let public_key = String::from_utf8(pkey.public_key_to_pem()?).map_err(Error::encoding)?;
    Ok((private_key, public_key))
}

fn public_key_path(key: &Path) -> PathBuf {
    let mut path = key.as_os_str().to_owned();
    path.push(".pub");
    PathBuf::from(path)
}

/// Writes the key pair (when generated) and the server config. Refuses to
/// overwrite any file that already exists.
pub fn install(options: &InstallOptions) -> Result<InstallConfig> {
    refuse_existing(&options.config_path)?;

    let private_path = options.key_dir.join(PRIVATE_KEY_FILE);
    let public_path = options.key_dir.join(PUBLIC_KEY_FILE);
    let generate = options.key.is_none();
    let (private_key, public_key) = match &options.key {
        None => {
            refuse_existing(&private_path)?;
            refuse_existing(&public_path)?;
            generate_key_pair()?
        }
        Some(key) => {
            let private_key = fs::read_to_string(key)?;
            tracing::info!(path = %key.display(), "private key loaded");
            let public_key = fs::read_to_string(public_key_path(key))?;
            tracing::info!("public key loaded");
            (private_key, public_key)
        }
    };

    let config = InstallConfig {
        host: options.host.clone(),
        port: options.port,
        mongo: options.mongo.clone(),
        private_key,
        public_key,
    };
    let mut payload = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut payload, formatter);
    config.serialize(&mut serializer)?;

    let mut files = Vec::with_capacity(3);
    if generate {
        fs::create_dir_all(&options.key_dir)?;
        files.push(("private key", private_path.as_path(), config.private_key.as_bytes()));
        files.push(("public key", public_path.as_path(), config.public_key.as_bytes()));
    }
    files.push(("config file", options.config_path.as_path(), payload.as_slice()));
    write_all(&files)?;
    Ok(config)
}
