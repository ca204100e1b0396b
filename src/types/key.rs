use handle_errors::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// A key read from disk once, when the file is opened.
#[derive(Debug, Clone)]
pub struct KeyFile {
    path: PathBuf,
    key: String,
}

impl KeyFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let key = fs::read_to_string(&path)?;
        tracing::debug!(path = %path.display(), "key file loaded");
        Ok(Self { path, key })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_key(&self) -> &str {
        &self.key
    }
}

/// Key material handed to a client: either the secret itself or a path to it.
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    Inline(String),
    File(PathBuf),
}

impl KeyMaterial {
    /// Returns the secret. Files are read in full, byte for byte, on every call.
    pub fn load(&self) -> Result<String> {
        match self {
            KeyMaterial::Inline(key) => Ok(key.clone()),
            KeyMaterial::File(path) => Ok(KeyFile::open(path)?.key),
        }
    }
}

impl From<&str> for KeyMaterial {
    fn from(key: &str) -> Self {
        KeyMaterial::Inline(key.to_string())
    }
}

impl From<String> for KeyMaterial {
    fn from(key: String) -> Self {
        KeyMaterial::Inline(key)
    }
}

impl From<PathBuf> for KeyMaterial {
    fn from(path: PathBuf) -> Self {
        KeyMaterial::File(path)
    }
}

impl From<KeyFile> for KeyMaterial {
    fn from(file: KeyFile) -> Self {
        KeyMaterial::Inline(file.key)
    }
}
