use crate::types::Record;
use base64::{Engine, engine::general_purpose::STANDARD};
use fernet::Fernet;
use handle_errors::{Error, Result};
use openssl::pkey::PKey;
use openssl::rsa::{Padding, Rsa};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

// PKCS#1 v1.5 padding overhead
const PKCS1_OVERHEAD: usize = 11;

/// Encrypts and decrypts a single field.
pub trait FieldCipher: Send + Sync + fmt::Debug {
    fn encrypt(&self, plaintext: &[u8]) -> Result<String>;

    fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>>;

    fn scheme_name(&self) -> &'static str;
}

pub type SharedCipher = Arc<dyn FieldCipher>;

enum RsaKey {
    Private(Rsa<openssl::pkey::Private>),
    Public(Rsa<openssl::pkey::Public>),
}

/// RSA with PKCS#1 v1.5 padding; ciphertext is standard base64.
pub struct RsaCipher {
    key: RsaKey,
}

impl RsaCipher {
    /// Accepts a private key (PKCS#1 or PKCS#8) or a public key, PEM encoded.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let pem = pem.trim().as_bytes();
        if let Ok(private) = PKey::private_key_from_pem(pem) {
            return Ok(Self {
                key: RsaKey::Private(private.rsa()?),
            });
        }
        let public = PKey::public_key_from_pem(pem)
            .or_else(|_| Rsa::public_key_from_pem_pkcs1(pem).and_then(PKey::from_rsa))
            .map_err(|_| Error::InvalidKey("The private key is invalid.".to_string()))?;
        Ok(Self {
            key: RsaKey::Public(public.rsa()?),
        })
    }

    fn size(&self) -> usize {
        match &self.key {
            RsaKey::Private(rsa) => rsa.size() as usize,
            RsaKey::Public(rsa) => rsa.size() as usize,
        }
    }
}

impl fmt::Debug for RsaCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.key {
            RsaKey::Private(_) => "private",
            RsaKey::Public(_) => "public",
        };
        f.debug_struct("RsaCipher")
            .field("bits", &(self.size() * 8))
            .field("key", &kind)
            .finish()
    }
}

impl FieldCipher for RsaCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let limit = self.size() - PKCS1_OVERHEAD;
        if plaintext.len() > limit {
            return Err(Error::invalid_argument(format!(
                "field of {} bytes exceeds the {} byte RSA limit",
                plaintext.len(),
                limit
            )));
        }
        let mut buf = vec![0; self.size()];
        let len = match &self.key {
            RsaKey::Private(rsa) => rsa.public_encrypt(plaintext, &mut buf, Padding::PKCS1)?,
            RsaKey::Public(rsa) => rsa.public_encrypt(plaintext, &mut buf, Padding::PKCS1)?,
        };
        buf.truncate(len);
        Ok(STANDARD.encode(buf))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>> {
        let RsaKey::Private(rsa) = &self.key else {
            return Err(Error::InvalidKey("a private key is required to decrypt".to_string()));
        };
        let raw = STANDARD.decode(ciphertext).map_err(Error::encoding)?;
        let mut buf = vec![0; self.size()];
        let len = rsa.private_decrypt(&raw, &mut buf, Padding::PKCS1)?;
        buf.truncate(len);
        Ok(buf)
    }

    fn scheme_name(&self) -> &'static str {
        "rsa-pkcs1"
    }
}

/// Fernet symmetric encryption. Tokens are url-safe base64 already.
pub struct FernetCipher {
    fernet: Fernet,
}

impl FernetCipher {
    pub fn new(key: &str) -> Result<Self> {
        let fernet = Fernet::new(key.trim())
            .ok_or_else(|| Error::InvalidKey("The symmetric key is invalid.".to_string()))?;
        Ok(Self { fernet })
    }

    pub fn generate_key() -> String {
        Fernet::generate_key()
    }
}

impl fmt::Debug for FernetCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FernetCipher")
    }
}

impl FieldCipher for FernetCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        Ok(self.fernet.encrypt(plaintext))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>> {
        self.fernet
            .decrypt(ciphertext)
            .map_err(|_| {
                Error::InvalidKey("The symmetric key does not match the data.".to_string())
            })
    }

    fn scheme_name(&self) -> &'static str {
        "fernet"
    }
}

/// Picks the cipher from the shape of the key: PEM means RSA, anything else must be Fernet.
pub fn cipher_from_key(key: &str) -> Result<SharedCipher> {
    if key.trim_start().starts_with("-----BEGIN") {
        Ok(Arc::new(RsaCipher::from_pem(key)?))
    } else {
        Ok(Arc::new(FernetCipher::new(key)?))
    }
}

// The driver-managed `_id` is the only field stored as-is.
fn is_reserved(key: &str) -> bool {
    key == "_id"
}

pub fn encrypt_record(cipher: &dyn FieldCipher, record: &Record) -> Result<Record> {
    let mut encrypted = Record::new();
    for (key, value) in record {
        if is_reserved(key) {
            encrypted.insert(key.clone(), value.clone());
            continue;
        }
        let encrypted_key = cipher.encrypt(key.as_bytes())?;
        let encrypted_value = cipher.encrypt(&serde_json::to_vec(value)?)?;
        encrypted.insert(encrypted_key, Value::String(encrypted_value));
    }
    Ok(encrypted)
}

pub fn decrypt_record(cipher: &dyn FieldCipher, record: &Record) -> Result<Record> {
    let mut decrypted = Record::new();
    for (key, value) in record {
        if is_reserved(key) {
            decrypted.insert(key.clone(), value.clone());
            continue;
        }
        let Value::String(token) = value else {
            return Err(Error::encoding(format!("field value is not ciphertext: {}", value)));
        };
        let decrypted_key = String::from_utf8(cipher.decrypt(key)?).map_err(Error::encoding)?;
        let raw_value = cipher.decrypt(token)?;
        // Plain strings written by other clients are not JSON encoded
        let decrypted_value = match serde_json::from_slice(&raw_value) {
            Ok(value) => value,
            Err(_) => Value::String(String::from_utf8(raw_value).map_err(Error::encoding)?),
        };
        decrypted.insert(decrypted_key, decrypted_value);
    }
    Ok(decrypted)
}
