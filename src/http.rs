use crate::routes::Route;
use crate::types::Record;
use crate::utils::encryption::{SharedCipher, decrypt_record, encrypt_record};
use handle_errors::{Error, Result, error_for_status};
use reqwest::{Client, header};
use serde_json::Value;
use tracing::instrument;

const USER_AGENT: &str = concat!("aster-db/", env!("CARGO_PKG_VERSION"));

/// Client for a remote AsterDB HTTP server.
#[derive(Debug, Clone)]
pub struct HttpClient {
    url: String,
    key: String,
    payload_cipher: Option<SharedCipher>,
    client: Client,
}

/// Applies a fetch limit to an already complete result.
/// 0 keeps everything, 1 unwraps the first element, n keeps the first n.
pub fn apply_limit(result: Value, limit: usize) -> Result<Value> {
    let Value::Array(mut items) = result else {
        return Ok(result);
    };
    match limit {
        0 => Ok(Value::Array(items)),
        1 => {
            if items.is_empty() {
                Err(Error::NotFound("The query returned no results.".to_string()))
            } else {
                Ok(items.swap_remove(0))
            }
        }
        n => {
            items.truncate(n);
            Ok(Value::Array(items))
        }
    }
}

impl HttpClient {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            url: url.into().trim_end_matches('/').to_string(),
            key: key.into(),
            payload_cipher: None,
            client,
        })
    }

    /// Encrypts written data and decrypts fetched records with `cipher`.
    pub fn with_payload_cipher(mut self, cipher: SharedCipher) -> Self {
        self.payload_cipher = Some(cipher);
        self
    }

    pub fn set_payload_cipher(&mut self, cipher: Option<SharedCipher>) {
        self.payload_cipher = cipher;
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, route: Route<'_>) -> Result<Value> {
        let url = format!("{}{}", self.url, route.path());
        tracing::debug!(method = %route.method(), %url, "sending {}", route.name());
        let response = self
            .client
            .request(route.method(), &url)
            // Header values cannot carry the newline key files usually end with
            .header(header::AUTHORIZATION, self.key.trim())
            .json(&route.body())
            .send()
            .await?;

        if let Some(error) = error_for_status(response.status()) {
            return Err(error);
        }
        let mut body: Value = response.json().await?;
        Ok(body.get_mut("result").map(Value::take).unwrap_or(Value::Null))
    }

    fn seal(&self, data: &Record) -> Result<Record> {
        match &self.payload_cipher {
            Some(cipher) => encrypt_record(cipher.as_ref(), data),
            None => Ok(data.clone()),
        }
    }

    fn open(&self, result: Value) -> Result<Value> {
        let Some(cipher) = &self.payload_cipher else {
            return Ok(result);
        };
        match result {
            Value::Object(record) => Ok(Value::Object(decrypt_record(cipher.as_ref(), &record)?)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.open(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other),
        }
    }

    #[instrument(skip(self, query))]
    pub async fn fetch(
        &self,
        database: &str,
        collection: &str,
        query: &Record,
        limit: usize,
    ) -> Result<Value> {
        let route = Route::Fetch {
            database,
            collection,
            query,
        };
        let result = self.send(route).await?;
        self.open(apply_limit(result, limit)?)
    }

    #[instrument(skip(self, data))]
    pub async fn insert(&self, database: &str, collection: &str, data: &Record) -> Result<Value> {
        let data = self.seal(data)?;
        self.send(Route::Insert {
            database,
            collection,
            data: &data,
        })
        .await
    }

    #[instrument(skip(self, query, data))]
    pub async fn update(
        &self,
        database: &str,
        collection: &str,
        query: &Record,
        data: &Record,
    ) -> Result<Value> {
        let data = self.seal(data)?;
        self.send(Route::Update {
            database,
            collection,
            query,
            data: &data,
        })
        .await
    }

    #[instrument(skip(self, query))]
    pub async fn delete(&self, database: &str, collection: &str, query: &Record) -> Result<Value> {
        self.send(Route::Delete {
            database,
            collection,
            query,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn create_collection(&self, database: &str, collection: &str) -> Result<Value> {
        self.send(Route::CreateCollection {
            database,
            collection,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_collection(&self, database: &str, collection: &str) -> Result<Value> {
        self.send(Route::DeleteCollection {
            database,
            collection,
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn create_database(&self, database: &str) -> Result<Value> {
        self.send(Route::CreateDatabase { database }).await
    }

    #[instrument(skip(self))]
    pub async fn delete_database(&self, database: &str) -> Result<Value> {
        self.send(Route::DeleteDatabase { database }).await
    }
}
