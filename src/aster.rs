use crate::http::HttpClient;
use crate::settings::Settings;
use crate::store::DirectClient;
use crate::types::{ConnectionTarget, KeyMaterial, Record};
use crate::utils::encryption::cipher_from_key;
use handle_errors::{Error, Result};
use serde_json::Value;

#[derive(Debug, Clone)]
enum Transport {
    Direct(DirectClient),
    Http(HttpClient),
}

/// Single entry point over either transport, chosen from the connection
/// target when the facade is built and kept for its whole lifetime.
///
/// The current database/collection selection is plain state behind `&mut self`;
/// share the facade across tasks only after it is configured.
#[derive(Debug, Clone)]
pub struct Aster {
    target: ConnectionTarget,
    transport: Transport,
    database: Option<String>,
    collection: Option<String>,
}

fn pick<'a>(
    explicit: Option<&'a str>,
    selected: &'a Option<String>,
    what: &str,
) -> Result<&'a str> {
    explicit
        .or(selected.as_deref())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::invalid_argument(format!("No {} provided.", what)))
}

impl Aster {
    /// `mongodb://` and `mongodb+srv://` targets use the driver; anything else
    /// is treated as the base URL of an AsterDB server, which needs a key.
    pub async fn connect(target: &str, key: Option<KeyMaterial>) -> Result<Self> {
        let target = ConnectionTarget::parse(target);
        let key = key.map(|k| k.load()).transpose()?;
        let transport = match &target {
            ConnectionTarget::Direct(link) => {
                let cipher = key.as_deref().map(cipher_from_key).transpose()?;
                Transport::Direct(DirectClient::connect(link, cipher).await?)
            }
            ConnectionTarget::Http(url) => {
                let key = key.ok_or_else(|| {
                    Error::invalid_argument("an AsterDB server requires key material")
                })?;
                Transport::Http(HttpClient::new(url.as_str(), key)?)
            }
        };
        tracing::info!(direct = target.is_direct(), "aster client bound");
        Ok(Self {
            target,
            transport,
            database: None,
            collection: None,
        })
    }

    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let key = match (&settings.key, &settings.key_file) {
            (Some(inline), _) => Some(KeyMaterial::Inline(inline.clone())),
            (None, Some(path)) => Some(KeyMaterial::File(path.clone())),
            (None, None) => None,
        };
        let mut aster = Self::connect(&settings.url, key).await?;
        if let Some(path) = &settings.payload_key_file {
            aster = aster.with_payload_key(KeyMaterial::File(path.clone()))?;
        }
        aster.database = settings.database.clone();
        aster.collection = settings.collection.clone();
        Ok(aster)
    }

    /// Field encryption key for the data itself. On the HTTP transport this is
    /// separate from the Authorization key; on the driver it replaces the field cipher.
    pub fn with_payload_key(mut self, key: KeyMaterial) -> Result<Self> {
        let cipher = cipher_from_key(&key.load()?)?;
        match &mut self.transport {
            Transport::Direct(client) => client.set_cipher(Some(cipher)),
            Transport::Http(client) => client.set_payload_cipher(Some(cipher)),
        }
        Ok(self)
    }

    /// Replaces the key on the live transport.
    pub fn set_key(&mut self, key: KeyMaterial) -> Result<String> {
        let key = key.load()?;
        match &mut self.transport {
            Transport::Direct(client) => client.set_cipher(Some(cipher_from_key(&key)?)),
            Transport::Http(client) => client.set_key(key.clone()),
        }
        Ok(key)
    }

    pub fn set_database(&mut self, database: impl Into<String>) -> &str {
        self.database.insert(database.into())
    }

    pub fn set_collection(&mut self, collection: impl Into<String>) -> &str {
        self.collection.insert(collection.into())
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub fn is_direct(&self) -> bool {
        matches!(self.transport, Transport::Direct(_))
    }

    pub fn is_http(&self) -> bool {
        matches!(self.transport, Transport::Http(_))
    }

    /// `limit` follows the server semantics on both transports:
    /// 0 returns every match, 1 the first match itself, n the first n matches.
    pub async fn fetch(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
        query: &Record,
        limit: usize,
    ) -> Result<Value> {
        let database = pick(database, &self.database, "database")?;
        let collection = pick(collection, &self.collection, "collection")?;
        match &self.transport {
            Transport::Direct(client) if limit == 1 => Ok(Value::Object(
                client.fetch(Some(database), Some(collection), query).await?,
            )),
            Transport::Direct(client) => {
                let records = client
                    .fetch_many(Some(database), Some(collection), query, limit)
                    .await?;
                Ok(Value::Array(records.into_iter().map(Value::Object).collect()))
            }
            Transport::Http(client) => client.fetch(database, collection, query, limit).await,
        }
    }

    pub async fn insert(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
        data: &Record,
    ) -> Result<Value> {
        let database = pick(database, &self.database, "database")?;
        let collection = pick(collection, &self.collection, "collection")?;
        match &self.transport {
            Transport::Direct(client) => {
                client.insert(Some(database), Some(collection), data).await
            }
            Transport::Http(client) => client.insert(database, collection, data).await,
        }
    }

    pub async fn update(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
        query: &Record,
        data: &Record,
    ) -> Result<Value> {
        let database = pick(database, &self.database, "database")?;
        let collection = pick(collection, &self.collection, "collection")?;
        match &self.transport {
            Transport::Direct(client) => {
                client
                    .update(Some(database), Some(collection), query, data)
                    .await
            }
            Transport::Http(client) => client.update(database, collection, query, data).await,
        }
    }

    pub async fn delete(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
        query: &Record,
    ) -> Result<Value> {
        let database = pick(database, &self.database, "database")?;
        let collection = pick(collection, &self.collection, "collection")?;
        match &self.transport {
            Transport::Direct(client) => {
                client.delete(Some(database), Some(collection), query).await
            }
            Transport::Http(client) => client.delete(database, collection, query).await,
        }
    }

    pub async fn create_database(&self, database: Option<&str>) -> Result<Value> {
        let database = pick(database, &self.database, "database")?;
        match &self.transport {
            Transport::Direct(client) => client.create_database(Some(database)).await,
            Transport::Http(client) => client.create_database(database).await,
        }
    }

    pub async fn delete_database(&self, database: Option<&str>) -> Result<Value> {
        let database = pick(database, &self.database, "database")?;
        match &self.transport {
            Transport::Direct(client) => client.delete_database(Some(database)).await,
            Transport::Http(client) => client.delete_database(database).await,
        }
    }

    pub async fn create_collection(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
    ) -> Result<Value> {
        let database = pick(database, &self.database, "database")?;
        let collection = pick(collection, &self.collection, "collection")?;
        match &self.transport {
            Transport::Direct(client) => {
                client
                    .create_collection(Some(database), Some(collection))
                    .await
            }
            Transport::Http(client) => client.create_collection(database, collection).await,
        }
    }

    pub async fn delete_collection(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
    ) -> Result<Value> {
        let database = pick(database, &self.database, "database")?;
        let collection = pick(collection, &self.collection, "collection")?;
        match &self.transport {
            Transport::Direct(client) => {
                client
                    .delete_collection(Some(database), Some(collection))
                    .await
            }
            Transport::Http(client) => client.delete_collection(database, collection).await,
        }
    }
}
