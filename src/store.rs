use crate::types::{DirectLink, Record};
use crate::utils::encryption::{SharedCipher, decrypt_record, encrypt_record};
use futures::TryStreamExt;
use handle_errors::{Error, Result};
use mongodb::bson::{Bson, Document, doc};
use mongodb::{Client, Collection, Database};
use serde_json::{Value, json};
use tracing::instrument;

/// Talks to MongoDB through the driver, encrypting fields on the way in and
/// decrypting them on the way out when a cipher is configured.
#[derive(Debug, Clone)]
pub struct DirectClient {
    client: Client,
    cipher: Option<SharedCipher>,
}

fn require<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::invalid_argument(format!("No {} provided.", what))),
    }
}

// Extended JSON is honoured so filters such as {"_id": {"$oid": ...}} reach the driver intact.
fn to_document(record: &Record) -> Result<Document> {
    match Bson::try_from(Value::Object(record.clone())) {
        Ok(Bson::Document(document)) => Ok(document),
        Ok(other) => Err(Error::invalid_argument(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
        Err(e) => Err(Error::invalid_argument(e.to_string())),
    }
}

fn to_record(document: Document) -> Record {
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

// Fields in `data` overwrite the stored ones; `_id` is left to the server.
fn merge_record(mut current: Record, data: &Record) -> Record {
    current.remove("_id");
    for (key, value) in data {
        if key != "_id" {
            current.insert(key.clone(), value.clone());
        }
    }
    current
}

fn has_operators(record: &Record) -> bool {
    record.keys().any(|key| key.starts_with('$'))
}

impl DirectClient {
    pub async fn connect(link: &DirectLink, cipher: Option<SharedCipher>) -> Result<Self> {
        let client = Client::with_uri_str(link.as_str()).await?;
        tracing::debug!(encrypted = cipher.is_some(), "direct transport ready");
        Ok(Self { client, cipher })
    }

    pub fn set_cipher(&mut self, cipher: Option<SharedCipher>) {
        self.cipher = cipher;
    }

    pub fn cipher(&self) -> Option<&SharedCipher> {
        self.cipher.as_ref()
    }

    fn database(&self, database: Option<&str>) -> Result<Database> {
        Ok(self.client.database(require(database, "database")?))
    }

    fn collection(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
    ) -> Result<Collection<Document>> {
        let db = self.database(database)?;
        Ok(db.collection::<Document>(require(collection, "collection")?))
    }

    fn decrypt(&self, document: Document) -> Result<Record> {
        let record = to_record(document);
        match &self.cipher {
            Some(cipher) => decrypt_record(cipher.as_ref(), &record),
            None => Ok(record),
        }
    }

    fn encrypt(&self, record: &Record) -> Result<Record> {
        match &self.cipher {
            Some(cipher) => encrypt_record(cipher.as_ref(), record),
            None => Ok(record.clone()),
        }
    }

    /// Returns the first document matching `query`, decrypted.
    #[instrument(skip(self, query))]
    pub async fn fetch(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
        query: &Record,
    ) -> Result<Record> {
        let col = self.collection(database, collection)?;
        let document = col
            .find_one(to_document(query)?)
            .await?
            .ok_or_else(|| Error::NotFound("The query returned no results.".to_string()))?;
        self.decrypt(document)
    }

    /// Returns every matching document, decrypted. A `limit` of 0 means no limit.
    #[instrument(skip(self, query))]
    pub async fn fetch_many(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
        query: &Record,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let col = self.collection(database, collection)?;
        let mut find = col.find(to_document(query)?);
        if limit > 0 {
            find = find.limit(limit as i64);
        }
        let documents: Vec<Document> = find.await?.try_collect().await?;
        tracing::debug!(count = documents.len(), "documents fetched");
        documents
            .into_iter()
            .map(|document| self.decrypt(document))
            .collect()
    }

    #[instrument(skip(self, data))]
    pub async fn insert(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
        data: &Record,
    ) -> Result<Value> {
        let col = self.collection(database, collection)?;
        let document = to_document(&self.encrypt(data)?)?;
        let inserted = col.insert_one(document).await?;
        Ok(json!({ "inserted_id": inserted.inserted_id.into_relaxed_extjson() }))
    }

    /// With a cipher, the first matched document is decrypted, `data` is merged
    /// over it and the result is re-encrypted in place: encrypted field names
    /// differ on every write, so update operators cannot address them.
    #[instrument(skip(self, query, data))]
    pub async fn update(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
        query: &Record,
        data: &Record,
    ) -> Result<Value> {
        let col = self.collection(database, collection)?;
        let filter = to_document(query)?;
        let updated = match &self.cipher {
            Some(_) if has_operators(data) => {
                return Err(Error::invalid_argument(
                    "update operators cannot address encrypted fields",
                ));
            }
            Some(_) => {
                let Some(current) = col.find_one(filter).await? else {
                    return Ok(json!({ "matched_count": 0, "modified_count": 0 }));
                };
                let id = current
                    .get("_id")
                    .cloned()
                    .ok_or_else(|| Error::encoding("matched document has no _id"))?;
                let merged = merge_record(self.decrypt(current)?, data);
                let replacement = to_document(&self.encrypt(&merged)?)?;
                col.replace_one(doc! { "_id": id }, replacement).await?
            }
            None if has_operators(data) => col.update_one(filter, to_document(data)?).await?,
            None => col.update_one(filter, doc! { "$set": to_document(data)? }).await?,
        };
        Ok(json!({
            "matched_count": updated.matched_count,
            "modified_count": updated.modified_count,
        }))
    }

    #[instrument(skip(self, query))]
    pub async fn delete(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
        query: &Record,
    ) -> Result<Value> {
        let col = self.collection(database, collection)?;
        let deleted = col.delete_one(to_document(query)?).await?;
        Ok(json!({ "deleted_count": deleted.deleted_count }))
    }

    /// MongoDB creates a database together with its first collection.
    pub async fn create_database(&self, database: Option<&str>) -> Result<Value> {
        require(database, "database")?;
        Err(Error::Unsupported(
            "databases are created with their first collection".to_string(),
        ))
    }

    #[instrument(skip(self))]
    pub async fn delete_database(&self, database: Option<&str>) -> Result<Value> {
        self.database(database)?.drop().await?;
        Ok(Value::Bool(true))
    }

    #[instrument(skip(self))]
    pub async fn create_collection(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
    ) -> Result<Value> {
        let db = self.database(database)?;
        db.create_collection(require(collection, "collection")?).await?;
        Ok(Value::Bool(true))
    }

    #[instrument(skip(self))]
    pub async fn delete_collection(
        &self,
        database: Option<&str>,
        collection: Option<&str>,
    ) -> Result<Value> {
        self.collection(database, collection)?.drop().await?;
        Ok(Value::Bool(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::encryption::{FernetCipher, cipher_from_key};

    #[test]
    fn extended_json_filters_become_bson() {
        let query = json!({"_id": {"$oid": "64b7f0c2e13b2a6d8c0f1a22"}, "n": 3});
        let document = to_document(query.as_object().unwrap()).unwrap();
        assert!(document.get_object_id("_id").is_ok());
        assert_eq!(to_record(document), *query.as_object().unwrap());
    }

    #[test]
    fn merge_keeps_untouched_fields() {
        let stored = json!({"_id": {"$oid": "64b7f0c2e13b2a6d8c0f1a22"}, "name": "ada", "age": 36});
        let data = json!({"age": 37, "city": "london"});
        let merged = merge_record(
            stored.as_object().unwrap().clone(),
            data.as_object().unwrap(),
        );
        assert_eq!(
            Value::Object(merged),
            json!({"name": "ada", "age": 37, "city": "london"})
        );
    }

    #[test]
    fn merge_never_rewrites_id() {
        let stored = json!({"_id": 1, "name": "ada"});
        let data = json!({"_id": 2, "name": "grace"});
        let merged = merge_record(
            stored.as_object().unwrap().clone(),
            data.as_object().unwrap(),
        );
        assert!(!merged.contains_key("_id"));
        assert_eq!(merged["name"], json!("grace"));
    }

    #[test]
    fn merged_update_round_trips_through_the_cipher() {
        let cipher = cipher_from_key(&FernetCipher::generate_key()).unwrap();
        let stored = json!({"name": "ada", "age": 36});
        let on_disk = encrypt_record(cipher.as_ref(), stored.as_object().unwrap()).unwrap();

        let current = decrypt_record(cipher.as_ref(), &on_disk).unwrap();
        let merged = merge_record(current, json!({"age": 37}).as_object().unwrap());
        let replacement = encrypt_record(cipher.as_ref(), &merged).unwrap();

        assert_eq!(replacement.len(), 2);
        assert_eq!(
            Value::Object(decrypt_record(cipher.as_ref(), &replacement).unwrap()),
            json!({"name": "ada", "age": 37})
        );
    }

    #[test]
    fn operator_detection() {
        let set = json!({"$set": {"a": 1}});
        let plain = json!({"a": 1});
        assert!(has_operators(set.as_object().unwrap()));
        assert!(!has_operators(plain.as_object().unwrap()));
    }

    #[test]
    fn empty_names_are_missing() {
        assert!(matches!(
            require(Some(""), "database"),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(require(Some("db"), "database").unwrap(), "db");
    }
}
