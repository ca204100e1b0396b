use crate::types::Record;
use reqwest::Method;
use serde_json::{Value, json};

/// One AsterDB server operation: where it goes, which method, what body.
#[derive(Debug, Clone, PartialEq)]
pub enum Route<'a> {
    Fetch {
        database: &'a str,
        collection: &'a str,
        query: &'a Record,
    },
    Insert {
        database: &'a str,
        collection: &'a str,
        data: &'a Record,
    },
    Update {
        database: &'a str,
        collection: &'a str,
        query: &'a Record,
        data: &'a Record,
    },
    Delete {
        database: &'a str,
        collection: &'a str,
        query: &'a Record,
    },
    CreateCollection {
        database: &'a str,
        collection: &'a str,
    },
    DeleteCollection {
        database: &'a str,
        collection: &'a str,
    },
    CreateDatabase {
        database: &'a str,
    },
    DeleteDatabase {
        database: &'a str,
    },
}

impl Route<'_> {
    pub fn method(&self) -> Method {
        match self {
            Route::Update { .. } => Method::PATCH,
            Route::Delete { .. } | Route::DeleteDatabase { .. } => Method::DELETE,
            _ => Method::POST,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Fetch {
                database,
                collection,
                ..
            } => format!("/{}/{}/fetch", database, collection),
            Route::Insert {
                database,
                collection,
                ..
            } => format!("/{}/{}/insert", database, collection),
            Route::Update {
                database,
                collection,
                ..
            } => format!("/{}/{}/update", database, collection),
            Route::Delete {
                database,
                collection,
                ..
            } => format!("/{}/{}/delete", database, collection),
            Route::CreateCollection { database, .. } => format!("/{}/create", database),
            Route::DeleteCollection { database, .. } => format!("/{}/delete", database),
            Route::CreateDatabase { .. } => "/create".to_string(),
            Route::DeleteDatabase { .. } => "/delete".to_string(),
        }
    }

    pub fn body(&self) -> Value {
        match self {
            Route::Fetch { query, .. } | Route::Delete { query, .. } => json!({ "query": query }),
            Route::Insert { data, .. } => json!({ "data": data }),
            Route::Update { query, data, .. } => json!({ "query": query, "data": data }),
            Route::CreateCollection { collection, .. }
            | Route::DeleteCollection { collection, .. } => json!({ "collection": collection }),
            Route::CreateDatabase { database } | Route::DeleteDatabase { database } => {
                json!({ "database": database })
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Route::Fetch { .. } => "fetch",
            Route::Insert { .. } => "insert",
            Route::Update { .. } => "update",
            Route::Delete { .. } => "delete",
            Route::CreateCollection { .. } => "create_collection",
            Route::DeleteCollection { .. } => "delete_collection",
            Route::CreateDatabase { .. } => "create_database",
            Route::DeleteDatabase { .. } => "delete_database",
        }
    }
}
