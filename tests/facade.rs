mod common;

use aster_db::{Aster, DirectClient, DirectLink, Error, KeyMaterial, Settings};
use common::{mock_server, record};
use serde_json::json;
use std::io::Write;

// Nothing listens here; the driver only connects lazily
const UNREACHABLE_MONGO: &str = "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200";

#[tokio::test]
async fn driver_strings_bind_the_direct_transport() {
    let aster = Aster::connect(UNREACHABLE_MONGO, None).await.unwrap();
    assert!(aster.is_direct());
    assert!(!aster.is_http());
}

#[tokio::test]
async fn other_strings_bind_the_http_transport() {
    for target in ["http://127.0.0.1:9", "https://aster.example.com/", "aster.local:80"] {
        let aster = Aster::connect(target, Some(KeyMaterial::from("k")))
            .await
            .unwrap();
        assert!(aster.is_http(), "{}", target);
    }
}

#[tokio::test]
async fn http_transport_needs_a_key() {
    assert!(matches!(
        Aster::connect("http://127.0.0.1:9", None).await,
        Err(Error::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn direct_calls_without_names_fail_before_the_network() {
    let link = DirectLink::new(UNREACHABLE_MONGO).unwrap();
    let client = DirectClient::connect(&link, None).await.unwrap();
    let query = record(json!({"a": 1}));

    for (database, collection) in [(None, Some("c")), (Some("d"), None), (None, None)] {
        assert!(matches!(
            client.fetch(database, collection, &query).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            client.insert(database, collection, &query).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            client.update(database, collection, &query, &query).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            client.delete(database, collection, &query).await,
            Err(Error::InvalidArgument(_))
        ));
    }
}

#[tokio::test]
async fn encrypted_update_rejects_operators() {
    let link = DirectLink::new(UNREACHABLE_MONGO).unwrap();
    let cipher = aster_db::utils::encryption::cipher_from_key(
        &aster_db::utils::encryption::FernetCipher::generate_key(),
    )
    .unwrap();
    let client = DirectClient::connect(&link, Some(cipher)).await.unwrap();
    let result = client
        .update(
            Some("d"),
            Some("c"),
            &record(json!({})),
            &record(json!({"$set": {"a": 1}})),
        )
        .await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[tokio::test]
async fn direct_create_database_is_unsupported() {
    let aster = Aster::connect(UNREACHABLE_MONGO, None).await.unwrap();
    assert!(matches!(
        aster.create_database(Some("d")).await,
        Err(Error::Unsupported(_))
    ));
}

#[tokio::test]
async fn selection_fills_in_missing_names() {
    let (url, seen) = mock_server(200, json!({"result": []})).await;
    let mut aster = Aster::connect(&url, Some(KeyMaterial::from("k")))
        .await
        .unwrap();

    assert!(matches!(
        aster.fetch(None, None, &record(json!({})), 0).await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(seen.lock().unwrap().is_empty());

    assert_eq!(aster.set_database("shop"), "shop");
    aster.set_collection("orders");
    aster.fetch(None, None, &record(json!({})), 0).await.unwrap();
    aster
        .fetch(None, Some("items"), &record(json!({})), 0)
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].path, "/shop/orders/fetch");
    assert_eq!(seen[1].path, "/shop/items/fetch");
}

#[tokio::test]
async fn key_files_are_trimmed_for_the_header_and_replaceable() {
    let (url, seen) = mock_server(200, json!({"result": true})).await;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"file-key\n").unwrap();

    let mut aster = Aster::connect(&url, Some(KeyMaterial::File(file.path().to_path_buf())))
        .await
        .unwrap();
    aster.create_database(Some("d")).await.unwrap();

    assert_eq!(aster.set_key(KeyMaterial::from("rotated")).unwrap(), "rotated");
    aster.create_database(Some("d")).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].authorization.as_deref(), Some("file-key"));
    assert_eq!(seen[1].authorization.as_deref(), Some("rotated"));
}

#[tokio::test]
async fn settings_build_a_facade() {
    let (url, seen) = mock_server(200, json!({"result": {"ok": true}})).await;
    let settings = Settings {
        url,
        key: Some("settings-key".to_string()),
        key_file: None,
        payload_key_file: None,
        database: Some("shop".to_string()),
        collection: Some("orders".to_string()),
        log_level: "debug".to_string(),
    };
    let aster = Aster::from_settings(&settings).await.unwrap();
    assert!(aster.is_http());
    aster
        .delete(None, None, &record(json!({"id": 1})))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].method, "DELETE");
    assert_eq!(seen[0].path, "/shop/orders/delete");
    assert_eq!(seen[0].authorization.as_deref(), Some("settings-key"));
}
