use serde_json::Value;
use std::sync::{Arc, Mutex};
use warp::Filter;
use warp::http::{Method, StatusCode};
use warp::path::FullPath;

#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

pub type SeenLog = Arc<Mutex<Vec<Seen>>>;

/// Stands in for an AsterDB server: answers every request with `status` and `reply`.
pub async fn mock_server(status: u16, reply: Value) -> (String, SeenLog) {
    let seen: SeenLog = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let route = warp::method()
        .and(warp::path::full())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::json())
        .map(
            move |method: Method, path: FullPath, authorization: Option<String>, body: Value| {
                log.lock().unwrap().push(Seen {
                    method: method.to_string(),
                    path: path.as_str().to_string(),
                    authorization,
                    body,
                });
                warp::reply::with_status(
                    warp::reply::json(&reply),
                    StatusCode::from_u16(status).unwrap(),
                )
            },
        );
    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (format!("http://{}", addr), seen)
}

pub fn record(value: Value) -> aster_db::Record {
    value.as_object().cloned().unwrap()
}
