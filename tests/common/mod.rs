use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use sea_orm::{Database, DatabaseConnection, DbErr};
use tower::ServiceExt;

use shopkit::cache::Cache;
use shopkit::state::AppState;
use shopkit::{routes, schema};

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    schema::create_tables(&db).await?;
    Ok(db)
}

/// App with caching disabled, the default for most tests.
pub fn setup_app(db: DatabaseConnection) -> Router {
    routes::router(AppState::new(db, Cache::disabled(), 5))
}

/// App backed by the in-process cache, for read-through and invalidation
/// tests.
#[allow(dead_code)]
pub fn setup_cached_app(db: DatabaseConnection) -> Router {
    routes::router(AppState::new(db, Cache::in_memory(), 5))
}

/// Send a request with an optional JSON body and decode the envelope.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Send a raw (possibly malformed) body.
#[allow(dead_code)]
pub async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: &str,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Create a user and return the `data` payload of the envelope.
pub async fn create_user(app: &Router, body: serde_json::Value) -> serde_json::Value {
    let (status, envelope) = send(app, "POST", "/users", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {envelope}");
    envelope["data"].clone()
}

/// List users with an optional JSON query spec plus extra query-string
/// parameters, asserting success and returning the whole envelope.
#[allow(dead_code)]
pub async fn list_users(app: &Router, query: Option<&str>, extra: &str) -> serde_json::Value {
    let mut uri = String::from("/users");
    let mut sep = '?';
    if let Some(query) = query {
        uri.push(sep);
        uri.push_str("query=");
        uri.push_str(&url_escape::encode_component(query));
        sep = '&';
    }
    if !extra.is_empty() {
        uri.push(sep);
        uri.push_str(extra);
    }

    let (status, envelope) = send(app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK, "list failed: {envelope}");
    envelope
}
