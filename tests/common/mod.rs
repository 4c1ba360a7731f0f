#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use mybookmarks::config::DatabaseConfig;
use mybookmarks::db::Database;
use mybookmarks::handler::AppState;
use serde_json::Value;
use tower::ServiceExt;

pub async fn test_db() -> Arc<Database> {
    let db = Database::connect(&DatabaseConfig::in_memory())
        .await
        .expect("in-memory database");
    db.migrate().await.expect("migrations");
    Arc::new(db)
}

async fn string_column(db: &Database, query: &str, params: impl libsql::params::IntoParams) -> Vec<String> {
    let store = db.store().await;
    let mut rows = store.connection().query(query, params).await.expect("query");
    let mut values = Vec::new();
    while let Some(row) = rows.next().await.expect("row") {
        values.push(row.get(0).expect("column"));
    }
    values
}

/// Every tag name, alphabetically.
pub async fn all_tags(db: &Database) -> Vec<String> {
    string_column(db, "SELECT name FROM tags ORDER BY name", ()).await
}

/// Tag names of one bookmark in display order.
pub async fn bookmark_tags(db: &Database, bookmark_id: i32) -> Vec<String> {
    let query = r#"
        SELECT tags.name
        FROM bookmark_tags
        JOIN tags ON tags.id = bookmark_tags.tag_id
        WHERE bookmark_tags.bookmark_id = ?
        ORDER BY bookmark_tags.display_order
    "#;
    string_column(db, query, libsql::params![bookmark_id]).await
}

pub fn test_app(db: Arc<Database>, base_path: &str) -> Router {
    mybookmarks::app(AppState {
        db,
        base_path: base_path.to_string(),
    })
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

async fn send(app: &Router, req: Request<Body>) -> TestResponse {
    let res = app.clone().oneshot(req).await.expect("request");
    let status = res.status();
    let content_type = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec();
    TestResponse {
        status,
        content_type,
        body,
    }
}

pub async fn post_form(app: &Router, uri: &str, body: &str) -> TestResponse {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request");
    send(app, req).await
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    let req = Request::builder().uri(uri).body(Body::empty()).expect("request");
    send(app, req).await
}
