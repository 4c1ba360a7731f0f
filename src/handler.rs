use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use tracing::info;

use crate::api::{CaptureParams, StatusResponse};
use crate::db::Database;
use crate::error::HandlerError;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    /// Application root, e.g. `/mybookmarks`, or empty.
    pub base_path: String,
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(StatusResponse::new("ok"))
}

/// Stores a bookmark captured by the bookmarklet.
pub async fn create_bookmark(
    State(state): State<AppState>,
    Form(params): Form<CaptureParams>,
) -> Result<Response, HandlerError> {
    let title = params.title.ok_or_else(|| HandlerError::MissingParam("title".to_string()))?;
    let url = params.url.ok_or_else(|| HandlerError::MissingParam("url".to_string()))?;

    let id = state.db.create_bookmark(&title, &url).await?;
    tracing::info!(id, %title, %url, "captured bookmark");

    Ok((StatusCode::OK, Json(StatusResponse::success())).into_response())
}

/// Renders a page that immediately posts `title` and `url` to the capture
/// endpoint. The bookmarklet opens it in an iframe.
pub async fn bookmark_form(State(state): State<AppState>, Query(params): Query<CaptureParams>) -> Html<String> {
    let action = format!("{}/api/bookmarks", state.base_path);
    Html(render_bookmark_form(
        &action,
        params.title.as_deref().unwrap_or_default(),
        params.url.as_deref().unwrap_or_default(),
    ))
}

fn render_bookmark_form(action: &str, title: &str, url: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
    <body onload="document.getElementById('myBookmarkForm').submit()">
        <form action="{}" method="POST" id="myBookmarkForm">
            <input type="hidden" name="title" value="{}">
            <input type="hidden" name="url" value="{}">
        </form>
    </body>
</html>
"#,
        escape_html(action),
        escape_html(title),
        escape_html(url)
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
