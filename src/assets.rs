use axum::{
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Redirect, Response},
};
use rust_embed::Embed;

use crate::handler::AppState;

#[derive(Embed)]
#[folder = "assets"]
pub struct Assets;

/// Serves the grid UI compiled into the binary, relative to the
/// application root.
pub async fn serve_embedded(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(rest) = uri.path().strip_prefix(state.base_path.as_str()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    // the UI uses relative URLs, so the root must end with a slash
    if rest.is_empty() {
        return Redirect::permanent(&format!("{}/", state.base_path)).into_response();
    }
    let Some(path) = rest.strip_prefix('/') else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let path = if path.is_empty() || path.ends_with('/') {
        format!("{path}index.html")
    } else {
        path.to_string()
    };

    match Assets::get(&path) {
        Some(content) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref().to_string())], content.data.into_owned()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
