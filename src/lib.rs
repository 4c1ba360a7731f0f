use axum::{
    Router,
    routing::{get, post},
};

use crate::assets::serve_embedded;
use crate::handler::{AppState, bookmark_form, create_bookmark, healthcheck};

pub mod api;
pub mod assets;
pub mod config;
pub mod db;
pub mod error;
pub mod grid;
pub mod handler;
pub mod importer;
pub mod model;
pub mod store;
pub mod tags;

/// Builds the application router. Every route, including the embedded UI,
/// lives under `state.base_path`.
pub fn app(state: AppState) -> Router {
    let base = state.base_path.clone();

    Router::new()
        .route(&format!("{base}/healthz"), get(healthcheck))
        .route(&format!("{base}/bookmark-form"), get(bookmark_form))
        .route(&format!("{base}/api/bookmarks"), post(create_bookmark))
        .nest(&format!("{base}/api/grid"), grid::routes())
        .fallback(serve_embedded)
        .with_state(state)
}
