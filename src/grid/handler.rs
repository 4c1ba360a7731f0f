use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::{GridCommand, GridForm};
use crate::api::{GridRecords, StatusResponse};
use crate::error::HandlerError;
use crate::handler::AppState;

fn success() -> Response {
    (StatusCode::OK, Json(StatusResponse::success())).into_response()
}

pub async fn grid_bookmarks(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, HandlerError> {
    let form = GridForm::new(pairs);

    match form.command()? {
        GridCommand::GetRecords => {
            let page = form.page()?;
            let (total, records) = state.db.bookmark_page(page.offset, page.limit).await?;
            tracing::debug!(total, returned = records.len(), offset = page.offset, "got records");

            Ok((StatusCode::OK, Json(GridRecords { total, records })).into_response())
        }
        GridCommand::SaveRecords => {
            let changes = form.changes()?;
            state.db.save_changes(&changes).await?;
            tracing::info!(rows = changes.len(), "saved records");

            Ok(success())
        }
        GridCommand::DeleteRecords => {
            let ids = form.selected_ids()?;
            if !ids.is_empty() {
                let deleted = state.db.delete_bookmarks(&ids).await?;
                tracing::info!(requested = ids.len(), deleted, "deleted records");
            }

            Ok(success())
        }
    }
}
