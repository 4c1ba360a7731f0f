use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::StatusResponse;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
    #[error("unsupported sql driver: {0}")]
    UnsupportedDriver(String),
    #[error("invalid port: {0}")]
    InvalidPort(String),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("no {attribute} in {title}")]
    MissingAttribute { attribute: &'static str, title: String },
    #[error("invalid add_date {value:?} in {title}")]
    InvalidTimestamp { value: String, title: String },
}

/// Errors surfaced by HTTP handlers. Validation problems become 400s,
/// everything coming out of the database becomes a 500.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("missing parameter: {0}")]
    MissingParam(String),
    #[error("invalid parameter {name}: {value:?}")]
    InvalidParam { name: String, value: String },
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("database error: {0:#}")]
    Database(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HandlerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "rejected request");
        }
        (status, Json(StatusResponse::error())).into_response()
    }
}
