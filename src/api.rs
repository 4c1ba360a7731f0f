use crate::model::BookmarkWithTags;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(msg: &str) -> Self {
        StatusResponse {
            status: msg.to_owned(),
        }
    }

    pub fn success() -> Self {
        Self::new("success")
    }

    pub fn error() -> Self {
        Self::new("error")
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GridRecords {
    pub total: i64,
    pub records: Vec<BookmarkWithTags>,
}

#[derive(Debug, Deserialize)]
pub struct CaptureParams {
    pub title: Option<String>,
    pub url: Option<String>,
}
