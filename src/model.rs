use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i32,
    pub url: String,
    pub title: String,
    pub note: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkWithTags {
    #[serde(flatten)]
    pub bookmark: Bookmark,
    pub tags: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkTag {
    pub id: i32,
    pub bookmark_id: i32,
    pub tag_id: i32,
    pub display_order: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// One row of a grid `save-records` request. `None` means the column was not
/// part of the change set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookmarkChange {
    pub id: i32,
    pub title: Option<String>,
    pub url: Option<String>,
    pub note: Option<String>,
    pub tags: Option<String>,
}

impl BookmarkChange {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none() && self.note.is_none() && self.tags.is_none()
    }
}

/// A bookmark read from an export file, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBookmark {
    pub url: String,
    pub title: String,
    pub note: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Formats a timestamp the way SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ')` does,
/// so values written from Rust sort together with values written by SQL.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_matches_sqlite() {
        let ts = DateTime::from_timestamp(1_300_000_000, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2011-03-13T07:06:40.000Z");
    }

    #[test]
    fn test_bookmark_with_tags_serializes_flat() {
        let record = BookmarkWithTags {
            bookmark: Bookmark {
                id: 3,
                url: "https://example.com".to_string(),
                title: "Example".to_string(),
                ..Default::default()
            },
            tags: "rust web".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["url"], "https://example.com");
        assert_eq!(value["tags"], "rust web");
    }
}
