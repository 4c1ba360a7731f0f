//! Reader for browser bookmark exports (the Netscape `<DL>`/`<DT>`/`<DD>`
//! format written by delicious, Pinboard and most browsers).

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use crate::error::ImportError;
use crate::model::NewBookmark;
use crate::tags::split_comma_separated;

/// Parses an export document into bookmarks, in document order.
///
/// A `<dd>` is taken as the note of the anchor right before it; a `<dd>`
/// that follows anything else (folder descriptions) is skipped.
pub fn parse_bookmarks(html: &str) -> Result<Vec<NewBookmark>, ImportError> {
    static ENTRY_SELECTOR: OnceLock<Selector> = OnceLock::new();
    let entries = ENTRY_SELECTOR.get_or_init(|| Selector::parse("dt, dd").expect("entry selector is valid"));

    let document = Html::parse_document(html);
    let mut bookmarks = Vec::new();
    let mut pending = false;

    // Folder <dt>s hold an <h3>, and their <dl> nests inside them or inside
    // the folder's <dd>; preorder visits the folder before its children.
    for element in document.select(entries) {
        match element.value().name() {
            "dt" => match own_anchor(element) {
                Some(anchor) => {
                    bookmarks.push(parse_anchor(anchor)?);
                    pending = true;
                }
                None => pending = false,
            },
            "dd" => {
                if pending {
                    if let Some(last) = bookmarks.last_mut() {
                        last.note = element_text(element);
                    }
                }
                pending = false;
            }
            _ => pending = false,
        }
    }

    Ok(bookmarks)
}

fn own_anchor(dt: ElementRef<'_>) -> Option<ElementRef<'_>> {
    dt.children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "a")
}

fn parse_anchor(anchor: ElementRef<'_>) -> Result<NewBookmark, ImportError> {
    let title = element_text(anchor);
    let attr = |attribute: &'static str| {
        anchor
            .value()
            .attr(attribute)
            .ok_or_else(|| ImportError::MissingAttribute {
                attribute,
                title: title.clone(),
            })
    };

    let url = attr("href")?.to_string();
    let tags = split_comma_separated(attr("tags")?);
    let created_at = parse_unix_timestamp(attr("add_date")?).ok_or_else(|| ImportError::InvalidTimestamp {
        value: anchor.value().attr("add_date").unwrap_or_default().to_string(),
        title: title.clone(),
    })?;
    let updated_at = anchor
        .value()
        .attr("last_modified")
        .and_then(parse_unix_timestamp)
        .unwrap_or(created_at);

    Ok(NewBookmark {
        url,
        title,
        note: String::new(),
        tags,
        created_at,
        updated_at,
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn parse_unix_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let secs = value.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp(secs, 0)
}
