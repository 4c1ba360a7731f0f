//! Tag name parsing and join-row diffing.
//!
//! Nothing in here touches the database: the store resolves names to tag ids,
//! asks [`plan_changes`] what to do with the bookmark's existing join rows and
//! then executes the plan.

use crate::model::BookmarkTag;

/// Splits a comma separated tag list, as found in export files.
pub fn split_comma_separated(s: &str) -> Vec<String> {
    unique_names(s.split(','))
}

/// Splits a tag list typed into the grid, where commas and spaces both separate.
pub fn split_tag_input(s: &str) -> Vec<String> {
    unique_names(s.split(|c: char| c == ',' || c.is_whitespace()))
}

fn unique_names<'a>(parts: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for part in parts.map(str::trim).filter(|p| !p.is_empty()) {
        if !names.iter().any(|n| n == part) {
            names.push(part.to_string());
        }
    }
    names
}

#[derive(Debug, Default, PartialEq)]
pub struct TagChanges {
    /// Tag ids whose join rows must go.
    pub remove: Vec<i32>,
    /// `(join row id, new display order)` for rows that stay but moved.
    pub reorder: Vec<(i32, i32)>,
    /// `(tag id, display order)` for rows to insert.
    pub insert: Vec<(i32, i32)>,
}

impl TagChanges {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.reorder.is_empty() && self.insert.is_empty()
    }
}

/// Computes the join-row operations that turn `existing` into exactly
/// `desired`, where the position in `desired` is the display order.
pub fn plan_changes(existing: &[BookmarkTag], desired: &[i32]) -> TagChanges {
    let mut changes = TagChanges::default();

    for row in existing {
        if !desired.contains(&row.tag_id) {
            changes.remove.push(row.tag_id);
        }
    }

    for (order, tag_id) in desired.iter().enumerate() {
        let order = order as i32;
        match existing.iter().find(|row| row.tag_id == *tag_id) {
            Some(row) if row.display_order != order => changes.reorder.push((row.id, order)),
            Some(_) => {}
            None => changes.insert.push((*tag_id, order)),
        }
    }

    changes
}
