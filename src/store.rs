use anyhow::Result;
use libsql::{Connection, Value};

use crate::config::Driver;
use crate::model::{Bookmark, BookmarkChange, BookmarkTag, BookmarkWithTags, NewBookmark, Tag, format_timestamp};
use crate::tags::{plan_changes, split_tag_input};

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

const SQLITE_TAGS_JOIN: &str = r#"
LEFT JOIN (
    SELECT bt.bookmark_id, group_concat(bt.name, ' ') AS tags
    FROM (
        SELECT bookmark_tags.bookmark_id, tags.name
        FROM bookmark_tags
        JOIN tags ON bookmark_tags.tag_id = tags.id
        ORDER BY bookmark_tags.bookmark_id, bookmark_tags.display_order
    ) bt
    GROUP BY bt.bookmark_id
) t ON bookmarks.id = t.bookmark_id
"#;

fn tags_join(driver: Driver) -> &'static str {
    match driver {
        Driver::Sqlite | Driver::Libsql => SQLITE_TAGS_JOIN,
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn id_params(ids: &[i32]) -> Vec<Value> {
    ids.iter().map(|id| Value::from(*id)).collect()
}

/// Queries over the bookmarks, tags and bookmark_tags tables.
///
/// A `Store` does not open transactions itself; multi-statement operations are
/// wrapped by [`crate::db::Database`].
pub struct Store<'a> {
    conn: &'a Connection,
    driver: Driver,
}

impl<'a> Store<'a> {
    pub fn new(conn: &'a Connection, driver: Driver) -> Self {
        Self { conn, driver }
    }

    pub fn connection(&self) -> &Connection {
        self.conn
    }

    pub async fn count_bookmarks(&self) -> Result<i64> {
        let mut rows = self.conn.query("SELECT COUNT(*) FROM bookmarks", ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    pub async fn list_bookmarks(&self, offset: u32, limit: u32) -> Result<Vec<BookmarkWithTags>> {
        let query = format!(
            r#"
SELECT
    bookmarks.id,
    bookmarks.url,
    bookmarks.title,
    bookmarks.note,
    bookmarks.created_at,
    bookmarks.updated_at,
    t.tags
FROM bookmarks
{}
ORDER BY bookmarks.updated_at DESC, bookmarks.id DESC
LIMIT ? OFFSET ?
"#,
            tags_join(self.driver)
        );

        let mut rows = self
            .conn
            .query(&query, libsql::params![limit as i64, offset as i64])
            .await?;
        let mut records = Vec::new();

        while let Some(row) = rows.next().await? {
            let bookmark = Self::row_to_bookmark(&row)?;
            let tags: String = row.get::<Option<String>>(6)?.unwrap_or_default();
            records.push(BookmarkWithTags { bookmark, tags });
        }

        Ok(records)
    }

    pub async fn get_bookmark(&self, id: i32) -> Result<Option<Bookmark>> {
        let query = r#"
            SELECT id, url, title, note, created_at, updated_at
            FROM bookmarks WHERE id = ?
        "#;

        let mut rows = self.conn.query(query, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_bookmark(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn create_bookmark(&self, title: &str, url: &str, note: &str) -> Result<Bookmark> {
        self.insert_bookmark(title, url, note, None, None).await
    }

    async fn insert_bookmark(
        &self,
        title: &str,
        url: &str,
        note: &str,
        created_at: Option<String>,
        updated_at: Option<String>,
    ) -> Result<Bookmark> {
        let query = format!(
            r#"
            INSERT INTO bookmarks (url, title, note, created_at, updated_at)
            VALUES (?, ?, ?, COALESCE(?, {NOW}), COALESCE(?, {NOW}))
            RETURNING id, url, title, note, created_at, updated_at
        "#
        );

        let mut rows = self
            .conn
            .query(&query, libsql::params![url, title, note, created_at, updated_at])
            .await?;

        if let Some(row) = rows.next().await? {
            let bookmark = Self::row_to_bookmark(&row)?;
            tracing::debug!(id = bookmark.id, url = %bookmark.url, "inserted bookmark");
            Ok(bookmark)
        } else {
            anyhow::bail!("Failed to create bookmark")
        }
    }

    /// Writes the scalar fields back and bumps `updated_at`.
    pub async fn update_bookmark(&self, bookmark: &Bookmark) -> Result<()> {
        let query = format!("UPDATE bookmarks SET url = ?, title = ?, note = ?, updated_at = {NOW} WHERE id = ?");
        self.conn
            .execute(
                &query,
                libsql::params![
                    bookmark.url.as_str(),
                    bookmark.title.as_str(),
                    bookmark.note.as_str(),
                    bookmark.id
                ],
            )
            .await?;
        tracing::debug!(id = bookmark.id, "updated bookmark");
        Ok(())
    }

    /// Deletes bookmarks together with their join rows and any tag that is no
    /// longer referenced afterwards. Returns the number of bookmarks deleted.
    pub async fn delete_bookmarks(&self, ids: &[i32]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let marks = placeholders(ids.len());

        let mut rows = self
            .conn
            .query(
                &format!("SELECT DISTINCT tag_id FROM bookmark_tags WHERE bookmark_id IN ({marks})"),
                id_params(ids),
            )
            .await?;
        let mut tag_ids = Vec::new();
        while let Some(row) = rows.next().await? {
            tag_ids.push(row.get::<i32>(0)?);
        }

        self.conn
            .execute(
                &format!("DELETE FROM bookmark_tags WHERE bookmark_id IN ({marks})"),
                id_params(ids),
            )
            .await?;
        let deleted = self
            .conn
            .execute(&format!("DELETE FROM bookmarks WHERE id IN ({marks})"), id_params(ids))
            .await?;
        let pruned = self.prune_tags(&tag_ids).await?;

        tracing::debug!(deleted, pruned, "deleted bookmarks");
        Ok(deleted)
    }

    /// Applies one grid row. A missing bookmark is created when the row
    /// carries any field.
    pub async fn apply_change(&self, change: &BookmarkChange) -> Result<()> {
        let existing = self.get_bookmark(change.id).await?;
        let found = existing.is_some();
        let mut bookmark = existing.unwrap_or_default();

        let mut dirty = false;
        dirty |= assign_if_changed(&mut bookmark.title, &change.title);
        dirty |= assign_if_changed(&mut bookmark.url, &change.url);
        dirty |= assign_if_changed(&mut bookmark.note, &change.note);

        if !found {
            if change.is_empty() {
                tracing::warn!(id = change.id, "skipping empty change for unknown bookmark");
                return Ok(());
            }
            // join rows need the new id
            bookmark = self
                .create_bookmark(&bookmark.title, &bookmark.url, &bookmark.note)
                .await?;
        }

        if let Some(tags) = &change.tags {
            dirty |= self.replace_tags(bookmark.id, &split_tag_input(tags)).await?;
        }

        if dirty && found {
            self.update_bookmark(&bookmark).await?;
        }

        Ok(())
    }

    /// Inserts an imported bookmark and its tags, keeping the timestamps from
    /// the export file.
    pub async fn import_bookmark(&self, input: &NewBookmark) -> Result<Bookmark> {
        let created_at = format_timestamp(&input.created_at);
        let updated_at = format_timestamp(&input.updated_at);

        let bookmark = self
            .insert_bookmark(
                &input.title,
                &input.url,
                &input.note,
                Some(created_at.clone()),
                Some(updated_at.clone()),
            )
            .await?;

        let tag_ids = self.resolve_tags(&input.tags, Some(&created_at)).await?;
        for (order, tag_id) in tag_ids.iter().enumerate() {
            self.insert_bookmark_tag(bookmark.id, *tag_id, order as i32, Some(created_at.clone()))
                .await?;
        }

        Ok(bookmark)
    }

    fn row_to_bookmark(row: &libsql::Row) -> Result<Bookmark> {
        Ok(Bookmark {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            note: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    pub async fn find_tags_by_names(&self, names: &[String]) -> Result<Vec<Tag>> {
        if names.is_empty() {
            return Ok(vec![]);
        }

        let query = format!(
            "SELECT id, name, created_at, updated_at FROM tags WHERE name IN ({})",
            placeholders(names.len())
        );
        let params: Vec<Value> = names.iter().map(|n| Value::from(n.clone())).collect();

        let mut rows = self.conn.query(&query, params).await?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next().await? {
            tags.push(Self::row_to_tag(&row)?);
        }
        Ok(tags)
    }

    pub async fn create_tag(&self, name: &str, timestamp: Option<&str>) -> Result<Tag> {
        let query = format!(
            r#"
            INSERT INTO tags (name, created_at, updated_at)
            VALUES (?, COALESCE(?, {NOW}), COALESCE(?, {NOW}))
            RETURNING id, name, created_at, updated_at
        "#
        );

        let mut rows = self
            .conn
            .query(&query, libsql::params![name, timestamp, timestamp])
            .await?;

        if let Some(row) = rows.next().await? {
            let tag = Self::row_to_tag(&row)?;
            tracing::debug!(id = tag.id, name = %tag.name, "created tag");
            Ok(tag)
        } else {
            anyhow::bail!("Failed to create tag: {}", name)
        }
    }

    /// Returns the tag ids for `names` in the same order, creating tags that
    /// do not exist yet.
    pub async fn resolve_tags(&self, names: &[String], timestamp: Option<&str>) -> Result<Vec<i32>> {
        let found = self.find_tags_by_names(names).await?;
        let mut ids = Vec::with_capacity(names.len());

        for name in names {
            let id = match found.iter().find(|t| &t.name == name) {
                Some(tag) => tag.id,
                None => self.create_tag(name, timestamp).await?.id,
            };
            ids.push(id);
        }

        Ok(ids)
    }

    /// Deletes those of `tag_ids` that no join row references any more.
    pub async fn prune_tags(&self, tag_ids: &[i32]) -> Result<u64> {
        if tag_ids.is_empty() {
            return Ok(0);
        }

        let query = format!(
            r#"
            DELETE FROM tags
            WHERE id IN ({})
              AND NOT EXISTS (SELECT 1 FROM bookmark_tags WHERE bookmark_tags.tag_id = tags.id)
        "#,
            placeholders(tag_ids.len())
        );
        Ok(self.conn.execute(&query, id_params(tag_ids)).await?)
    }

    fn row_to_tag(row: &libsql::Row) -> Result<Tag> {
        Ok(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }

    pub async fn list_bookmark_tags(&self, bookmark_id: i32) -> Result<Vec<BookmarkTag>> {
        let query = r#"
            SELECT id, bookmark_id, tag_id, display_order, created_at, updated_at
            FROM bookmark_tags
            WHERE bookmark_id = ?
            ORDER BY display_order
        "#;

        let mut rows = self.conn.query(query, libsql::params![bookmark_id]).await?;
        let mut bookmark_tags = Vec::new();
        while let Some(row) = rows.next().await? {
            bookmark_tags.push(BookmarkTag {
                id: row.get(0)?,
                bookmark_id: row.get(1)?,
                tag_id: row.get(2)?,
                display_order: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            });
        }
        Ok(bookmark_tags)
    }

    async fn insert_bookmark_tag(
        &self,
        bookmark_id: i32,
        tag_id: i32,
        display_order: i32,
        timestamp: Option<String>,
    ) -> Result<()> {
        let query = format!(
            r#"
            INSERT INTO bookmark_tags (bookmark_id, tag_id, display_order, created_at, updated_at)
            VALUES (?, ?, ?, COALESCE(?, {NOW}), COALESCE(?, {NOW}))
        "#
        );
        self.conn
            .execute(
                &query,
                libsql::params![bookmark_id, tag_id, display_order, timestamp.clone(), timestamp],
            )
            .await?;
        Ok(())
    }

    /// Makes the bookmark's join rows match `names` exactly, in order.
    /// Returns whether anything changed.
    pub async fn replace_tags(&self, bookmark_id: i32, names: &[String]) -> Result<bool> {
        let tag_ids = self.resolve_tags(names, None).await?;
        let existing = self.list_bookmark_tags(bookmark_id).await?;
        let changes = plan_changes(&existing, &tag_ids);

        if changes.is_empty() {
            return Ok(false);
        }

        if !changes.remove.is_empty() {
            let query = format!(
                "DELETE FROM bookmark_tags WHERE bookmark_id = ? AND tag_id IN ({})",
                placeholders(changes.remove.len())
            );
            let mut params = vec![Value::from(bookmark_id)];
            params.extend(id_params(&changes.remove));
            self.conn.execute(&query, params).await?;
            self.prune_tags(&changes.remove).await?;
        }

        for (id, display_order) in &changes.reorder {
            let query = format!("UPDATE bookmark_tags SET display_order = ?, updated_at = {NOW} WHERE id = ?");
            self.conn
                .execute(&query, libsql::params![*display_order, *id])
                .await?;
        }

        for (tag_id, display_order) in &changes.insert {
            self.insert_bookmark_tag(bookmark_id, *tag_id, *display_order, None)
                .await?;
        }

        tracing::debug!(
            bookmark_id,
            removed = changes.remove.len(),
            reordered = changes.reorder.len(),
            inserted = changes.insert.len(),
            "replaced bookmark tags"
        );
        Ok(true)
    }
}

fn assign_if_changed(field: &mut String, value: &Option<String>) -> bool {
    match value {
        Some(v) if v.as_str() != field.as_str() => {
            *field = v.clone();
            true
        }
        _ => false,
    }
}
