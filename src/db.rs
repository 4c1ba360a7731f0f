use std::ops::Deref;

use crate::config::{DatabaseConfig, Driver};
use crate::model::{BookmarkChange, BookmarkWithTags, NewBookmark};
use crate::store::Store;
use anyhow::Result;
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use tokio::sync::{Mutex, MutexGuard};

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

const MIGRATIONS: &[(&str, &str)] = &[
    ("001_schema.sql", include_str!("migrations/001_schema.sql")),
    ("002_unique_indexes.sql", include_str!("migrations/002_unique_indexes.sql")),
];

pub struct Database {
    _db: LibsqlDatabase,
    conn: Connection,
    /// Every use of `conn` holds this, so no statement can slip into another
    /// request's open transaction.
    conn_lock: Mutex<()>,
    driver: Driver,
}

/// A [`Store`] that holds the connection lock for as long as it lives.
pub struct StoreGuard<'a> {
    store: Store<'a>,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> Deref for StoreGuard<'a> {
    type Target = Store<'a>;

    fn deref(&self) -> &Store<'a> {
        &self.store
    }
}

impl Database {
    /// Opens the configured database. Does not touch the schema; see
    /// [`Database::migrate`].
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self> {
        let driver = cfg.driver()?;

        let db = match driver {
            Driver::Sqlite => {
                tracing::info!(path = cfg.data_source(), "[db] opening local database");
                Builder::new_local(cfg.data_source()).build().await?
            }
            Driver::Libsql => {
                tracing::info!(url = cfg.data_source(), "[db] connecting to remote database");
                let token = cfg.auth_token.clone().unwrap_or_default();
                Builder::new_remote(cfg.data_source().to_string(), token)
                    .build()
                    .await?
            }
        };

        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;

        if driver == Driver::Sqlite {
            // PRAGMA returns a row, so it has to go through query()
            conn.query("PRAGMA foreign_keys = ON", ()).await?;
        }

        Ok(Database {
            _db: db,
            conn,
            conn_lock: Mutex::new(()),
            driver,
        })
    }

    /// Waits for the connection and returns a store bound to it. Statements
    /// run outside any transaction.
    pub async fn store(&self) -> StoreGuard<'_> {
        let guard = self.conn_lock.lock().await;
        StoreGuard {
            store: Store::new(&self.conn, self.driver),
            _guard: guard,
        }
    }

    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn record_migration(conn: &Connection, name: &str) -> Result<()> {
        let query = r#"
            INSERT INTO _migrations (name, applied_at)
            VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        "#;
        conn.execute(query, libsql::params![name]).await?;
        Ok(())
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<bool> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(false);
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        Self::record_migration(conn, name).await?;
        Ok(true)
    }

    /// Creates the tables and unique indexes. Returns the names of the
    /// migrations applied by this call.
    pub async fn migrate(&self) -> Result<Vec<&'static str>> {
        let _guard = self.conn_lock.lock().await;

        let mut applied = Vec::new();
        for (filename, sql) in SYSTEM_MIGRATIONS.iter().chain(MIGRATIONS) {
            if Self::run_migration(&self.conn, filename, sql).await? {
                applied.push(*filename);
            }
        }
        Ok(applied)
    }

    pub async fn count_bookmarks(&self) -> Result<i64> {
        self.store().await.count_bookmarks().await
    }

    /// Total bookmark count and one page of records, read under a single lock.
    pub async fn bookmark_page(&self, offset: u32, limit: u32) -> Result<(i64, Vec<BookmarkWithTags>)> {
        let store = self.store().await;
        let total = store.count_bookmarks().await?;
        let records = store.list_bookmarks(offset, limit).await?;
        Ok((total, records))
    }

    pub async fn create_bookmark(&self, title: &str, url: &str) -> Result<i32> {
        Ok(self.store().await.create_bookmark(title, url, "").await?.id)
    }

    /// Applies a batch of grid changes atomically. The transaction rolls back
    /// when dropped uncommitted, on error or when the request is cancelled.
    pub async fn save_changes(&self, changes: &[BookmarkChange]) -> Result<()> {
        let _guard = self.conn_lock.lock().await;

        let tx = self.conn.transaction().await?;
        let store = Store::new(&tx, self.driver);
        for change in changes {
            store.apply_change(change).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_bookmarks(&self, ids: &[i32]) -> Result<u64> {
        let _guard = self.conn_lock.lock().await;

        let tx = self.conn.transaction().await?;
        let deleted = Store::new(&tx, self.driver).delete_bookmarks(ids).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    /// Writes imported bookmarks oldest first, all or nothing.
    pub async fn import_bookmarks(&self, bookmarks: &[NewBookmark]) -> Result<usize> {
        let _guard = self.conn_lock.lock().await;

        let tx = self.conn.transaction().await?;
        let store = Store::new(&tx, self.driver);
        for bookmark in bookmarks.iter().rev() {
            store.import_bookmark(bookmark).await?;
        }
        tx.commit().await?;
        Ok(bookmarks.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    async fn test_db() -> Database {
        let db = Database::connect(&DatabaseConfig::in_memory()).await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    async fn fail_on_tag(db: &Database, name: &str) {
        let sql = format!(
            "CREATE TRIGGER fail_on_{name} BEFORE INSERT ON tags WHEN NEW.name = '{name}' BEGIN SELECT RAISE(ABORT, 'boom'); END"
        );
        db.store().await.connection().execute(&sql, ()).await.unwrap();
    }

    async fn tag_count(db: &Database) -> i64 {
        let store = db.store().await;
        let mut rows = store.connection().query("SELECT COUNT(*) FROM tags", ()).await.unwrap();
        rows.next().await.unwrap().unwrap().get(0).unwrap()
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Database::connect(&DatabaseConfig::in_memory()).await.unwrap();
        let first = db.migrate().await.unwrap();
        assert_eq!(first.len(), 3);
        let second = db.migrate().await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_unique_tag_name() {
        let db = test_db().await;
        let store = db.store().await;
        store.create_tag("rust", None).await.unwrap();
        assert!(store.create_tag("rust", None).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back() {
        let db = test_db().await;
        let id = db.create_bookmark("Example", "https://example.com").await.unwrap();
        fail_on_tag(&db, "x").await;

        let changes = vec![
            BookmarkChange {
                id,
                title: Some("Changed".to_string()),
                ..Default::default()
            },
            BookmarkChange {
                id,
                tags: Some("ok x".to_string()),
                ..Default::default()
            },
        ];
        assert!(db.save_changes(&changes).await.is_err());

        let bookmark = db.store().await.get_bookmark(id).await.unwrap().unwrap();
        assert_eq!(bookmark.title, "Example");
        assert_eq!(tag_count(&db).await, 0);

        // the connection is usable again
        db.save_changes(&[BookmarkChange {
            id,
            tags: Some("ok".to_string()),
            ..Default::default()
        }])
        .await
        .unwrap();
        assert_eq!(tag_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_abandoned_transaction_rolls_back() {
        let db = test_db().await;
        {
            let _guard = db.conn_lock.lock().await;
            let tx = db.conn.transaction().await.unwrap();
            Store::new(&tx, db.driver).create_tag("half-done", None).await.unwrap();
        }

        assert_eq!(tag_count(&db).await, 0);
        db.create_bookmark("After", "https://after.example").await.unwrap();
        assert_eq!(db.count_bookmarks().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failed_batch_keeps_concurrent_captures() {
        let db = Arc::new(test_db().await);
        let id = db.create_bookmark("Target", "https://target.example").await.unwrap();
        fail_on_tag(&db, "x").await;

        let writer = {
            let db = db.clone();
            tokio::spawn(async move {
                let mut captured = 0;
                for i in 0..200 {
                    db.create_bookmark("Captured", &format!("https://{i}.example")).await.unwrap();
                    captured += 1;
                    tokio::task::yield_now().await;
                }
                captured
            })
        };

        let failing = [BookmarkChange {
            id,
            tags: Some("a b c x".to_string()),
            ..Default::default()
        }];
        for _ in 0..50 {
            assert!(db.save_changes(&failing).await.is_err());
            tokio::task::yield_now().await;
        }

        let captured = writer.await.unwrap();
        assert_eq!(db.count_bookmarks().await.unwrap(), captured + 1);
        assert_eq!(tag_count(&db).await, 0);
    }
}
