mod types;

use std::path::Path;

use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow},
    Executor, Row, Sqlite,
};
use teloxide::types::UserId;

pub use types::*;

type Pool = sqlx::Pool<Sqlite>;

pub struct Database {
    pool: Pool,
}

impl Database {
    /// Open the database at this path, creating it and its tables if they don't exist yet.
    pub async fn new(path: impl AsRef<Path>) -> Result<Database, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(32)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(path.as_ref())
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .pragma("cache_size", "-32768")
                    .busy_timeout(std::time::Duration::from_secs(600)),
            )
            .await?;

        // URLS:
        // unique_id (unique primary key, string, what goes into the deep link)
        // original_url (string)
        // created_at (date+time in UTC)
        // click_count (how many times the deep link was opened)
        // user_id (i64 because sqlite doesn't support u64; who made it)
        // user_name (who made it, but readable)
        pool.execute(sqlx::query(
            "CREATE TABLE IF NOT EXISTS urls (
                unique_id TEXT PRIMARY KEY NOT NULL,
                original_url TEXT NOT NULL,
                created_at TEXT NOT NULL,
                click_count INTEGER NOT NULL DEFAULT 0,
                user_id INTEGER NULL,
                user_name TEXT NULL
            ) STRICT;",
        ))
        .await?;

        // For the top links in stats.
        pool.execute(sqlx::query(
            "CREATE INDEX IF NOT EXISTS urls_click_count ON urls(click_count DESC);",
        ))
        .await?;

        log::info!("Database initialized at {}", path.as_ref().display());

        Ok(Database { pool })
    }

    /// Store a new link.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateIdentifier`] if there already is a link with this ID, in
    /// which case nothing is changed.
    #[allow(clippy::cast_possible_wrap)]
    pub async fn create(
        &self,
        id: &str,
        destination_url: &str,
        submitter_id: UserId,
        submitter_label: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO urls(unique_id, original_url, created_at, user_id, user_name)
            VALUES (?, ?, ?, ?, ?);",
        )
        .bind(id)
        .bind(destination_url)
        .bind(Utc::now())
        .bind(submitter_id.0 as i64)
        .bind(submitter_label)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                log::debug!("Stored link {id} -> {destination_url}");
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateIdentifier(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get the URL behind this ID, counting it as a click.
    /// Returns [`None`] and changes nothing if there's no such link.
    pub async fn lookup(&self, id: &str) -> Result<Option<String>, StoreError> {
        // One statement, so concurrent lookups can't lose a click.
        let url = sqlx::query(
            "UPDATE urls SET click_count = click_count + 1
            WHERE unique_id=?
            RETURNING original_url;",
        )
        .bind(id)
        .map(|row: SqliteRow| row.get::<String, _>("original_url"))
        .fetch_optional(&self.pool)
        .await?;
        Ok(url)
    }

    /// Get the full record of this link, without counting it as a click.
    pub async fn get(&self, id: &str) -> Result<Option<LinkRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT unique_id, original_url, created_at, click_count, user_id, user_name
            FROM urls WHERE unique_id=?;",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(LinkRecord::from_sqlite_row).transpose()?)
    }

    /// Count links and clicks, and list the most clicked links.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    pub async fn stats(&self) -> Result<LinkStats, StoreError> {
        let (total_records, total_clicks): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(click_count), 0) FROM urls;")
                .fetch_one(&self.pool)
                .await?;

        // Ties are broken by insertion order.
        let top = sqlx::query(
            "SELECT original_url, click_count FROM urls
            ORDER BY click_count DESC, rowid ASC
            LIMIT ?;",
        )
        .bind(TOP_LINKS as i64)
        .map(|row: SqliteRow| TopLink {
            destination_url: row.get("original_url"),
            click_count: row.get::<i64, _>("click_count") as u64,
        })
        .fetch_all(&self.pool)
        .await?;

        Ok(LinkStats {
            total_records: total_records as u64,
            total_clicks: total_clicks as u64,
            top,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;

    const ADMIN: UserId = UserId(1366743555);

    async fn temp_database() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::new(dir.path().join("links.sqlite")).await.unwrap();
        (dir, database)
    }

    #[tokio::test]
    async fn create_then_lookup() {
        let (_dir, db) = temp_database().await;
        db.create("abc", "https://example.com/a", ADMIN, "Admin (@admin)")
            .await
            .unwrap();

        let record = db.get("abc").await.unwrap().unwrap();
        assert_eq!(record.destination_url, "https://example.com/a");
        assert_eq!(record.click_count, 0);
        assert_eq!(record.submitter_id, Some(ADMIN));
        assert_eq!(record.submitter_label.as_deref(), Some("Admin (@admin)"));

        assert_eq!(
            db.lookup("abc").await.unwrap().as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(
            db.lookup("abc").await.unwrap().as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(db.get("abc").await.unwrap().unwrap().click_count, 2);
    }

    #[tokio::test]
    async fn duplicate_does_not_overwrite() {
        let (_dir, db) = temp_database().await;
        db.create("abc", "https://example.com/a", ADMIN, "Admin")
            .await
            .unwrap();
        db.lookup("abc").await.unwrap();

        let result = db.create("abc", "https://example.com/b", ADMIN, "Admin").await;
        assert!(matches!(result, Err(StoreError::DuplicateIdentifier(id)) if id == "abc"));

        let record = db.get("abc").await.unwrap().unwrap();
        assert_eq!(record.destination_url, "https://example.com/a");
        assert_eq!(record.click_count, 1);
    }

    #[tokio::test]
    async fn unknown_lookup_changes_nothing() {
        let (_dir, db) = temp_database().await;
        db.create("abc", "https://example.com/a", ADMIN, "Admin")
            .await
            .unwrap();

        assert_eq!(db.lookup("nope").await.unwrap(), None);
        assert_eq!(db.get("nope").await.unwrap(), None);

        let stats = db.stats().await.unwrap();
        assert_eq!(stats.total_records, 1);
        assert_eq!(stats.total_clicks, 0);
    }

    #[tokio::test]
    async fn empty_stats() {
        let (_dir, db) = temp_database().await;
        assert_eq!(db.stats().await.unwrap(), LinkStats::default());
    }

    #[tokio::test]
    async fn stats_top_is_sorted_and_capped() {
        let (_dir, db) = temp_database().await;

        // Link number N gets N clicks.
        for n in 0..8u64 {
            let id = format!("id{n}");
            db.create(&id, &format!("https://example.com/{n}"), ADMIN, "Admin")
                .await
                .unwrap();
            for _ in 0..n {
                db.lookup(&id).await.unwrap().unwrap();
            }
        }

        let stats = db.stats().await.unwrap();
        assert_eq!(stats.total_records, 8);
        assert_eq!(stats.total_clicks, (0..8).sum::<u64>());
        assert_eq!(stats.top.len(), TOP_LINKS);

        let clicks: Vec<u64> = stats.top.iter().map(|x| x.click_count).collect();
        assert_eq!(clicks, vec![7, 6, 5, 4, 3]);
        assert_eq!(stats.top[0].destination_url, "https://example.com/7");
    }

    #[tokio::test]
    async fn stats_ties_keep_insertion_order() {
        let (_dir, db) = temp_database().await;
        for n in 0..3 {
            db.create(&format!("id{n}"), &format!("https://example.com/{n}"), ADMIN, "Admin")
                .await
                .unwrap();
        }

        let top = db.stats().await.unwrap().top;
        let urls: Vec<&str> = top.iter().map(|x| x.destination_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/0",
                "https://example.com/1",
                "https://example.com/2"
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_lookups_count_every_click() {
        let (_dir, db) = temp_database().await;
        db.create("abc", "https://example.com/a", ADMIN, "Admin")
            .await
            .unwrap();

        let db = Arc::new(db);
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move { db.lookup("abc").await.unwrap() })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().as_deref(), Some("https://example.com/a"));
        }

        assert_eq!(db.get("abc").await.unwrap().unwrap().click_count, 50);
        assert_eq!(db.stats().await.unwrap().total_clicks, 50);
    }

    #[tokio::test]
    async fn survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.sqlite");

        let db = Database::new(&path).await.unwrap();
        db.create("abc", "https://example.com/a", ADMIN, "Admin")
            .await
            .unwrap();
        db.lookup("abc").await.unwrap();
        drop(db);

        let db = Database::new(&path).await.unwrap();
        assert_eq!(db.get("abc").await.unwrap().unwrap().click_count, 1);
    }
}
