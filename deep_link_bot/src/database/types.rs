use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use teloxide::types::UserId;

/// How many of the most clicked links [`LinkStats`] has.
pub const TOP_LINKS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A link with this identifier already exists. The existing link is left untouched.
    #[error("duplicate link identifier: {0}")]
    DuplicateIdentifier(String),
    #[error("database is unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

/// A single stored link, as it is in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub id: String,
    pub destination_url: String,
    pub created_at: DateTime<Utc>,
    pub click_count: u64,
    pub submitter_id: Option<UserId>,
    pub submitter_label: Option<String>,
}

impl LinkRecord {
    #[allow(clippy::cast_sign_loss)]
    pub(super) fn from_sqlite_row(row: &SqliteRow) -> Result<LinkRecord, sqlx::Error> {
        Ok(LinkRecord {
            id: row.try_get("unique_id")?,
            destination_url: row.try_get("original_url")?,
            created_at: row.try_get("created_at")?,
            click_count: row.try_get::<i64, _>("click_count")? as u64,
            submitter_id: row
                .try_get::<Option<i64>, _>("user_id")?
                .map(|id| UserId(id as u64)),
            submitter_label: row.try_get("user_name")?,
        })
    }
}

/// One entry of the most clicked links list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopLink {
    pub destination_url: String,
    pub click_count: u64,
}

/// Aggregate numbers over all stored links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub total_records: u64,
    /// Sum of clicks over all links. Zero if there are no links.
    pub total_clicks: u64,
    /// Up to [`TOP_LINKS`] links, most clicked first.
    pub top: Vec<TopLink>,
}
