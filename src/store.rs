/// Streak store module with PostgreSQL
///
/// Each author has one record holding their running total, their
/// consecutive-day streak and the day of their last counted post. The
/// two updates below are conditional: when the record is not in the
/// required state the update does nothing and reports `None`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Table holding one row per author
pub const STREAKS_TABLE: &str = "learn_to_code_streaks";

const MAX_CONNECTIONS: u32 = 10;

/// A persisted author record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthorRecord {
    pub author_id: String,
    pub screen_name: String,
    pub total: i64,
    pub streak: i64,
    pub last_post_day: Option<NaiveDate>,
}

/// Counter values returned by a successful update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub total: i64,
    pub streak: i64,
}

/// One qualifying post, reduced to what the store needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDay {
    pub author_id: String,
    pub screen_name: String,
    pub day: NaiveDate,
}

impl PostDay {
    pub fn yesterday(&self) -> Result<NaiveDate> {
        self.day
            .pred_opt()
            .context("Post day has no preceding calendar day")
    }
}

/// Store collaborator
///
/// `Ok(None)` means the precondition did not hold and nothing changed.
#[async_trait]
pub trait StreakStore: Send + Sync {
    /// Count the post and reset the streak, only if a day was skipped
    /// (the record's last day is strictly before yesterday)
    async fn record_total(&self, post: &PostDay) -> Result<Option<Counters>>;

    /// Count the post and extend the streak, only if there is no prior
    /// day on record or the last day was exactly yesterday
    async fn extend_streak(&self, post: &PostDay) -> Result<Option<Counters>>;

    async fn get(&self, author_id: &str) -> Result<Option<AuthorRecord>>;
}

/// PostgreSQL-backed store
pub struct PgStreakStore {
    db_pool: PgPool,
}

impl PgStreakStore {
    /// Connect to the database
    pub async fn connect(database_url: &str) -> Result<Self> {
        // A run fans out two statements per post; excess ones queue on the pool
        let db_pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { db_pool })
    }

    /// Create the streaks table if it doesn't exist
    pub async fn initialize_table(&self) -> Result<()> {
        log::info!("Initializing streaks table...");

        let create_table_query = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                author_id TEXT PRIMARY KEY,
                screen_name TEXT NOT NULL,
                total BIGINT NOT NULL DEFAULT 0,
                streak BIGINT NOT NULL DEFAULT 0,
                last_post_day DATE
            )
            "#,
            STREAKS_TABLE
        );

        sqlx::query(&create_table_query)
            .execute(&self.db_pool)
            .await
            .context("Failed to create streaks table")?;

        log::info!("Streaks table initialized successfully");
        Ok(())
    }
}

#[async_trait]
impl StreakStore for PgStreakStore {
    async fn record_total(&self, post: &PostDay) -> Result<Option<Counters>> {
        // NULL last_post_day compares as unknown, so fresh rows never match
        let update_query = format!(
            r#"
            UPDATE {}
            SET total = total + 1,
                streak = 0,
                screen_name = $2,
                last_post_day = $3
            WHERE author_id = $1 AND last_post_day < $4
            RETURNING total, streak
            "#,
            STREAKS_TABLE
        );

        let row: Option<(i64, i64)> = sqlx::query_as(&update_query)
            .bind(&post.author_id)
            .bind(&post.screen_name)
            .bind(post.day)
            .bind(post.yesterday()?)
            .fetch_optional(&self.db_pool)
            .await
            .context("Failed to record total")?;

        Ok(row.map(|(total, streak)| Counters { total, streak }))
    }

    async fn extend_streak(&self, post: &PostDay) -> Result<Option<Counters>> {
        let upsert_query = format!(
            r#"
            INSERT INTO {table} AS s (author_id, screen_name, total, streak, last_post_day)
            VALUES ($1, $2, 1, 1, $3)
            ON CONFLICT (author_id) DO UPDATE
            SET total = s.total + 1,
                streak = s.streak + 1,
                screen_name = EXCLUDED.screen_name,
                last_post_day = EXCLUDED.last_post_day
            WHERE s.last_post_day IS NULL OR s.last_post_day = $4
            RETURNING total, streak
            "#,
            table = STREAKS_TABLE
        );

        let row: Option<(i64, i64)> = sqlx::query_as(&upsert_query)
            .bind(&post.author_id)
            .bind(&post.screen_name)
            .bind(post.day)
            .bind(post.yesterday()?)
            .fetch_optional(&self.db_pool)
            .await
            .context("Failed to extend streak")?;

        Ok(row.map(|(total, streak)| Counters { total, streak }))
    }

    async fn get(&self, author_id: &str) -> Result<Option<AuthorRecord>> {
        let select_query = format!(
            "SELECT author_id, screen_name, total, streak, last_post_day FROM {} WHERE author_id = $1",
            STREAKS_TABLE
        );

        sqlx::query_as::<_, AuthorRecord>(&select_query)
            .bind(author_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Failed to load author record")
    }
}

/// In-memory store with the same conditional semantics
#[derive(Default)]
pub struct MemoryStreakStore {
    records: Mutex<HashMap<String, AuthorRecord>>,
}

impl MemoryStreakStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite a record
    pub async fn insert(&self, record: AuthorRecord) {
        let mut records = self.records.lock().await;
        records.insert(record.author_id.clone(), record);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl StreakStore for MemoryStreakStore {
    async fn record_total(&self, post: &PostDay) -> Result<Option<Counters>> {
        let yesterday = post.yesterday()?;
        let mut records = self.records.lock().await;

        let Some(record) = records.get_mut(&post.author_id) else {
            return Ok(None);
        };
        if !matches!(record.last_post_day, Some(last) if last < yesterday) {
            return Ok(None);
        }

        record.total += 1;
        record.streak = 0;
        record.screen_name = post.screen_name.clone();
        record.last_post_day = Some(post.day);

        Ok(Some(Counters {
            total: record.total,
            streak: record.streak,
        }))
    }

    async fn extend_streak(&self, post: &PostDay) -> Result<Option<Counters>> {
        let yesterday = post.yesterday()?;
        let mut records = self.records.lock().await;

        let record = records
            .entry(post.author_id.clone())
            .or_insert_with(|| AuthorRecord {
                author_id: post.author_id.clone(),
                screen_name: post.screen_name.clone(),
                total: 0,
                streak: 0,
                last_post_day: None,
            });
        match record.last_post_day {
            None => {}
            Some(last) if last == yesterday => {}
            Some(_) => return Ok(None),
        }

        record.total += 1;
        record.streak += 1;
        record.screen_name = post.screen_name.clone();
        record.last_post_day = Some(post.day);

        Ok(Some(Counters {
            total: record.total,
            streak: record.streak,
        }))
    }

    async fn get(&self, author_id: &str) -> Result<Option<AuthorRecord>> {
        Ok(self.records.lock().await.get(author_id).cloned())
    }
}
