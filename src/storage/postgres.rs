use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::info;

use super::{RecordStore, StoreError};
use crate::data::record::Record;
use crate::error::ApiError;
use crate::processing::traits::RecordCallback;

const TABLE_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS user_records (
        id TEXT PRIMARY KEY,
        document JSONB NOT NULL
    )
"#;

/// Record store backed by a Postgres table of JSONB documents.
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Connect and make sure the records table exists
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::query(TABLE_DDL).execute(&pool).await?;

        info!("Connected record store at {}", redact_url(database_url));
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn stream_rows(
        &self,
        owner: Option<&str>,
        offset: usize,
        limit: usize,
        on_record: &mut RecordCallback<'_>,
    ) -> Result<(), ApiError> {
        let mut rows = match owner {
            Some(owner) => sqlx::query(
                "SELECT document::text AS document FROM user_records \
                 WHERE id = $1 ORDER BY id LIMIT $2 OFFSET $3",
            )
            .bind(owner.to_string())
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch(&self.pool),
            None => sqlx::query(
                "SELECT document::text AS document FROM user_records \
                 ORDER BY id LIMIT $1 OFFSET $2",
            )
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch(&self.pool),
        };

        while let Some(row) = rows.try_next().await.map_err(StoreError::from)? {
            let document: String = row.try_get("document").map_err(StoreError::from)?;
            on_record(Record::new(document))?;
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn save(&self, record: &Record) -> Result<(), StoreError> {
        let id = record.id();
        if id.is_empty() {
            return Err(StoreError::InvalidDocument("record has no id".into()));
        }
        let document: serde_json::Value = serde_json::from_str(record.as_str())
            .map_err(|e| StoreError::InvalidDocument(e.to_string()))?;

        sqlx::query(
            "INSERT INTO user_records (id, document) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET document = EXCLUDED.document",
        )
        .bind(id)
        .bind(document)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM user_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Record, StoreError> {
        let row = sqlx::query("SELECT document::text AS document FROM user_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let document: String = row.try_get("document")?;
        Ok(Record::new(document))
    }

    async fn list(
        &self,
        offset: usize,
        limit: usize,
        on_record: &mut RecordCallback<'_>,
    ) -> Result<(), ApiError> {
        self.stream_rows(None, offset, limit, on_record).await
    }

    async fn list_for_owner(
        &self,
        owner: &str,
        offset: usize,
        limit: usize,
        on_record: &mut RecordCallback<'_>,
    ) -> Result<(), ApiError> {
        self.stream_rows(Some(owner), offset, limit, on_record).await
    }
}

/// Strip credentials from a connection URL before it is logged
pub fn redact_url(database_url: &str) -> String {
    match url::Url::parse(database_url) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.into()
        }
        Err(_) => "<invalid database url>".to_string(),
    }
}
