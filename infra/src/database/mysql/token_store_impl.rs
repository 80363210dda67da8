//! MySQL implementation of the TokenStore trait.
//!
//! Refresh records live in `refresh_tokens`, keyed by the SHA-256 digest of
//! the token; revoked access token ids live in `revoked_access_tokens`.
//! Take-and-remove locks the row and deletes it in one transaction, so two
//! concurrent rotations of one token cannot both obtain the record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row};
use tracing::{error, info};

use tw_core::domain::entities::token::{RefreshTokenRecord, RevocationEntry};
use tw_core::errors::DomainError;
use tw_core::repositories::TokenStore;

use crate::InfrastructureError;

const CREATE_REFRESH_TOKENS: &str = r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        token_hash CHAR(64) NOT NULL PRIMARY KEY,
        subject VARCHAR(255) NOT NULL,
        created_at DATETIME(6) NOT NULL,
        expires_at DATETIME(6) NOT NULL,
        INDEX idx_refresh_tokens_subject (subject),
        INDEX idx_refresh_tokens_expires_at (expires_at)
    )
"#;

const CREATE_REVOKED_ACCESS_TOKENS: &str = r#"
    CREATE TABLE IF NOT EXISTS revoked_access_tokens (
        jti VARCHAR(128) NOT NULL PRIMARY KEY,
        expires_at DATETIME(6) NOT NULL,
        INDEX idx_revoked_access_tokens_expires_at (expires_at)
    )
"#;

/// MySQL implementation of TokenStore
pub struct MySqlTokenStore {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlTokenStore {
    /// Create a new MySQL token store
    ///
    /// # Arguments
    /// * `pool` - MySQL connection pool from SQLx
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Create the store's tables if they do not exist
    pub async fn ensure_schema(&self) -> Result<(), InfrastructureError> {
        for statement in [CREATE_REFRESH_TOKENS, CREATE_REVOKED_ACCESS_TOKENS] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Token store schema ready");
        Ok(())
    }

    /// Convert database row to a refresh record
    fn row_to_record(row: &sqlx::mysql::MySqlRow) -> Result<RefreshTokenRecord, DomainError> {
        Ok(RefreshTokenRecord {
            token_hash: row.try_get("token_hash").map_err(|e| column_error("token_hash", e))?,
            subject: row.try_get("subject").map_err(|e| column_error("subject", e))?,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(|e| column_error("created_at", e))?,
            expires_at: row
                .try_get::<DateTime<Utc>, _>("expires_at")
                .map_err(|e| column_error("expires_at", e))?,
        })
    }
}

fn column_error(column: &str, e: sqlx::Error) -> DomainError {
    DomainError::Internal {
        message: format!("Failed to get {}: {}", column, e),
    }
}

fn storage_error(action: &str, e: sqlx::Error) -> DomainError {
    error!("Failed to {}: {}", action, e);
    DomainError::from(InfrastructureError::Database(e))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl TokenStore for MySqlTokenStore {
    async fn put(&self, record: RefreshTokenRecord) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO refresh_tokens (token_hash, subject, created_at, expires_at)
            VALUES (?, ?, ?, ?)
        "#;

        match sqlx::query(query)
            .bind(&record.token_hash)
            .bind(&record.subject)
            .bind(record.created_at)
            .bind(record.expires_at)
            .execute(&self.pool)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(DomainError::Conflict {
                message: "Refresh token already exists".to_string(),
            }),
            Err(e) => Err(storage_error("save refresh token", e)),
        }
    }

    async fn take_and_remove(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("begin transaction", e))?;

        let row = sqlx::query(
            r#"
            SELECT token_hash, subject, created_at, expires_at
            FROM refresh_tokens
            WHERE token_hash = ?
            FOR UPDATE
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| storage_error("lock refresh token", e))?;

        let record = match row {
            Some(row) => Self::row_to_record(&row)?,
            None => {
                tx.rollback().await.map_err(|e| storage_error("end transaction", e))?;
                return Ok(None);
            }
        };

        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("delete refresh token", e))?;

        tx.commit().await.map_err(|e| storage_error("commit transaction", e))?;

        if deleted.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn purge_all_for_subject(&self, subject: &str) -> Result<usize, DomainError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE subject = ?")
            .bind(subject)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("purge refresh tokens", e))?;

        Ok(result.rows_affected() as usize)
    }

    async fn blacklist(&self, entry: RevocationEntry) -> Result<(), DomainError> {
        // Re-blacklisting keeps the later expiry
        let query = r#"
            INSERT INTO revoked_access_tokens (jti, expires_at)
            VALUES (?, ?)
            ON DUPLICATE KEY UPDATE expires_at = GREATEST(expires_at, VALUES(expires_at))
        "#;

        sqlx::query(query)
            .bind(&entry.jti)
            .bind(entry.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("blacklist access token", e))?;

        Ok(())
    }

    async fn is_blacklisted(&self, jti: &str) -> Result<bool, DomainError> {
        let row = sqlx::query("SELECT 1 FROM revoked_access_tokens WHERE jti = ? LIMIT 1")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("check blacklist", e))?;

        Ok(row.is_some())
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("delete expired tokens", e))?;

        Ok(result.rows_affected() as usize)
    }

    async fn cleanup_blacklist(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let result = sqlx::query("DELETE FROM revoked_access_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("cleanup blacklist", e))?;

        Ok(result.rows_affected() as usize)
    }
}
