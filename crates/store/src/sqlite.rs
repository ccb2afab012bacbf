//! SQLite-backed secret store using sqlx.
//!
//! Schema:
//! - `credentials(provider PRIMARY KEY, ciphertext, created_at, updated_at)`
//! - `options(name PRIMARY KEY, value, updated_at)`
//!
//! Every write is a single upsert statement, so concurrent writers for the
//! same provider resolve to last-writer-wins without partial rows.

use async_trait::async_trait;
use novax_types::{SecretStore, traits::Result};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;

/// A persistent [`SecretStore`] backed by `SQLite`.
pub struct SqliteSecretStore {
    pool: SqlitePool,
}

impl SqliteSecretStore {
    /// Connects to a `SQLite` database (e.g. `"sqlite:./novax.db"` or `"sqlite::memory:"`).
    ///
    /// Automatically creates the database file if it does not exist and
    /// runs migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`sqlx::Error`] if the connection or table creation fails.
    pub async fn new(database_url: &str) -> std::result::Result<Self, sqlx::Error> {
        let opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;
        Self::migrate(&pool).await?;
        tracing::debug!(url = database_url, "secret store ready");
        Ok(Self { pool })
    }

    /// Run schema migrations (idempotent).
    async fn migrate(pool: &SqlitePool) -> std::result::Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS credentials (
                provider    TEXT    PRIMARY KEY NOT NULL,
                ciphertext  TEXT    NOT NULL,
                created_at  INTEGER NOT NULL DEFAULT (unixepoch()),
                updated_at  INTEGER NOT NULL DEFAULT (unixepoch())
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS options (
                name        TEXT    PRIMARY KEY NOT NULL,
                value       TEXT    NOT NULL,
                updated_at  INTEGER NOT NULL DEFAULT (unixepoch())
            )",
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SecretStore for SqliteSecretStore {
    async fn load_credential(&self, provider: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT ciphertext FROM credentials WHERE provider = ?")
                .bind(provider)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(blob,)| blob))
    }

    async fn save_credential(&self, provider: &str, blob: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO credentials (provider, ciphertext)
             VALUES (?, ?)
             ON CONFLICT(provider) DO UPDATE SET
                 ciphertext = excluded.ciphertext,
                 updated_at = unixepoch()",
        )
        .bind(provider)
        .bind(blob)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_credential(&self, provider: &str) -> Result<()> {
        sqlx::query("DELETE FROM credentials WHERE provider = ?")
            .bind(provider)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_credentials(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT provider FROM credentials WHERE ciphertext <> '' ORDER BY provider",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(p,)| p).collect())
    }

    async fn load_option(&self, name: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM options WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(v,)| v))
    }

    async fn save_option(&self, name: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO options (name, value)
             VALUES (?, ?)
             ON CONFLICT(name) DO UPDATE SET
                 value = excluded.value,
                 updated_at = unixepoch()",
        )
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_option(&self, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM options WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
