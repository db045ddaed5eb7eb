//! Database connection and schema initialization

use mintwatch_core::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Database wrapper for SQLite operations
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database at the given path, creating it if necessary
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Database(e.to_string()))?;
        }

        let path_str = path.to_string_lossy();
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path_str))
            .map_err(|e| Error::Database(e.to_string()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Connect to an in-memory database (for testing)
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Create the schema. Idempotent; safe to run on every startup.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS signals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mint TEXT NOT NULL,
                detected_at TIMESTAMP NOT NULL,
                entry_price REAL,
                entry_supply REAL,
                entry_market_cap REAL,
                status TEXT NOT NULL DEFAULT 'entry_pending'
                    CHECK (status IN ('active', 'entry_pending'))
            );

            CREATE TABLE IF NOT EXISTS price_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                signal_id INTEGER NOT NULL,
                price REAL NOT NULL,
                market_cap REAL,
                volume REAL,
                liquidity REAL,
                sampled_at TIMESTAMP NOT NULL,
                FOREIGN KEY (signal_id) REFERENCES signals(id)
            );

            CREATE INDEX IF NOT EXISTS idx_samples_signal_time
                ON price_samples (signal_id, sampled_at);

            CREATE TABLE IF NOT EXISTS metrics_snapshots (
                signal_id INTEGER PRIMARY KEY,
                current_price REAL NOT NULL,
                current_market_cap REAL,
                current_multiple REAL NOT NULL,
                ath_price REAL NOT NULL,
                ath_market_cap REAL,
                ath_multiple REAL NOT NULL,
                ath_at TIMESTAMP NOT NULL,
                drawdown_frac REAL,
                drawdown_at TIMESTAMP,
                seconds_to_ath INTEGER NOT NULL,
                seconds_drawdown_to_ath INTEGER NOT NULL,
                updated_at TIMESTAMP NOT NULL,
                FOREIGN KEY (signal_id) REFERENCES signals(id)
            );

            CREATE TABLE IF NOT EXISTS threshold_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                signal_id INTEGER NOT NULL,
                multiplier REAL NOT NULL,
                basis TEXT NOT NULL CHECK (basis IN ('price', 'market_cap')),
                hit_price REAL NOT NULL,
                hit_market_cap REAL,
                hit_at TIMESTAMP NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                UNIQUE (signal_id, multiplier, basis),
                FOREIGN KEY (signal_id) REFERENCES signals(id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
