//! Signal persistence operations
//!
//! Signals are created by the ingestion side; the metrics engine only
//! reads them and backfills entry columns while a signal is still
//! `entry_pending`.

use chrono::{DateTime, Utc};
use mintwatch_core::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Tracking status of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingStatus {
    Active,
    EntryPending,
}

impl TrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStatus::Active => "active",
            TrackingStatus::EntryPending => "entry_pending",
        }
    }

    pub fn parse(s: &str) -> Option<TrackingStatus> {
        match s {
            "active" => Some(TrackingStatus::Active),
            "entry_pending" => Some(TrackingStatus::EntryPending),
            _ => None,
        }
    }
}

/// A tracked token mention stored in the database
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SignalRow {
    pub id: i64,
    pub mint: String,
    pub detected_at: DateTime<Utc>,
    pub entry_price: Option<f64>,
    pub entry_supply: Option<f64>,
    pub entry_market_cap: Option<f64>,
    pub status: String,
}

impl SignalRow {
    pub fn tracking_status(&self) -> TrackingStatus {
        TrackingStatus::parse(&self.status).unwrap_or(TrackingStatus::EntryPending)
    }
}

/// Insert a new signal. Entry fields may all be absent, in which case
/// the signal starts `entry_pending` until the Baseline Resolver
/// backfills it.
pub async fn insert_signal(
    pool: &SqlitePool,
    mint: &str,
    detected_at: DateTime<Utc>,
    entry_price: Option<f64>,
    entry_supply: Option<f64>,
    entry_market_cap: Option<f64>,
) -> Result<i64> {
    let status = if entry_price.is_some() || entry_market_cap.is_some() {
        TrackingStatus::Active
    } else {
        TrackingStatus::EntryPending
    };

    let result = sqlx::query(
        r#"
        INSERT INTO signals (mint, detected_at, entry_price, entry_supply, entry_market_cap, status)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(mint)
    .bind(detected_at)
    .bind(entry_price)
    .bind(entry_supply)
    .bind(entry_market_cap)
    .bind(status.as_str())
    .execute(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(result.last_insert_rowid())
}

/// Get a signal by ID
pub async fn get_signal(pool: &SqlitePool, signal_id: i64) -> Result<Option<SignalRow>> {
    let row = sqlx::query_as::<_, SignalRow>(
        r#"
        SELECT id, mint, detected_at, entry_price, entry_supply, entry_market_cap, status
        FROM signals
        WHERE id = ?
        "#,
    )
    .bind(signal_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(row)
}

/// All signals the engine should still be working on
pub async fn trackable_signals(pool: &SqlitePool) -> Result<Vec<SignalRow>> {
    let rows = sqlx::query_as::<_, SignalRow>(
        r#"
        SELECT id, mint, detected_at, entry_price, entry_supply, entry_market_cap, status
        FROM signals
        WHERE status IN ('active', 'entry_pending')
        ORDER BY detected_at ASC
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(rows)
}

/// Backfill entry values for a pending signal and flip it to active.
///
/// Guarded on `status = 'entry_pending'` so a signal whose entry was
/// already established can never be rewritten. Returns true when a row
/// was actually updated.
pub async fn backfill_entry(
    pool: &SqlitePool,
    signal_id: i64,
    entry_price: Option<f64>,
    entry_supply: Option<f64>,
    entry_market_cap: Option<f64>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE signals
        SET entry_price = ?, entry_supply = ?, entry_market_cap = ?, status = 'active'
        WHERE id = ? AND status = 'entry_pending'
        "#,
    )
    .bind(entry_price)
    .bind(entry_supply)
    .bind(entry_market_cap)
    .bind(signal_id)
    .execute(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(result.rows_affected() > 0)
}
