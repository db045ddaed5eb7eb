//! Metrics snapshot persistence
//!
//! One row per signal, replaced atomically on every successful
//! recomputation. External readers always see a fully-computed
//! snapshot; there is no partially-updated state to observe.

use chrono::{DateTime, Utc};
use mintwatch_core::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Derived metrics for one signal
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SnapshotRow {
    pub signal_id: i64,
    pub current_price: f64,
    pub current_market_cap: Option<f64>,
    pub current_multiple: f64,
    pub ath_price: f64,
    pub ath_market_cap: Option<f64>,
    pub ath_multiple: f64,
    pub ath_at: DateTime<Utc>,
    /// Max pre-ATH drawdown as a signed fraction (-0.20 = 20% dip)
    pub drawdown_frac: Option<f64>,
    pub drawdown_at: Option<DateTime<Utc>>,
    pub seconds_to_ath: i64,
    pub seconds_drawdown_to_ath: i64,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot values to write; `updated_at` is stamped by the upsert
#[derive(Debug, Clone)]
pub struct NewSnapshot {
    pub signal_id: i64,
    pub current_price: f64,
    pub current_market_cap: Option<f64>,
    pub current_multiple: f64,
    pub ath_price: f64,
    pub ath_market_cap: Option<f64>,
    pub ath_multiple: f64,
    pub ath_at: DateTime<Utc>,
    pub drawdown_frac: Option<f64>,
    pub drawdown_at: Option<DateTime<Utc>>,
    pub seconds_to_ath: i64,
    pub seconds_drawdown_to_ath: i64,
}

/// Insert or replace the snapshot for a signal in one statement
pub async fn upsert_snapshot(pool: &SqlitePool, snapshot: &NewSnapshot) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO metrics_snapshots (
            signal_id, current_price, current_market_cap, current_multiple,
            ath_price, ath_market_cap, ath_multiple, ath_at,
            drawdown_frac, drawdown_at, seconds_to_ath, seconds_drawdown_to_ath,
            updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (signal_id) DO UPDATE SET
            current_price = excluded.current_price,
            current_market_cap = excluded.current_market_cap,
            current_multiple = excluded.current_multiple,
            ath_price = excluded.ath_price,
            ath_market_cap = excluded.ath_market_cap,
            ath_multiple = excluded.ath_multiple,
            ath_at = excluded.ath_at,
            drawdown_frac = excluded.drawdown_frac,
            drawdown_at = excluded.drawdown_at,
            seconds_to_ath = excluded.seconds_to_ath,
            seconds_drawdown_to_ath = excluded.seconds_drawdown_to_ath,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(snapshot.signal_id)
    .bind(snapshot.current_price)
    .bind(snapshot.current_market_cap)
    .bind(snapshot.current_multiple)
    .bind(snapshot.ath_price)
    .bind(snapshot.ath_market_cap)
    .bind(snapshot.ath_multiple)
    .bind(snapshot.ath_at)
    .bind(snapshot.drawdown_frac)
    .bind(snapshot.drawdown_at)
    .bind(snapshot.seconds_to_ath)
    .bind(snapshot.seconds_drawdown_to_ath)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(())
}

/// Get the stored snapshot for a signal
pub async fn get_snapshot(pool: &SqlitePool, signal_id: i64) -> Result<Option<SnapshotRow>> {
    let row = sqlx::query_as::<_, SnapshotRow>(
        r#"
        SELECT signal_id, current_price, current_market_cap, current_multiple,
               ath_price, ath_market_cap, ath_multiple, ath_at,
               drawdown_frac, drawdown_at, seconds_to_ath, seconds_drawdown_to_ath,
               updated_at
        FROM metrics_snapshots
        WHERE signal_id = ?
        "#,
    )
    .bind(signal_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::{signals, Database};

    fn snapshot(signal_id: i64, ath_price: f64) -> NewSnapshot {
        NewSnapshot {
            signal_id,
            current_price: 1.2,
            current_market_cap: None,
            current_multiple: 1.2,
            ath_price,
            ath_market_cap: None,
            ath_multiple: ath_price,
            ath_at: Utc::now(),
            drawdown_frac: Some(-0.1),
            drawdown_at: Some(Utc::now()),
            seconds_to_ath: 120,
            seconds_drawdown_to_ath: 60,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let db = Database::connect_in_memory().await.unwrap();
        let id = signals::insert_signal(db.pool(), "Mint", Utc::now(), Some(1.0), None, None)
            .await
            .unwrap();

        upsert_snapshot(db.pool(), &snapshot(id, 1.5)).await.unwrap();
        upsert_snapshot(db.pool(), &snapshot(id, 2.0)).await.unwrap();

        let row = get_snapshot(db.pool(), id).await.unwrap().unwrap();
        assert_eq!(row.ath_price, 2.0);

        // still exactly one row
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM metrics_snapshots")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn missing_snapshot_is_none() {
        let db = Database::connect_in_memory().await.unwrap();
        assert!(get_snapshot(db.pool(), 42).await.unwrap().is_none());
    }
}
