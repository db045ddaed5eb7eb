//! Threshold event persistence
//!
//! The UNIQUE(signal_id, multiplier, basis) constraint is the sole
//! source of truth for "already recorded"; a duplicate insert is a
//! success, not an error, so two engine processes can race safely.

use chrono::{DateTime, Utc};
use mintwatch_core::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Which multiple the threshold applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThresholdBasis {
    Price,
    MarketCap,
}

impl ThresholdBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdBasis::Price => "price",
            ThresholdBasis::MarketCap => "market_cap",
        }
    }

    pub fn parse(s: &str) -> Option<ThresholdBasis> {
        match s {
            "price" => Some(ThresholdBasis::Price),
            "market_cap" => Some(ThresholdBasis::MarketCap),
            _ => None,
        }
    }
}

/// A recorded first crossing of one multiplier
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRow {
    pub id: i64,
    pub signal_id: i64,
    pub multiplier: f64,
    pub basis: String,
    pub hit_price: f64,
    pub hit_market_cap: Option<f64>,
    pub hit_at: DateTime<Utc>,
    pub source: String,
}

/// Insert a threshold event. Returns false when the (signal,
/// multiplier, basis) pair was already recorded.
pub async fn insert_event(
    pool: &SqlitePool,
    signal_id: i64,
    multiplier: f64,
    basis: ThresholdBasis,
    hit_price: f64,
    hit_market_cap: Option<f64>,
    hit_at: DateTime<Utc>,
    source: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO threshold_events
            (signal_id, multiplier, basis, hit_price, hit_market_cap, hit_at, source)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(signal_id)
    .bind(multiplier)
    .bind(basis.as_str())
    .bind(hit_price)
    .bind(hit_market_cap)
    .bind(hit_at)
    .bind(source)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(true),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(false),
        Err(e) => Err(Error::Database(e.to_string())),
    }
}

/// Check whether a threshold was already recorded
pub async fn has_event(
    pool: &SqlitePool,
    signal_id: i64,
    multiplier: f64,
    basis: ThresholdBasis,
) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM threshold_events WHERE signal_id = ? AND multiplier = ? AND basis = ?",
    )
    .bind(signal_id)
    .bind(multiplier)
    .bind(basis.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(row.is_some())
}

/// All recorded events for a signal, oldest first
pub async fn events_for_signal(pool: &SqlitePool, signal_id: i64) -> Result<Vec<EventRow>> {
    let rows = sqlx::query_as::<_, EventRow>(
        r#"
        SELECT id, signal_id, multiplier, basis, hit_price, hit_market_cap, hit_at, source
        FROM threshold_events
        WHERE signal_id = ?
        ORDER BY hit_at ASC, multiplier ASC
        "#,
    )
    .bind(signal_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(rows)
}

/// Every (signal, multiplier, basis) key in the table; used to rebuild
/// the in-memory hit cache on startup.
pub async fn all_event_keys(pool: &SqlitePool) -> Result<Vec<(i64, f64, String)>> {
    let rows: Vec<(i64, f64, String)> =
        sqlx::query_as("SELECT signal_id, multiplier, basis FROM threshold_events")
            .fetch_all(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::{signals, Database};

    #[tokio::test]
    async fn duplicate_insert_reports_already_recorded() {
        let db = Database::connect_in_memory().await.unwrap();
        let id = signals::insert_signal(db.pool(), "Mint", Utc::now(), Some(1.0), None, None)
            .await
            .unwrap();

        let now = Utc::now();
        let first = insert_event(db.pool(), id, 2.0, ThresholdBasis::Price, 2.1, None, now, "test")
            .await
            .unwrap();
        assert!(first);

        let second =
            insert_event(db.pool(), id, 2.0, ThresholdBasis::Price, 2.2, None, now, "test")
                .await
                .unwrap();
        assert!(!second);

        let rows = events_for_signal(db.pool(), id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].hit_price, 2.1);
    }

    #[tokio::test]
    async fn same_multiplier_different_basis_is_distinct() {
        let db = Database::connect_in_memory().await.unwrap();
        let id = signals::insert_signal(db.pool(), "Mint", Utc::now(), Some(1.0), None, None)
            .await
            .unwrap();

        let now = Utc::now();
        assert!(
            insert_event(db.pool(), id, 2.0, ThresholdBasis::Price, 2.0, None, now, "t")
                .await
                .unwrap()
        );
        assert!(
            insert_event(db.pool(), id, 2.0, ThresholdBasis::MarketCap, 2.0, None, now, "t")
                .await
                .unwrap()
        );

        assert!(has_event(db.pool(), id, 2.0, ThresholdBasis::Price).await.unwrap());
        assert!(has_event(db.pool(), id, 2.0, ThresholdBasis::MarketCap).await.unwrap());
        assert!(!has_event(db.pool(), id, 3.0, ThresholdBasis::Price).await.unwrap());

        let keys = all_event_keys(db.pool()).await.unwrap();
        assert_eq!(keys.len(), 2);
    }
}
