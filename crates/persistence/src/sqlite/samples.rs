//! Price sample persistence (append-only time series)

use chrono::{DateTime, Utc};
use mintwatch_core::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// One immutable price/volume observation for a signal
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SampleRow {
    pub id: i64,
    pub signal_id: i64,
    pub price: f64,
    pub market_cap: Option<f64>,
    pub volume: Option<f64>,
    pub liquidity: Option<f64>,
    pub sampled_at: DateTime<Utc>,
}

/// Min/max aggregate over a signal's sample history
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MinMax {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_market_cap: Option<f64>,
    pub max_market_cap: Option<f64>,
}

/// Append one observation
pub async fn add_sample(
    pool: &SqlitePool,
    signal_id: i64,
    price: f64,
    market_cap: Option<f64>,
    volume: Option<f64>,
    liquidity: Option<f64>,
    sampled_at: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO price_samples (signal_id, price, market_cap, volume, liquidity, sampled_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(signal_id)
    .bind(price)
    .bind(market_cap)
    .bind(volume)
    .bind(liquidity)
    .bind(sampled_at)
    .execute(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(result.last_insert_rowid())
}

/// All samples for a signal in time order
pub async fn list_samples_ascending(pool: &SqlitePool, signal_id: i64) -> Result<Vec<SampleRow>> {
    let rows = sqlx::query_as::<_, SampleRow>(
        r#"
        SELECT id, signal_id, price, market_cap, volume, liquidity, sampled_at
        FROM price_samples
        WHERE signal_id = ?
        ORDER BY sampled_at ASC, id ASC
        "#,
    )
    .bind(signal_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(rows)
}

/// Earliest sample for a signal, if any
pub async fn first_sample(pool: &SqlitePool, signal_id: i64) -> Result<Option<SampleRow>> {
    let row = sqlx::query_as::<_, SampleRow>(
        r#"
        SELECT id, signal_id, price, market_cap, volume, liquidity, sampled_at
        FROM price_samples
        WHERE signal_id = ?
        ORDER BY sampled_at ASC, id ASC
        LIMIT 1
        "#,
    )
    .bind(signal_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(row)
}

/// Most recent sample for a signal, if any
pub async fn latest_sample(pool: &SqlitePool, signal_id: i64) -> Result<Option<SampleRow>> {
    let row = sqlx::query_as::<_, SampleRow>(
        r#"
        SELECT id, signal_id, price, market_cap, volume, liquidity, sampled_at
        FROM price_samples
        WHERE signal_id = ?
        ORDER BY sampled_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(signal_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(row)
}

/// Most recent sample strictly after the given instant (used by the
/// Recompute Gate's activity check)
pub async fn latest_sample_after(
    pool: &SqlitePool,
    signal_id: i64,
    after: DateTime<Utc>,
) -> Result<Option<SampleRow>> {
    let row = sqlx::query_as::<_, SampleRow>(
        r#"
        SELECT id, signal_id, price, market_cap, volume, liquidity, sampled_at
        FROM price_samples
        WHERE signal_id = ? AND sampled_at > ?
        ORDER BY sampled_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(signal_id)
    .bind(after)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(row)
}

/// Min/max price and market cap across a signal's whole history
pub async fn aggregate_min_max(pool: &SqlitePool, signal_id: i64) -> Result<MinMax> {
    let row = sqlx::query_as::<_, MinMax>(
        r#"
        SELECT MIN(price) AS min_price,
               MAX(price) AS max_price,
               MIN(market_cap) AS min_market_cap,
               MAX(market_cap) AS max_market_cap
        FROM price_samples
        WHERE signal_id = ?
        "#,
    )
    .bind(signal_id)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::Database(e.to_string()))?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::{signals, Database};
    use chrono::Duration;

    async fn seeded_signal(db: &Database) -> i64 {
        signals::insert_signal(db.pool(), "Mint", Utc::now(), Some(1.0), None, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn samples_come_back_in_time_order() {
        let db = Database::connect_in_memory().await.unwrap();
        let id = seeded_signal(&db).await;
        let base = Utc::now();

        // inserted out of order on purpose
        add_sample(db.pool(), id, 2.0, None, None, None, base + Duration::seconds(60))
            .await
            .unwrap();
        add_sample(db.pool(), id, 1.0, None, None, None, base).await.unwrap();

        let rows = list_samples_ascending(db.pool(), id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].price, 1.0);
        assert_eq!(rows[1].price, 2.0);

        let first = first_sample(db.pool(), id).await.unwrap().unwrap();
        assert_eq!(first.price, 1.0);
        let last = latest_sample(db.pool(), id).await.unwrap().unwrap();
        assert_eq!(last.price, 2.0);
    }

    #[tokio::test]
    async fn latest_after_excludes_older_samples() {
        let db = Database::connect_in_memory().await.unwrap();
        let id = seeded_signal(&db).await;
        let base = Utc::now();

        add_sample(db.pool(), id, 1.0, None, Some(10.0), None, base)
            .await
            .unwrap();
        add_sample(db.pool(), id, 1.5, None, Some(0.0), None, base + Duration::seconds(90))
            .await
            .unwrap();

        let after = latest_sample_after(db.pool(), id, base + Duration::seconds(30))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.volume, Some(0.0));

        let none = latest_sample_after(db.pool(), id, base + Duration::seconds(120))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn min_max_ignores_null_market_caps() {
        let db = Database::connect_in_memory().await.unwrap();
        let id = seeded_signal(&db).await;
        let base = Utc::now();

        add_sample(db.pool(), id, 1.0, Some(100.0), None, None, base)
            .await
            .unwrap();
        add_sample(db.pool(), id, 3.0, None, None, None, base + Duration::seconds(1))
            .await
            .unwrap();

        let agg = aggregate_min_max(db.pool(), id).await.unwrap();
        assert_eq!(agg.min_price, Some(1.0));
        assert_eq!(agg.max_price, Some(3.0));
        assert_eq!(agg.max_market_cap, Some(100.0));
    }
}
