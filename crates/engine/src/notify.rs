//! Outbound notifications
//!
//! The engine announces two things: a refreshed metrics snapshot and a
//! first-time threshold crossing. `Notifier` is the seam for delivery;
//! the default implementation just logs. A notifier failure never
//! rolls back the persisted state it describes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mintwatch_core::Result;
use mintwatch_persistence::sqlite::{NewSnapshot, ThresholdBasis};
use serde::Serialize;
use tracing::info;

/// A first-time crossing of one multiplier on one basis
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdCrossing {
    pub signal_id: i64,
    pub mint: String,
    pub multiplier: f64,
    pub basis: ThresholdBasis,
    pub hit_price: f64,
    pub hit_market_cap: Option<f64>,
    pub hit_at: DateTime<Utc>,
    pub seconds_from_detection: i64,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn metrics_updated(&self, snapshot: &NewSnapshot) -> Result<()>;
    async fn threshold_crossed(&self, crossing: &ThresholdCrossing) -> Result<()>;
}

/// Notifier that writes structured log lines
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn metrics_updated(&self, snapshot: &NewSnapshot) -> Result<()> {
        info!(
            signal_id = snapshot.signal_id,
            current_multiple = snapshot.current_multiple,
            ath_multiple = snapshot.ath_multiple,
            drawdown_frac = snapshot.drawdown_frac,
            "metrics updated"
        );
        Ok(())
    }

    async fn threshold_crossed(&self, crossing: &ThresholdCrossing) -> Result<()> {
        info!(
            signal_id = crossing.signal_id,
            mint = %crossing.mint,
            multiplier = crossing.multiplier,
            basis = crossing.basis.as_str(),
            hit_price = crossing.hit_price,
            seconds_from_detection = crossing.seconds_from_detection,
            "threshold crossed"
        );
        Ok(())
    }
}
