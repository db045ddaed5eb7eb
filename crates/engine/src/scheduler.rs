//! Periodic scheduler
//!
//! Two independent cycles share the database: a fast sampling cycle
//! that appends one price observation per trackable signal, and a slow
//! metrics cycle that recomputes ATH/drawdown snapshots and records
//! threshold crossings. The metrics cycle runs in small batches with
//! delays between items and batches to stay inside provider rate
//! limits. A failure on one signal is logged and never aborts the
//! cycle.

use crate::ath::{self, AthInput, StoredAth};
use crate::baseline;
use crate::gate::{self, GateDecision, GateInput};
use crate::notify::Notifier;
use crate::thresholds;
use chrono::{DateTime, Utc};
use mintwatch_core::{config::Config, Result, TokenMeta};
use mintwatch_persistence::cache::HitCache;
use mintwatch_persistence::sqlite::{
    metrics, samples, signals, Database, NewSnapshot, SignalRow, SnapshotRow, TrackingStatus,
};
use mintwatch_providers::ProviderClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

pub struct Scheduler {
    db: Arc<Database>,
    provider: Arc<ProviderClient>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<HitCache>,
    config: Config,
}

impl Scheduler {
    pub fn new(
        db: Arc<Database>,
        provider: Arc<ProviderClient>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<HitCache>,
        config: Config,
    ) -> Self {
        Self {
            db,
            provider,
            notifier,
            cache,
            config,
        }
    }

    /// Run both cycles until `shutdown` is notified
    pub async fn run(&self, shutdown: Arc<Notify>) {
        info!(
            sample_interval_secs = self.config.scheduler.sample_interval_secs,
            metrics_interval_secs = self.config.scheduler.metrics_interval_secs,
            "scheduler starting"
        );
        let cycles = async {
            tokio::join!(
                self.sampling_loop(shutdown.clone()),
                self.metrics_loop(shutdown.clone()),
            );
        };
        // The inner loops check for shutdown between items; the outer
        // select catches a notification sent while neither was waiting.
        tokio::select! {
            _ = shutdown.notified() => {}
            _ = cycles => {}
        }
        info!("scheduler stopped");
    }

    async fn sampling_loop(&self, shutdown: Arc<Notify>) {
        let interval = Duration::from_secs(self.config.scheduler.sample_interval_secs);
        loop {
            if let Err(e) = self.sample_cycle(&shutdown).await {
                warn!(error = %e, "sampling cycle failed");
            }
            if shutdown_or_delay(&shutdown, interval).await {
                break;
            }
        }
    }

    async fn metrics_loop(&self, shutdown: Arc<Notify>) {
        let interval = Duration::from_secs(self.config.scheduler.metrics_interval_secs);
        loop {
            if let Err(e) = self.metrics_cycle(&shutdown).await {
                warn!(error = %e, "metrics cycle failed");
            }
            if shutdown_or_delay(&shutdown, interval).await {
                break;
            }
        }
    }

    /// Append one observation per trackable signal
    async fn sample_cycle(&self, shutdown: &Notify) -> Result<()> {
        let tracked = signals::trackable_signals(self.db.pool()).await?;
        let item_delay = Duration::from_millis(self.config.scheduler.sample_item_delay_ms);

        for signal in &tracked {
            match self.provider.get_token_meta(&signal.mint).await {
                Ok(meta) => {
                    if let Some(price) = meta.price.filter(|p| *p > 0.0) {
                        samples::add_sample(
                            self.db.pool(),
                            signal.id,
                            price,
                            meta.market_cap,
                            meta.volume_24h,
                            meta.liquidity,
                            Utc::now(),
                        )
                        .await?;
                    } else {
                        debug!(signal_id = signal.id, mint = %signal.mint, "no price in quote");
                    }
                }
                Err(e) => {
                    warn!(signal_id = signal.id, mint = %signal.mint, error = %e, "quote failed");
                }
            }
            if shutdown_or_delay(shutdown, item_delay).await {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Recompute metrics for every signal the gate lets through
    async fn metrics_cycle(&self, shutdown: &Notify) -> Result<()> {
        let tracked = signals::trackable_signals(self.db.pool()).await?;
        let now = Utc::now();

        let mut due = Vec::new();
        for signal in tracked {
            match self.gate_decision(&signal, now).await? {
                GateDecision::Recompute(reason) => {
                    debug!(signal_id = signal.id, ?reason, "recompute");
                    due.push(signal);
                }
                GateDecision::Skip(reason) => {
                    debug!(signal_id = signal.id, ?reason, "skip");
                }
            }
        }
        if due.is_empty() {
            return Ok(());
        }
        info!(count = due.len(), "metrics cycle processing signals");

        let item_delay = Duration::from_millis(self.config.scheduler.item_delay_ms);
        let batch_delay = Duration::from_millis(self.config.scheduler.batch_delay_ms);

        for batch in due.chunks(self.config.scheduler.batch_size) {
            for signal in batch {
                if let Err(e) = self.process_signal(signal).await {
                    warn!(signal_id = signal.id, mint = %signal.mint, error = %e, "metrics update failed");
                }
                if shutdown_or_delay(shutdown, item_delay).await {
                    return Ok(());
                }
            }
            if shutdown_or_delay(shutdown, batch_delay).await {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Gate one signal. A signal without a snapshot or without resolved
    /// entry values always recomputes.
    async fn gate_decision(&self, signal: &SignalRow, now: DateTime<Utc>) -> Result<GateDecision> {
        let Some(snapshot) = metrics::get_snapshot(self.db.pool(), signal.id).await? else {
            return Ok(GateDecision::Recompute(gate::RecomputeReason::Stale));
        };
        let Some(entry_price) = signal.entry_price.filter(|p| *p > 0.0) else {
            return Ok(GateDecision::Recompute(gate::RecomputeReason::Stale));
        };

        let latest = samples::latest_sample(self.db.pool(), signal.id).await?;
        let latest_after =
            samples::latest_sample_after(self.db.pool(), signal.id, snapshot.updated_at).await?;

        let input = gate_input(&snapshot, entry_price, latest.as_ref(), latest_after.as_ref(), now);
        Ok(gate::evaluate(&self.config.gate, &input))
    }

    /// Full recompute of one signal: baseline, candle tiers, ATH
    /// derivation, snapshot upsert, threshold recording.
    async fn process_signal(&self, signal: &SignalRow) -> Result<()> {
        let first = samples::first_sample(self.db.pool(), signal.id).await?;
        let Some(baseline) = baseline::resolve_baseline(signal, first.as_ref()) else {
            debug!(signal_id = signal.id, "entry baseline not yet resolvable");
            return Ok(());
        };

        if signal.tracking_status() == TrackingStatus::EntryPending {
            let applied = signals::backfill_entry(
                self.db.pool(),
                signal.id,
                Some(baseline.entry_price),
                baseline.entry_supply,
                baseline.entry_market_cap,
            )
            .await?;
            if applied {
                info!(signal_id = signal.id, entry_price = baseline.entry_price, "entry backfilled");
            }
        }

        let meta = match self.provider.get_token_meta(&signal.mint).await {
            Ok(meta) => meta,
            Err(e) => {
                warn!(signal_id = signal.id, error = %e, "token meta unavailable, degrading");
                TokenMeta::default()
            }
        };

        let latest = samples::latest_sample(self.db.pool(), signal.id).await?;
        let Some(current_price) = meta
            .price
            .filter(|p| *p > 0.0)
            .or(latest.map(|s| s.price))
        else {
            debug!(signal_id = signal.id, "no current price, skipping update");
            return Ok(());
        };

        let now = Utc::now();
        let windows = ath::tier_windows(baseline.entry_at.timestamp(), now.timestamp());
        let candles = match &meta.pair_address {
            Some(pool_address) => {
                ath::fetch_tiers(
                    &self.provider,
                    &signal.mint,
                    pool_address,
                    &windows,
                    self.config.provider.max_candles,
                )
                .await
            }
            None => {
                debug!(signal_id = signal.id, "no pool address, no candle history");
                Vec::new()
            }
        };

        let stored = metrics::get_snapshot(self.db.pool(), signal.id).await?;
        let input = AthInput {
            entry_price: baseline.entry_price,
            entry_at: baseline.entry_at.timestamp(),
            now: now.timestamp(),
            current_price: Some(current_price),
            stored_ath: stored.as_ref().map(|s| StoredAth {
                price: s.ath_price,
                at: s.ath_at.timestamp(),
            }),
        };
        let Some(outcome) = ath::derive_ath(&input, &candles) else {
            debug!(signal_id = signal.id, "no candle data, keeping stored metrics");
            return Ok(());
        };

        let current_multiple = current_price / baseline.entry_price;
        let current_market_cap = meta
            .market_cap
            .or(baseline.entry_supply.map(|s| s * current_price))
            .or(baseline.entry_market_cap.map(|m| m * current_multiple));
        let ath_market_cap = baseline
            .entry_supply
            .map(|s| s * outcome.ath_price)
            .or(baseline.entry_market_cap.map(|m| m * outcome.ath_multiple));

        let snapshot = NewSnapshot {
            signal_id: signal.id,
            current_price,
            current_market_cap,
            current_multiple,
            ath_price: outcome.ath_price,
            ath_market_cap,
            ath_multiple: outcome.ath_multiple,
            ath_at: DateTime::from_timestamp(outcome.ath_at, 0).unwrap_or(now),
            drawdown_frac: outcome.drawdown_frac,
            drawdown_at: outcome
                .drawdown_at
                .and_then(|at| DateTime::from_timestamp(at, 0)),
            seconds_to_ath: outcome.seconds_to_ath,
            seconds_drawdown_to_ath: outcome.seconds_drawdown_to_ath,
        };
        metrics::upsert_snapshot(self.db.pool(), &snapshot).await?;

        if let Err(e) = self.notifier.metrics_updated(&snapshot).await {
            warn!(signal_id = signal.id, error = %e, "metrics notification failed");
        }

        thresholds::record_crossings(
            &self.db,
            &self.cache,
            self.notifier.as_ref(),
            &self.config.thresholds.ladder,
            signal,
            &baseline,
            &snapshot,
        )
        .await?;

        Ok(())
    }
}

/// Build the gate input for a signal from its stored snapshot and
/// latest samples
fn gate_input(
    snapshot: &SnapshotRow,
    entry_price: f64,
    latest: Option<&samples::SampleRow>,
    latest_after_update: Option<&samples::SampleRow>,
    now: DateTime<Utc>,
) -> GateInput {
    let current_multiple = latest
        .map(|s| s.price / entry_price)
        .unwrap_or(snapshot.current_multiple);
    GateInput {
        age_secs: (now - snapshot.updated_at).num_seconds(),
        forced: false,
        current_multiple,
        ath_multiple: snapshot.ath_multiple,
        latest_volume_after_update: latest_after_update.and_then(|s| s.volume),
    }
}

/// Wait for either the shutdown signal or the delay; true means
/// shutdown fired.
async fn shutdown_or_delay(shutdown: &Notify, delay: Duration) -> bool {
    tokio::select! {
        _ = shutdown.notified() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn snapshot_row(updated_at: DateTime<Utc>) -> SnapshotRow {
        SnapshotRow {
            signal_id: 1,
            current_price: 1.2,
            current_market_cap: None,
            current_multiple: 1.2,
            ath_price: 2.0,
            ath_market_cap: None,
            ath_multiple: 2.0,
            ath_at: updated_at,
            drawdown_frac: None,
            drawdown_at: None,
            seconds_to_ath: 0,
            seconds_drawdown_to_ath: 0,
            updated_at,
        }
    }

    fn sample(price: f64, volume: Option<f64>, at: DateTime<Utc>) -> samples::SampleRow {
        samples::SampleRow {
            id: 1,
            signal_id: 1,
            price,
            market_cap: None,
            volume,
            liquidity: None,
            sampled_at: at,
        }
    }

    #[test]
    fn gate_input_prefers_latest_sample_multiple() {
        let now = Utc::now();
        let updated = now - ChronoDuration::seconds(600);
        let latest = sample(3.0, Some(50.0), now);

        let input = gate_input(&snapshot_row(updated), 1.0, Some(&latest), Some(&latest), now);
        assert_eq!(input.current_multiple, 3.0);
        assert_eq!(input.age_secs, 600);
        assert_eq!(input.latest_volume_after_update, Some(50.0));
    }

    #[test]
    fn gate_input_falls_back_to_stored_multiple() {
        let now = Utc::now();
        let updated = now - ChronoDuration::seconds(60);

        let input = gate_input(&snapshot_row(updated), 1.0, None, None, now);
        assert_eq!(input.current_multiple, 1.2);
        assert_eq!(input.latest_volume_after_update, None);
    }

    #[tokio::test]
    async fn shutdown_preempts_the_delay() {
        let shutdown = Notify::new();
        shutdown.notify_one();
        assert!(shutdown_or_delay(&shutdown, Duration::from_secs(3600)).await);
    }

    #[tokio::test]
    async fn delay_elapses_without_shutdown() {
        let shutdown = Notify::new();
        assert!(!shutdown_or_delay(&shutdown, Duration::from_millis(5)).await);
    }
}
