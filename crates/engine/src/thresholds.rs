//! Threshold Recorder
//!
//! Walks the configured multiplier ladder against the freshly-computed
//! multiples and records each first crossing exactly once. The
//! database uniqueness constraint is the source of truth; the hit
//! cache only saves lookups. Each event carries the earliest stored
//! sample that reached the multiplier, so the recorded hit time is the
//! first observation of the crossing, not the recompute that noticed
//! it.

use crate::baseline::Baseline;
use crate::notify::{Notifier, ThresholdCrossing};
use chrono::Utc;
use mintwatch_core::Result;
use mintwatch_persistence::cache::HitCache;
use mintwatch_persistence::sqlite::{
    events, samples, Database, NewSnapshot, SampleRow, SignalRow, ThresholdBasis,
};
use tracing::{info, warn};

/// Record first crossings for every ladder multiplier the current
/// multiples have reached. Returns the number of newly recorded
/// events.
pub async fn record_crossings(
    db: &Database,
    cache: &HitCache,
    notifier: &dyn Notifier,
    ladder: &[f64],
    signal: &SignalRow,
    baseline: &Baseline,
    snapshot: &NewSnapshot,
) -> Result<usize> {
    let history = samples::list_samples_ascending(db.pool(), signal.id).await?;
    let mut recorded = 0;

    for basis in [ThresholdBasis::Price, ThresholdBasis::MarketCap] {
        let multiple = match basis {
            ThresholdBasis::Price => Some(snapshot.current_multiple),
            ThresholdBasis::MarketCap => {
                match (baseline.entry_market_cap, snapshot.current_market_cap) {
                    (Some(entry), Some(current)) if entry > 0.0 => Some(current / entry),
                    _ => None,
                }
            }
        };
        let Some(multiple) = multiple else { continue };

        for &threshold in ladder {
            if threshold > multiple {
                // ladder is ascending; nothing further can be reached
                break;
            }
            if cache.contains(signal.id, threshold, basis) {
                continue;
            }
            if events::has_event(db.pool(), signal.id, threshold, basis).await? {
                cache.insert(signal.id, threshold, basis);
                continue;
            }

            // Earliest observation that reached this multiplier
            let hit = first_reaching(&history, basis, baseline, threshold);
            let (hit_price, hit_market_cap, hit_at, source) = match hit {
                Some(sample) => (
                    sample.price,
                    sample.market_cap,
                    sample.sampled_at,
                    "sample",
                ),
                None => (
                    snapshot.current_price,
                    snapshot.current_market_cap,
                    Utc::now(),
                    "current",
                ),
            };

            let inserted = events::insert_event(
                db.pool(),
                signal.id,
                threshold,
                basis,
                hit_price,
                hit_market_cap,
                hit_at,
                source,
            )
            .await?;
            cache.insert(signal.id, threshold, basis);

            if inserted {
                let seconds_from_detection = (hit_at - signal.detected_at).num_seconds();
                info!(
                    signal_id = signal.id,
                    mint = %signal.mint,
                    multiplier = threshold,
                    basis = basis.as_str(),
                    seconds_from_detection,
                    "recorded threshold crossing"
                );
                let crossing = ThresholdCrossing {
                    signal_id: signal.id,
                    mint: signal.mint.clone(),
                    multiplier: threshold,
                    basis,
                    hit_price,
                    hit_market_cap,
                    hit_at,
                    seconds_from_detection,
                };
                if let Err(e) = notifier.threshold_crossed(&crossing).await {
                    warn!(signal_id = signal.id, error = %e, "threshold notification failed");
                }
                recorded += 1;
            }
        }
    }

    Ok(recorded)
}

/// Earliest sample whose value on the given basis reached the
/// multiplier relative to the entry baseline
fn first_reaching<'a>(
    history: &'a [SampleRow],
    basis: ThresholdBasis,
    baseline: &Baseline,
    threshold: f64,
) -> Option<&'a SampleRow> {
    history.iter().find(|sample| match basis {
        ThresholdBasis::Price => sample.price / baseline.entry_price >= threshold,
        ThresholdBasis::MarketCap => match (sample.market_cap, baseline.entry_market_cap) {
            (Some(mc), Some(entry)) if entry > 0.0 => mc / entry >= threshold,
            _ => false,
        },
    })
}
