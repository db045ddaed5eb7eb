//! All-time-high and pre-ATH drawdown aggregation
//!
//! Candle history is fetched in three boundary-aligned tiers: minute
//! candles from entry up to the first top-of-hour, hour candles up to
//! the first midnight after that, day candles from there to now. Each
//! tier covers only the window its resolution suits, so a request
//! never pages deep into provider history. Tiers fetch independently;
//! one failing tier degrades to "no data" for that window only.
//!
//! Derivation over the merged candles is pure and separately testable.
//! The monotonic clamps in `derive_ath` make recomputation idempotent:
//! identical inputs always produce identical outputs, and a stored ATH
//! can never decrease.

use mintwatch_core::{Candle, Resolution};
use mintwatch_providers::ProviderClient;
use std::cmp::Ordering;
use tracing::warn;

/// Extra candles requested per tier to absorb boundary rounding
const TIER_PAD: usize = 2;

const HOUR_SECS: i64 = 3_600;
const DAY_SECS: i64 = 86_400;

/// One resolution's fetch window, half-open `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierWindow {
    pub resolution: Resolution,
    pub start: i64,
    pub end: i64,
}

impl TierWindow {
    /// Candle count to request for this window, capped at the
    /// provider's page-size ceiling
    pub fn request_count(&self, max_candles: usize) -> usize {
        let span = (self.end - self.start).max(0);
        let count = (span / self.resolution.seconds()) as usize + TIER_PAD;
        count.min(max_candles)
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

/// Compute the boundary-aligned tier windows for `[entry_ts, now_ts)`.
///
/// The hour boundary is the first top-of-hour strictly after entry;
/// the day boundary is the first UTC midnight strictly after the hour
/// boundary. Windows that would be empty are omitted.
pub fn tier_windows(entry_ts: i64, now_ts: i64) -> Vec<TierWindow> {
    let hour_boundary = (entry_ts / HOUR_SECS + 1) * HOUR_SECS;
    let day_boundary = (hour_boundary / DAY_SECS + 1) * DAY_SECS;

    let mut windows = Vec::new();

    let minute_end = hour_boundary.min(now_ts);
    if minute_end > entry_ts {
        windows.push(TierWindow {
            resolution: Resolution::Minute,
            start: entry_ts,
            end: minute_end,
        });
    }

    let hour_end = day_boundary.min(now_ts);
    if hour_end > hour_boundary {
        windows.push(TierWindow {
            resolution: Resolution::Hour,
            start: hour_boundary,
            end: hour_end,
        });
    }

    if now_ts > day_boundary {
        windows.push(TierWindow {
            resolution: Resolution::Day,
            start: day_boundary,
            end: now_ts,
        });
    }

    windows
}

/// Fetch every tier and merge the in-window candles, ordered by time.
///
/// Each request is anchored at the window end, so the page covers the
/// window itself rather than the most recent candles. A failed tier is
/// logged and excluded; it never aborts the others.
pub async fn fetch_tiers(
    provider: &ProviderClient,
    mint: &str,
    pool_address: &str,
    windows: &[TierWindow],
    max_candles: usize,
) -> Vec<Candle> {
    let mut merged: Vec<Candle> = Vec::new();

    for window in windows {
        let limit = window.request_count(max_candles);
        match provider
            .get_ohlcv(pool_address, window.resolution, limit, window.end)
            .await
        {
            Ok(candles) => {
                merged.extend(candles.into_iter().filter(|c| window.contains(c.timestamp)));
            }
            Err(e) => {
                warn!(
                    "OHLCV {} tier failed for {} (pool {}): {}",
                    window.resolution, mint, pool_address, e
                );
            }
        }
    }

    merged.sort_by_key(|c| c.timestamp);
    merged
}

/// Previously stored ATH, carried in for the monotonic clamp
#[derive(Debug, Clone, Copy)]
pub struct StoredAth {
    pub price: f64,
    pub at: i64,
}

/// Inputs to the pure derivation step
#[derive(Debug, Clone)]
pub struct AthInput {
    pub entry_price: f64,
    /// Entry time, unix seconds
    pub entry_at: i64,
    /// "Now", unix seconds; timestamp assigned when a live quote
    /// becomes the new ATH
    pub now: i64,
    /// Live current price, if a quote or recent sample is available
    pub current_price: Option<f64>,
    pub stored_ath: Option<StoredAth>,
}

/// Derived ATH and drawdown values
#[derive(Debug, Clone, PartialEq)]
pub struct AthOutcome {
    pub ath_price: f64,
    pub ath_at: i64,
    pub ath_multiple: f64,
    /// Signed fraction, always <= 0 (-0.20 = 20% dip below entry)
    pub drawdown_frac: Option<f64>,
    pub drawdown_at: Option<i64>,
    pub seconds_to_ath: i64,
    pub seconds_drawdown_to_ath: i64,
}

/// Derive ATH and pre-ATH drawdown from merged candles.
///
/// Returns `None` when no candles are available: with a stored ATH the
/// caller keeps the existing snapshot untouched, without one there is
/// nothing sound to write (a lone current quote cannot seed an ATH).
pub fn derive_ath(input: &AthInput, candles: &[Candle]) -> Option<AthOutcome> {
    if input.entry_price <= 0.0 || candles.is_empty() {
        return None;
    }

    let peak = candles
        .iter()
        .max_by(|a, b| a.high.partial_cmp(&b.high).unwrap_or(Ordering::Equal))?;
    let mut ath_price = peak.high;
    let mut ath_at = peak.timestamp;

    // Candle data can never place the peak below the baseline
    if ath_price < input.entry_price {
        ath_price = input.entry_price;
        ath_at = input.entry_at;
    }
    // A live quote above every candle high is the peak right now
    if let Some(current) = input.current_price {
        if current > ath_price {
            ath_price = current;
            ath_at = input.now;
        }
    }
    // Monotonic non-decrease across recomputations
    if let Some(stored) = input.stored_ath {
        if stored.price > ath_price {
            ath_price = stored.price;
            ath_at = stored.at;
        }
    }

    // Drawdown only counts strictly before the peak, starting from a
    // baseline of the entry value at entry time
    let mut drawdown_frac = None;
    let mut drawdown_at = None;
    let pre_peak: Vec<&Candle> = candles
        .iter()
        .filter(|c| c.timestamp >= input.entry_at && c.timestamp <= ath_at)
        .collect();

    if let Some(trough) = pre_peak
        .iter()
        .min_by(|a, b| a.low.partial_cmp(&b.low).unwrap_or(Ordering::Equal))
    {
        if trough.low < input.entry_price {
            drawdown_frac = Some((trough.low - input.entry_price) / input.entry_price);
            drawdown_at = Some(trough.timestamp);
        } else {
            // never dipped below entry before the peak
            drawdown_frac = Some(0.0);
            drawdown_at = Some(input.entry_at);
        }
    } else if let Some(current) = input.current_price {
        // degraded single-point estimate from the live quote
        if current < input.entry_price {
            drawdown_frac = Some((current - input.entry_price) / input.entry_price);
            drawdown_at = Some(input.now);
        }
    }

    let seconds_to_ath = (ath_at - input.entry_at).max(0);
    let seconds_drawdown_to_ath = match drawdown_at {
        Some(at) if at < ath_at => ath_at - at,
        _ => seconds_to_ath,
    };

    Some(AthOutcome {
        ath_price,
        ath_at,
        ath_multiple: ath_price / input.entry_price,
        drawdown_frac,
        drawdown_at,
        seconds_to_ath,
        seconds_drawdown_to_ath,
    })
}
