//! Entry baseline resolution
//!
//! A signal's entry values may arrive incomplete from ingestion. The
//! resolver runs a fallback chain: stored fields, then deriving the
//! missing one of {price, supply, market cap} from the other two, then
//! the earliest price sample. Returning `None` means the signal stays
//! `entry_pending` for another cycle; it is never an error.

use chrono::{DateTime, Utc};
use mintwatch_persistence::sqlite::{SampleRow, SignalRow};

/// Resolved entry baseline for a signal
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub entry_price: f64,
    pub entry_supply: Option<f64>,
    pub entry_market_cap: Option<f64>,
    /// When the entry was established: detection time for stored
    /// entries, sample time when the first sample supplied the price
    pub entry_at: DateTime<Utc>,
}

/// Resolve the entry baseline for a signal from its stored fields and
/// earliest sample.
pub fn resolve_baseline(signal: &SignalRow, first_sample: Option<&SampleRow>) -> Option<Baseline> {
    let mut price = signal.entry_price.filter(|p| *p > 0.0);
    let mut supply = signal.entry_supply.filter(|s| *s > 0.0);
    let mut market_cap = signal.entry_market_cap.filter(|m| *m > 0.0);

    // Two of three known: derive the third
    match (price, supply, market_cap) {
        (None, Some(s), Some(m)) => price = Some(m / s),
        (Some(p), None, Some(m)) => supply = Some(m / p),
        (Some(p), Some(s), None) => market_cap = Some(p * s),
        _ => {}
    }

    let price_from_store = price.is_some();

    // Last resort: the first observation
    if price.is_none() {
        price = first_sample.map(|s| s.price).filter(|p| *p > 0.0);
    }
    if market_cap.is_none() {
        market_cap = first_sample.and_then(|s| s.market_cap).filter(|m| *m > 0.0);
    }
    if supply.is_none() {
        if let (Some(p), Some(m)) = (price, market_cap) {
            supply = Some(m / p);
        }
    }

    let entry_price = price?;
    let entry_at = if price_from_store {
        signal.detected_at
    } else {
        first_sample.map(|s| s.sampled_at).unwrap_or(signal.detected_at)
    };

    Some(Baseline {
        entry_price,
        entry_supply: supply,
        entry_market_cap: market_cap,
        entry_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn signal(
        entry_price: Option<f64>,
        entry_supply: Option<f64>,
        entry_market_cap: Option<f64>,
    ) -> SignalRow {
        SignalRow {
            id: 1,
            mint: "Mint".to_string(),
            detected_at: Utc::now(),
            entry_price,
            entry_supply,
            entry_market_cap,
            status: "active".to_string(),
        }
    }

    fn sample(price: f64, market_cap: Option<f64>, at: DateTime<Utc>) -> SampleRow {
        SampleRow {
            id: 1,
            signal_id: 1,
            price,
            market_cap,
            volume: None,
            liquidity: None,
            sampled_at: at,
        }
    }

    #[test]
    fn stored_values_pass_through() {
        let s = signal(Some(2.0), Some(100.0), Some(200.0));
        let b = resolve_baseline(&s, None).unwrap();
        assert_eq!(b.entry_price, 2.0);
        assert_eq!(b.entry_supply, Some(100.0));
        assert_eq!(b.entry_at, s.detected_at);
    }

    #[test]
    fn derives_price_from_market_cap_and_supply() {
        let s = signal(None, Some(1000.0), Some(500.0));
        let b = resolve_baseline(&s, None).unwrap();
        assert_eq!(b.entry_price, 0.5);
    }

    #[test]
    fn derives_supply_from_price_and_market_cap() {
        let s = signal(Some(0.25), None, Some(1000.0));
        let b = resolve_baseline(&s, None).unwrap();
        assert_eq!(b.entry_supply, Some(4000.0));
    }

    #[test]
    fn falls_back_to_first_sample() {
        let s = signal(None, None, None);
        let at = s.detected_at + Duration::seconds(30);
        let first = sample(1.5, Some(3000.0), at);

        let b = resolve_baseline(&s, Some(&first)).unwrap();
        assert_eq!(b.entry_price, 1.5);
        assert_eq!(b.entry_market_cap, Some(3000.0));
        assert_eq!(b.entry_supply, Some(2000.0));
        // entry time follows the sample that supplied the price
        assert_eq!(b.entry_at, at);
    }

    #[test]
    fn insufficient_baseline_is_none() {
        let s = signal(None, None, None);
        assert!(resolve_baseline(&s, None).is_none());

        // supply alone resolves nothing
        let s = signal(None, Some(1000.0), None);
        assert!(resolve_baseline(&s, None).is_none());
    }

    #[test]
    fn zero_entry_price_is_rejected() {
        let s = signal(Some(0.0), None, None);
        assert!(resolve_baseline(&s, None).is_none());
    }
}
