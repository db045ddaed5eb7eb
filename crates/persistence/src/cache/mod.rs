//! In-memory hit cache for threshold events
//!
//! Purely an optimization over the `threshold_events` uniqueness
//! constraint: the cache avoids a SELECT per (signal, multiplier,
//! basis) on every metrics update. It is seeded from persisted rows at
//! startup and can always be rebuilt from them; losing it never loses
//! a recorded crossing.

use crate::sqlite::ThresholdBasis;
use std::collections::HashSet;
use std::sync::RwLock;

/// Cache key: multiplier stored as bits so the tuple is hashable.
/// Ladder values come from config verbatim, so bit equality is exact.
type HitKey = (i64, u64, ThresholdBasis);

/// Thread-safe set of already-recorded threshold crossings
#[derive(Default)]
pub struct HitCache {
    hits: RwLock<HashSet<HitKey>>,
}

impl HitCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from persisted event keys (signal_id, multiplier, basis)
    pub fn seed<I>(&self, keys: I)
    where
        I: IntoIterator<Item = (i64, f64, ThresholdBasis)>,
    {
        if let Ok(mut hits) = self.hits.write() {
            for (signal_id, multiplier, basis) in keys {
                hits.insert((signal_id, multiplier.to_bits(), basis));
            }
        }
    }

    pub fn contains(&self, signal_id: i64, multiplier: f64, basis: ThresholdBasis) -> bool {
        self.hits
            .read()
            .map(|hits| hits.contains(&(signal_id, multiplier.to_bits(), basis)))
            .unwrap_or(false)
    }

    pub fn insert(&self, signal_id: i64, multiplier: f64, basis: ThresholdBasis) {
        if let Ok(mut hits) = self.hits.write() {
            hits.insert((signal_id, multiplier.to_bits(), basis));
        }
    }

    pub fn len(&self) -> usize {
        self.hits.read().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_contains() {
        let cache = HitCache::new();
        assert!(!cache.contains(1, 2.0, ThresholdBasis::Price));

        cache.insert(1, 2.0, ThresholdBasis::Price);
        assert!(cache.contains(1, 2.0, ThresholdBasis::Price));
        // other basis and other signal stay unrecorded
        assert!(!cache.contains(1, 2.0, ThresholdBasis::MarketCap));
        assert!(!cache.contains(2, 2.0, ThresholdBasis::Price));
    }

    #[test]
    fn seed_rebuilds_from_keys() {
        let cache = HitCache::new();
        cache.seed(vec![
            (1, 2.0, ThresholdBasis::Price),
            (1, 3.0, ThresholdBasis::MarketCap),
        ]);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(1, 3.0, ThresholdBasis::MarketCap));
    }
}
