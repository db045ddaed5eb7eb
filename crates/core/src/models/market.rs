//! Spot quote and token metadata from the market-data provider

use serde::{Deserialize, Serialize};

/// A spot price quote for a mint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    /// Which upstream produced this quote (e.g. "dexscreener")
    pub source: String,
}

/// Token-level metadata for one mint, as far as the provider knows it.
///
/// Every field is optional: thin pools routinely miss market cap or
/// liquidity, and supply is derived (`market_cap / price`) rather than
/// reported directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenMeta {
    pub price: Option<f64>,
    pub supply: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub liquidity: Option<f64>,
    /// Dominant pool/pair address, needed to address OHLCV requests
    pub pair_address: Option<String>,
}

impl TokenMeta {
    /// Derive whichever of {price, supply, market_cap} is missing when
    /// the other two are known.
    pub fn fill_derivable(mut self) -> Self {
        match (self.price, self.supply, self.market_cap) {
            (Some(p), Some(s), None) if s > 0.0 => self.market_cap = Some(p * s),
            (Some(p), None, Some(m)) if p > 0.0 => self.supply = Some(m / p),
            (None, Some(s), Some(m)) if s > 0.0 => self.price = Some(m / s),
            _ => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_missing_supply() {
        let meta = TokenMeta {
            price: Some(0.5),
            market_cap: Some(1_000_000.0),
            ..Default::default()
        }
        .fill_derivable();
        assert_eq!(meta.supply, Some(2_000_000.0));
    }

    #[test]
    fn derives_missing_market_cap() {
        let meta = TokenMeta {
            price: Some(2.0),
            supply: Some(10.0),
            ..Default::default()
        }
        .fill_derivable();
        assert_eq!(meta.market_cap, Some(20.0));
    }

    #[test]
    fn leaves_unresolvable_alone() {
        let meta = TokenMeta {
            price: Some(1.0),
            ..Default::default()
        }
        .fill_derivable();
        assert!(meta.supply.is_none());
        assert!(meta.market_cap.is_none());
    }
}
