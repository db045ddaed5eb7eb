//! Engine configuration
//!
//! Every tuned heuristic lives here as a named, individually
//! overridable field so the TOML file can adjust one knob without
//! restating the rest. The gate defaults mirror long-running
//! production values; they are heuristics, not calibrated constants.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration, loaded from a TOML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub scheduler: SchedulerConfig,
    pub gate: GateConfig,
    pub thresholds: ThresholdConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "mintwatch.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL for quote/metadata lookups (DexScreener-shaped API)
    pub quote_base_url: String,
    /// Base URL for OHLCV lookups (GeckoTerminal-shaped API)
    pub ohlcv_base_url: String,
    /// Network segment in OHLCV URLs
    pub network: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Provider page-size ceiling for a single OHLCV request
    pub max_candles: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            quote_base_url: "https://api.dexscreener.com".to_string(),
            ohlcv_base_url: "https://api.geckoterminal.com/api/v2".to_string(),
            network: "solana".to_string(),
            timeout_secs: 30,
            max_candles: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Cadence of the price-sampling cycle
    pub sample_interval_secs: u64,
    /// Cadence of the ATH/metrics recomputation cycle
    pub metrics_interval_secs: u64,
    /// Signals processed per batch in the metrics cycle
    pub batch_size: usize,
    /// Pause between signals within a batch
    pub item_delay_ms: u64,
    /// Pause between batches
    pub batch_delay_ms: u64,
    /// Pause between signals in the sampling cycle
    pub sample_item_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 60,
            metrics_interval_secs: 3600,
            batch_size: 3,
            item_delay_ms: 1000,
            batch_delay_ms: 3000,
            sample_item_delay_ms: 250,
        }
    }
}

/// Recompute Gate thresholds.
///
/// Ratios compare the latest known multiple against the stored ATH
/// multiple; ages compare `updated_at` against now.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Snapshots younger than this are skipped unless forced
    pub fresh_secs: i64,
    /// Zero-volume skip stops applying past this age
    pub very_stale_secs: i64,
    /// Snapshots older than this always recompute
    pub force_secs: i64,
    /// Dead token: current below this fraction of the ATH multiple...
    pub dead_ratio: f64,
    /// ...and below this absolute multiple
    pub dead_floor: f64,
    /// Never pumped: current below this absolute multiple...
    pub never_pumped_floor: f64,
    /// ...while the ATH multiple never reached this
    pub never_pumped_ath: f64,
    /// New peak likely when current exceeds ATH multiple by this ratio
    pub new_peak_ratio: f64,
    /// Near peak when current is within this fraction of the ATH multiple
    pub near_peak_ratio: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            fresh_secs: 300,
            very_stale_secs: 3600,
            force_secs: 3600,
            dead_ratio: 0.5,
            dead_floor: 0.5,
            never_pumped_floor: 0.1,
            never_pumped_ath: 1.5,
            new_peak_ratio: 1.05,
            near_peak_ratio: 0.9,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Ascending multiplier ladder, applied to price and market-cap
    /// multiples independently
    pub ladder: Vec<f64>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            ladder: vec![2.0, 3.0, 4.0, 5.0, 10.0, 15.0, 20.0, 30.0, 50.0, 100.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.scheduler.batch_size, 3);
        assert_eq!(cfg.gate.fresh_secs, 300);
        assert_eq!(cfg.provider.max_candles, 1000);
        assert_eq!(cfg.thresholds.ladder.first(), Some(&2.0));
    }

    #[test]
    fn partial_toml_overrides_one_knob() {
        let cfg: Config = toml::from_str(
            r#"
            [gate]
            fresh_secs = 600
            "#,
        )
        .unwrap();
        assert_eq!(cfg.gate.fresh_secs, 600);
        // untouched sections keep their defaults
        assert_eq!(cfg.gate.force_secs, 3600);
        assert_eq!(cfg.scheduler.sample_interval_secs, 60);
    }

    #[test]
    fn ladder_is_ascending() {
        let ladder = ThresholdConfig::default().ladder;
        assert!(ladder.windows(2).all(|w| w[0] < w[1]));
    }
}
