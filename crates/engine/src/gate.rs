//! Recompute Gate
//!
//! Candle fetches dominate the engine's upstream cost, so a signal is
//! only recomputed when its metrics could plausibly have moved. The
//! gate is a pure function of the stored snapshot, the latest known
//! multiple, and recent sample activity; every rule is testable in
//! isolation and every tuned constant lives in `GateConfig`.

use mintwatch_core::config::GateConfig;

/// Why a signal will be recomputed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeReason {
    /// Current multiple exceeds the stored ATH multiple: new peak likely
    NewPeakLikely,
    /// Current multiple is within range of the stored ATH multiple
    NearPeak,
    /// Stored metrics passed the force ceiling
    Stale,
}

/// Why a signal will be skipped this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Metrics were refreshed recently
    Fresh,
    /// Latest sample since the last update showed zero volume
    Inactive,
    /// Collapsed far below its own peak
    DeadToken,
    /// Never pumped and now deeply below entry
    NeverPumped,
    /// No rule fired; nothing suggests the metrics moved
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Recompute(RecomputeReason),
    Skip(SkipReason),
}

impl GateDecision {
    pub fn should_recompute(&self) -> bool {
        matches!(self, GateDecision::Recompute(_))
    }
}

/// Inputs to the gate, all derived from persisted state
#[derive(Debug, Clone, Copy)]
pub struct GateInput {
    /// Seconds since the snapshot's `updated_at`
    pub age_secs: i64,
    /// Bypasses the freshness rule only
    pub forced: bool,
    /// Latest known multiple (latest sample price over entry price)
    pub current_multiple: f64,
    /// Stored ATH multiple
    pub ath_multiple: f64,
    /// Volume of the most recent sample strictly after `updated_at`
    pub latest_volume_after_update: Option<f64>,
}

/// Evaluate the rule chain in order; the first match wins.
///
/// Callers handle the no-snapshot case themselves (always recompute).
pub fn evaluate(config: &GateConfig, input: &GateInput) -> GateDecision {
    if input.age_secs < config.fresh_secs && !input.forced {
        return GateDecision::Skip(SkipReason::Fresh);
    }

    let inactive = matches!(input.latest_volume_after_update, Some(v) if v <= 0.0);
    if inactive && input.age_secs < config.very_stale_secs {
        return GateDecision::Skip(SkipReason::Inactive);
    }

    if input.current_multiple < config.dead_ratio * input.ath_multiple
        && input.current_multiple < config.dead_floor
    {
        return GateDecision::Skip(SkipReason::DeadToken);
    }

    if input.current_multiple < config.never_pumped_floor
        && input.ath_multiple < config.never_pumped_ath
    {
        return GateDecision::Skip(SkipReason::NeverPumped);
    }

    if input.current_multiple > input.ath_multiple * config.new_peak_ratio {
        return GateDecision::Recompute(RecomputeReason::NewPeakLikely);
    }
    if input.current_multiple >= input.ath_multiple * config.near_peak_ratio {
        return GateDecision::Recompute(RecomputeReason::NearPeak);
    }
    if input.age_secs > config.force_secs {
        return GateDecision::Recompute(RecomputeReason::Stale);
    }

    GateDecision::Skip(SkipReason::Unchanged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_input() -> GateInput {
        GateInput {
            age_secs: 900,
            forced: false,
            current_multiple: 1.0,
            ath_multiple: 1.0,
            latest_volume_after_update: Some(100.0),
        }
    }

    #[test]
    fn fresh_metrics_skip_unless_forced() {
        let cfg = GateConfig::default();
        let mut input = base_input();
        input.age_secs = 60;
        input.current_multiple = 2.0; // would otherwise recompute

        assert_eq!(evaluate(&cfg, &input), GateDecision::Skip(SkipReason::Fresh));

        input.forced = true;
        assert!(evaluate(&cfg, &input).should_recompute());
    }

    #[test]
    fn zero_volume_skips_until_very_stale() {
        let cfg = GateConfig::default();
        let mut input = base_input();
        input.latest_volume_after_update = Some(0.0);

        assert_eq!(
            evaluate(&cfg, &input),
            GateDecision::Skip(SkipReason::Inactive)
        );

        // ceiling override: eventually recomputes anyway, even well
        // below the near-peak band
        input.age_secs = 4000;
        input.current_multiple = 0.6;
        assert_eq!(
            evaluate(&cfg, &input),
            GateDecision::Recompute(RecomputeReason::Stale)
        );
    }

    #[test]
    fn dead_token_heuristic() {
        // stored ATH multiple 3.0, current 0.05
        let cfg = GateConfig::default();
        let mut input = base_input();
        input.ath_multiple = 3.0;
        input.current_multiple = 0.05;

        assert_eq!(
            evaluate(&cfg, &input),
            GateDecision::Skip(SkipReason::DeadToken)
        );
    }

    #[test]
    fn never_pumped_heuristic() {
        let cfg = GateConfig::default();
        let mut input = base_input();
        // ath below the dead-token ratio threshold so this reaches the
        // never-pumped rule: 0.05 >= 0.5 * 0.08
        input.ath_multiple = 0.08;
        input.current_multiple = 0.05;

        assert_eq!(
            evaluate(&cfg, &input),
            GateDecision::Skip(SkipReason::NeverPumped)
        );
    }

    #[test]
    fn new_peak_and_near_peak_recompute() {
        let cfg = GateConfig::default();
        let mut input = base_input();
        input.ath_multiple = 2.0;

        input.current_multiple = 2.2; // > 2.0 * 1.05
        assert_eq!(
            evaluate(&cfg, &input),
            GateDecision::Recompute(RecomputeReason::NewPeakLikely)
        );

        input.current_multiple = 1.9; // within 10%
        assert_eq!(
            evaluate(&cfg, &input),
            GateDecision::Recompute(RecomputeReason::NearPeak)
        );

        input.current_multiple = 1.0; // far below, young enough
        assert_eq!(
            evaluate(&cfg, &input),
            GateDecision::Skip(SkipReason::Unchanged)
        );
    }

    #[test]
    fn stale_ceiling_forces_recompute() {
        let cfg = GateConfig::default();
        let mut input = base_input();
        input.ath_multiple = 2.0;
        input.current_multiple = 1.0;
        input.age_secs = 3700;

        assert_eq!(
            evaluate(&cfg, &input),
            GateDecision::Recompute(RecomputeReason::Stale)
        );
    }

    #[test]
    fn gate_is_pure() {
        let cfg = GateConfig::default();
        let input = base_input();
        let first = evaluate(&cfg, &input);
        for _ in 0..10 {
            assert_eq!(evaluate(&cfg, &input), first);
        }
    }
}
