//! Mintwatch Engine - baseline resolution, ATH/drawdown aggregation,
//! recompute gating, threshold recording, and the periodic scheduler

pub mod ath;
pub mod baseline;
pub mod gate;
pub mod notify;
pub mod scheduler;
pub mod thresholds;

pub use notify::{LogNotifier, Notifier};
pub use scheduler::Scheduler;
