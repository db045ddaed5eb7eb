//! SQLite persistence operations

mod connection;
pub mod events;
pub mod metrics;
pub mod samples;
pub mod signals;

pub use connection::Database;
pub use events::{EventRow, ThresholdBasis};
pub use metrics::{NewSnapshot, SnapshotRow};
pub use samples::{MinMax, SampleRow};
pub use signals::{SignalRow, TrackingStatus};
