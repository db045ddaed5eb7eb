//! Mintwatch Persistence - SQLite store for signals, samples,
//! metrics snapshots, and threshold events

pub mod cache;
pub mod sqlite;

pub use cache::HitCache;
pub use sqlite::Database;
