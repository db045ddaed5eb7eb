//! Shared value types crossing crate boundaries

mod candle;
mod market;

pub use candle::{Candle, Resolution};
pub use market::{Quote, TokenMeta};
