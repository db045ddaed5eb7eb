//! Mintwatch Providers - HTTP clients for quotes, token metadata, and
//! OHLCV candles

pub mod http;

pub use http::ProviderClient;
