//! Market-data provider client
//!
//! Quotes and token metadata come from a DexScreener-shaped pair
//! endpoint; OHLCV candles come from a GeckoTerminal-shaped pool
//! endpoint. Both are rate-limited upstreams, so every failure maps to
//! a plain `Error::Provider` the engine can degrade on.

use mintwatch_core::config::ProviderConfig;
use mintwatch_core::{Candle, Error, Quote, Resolution, Result, TokenMeta};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const USER_AGENT_VALUE: &str = "mintwatch/0.3";

// ---- DexScreener pair response ----

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PairData {
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    fdv: Option<f64>,
    #[serde(default)]
    volume: Option<VolumePeriods>,
    #[serde(default)]
    liquidity: Option<LiquidityInfo>,
    #[serde(default)]
    pair_address: Option<String>,
}

#[derive(Deserialize, Debug)]
struct VolumePeriods {
    #[serde(default)]
    h24: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct LiquidityInfo {
    #[serde(default)]
    usd: Option<f64>,
}

// ---- GeckoTerminal OHLCV response ----

#[derive(Deserialize, Debug)]
struct OhlcvResponse {
    data: OhlcvData,
}

#[derive(Deserialize, Debug)]
struct OhlcvData {
    attributes: OhlcvAttributes,
}

#[derive(Deserialize, Debug)]
struct OhlcvAttributes {
    /// [timestamp, open, high, low, close, volume]
    ohlcv_list: Vec<Vec<f64>>,
}

/// HTTP client for the market-data providers
pub struct ProviderClient {
    http: Client,
    config: ProviderConfig,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT_VALUE)
            .build()
            .expect("Failed to create HTTP client");

        Self { http, config }
    }

    /// Spot quote for a mint
    pub async fn get_quote(&self, mint: &str) -> Result<Quote> {
        let meta = self.get_token_meta(mint).await?;
        match meta.price {
            Some(price) => Ok(Quote {
                price,
                source: "dexscreener".to_string(),
            }),
            None => Err(Error::Provider(format!("no price available for {}", mint))),
        }
    }

    /// Token metadata (price, market cap, 24h volume, liquidity,
    /// dominant pair) for a mint
    pub async fn get_token_meta(&self, mint: &str) -> Result<TokenMeta> {
        let url = format!(
            "{}/tokens/v1/{}/{}",
            self.config.quote_base_url, self.config.network, mint
        );

        let response = self.http.get(&url).send().await?;
        Self::check_status(&response.status(), &url)?;

        let pairs: Vec<PairData> = response
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("pair response: {}", e)))?;

        debug!("Fetched {} pairs for {}", pairs.len(), mint);
        Ok(meta_from_pairs(pairs))
    }

    /// OHLCV candles for a pool at one resolution, returned sorted
    /// ascending. The page is anchored at `before_ts`: the provider
    /// returns the `limit` candles leading up to that timestamp, so a
    /// historical window is addressed by its end rather than by "now".
    /// `limit` is capped at the provider's page-size ceiling.
    pub async fn get_ohlcv(
        &self,
        pool_address: &str,
        resolution: Resolution,
        limit: usize,
        before_ts: i64,
    ) -> Result<Vec<Candle>> {
        let url = self.ohlcv_url(pool_address, resolution, limit, before_ts);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::check_status(&response.status(), &url)?;

        let parsed: OhlcvResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("ohlcv response: {}", e)))?;

        let candles = candles_from_ohlcv(parsed.data.attributes.ohlcv_list);
        debug!(
            "Fetched {} {} candles for pool {}",
            candles.len(),
            resolution,
            pool_address
        );
        Ok(candles)
    }

    fn ohlcv_url(
        &self,
        pool_address: &str,
        resolution: Resolution,
        limit: usize,
        before_ts: i64,
    ) -> String {
        let limit = limit.min(self.config.max_candles);
        format!(
            "{}/networks/{}/pools/{}/ohlcv/{}?aggregate=1&before_timestamp={}&limit={}&currency=token",
            self.config.ohlcv_base_url,
            self.config.network,
            pool_address,
            resolution.as_str(),
            before_ts,
            limit
        )
    }

    fn check_status(status: &StatusCode, url: &str) -> Result<()> {
        if *status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited);
        }
        if !status.is_success() {
            return Err(Error::Provider(format!("{} returned {}", url, status)));
        }
        Ok(())
    }
}

/// Reduce a pair list to one TokenMeta, preferring the deepest pool
fn meta_from_pairs(pairs: Vec<PairData>) -> TokenMeta {
    let best = pairs.into_iter().max_by(|a, b| {
        let liq_a = a.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
        let liq_b = b.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
        liq_a.partial_cmp(&liq_b).unwrap_or(std::cmp::Ordering::Equal)
    });

    let Some(pair) = best else {
        return TokenMeta::default();
    };

    TokenMeta {
        price: pair.price_usd.as_deref().and_then(|p| p.parse::<f64>().ok()),
        supply: None,
        market_cap: pair.market_cap.or(pair.fdv),
        volume_24h: pair.volume.as_ref().and_then(|v| v.h24),
        liquidity: pair.liquidity.as_ref().and_then(|l| l.usd),
        pair_address: pair.pair_address,
    }
    .fill_derivable()
}

/// Map raw ohlcv rows to candles, dropping malformed entries
fn candles_from_ohlcv(list: Vec<Vec<f64>>) -> Vec<Candle> {
    let mut candles: Vec<Candle> = list
        .into_iter()
        .filter_map(|row| {
            if row.len() < 5 {
                return None;
            }
            let candle = Candle {
                timestamp: row[0] as i64,
                open: Some(row[1]),
                high: row[2],
                low: row[3],
                close: Some(row[4]),
            };
            candle.is_valid().then_some(candle)
        })
        .collect();

    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    candles
}
