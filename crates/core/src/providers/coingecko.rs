use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::http::{build_client, get_json_with_retry, RetryPolicy};
use super::traits::{RateSource, SourceRates};
use crate::config::HubConfig;
use crate::errors::CoreError;
use crate::models::rates::{is_valid_rate, PairKey, RateMap};

/// CoinGecko simple-price API for cryptocurrency rates.
///
/// - **Free**: No API key required.
/// - **Endpoint**: `/simple/price?ids={ids}&vs_currencies={base}`
///
/// CoinGecko identifies coins by lowercase ids ("bitcoin"), so only the
/// configured crypto codes that have an entry in `crypto_id_map` are quoted.
pub struct CoinGeckoSource {
    client: Client,
    url: String,
    base: String,
    /// (CODE, coingecko id) in configuration order.
    coins: Vec<(String, String)>,
    retry: RetryPolicy,
}

impl CoinGeckoSource {
    pub const ID: &'static str = "coingecko";

    pub fn new(config: &HubConfig) -> Self {
        let coins = config
            .crypto_currencies
            .iter()
            .map(|code| code.trim().to_uppercase())
            .filter_map(|code| {
                let id = config.crypto_id_map.get(&code)?.clone();
                Some((code, id))
            })
            .collect();
        Self {
            client: build_client(config.request_timeout()),
            url: config.coingecko_url.clone(),
            base: config.base(),
            coins,
            retry: RetryPolicy::from_config(config),
        }
    }

    fn parse(&self, body: &Value) -> Result<RateMap, CoreError> {
        let obj = body.as_object().ok_or_else(|| CoreError::Api {
            provider: "CoinGecko".into(),
            message: "Unexpected response shape (expected an object)".into(),
        })?;
        let vs = self.base.to_lowercase();

        let mut rates = RateMap::new();
        for (code, id) in &self.coins {
            let Some(rate) = obj
                .get(id)
                .and_then(|coin| coin.get(&vs))
                .and_then(Value::as_f64)
            else {
                tracing::debug!(code, id, "Coin missing from CoinGecko response");
                continue;
            };
            if !is_valid_rate(rate) {
                continue;
            }
            rates.insert(PairKey::new(code, &self.base)?, rate);
        }
        Ok(rates)
    }
}

#[async_trait]
impl RateSource for CoinGeckoSource {
    fn id(&self) -> &str {
        Self::ID
    }

    fn display_name(&self) -> &str {
        "CoinGecko"
    }

    async fn fetch_rates(&self) -> Result<SourceRates, CoreError> {
        if self.coins.is_empty() {
            return Ok(SourceRates::default());
        }

        let ids = self
            .coins
            .iter()
            .map(|(_, id)| id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let query = [("ids", ids), ("vs_currencies", self.base.to_lowercase())];

        let (body, meta) =
            get_json_with_retry(&self.client, "CoinGecko", &self.url, &query, self.retry).await?;
        let rates = self.parse(&body)?;
        Ok(SourceRates { rates, meta })
    }
}
