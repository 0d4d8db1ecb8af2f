use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::http::{build_client, get_json_with_retry, RetryPolicy};
use super::traits::{RateSource, SourceRates};
use crate::config::{HubConfig, ENV_API_KEY};
use crate::errors::CoreError;
use crate::models::rates::{is_valid_rate, PairKey, RateMap};

/// ExchangeRate-API v6 for fiat rates.
///
/// - **Requires**: API key (`EXCHANGERATE_API_KEY`), embedded in the path.
/// - **Endpoint**: `/{key}/latest/{BASE}`
///
/// The API quotes BASE → CURRENCY; rates are stored as CURRENCY → BASE,
/// so every value is inverted.
pub struct ExchangeRateSource {
    client: Client,
    url: String,
    api_key: Option<String>,
    base: String,
    currencies: Vec<String>,
    retry: RetryPolicy,
}

impl ExchangeRateSource {
    pub const ID: &'static str = "exchangerate";

    pub fn new(config: &HubConfig) -> Self {
        Self {
            client: build_client(config.request_timeout()),
            url: config.exchangerate_url.trim_end_matches('/').to_string(),
            api_key: config
                .exchangerate_api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            base: config.base(),
            currencies: config
                .fiat_currencies
                .iter()
                .map(|c| c.trim().to_uppercase())
                .collect(),
            retry: RetryPolicy::from_config(config),
        }
    }

    fn parse(&self, body: &Value) -> Result<RateMap, CoreError> {
        if body.get("result").and_then(Value::as_str) != Some("success") {
            let error_type = body
                .get("error-type")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(CoreError::Api {
                provider: "ExchangeRate-API".into(),
                message: format!("API returned an error: {error_type}"),
            });
        }

        let empty = serde_json::Map::new();
        let conversion = body
            .get("conversion_rates")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let mut rates = RateMap::new();
        for code in &self.currencies {
            let Some(raw) = conversion.get(code).and_then(as_number) else {
                continue;
            };
            if !is_valid_rate(raw) {
                continue;
            }
            let inverted = 1.0 / raw;
            if is_valid_rate(inverted) {
                rates.insert(PairKey::new(code, &self.base)?, inverted);
            }
        }
        Ok(rates)
    }
}

/// Accept numbers and numeric strings.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl RateSource for ExchangeRateSource {
    fn id(&self) -> &str {
        Self::ID
    }

    fn display_name(&self) -> &str {
        "ExchangeRate-API"
    }

    async fn fetch_rates(&self) -> Result<SourceRates, CoreError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            CoreError::Config(format!(
                "{ENV_API_KEY} is not set; ExchangeRate-API requires an API key"
            ))
        })?;

        let url = format!("{}/{api_key}/latest/{}", self.url, self.base);
        let (body, meta) =
            get_json_with_retry(&self.client, "ExchangeRate-API", &url, &[], self.retry).await?;
        let rates = self.parse(&body)?;
        Ok(SourceRates { rates, meta })
    }
}
