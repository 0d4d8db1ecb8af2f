use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::rates::{HistoryMeta, RateMap};

/// Rates returned by one source, plus the HTTP details of the exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRates {
    /// `"{CODE}_{BASE}"` → rate.
    pub rates: RateMap,
    pub meta: HistoryMeta,
}

/// Trait abstraction for all exchange-rate sources.
///
/// Each upstream API (CoinGecko, ExchangeRate-API) implements this trait.
/// The updater only ever talks to `dyn RateSource`, so tests can swap in
/// mock sources without touching the network.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Stable lower-case id used for selection and as the source tag on
    /// stored rates (e.g. `"coingecko"`).
    fn id(&self) -> &str;

    /// Human-readable name (for logs/errors).
    fn display_name(&self) -> &str;

    /// Fetch the latest rates of every configured currency against the base.
    async fn fetch_rates(&self) -> Result<SourceRates, CoreError>;
}
