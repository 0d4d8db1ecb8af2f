use crate::config::HubConfig;
use crate::errors::CoreError;

use super::coingecko::CoinGeckoSource;
use super::exchangerate::ExchangeRateSource;
use super::traits::RateSource;

/// Ordered set of rate sources the updater can pull from.
///
/// New sources can be added without modifying the updater.
pub struct RateSourceRegistry {
    sources: Vec<Box<dyn RateSource>>,
}

impl RateSourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// CoinGecko (crypto) followed by ExchangeRate-API (fiat).
    ///
    /// ExchangeRate-API is registered even without an API key; it then
    /// fails fast with a config error when fetched.
    pub fn with_defaults(config: &HubConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(CoinGeckoSource::new(config)));
        registry.register(Box::new(ExchangeRateSource::new(config)));
        registry
    }

    /// Register a source. A source with the same id replaces the old one.
    pub fn register(&mut self, source: Box<dyn RateSource>) {
        if let Some(existing) = self.sources.iter_mut().find(|s| s.id() == source.id()) {
            *existing = source;
        } else {
            self.sources.push(source);
        }
    }

    /// Ids of all registered sources, in registration order.
    pub fn ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// `None` selects every source; a name is trimmed and lower-cased.
    pub fn select(&self, name: Option<&str>) -> Result<Vec<&dyn RateSource>, CoreError> {
        let Some(name) = name else {
            return Ok(self.sources.iter().map(|s| s.as_ref()).collect());
        };
        let wanted = name.trim().to_lowercase();
        self.sources
            .iter()
            .find(|s| s.id() == wanted)
            .map(|s| vec![s.as_ref()])
            .ok_or_else(|| {
                let valid = self
                    .ids()
                    .iter()
                    .map(|id| format!("'{id}'"))
                    .collect::<Vec<_>>()
                    .join(" or ");
                CoreError::Config(format!("Unknown rate source '{wanted}'. Use {valid}"))
            })
    }
}

impl Default for RateSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
