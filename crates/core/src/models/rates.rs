use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::timestamp;
use crate::errors::CoreError;

/// Source tag used when a snapshot combines rates from more than one source.
pub const MULTIPLE_SOURCES: &str = "multiple";

/// A directed currency pair, written `"{FROM}_{TO}"` (e.g. `BTC_USD`).
///
/// Both codes are 2–10 upper-case ASCII letters. Keys read from disk are
/// validated through [`PairKey::parse`], so a `PairKey` is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PairKey {
    from: String,
    to: String,
}

impl PairKey {
    /// Build a pair from two codes. Codes are trimmed and upper-cased.
    pub fn new(from: &str, to: &str) -> Result<Self, CoreError> {
        let from = from.trim().to_uppercase();
        let to = to.trim().to_uppercase();
        if !is_pair_code(&from) || !is_pair_code(&to) {
            return Err(CoreError::ValidationError(format!(
                "Invalid currency pair '{from}_{to}': codes must be 2–10 letters A–Z"
            )));
        }
        Ok(Self { from, to })
    }

    /// Parse a `"FROM_TO"` key. No normalization: the key must already be upper-case.
    pub fn parse(key: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::ValidationError(format!("Invalid pair key '{key}'"));
        let (from, to) = key.split_once('_').ok_or_else(invalid)?;
        if !is_pair_code(from) || !is_pair_code(to) {
            return Err(invalid());
        }
        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    pub fn from_code(&self) -> &str {
        &self.from
    }

    pub fn to_code(&self) -> &str {
        &self.to
    }

    /// The same pair in the opposite direction.
    pub fn inverse(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

fn is_pair_code(code: &str) -> bool {
    (2..=10).contains(&code.len()) && code.chars().all(|c| c.is_ascii_uppercase())
}

impl std::fmt::Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.from, self.to)
    }
}

impl std::str::FromStr for PairKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PairKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PairKey> for String {
    fn from(key: PairKey) -> Self {
        key.to_string()
    }
}

/// Rates returned by one fetch, keyed by pair.
pub type RateMap = BTreeMap<PairKey, f64>;

/// `true` when `rate` can be stored: finite and strictly positive.
pub fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// One cached rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub rate: f64,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    pub source: String,
}

/// The whole current-rate cache (`rates.json`).
///
/// Persisted and replaced as a single unit by `RatesStorage`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatesSnapshot {
    #[serde(default)]
    pub pairs: BTreeMap<PairKey, RateEntry>,
    #[serde(default, with = "timestamp::option")]
    pub last_refresh: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: Option<String>,
}

impl RatesSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pair: &PairKey) -> Option<&RateEntry> {
        self.pairs.get(pair)
    }

    /// Convenience lookup by codes; invalid codes simply miss.
    pub fn lookup(&self, from: &str, to: &str) -> Option<&RateEntry> {
        let pair = PairKey::new(from, to).ok()?;
        self.pairs.get(&pair)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// HTTP details of the exchange that produced a batch of rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMeta {
    pub request_ms: u64,
    pub status_code: u16,
}

impl Default for HistoryMeta {
    fn default() -> Self {
        Self {
            request_ms: 0,
            status_code: 200,
        }
    }
}

/// One line of the append-only history log (`exchange_rates.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: f64,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub source: String,
    #[serde(default)]
    pub meta: HistoryMeta,
}

impl HistoryRecord {
    /// Id format: `"{FROM}_{TO}_{timestamp}"`.
    pub fn new(
        pair: &PairKey,
        rate: f64,
        at: DateTime<Utc>,
        source: &str,
        meta: HistoryMeta,
    ) -> Self {
        Self {
            id: format!("{pair}_{}", timestamp::format(&at)),
            from_currency: pair.from_code().to_string(),
            to_currency: pair.to_code().to_string(),
            rate,
            timestamp: at,
            source: source.to_string(),
            meta,
        }
    }
}
