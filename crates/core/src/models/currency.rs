use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// The category of a tradable currency.
/// Determines which rate source quotes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrencyKind {
    /// Government-issued money (USD, EUR, ...) — quoted by ExchangeRate-API
    Fiat,
    /// Cryptocurrencies (BTC, ETH, ...) — quoted by CoinGecko
    Crypto,
}

impl std::fmt::Display for CurrencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurrencyKind::Fiat => write!(f, "FIAT"),
            CurrencyKind::Crypto => write!(f, "CRYPTO"),
        }
    }
}

/// A currency known to the simulator.
///
/// **Equality and hashing** are based solely on `code`, so two descriptions
/// of the same currency compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Currency {
    Fiat {
        code: String,
        name: String,
        issuing_country: String,
    },
    Crypto {
        code: String,
        name: String,
        algorithm: String,
        market_cap: f64,
    },
}

impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for Currency {}

impl std::hash::Hash for Currency {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.code().hash(state);
    }
}

impl Currency {
    /// Build a fiat currency. The code is validated and upper-cased.
    pub fn fiat(
        code: &str,
        name: impl Into<String>,
        issuing_country: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let name = non_empty(name.into(), "name")?;
        let issuing_country = non_empty(issuing_country.into(), "issuing_country")?;
        Ok(Currency::Fiat {
            code: normalize_code(code)?,
            name,
            issuing_country,
        })
    }

    /// Build a cryptocurrency. `market_cap` must be finite and non-negative.
    pub fn crypto(
        code: &str,
        name: impl Into<String>,
        algorithm: impl Into<String>,
        market_cap: f64,
    ) -> Result<Self, CoreError> {
        let name = non_empty(name.into(), "name")?;
        let algorithm = non_empty(algorithm.into(), "algorithm")?;
        if !market_cap.is_finite() || market_cap < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "market_cap must be a non-negative number, got {market_cap}"
            )));
        }
        Ok(Currency::Crypto {
            code: normalize_code(code)?,
            name,
            algorithm,
            market_cap,
        })
    }

    pub fn code(&self) -> &str {
        match self {
            Currency::Fiat { code, .. } | Currency::Crypto { code, .. } => code,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Currency::Fiat { name, .. } | Currency::Crypto { name, .. } => name,
        }
    }

    pub fn kind(&self) -> CurrencyKind {
        match self {
            Currency::Fiat { .. } => CurrencyKind::Fiat,
            Currency::Crypto { .. } => CurrencyKind::Crypto,
        }
    }

    /// One-line description for `list-currencies`.
    pub fn display_info(&self) -> String {
        match self {
            Currency::Fiat {
                code,
                name,
                issuing_country,
            } => format!("[FIAT] {code} — {name} (Issuing: {issuing_country})"),
            Currency::Crypto {
                code,
                name,
                algorithm,
                market_cap,
            } => format!("[CRYPTO] {code} — {name} (Algo: {algorithm}, MCAP: {market_cap:.2e})"),
        }
    }
}

/// Validate and normalize a currency code: trimmed, upper-cased,
/// 2–5 ASCII letters with no whitespace.
pub fn normalize_code(raw: &str) -> Result<String, CoreError> {
    let code = raw.trim().to_uppercase();
    if code.contains(char::is_whitespace) {
        return Err(CoreError::ValidationError(format!(
            "Currency code '{code}' must not contain spaces"
        )));
    }
    if !(2..=5).contains(&code.len()) {
        return Err(CoreError::ValidationError(format!(
            "Currency code '{code}' must be 2–5 characters long"
        )));
    }
    if !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::ValidationError(format!(
            "Currency code '{code}' must contain only Latin letters (e.g. USD, EUR, BTC)"
        )));
    }
    Ok(code)
}

fn non_empty(value: String, field: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::ValidationError(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Static registry of the currencies the simulator can trade.
#[derive(Debug, Clone)]
pub struct CurrencyRegistry {
    currencies: Vec<Currency>,
}

impl CurrencyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            currencies: Vec::new(),
        }
    }

    /// The built-in set: six fiat currencies and three cryptocurrencies.
    pub fn with_defaults() -> Self {
        let defaults = [
            Currency::fiat("USD", "US Dollar", "United States"),
            Currency::fiat("EUR", "Euro", "Eurozone"),
            Currency::fiat("RUB", "Russian Ruble", "Russian Federation"),
            Currency::fiat("GBP", "British Pound", "United Kingdom"),
            Currency::fiat("JPY", "Japanese Yen", "Japan"),
            Currency::fiat("CNY", "Chinese Yuan", "China"),
            Currency::crypto("BTC", "Bitcoin", "SHA-256", 1.12e12),
            Currency::crypto("ETH", "Ethereum", "Ethash", 4.5e11),
            Currency::crypto("SOL", "Solana", "Proof of History", 8.0e10),
        ];
        let mut registry = Self::new();
        for currency in defaults.into_iter().flatten() {
            registry.register(currency);
        }
        registry
    }

    /// Register a currency, replacing any previous entry with the same code.
    pub fn register(&mut self, currency: Currency) {
        if let Some(existing) = self
            .currencies
            .iter_mut()
            .find(|c| c.code() == currency.code())
        {
            *existing = currency;
        } else {
            self.currencies.push(currency);
        }
    }

    /// Look up a currency by code (case-insensitive, whitespace-trimmed).
    pub fn get(&self, code: &str) -> Result<&Currency, CoreError> {
        let key = code.trim().to_uppercase();
        self.currencies
            .iter()
            .find(|c| c.code() == key)
            .ok_or(CoreError::CurrencyNotFound(key))
    }

    /// All registered currencies sorted by code.
    pub fn all(&self) -> Vec<&Currency> {
        let mut all: Vec<&Currency> = self.currencies.iter().collect();
        all.sort_by(|a, b| a.code().cmp(b.code()));
        all
    }

    /// Codes of every registered currency of the given kind, sorted.
    pub fn codes_of_kind(&self, kind: CurrencyKind) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|c| c.kind() == kind)
            .map(|c| c.code().to_string())
            .collect()
    }
}

impl Default for CurrencyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
