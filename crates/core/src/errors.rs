use thiserror::Error;

/// Unified error type for the entire valuta-hub-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Storage / File ──────────────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Configuration ───────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API request failed ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    // ── Rates ───────────────────────────────────────────────────────
    #[error("Unknown currency '{0}'")]
    CurrencyNotFound(String),

    #[error("Rate service unavailable for {from}→{to}")]
    RateUnavailable {
        from: String,
        to: String,
    },

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Insufficient funds: available {available} {code}, required {required} {code}")]
    InsufficientFunds {
        available: f64,
        required: f64,
        code: String,
    },

    #[error("Validation failed: {0}")]
    ValidationError(String),

    // ── Users / Session ─────────────────────────────────────────────
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("User '{0}' not found")]
    UserNotFound(String),

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Not logged in — run `login` first")]
    NotLoggedIn,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(e: toml::de::Error) -> Self {
        CoreError::Config(format!("Invalid config file: {e}"))
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        CoreError::Network(redact_url(&e.to_string()))
    }
}

/// Strip query parameters and the ExchangeRate-API key segment from a message
/// so that secrets never end up in logs or error output.
pub(crate) fn redact_url(msg: &str) -> String {
    let without_query = match msg.find('?') {
        Some(idx) => format!("{}?<query redacted>", &msg[..idx]),
        None => msg.to_string(),
    };
    // ExchangeRate-API puts the key in the path: /v6/{key}/latest/{base}
    match (without_query.find("/v6/"), without_query.find("/latest/")) {
        (Some(start), Some(end)) if start + 4 < end => format!(
            "{}/v6/<key redacted>{}",
            &without_query[..start],
            &without_query[end..]
        ),
        _ => without_query,
    }
}

#[cfg(test)]
mod tests {
    use super::redact_url;

    #[test]
    fn redacts_query_string() {
        let msg = "error sending request for url (https://api.example.com/price?ids=bitcoin&key=abc)";
        assert_eq!(
            redact_url(msg),
            "error sending request for url (https://api.example.com/price?<query redacted>"
        );
    }

    #[test]
    fn redacts_exchangerate_key_segment() {
        let msg = "HTTP 403 for https://v6.exchangerate-api.com/v6/SECRET123/latest/USD";
        let out = redact_url(msg);
        assert!(!out.contains("SECRET123"));
        assert!(out.ends_with("/v6/<key redacted>/latest/USD"));
    }

    #[test]
    fn leaves_plain_messages_alone() {
        assert_eq!(redact_url("connection refused"), "connection refused");
    }
}
