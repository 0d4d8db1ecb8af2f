use crate::errors::CoreError;

/// Tracing target for the domain action log.
pub const ACTIONS_TARGET: &str = "valuta_hub::actions";

/// Fields recorded for one user-facing action (REGISTER, LOGIN, BUY, ...).
#[derive(Debug, Clone, Default)]
pub struct ActionRecord<'a> {
    pub action: &'a str,
    pub user_id: Option<u64>,
    pub username: Option<&'a str>,
    pub currency: Option<&'a str>,
    pub amount: Option<f64>,
    pub rate: Option<f64>,
    pub base: Option<&'a str>,
}

impl<'a> ActionRecord<'a> {
    pub fn new(action: &'a str) -> Self {
        Self {
            action,
            ..Self::default()
        }
    }
}

/// Emit one structured `info` event describing the action and its outcome.
///
/// Failures are logged and left for the caller to propagate.
pub fn log_action<T>(record: &ActionRecord<'_>, result: &Result<T, CoreError>) {
    let error = result.as_ref().err().map(ToString::to_string);
    tracing::info!(
        target: ACTIONS_TARGET,
        action = record.action,
        user_id = record.user_id,
        username = record.username,
        currency = record.currency,
        amount = record.amount,
        rate = record.rate,
        base = record.base,
        result = if result.is_ok() { "OK" } else { "ERROR" },
        error = error.as_deref(),
    );
}
