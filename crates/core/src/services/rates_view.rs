use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::CoreError;
use crate::models::rates::RatesSnapshot;
use crate::models::wallet::USD;

/// One line of the `show-rates` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    /// `"{FROM}_{BASE}"`
    pub pair: String,
    pub from_code: String,
    pub rate: f64,
    pub updated_at: DateTime<Utc>,
    pub source: String,
}

/// Build the rows shown by `show-rates` from the cached snapshot.
///
/// Every cached `X_USD` pair is re-based to `base` through `{BASE}_USD`.
/// `currency` keeps only rows mentioning that code; `top` keeps the
/// highest-rated cryptocurrencies (by `crypto_codes`) in descending order.
pub fn compute_display_rows(
    snapshot: &RatesSnapshot,
    currency: Option<&str>,
    top: Option<usize>,
    base: &str,
    crypto_codes: &[String],
) -> Result<Vec<DisplayRow>, CoreError> {
    if snapshot.is_empty() {
        return Err(CoreError::ValidationError(
            "Local rates cache is empty; run `update-rates` first".into(),
        ));
    }

    let base = base.trim().to_uppercase();
    let filter = currency.map(|c| c.trim().to_uppercase());

    let base_usd = if base == USD {
        1.0
    } else {
        snapshot
            .lookup(&base, USD)
            .map(|e| e.rate)
            .ok_or_else(|| CoreError::RateUnavailable {
                from: base.clone(),
                to: USD.to_string(),
            })?
    };

    let mut rows: Vec<DisplayRow> = snapshot
        .pairs
        .iter()
        .filter(|(pair, _)| pair.to_code() == USD)
        .filter(|(pair, _)| {
            filter
                .as_deref()
                .map_or(true, |f| f == pair.from_code() || f == pair.to_code())
        })
        .map(|(pair, entry)| DisplayRow {
            pair: format!("{}_{base}", pair.from_code()),
            from_code: pair.from_code().to_string(),
            rate: entry.rate / base_usd,
            updated_at: entry.updated_at,
            source: entry.source.clone(),
        })
        .collect();

    if let Some(top) = top {
        rows.retain(|row| {
            crypto_codes
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&row.from_code))
        });
        rows.sort_by(|a, b| b.rate.total_cmp(&a.rate));
        rows.truncate(top);
    }

    if rows.is_empty() {
        return Err(match filter {
            Some(code) => CoreError::RateUnavailable {
                from: code,
                to: base,
            },
            None => CoreError::ValidationError("No rates found in the local cache".into()),
        });
    }
    Ok(rows)
}
