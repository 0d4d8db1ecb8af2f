use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::atomic::write_json_atomic;
use crate::errors::CoreError;
use crate::models::rates::{
    is_valid_rate, HistoryMeta, HistoryRecord, PairKey, RateEntry, RateMap, RatesSnapshot,
    MULTIPLE_SOURCES,
};
use crate::models::timestamp;

/// Owner of the current-rate snapshot and the append-only history log.
///
/// Both files are whole-file JSON; every write replaces the file atomically.
/// Reads are lenient: a missing or corrupt file is an empty cache, and
/// individual entries that fail validation are dropped.
#[derive(Debug, Clone)]
pub struct RatesStorage {
    rates_path: PathBuf,
    history_path: PathBuf,
}

impl RatesStorage {
    pub fn new(rates_path: impl Into<PathBuf>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            rates_path: rates_path.into(),
            history_path: history_path.into(),
        }
    }

    pub fn rates_path(&self) -> &Path {
        &self.rates_path
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    // ── Current snapshot ────────────────────────────────────────────

    /// Load the snapshot. Never fails: problems yield an empty snapshot.
    pub fn load_current_rates(&self) -> RatesSnapshot {
        match read_value(&self.rates_path) {
            Some(value) => snapshot_from_value(&value),
            None => RatesSnapshot::new(),
        }
    }

    /// Write `rates` into the snapshot and return the refresh timestamp.
    ///
    /// A single-source update on top of an existing cache keeps the other
    /// pairs and tags the snapshot `"multiple"`; otherwise the pair map is
    /// replaced wholesale.
    pub fn save_current_rates(
        &self,
        rates: &RateMap,
        source: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<DateTime<Utc>, CoreError> {
        let at = at.unwrap_or_else(timestamp::now);
        let existing = self.load_current_rates();

        let (mut pairs, effective_source) = if source != MULTIPLE_SOURCES && !existing.is_empty() {
            (existing.pairs, MULTIPLE_SOURCES.to_string())
        } else {
            (Default::default(), source.to_string())
        };

        for (pair, &rate) in rates {
            if !is_valid_rate(rate) {
                tracing::warn!(%pair, rate, "Skipping invalid rate");
                continue;
            }
            pairs.insert(
                pair.clone(),
                RateEntry {
                    rate,
                    updated_at: at,
                    source: source.to_string(),
                },
            );
        }

        let snapshot = RatesSnapshot {
            pairs,
            last_refresh: Some(at),
            source: Some(effective_source),
        };
        write_json_atomic(&self.rates_path, &snapshot)?;
        tracing::debug!(
            path = %self.rates_path.display(),
            pairs = snapshot.len(),
            "Saved rates snapshot"
        );
        Ok(at)
    }

    // ── History ─────────────────────────────────────────────────────

    /// Append one history record per pair. Returns how many were written.
    pub fn save_historical_record(
        &self,
        rates: &RateMap,
        source: &str,
        at: Option<DateTime<Utc>>,
        meta: HistoryMeta,
    ) -> Result<usize, CoreError> {
        if rates.is_empty() {
            return Ok(0);
        }
        let at = at.unwrap_or_else(timestamp::now);
        let records: Vec<HistoryRecord> = rates
            .iter()
            .filter(|(_, rate)| is_valid_rate(**rate))
            .map(|(pair, &rate)| HistoryRecord::new(pair, rate, at, source, meta))
            .collect();
        self.append_history(&records)
    }

    /// Append records to the history file.
    ///
    /// Existing entries are kept verbatim, including ones this version
    /// cannot parse.
    pub fn append_history(&self, records: &[HistoryRecord]) -> Result<usize, CoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut raw = self.load_raw_history();
        for record in records {
            raw.push(serde_json::to_value(record).map_err(|e| {
                CoreError::Serialization(format!("History record {}: {e}", record.id))
            })?);
        }
        write_json_atomic(&self.history_path, &raw)?;
        Ok(records.len())
    }

    /// Typed history, oldest first. Unparsable records are skipped.
    pub fn load_history(&self) -> Vec<HistoryRecord> {
        self.load_raw_history()
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    }

    fn load_raw_history(&self) -> Vec<Value> {
        match read_value(&self.history_path) {
            Some(Value::Array(items)) => items,
            // Legacy shape: {"records": [...]}
            Some(Value::Object(mut map)) => match map.remove("records") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}

fn read_value(path: &Path) -> Option<Value> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read rates file");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring corrupt rates file");
            None
        }
    }
}

fn snapshot_from_value(value: &Value) -> RatesSnapshot {
    let mut snapshot = RatesSnapshot::new();
    let Some(obj) = value.as_object() else {
        return snapshot;
    };

    if let Some(pairs) = obj.get("pairs").and_then(Value::as_object) {
        for (key, raw) in pairs {
            let Ok(pair) = PairKey::parse(key) else {
                tracing::debug!(key, "Dropping entry with invalid pair key");
                continue;
            };
            match serde_json::from_value::<RateEntry>(raw.clone()) {
                Ok(entry) if is_valid_rate(entry.rate) => {
                    snapshot.pairs.insert(pair, entry);
                }
                _ => tracing::debug!(key, "Dropping malformed rate entry"),
            }
        }
    }

    snapshot.last_refresh = obj
        .get("last_refresh")
        .and_then(Value::as_str)
        .and_then(timestamp::parse);
    snapshot.source = obj
        .get("source")
        .and_then(Value::as_str)
        .map(str::to_string);
    snapshot
}
