use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::CoreError;
use crate::models::rates::{RateMap, MULTIPLE_SOURCES};
use crate::providers::registry::RateSourceRegistry;
use crate::storage::rates::RatesStorage;

/// Outcome of one update cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateReport {
    /// At least one selected source succeeded and at least one pair was stored.
    pub ok: bool,
    pub updated_pairs: usize,
    pub history_added: usize,
    pub failed_sources: Vec<String>,
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Pulls rates from the registered sources and persists them.
///
/// Sources are fetched one after another. A failing source is logged and
/// recorded in the report; the others still contribute. The snapshot is
/// only rewritten when at least one pair was fetched, so a cycle where
/// every source fails leaves `rates.json` untouched.
pub struct RatesUpdater {
    registry: RateSourceRegistry,
    storage: RatesStorage,
}

impl RatesUpdater {
    pub fn new(registry: RateSourceRegistry, storage: RatesStorage) -> Self {
        Self { registry, storage }
    }

    pub fn storage(&self) -> &RatesStorage {
        &self.storage
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.registry.ids()
    }

    /// Run one cycle over every source, or only `source` when given.
    ///
    /// An unknown `source` is a config error raised before any I/O.
    pub async fn run_update(&self, source: Option<&str>) -> Result<UpdateReport, CoreError> {
        let selected = self.registry.select(source)?;
        tracing::info!(source = source.unwrap_or("all"), "Starting rates update");

        let mut all_rates = RateMap::new();
        let mut failed_sources = Vec::new();
        let mut history_added = 0;

        for src in &selected {
            match src.fetch_rates().await {
                Ok(fetched) => {
                    let count = fetched.rates.len();
                    match self.storage.save_historical_record(
                        &fetched.rates,
                        src.id(),
                        None,
                        fetched.meta,
                    ) {
                        Ok(added) => {
                            history_added += added;
                            tracing::info!(
                                source = src.id(),
                                pairs = count,
                                request_ms = fetched.meta.request_ms,
                                "Source updated"
                            );
                        }
                        Err(e) => {
                            tracing::error!(source = src.id(), error = %e, "Failed to append history");
                            failed_sources.push(src.id().to_string());
                        }
                    }
                    // Fetched rates reach the snapshot even when history fails.
                    all_rates.extend(fetched.rates);
                }
                Err(e) => {
                    tracing::error!(source = src.id(), error = %e, "Source update failed");
                    failed_sources.push(src.id().to_string());
                }
            }
        }

        let updated_pairs = all_rates.len();
        let mut last_refresh = None;
        if !all_rates.is_empty() {
            let tag = match source {
                Some(_) if selected.len() == 1 => selected[0].id(),
                _ => MULTIPLE_SOURCES,
            };
            last_refresh = Some(self.storage.save_current_rates(&all_rates, tag, None)?);
            tracing::info!(
                pairs = updated_pairs,
                path = %self.storage.rates_path().display(),
                "Rates snapshot written"
            );
        }

        let ok = failed_sources.len() < selected.len() && updated_pairs > 0;
        Ok(UpdateReport {
            ok,
            updated_pairs,
            history_added,
            failed_sources,
            last_refresh,
        })
    }
}
