use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use super::updater::RatesUpdater;
use crate::errors::CoreError;
use crate::models::rates::{PairKey, RateEntry, RatesSnapshot};
use crate::models::wallet::USD;
use crate::storage::rates::RatesStorage;

/// Whether a lookup may trigger network I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Answer from the local cache only.
    #[default]
    CacheOnly,
    /// On a cache miss, run one full update cycle and look again.
    RefreshOnMiss,
}

/// How a resolved rate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RateOrigin {
    /// `from == to`
    Identity,
    /// Cached `FROM_TO` entry.
    Direct,
    /// Reciprocal of a cached `TO_FROM` entry.
    Inverse,
    /// `FROM_USD / TO_USD`.
    Triangulated,
}

impl std::fmt::Display for RateOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateOrigin::Identity => write!(f, "identity"),
            RateOrigin::Direct => write!(f, "direct"),
            RateOrigin::Inverse => write!(f, "inverse"),
            RateOrigin::Triangulated => write!(f, "via USD"),
        }
    }
}

/// A rate answered by [`RateResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRate {
    pub from: String,
    pub to: String,
    pub rate: f64,
    /// Age of the underlying cache data (oldest leg when triangulated).
    pub updated_at: Option<DateTime<Utc>>,
    pub origin: RateOrigin,
}

impl ResolvedRate {
    /// Rate of the opposite direction (`to → from`).
    pub fn reverse_rate(&self) -> f64 {
        if self.rate == 0.0 {
            0.0
        } else {
            1.0 / self.rate
        }
    }
}

/// `true` when the entry is no older than `ttl_secs` at `now`.
/// Compared at full precision, so 3600.9 s is past a 3600 s TTL.
pub fn is_fresh(updated_at: DateTime<Utc>, ttl_secs: u64, now: DateTime<Utc>) -> bool {
    let age = now.signed_duration_since(updated_at);
    i64::try_from(ttl_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .map_or(true, |ttl| age <= ttl)
}

/// Answers "what is the rate from X to Y" from the cached snapshot.
///
/// Lookup order: identity, fresh direct pair, fresh inverse pair, optional
/// refresh (see [`RefreshPolicy`]), then triangulation through USD.
/// Derived rates are never written back to the cache.
pub struct RateResolver {
    storage: RatesStorage,
    updater: Option<Arc<RatesUpdater>>,
    ttl_secs: u64,
}

impl RateResolver {
    pub fn new(storage: RatesStorage, ttl_secs: u64) -> Self {
        Self {
            storage,
            updater: None,
            ttl_secs,
        }
    }

    /// Attach the updater used by [`RefreshPolicy::RefreshOnMiss`].
    pub fn with_updater(mut self, updater: Arc<RatesUpdater>) -> Self {
        self.updater = Some(updater);
        self
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Current snapshot as stored on disk.
    pub fn snapshot(&self) -> RatesSnapshot {
        self.storage.load_current_rates()
    }

    pub async fn resolve(
        &self,
        from: &str,
        to: &str,
        policy: RefreshPolicy,
        ttl_override: Option<u64>,
    ) -> Result<ResolvedRate, CoreError> {
        let pair = PairKey::new(from, to)?;
        let (from, to) = (pair.from_code().to_string(), pair.to_code().to_string());
        if from == to {
            return Ok(ResolvedRate {
                from,
                to,
                rate: 1.0,
                updated_at: None,
                origin: RateOrigin::Identity,
            });
        }

        let ttl = ttl_override.unwrap_or(self.ttl_secs);
        let mut snapshot = self.storage.load_current_rates();
        if let Some(found) = lookup_cached(&snapshot, &pair, ttl, Utc::now()) {
            return Ok(found);
        }

        let mut refreshed = false;
        if policy == RefreshPolicy::RefreshOnMiss {
            match &self.updater {
                Some(updater) => {
                    tracing::info!(%pair, "Cache miss, refreshing rates");
                    match updater.run_update(None).await {
                        Ok(report) if !report.ok => tracing::warn!(
                            failed = ?report.failed_sources,
                            "Rates refresh did not update anything"
                        ),
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "Rates refresh failed"),
                    }
                    refreshed = true;
                    snapshot = self.storage.load_current_rates();
                    if let Some(found) = lookup_cached(&snapshot, &pair, ttl, Utc::now()) {
                        return Ok(found);
                    }
                }
                None => tracing::debug!("No updater attached, refresh skipped"),
            }
        }

        triangulate(&snapshot, &pair, ttl, refreshed, Utc::now())
            .ok_or(CoreError::RateUnavailable { from, to })
    }
}

fn lookup_cached(
    snapshot: &RatesSnapshot,
    pair: &PairKey,
    ttl: u64,
    now: DateTime<Utc>,
) -> Option<ResolvedRate> {
    let fresh = |entry: &&RateEntry| is_fresh(entry.updated_at, ttl, now);

    if let Some(entry) = snapshot.get(pair).filter(fresh) {
        return Some(resolved(pair, entry.rate, Some(entry.updated_at), RateOrigin::Direct));
    }
    if let Some(entry) = snapshot.get(&pair.inverse()).filter(fresh) {
        return Some(resolved(
            pair,
            1.0 / entry.rate,
            Some(entry.updated_at),
            RateOrigin::Inverse,
        ));
    }
    None
}

/// `FROM_USD / TO_USD`, with USD legs taken as 1.0. After a refresh any
/// cached leg is accepted; otherwise both legs must be fresh. A single
/// cached leg is reported as the direct or inverse hit it is.
fn triangulate(
    snapshot: &RatesSnapshot,
    pair: &PairKey,
    ttl: u64,
    any_age: bool,
    now: DateTime<Utc>,
) -> Option<ResolvedRate> {
    let leg = |code: &str| -> Option<(f64, Option<DateTime<Utc>>)> {
        if code == USD {
            return Some((1.0, None));
        }
        let entry = snapshot.lookup(code, USD)?;
        if !any_age && !is_fresh(entry.updated_at, ttl, now) {
            return None;
        }
        Some((entry.rate, Some(entry.updated_at)))
    };

    let (from_usd, from_at) = leg(pair.from_code())?;
    let (to_usd, to_at) = leg(pair.to_code())?;
    let rate = from_usd / to_usd;
    if !rate.is_finite() || rate <= 0.0 {
        return None;
    }
    let updated_at = match (from_at, to_at) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    let origin = if pair.to_code() == USD {
        RateOrigin::Direct
    } else if pair.from_code() == USD {
        RateOrigin::Inverse
    } else {
        RateOrigin::Triangulated
    };
    Some(resolved(pair, rate, updated_at, origin))
}

fn resolved(
    pair: &PairKey,
    rate: f64,
    updated_at: Option<DateTime<Utc>>,
    origin: RateOrigin,
) -> ResolvedRate {
    ResolvedRate {
        from: pair.from_code().to_string(),
        to: pair.to_code().to_string(),
        rate,
        updated_at,
        origin,
    }
}
