// ═══════════════════════════════════════════════════════════════════
// Integration Tests — ValutaHub facade end to end over a temp data dir
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use valuta_hub_core::config::HubConfig;
use valuta_hub_core::errors::CoreError;
use valuta_hub_core::models::rates::{HistoryMeta, PairKey};
use valuta_hub_core::providers::registry::RateSourceRegistry;
use valuta_hub_core::providers::traits::{RateSource, SourceRates};
use valuta_hub_core::services::resolver::{RateOrigin, RefreshPolicy};
use valuta_hub_core::ValutaHub;

// ═══════════════════════════════════════════════════════════════════
// Mock Source (for testing without real API calls)
// ═══════════════════════════════════════════════════════════════════

struct MockSource {
    id: &'static str,
    rates: &'static [(&'static str, f64)],
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl RateSource for MockSource {
    fn id(&self) -> &str {
        self.id
    }

    fn display_name(&self) -> &str {
        self.id
    }

    async fn fetch_rates(&self) -> Result<SourceRates, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SourceRates {
            rates: self
                .rates
                .iter()
                .map(|(k, r)| (PairKey::parse(k).unwrap(), *r))
                .collect(),
            meta: HistoryMeta::default(),
        })
    }
}

const CRYPTO: &[(&str, f64)] = &[("BTC_USD", 50000.0), ("ETH_USD", 2500.0), ("SOL_USD", 150.0)];
const FIAT: &[(&str, f64)] = &[("EUR_USD", 1.25), ("GBP_USD", 1.3)];

fn config_in(dir: &tempfile::TempDir) -> HubConfig {
    HubConfig {
        data_dir: dir.path().to_path_buf(),
        ..HubConfig::default()
    }
}

/// A hub over `dir` with mock sources, plus the total fetch counter.
fn hub_in(dir: &tempfile::TempDir) -> (ValutaHub, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = RateSourceRegistry::new();
    registry.register(Box::new(MockSource {
        id: "coingecko",
        rates: CRYPTO,
        calls: Arc::clone(&calls),
    }));
    registry.register(Box::new(MockSource {
        id: "exchangerate",
        rates: FIAT,
        calls: Arc::clone(&calls),
    }));
    let hub = ValutaHub::with_registry(config_in(dir), registry).unwrap();
    (hub, calls)
}

fn logged_in_hub(dir: &tempfile::TempDir) -> (ValutaHub, Arc<AtomicUsize>) {
    let (hub, calls) = hub_in(dir);
    hub.register("alice", "pass1234").unwrap();
    hub.login("alice", "pass1234").unwrap();
    (hub, calls)
}

// ═══════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════

mod session {
    use super::*;

    #[test]
    fn commands_require_login() {
        let dir = tempfile::tempdir().unwrap();
        let (hub, _) = hub_in(&dir);
        hub.register("alice", "pass1234").unwrap();

        assert!(matches!(hub.whoami(), Err(CoreError::NotLoggedIn)));
        assert!(matches!(hub.deposit(10.0), Err(CoreError::NotLoggedIn)));
        assert!(matches!(hub.portfolio(), Err(CoreError::NotLoggedIn)));
    }

    #[test]
    fn session_survives_new_hub_instance() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (hub, _) = logged_in_hub(&dir);
            hub.deposit(50.0).unwrap();
        }

        let (hub, _) = hub_in(&dir);
        let session = hub.whoami().unwrap();
        assert_eq!(session.username, "alice");
        assert_eq!(hub.portfolio().unwrap().get_wallet("USD").unwrap().balance(), 50.0);

        assert!(hub.logout().unwrap());
        let (fresh, _) = hub_in(&dir);
        assert!(matches!(fresh.whoami(), Err(CoreError::NotLoggedIn)));
    }

    #[test]
    fn change_password_for_current_user() {
        let dir = tempfile::tempdir().unwrap();
        let (hub, _) = logged_in_hub(&dir);
        hub.change_password("pass1234", "better-pass").unwrap();
        hub.logout().unwrap();
        assert!(matches!(
            hub.login("alice", "pass1234"),
            Err(CoreError::InvalidPassword)
        ));
        hub.login("alice", "better-pass").unwrap();
    }

    #[test]
    fn second_user_gets_own_portfolio() {
        let dir = tempfile::tempdir().unwrap();
        let (hub, _) = logged_in_hub(&dir);
        hub.deposit(100.0).unwrap();

        let bob = hub.register("bob", "bobpass1").unwrap();
        assert_eq!(bob.user_id, 2);
        hub.login("bob", "bobpass1").unwrap();
        assert_eq!(hub.portfolio().unwrap().get_wallet("USD").unwrap().balance(), 0.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Rates
// ═══════════════════════════════════════════════════════════════════

mod rates {
    use super::*;

    #[tokio::test]
    async fn update_then_query_offline() {
        let dir = tempfile::tempdir().unwrap();
        let (hub, calls) = hub_in(&dir);

        let report = hub.update_rates(None).await.unwrap();
        assert!(report.ok);
        assert_eq!(report.updated_pairs, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(dir.path().join("rates.json").exists());
        assert_eq!(hub.rates_history().len(), 5);
        assert_eq!(hub.rates_snapshot().source.as_deref(), Some("multiple"));

        let rate = hub.get_rate("btc", "eur", RefreshPolicy::CacheOnly).await.unwrap();
        assert_eq!(rate.origin, RateOrigin::Triangulated);
        assert!((rate.rate - 40000.0).abs() < 1e-6);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn get_rate_refreshes_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (hub, calls) = hub_in(&dir);

        assert!(matches!(
            hub.get_rate("ETH", "USD", RefreshPolicy::CacheOnly).await,
            Err(CoreError::RateUnavailable { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let rate = hub.get_rate("ETH", "USD", RefreshPolicy::RefreshOnMiss).await.unwrap();
        assert_eq!(rate.rate, 2500.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_currency_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (hub, calls) = hub_in(&dir);
        match hub.get_rate("USD", "DOGE", RefreshPolicy::RefreshOnMiss).await {
            Err(CoreError::CurrencyNotFound(code)) => assert_eq!(code, "DOGE"),
            other => panic!("Expected CurrencyNotFound, got: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_source_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (hub, _) = hub_in(&dir);
        assert!(matches!(
            hub.update_rates(Some("bogus")).await,
            Err(CoreError::Config(_))
        ));
    }

    #[tokio::test]
    async fn show_rates_after_update() {
        let dir = tempfile::tempdir().unwrap();
        let (hub, _) = hub_in(&dir);
        assert!(hub.show_rates(None, None, "USD").is_err());

        hub.update_rates(None).await.unwrap();
        let all = hub.show_rates(None, None, "USD").unwrap();
        assert_eq!(all.len(), 5);

        let top = hub.show_rates(None, Some(1), "USD").unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].pair, "BTC_USD");

        let eth = hub.show_rates(Some("eth"), None, "EUR").unwrap();
        assert_eq!(eth[0].pair, "ETH_EUR");
        assert!((eth[0].rate - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn currencies_listed() {
        let dir = tempfile::tempdir().unwrap();
        let (hub, _) = hub_in(&dir);
        assert_eq!(hub.list_currencies().len(), 9);
        assert_eq!(hub.get_currency("sol").unwrap().code(), "SOL");
    }

    #[tokio::test]
    async fn scheduler_uses_configured_interval() {
        let dir = tempfile::tempdir().unwrap();
        let (hub, calls) = hub_in(&dir);
        assert_eq!(hub.scheduler(None).interval(), Duration::from_secs(300));

        let scheduler = hub.scheduler(Some(Duration::from_secs(3600)));
        let report = scheduler.run_once().await.unwrap();
        assert!(report.ok);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Trading
// ═══════════════════════════════════════════════════════════════════

mod trading {
    use super::*;

    #[tokio::test]
    async fn deposit_buy_sell_summary() {
        let dir = tempfile::tempdir().unwrap();
        let (hub, calls) = logged_in_hub(&dir);
        hub.deposit(10000.0).unwrap();

        // Empty cache: the buy triggers one refresh
        let bought = hub.buy("BTC", 0.1, RefreshPolicy::RefreshOnMiss).await.unwrap();
        assert_eq!(bought.rate, 50000.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let sold = hub.sell("btc", 0.05, RefreshPolicy::CacheOnly).await.unwrap();
        assert!((sold.usd_amount - 2500.0).abs() < 1e-9);
        assert!((sold.usd_balance - 7500.0).abs() < 1e-9);

        let summary = hub.portfolio_summary("USD", RefreshPolicy::CacheOnly).await.unwrap();
        assert!((summary.total - 10000.0).abs() < 1e-6);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let portfolio = hub.portfolio().unwrap();
        assert_eq!(portfolio.wallets.len(), 2);
    }

    #[tokio::test]
    async fn offline_buy_with_empty_cache_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let (hub, calls) = logged_in_hub(&dir);
        hub.deposit(100.0).unwrap();

        assert!(matches!(
            hub.buy("ETH", 1.0, RefreshPolicy::CacheOnly).await,
            Err(CoreError::RateUnavailable { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(hub.portfolio().unwrap().wallets.len(), 1);
    }

    #[tokio::test]
    async fn sell_more_than_held() {
        let dir = tempfile::tempdir().unwrap();
        let (hub, _) = logged_in_hub(&dir);
        hub.update_rates(None).await.unwrap();
        hub.deposit(5000.0).unwrap();
        hub.buy("ETH", 1.0, RefreshPolicy::CacheOnly).await.unwrap();

        assert!(matches!(
            hub.sell("ETH", 2.0, RefreshPolicy::CacheOnly).await,
            Err(CoreError::InsufficientFunds { .. })
        ));
        let eth = hub.portfolio().unwrap().get_wallet("ETH").unwrap().balance();
        assert_eq!(eth, 1.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Construction
// ═══════════════════════════════════════════════════════════════════

mod construction {
    use super::*;

    #[test]
    fn invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = HubConfig {
            rates_ttl_seconds: 0,
            ..config_in(&dir)
        };
        assert!(matches!(
            ValutaHub::with_registry(config, RateSourceRegistry::new()),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn default_sources_registered() {
        let dir = tempfile::tempdir().unwrap();
        let hub = ValutaHub::new(config_in(&dir)).unwrap();
        let debug = format!("{hub:?}");
        assert!(debug.contains("coingecko"));
        assert!(debug.contains("exchangerate"));
        assert_eq!(hub.config().data_dir, dir.path());
    }
}
