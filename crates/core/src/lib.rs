pub mod config;
pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use config::HubConfig;
use errors::CoreError;
use models::{
    currency::{Currency, CurrencyRegistry},
    rates::{HistoryRecord, RatesSnapshot},
    user::{Session, User},
    wallet::Portfolio,
};
use providers::registry::RateSourceRegistry;
use services::{
    portfolio_service::{DepositReceipt, PortfolioService, PortfolioSummary, TradeReceipt},
    rates_view::{compute_display_rows, DisplayRow},
    resolver::{RateResolver, RefreshPolicy, ResolvedRate},
    scheduler::RatesScheduler,
    updater::{RatesUpdater, UpdateReport},
    user_service::UserService,
};
use storage::{database::JsonDatabase, rates::RatesStorage};

/// Main entry point for the ValutaTrade Hub core library.
///
/// Owns one instance of every service, wired from a single [`HubConfig`].
/// Nothing is global: two hubs with different data directories are fully
/// independent.
#[must_use]
pub struct ValutaHub {
    config: HubConfig,
    currencies: CurrencyRegistry,
    storage: RatesStorage,
    updater: Arc<RatesUpdater>,
    resolver: Arc<RateResolver>,
    users: UserService,
    portfolios: PortfolioService,
}

impl std::fmt::Debug for ValutaHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValutaHub")
            .field("data_dir", &self.config.data_dir)
            .field("sources", &self.updater.source_ids())
            .field("ttl_secs", &self.resolver.ttl_secs())
            .finish()
    }
}

impl ValutaHub {
    /// Build a hub with the default rate sources (CoinGecko, ExchangeRate-API).
    pub fn new(config: HubConfig) -> Result<Self, CoreError> {
        let registry = RateSourceRegistry::with_defaults(&config);
        Self::with_registry(config, registry)
    }

    /// Build a hub pulling rates from a custom set of sources.
    pub fn with_registry(
        config: HubConfig,
        registry: RateSourceRegistry,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let storage = RatesStorage::new(config.rates_path(), config.history_path());
        let db = JsonDatabase::from_config(&config);
        let currencies = CurrencyRegistry::with_defaults();

        let updater = Arc::new(RatesUpdater::new(registry, storage.clone()));
        let resolver = Arc::new(
            RateResolver::new(storage.clone(), config.rates_ttl_seconds)
                .with_updater(Arc::clone(&updater)),
        );
        let users = UserService::new(db.clone());
        let portfolios = PortfolioService::new(db, Arc::clone(&resolver), currencies.clone());

        tracing::debug!(data_dir = %config.data_dir.display(), "Hub initialised");
        Ok(Self {
            config,
            currencies,
            storage,
            updater,
            resolver,
            users,
            portfolios,
        })
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    // ── Users & Session ─────────────────────────────────────────────

    pub fn register(&self, username: &str, password: &str) -> Result<User, CoreError> {
        self.users.register(username, password)
    }

    /// Authenticate and persist the session for later invocations.
    pub fn login(&self, username: &str, password: &str) -> Result<User, CoreError> {
        self.users.login(username, password)
    }

    pub fn logout(&self) -> Result<bool, CoreError> {
        self.users.logout()
    }

    /// The active session, or `NotLoggedIn`.
    pub fn whoami(&self) -> Result<Session, CoreError> {
        self.users.current_session()
    }

    pub fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), CoreError> {
        let session = self.whoami()?;
        self.users
            .change_password(&session.username, old_password, new_password)
    }

    // ── Wallets ─────────────────────────────────────────────────────

    pub fn deposit(&self, amount: f64) -> Result<DepositReceipt, CoreError> {
        let session = self.whoami()?;
        self.portfolios.deposit_usd(session.user_id, amount)
    }

    pub async fn buy(
        &self,
        code: &str,
        amount: f64,
        policy: RefreshPolicy,
    ) -> Result<TradeReceipt, CoreError> {
        let session = self.whoami()?;
        self.portfolios
            .buy(session.user_id, code, amount, policy)
            .await
    }

    pub async fn sell(
        &self,
        code: &str,
        amount: f64,
        policy: RefreshPolicy,
    ) -> Result<TradeReceipt, CoreError> {
        let session = self.whoami()?;
        self.portfolios
            .sell(session.user_id, code, amount, policy)
            .await
    }

    /// Raw wallets of the logged-in user.
    pub fn portfolio(&self) -> Result<Portfolio, CoreError> {
        let session = self.whoami()?;
        self.portfolios.get_portfolio(session.user_id)
    }

    /// Wallets of the logged-in user valued in `base`.
    pub async fn portfolio_summary(
        &self,
        base: &str,
        policy: RefreshPolicy,
    ) -> Result<PortfolioSummary, CoreError> {
        let session = self.whoami()?;
        self.portfolios
            .summary(session.user_id, base, policy)
            .await
    }

    // ── Currencies ──────────────────────────────────────────────────

    pub fn list_currencies(&self) -> Vec<&Currency> {
        self.currencies.all()
    }

    pub fn get_currency(&self, code: &str) -> Result<&Currency, CoreError> {
        self.currencies.get(code)
    }

    // ── Rates ───────────────────────────────────────────────────────

    /// Resolve a rate; both codes must be known currencies.
    pub async fn get_rate(
        &self,
        from: &str,
        to: &str,
        policy: RefreshPolicy,
    ) -> Result<ResolvedRate, CoreError> {
        let from = self.currencies.get(from)?.code().to_string();
        let to = self.currencies.get(to)?.code().to_string();
        self.resolver.resolve(&from, &to, policy, None).await
    }

    /// Run one update cycle over all sources, or only `source`.
    pub async fn update_rates(&self, source: Option<&str>) -> Result<UpdateReport, CoreError> {
        self.updater.run_update(source).await
    }

    /// Cached rates formatted for display, re-based to `base`.
    pub fn show_rates(
        &self,
        currency: Option<&str>,
        top: Option<usize>,
        base: &str,
    ) -> Result<Vec<DisplayRow>, CoreError> {
        compute_display_rows(
            &self.storage.load_current_rates(),
            currency,
            top,
            base,
            &self.config.crypto_currencies,
        )
    }

    pub fn rates_snapshot(&self) -> RatesSnapshot {
        self.storage.load_current_rates()
    }

    pub fn rates_history(&self) -> Vec<HistoryRecord> {
        self.storage.load_history()
    }

    /// A scheduler sharing this hub's updater. `None` uses the configured interval.
    pub fn scheduler(&self, interval: Option<Duration>) -> RatesScheduler {
        RatesScheduler::new(
            Arc::clone(&self.updater),
            interval.unwrap_or_else(|| self.config.update_interval()),
        )
    }
}
