use std::sync::Arc;

use serde::Serialize;

use super::actions::{log_action, ActionRecord};
use super::resolver::{RateResolver, RefreshPolicy};
use crate::errors::CoreError;
use crate::models::currency::CurrencyRegistry;
use crate::models::wallet::{check_amount, Portfolio, USD};
use crate::storage::database::JsonDatabase;

/// Result of a USD deposit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositReceipt {
    pub amount: f64,
    pub before: f64,
    pub after: f64,
}

/// Result of a buy or sell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeReceipt {
    pub code: String,
    pub amount: f64,
    /// Price of one unit in USD.
    pub rate: f64,
    /// USD paid (buy) or received (sell).
    pub usd_amount: f64,
    /// Traded wallet balance before and after.
    pub before: f64,
    pub after: f64,
    pub usd_balance: f64,
}

/// One wallet valued in the summary base currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioRow {
    pub code: String,
    pub balance: f64,
    /// Price of one unit in `base`.
    pub rate: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub user_id: u64,
    pub base: String,
    pub rows: Vec<PortfolioRow>,
    pub total: f64,
}

/// Wallet bookkeeping: deposits, trades against USD and valuation.
///
/// Every operation is a read-modify-write of `portfolios.json`; the file
/// is only rewritten once all checks (amount, currency, rate, balance) pass.
pub struct PortfolioService {
    db: JsonDatabase,
    resolver: Arc<RateResolver>,
    currencies: CurrencyRegistry,
}

impl PortfolioService {
    pub fn new(db: JsonDatabase, resolver: Arc<RateResolver>, currencies: CurrencyRegistry) -> Self {
        Self {
            db,
            resolver,
            currencies,
        }
    }

    pub fn get_portfolio(&self, user_id: u64) -> Result<Portfolio, CoreError> {
        self.db.load_portfolio(user_id)?.ok_or_else(|| {
            CoreError::ValidationError(format!("Portfolio for user #{user_id} not found"))
        })
    }

    // ── Deposit ─────────────────────────────────────────────────────

    pub fn deposit_usd(&self, user_id: u64, amount: f64) -> Result<DepositReceipt, CoreError> {
        let result = self.deposit_inner(user_id, amount);
        let mut record = ActionRecord::new("DEPOSIT");
        record.user_id = Some(user_id);
        record.currency = Some(USD);
        record.amount = Some(amount);
        log_action(&record, &result);
        result
    }

    fn deposit_inner(&self, user_id: u64, amount: f64) -> Result<DepositReceipt, CoreError> {
        check_amount(amount)?;
        let mut portfolio = self.get_portfolio(user_id)?;
        let usd = portfolio.usd_wallet_mut()?;
        let before = usd.balance();
        usd.deposit(amount)?;
        let after = usd.balance();
        self.db.save_portfolio(&portfolio)?;
        Ok(DepositReceipt {
            amount,
            before,
            after,
        })
    }

    // ── Trading ─────────────────────────────────────────────────────

    /// Buy `amount` units of `code`, paying `amount × rate(code→USD)` from USD.
    pub async fn buy(
        &self,
        user_id: u64,
        code: &str,
        amount: f64,
        policy: RefreshPolicy,
    ) -> Result<TradeReceipt, CoreError> {
        let result = self.buy_inner(user_id, code, amount, policy).await;
        self.log_trade("BUY", user_id, code, amount, &result);
        result
    }

    async fn buy_inner(
        &self,
        user_id: u64,
        code: &str,
        amount: f64,
        policy: RefreshPolicy,
    ) -> Result<TradeReceipt, CoreError> {
        check_amount(amount)?;
        let code = self.currencies.get(code)?.code().to_string();
        if code == USD {
            return Err(CoreError::ValidationError(
                "USD cannot be bought; use `deposit` to add funds".into(),
            ));
        }

        let mut portfolio = self.get_portfolio(user_id)?;
        let rate = self.resolver.resolve(&code, USD, policy, None).await?.rate;
        let cost = amount * rate;

        let usd = portfolio.usd_wallet_mut()?;
        usd.withdraw(cost)?;
        let usd_balance = usd.balance();

        let wallet = portfolio.add_currency(&code)?;
        let before = wallet.balance();
        wallet.deposit(amount)?;
        let after = wallet.balance();

        self.db.save_portfolio(&portfolio)?;
        Ok(TradeReceipt {
            code,
            amount,
            rate,
            usd_amount: cost,
            before,
            after,
            usd_balance,
        })
    }

    /// Sell `amount` units of `code` for `amount × rate(code→USD)` USD.
    pub async fn sell(
        &self,
        user_id: u64,
        code: &str,
        amount: f64,
        policy: RefreshPolicy,
    ) -> Result<TradeReceipt, CoreError> {
        let result = self.sell_inner(user_id, code, amount, policy).await;
        self.log_trade("SELL", user_id, code, amount, &result);
        result
    }

    async fn sell_inner(
        &self,
        user_id: u64,
        code: &str,
        amount: f64,
        policy: RefreshPolicy,
    ) -> Result<TradeReceipt, CoreError> {
        check_amount(amount)?;
        let code = self.currencies.get(code)?.code().to_string();
        if code == USD {
            return Err(CoreError::ValidationError("USD cannot be sold".into()));
        }

        let mut portfolio = self.get_portfolio(user_id)?;
        let available = portfolio
            .get_wallet(&code)
            .map(|w| w.balance())
            .ok_or_else(|| {
                CoreError::ValidationError(format!(
                    "You have no '{code}' wallet; it is created on the first purchase"
                ))
            })?;
        if amount > available {
            return Err(CoreError::InsufficientFunds {
                available,
                required: amount,
                code,
            });
        }

        let rate = self.resolver.resolve(&code, USD, policy, None).await?.rate;
        let proceeds = amount * rate;

        let wallet = portfolio
            .get_wallet_mut(&code)
            .ok_or_else(|| CoreError::ValidationError(format!("Wallet '{code}' missing")))?;
        let before = wallet.balance();
        wallet.withdraw(amount)?;
        let after = wallet.balance();

        let usd = portfolio.usd_wallet_mut()?;
        usd.deposit(proceeds)?;
        let usd_balance = usd.balance();

        self.db.save_portfolio(&portfolio)?;
        Ok(TradeReceipt {
            code,
            amount,
            rate,
            usd_amount: proceeds,
            before,
            after,
            usd_balance,
        })
    }

    fn log_trade(
        &self,
        action: &str,
        user_id: u64,
        code: &str,
        amount: f64,
        result: &Result<TradeReceipt, CoreError>,
    ) {
        let currency = code.trim().to_uppercase();
        let mut record = ActionRecord::new(action);
        record.user_id = Some(user_id);
        record.currency = Some(&currency);
        record.amount = Some(amount);
        record.rate = result.as_ref().ok().map(|r| r.rate);
        record.base = Some(USD);
        log_action(&record, result);
    }

    // ── Valuation ───────────────────────────────────────────────────

    /// Value every wallet in `base`. Any missing rate fails the whole summary.
    pub async fn summary(
        &self,
        user_id: u64,
        base: &str,
        policy: RefreshPolicy,
    ) -> Result<PortfolioSummary, CoreError> {
        let base = self.currencies.get(base)?.code().to_string();
        let portfolio = self.get_portfolio(user_id)?;

        let mut rows = Vec::with_capacity(portfolio.wallets.len());
        let mut total = 0.0;
        for (code, wallet) in &portfolio.wallets {
            let rate = self.resolver.resolve(code, &base, policy, None).await?.rate;
            let value = wallet.balance() * rate;
            total += value;
            rows.push(PortfolioRow {
                code: code.clone(),
                balance: wallet.balance(),
                rate,
                value,
            });
        }

        Ok(PortfolioSummary {
            user_id,
            base,
            rows,
            total,
        })
    }
}
