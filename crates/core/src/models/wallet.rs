use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::currency::normalize_code;
use crate::errors::CoreError;

/// Code of the currency every portfolio is funded in.
pub const USD: &str = "USD";

/// A balance in one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WalletRecord")]
pub struct Wallet {
    pub currency_code: String,
    balance: f64,
}

/// Wallet as stored on disk, checked through `Wallet::new` on load.
#[derive(Deserialize)]
struct WalletRecord {
    currency_code: String,
    balance: f64,
}

impl TryFrom<WalletRecord> for Wallet {
    type Error = CoreError;

    fn try_from(record: WalletRecord) -> Result<Self, Self::Error> {
        Wallet::new(&record.currency_code, record.balance)
    }
}

impl Wallet {
    /// A wallet with an explicit starting balance (must be ≥ 0).
    pub fn new(currency_code: &str, balance: f64) -> Result<Self, CoreError> {
        let currency_code = normalize_code(currency_code)?;
        if !balance.is_finite() || balance < 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Balance must be a non-negative number, got {balance}"
            )));
        }
        Ok(Self {
            currency_code,
            balance,
        })
    }

    /// An empty wallet.
    pub fn empty(currency_code: &str) -> Result<Self, CoreError> {
        Self::new(currency_code, 0.0)
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Add a strictly positive amount. The resulting balance must stay finite.
    pub fn deposit(&mut self, amount: f64) -> Result<(), CoreError> {
        check_amount(amount)?;
        let balance = self.balance + amount;
        if !balance.is_finite() {
            return Err(CoreError::ValidationError(format!(
                "Deposit of {amount} would overflow the {} balance",
                self.currency_code
            )));
        }
        self.balance = balance;
        Ok(())
    }

    /// Remove a strictly positive amount; the balance never goes negative.
    pub fn withdraw(&mut self, amount: f64) -> Result<(), CoreError> {
        check_amount(amount)?;
        if amount > self.balance {
            return Err(CoreError::InsufficientFunds {
                available: self.balance,
                required: amount,
                code: self.currency_code.clone(),
            });
        }
        self.balance -= amount;
        Ok(())
    }
}

/// Reject zero, negative and non-finite amounts.
pub fn check_amount(amount: f64) -> Result<(), CoreError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(CoreError::ValidationError(format!(
            "'amount' must be a positive number, got {amount}"
        )));
    }
    Ok(())
}

/// All wallets owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub user_id: u64,
    #[serde(default)]
    pub wallets: BTreeMap<String, Wallet>,
}

impl Portfolio {
    /// A fresh portfolio holding an empty USD wallet.
    pub fn new(user_id: u64) -> Self {
        let mut wallets = BTreeMap::new();
        wallets.insert(
            USD.to_string(),
            Wallet {
                currency_code: USD.to_string(),
                balance: 0.0,
            },
        );
        Self { user_id, wallets }
    }

    /// Get or create the wallet for `code`. Calling it twice is harmless.
    pub fn add_currency(&mut self, code: &str) -> Result<&mut Wallet, CoreError> {
        let code = normalize_code(code)?;
        if !self.wallets.contains_key(&code) {
            let wallet = Wallet::empty(&code)?;
            self.wallets.insert(code.clone(), wallet);
        }
        self.wallets
            .get_mut(&code)
            .ok_or_else(|| CoreError::ValidationError(format!("Wallet '{code}' missing")))
    }

    pub fn get_wallet(&self, code: &str) -> Option<&Wallet> {
        self.wallets.get(&code.trim().to_uppercase())
    }

    pub fn get_wallet_mut(&mut self, code: &str) -> Option<&mut Wallet> {
        self.wallets.get_mut(&code.trim().to_uppercase())
    }

    /// The USD wallet, created on demand for portfolios loaded without one.
    pub fn usd_wallet_mut(&mut self) -> Result<&mut Wallet, CoreError> {
        self.add_currency(USD)
    }
}
