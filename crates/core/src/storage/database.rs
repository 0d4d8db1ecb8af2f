use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::atomic::{read_json, write_json_atomic};
use crate::config::HubConfig;
use crate::errors::CoreError;
use crate::models::user::{Session, User};
use crate::models::wallet::Portfolio;

#[derive(Debug, Default, Serialize, Deserialize)]
struct UsersFile {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PortfoliosFile {
    #[serde(default)]
    portfolios: Vec<Portfolio>,
}

/// Whole-file JSON storage for users, portfolios and the login session.
///
/// Each call reads or rewrites one complete file. Unlike the rate cache,
/// a corrupt users or portfolios file is an error: silently starting
/// over would lose balances.
#[derive(Debug, Clone)]
pub struct JsonDatabase {
    users_path: PathBuf,
    portfolios_path: PathBuf,
    session_path: PathBuf,
}

impl JsonDatabase {
    pub fn new(
        users_path: impl Into<PathBuf>,
        portfolios_path: impl Into<PathBuf>,
        session_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            users_path: users_path.into(),
            portfolios_path: portfolios_path.into(),
            session_path: session_path.into(),
        }
    }

    pub fn from_config(config: &HubConfig) -> Self {
        Self::new(
            config.users_path(),
            config.portfolios_path(),
            config.session_path(),
        )
    }

    // ── Users ───────────────────────────────────────────────────────

    pub fn load_users(&self) -> Result<Vec<User>, CoreError> {
        let file: Option<UsersFile> = read_json(&self.users_path)?;
        Ok(file.unwrap_or_default().users)
    }

    pub fn save_users(&self, users: &[User]) -> Result<(), CoreError> {
        #[derive(Serialize)]
        struct Out<'a> {
            users: &'a [User],
        }
        write_json_atomic(&self.users_path, &Out { users })
    }

    // ── Portfolios ──────────────────────────────────────────────────

    pub fn load_portfolios(&self) -> Result<Vec<Portfolio>, CoreError> {
        let file: Option<PortfoliosFile> = read_json(&self.portfolios_path)?;
        Ok(file.unwrap_or_default().portfolios)
    }

    pub fn save_portfolios(&self, portfolios: &[Portfolio]) -> Result<(), CoreError> {
        #[derive(Serialize)]
        struct Out<'a> {
            portfolios: &'a [Portfolio],
        }
        write_json_atomic(&self.portfolios_path, &Out { portfolios })
    }

    pub fn load_portfolio(&self, user_id: u64) -> Result<Option<Portfolio>, CoreError> {
        Ok(self
            .load_portfolios()?
            .into_iter()
            .find(|p| p.user_id == user_id))
    }

    /// Insert or replace the portfolio with the same `user_id`.
    pub fn save_portfolio(&self, portfolio: &Portfolio) -> Result<(), CoreError> {
        let mut all = self.load_portfolios()?;
        match all.iter_mut().find(|p| p.user_id == portfolio.user_id) {
            Some(existing) => *existing = portfolio.clone(),
            None => all.push(portfolio.clone()),
        }
        self.save_portfolios(&all)
    }

    // ── Session ─────────────────────────────────────────────────────

    /// The current session. A corrupt session file counts as logged out.
    pub fn load_session(&self) -> Result<Option<Session>, CoreError> {
        match read_json::<Session>(&self.session_path) {
            Ok(session) => Ok(session),
            Err(CoreError::Deserialization(e)) => {
                tracing::warn!(error = %e, "Ignoring unreadable session file");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn save_session(&self, session: &Session) -> Result<(), CoreError> {
        write_json_atomic(&self.session_path, session)
    }

    /// Remove the session file. Returns `false` if there was none.
    pub fn clear_session(&self) -> Result<bool, CoreError> {
        match fs::remove_file(&self.session_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
