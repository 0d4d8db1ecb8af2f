use super::actions::{log_action, ActionRecord};
use crate::errors::CoreError;
use crate::models::user::{validate_username, Session, User};
use crate::models::wallet::Portfolio;
use crate::storage::database::JsonDatabase;

/// Registration, authentication and the persisted login session.
pub struct UserService {
    db: JsonDatabase,
}

impl UserService {
    pub fn new(db: JsonDatabase) -> Self {
        Self { db }
    }

    /// Create an account and its portfolio (with an empty USD wallet).
    pub fn register(&self, username: &str, password: &str) -> Result<User, CoreError> {
        let result = self.register_inner(username, password);
        let mut record = ActionRecord::new("REGISTER");
        record.username = Some(username.trim());
        record.user_id = result.as_ref().ok().map(|u| u.user_id);
        log_action(&record, &result);
        result
    }

    fn register_inner(&self, username: &str, password: &str) -> Result<User, CoreError> {
        let username = validate_username(username)?;
        let mut users = self.db.load_users()?;
        if users.iter().any(|u| u.username == username) {
            return Err(CoreError::UsernameTaken(username));
        }

        let user_id = users.iter().map(|u| u.user_id).max().unwrap_or(0) + 1;
        let user = User::new(user_id, &username, password)?;
        users.push(user.clone());
        self.db.save_users(&users)?;

        if self.db.load_portfolio(user_id)?.is_none() {
            self.db.save_portfolio(&Portfolio::new(user_id))?;
        }
        Ok(user)
    }

    /// Verify credentials and start a session shared by later invocations.
    pub fn login(&self, username: &str, password: &str) -> Result<User, CoreError> {
        let result = self.login_inner(username, password);
        let mut record = ActionRecord::new("LOGIN");
        record.username = Some(username.trim());
        record.user_id = result.as_ref().ok().map(|u| u.user_id);
        log_action(&record, &result);
        result
    }

    fn login_inner(&self, username: &str, password: &str) -> Result<User, CoreError> {
        let user = self.find_by_username(username)?;
        if !user.verify_password(password)? {
            return Err(CoreError::InvalidPassword);
        }
        self.db.save_session(&Session::start(&user))?;
        Ok(user)
    }

    /// End the session. Returns `false` if nobody was logged in.
    pub fn logout(&self) -> Result<bool, CoreError> {
        self.db.clear_session()
    }

    /// The logged-in session, or `NotLoggedIn`.
    pub fn current_session(&self) -> Result<Session, CoreError> {
        self.db.load_session()?.ok_or(CoreError::NotLoggedIn)
    }

    pub fn find_by_username(&self, username: &str) -> Result<User, CoreError> {
        let username = username.trim();
        self.db
            .load_users()?
            .into_iter()
            .find(|u| u.username == username)
            .ok_or_else(|| CoreError::UserNotFound(username.to_string()))
    }

    pub fn get_user(&self, user_id: u64) -> Result<User, CoreError> {
        self.db
            .load_users()?
            .into_iter()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| CoreError::UserNotFound(format!("#{user_id}")))
    }

    /// Change a password after checking the current one.
    pub fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), CoreError> {
        let mut users = self.db.load_users()?;
        let user = users
            .iter_mut()
            .find(|u| u.username == username.trim())
            .ok_or_else(|| CoreError::UserNotFound(username.trim().to_string()))?;
        if !user.verify_password(old_password)? {
            return Err(CoreError::InvalidPassword);
        }
        user.change_password(new_password)?;
        self.db.save_users(&users)
    }
}
