//! Account lifecycle logic: signup, confirmation, profile updates, tokens.
//!
//! The manager owns the business rules; the store below it only persists.
//! Identity never comes from ambient state: callers that need permission
//! decisions pass the acting user explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use thiserror::Error;
use tracing::info;

use crate::mailer::Mailer;

use super::auth::{AuthToken, AuthTokenValue, ConfirmationCode};
use super::permissions::UserRole;
use super::user_models::{User, UserPatch};
use super::user_store::{PendingSignupOutcome, UserStore, UserUpdateOutcome};
use super::validation::{validate_email, validate_username};

const MAIL_SUBJECT: &str = "Your confirmation code";

#[derive(Debug, Error)]
pub enum SignupError {
    #[error("{0}")]
    InvalidUsername(String),
    #[error("{0}")]
    InvalidEmail(String),
    #[error("username or email already in use")]
    Conflict,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("no such user")]
    UnknownUser,
    #[error("invalid confirmation code")]
    InvalidCode,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum UserUpdateError {
    #[error("{0}")]
    InvalidUsername(String),
    #[error("{0}")]
    InvalidEmail(String),
    #[error("username already in use")]
    UsernameTaken,
    #[error("email already in use")]
    EmailTaken,
    #[error("no such user")]
    NotFound,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct SignupReceipt {
    pub username: String,
    pub email: String,
}

pub struct UserManager {
    user_store: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
}

impl UserManager {
    pub fn new(user_store: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { user_store, mailer }
    }

    /// Registers a pending account and mails the confirmation code.
    /// Retrying with the identical (username, email) pair reissues a fresh
    /// code for the same account instead of failing.
    pub fn signup(&self, username: &str, email: &str) -> Result<SignupReceipt, SignupError> {
        validate_username(username).map_err(SignupError::InvalidUsername)?;
        validate_email(email).map_err(SignupError::InvalidEmail)?;

        let code = ConfirmationCode::generate();
        let outcome = self
            .user_store
            .upsert_pending_user(username, email, &code.digest())?;

        match outcome {
            PendingSignupOutcome::Created { user_id } => {
                info!("Created pending user {} ({})", username, user_id);
            }
            PendingSignupOutcome::Reissued { user_id } => {
                info!("Reissued confirmation code for user {} ({})", username, user_id);
            }
            PendingSignupOutcome::Taken => return Err(SignupError::Conflict),
        }

        self.mailer
            .send(
                email,
                MAIL_SUBJECT,
                &format!("Your confirmation code: {}", code.0),
            )
            .context("Failed to dispatch confirmation mail")?;

        Ok(SignupReceipt {
            username: username.to_string(),
            email: email.to_string(),
        })
    }

    /// Exchanges a confirmation code for a bearer token, activating the
    /// account on first use. A code that has been superseded by a reissue
    /// never verifies.
    pub fn verify(&self, username: &str, code: &str) -> Result<AuthToken, VerifyError> {
        let user = self
            .user_store
            .get_user_by_username(username)?
            .ok_or(VerifyError::UnknownUser)?;

        let digest = self
            .user_store
            .get_confirmation_code_digest(user.id)?
            .ok_or(VerifyError::InvalidCode)?;

        if !ConfirmationCode::matches(code, &digest) {
            return Err(VerifyError::InvalidCode);
        }

        self.user_store.activate_user(user.id)?;

        let token = AuthToken::mint(user.id);
        self.user_store.add_user_auth_token(token.clone())?;
        info!("User {} verified and activated", username);
        Ok(token)
    }

    /// Stores a fresh confirmation code for an existing account and returns
    /// the plaintext. Used by the admin CLI when a mail went missing.
    pub fn issue_code(&self, username: &str) -> Result<ConfirmationCode> {
        let user = self
            .user_store
            .get_user_by_username(username)?
            .with_context(|| format!("User {} not found", username))?;
        let code = ConfirmationCode::generate();
        self.user_store
            .set_confirmation_code_digest(user.id, &code.digest())?;
        Ok(code)
    }

    /// Creates an active account directly, bypassing the confirmation flow.
    /// Operator path only.
    pub fn create_user(&self, username: &str, email: &str, role: UserRole) -> Result<i64> {
        if let Err(msg) = validate_username(username) {
            bail!("{}", msg);
        }
        if let Err(msg) = validate_email(email) {
            bail!("{}", msg);
        }
        self.user_store.create_user(username, email, role)
    }

    /// Applies a partial update. The policy layer decides who may send
    /// which fields; this validates forms and maps store collisions.
    pub fn update_user(&self, user_id: i64, patch: &UserPatch) -> Result<User, UserUpdateError> {
        if let Some(username) = &patch.username {
            validate_username(username).map_err(UserUpdateError::InvalidUsername)?;
        }
        if let Some(email) = &patch.email {
            validate_email(email).map_err(UserUpdateError::InvalidEmail)?;
        }

        match self.user_store.update_user(user_id, patch)? {
            UserUpdateOutcome::Updated(user) => Ok(user),
            UserUpdateOutcome::NotFound => Err(UserUpdateError::NotFound),
            UserUpdateOutcome::UsernameTaken => Err(UserUpdateError::UsernameTaken),
            UserUpdateOutcome::EmailTaken => Err(UserUpdateError::EmailTaken),
        }
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.user_store.get_user(user_id)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_store.get_user_by_username(username)
    }

    pub fn list_users(&self, search: Option<&str>) -> Result<Vec<User>> {
        self.user_store.list_users(search)
    }

    pub fn get_usernames_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, String>> {
        self.user_store.get_usernames_by_ids(ids)
    }

    pub fn delete_user(&self, username: &str) -> Result<bool> {
        self.user_store.delete_user(username)
    }

    pub fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        self.user_store.get_user_auth_token(value)
    }

    pub fn touch_auth_token(&self, value: &AuthTokenValue) -> Result<()> {
        self.user_store
            .update_user_auth_token_last_used_timestamp(value)
    }

    /// Invalidates a token, refusing to delete a token another user owns.
    pub fn delete_auth_token(&self, user_id: i64, value: &AuthTokenValue) -> Result<()> {
        match self.user_store.get_user_auth_token(value)? {
            None => bail!("Auth token not found"),
            Some(token) if token.user_id != user_id => {
                bail!(
                    "User {} tried to delete a token owned by user {}",
                    user_id,
                    token.user_id
                );
            }
            Some(_) => {
                self.user_store.delete_user_auth_token(value)?;
                Ok(())
            }
        }
    }

    pub fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        self.user_store.prune_unused_auth_tokens(unused_for_days)
    }

    pub fn get_users_count(&self) -> usize {
        self.user_store.get_users_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::SqliteUserStore;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Captures outbound mail so tests can read the dispatched code.
    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    impl RecordingMailer {
        fn last_code(&self) -> String {
            let sent = self.sent.lock().unwrap();
            let (_, _, body) = sent.last().expect("no mail sent");
            body.rsplit(' ').next().unwrap().to_string()
        }

        fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl Mailer for RecordingMailer {
        fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
            self.sent.lock().unwrap().push((
                to.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            Ok(())
        }
    }

    fn test_manager() -> (TempDir, UserManager, Arc<RecordingMailer>) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteUserStore::new(dir.path().join("user.db")).unwrap());
        let mailer = Arc::new(RecordingMailer::default());
        let manager = UserManager::new(store, mailer.clone());
        (dir, manager, mailer)
    }

    #[test]
    fn signup_then_verify_activates_and_issues_token() {
        let (_dir, manager, mailer) = test_manager();

        let receipt = manager.signup("bob", "bob@x.com").unwrap();
        assert_eq!(receipt.username, "bob");
        assert_eq!(mailer.sent_count(), 1);

        let user = manager.get_user_by_username("bob").unwrap().unwrap();
        assert!(!user.is_active);

        let token = manager.verify("bob", &mailer.last_code()).unwrap();
        assert!(!token.value.0.is_empty());

        let user = manager.get_user_by_username("bob").unwrap().unwrap();
        assert!(user.is_active);
    }

    #[test]
    fn verify_with_wrong_code_leaves_account_pending() {
        let (_dir, manager, _mailer) = test_manager();
        manager.signup("bob", "bob@x.com").unwrap();

        let err = manager.verify("bob", "wrong-code").unwrap_err();
        assert!(matches!(err, VerifyError::InvalidCode));

        let user = manager.get_user_by_username("bob").unwrap().unwrap();
        assert!(!user.is_active);
    }

    #[test]
    fn verify_unknown_user_is_distinct_from_bad_code() {
        let (_dir, manager, _mailer) = test_manager();
        let err = manager.verify("nobody", "whatever").unwrap_err();
        assert!(matches!(err, VerifyError::UnknownUser));
    }

    #[test]
    fn duplicate_signup_reissues_and_only_latest_code_verifies() {
        let (_dir, manager, mailer) = test_manager();

        manager.signup("bob", "bob@x.com").unwrap();
        let first_code = mailer.last_code();

        manager.signup("bob", "bob@x.com").unwrap();
        let second_code = mailer.last_code();
        assert_ne!(first_code, second_code);
        assert_eq!(manager.get_users_count(), 1);

        let err = manager.verify("bob", &first_code).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidCode));

        manager.verify("bob", &second_code).unwrap();
    }

    #[test]
    fn signup_conflicts_on_username_claimed_by_other_email() {
        let (_dir, manager, _mailer) = test_manager();
        manager.signup("bob", "bob@x.com").unwrap();

        let err = manager.signup("bob", "other@x.com").unwrap_err();
        assert!(matches!(err, SignupError::Conflict));
    }

    #[test]
    fn signup_rejects_reserved_and_malformed_input() {
        let (_dir, manager, mailer) = test_manager();

        assert!(matches!(
            manager.signup("me", "me@x.com").unwrap_err(),
            SignupError::InvalidUsername(_)
        ));
        assert!(matches!(
            manager.signup("bob", "not-an-email").unwrap_err(),
            SignupError::InvalidEmail(_)
        ));
        assert_eq!(mailer.sent_count(), 0);
    }

    #[test]
    fn code_is_single_use() {
        let (_dir, manager, mailer) = test_manager();
        manager.signup("bob", "bob@x.com").unwrap();
        let code = mailer.last_code();

        manager.verify("bob", &code).unwrap();
        let err = manager.verify("bob", &code).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidCode));
    }

    #[test]
    fn delete_auth_token_enforces_ownership() {
        let (_dir, manager, mailer) = test_manager();
        manager.signup("bob", "bob@x.com").unwrap();
        let token = manager.verify("bob", &mailer.last_code()).unwrap();

        assert!(manager.delete_auth_token(9999, &token.value).is_err());
        assert!(manager.get_auth_token(&token.value).unwrap().is_some());

        manager
            .delete_auth_token(token.user_id, &token.value)
            .unwrap();
        assert!(manager.get_auth_token(&token.value).unwrap().is_none());
    }
}
