use std::collections::HashMap;

use anyhow::Result;

use super::auth::{AuthToken, AuthTokenValue};
use super::permissions::UserRole;
use super::user_models::{User, UserPatch};

/// Outcome of the signup upsert. The pending-retry path and the conflict
/// path have to be told apart by the caller, so this is not an error.
#[derive(Debug)]
pub enum PendingSignupOutcome {
    /// A new pending user row was created.
    Created { user_id: i64 },
    /// The same (username, email) pair already existed and was still
    /// pending; the stored code digest was replaced.
    Reissued { user_id: i64 },
    /// The username or the email belongs to a different pairing, or the
    /// account has already been activated.
    Taken,
}

/// Outcome of a partial user update.
#[derive(Debug)]
pub enum UserUpdateOutcome {
    Updated(User),
    NotFound,
    UsernameTaken,
    EmailTaken,
}

pub trait UserAuthTokenStore: Send + Sync {
    /// Returns the token record for a token value.
    /// Returns Ok(None) if the token does not exist.
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Deletes an auth token, returning the deleted record.
    /// Returns Ok(None) if the token does not exist.
    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Stamps the token with the current time as its last use.
    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()>;

    /// Persists a freshly minted token.
    fn add_user_auth_token(&self, token: AuthToken) -> Result<()>;

    /// Prunes tokens that have not been used for the given number of days.
    /// Returns the number of tokens deleted.
    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize>;
}

pub trait UserStore: UserAuthTokenStore + Send + Sync {
    /// Creates an account directly, already active, with the given role.
    /// Used by the admin CLI and test fixtures, not by the signup flow.
    /// Fails if the username or email is taken.
    fn create_user(
        &self,
        username: &str,
        email: &str,
        role: UserRole,
    ) -> Result<i64>;

    /// The signup upsert: creates a pending user carrying the code digest,
    /// or replaces the digest of an existing still-pending identical
    /// pairing. Runs read-then-write inside one transaction so two
    /// concurrent signups cannot both mint codes for the same account.
    fn upsert_pending_user(
        &self,
        username: &str,
        email: &str,
        code_digest: &str,
    ) -> Result<PendingSignupOutcome>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: i64) -> Result<Option<User>>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Returns all users, optionally filtered by a username substring.
    fn list_users(&self, search: Option<&str>) -> Result<Vec<User>>;

    /// Resolves usernames for a set of user ids. Ids with no matching user
    /// are simply absent from the map.
    fn get_usernames_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, String>>;

    /// Returns the stored confirmation code digest, if a code is pending.
    fn get_confirmation_code_digest(&self, user_id: i64) -> Result<Option<String>>;

    /// Replaces the stored confirmation code digest.
    fn set_confirmation_code_digest(&self, user_id: i64, digest: &str) -> Result<()>;

    /// Activates the account and consumes the pending code.
    fn activate_user(&self, user_id: i64) -> Result<()>;

    /// Applies a partial update. Uniqueness collisions on username or
    /// email are reported as outcomes, not errors.
    fn update_user(&self, user_id: i64, patch: &UserPatch) -> Result<UserUpdateOutcome>;

    /// Deletes a user and their auth tokens. Returns false if the
    /// username is unknown.
    fn delete_user(&self, username: &str) -> Result<bool>;

    fn get_users_count(&self) -> usize;
}
