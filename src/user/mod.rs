pub mod auth;
pub mod permissions;
mod sqlite_user_store;
mod user_manager;
pub mod user_models;
mod user_store;
pub mod validation;

pub use auth::{AuthToken, AuthTokenValue, ConfirmationCode};
pub use permissions::{Permission, UserRole};
pub use sqlite_user_store::SqliteUserStore;
pub use user_manager::{SignupError, SignupReceipt, UserManager, UserUpdateError, VerifyError};
pub use user_models::{User, UserPatch};
pub use user_store::{PendingSignupOutcome, UserAuthTokenStore, UserStore, UserUpdateOutcome};
