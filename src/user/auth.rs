//! Authentication credentials: bearer tokens and confirmation codes.

use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::SystemTime;

const AUTH_TOKEN_LEN: usize = 64;
const CONFIRMATION_CODE_LEN: usize = 20;

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct AuthTokenValue(pub String);

impl AuthTokenValue {
    pub fn generate() -> AuthTokenValue {
        AuthTokenValue(random_alphanumeric(AUTH_TOKEN_LEN))
    }
}

/// An opaque bearer credential bound to a user. Minted when a confirmation
/// code is exchanged, stored server-side, invalidated on logout.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AuthToken {
    pub user_id: i64,
    pub created: SystemTime,
    pub last_used: Option<SystemTime>,
    pub value: AuthTokenValue,
}

impl AuthToken {
    pub fn mint(user_id: i64) -> AuthToken {
        AuthToken {
            user_id,
            created: SystemTime::now(),
            last_used: None,
            value: AuthTokenValue::generate(),
        }
    }
}

/// A one-time code proving control of the registered email address.
///
/// The plaintext exists only for the duration of the signup request (it is
/// dispatched by mail); at rest only the SHA-256 digest is kept, so a
/// leaked database does not leak usable codes. Reissuing replaces the
/// stored digest, which makes any previously issued code void.
#[derive(Clone, Debug)]
pub struct ConfirmationCode(pub String);

impl ConfirmationCode {
    pub fn generate() -> ConfirmationCode {
        ConfirmationCode(random_alphanumeric(CONFIRMATION_CODE_LEN))
    }

    pub fn digest(&self) -> String {
        sha256_hex(&self.0)
    }

    /// Compares a presented code against a stored digest.
    pub fn matches(presented: &str, stored_digest: &str) -> bool {
        sha256_hex(presented) == stored_digest
    }
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}
