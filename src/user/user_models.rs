//! User data models

use serde::Deserialize;

use super::permissions::{Permission, UserRole};

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    /// False until the confirmation code has been verified.
    pub is_active: bool,
    /// Legacy operator flag; grants admin capabilities regardless of role.
    pub is_superuser: bool,
}

impl User {
    /// The single place where the superuser flag joins the role ladder.
    /// Every permission decision goes through here, never through ad-hoc
    /// role/flag comparisons.
    pub fn effective_role(&self) -> UserRole {
        if self.is_superuser {
            UserRole::Admin
        } else {
            self.role
        }
    }

    pub fn permissions(&self) -> &'static [Permission] {
        self.effective_role().permissions()
    }
}

/// Partial update of a user record. Absent fields stay untouched.
/// `username` and `role` pass the policy layer only for administrators.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<UserRole>,
}
