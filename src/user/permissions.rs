use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Create reviews and comments.
    PostContent,
    /// Edit or delete reviews and comments written by other users.
    ModerateContent,
    /// Create, update and delete categories, genres and titles.
    EditCatalog,
    /// Read, update and delete any user record, including roles.
    ManageUsers,
}

const USER_PERMISSIONS: &[Permission] = &[Permission::PostContent];

const MODERATOR_PERMISSIONS: &[Permission] =
    &[Permission::PostContent, Permission::ModerateContent];

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::PostContent,
    Permission::ModerateContent,
    Permission::EditCatalog,
    Permission::ManageUsers,
];

/// The capability ladder: user < moderator < admin. Each step keeps the
/// permissions of the one below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            UserRole::User => USER_PERMISSIONS,
            UserRole::Moderator => MODERATOR_PERMISSIONS,
            UserRole::Admin => ADMIN_PERMISSIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(UserRole::User),
            "moderator" => Some(UserRole::Moderator),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}
