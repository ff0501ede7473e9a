//! Shared constants for end-to-end tests
//!
//! All test data (seeded users, tokens, catalog rows) is defined here.
//! When fixtures change, update only this file.

// ============================================================================
// Test Users
// ============================================================================

/// Regular test user
pub const TEST_USER: &str = "testuser";
pub const TEST_USER_EMAIL: &str = "testuser@example.com";
pub const TEST_USER_TOKEN: &str = "e2e-token-regular-user-0000000000000000";

/// Second regular user (for authorship checks)
pub const OTHER_USER: &str = "otheruser";
pub const OTHER_USER_EMAIL: &str = "otheruser@example.com";
pub const OTHER_USER_TOKEN: &str = "e2e-token-other-user-00000000000000000";

/// Moderator test user
pub const MODERATOR_USER: &str = "moderator";
pub const MODERATOR_EMAIL: &str = "moderator@example.com";
pub const MODERATOR_TOKEN: &str = "e2e-token-moderator-000000000000000000";

/// Admin test user
pub const ADMIN_USER: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_TOKEN: &str = "e2e-token-admin-0000000000000000000000";

// ============================================================================
// Seeded Catalog
// ============================================================================

pub const CATEGORY_FILMS_SLUG: &str = "films";
pub const CATEGORY_FILMS_NAME: &str = "Films";

pub const CATEGORY_BOOKS_SLUG: &str = "books";
pub const CATEGORY_BOOKS_NAME: &str = "Books";

pub const GENRE_DRAMA_SLUG: &str = "drama";
pub const GENRE_DRAMA_NAME: &str = "Drama";

pub const GENRE_COMEDY_SLUG: &str = "comedy";
pub const GENRE_COMEDY_NAME: &str = "Comedy";

/// "The Long Night", 1999, Films, Drama
pub const TITLE_1_ID: i64 = 1;
pub const TITLE_1_NAME: &str = "The Long Night";
pub const TITLE_1_YEAR: i32 = 1999;

/// "Light Laughs", 2005, Books, Comedy
pub const TITLE_2_ID: i64 = 2;
pub const TITLE_2_NAME: &str = "Light Laughs";
pub const TITLE_2_YEAR: i32 = 2005;

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
