//! Username and email validation, shared by the signup flow, the user
//! management endpoints and the admin CLI.

use lazy_static::lazy_static;
use regex::Regex;

pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_EMAIL_LEN: usize = 254;

/// "me" addresses the calling user on the API surface and can never be an
/// account name.
pub const RESERVED_USERNAME: &str = "me";

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[\w.@+-]+$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("username must not be empty".to_string());
    }
    if username == RESERVED_USERNAME {
        return Err(format!("\"{}\" is a reserved username", RESERVED_USERNAME));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!(
            "username must be at most {} characters",
            MAX_USERNAME_LEN
        ));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(
            "username may only contain letters, digits and . @ + - _".to_string(),
        );
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("email must not be empty".to_string());
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(format!("email must be at most {} characters", MAX_EMAIL_LEN));
    }
    if !EMAIL_RE.is_match(email) {
        return Err("email is not a valid address".to_string());
    }
    Ok(())
}
