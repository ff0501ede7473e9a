//! Field validation for catalog writes.
//!
//! Every function returns the list of offending fields so handlers can
//! surface structured 400 payloads instead of a single opaque message.

use chrono::Datelike;
use lazy_static::lazy_static;
use regex::Regex;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_SLUG_LEN: usize = 50;
pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 10;

lazy_static! {
    static ref SLUG_RE: Regex = Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap();
}

pub type FieldIssues = Vec<(&'static str, String)>;

/// Derives a slug from a name when the client omitted one: lowercased,
/// non URL-safe characters collapsed to dashes, truncated to the limit.
pub fn derive_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && !slug.is_empty() {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug.truncate(MAX_SLUG_LEN);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

pub fn validate_slugged(name: &str, slug: &str) -> Result<(), FieldIssues> {
    let mut issues = FieldIssues::new();
    if name.is_empty() {
        issues.push(("name", "name must not be empty".to_string()));
    } else if name.chars().count() > MAX_NAME_LEN {
        issues.push((
            "name",
            format!("name must be at most {} characters", MAX_NAME_LEN),
        ));
    }
    if slug.is_empty() {
        issues.push(("slug", "slug must not be empty".to_string()));
    } else {
        if slug.chars().count() > MAX_SLUG_LEN {
            issues.push((
                "slug",
                format!("slug must be at most {} characters", MAX_SLUG_LEN),
            ));
        }
        if !SLUG_RE.is_match(slug) {
            issues.push((
                "slug",
                "slug may only contain letters, digits, dashes and underscores".to_string(),
            ));
        }
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

pub fn validate_title_name(name: &str) -> Result<(), FieldIssues> {
    if name.is_empty() {
        return Err(vec![("name", "name must not be empty".to_string())]);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(vec![(
            "name",
            format!("name must be at most {} characters", MAX_NAME_LEN),
        )]);
    }
    Ok(())
}

/// Titles cannot be dated in the future.
pub fn validate_year(year: i32) -> Result<(), FieldIssues> {
    let current_year = chrono::Utc::now().year();
    if year > current_year {
        return Err(vec![(
            "year",
            format!("year must not be greater than {}", current_year),
        )]);
    }
    Ok(())
}

pub fn validate_score(score: i32) -> Result<(), FieldIssues> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(vec![(
            "score",
            format!("score must be between {} and {}", MIN_SCORE, MAX_SCORE),
        )]);
    }
    Ok(())
}

pub fn validate_text(text: &str) -> Result<(), FieldIssues> {
    if text.trim().is_empty() {
        return Err(vec![("text", "text must not be empty".to_string())]);
    }
    Ok(())
}
