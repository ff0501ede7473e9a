//! HTTP client for end-to-end tests
//!
//! A thin wrapper around reqwest with one method per endpoint.
//! When routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client carrying an optional bearer token
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    token: Option<String>,
}

impl TestClient {
    /// Creates a new unauthenticated client.
    ///
    /// Use this for testing the signup flow and public reads. For most
    /// tests, use one of the role-specific constructors instead.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client carrying the given bearer token.
    pub fn with_token(base_url: String, token: &str) -> Self {
        let mut client = Self::new(base_url);
        client.token = Some(token.to_string());
        client
    }

    /// Client authenticated as the seeded regular user
    pub fn authenticated(base_url: String) -> Self {
        Self::with_token(base_url, TEST_USER_TOKEN)
    }

    /// Client authenticated as the second seeded regular user
    pub fn authenticated_other(base_url: String) -> Self {
        Self::with_token(base_url, OTHER_USER_TOKEN)
    }

    /// Client authenticated as the seeded moderator
    pub fn authenticated_moderator(base_url: String) -> Self {
        Self::with_token(base_url, MODERATOR_TOKEN)
    }

    /// Client authenticated as the seeded admin
    pub fn authenticated_admin(base_url: String) -> Self {
        Self::with_token(base_url, ADMIN_TOKEN)
    }

    fn get(&self, path: String) -> reqwest::RequestBuilder {
        let builder = self.client.get(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.header("Authorization", token),
            None => builder,
        }
    }

    fn post(&self, path: String) -> reqwest::RequestBuilder {
        let builder = self.client.post(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.header("Authorization", token),
            None => builder,
        }
    }

    fn patch(&self, path: String) -> reqwest::RequestBuilder {
        let builder = self.client.patch(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.header("Authorization", token),
            None => builder,
        }
    }

    fn delete(&self, path: String) -> reqwest::RequestBuilder {
        let builder = self.client.delete(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.header("Authorization", token),
            None => builder,
        }
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/signup
    pub async fn signup(&self, username: &str, email: &str) -> Response {
        self.post("/v1/auth/signup".to_string())
            .json(&json!({ "username": username, "email": email }))
            .send()
            .await
            .expect("Signup request failed")
    }

    /// POST /v1/auth/token
    pub async fn token(&self, username: &str, confirmation_code: &str) -> Response {
        self.post("/v1/auth/token".to_string())
            .json(&json!({
                "username": username,
                "confirmation_code": confirmation_code
            }))
            .send()
            .await
            .expect("Token request failed")
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.get("/v1/auth/logout".to_string())
            .send()
            .await
            .expect("Logout request failed")
    }

    // ========================================================================
    // Category and Genre Endpoints
    // ========================================================================

    /// GET /v1/categories
    pub async fn list_categories(&self) -> Response {
        self.get("/v1/categories".to_string())
            .send()
            .await
            .expect("List categories request failed")
    }

    /// POST /v1/categories
    pub async fn create_category(&self, body: Value) -> Response {
        self.post("/v1/categories".to_string())
            .json(&body)
            .send()
            .await
            .expect("Create category request failed")
    }

    /// DELETE /v1/categories/{slug}
    pub async fn delete_category(&self, slug: &str) -> Response {
        self.delete(format!("/v1/categories/{}", slug))
            .send()
            .await
            .expect("Delete category request failed")
    }

    /// GET /v1/genres
    pub async fn list_genres(&self) -> Response {
        self.get("/v1/genres".to_string())
            .send()
            .await
            .expect("List genres request failed")
    }

    /// POST /v1/genres
    pub async fn create_genre(&self, body: Value) -> Response {
        self.post("/v1/genres".to_string())
            .json(&body)
            .send()
            .await
            .expect("Create genre request failed")
    }

    /// DELETE /v1/genres/{slug}
    pub async fn delete_genre(&self, slug: &str) -> Response {
        self.delete(format!("/v1/genres/{}", slug))
            .send()
            .await
            .expect("Delete genre request failed")
    }

    // ========================================================================
    // Title Endpoints
    // ========================================================================

    /// GET /v1/titles with a raw query string ("" for none)
    pub async fn list_titles(&self, query: &str) -> Response {
        let path = if query.is_empty() {
            "/v1/titles".to_string()
        } else {
            format!("/v1/titles?{}", query)
        };
        self.get(path)
            .send()
            .await
            .expect("List titles request failed")
    }

    /// GET /v1/titles/{id}
    pub async fn get_title(&self, id: i64) -> Response {
        self.get(format!("/v1/titles/{}", id))
            .send()
            .await
            .expect("Get title request failed")
    }

    /// POST /v1/titles
    pub async fn create_title(&self, body: Value) -> Response {
        self.post("/v1/titles".to_string())
            .json(&body)
            .send()
            .await
            .expect("Create title request failed")
    }

    /// PATCH /v1/titles/{id}
    pub async fn patch_title(&self, id: i64, body: Value) -> Response {
        self.patch(format!("/v1/titles/{}", id))
            .json(&body)
            .send()
            .await
            .expect("Patch title request failed")
    }

    /// DELETE /v1/titles/{id}
    pub async fn delete_title(&self, id: i64) -> Response {
        self.delete(format!("/v1/titles/{}", id))
            .send()
            .await
            .expect("Delete title request failed")
    }

    // ========================================================================
    // Review and Comment Endpoints
    // ========================================================================

    /// GET /v1/titles/{title_id}/reviews
    pub async fn list_reviews(&self, title_id: i64) -> Response {
        self.get(format!("/v1/titles/{}/reviews", title_id))
            .send()
            .await
            .expect("List reviews request failed")
    }

    /// POST /v1/titles/{title_id}/reviews
    pub async fn create_review(&self, title_id: i64, text: &str, score: i32) -> Response {
        self.post(format!("/v1/titles/{}/reviews", title_id))
            .json(&json!({ "text": text, "score": score }))
            .send()
            .await
            .expect("Create review request failed")
    }

    /// GET /v1/titles/{title_id}/reviews/{review_id}
    pub async fn get_review(&self, title_id: i64, review_id: i64) -> Response {
        self.get(format!("/v1/titles/{}/reviews/{}", title_id, review_id))
            .send()
            .await
            .expect("Get review request failed")
    }

    /// PATCH /v1/titles/{title_id}/reviews/{review_id}
    pub async fn patch_review(&self, title_id: i64, review_id: i64, body: Value) -> Response {
        self.patch(format!("/v1/titles/{}/reviews/{}", title_id, review_id))
            .json(&body)
            .send()
            .await
            .expect("Patch review request failed")
    }

    /// DELETE /v1/titles/{title_id}/reviews/{review_id}
    pub async fn delete_review(&self, title_id: i64, review_id: i64) -> Response {
        self.delete(format!("/v1/titles/{}/reviews/{}", title_id, review_id))
            .send()
            .await
            .expect("Delete review request failed")
    }

    /// GET /v1/titles/{title_id}/reviews/{review_id}/comments
    pub async fn list_comments(&self, title_id: i64, review_id: i64) -> Response {
        self.get(format!(
            "/v1/titles/{}/reviews/{}/comments",
            title_id, review_id
        ))
        .send()
        .await
        .expect("List comments request failed")
    }

    /// POST /v1/titles/{title_id}/reviews/{review_id}/comments
    pub async fn create_comment(&self, title_id: i64, review_id: i64, text: &str) -> Response {
        self.post(format!(
            "/v1/titles/{}/reviews/{}/comments",
            title_id, review_id
        ))
        .json(&json!({ "text": text }))
        .send()
        .await
        .expect("Create comment request failed")
    }

    /// DELETE /v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}
    pub async fn delete_comment(
        &self,
        title_id: i64,
        review_id: i64,
        comment_id: i64,
    ) -> Response {
        self.delete(format!(
            "/v1/titles/{}/reviews/{}/comments/{}",
            title_id, review_id, comment_id
        ))
        .send()
        .await
        .expect("Delete comment request failed")
    }

    // ========================================================================
    // User Endpoints
    // ========================================================================

    /// GET /v1/users
    pub async fn list_users(&self) -> Response {
        self.get("/v1/users".to_string())
            .send()
            .await
            .expect("List users request failed")
    }

    /// GET /v1/users/me
    pub async fn get_me(&self) -> Response {
        self.get("/v1/users/me".to_string())
            .send()
            .await
            .expect("Get me request failed")
    }

    /// PATCH /v1/users/me
    pub async fn patch_me(&self, body: Value) -> Response {
        self.patch("/v1/users/me".to_string())
            .json(&body)
            .send()
            .await
            .expect("Patch me request failed")
    }

    /// GET /v1/users/{username}
    pub async fn get_user(&self, username: &str) -> Response {
        self.get(format!("/v1/users/{}", username))
            .send()
            .await
            .expect("Get user request failed")
    }

    /// PATCH /v1/users/{username}
    pub async fn patch_user(&self, username: &str, body: Value) -> Response {
        self.patch(format!("/v1/users/{}", username))
            .json(&body)
            .send()
            .await
            .expect("Patch user request failed")
    }

    /// DELETE /v1/users/{username}
    pub async fn delete_user(&self, username: &str) -> Response {
        self.delete(format!("/v1/users/{}", username))
            .send()
            .await
            .expect("Delete user request failed")
    }
}
