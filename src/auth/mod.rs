//! Authentication: login, admin login, demo session, logout, profile.
//!
//! ## Session model
//!
//! - The bearer token returned by `POST /v1/auth/login` is kept in the
//!   [`SessionStore`](crate::session::SessionStore) and attached to every
//!   request by the API client.
//! - Roles are derived client-side: `admin` when the user record says
//!   `is_admin`, otherwise `user`.
//! - A demo session is fabricated locally and never touches the server.
//!   Errors raised while it is active are returned without notifications or
//!   redirects.

#[cfg(feature = "http")]
pub mod client;

use serde::{Deserialize, Serialize};

use crate::error::SdkError;
use crate::session::UserInfo;

/// Id assigned to the demo user.
pub const DEMO_USER_ID: i64 = 999;

/// Username assigned to the demo user.
pub const DEMO_USERNAME: &str = "demo_user";

/// Prefix of fabricated demo tokens.
pub const DEMO_TOKEN_PREFIX: &str = "demo_token_";

// ============================================================================
// Wire types
// ============================================================================

/// Body of `POST /v1/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// `data` of a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: UserInfo,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Body of `POST /v1/auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl RegisterRequest {
    pub fn new(username: &str, email: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            nickname: None,
        }
    }

    pub fn nickname(mut self, nickname: &str) -> Self {
        self.nickname = Some(nickname.to_string());
        self
    }

    /// Reject requests the server would bounce with a 422.
    pub fn validate(&self) -> Result<(), SdkError> {
        let len = self.username.chars().count();
        if !(3..=50).contains(&len) {
            return Err(SdkError::Validation(
                "Username must be 3 to 50 characters".into(),
            ));
        }
        if !self.email.contains('@') {
            return Err(SdkError::Validation("Email address is invalid".into()));
        }
        if self.password.chars().count() < 8 {
            return Err(SdkError::Validation(
                "Password must be at least 8 characters".into(),
            ));
        }
        if let Some(nickname) = &self.nickname {
            if nickname.chars().count() > 50 {
                return Err(SdkError::Validation(
                    "Nickname must be at most 50 characters".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Profile used for the client-only demo session.
pub fn demo_user() -> UserInfo {
    UserInfo {
        id: DEMO_USER_ID,
        username: DEMO_USERNAME.to_string(),
        nickname: Some("Demo User".to_string()),
        avatar: Some("/images/default-avatar.png".to_string()),
        email: Some("demo@example.com".to_string()),
        phone: Some("13800138000".to_string()),
        ..UserInfo::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_response_from_server_shape() {
        let resp: TokenResponse = serde_json::from_value(json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "user": {
                "id": 7,
                "username": "ana",
                "email": "ana@example.com",
                "nickname": null,
                "avatar": null,
                "is_active": true,
                "is_admin": true,
                "created_at": "2024-05-01T10:00:00"
            }
        }))
        .unwrap();
        assert_eq!(resp.access_token, "jwt");
        assert!(resp.user.is_admin);
        assert_eq!(resp.user.extra.get("is_active"), Some(&json!(true)));
    }

    #[test]
    fn test_token_type_defaults_to_bearer() {
        let resp: TokenResponse =
            serde_json::from_value(json!({"access_token": "t", "user": {"id": 1}})).unwrap();
        assert_eq!(resp.token_type, "bearer");
    }

    #[test]
    fn test_register_validation() {
        assert!(RegisterRequest::new("ana", "ana@example.com", "longenough")
            .validate()
            .is_ok());
        assert!(RegisterRequest::new("an", "ana@example.com", "longenough")
            .validate()
            .is_err());
        assert!(RegisterRequest::new("ana", "not-an-email", "longenough")
            .validate()
            .is_err());
        assert!(RegisterRequest::new("ana", "ana@example.com", "short")
            .validate()
            .is_err());
    }

    #[test]
    fn test_register_skips_missing_nickname() {
        let body = serde_json::to_value(RegisterRequest::new("ana", "a@b.c", "password1")).unwrap();
        assert!(body.get("nickname").is_none());
        let body =
            serde_json::to_value(RegisterRequest::new("ana", "a@b.c", "password1").nickname("A"))
                .unwrap();
        assert_eq!(body["nickname"], "A");
    }

    #[test]
    fn test_demo_user() {
        let user = demo_user();
        assert_eq!(user.id, DEMO_USER_ID);
        assert_eq!(user.username, DEMO_USERNAME);
        assert!(!user.is_admin);
    }
}
