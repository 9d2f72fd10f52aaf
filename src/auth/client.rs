//! Auth sub-client: login, logout, demo session, user profile.

use serde::Serialize;
use serde_json::Value;

use crate::auth::{demo_user, LoginRequest, RegisterRequest, TokenResponse, DEMO_TOKEN_PREFIX};
use crate::client::DanceClient;
use crate::error::{AuthError, SdkError};
use crate::http::RequestContext;
use crate::session::{Session, UserInfo, ADMIN_ROLE, USER_ROLE};

/// Sub-client for authentication operations.
pub struct Auth<'a> {
    pub(crate) client: &'a DanceClient,
}

impl<'a> Auth<'a> {
    /// Log in with username and password.
    ///
    /// Stores the token, profile and derived role, and leaves demo mode. The
    /// call is not retried and raises no notification; surfacing the failure
    /// is up to the caller.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, SdkError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let resp: TokenResponse = self
            .client
            .http
            .post("/v1/auth/login", &request, Some(RequestContext::new().no_retry().silent()))
            .await?
            .into_data();

        if resp.access_token.is_empty() {
            return Err(AuthError::LoginFailed("server returned an empty token".into()).into());
        }

        let role = if resp.user.is_admin { ADMIN_ROLE } else { USER_ROLE };
        self.client
            .session
            .replace(Session {
                token: resp.access_token.clone(),
                user_info: resp.user.clone(),
                roles: [role.to_string()].into_iter().collect(),
                is_demo: false,
            })
            .await?;

        tracing::info!(username, role, "Logged in");
        Ok(resp)
    }

    /// Log in to the admin area. Non-admin accounts are logged straight back
    /// out and rejected.
    pub async fn admin_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, SdkError> {
        let resp = self.login(username, password).await?;
        if !resp.user.is_admin {
            tracing::warn!(username, "Admin login refused for non-admin account");
            self.client.session.reset_state().await?;
            return Err(AuthError::NotAdmin.into());
        }
        Ok(resp)
    }

    /// Start a client-only demo session. No server call is made.
    pub async fn demo_login(&self) -> Result<UserInfo, SdkError> {
        let user = demo_user();
        self.client
            .session
            .replace(Session {
                token: format!("{}{}", DEMO_TOKEN_PREFIX, chrono::Utc::now().timestamp_millis()),
                user_info: user.clone(),
                roles: [USER_ROLE.to_string()].into_iter().collect(),
                is_demo: true,
            })
            .await?;
        tracing::info!("Demo session started");
        Ok(user)
    }

    /// End the session and move to the login route for the current area.
    ///
    /// The server is told unless the session is a demo one; that call's
    /// failure does not stop the local logout.
    pub async fn logout(&self) -> Result<(), SdkError> {
        if !self.client.session.is_demo().await {
            let ctx = RequestContext::new().no_retry().silent().without_loading();
            if let Err(e) = self
                .client
                .http
                .post::<Value, _>("/v1/auth/logout", &serde_json::json!({}), Some(ctx))
                .await
            {
                tracing::debug!("Server logout failed: {}", e);
            }
        }

        self.client.session.reset_state().await?;
        self.client.http.redirect_to_login();
        Ok(())
    }

    /// Fetch the current user's profile and store it.
    pub async fn me(&self) -> Result<UserInfo, SdkError> {
        let data: Value = self
            .client
            .http
            .get("/v1/users/me", None, None)
            .await?
            .into_data();

        let user: UserInfo = serde_json::from_value(data.clone())?;
        self.client.session.set_user_info(user.clone()).await?;

        if let Some(roles) = data.get("roles").and_then(Value::as_array) {
            let roles: Vec<String> = roles
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            self.client.session.set_roles(roles).await?;
        }
        Ok(user)
    }

    /// Update the current user's profile.
    ///
    /// Admins update through their user record, everyone else through
    /// `/v1/users/me`. The server's answer is merged into the stored profile.
    pub async fn update_profile<B: Serialize + ?Sized>(
        &self,
        patch: &B,
    ) -> Result<UserInfo, SdkError> {
        let session = self.client.session.snapshot().await;
        if !session.is_logged_in() {
            return Err(AuthError::NotAuthenticated.into());
        }

        let endpoint = if session.is_admin() {
            format!("/v1/users/{}", session.user_info.id)
        } else {
            "/v1/users/me".to_string()
        };

        let data: Value = self
            .client
            .http
            .put(&endpoint, patch, None)
            .await?
            .into_data();
        if data.is_object() {
            self.client.session.merge_user_info(&data).await?;
        }
        Ok(self.client.session.user_info().await)
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), SdkError> {
        request.validate()?;
        let _: Value = self
            .client
            .http
            .post(
                "/v1/auth/register",
                request,
                Some(RequestContext::new().no_retry()),
            )
            .await?
            .into_data();
        tracing::info!(username = %request.username, "Registered account");
        Ok(())
    }
}
