//! Client-side session: token, user profile, roles, demo flag.
//!
//! [`SessionStore`] is the only owner of the [`Session`]. The API client reads
//! the token and demo flag from it and calls [`SessionStore::reset_state`] when
//! the server reports that authentication has expired; every other mutation
//! comes from the auth sub-client or the application.
//!
//! Every mutation is written through to the injected [`SessionStorage`].

pub mod storage;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_lock::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

pub use storage::{FileStorage, MemoryStorage, SessionStorage};

/// Role granted to administrators.
pub const ADMIN_ROLE: &str = "admin";

/// Role granted to every other account.
pub const USER_ROLE: &str = "user";

// ============================================================================
// Types
// ============================================================================

/// Profile of the logged-in user.
///
/// Unknown fields returned by the server are kept in `extra` so that a
/// persisted profile survives a round trip unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Persisted session state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub user_info: UserInfo,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub is_demo: bool,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(ADMIN_ROLE)
    }
}

// ============================================================================
// Store
// ============================================================================

/// Shared, cheaply cloneable handle to the session.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<RwLock<Session>>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    /// Create a store hydrated from `storage`.
    ///
    /// Unreadable or corrupt storage yields an empty session.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let session = match storage.load() {
            Ok(Some(session)) => session,
            Ok(None) => Session::default(),
            Err(e) => {
                tracing::warn!("Discarding unreadable persisted session: {}", e);
                Session::default()
            }
        };
        Self {
            state: Arc::new(RwLock::new(session)),
            storage,
        }
    }

    /// A store backed by [`MemoryStorage`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// The bearer token, `None` when logged out.
    pub async fn token(&self) -> Option<String> {
        let state = self.state.read().await;
        (!state.token.is_empty()).then(|| state.token.clone())
    }

    pub async fn is_demo(&self) -> bool {
        self.state.read().await.is_demo
    }

    pub async fn snapshot(&self) -> Session {
        self.state.read().await.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state.read().await.is_logged_in()
    }

    pub async fn is_admin(&self) -> bool {
        self.state.read().await.is_admin()
    }

    pub async fn user_info(&self) -> UserInfo {
        self.state.read().await.user_info.clone()
    }

    pub async fn username(&self) -> String {
        self.state.read().await.user_info.username.clone()
    }

    /// Nickname, falling back to the username.
    pub async fn nickname(&self) -> String {
        let state = self.state.read().await;
        state
            .user_info
            .nickname
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| state.user_info.username.clone())
    }

    /// Whether the current session may access something guarded by `role`.
    pub async fn has_permission(&self, role: &str) -> bool {
        let state = self.state.read().await;
        if !state.is_logged_in() {
            return false;
        }
        if role == ADMIN_ROLE {
            return state.is_admin();
        }
        true
    }

    // ── Writes ───────────────────────────────────────────────────────────

    pub async fn set_token(&self, token: &str) -> Result<(), SessionError> {
        self.update(|s| s.token = token.to_string()).await
    }

    pub async fn set_user_info(&self, user_info: UserInfo) -> Result<(), SessionError> {
        self.update(|s| s.user_info = user_info).await
    }

    /// Shallow-merge a JSON object into the stored profile.
    pub async fn merge_user_info(&self, patch: &serde_json::Value) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        let mut current = serde_json::to_value(&state.user_info)?;
        if let (Some(target), Some(source)) = (current.as_object_mut(), patch.as_object()) {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        }
        state.user_info = serde_json::from_value(current)?;
        self.storage.save(&state)
    }

    pub async fn set_roles<I, S>(&self, roles: I) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles: BTreeSet<String> = roles.into_iter().map(Into::into).collect();
        self.update(|s| s.roles = roles).await
    }

    pub async fn set_demo(&self, is_demo: bool) -> Result<(), SessionError> {
        self.update(|s| s.is_demo = is_demo).await
    }

    /// Replace the whole session at once.
    pub async fn replace(&self, session: Session) -> Result<(), SessionError> {
        self.update(|s| *s = session).await
    }

    /// Clear every field and the persisted copy.
    pub async fn reset_state(&self) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        *state = Session::default();
        tracing::info!("Session reset");
        self.storage.clear()
    }

    async fn update(&self, f: impl FnOnce(&mut Session)) -> Result<(), SessionError> {
        let mut state = self.state.write().await;
        f(&mut state);
        self.storage.save(&state)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Token stays out of logs.
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn logged_in(roles: &[&str]) -> Session {
        Session {
            token: "tok".into(),
            user_info: UserInfo {
                id: 3,
                username: "lin".into(),
                ..UserInfo::default()
            },
            roles: roles.iter().map(|r| r.to_string()).collect(),
            is_demo: false,
        }
    }

    #[tokio::test]
    async fn test_hydrates_from_storage() {
        let storage = Arc::new(MemoryStorage::with_session(logged_in(&["user"])));
        let store = SessionStore::new(storage);
        assert_eq!(store.token().await.as_deref(), Some("tok"));
        assert!(store.is_logged_in().await);
        assert!(!store.is_admin().await);
    }

    #[tokio::test]
    async fn test_empty_token_reads_as_none() {
        let store = SessionStore::in_memory();
        assert!(store.token().await.is_none());
        assert!(!store.is_logged_in().await);
    }

    #[tokio::test]
    async fn test_writes_are_persisted() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());
        store.set_token("fresh").await.unwrap();
        store.set_roles(["admin"]).await.unwrap();

        let persisted = storage.load().unwrap().unwrap();
        assert_eq!(persisted.token, "fresh");
        assert!(persisted.is_admin());
    }

    #[tokio::test]
    async fn test_reset_state_clears_everything() {
        let storage = Arc::new(MemoryStorage::with_session(logged_in(&["admin"])));
        let store = SessionStore::new(storage.clone());
        store.set_demo(true).await.unwrap();

        store.reset_state().await.unwrap();

        assert_eq!(store.snapshot().await, Session::default());
        assert!(storage.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_has_permission() {
        let store = SessionStore::in_memory();
        assert!(!store.has_permission("user").await);

        store.replace(logged_in(&["user"])).await.unwrap();
        assert!(store.has_permission("user").await);
        assert!(!store.has_permission(ADMIN_ROLE).await);

        store.set_roles([ADMIN_ROLE]).await.unwrap();
        assert!(store.has_permission(ADMIN_ROLE).await);
    }

    #[tokio::test]
    async fn test_nickname_falls_back_to_username() {
        let store = SessionStore::in_memory();
        store.replace(logged_in(&["user"])).await.unwrap();
        assert_eq!(store.nickname().await, "lin");

        store
            .merge_user_info(&json!({"nickname": "Lin the Dancer", "level": "B2"}))
            .await
            .unwrap();
        assert_eq!(store.nickname().await, "Lin the Dancer");

        let info = store.user_info().await;
        assert_eq!(info.username, "lin");
        assert_eq!(info.extra.get("level"), Some(&json!("B2")));
    }

    #[test]
    fn test_user_info_deserializes_empty_object() {
        let info: UserInfo = serde_json::from_str("{}").unwrap();
        assert_eq!(info, UserInfo::default());
    }

    #[test]
    fn test_corrupt_storage_yields_empty_session() {
        struct Broken;
        impl SessionStorage for Broken {
            fn load(&self) -> Result<Option<Session>, SessionError> {
                Err(serde_json::from_str::<Session>("{").unwrap_err().into())
            }
            fn save(&self, _: &Session) -> Result<(), SessionError> {
                Ok(())
            }
            fn clear(&self) -> Result<(), SessionError> {
                Ok(())
            }
        }

        let store = SessionStore::new(Arc::new(Broken));
        let session = tokio_test::block_on(store.snapshot());
        assert_eq!(session, Session::default());
    }
}
