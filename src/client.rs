//! High-level client: `DanceClient` with sub-client accessors.
//!
//! Owns the shared session, the API client and the chat configuration.
//! Sub-clients borrow it: `client.auth().login(..)`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::client::Auth;
use crate::error::SdkError;
use crate::http::transport::Transport;
use crate::http::{ApiClient, RetryConfig};
use crate::network::{
    DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_WS_URL, ENV_API_BASE_URL, ENV_SESSION_FILE,
    ENV_TIMEOUT_SECS, ENV_WS_URL,
};
use crate::session::{FileStorage, MemoryStorage, SessionStorage, SessionStore};
use crate::ui::{LoadingIndicator, LoginRoutes, Navigator, Notifier};
use crate::ws::WsConfig;

// Re-export sub-client types for convenience.
pub use crate::auth::client::Auth as AuthClient;

/// The primary entry point for the dance platform SDK.
#[derive(Clone)]
pub struct DanceClient {
    pub(crate) http: ApiClient,
    pub(crate) session: SessionStore,
    pub(crate) ws_config: WsConfig,
}

impl DanceClient {
    pub fn builder() -> DanceClientBuilder {
        DanceClientBuilder::default()
    }

    // ── Sub-client accessors ─────────────────────────────────────────────

    /// The API client, for endpoints this SDK has no typed wrapper for.
    pub fn http(&self) -> &ApiClient {
        &self.http
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn auth(&self) -> Auth<'_> {
        Auth { client: self }
    }

    pub fn ws_config(&self) -> &WsConfig {
        &self.ws_config
    }

    /// A new chat client bound to this client's session.
    ///
    /// Not embedded in `DanceClient`: the socket's lifetime usually follows
    /// a screen or component, not the whole application.
    #[cfg(feature = "ws-native")]
    pub fn chat(&self) -> crate::ws::native::ChatClient {
        crate::ws::native::ChatClient::new(self.ws_config.clone(), self.session.clone())
    }
}

impl std::fmt::Debug for DanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DanceClient")
            .field("http", &self.http)
            .field("ws_config", &self.ws_config)
            .finish()
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Builder
// ═════════════════════════════════════════════════════════════════════════════

pub struct DanceClientBuilder {
    base_url: String,
    ws_url: String,
    timeout: Duration,
    retry_config: RetryConfig,
    session_storage: Option<Arc<dyn SessionStorage>>,
    navigator: Option<Arc<dyn Navigator>>,
    notifier: Option<Arc<dyn Notifier>>,
    loading_indicator: Option<Arc<dyn LoadingIndicator>>,
    login_routes: LoginRoutes,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for DanceClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_config: RetryConfig::default(),
            session_storage: None,
            navigator: None,
            notifier: None,
            loading_indicator: None,
            login_routes: LoginRoutes::default(),
            transport: None,
        }
    }
}

impl DanceClientBuilder {
    /// Start from the environment.
    ///
    /// Reads the API base URL, WebSocket URL, timeout (seconds) and session
    /// file path. Unset variables keep their defaults; a malformed timeout
    /// is a validation error.
    pub fn from_env() -> Result<Self, SdkError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SdkError> {
        let mut builder = Self::default();
        if let Some(url) = lookup(ENV_API_BASE_URL) {
            builder = builder.base_url(&url);
        }
        if let Some(url) = lookup(ENV_WS_URL) {
            builder = builder.ws_url(&url);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                SdkError::Validation(format!("{} must be whole seconds, got '{}'", ENV_TIMEOUT_SECS, raw))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(path) = lookup(ENV_SESSION_FILE) {
            builder = builder.session_file(PathBuf::from(path));
        }
        Ok(builder)
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn ws_url(mut self, url: &str) -> Self {
        self.ws_url = url.to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn session_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.session_storage = Some(storage);
        self
    }

    /// Persist the session as a JSON file at `path`.
    pub fn session_file(self, path: impl Into<PathBuf>) -> Self {
        self.session_storage(Arc::new(FileStorage::new(path)))
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn loading_indicator(mut self, indicator: Arc<dyn LoadingIndicator>) -> Self {
        self.loading_indicator = Some(indicator);
        self
    }

    pub fn login_routes(mut self, routes: LoginRoutes) -> Self {
        self.login_routes = routes;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<DanceClient, SdkError> {
        let storage = self
            .session_storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let session = SessionStore::new(storage);

        let mut http = ApiClient::builder()
            .base_url(&self.base_url)
            .timeout(self.timeout)
            .session(session.clone())
            .retry_config(self.retry_config)
            .login_routes(self.login_routes);
        if let Some(transport) = self.transport {
            http = http.transport(transport);
        }
        if let Some(navigator) = self.navigator {
            http = http.navigator(navigator);
        }
        if let Some(notifier) = self.notifier {
            http = http.notifier(notifier);
        }
        if let Some(indicator) = self.loading_indicator {
            http = http.loading_indicator(indicator);
        }

        Ok(DanceClient {
            http: http.build()?,
            session,
            ws_config: WsConfig {
                url: self.ws_url,
                ..WsConfig::default()
            },
        })
    }
}
