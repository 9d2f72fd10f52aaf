//! # Dance Platform SDK
//!
//! Client SDK for the dance learning platform: a resilient REST client, a
//! persisted session, authentication flows and the chat WebSocket.
//!
//! ## Architecture
//!
//! The SDK is organized in layers:
//!
//! 1. **Core** — Errors, network constants, collaborator seams (navigation,
//!    notifications, loading indicator)
//! 2. **Session** — Token, profile, roles and demo flag with pluggable storage
//! 3. **HTTP API** — `ApiClient`: envelope unwrapping, bounded retry,
//!    loading/error side effects
//! 4. **WebSocket** — `tokio-tungstenite` chat client with reconnect and
//!    presence tracking
//! 5. **High-Level Client** — `DanceClient` with the auth sub-client
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dance_platform_sdk::prelude::*;
//!
//! let client = DanceClient::builder()
//!     .base_url("https://dance.example.com/api")
//!     .session_file("session.json")
//!     .build()?;
//!
//! client.auth().login("ana", "s3cret-pass").await?;
//! let courses: Payload<serde_json::Value> = client
//!     .http()
//!     .get("/v1/courses", Some(&Params::new().insert("page", 1)), None)
//!     .await?;
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Unified SDK error types.
pub mod error;

/// Network URL, route and environment constants.
pub mod network;

/// Navigation, notification and loading-indicator seams.
pub mod ui;

// ── Layer 2: Session ─────────────────────────────────────────────────────────

/// Client-side session state and persistence.
pub mod session;

/// Authentication wire types and the auth sub-client.
pub mod auth;

// ── Layer 3: HTTP API ────────────────────────────────────────────────────────

/// HTTP client with envelope handling and retry.
#[cfg(feature = "http")]
pub mod http;

// ── Layer 4: WebSocket ───────────────────────────────────────────────────────

/// Chat WebSocket: messages, events, presence.
pub mod ws;

// ── Layer 5: High-Level Client ───────────────────────────────────────────────

/// `DanceClient`, the primary entry point.
#[cfg(feature = "http")]
pub mod client;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Errors
    pub use crate::error::{AuthError, ErrorInfo, HttpError, SdkError, SessionError, WsError};

    // Network
    pub use crate::network::{DEFAULT_API_URL, DEFAULT_WS_URL};

    // Collaborators
    pub use crate::ui::{
        LoadingIndicator, LogNotifier, LoginRoutes, MemoryNavigator, Navigator, NoopIndicator,
        Notifier, NotifyLevel,
    };

    // Session
    pub use crate::session::{
        FileStorage, MemoryStorage, Session, SessionStorage, SessionStore, UserInfo,
    };

    // Auth types
    pub use crate::auth::{RegisterRequest, TokenResponse};

    // HTTP client
    #[cfg(feature = "http")]
    pub use crate::client::{AuthClient, DanceClient, DanceClientBuilder};
    #[cfg(feature = "http")]
    pub use crate::http::{
        ApiClient, ApiClientBuilder, Envelope, HttpRequest, HttpResponse, LoadingTracker,
        MultipartForm, Params, Payload, RequestContext, RetryConfig, Transport,
    };

    // WebSocket types
    pub use crate::ws::{ChatEvent, MessageOut, OnlineUser, TargetType, WsConfig, WsEvent};
    #[cfg(feature = "ws-native")]
    pub use crate::ws::native::ChatClient;
}
