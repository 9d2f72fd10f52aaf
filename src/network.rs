//! Network URL and route constants for the dance platform SDK.

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Default WebSocket base URL (the chat path is appended per connection).
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000";

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Path prefix that marks the admin area.
pub const ADMIN_PATH_PREFIX: &str = "/admin";

/// Login route for admin paths.
pub const ADMIN_LOGIN_ROUTE: &str = "/admin/login";

/// Login route for everything else.
pub const LOGIN_ROUTE: &str = "/login";

/// Environment variables read by `DanceClientBuilder::from_env`.
pub const ENV_API_BASE_URL: &str = "DANCE_API_BASE_URL";
pub const ENV_WS_URL: &str = "DANCE_WS_URL";
pub const ENV_TIMEOUT_SECS: &str = "DANCE_API_TIMEOUT_SECS";
pub const ENV_SESSION_FILE: &str = "DANCE_SESSION_FILE";
