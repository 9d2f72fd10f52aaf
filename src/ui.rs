//! Collaborator seams: navigation, notifications, loading indicator.
//!
//! The API client never talks to a concrete router or toast library. It is
//! handed these traits at construction time; the defaults here are headless
//! implementations suitable for CLIs, services and tests.

use std::sync::RwLock;

use crate::network::{ADMIN_LOGIN_ROUTE, ADMIN_PATH_PREFIX, LOGIN_ROUTE};

// ─── Navigation ──────────────────────────────────────────────────────────────

/// Client-side navigation capability.
pub trait Navigator: Send + Sync {
    /// The path the user is currently on.
    fn current_path(&self) -> String;

    /// Move the user to `route`.
    fn navigate_to(&self, route: &str);
}

/// Headless router that only remembers the current path.
#[derive(Debug)]
pub struct MemoryNavigator {
    path: RwLock<String>,
}

impl MemoryNavigator {
    pub fn new(initial_path: &str) -> Self {
        Self {
            path: RwLock::new(initial_path.to_string()),
        }
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        match self.path.read() {
            Ok(path) => path.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn navigate_to(&self, route: &str) {
        tracing::info!("Navigating to {}", route);
        match self.path.write() {
            Ok(mut path) => *path = route.to_string(),
            Err(poisoned) => *poisoned.into_inner() = route.to_string(),
        }
    }
}

/// Which login route to send the user to when their session expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRoutes {
    pub admin_prefix: String,
    pub admin_login: String,
    pub login: String,
}

impl Default for LoginRoutes {
    fn default() -> Self {
        Self {
            admin_prefix: ADMIN_PATH_PREFIX.to_string(),
            admin_login: ADMIN_LOGIN_ROUTE.to_string(),
            login: LOGIN_ROUTE.to_string(),
        }
    }
}

impl LoginRoutes {
    /// Login route for a user currently on `path`.
    pub fn route_for(&self, path: &str) -> &str {
        if path.starts_with(&self.admin_prefix) {
            &self.admin_login
        } else {
            &self.login
        }
    }
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NotifyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User-visible, dismissible notification (a toast in a browser).
pub trait Notifier: Send + Sync {
    fn show(&self, message: &str, level: NotifyLevel);
}

/// Routes notifications to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show(&self, message: &str, level: NotifyLevel) {
        match level {
            NotifyLevel::Info | NotifyLevel::Success => tracing::info!(%level, "{}", message),
            NotifyLevel::Warning => tracing::warn!(%level, "{}", message),
            NotifyLevel::Error => tracing::error!(%level, "{}", message),
        }
    }
}

// ─── Loading indicator ───────────────────────────────────────────────────────

/// Shared busy indicator. `show` is called on the 0→1 transition of the
/// in-flight count and `hide` on the 1→0 transition.
pub trait LoadingIndicator: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopIndicator;

impl LoadingIndicator for NoopIndicator {
    fn show(&self) {}
    fn hide(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_route_for_admin_prefix() {
        let routes = LoginRoutes::default();
        assert_eq!(routes.route_for("/admin"), "/admin/login");
        assert_eq!(routes.route_for("/admin/courses/3"), "/admin/login");
        assert_eq!(routes.route_for("/courses"), "/login");
        assert_eq!(routes.route_for("/"), "/login");
    }

    #[test]
    fn test_memory_navigator_tracks_path() {
        let nav = MemoryNavigator::new("/social");
        assert_eq!(nav.current_path(), "/social");
        nav.navigate_to("/login");
        assert_eq!(nav.current_path(), "/login");
    }

    #[test]
    fn test_notify_level_display() {
        assert_eq!(NotifyLevel::Error.to_string(), "error");
        assert_eq!(NotifyLevel::Success.as_str(), "success");
    }
}
