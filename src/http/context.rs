//! Per-call request configuration.

use std::sync::Arc;

use crate::error::HttpError;

/// Caller-supplied error callback. Replaces the default notification.
pub type ErrorHandler = Arc<dyn Fn(&HttpError) + Send + Sync>;

/// Per-call configuration. Created fresh for each outgoing call.
#[derive(Clone)]
pub struct RequestContext {
    /// Resubmit transient failures with backoff.
    pub retry: bool,
    /// Retries already spent; the backoff delay is derived from it.
    pub retry_count: u32,
    /// Hold the shared loading indicator for the duration of the call.
    pub loading: bool,
    /// Show a notification when the call fails.
    pub show_error: bool,
    /// Invoked instead of the notification when the call fails.
    pub custom_error_handler: Option<ErrorHandler>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            retry: true,
            retry_count: 0,
            loading: true,
            show_error: true,
            custom_error_handler: None,
        }
    }
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_retry(mut self) -> Self {
        self.retry = false;
        self
    }

    pub fn without_loading(mut self) -> Self {
        self.loading = false;
        self
    }

    /// Fail without a notification.
    pub fn silent(mut self) -> Self {
        self.show_error = false;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn on_error(mut self, handler: impl Fn(&HttpError) + Send + Sync + 'static) -> Self {
        self.custom_error_handler = Some(Arc::new(handler));
        self
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("retry", &self.retry)
            .field("retry_count", &self.retry_count)
            .field("loading", &self.loading)
            .field("show_error", &self.show_error)
            .field("custom_error_handler", &self.custom_error_handler.is_some())
            .finish()
    }
}
