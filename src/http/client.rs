//! Resilient API client: `ApiClient`.
//!
//! Every call runs the same pipeline: hold the loading indicator, attach the
//! bearer token, a request id and (for GET) a cache-busting stamp, send with
//! bounded retry, unwrap the response envelope and report failures through
//! the injected collaborators.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::HttpError;
use crate::http::context::RequestContext;
use crate::http::envelope::{self, Classified, Payload, CODE_AUTH_EXPIRED};
use crate::http::ids::{self, CacheBuster};
use crate::http::loading::LoadingTracker;
use crate::http::params::Params;
use crate::http::retry::RetryConfig;
use crate::http::status::{self, UNKNOWN_MESSAGE};
use crate::http::transport::{
    HttpRequest, HttpResponse, Method, MultipartForm, RequestBody, ReqwestTransport, Transport,
};
use crate::network::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use crate::session::SessionStore;
use crate::ui::{
    LoadingIndicator, LogNotifier, LoginRoutes, MemoryNavigator, Navigator, Notifier, NotifyLevel,
};

/// Query parameter carrying the cache-busting stamp on GET requests.
pub const CACHE_BUST_PARAM: &str = "_t";

/// HTTP client for the dance platform REST API.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    loading: LoadingTracker,
    retry_config: RetryConfig,
    login_routes: LoginRoutes,
    cache_buster: Arc<CacheBuster>,
}

impl ApiClient {
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn loading(&self) -> &LoadingTracker {
        &self.loading
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn login_routes(&self) -> &LoginRoutes {
        &self.login_routes
    }

    /// Absolute URL for `path`. Absolute URLs pass through untouched.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send the user to the login route matching their current area.
    ///
    /// Does nothing when they are already there.
    pub fn redirect_to_login(&self) {
        let current = self.navigator.current_path();
        let route = self.login_routes.route_for(&current);
        if current != route {
            self.navigator.navigate_to(route);
        }
    }

    // ── Verbs ────────────────────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<&Params>,
        ctx: Option<RequestContext>,
    ) -> Result<Payload<T>, HttpError> {
        let request = self.request(Method::GET, path, params, RequestBody::Empty);
        self.call(path, request, ctx).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<&Params>,
        ctx: Option<RequestContext>,
    ) -> Result<Payload<T>, HttpError> {
        let request = self.request(Method::DELETE, path, params, RequestBody::Empty);
        self.call(path, request, ctx).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        ctx: Option<RequestContext>,
    ) -> Result<Payload<T>, HttpError> {
        self.send_json(Method::POST, path, body, ctx).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        ctx: Option<RequestContext>,
    ) -> Result<Payload<T>, HttpError> {
        self.send_json(Method::PUT, path, body, ctx).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        ctx: Option<RequestContext>,
    ) -> Result<Payload<T>, HttpError> {
        self.send_json(Method::PATCH, path, body, ctx).await
    }

    /// POST a multipart form.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        form: MultipartForm,
        ctx: Option<RequestContext>,
    ) -> Result<Payload<T>, HttpError> {
        let request = self.request(Method::POST, path, None, RequestBody::Multipart(form));
        self.call(path, request, ctx).await
    }

    /// GET `path` and write the response body to `dest`. Returns the number
    /// of bytes written.
    ///
    /// A JSON response is inspected as an envelope first, so a failed
    /// envelope is reported instead of being saved.
    pub async fn download(
        &self,
        path: &str,
        params: Option<&Params>,
        dest: impl AsRef<Path>,
        ctx: Option<RequestContext>,
    ) -> Result<u64, HttpError> {
        let ctx = ctx.unwrap_or_default();
        let request_id = ids::request_id();
        let request = self.request(Method::GET, path, params, RequestBody::Empty);

        let guard = ctx.loading.then(|| self.loading.begin());
        let result = match self.send_with_retry(&request, &ctx, &request_id).await {
            Ok(resp) => save_download(resp, dest.as_ref()).await,
            Err(e) => Err(e),
        };
        drop(guard);

        self.settle(result, &ctx, path, &request_id).await
    }

    // ── Pipeline ─────────────────────────────────────────────────────────

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        ctx: Option<RequestContext>,
    ) -> Result<Payload<T>, HttpError> {
        let value = serde_json::to_value(body)
            .map_err(|e| HttpError::InvalidRequest(format!("Unserializable body: {}", e)))?;
        let request = self.request(method, path, None, RequestBody::Json(value));
        self.call(path, request, ctx).await
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        params: Option<&Params>,
        body: RequestBody,
    ) -> HttpRequest {
        let mut request = HttpRequest::new(method, self.url(path));
        if let Some(params) = params {
            request.query.extend(params.pairs().iter().cloned());
        }
        request.body = body;
        request
    }

    async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        request: HttpRequest,
        ctx: Option<RequestContext>,
    ) -> Result<Payload<T>, HttpError> {
        let ctx = ctx.unwrap_or_default();
        let request_id = ids::request_id();

        let guard = ctx.loading.then(|| self.loading.begin());
        let result = self
            .send_with_retry(&request, &ctx, &request_id)
            .await
            .and_then(interpret::<T>);
        drop(guard);

        self.settle(result, &ctx, path, &request_id).await
    }

    /// Send until success, a non-retryable failure, or the retry budget runs
    /// out. Non-2xx statuses come back as errors.
    async fn send_with_retry(
        &self,
        base: &HttpRequest,
        ctx: &RequestContext,
        request_id: &str,
    ) -> Result<HttpResponse, HttpError> {
        let mut retry_count = ctx.retry_count;
        loop {
            let request = self.prepare(base, request_id).await;
            tracing::debug!(
                request_id,
                method = %request.method,
                url = %request.url,
                retry_count,
                "Sending request"
            );

            let error = match self.transport.send(&request).await {
                Ok(resp) if resp.is_success() => return Ok(resp),
                Ok(resp) => status_error(&resp),
                Err(e) => e,
            };

            let retry = ctx.retry
                && self.retry_config.is_retryable(&error)
                && self.retry_config.has_budget(retry_count);
            if !retry {
                return Err(error);
            }

            let delay = self.retry_config.delay_for_attempt(retry_count);
            retry_count += 1;
            tracing::debug!(
                request_id,
                attempt = retry_count,
                max = self.retry_config.max_retries,
                delay_ms = delay.as_millis() as u64,
                "Retrying request to {}: {}",
                base.url,
                error
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Per-attempt headers and parameters. The token is re-read every attempt.
    async fn prepare(&self, base: &HttpRequest, request_id: &str) -> HttpRequest {
        let mut request = base.clone();
        if let Some(token) = self.session.token().await {
            request
                .headers
                .push(("Authorization".into(), format!("Bearer {}", token)));
        }
        request
            .headers
            .push(("X-Request-ID".into(), request_id.to_string()));
        if request.method == Method::GET {
            request.query.push((
                CACHE_BUST_PARAM.into(),
                self.cache_buster.next().to_string(),
            ));
        }
        request
    }

    /// `path` is the path the caller passed, not the resolved URL.
    async fn settle<R>(
        &self,
        result: Result<R, HttpError>,
        ctx: &RequestContext,
        path: &str,
        request_id: &str,
    ) -> Result<R, HttpError> {
        if let Err(error) = &result {
            self.report(error, ctx, path, request_id).await;
        }
        result
    }

    async fn report(&self, error: &HttpError, ctx: &RequestContext, path: &str, request_id: &str) {
        tracing::error!(
            request_id,
            path,
            status = ?error.status(),
            "Request failed: {}",
            error
        );

        if self.session.is_demo().await {
            return;
        }

        if error.is_auth_expired() {
            if let Err(e) = self.session.reset_state().await {
                tracing::warn!("Failed to clear persisted session: {}", e);
            }
            self.redirect_to_login();
        }

        match &ctx.custom_error_handler {
            Some(handler) => handler(error),
            None if ctx.show_error => self.notifier.show(&error.message(), NotifyLevel::Error),
            None => {}
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("retry_config", &self.retry_config)
            .field("login_routes", &self.login_routes)
            .field("loading", &self.loading)
            .finish()
    }
}

/// Map a non-2xx response to an error.
fn status_error(resp: &HttpResponse) -> HttpError {
    if resp.status == 401 {
        return HttpError::AuthExpired {
            message: status::message_for_status(401, None),
        };
    }
    let data = resp.json_body().ok().filter(|v| !v.is_null());
    let detail = data.as_ref().and_then(status::server_detail);
    HttpError::Status {
        status: resp.status,
        message: status::message_for_status(resp.status, detail.as_deref()),
        data,
    }
}

/// Map a classified envelope failure to an error.
fn envelope_error(code: i64, message: Option<String>, data: Option<serde_json::Value>) -> HttpError {
    if code == CODE_AUTH_EXPIRED {
        return HttpError::AuthExpired {
            message: message.unwrap_or_else(|| status::message_for_status(401, None)),
        };
    }
    HttpError::Application {
        code,
        message: message.unwrap_or_else(|| UNKNOWN_MESSAGE.to_string()),
        data,
    }
}

fn interpret<T: DeserializeOwned>(resp: HttpResponse) -> Result<Payload<T>, HttpError> {
    match envelope::classify(resp.json_body()?) {
        Classified::Failure {
            code,
            message,
            data,
        } => Err(envelope_error(code, message, data)),
        success => envelope::decode(success),
    }
}

fn is_json(resp: &HttpResponse) -> bool {
    resp.headers.iter().any(|(k, v)| {
        k.eq_ignore_ascii_case("content-type") && v.to_ascii_lowercase().contains("application/json")
    })
}

async fn save_download(resp: HttpResponse, dest: &Path) -> Result<u64, HttpError> {
    if is_json(&resp) {
        if let Ok(body) = resp.json_body() {
            if let Classified::Failure {
                code,
                message,
                data,
            } = envelope::classify(body)
            {
                return Err(envelope_error(code, message, data));
            }
        }
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| HttpError::Io(format!("{}: {}", parent.display(), e)))?;
    }
    tokio::fs::write(dest, &resp.body)
        .await
        .map_err(|e| HttpError::Io(format!("{}: {}", dest.display(), e)))?;
    Ok(resp.body.len() as u64)
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    base_url: String,
    timeout: Duration,
    transport: Option<Arc<dyn Transport>>,
    session: Option<SessionStore>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    loading: Option<LoadingTracker>,
    retry_config: RetryConfig,
    login_routes: LoginRoutes,
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            transport: None,
            session: None,
            navigator: Arc::new(MemoryNavigator::default()),
            notifier: Arc::new(LogNotifier),
            loading: None,
            retry_config: RetryConfig::default(),
            login_routes: LoginRoutes::default(),
        }
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Request timeout for the default transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn loading_indicator(mut self, indicator: Arc<dyn LoadingIndicator>) -> Self {
        self.loading = Some(LoadingTracker::new(indicator));
        self
    }

    /// Share an existing tracker, e.g. between several clients.
    pub fn loading(mut self, tracker: LoadingTracker) -> Self {
        self.loading = Some(tracker);
        self
    }

    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn login_routes(mut self, routes: LoginRoutes) -> Self {
        self.login_routes = routes;
        self
    }

    pub fn build(self) -> Result<ApiClient, HttpError> {
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new(self.timeout)?),
        };
        Ok(ApiClient {
            base_url: self.base_url,
            transport,
            session: self.session.unwrap_or_else(SessionStore::in_memory),
            navigator: self.navigator,
            notifier: self.notifier,
            loading: self.loading.unwrap_or_default(),
            retry_config: self.retry_config,
            login_routes: self.login_routes,
            cache_buster: Arc::new(CacheBuster::new()),
        })
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
