//! HTTP layer: `ApiClient` with envelope unwrapping, bounded retry and
//! loading/error side effects.

pub mod client;
pub mod context;
pub mod envelope;
pub mod ids;
pub mod loading;
pub mod params;
pub mod retry;
pub mod status;
pub mod transport;

pub use client::{ApiClient, ApiClientBuilder};
pub use context::{ErrorHandler, RequestContext};
pub use envelope::{Envelope, Payload};
pub use loading::{LoadingGuard, LoadingTracker};
pub use params::Params;
pub use retry::RetryConfig;
pub use transport::{
    FormPart, HttpRequest, HttpResponse, Method, MultipartForm, RequestBody, ReqwestTransport,
    Transport,
};
