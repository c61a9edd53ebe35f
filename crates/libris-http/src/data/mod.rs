//! Immutable data types for the client.
//!
//! Configuration, request/response shapes, per-call options and progress
//! snapshots. Nothing here performs I/O except [`FilePart::from_path`].

mod config;
mod form;
mod options;
mod params;
mod payload;
mod progress;
mod request;
mod response;
mod signal;

pub use config::{
    CacheRule, ClientConfig, ConfigResolver, DEFAULT_API_PATHS, ENV_API_URL, ENV_ENVIRONMENT,
    Environment, EnvironmentUrls,
};
pub use form::{DEFAULT_FILE_FIELD, FilePart, METHOD_OVERRIDE_FIELD, MultipartForm};
pub use options::{GetOptions, MutationOptions, UploadOptions};
pub use params::QueryParams;
pub use payload::ApiPayload;
pub use progress::{ProgressCallback, TransferProgress};
pub use request::{Body, HttpRequest, RequestConfig, RequestInput};
pub use response::HttpResponse;
pub use signal::{AbortController, AbortSignal};
