//! HTTP client core for the Libris digital library front end.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - `data` - Immutable configuration, request/response and option types
//! - `core` - Pure transformations (URLs, cache keys, response parsing, payload shaping)
//! - `effects` - Transport, cache, in-flight registry, interceptor pipeline and client
//!
//! # Key Features
//!
//! - **Pipeline**: every call runs through ordered request, response and error chains
//! - **Cache**: opt-in per endpoint family, invalidated by substring after mutations
//! - **Supersession**: a newer identical GET aborts the stale one
//! - **Normalized failures**: every error reduces to an [`ApiError`] with a displayable message

mod core;
mod data;
mod effects;
mod error;

pub use core::{
    ContentKind, DEFAULT_NOTICE_USER_ID, DEFAULT_NOTIFICATION_TYPE, build_url, cache_key,
    classify_upload_response, encode_query, error_message, flatten_fields, guess_content_type,
    is_absolute_url, is_notice_mutation, join_base, parse_response, path_matches_prefix,
    reshape_notice_payload, url_path,
};
pub use data::{
    AbortController, AbortSignal, ApiPayload, Body, CacheRule, ClientConfig, ConfigResolver,
    DEFAULT_API_PATHS, DEFAULT_FILE_FIELD, ENV_API_URL, ENV_ENVIRONMENT, Environment,
    EnvironmentUrls, FilePart, GetOptions, HttpRequest, HttpResponse, METHOD_OVERRIDE_FIELD,
    MultipartForm, MutationOptions, ProgressCallback, QueryParams, RequestConfig, RequestInput,
    TransferProgress, UploadOptions,
};
pub use effects::cache::DEFAULT_CACHE_TTL;
pub use effects::interceptors::{DEFAULT_TEARDOWN_DELAY, SESSION_EXPIRED_MESSAGE};
pub use effects::session::{AUTH_TOKEN_KEY, LEGACY_TOKEN_KEY, USER_KEY};
pub use effects::{
    ApiClient, AuthHeaderInjector, CacheEntry, DevLogger, ErrorHandler, FileSessionStore,
    HttpPipeline, InFlightGuard, InFlightRegistry, InterceptorHandle, InterceptorKind,
    LOGIN_ROUTE, MemorySessionStore, Navigator, NetworkAuthErrorHandler, NoticePayloadReshaper,
    RequestInterceptor, ResponseCache, ResponseInterceptor, RouteTracker, Session,
    SessionExpiryResponder, SessionStore, StandardInterceptors, Transport,
    install_standard_interceptors,
};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestTransport;

pub use error::{ApiError, Error, Result};

/// Re-exported so callers can name methods, statuses and headers.
pub use http;
