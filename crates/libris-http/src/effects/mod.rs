//! Side-effecting components: transports, the response cache, the in-flight
//! registry, the interceptor pipeline, session storage and the client.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod cache;
pub mod client;
pub mod in_flight;
pub mod interceptors;
pub mod pipeline;
pub mod session;
pub mod transport;

pub use cache::{CacheEntry, ResponseCache};
pub use client::ApiClient;
pub use in_flight::{InFlightGuard, InFlightRegistry};
pub use interceptors::{
    AuthHeaderInjector, DevLogger, NetworkAuthErrorHandler, NoticePayloadReshaper,
    SessionExpiryResponder, StandardInterceptors, install_standard_interceptors,
};
pub use pipeline::{
    ErrorHandler, HttpPipeline, InterceptorHandle, InterceptorKind, RequestInterceptor,
    ResponseInterceptor,
};
pub use session::{
    FileSessionStore, LOGIN_ROUTE, MemorySessionStore, Navigator, RouteTracker, Session,
    SessionStore,
};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::Transport;

/// Lock a mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
