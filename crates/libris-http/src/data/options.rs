use std::fmt;
use std::time::Duration;

use http::Method;

use crate::data::{AbortSignal, ProgressCallback};

/// Per-call options for [`crate::ApiClient::get`].
///
/// # Examples
///
/// ```
/// use libris_http::GetOptions;
/// use std::time::Duration;
///
/// let options = GetOptions::default().cache_time(Duration::from_secs(60));
/// assert!(options.use_cache);
///
/// let fresh = GetOptions::default().no_cache();
/// assert!(!fresh.use_cache);
/// ```
#[derive(Debug, Clone)]
pub struct GetOptions {
    /// Consult and populate the response cache (eligible endpoints only).
    ///
    /// Default: true
    pub use_cache: bool,

    /// TTL for the stored entry; the client default when unset.
    pub cache_time: Option<Duration>,

    /// Caller-side cancellation in addition to supersession.
    pub signal: Option<AbortSignal>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_time: None,
            signal: None,
        }
    }
}

impl GetOptions {
    #[must_use]
    pub fn no_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    #[must_use]
    pub fn cache_time(mut self, ttl: Duration) -> Self {
        self.cache_time = Some(ttl);
        self
    }

    #[must_use]
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// Options for POST/PUT/DELETE.
#[derive(Debug, Clone, Default)]
pub struct MutationOptions {
    /// Substring of cache keys to invalidate once the call succeeds.
    pub clear_cache_pattern: Option<String>,
}

impl MutationOptions {
    pub fn clear_cache(pattern: impl Into<String>) -> Self {
        Self {
            clear_cache_pattern: Some(pattern.into()),
        }
    }
}

/// Options for multipart uploads.
#[derive(Clone, Default)]
pub struct UploadOptions {
    /// Verb to send; POST when unset.
    pub method: Option<Method>,
    pub on_progress: Option<ProgressCallback>,
    pub clear_cache_pattern: Option<String>,
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("method", &self.method)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "{ ... }"))
            .field("clear_cache_pattern", &self.clear_cache_pattern)
            .finish()
    }
}

impl UploadOptions {
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn on_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    #[must_use]
    pub fn clear_cache(mut self, pattern: impl Into<String>) -> Self {
        self.clear_cache_pattern = Some(pattern.into());
        self
    }
}
