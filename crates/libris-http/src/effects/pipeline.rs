//! The interceptor pipeline wrapping the network transport.
//!
//! Every request, whether issued by [`crate::ApiClient`] or directly through
//! [`HttpPipeline::fetch`], runs through three ordered chains:
//!
//! 1. request interceptors, each receiving the previous one's output;
//! 2. response interceptors, each receiving an independent
//!    [`HttpResponse::duplicate`];
//! 3. on failure, error handlers; the first to return a response recovers
//!    the call, otherwise the (possibly replaced) error propagates.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::core::{is_absolute_url, join_base, url_path};
use crate::data::{ConfigResolver, HttpRequest, HttpResponse, RequestConfig, RequestInput};
use crate::effects::Transport;
use crate::error::{Error, Result};

#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn intercept(&self, request: HttpRequest) -> Result<HttpRequest>;
}

#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    async fn intercept(&self, response: HttpResponse) -> Result<HttpResponse>;
}

/// Returning `Ok` recovers the call with that response; returning `Err`
/// hands the error (the same one or a replacement) to the next handler.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn handle(&self, error: Error) -> Result<HttpResponse>;
}

#[async_trait]
impl<F> RequestInterceptor for F
where
    F: Fn(HttpRequest) -> Result<HttpRequest> + Send + Sync,
{
    async fn intercept(&self, request: HttpRequest) -> Result<HttpRequest> {
        self(request)
    }
}

#[async_trait]
impl<F> ResponseInterceptor for F
where
    F: Fn(HttpResponse) -> Result<HttpResponse> + Send + Sync,
{
    async fn intercept(&self, response: HttpResponse) -> Result<HttpResponse> {
        self(response)
    }
}

#[async_trait]
impl<F> ErrorHandler for F
where
    F: Fn(Error) -> Result<HttpResponse> + Send + Sync,
{
    async fn handle(&self, error: Error) -> Result<HttpResponse> {
        self(error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptorKind {
    Request,
    Response,
    Error,
}

/// 1-based registration index within one chain.
///
/// Handles stay valid after other entries are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorHandle(usize);

impl InterceptorHandle {
    pub fn get(self) -> usize {
        self.0
    }
}

/// Ordered registrations; removed slots keep their position.
struct Chain<T: ?Sized> {
    slots: RwLock<Vec<Option<Arc<T>>>>,
}

impl<T: ?Sized> Chain<T> {
    fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }

    fn push(&self, item: Arc<T>) -> InterceptorHandle {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.push(Some(item));
        InterceptorHandle(slots.len())
    }

    fn remove(&self, handle: InterceptorHandle) -> bool {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        match handle.0.checked_sub(1).and_then(|index| slots.get_mut(index)) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    fn clear(&self) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Live entries in registration order, detached from the lock.
    fn snapshot(&self) -> Vec<Arc<T>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .flatten()
            .count()
    }
}

pub struct HttpPipeline<T> {
    transport: T,
    resolver: Arc<ConfigResolver>,
    request: Chain<dyn RequestInterceptor>,
    response: Chain<dyn ResponseInterceptor>,
    error: Chain<dyn ErrorHandler>,
}

impl<T> fmt::Debug for HttpPipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPipeline")
            .field("resolver", &self.resolver)
            .field("request_interceptors", &self.request.len())
            .field("response_interceptors", &self.response.len())
            .field("error_handlers", &self.error.len())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> HttpPipeline<T> {
    pub fn new(transport: T, resolver: Arc<ConfigResolver>) -> Self {
        Self {
            transport,
            resolver,
            request: Chain::new(),
            response: Chain::new(),
            error: Chain::new(),
        }
    }

    pub fn resolver(&self) -> &Arc<ConfigResolver> {
        &self.resolver
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn add_request_interceptor(
        &self,
        interceptor: impl RequestInterceptor + 'static,
    ) -> InterceptorHandle {
        let handle = self.request.push(Arc::new(interceptor));
        debug!(handle = handle.get(), "request interceptor registered");
        handle
    }

    pub fn add_response_interceptor(
        &self,
        interceptor: impl ResponseInterceptor + 'static,
    ) -> InterceptorHandle {
        let handle = self.response.push(Arc::new(interceptor));
        debug!(handle = handle.get(), "response interceptor registered");
        handle
    }

    pub fn add_error_handler(&self, handler: impl ErrorHandler + 'static) -> InterceptorHandle {
        let handle = self.error.push(Arc::new(handler));
        debug!(handle = handle.get(), "error handler registered");
        handle
    }

    /// Remove one registration. Returns false for unknown or already removed handles.
    pub fn remove_interceptor(&self, kind: InterceptorKind, handle: InterceptorHandle) -> bool {
        match kind {
            InterceptorKind::Request => self.request.remove(handle),
            InterceptorKind::Response => self.response.remove(handle),
            InterceptorKind::Error => self.error.remove(handle),
        }
    }

    /// Empty one chain, or all three for `None`.
    pub fn clear_interceptors(&self, kind: Option<InterceptorKind>) {
        match kind {
            Some(InterceptorKind::Request) => self.request.clear(),
            Some(InterceptorKind::Response) => self.response.clear(),
            Some(InterceptorKind::Error) => self.error.clear(),
            None => {
                self.request.clear();
                self.response.clear();
                self.error.clear();
            }
        }
    }

    pub fn interceptor_count(&self, kind: InterceptorKind) -> usize {
        match kind {
            InterceptorKind::Request => self.request.len(),
            InterceptorKind::Response => self.response.len(),
            InterceptorKind::Error => self.error.len(),
        }
    }

    /// Send a request through every chain.
    ///
    /// For a built [`HttpRequest`], fields set on `init` take precedence over
    /// the request's own.
    pub async fn fetch(
        &self,
        input: impl Into<RequestInput>,
        init: Option<RequestConfig>,
    ) -> Result<HttpResponse> {
        let (url, config) = input.into().into_parts(init);
        let signal = config.signal.clone();

        let exchange = self.exchange(url, config);
        let outcome = match signal {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.aborted() => Err(Error::Aborted),
                result = exchange => result,
            },
            None => exchange.await,
        };

        match outcome {
            Ok(response) => Ok(response),
            Err(error) => self.recover(error).await,
        }
    }

    /// Prefix API paths with the base URL; absolute URLs pass through.
    pub fn resolve_url(&self, url: &str) -> String {
        if !is_absolute_url(url) && self.resolver.config().is_api_path(&url_path(url)) {
            join_base(&self.resolver.base_url(), url)
        } else {
            url.to_string()
        }
    }

    async fn exchange(&self, url: String, config: RequestConfig) -> Result<HttpResponse> {
        let mut request = HttpRequest::new(self.resolve_url(&url), config);
        for interceptor in self.request.snapshot() {
            request = interceptor.intercept(request).await?;
        }

        let method = request.method();
        let sent_url = request.url.clone();
        let mut response = self.transport.send(request).await?;
        response.method = method;
        if response.url.is_empty() {
            response.url = sent_url;
        }

        for interceptor in self.response.snapshot() {
            response = interceptor.intercept(response.duplicate()).await?;
        }
        Ok(response)
    }

    async fn recover(&self, mut error: Error) -> Result<HttpResponse> {
        for handler in self.error.snapshot() {
            match handler.handle(error).await {
                Ok(response) => return Ok(response),
                Err(next) => error = next,
            }
        }
        Err(error)
    }
}
