use std::sync::Arc;

use http::Method;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::{self, cache_key, classify_upload_response, parse_response};
use crate::data::{
    ApiPayload, Body, FilePart, GetOptions, HttpResponse, MultipartForm, MutationOptions,
    QueryParams, RequestConfig, UploadOptions,
};
use crate::effects::{HttpPipeline, InFlightRegistry, ResponseCache, Transport};
use crate::error::{Error, Result};

fn json() -> HeaderValue {
    HeaderValue::from_static("application/json")
}

/// Verb-level client over an [`HttpPipeline`].
///
/// GETs consult the response cache and the in-flight registry; mutations
/// invalidate the cache on success. Every failure is logged with the
/// endpoint and verb, then returned unchanged.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use libris_http::{ApiClient, ClientConfig, ConfigResolver, GetOptions, HttpPipeline,
///                   QueryParams, ReqwestTransport};
///
/// # async fn run() -> libris_http::Result<()> {
/// let config = ClientConfig::from_env()?;
/// let transport = ReqwestTransport::new(config.timeout())?;
/// let pipeline = HttpPipeline::new(transport, Arc::new(ConfigResolver::new(config)));
/// let client = ApiClient::new(Arc::new(pipeline));
///
/// let courses = client.get("/course", &QueryParams::new(), GetOptions::default()).await?;
/// println!("{:?}", courses.as_json());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ApiClient<T> {
    pipeline: Arc<HttpPipeline<T>>,
    cache: ResponseCache,
    in_flight: InFlightRegistry,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(pipeline: Arc<HttpPipeline<T>>) -> Self {
        let ttl = pipeline.resolver().config().cache_ttl();
        Self {
            pipeline,
            cache: ResponseCache::new(ttl),
            in_flight: InFlightRegistry::new(),
        }
    }

    pub fn pipeline(&self) -> &Arc<HttpPipeline<T>> {
        &self.pipeline
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    /// Full URL for `endpoint` against the currently resolved base URL.
    pub fn build_url(&self, endpoint: &str, params: &QueryParams) -> String {
        core::build_url(&self.pipeline.resolver().base_url(), endpoint, params)
    }

    pub fn clear_cache(&self, pattern: Option<&str>) -> usize {
        self.cache.invalidate(pattern)
    }

    /// Abort a tracked in-flight GET. Returns whether one was running.
    pub fn cancel_request(&self, endpoint: &str, params: &QueryParams) -> bool {
        self.in_flight.cancel(&cache_key(endpoint, params))
    }

    pub async fn get(
        &self,
        endpoint: &str,
        params: &QueryParams,
        options: GetOptions,
    ) -> Result<ApiPayload> {
        let key = cache_key(endpoint, params);
        let cacheable =
            options.use_cache && self.pipeline.resolver().is_cacheable(endpoint, params);

        if cacheable && let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "cache hit");
            return Ok(hit);
        }

        let guard = self.in_flight.begin(key.clone());
        let config = RequestConfig::new(Method::GET)
            .header(ACCEPT, json())
            .signal(guard.signal());
        let request = self.pipeline.fetch(self.build_url(endpoint, params), Some(config));

        let outcome = match options.signal {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.aborted() => Err(Error::Aborted),
                result = request => result,
            },
            None => request.await,
        };
        let payload = outcome
            .and_then(|response| parse_response(&response).map_err(Error::from))
            .inspect_err(|e| log_failure(&Method::GET, endpoint, e))?;

        // only the newest request for a key may populate state
        if guard.is_superseded() {
            debug!(key = %key, "discarding superseded response");
            return Err(Error::Aborted);
        }
        if cacheable {
            self.cache.set(key, payload.clone(), options.cache_time);
        }
        Ok(payload)
    }

    pub async fn post(
        &self,
        endpoint: &str,
        body: Option<&Value>,
        options: MutationOptions,
    ) -> Result<ApiPayload> {
        self.send_json(Method::POST, endpoint, body, options).await
    }

    pub async fn put(
        &self,
        endpoint: &str,
        body: Option<&Value>,
        options: MutationOptions,
    ) -> Result<ApiPayload> {
        self.send_json(Method::PUT, endpoint, body, options).await
    }

    pub async fn delete(&self, endpoint: &str, options: MutationOptions) -> Result<ApiPayload> {
        self.send_json(Method::DELETE, endpoint, None, options).await
    }

    async fn send_json(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        options: MutationOptions,
    ) -> Result<ApiPayload> {
        let mut config = RequestConfig::new(method.clone()).header(ACCEPT, json());
        if let Some(body) = body {
            config = config.header(CONTENT_TYPE, json()).body(Body::json(body)?);
        }

        let payload = self
            .pipeline
            .fetch(self.build_url(endpoint, &QueryParams::new()), Some(config))
            .await
            .and_then(|response| parse_response(&response).map_err(Error::from))
            .inspect_err(|e| log_failure(&method, endpoint, e))?;

        self.invalidate_after(options.clear_cache_pattern.as_deref());
        Ok(payload)
    }

    /// Send `fields` (flattened) and an optional file as multipart.
    ///
    /// Resolves with the decoded JSON body on 2xx.
    pub async fn upload(
        &self,
        endpoint: &str,
        fields: &Value,
        file: Option<FilePart>,
        options: UploadOptions,
    ) -> Result<Value> {
        let method = options.method.unwrap_or(Method::POST);
        let mut form = MultipartForm::new().fields_from(fields);
        if let Some(file) = file {
            form = form.file(file);
        }

        let mut config = RequestConfig::new(method.clone())
            .header(ACCEPT, json())
            .body(Body::Multipart(form));
        if let Some(on_progress) = options.on_progress {
            config = config.on_progress(on_progress);
        }

        let value = self
            .pipeline
            .fetch(self.build_url(endpoint, &QueryParams::new()), Some(config))
            .await
            .and_then(|response: HttpResponse| {
                classify_upload_response(&response).map_err(Error::from)
            })
            .inspect_err(|e| log_failure(&method, endpoint, e))?;

        self.invalidate_after(options.clear_cache_pattern.as_deref());
        Ok(value)
    }

    fn invalidate_after(&self, pattern: Option<&str>) {
        if let Some(pattern) = pattern {
            self.cache.invalidate(Some(pattern));
        }
    }
}

fn log_failure(method: &Method, endpoint: &str, error: &Error) {
    if error.is_cancelled() {
        debug!(%method, endpoint, "request cancelled");
    } else {
        warn!(%method, endpoint, error = %error, "request failed");
    }
}
