//! The interceptors every application pipeline is built with.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde_json::json;
use tracing::{info, warn};

use crate::core::{is_notice_mutation, reshape_notice_payload};
use crate::data::{Body, ConfigResolver, HttpRequest, HttpResponse};
use crate::effects::session::{LOGIN_ROUTE, Navigator, Session};
use crate::effects::{
    ErrorHandler, HttpPipeline, InterceptorHandle, RequestInterceptor, ResponseInterceptor,
    Transport,
};
use crate::error::{Error, Result};

/// Delay before a 401 surfaced as an error tears the session down.
pub const DEFAULT_TEARDOWN_DELAY: Duration = Duration::from_millis(100);

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Attaches `Authorization: Bearer <token>` to calls aimed at the API host.
#[derive(Debug, Clone)]
pub struct AuthHeaderInjector {
    session: Session,
    resolver: Arc<ConfigResolver>,
}

impl AuthHeaderInjector {
    pub fn new(session: Session, resolver: Arc<ConfigResolver>) -> Self {
        Self { session, resolver }
    }

    fn targets_api(&self, url: &str) -> bool {
        let Ok(target) = url::Url::parse(url) else {
            return false;
        };
        let Ok(base) = url::Url::parse(&self.resolver.base_url()) else {
            return false;
        };
        target.host_str() == base.host_str()
            && target.port_or_known_default() == base.port_or_known_default()
    }
}

#[async_trait]
impl RequestInterceptor for AuthHeaderInjector {
    async fn intercept(&self, mut request: HttpRequest) -> Result<HttpRequest> {
        if !self.targets_api(&request.url) || request.config.headers.contains_key(AUTHORIZATION) {
            return Ok(request);
        }

        if let Some(token) = self.session.token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| Error::Interceptor(format!("invalid auth token: {e}")))?;
            request.config.headers.insert(AUTHORIZATION, value);
        }

        let multipart = request.config.body.as_ref().is_some_and(Body::is_multipart);
        if !multipart && !request.config.headers.contains_key(CONTENT_TYPE) {
            request
                .config
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(request)
    }
}

/// Rewrites notice create/update bodies into the backend's field names.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoticePayloadReshaper;

#[async_trait]
impl RequestInterceptor for NoticePayloadReshaper {
    async fn intercept(&self, mut request: HttpRequest) -> Result<HttpRequest> {
        if !is_notice_mutation(&request.method(), &request.url) {
            return Ok(request);
        }
        if let Some(body) = request.config.body.as_ref().and_then(Body::as_json) {
            request.config.body = Some(Body::json(&reshape_notice_payload(&body))?);
        }
        Ok(request)
    }
}

fn end_session(session: &Session, navigator: &dyn Navigator) {
    if let Err(e) = session.clear() {
        warn!(error = %e, "failed to clear session");
    }
    if navigator.current_route() != LOGIN_ROUTE {
        navigator.navigate(LOGIN_ROUTE);
    }
}

/// On a 401 response, clears the session and sends the user to sign in.
#[derive(Clone)]
pub struct SessionExpiryResponder {
    session: Session,
    navigator: Arc<dyn Navigator>,
}

impl SessionExpiryResponder {
    pub fn new(session: Session, navigator: Arc<dyn Navigator>) -> Self {
        Self { session, navigator }
    }
}

#[async_trait]
impl ResponseInterceptor for SessionExpiryResponder {
    async fn intercept(&self, response: HttpResponse) -> Result<HttpResponse> {
        if response.status == StatusCode::UNAUTHORIZED {
            info!(url = %response.url, "session expired");
            end_session(&self.session, self.navigator.as_ref());
        }
        Ok(response)
    }
}

/// Turns network failures and thrown 401s into well-formed JSON responses.
#[derive(Clone)]
pub struct NetworkAuthErrorHandler {
    session: Session,
    navigator: Arc<dyn Navigator>,
    teardown_delay: Duration,
}

impl NetworkAuthErrorHandler {
    pub fn new(session: Session, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            session,
            navigator,
            teardown_delay: DEFAULT_TEARDOWN_DELAY,
        }
    }

    #[must_use]
    pub fn teardown_delay(mut self, delay: Duration) -> Self {
        self.teardown_delay = delay;
        self
    }
}

#[async_trait]
impl ErrorHandler for NetworkAuthErrorHandler {
    async fn handle(&self, error: Error) -> Result<HttpResponse> {
        if error.is_network() {
            warn!(error = %error, "network failure");
            let body = json!({ "status": false, "message": error.to_api_error().message });
            return Ok(HttpResponse::json(StatusCode::SERVICE_UNAVAILABLE, &body));
        }

        if error.is_unauthorized() {
            let session = self.session.clone();
            let navigator = self.navigator.clone();
            let delay = self.teardown_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                end_session(&session, navigator.as_ref());
            });
            let body = json!({ "status": false, "message": SESSION_EXPIRED_MESSAGE });
            return Ok(HttpResponse::json(StatusCode::UNAUTHORIZED, &body));
        }

        Err(error)
    }
}

/// Logs each exchange; `info` for success, `warn` otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevLogger;

#[async_trait]
impl ResponseInterceptor for DevLogger {
    async fn intercept(&self, response: HttpResponse) -> Result<HttpResponse> {
        let status = response.status.as_u16();
        if response.is_success() {
            info!(method = %response.method, url = %response.url, status, "request succeeded");
        } else {
            warn!(method = %response.method, url = %response.url, status, "request failed");
        }
        Ok(response)
    }
}

/// Handles for the interceptors installed by [`install_standard_interceptors`].
#[derive(Debug, Clone, Copy)]
pub struct StandardInterceptors {
    pub auth: InterceptorHandle,
    pub notice: InterceptorHandle,
    pub session_expiry: InterceptorHandle,
    pub dev_logger: Option<InterceptorHandle>,
    pub error: InterceptorHandle,
}

/// Wire the standard chain; the dev logger only outside production.
pub fn install_standard_interceptors<T: Transport>(
    pipeline: &HttpPipeline<T>,
    session: Session,
    navigator: Arc<dyn Navigator>,
) -> StandardInterceptors {
    let resolver = pipeline.resolver().clone();
    let dev_logger = !resolver.environment().is_production();

    StandardInterceptors {
        auth: pipeline.add_request_interceptor(AuthHeaderInjector::new(session.clone(), resolver)),
        notice: pipeline.add_request_interceptor(NoticePayloadReshaper),
        session_expiry: pipeline.add_response_interceptor(SessionExpiryResponder::new(
            session.clone(),
            navigator.clone(),
        )),
        dev_logger: dev_logger.then(|| pipeline.add_response_interceptor(DevLogger)),
        error: pipeline.add_error_handler(NetworkAuthErrorHandler::new(session, navigator)),
    }
}
