use std::future::Future;
use std::sync::Arc;

use crate::data::{HttpRequest, HttpResponse};
use crate::error::Result;

/// The network primitive every request ultimately goes through.
///
/// Implementations follow redirects, apply timeouts and map connection
/// failures onto [`crate::Error::Network`] / [`crate::Error::Timeout`]. A
/// non-2xx status is a successful send, not an error.
///
/// # Implementations
///
/// - [`ReqwestTransport`]: production implementation using `reqwest`
/// - In-process fakes for testing
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send {
        (**self).send(request)
    }
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::time::Duration;

    use bytes::Bytes;
    use futures_util::{Stream, StreamExt, stream};
    use http::header::CONTENT_TYPE;
    use reqwest::multipart::{Form, Part};

    use super::*;
    use crate::data::{Body, MultipartForm, ProgressCallback, TransferProgress};
    use crate::error::Error;

    const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

    /// Production transport backed by a shared `reqwest::Client`.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        /// Build a client whose requests time out after `timeout`.
        pub fn new(timeout: Duration) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(Error::Client)?;
            Ok(Self { client })
        }

        pub fn from_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl Transport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            let HttpRequest { url, config } = request;
            let method = config.method();
            let mut headers = config.headers;

            let mut builder = self.client.request(method.clone(), &url);
            if let Some(timeout) = config.timeout {
                builder = builder.timeout(timeout);
            }

            match config.body {
                Some(Body::Bytes(bytes)) => {
                    builder = builder.headers(headers).body(bytes);
                }
                Some(Body::Multipart(form)) => {
                    // reqwest writes the boundary-carrying content type itself
                    headers.remove(CONTENT_TYPE);
                    builder = builder
                        .headers(headers)
                        .multipart(multipart_form(form, config.on_progress)?);
                }
                None => {
                    builder = builder.headers(headers);
                }
            }

            let response = builder.send().await.map_err(map_error)?;
            let status = response.status();
            let headers = response.headers().clone();
            let final_url = response.url().to_string();
            let body = response.bytes().await.map_err(map_error)?;

            Ok(HttpResponse {
                status,
                headers,
                body,
                url: final_url,
                method,
            })
        }
    }

    fn map_error(error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(error.to_string())
        }
    }

    fn multipart_form(form: MultipartForm, on_progress: Option<ProgressCallback>) -> Result<Form> {
        let mut out = Form::new();
        for (name, value) in form.fields {
            out = out.text(name, value);
        }

        if let Some(file) = form.file {
            let total = file.len();
            let body = reqwest::Body::wrap_stream(progress_stream(file.bytes, on_progress));
            let mut part = Part::stream_with_length(body, total).file_name(file.file_name);
            if let Some(content_type) = file.content_type {
                part = part
                    .mime_str(&content_type)
                    .map_err(|e| Error::InvalidRequest(format!("bad content type: {e}")))?;
            }
            out = out.part(file.field_name, part);
        }
        Ok(out)
    }

    /// Chunk the file so progress is reported as the body is consumed.
    fn progress_stream(
        bytes: Bytes,
        on_progress: Option<ProgressCallback>,
    ) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
        let total = bytes.len() as u64;
        let chunks: Vec<Bytes> = (0..bytes.len())
            .step_by(UPLOAD_CHUNK_SIZE)
            .map(|start| bytes.slice(start..(start + UPLOAD_CHUNK_SIZE).min(bytes.len())))
            .collect();

        let mut sent = 0u64;
        stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            if let Some(callback) = &on_progress {
                callback(&TransferProgress::new(sent, Some(total)));
            }
            Ok(chunk)
        })
    }

}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestTransport;
