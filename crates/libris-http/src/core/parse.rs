use bytes::Bytes;
use serde_json::Value;

use crate::data::{ApiPayload, HttpResponse};
use crate::error::ApiError;

/// How a response body is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    Text,
    Binary,
    Unknown,
}

impl ContentKind {
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(ct) = content_type else {
            return ContentKind::Unknown;
        };
        if ct.contains("json") {
            ContentKind::Json
        } else if ct.starts_with("text/") || ct.contains("html") || ct.contains("xml") {
            ContentKind::Text
        } else if ct == "application/pdf"
            || ct == "application/octet-stream"
            || ct.starts_with("image/")
            || ct.starts_with("audio/")
            || ct.starts_with("video/")
        {
            ContentKind::Binary
        } else {
            ContentKind::Unknown
        }
    }
}

/// Decode a response into a payload or a normalized error.
///
/// Never fails on ambiguity: a success whose body cannot be interpreted at
/// all degrades to [`ApiPayload::Empty`].
///
/// # Examples
///
/// ```
/// use libris_http::{ApiPayload, HttpResponse, parse_response};
/// use http::StatusCode;
/// use serde_json::json;
///
/// let body = json!({ "status": true, "data": [1, 2, 3] });
/// let parsed = parse_response(&HttpResponse::json(StatusCode::OK, &body)).unwrap();
/// assert_eq!(parsed, ApiPayload::Json(body));
/// ```
pub fn parse_response(response: &HttpResponse) -> Result<ApiPayload, ApiError> {
    let kind = ContentKind::from_content_type(response.content_type().as_deref());

    if !response.is_success() {
        return Err(normalize_failure(response, kind));
    }

    let body = &response.body;
    let payload = match kind {
        ContentKind::Json => match decode_json(body) {
            Some(value) => ApiPayload::Json(value),
            None => decode_text(body).map_or(ApiPayload::Empty, ApiPayload::Text),
        },
        ContentKind::Binary => ApiPayload::Binary {
            content_type: response.content_type(),
            bytes: body.clone(),
        },
        ContentKind::Text => match decode_json(body) {
            Some(value) => ApiPayload::Json(value),
            None if body.is_empty() => ApiPayload::Empty,
            None => ApiPayload::Text(String::from_utf8_lossy(body).into_owned()),
        },
        ContentKind::Unknown => decode_json(body)
            .map(ApiPayload::Json)
            .or_else(|| decode_text(body).map(ApiPayload::Text))
            .or_else(|| {
                (!body.is_empty()).then(|| ApiPayload::Binary {
                    content_type: response.content_type(),
                    bytes: body.clone(),
                })
            })
            .unwrap_or(ApiPayload::Empty),
    };
    Ok(payload)
}

fn decode_json(body: &Bytes) -> Option<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    serde_json::from_slice(body).ok()
}

fn decode_text(body: &Bytes) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    std::str::from_utf8(body).ok().map(str::to_string)
}

fn normalize_failure(response: &HttpResponse, kind: ContentKind) -> ApiError {
    let status = response.status.as_u16();
    let decoded = match kind {
        ContentKind::Json | ContentKind::Unknown => decode_json(&response.body),
        ContentKind::Text | ContentKind::Binary => None,
    };

    let Some(payload) = decoded else {
        return ApiError::status_failure(status);
    };

    let message = error_message(&payload)
        .or_else(|| {
            let text = response.status_text();
            (!text.is_empty()).then(|| text.to_string())
        })
        .unwrap_or_else(|| format!("Request failed with status {status}"));

    ApiError::new(message)
        .with_status(status)
        .with_payload(payload)
}

/// The server's own description of a failure.
///
/// `message` wins; otherwise every value under `errors` is joined.
pub fn error_message(payload: &Value) -> Option<String> {
    if let Some(message) = payload.get("message").and_then(Value::as_str)
        && !message.trim().is_empty()
    {
        return Some(message.to_string());
    }

    let errors = payload.get("errors")?;
    let mut parts = Vec::new();
    collect_messages(errors, &mut parts);
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn collect_messages(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if !s.trim().is_empty() => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_messages(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_messages(v, out)),
        Value::Number(_) | Value::Bool(_) => out.push(value.to_string()),
        _ => {}
    }
}

/// Interpret the completion of a multipart upload.
///
/// Uploads always expect a JSON body, so a success that does not decode is
/// an error here rather than an empty payload.
pub fn classify_upload_response(response: &HttpResponse) -> Result<Value, ApiError> {
    let status = response.status.as_u16();
    let decoded = decode_json(&response.body);

    if response.is_success() {
        return decoded
            .ok_or_else(|| ApiError::new("Invalid response from server").with_status(status));
    }

    match decoded {
        Some(payload) => {
            let message = error_message(&payload)
                .unwrap_or_else(|| format!("Upload failed with status {status}"));
            Err(ApiError::new(message).with_status(status).with_payload(payload))
        }
        None => Err(
            ApiError::new(format!("Upload failed with status {status}")).with_status(status),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use http::header::{CONTENT_TYPE, HeaderValue};
    use serde_json::json;

    fn response(
        status: u16,
        content_type: Option<&'static str>,
        body: &'static [u8],
    ) -> HttpResponse {
        let mut r = HttpResponse::new(StatusCode::from_u16(status).unwrap(), body);
        if let Some(ct) = content_type {
            r = r.with_header(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        r
    }

    #[test]
    fn test_json_success_is_returned_unmodified() {
        let r = response(200, Some("application/json"), br#"{"status":true,"data":[1,2,3]}"#);
        assert_eq!(
            parse_response(&r).unwrap(),
            ApiPayload::Json(json!({ "status": true, "data": [1, 2, 3] }))
        );
    }

    #[test]
    fn test_json_with_charset_parameter() {
        let r = response(200, Some("application/json; charset=utf-8"), br#"{"ok":1}"#);
        assert_eq!(parse_response(&r).unwrap(), ApiPayload::Json(json!({ "ok": 1 })));
    }

    #[test]
    fn test_message_takes_precedence_over_errors() {
        let r = response(
            422,
            Some("application/json"),
            br#"{"message":"Validation failed","errors":{"title":["required"]}}"#,
        );
        let err = parse_response(&r).unwrap_err();
        assert_eq!(err.message, "Validation failed");
        assert_eq!(err.status, Some(422));
        assert!(err.payload.is_some());
    }

    #[test]
    fn test_errors_are_joined_without_message() {
        let r = response(
            422,
            Some("application/json"),
            br#"{"errors":{"email":["is required"],"password":["too short","needs a digit"]}}"#,
        );
        let err = parse_response(&r).unwrap_err();
        assert_eq!(err.message, "is required, too short, needs a digit");
    }

    #[test]
    fn test_status_text_fallback() {
        let r = response(404, Some("application/json"), br#"{"status":false}"#);
        let err = parse_response(&r).unwrap_err();
        assert_eq!(err.message, "Not Found");
        assert_eq!(err.status, Some(404));
    }

    #[test]
    fn test_html_error_page() {
        let r = response(500, Some("text/html"), b"<html><body>Server Error</body></html>");
        let err = parse_response(&r).unwrap_err();
        assert_eq!(err.message, "Request failed with status 500");
        assert_eq!(err.status, Some(500));
        assert!(err.payload.is_none());
    }

    #[test]
    fn test_mislabelled_json_error_body() {
        let r = response(401, Some("application/json"), b"<html>login</html>");
        let err = parse_response(&r).unwrap_err();
        assert_eq!(err.message, "Request failed with status 401");
    }

    #[test]
    fn test_binary_payload() {
        let r = response(200, Some("application/pdf"), b"%PDF-1.7");
        match parse_response(&r).unwrap() {
            ApiPayload::Binary { content_type, bytes } => {
                assert_eq!(content_type.as_deref(), Some("application/pdf"));
                assert_eq!(&bytes[..], b"%PDF-1.7");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_text_reparsed_as_json() {
        let r = response(200, Some("text/plain"), br#"{"status":true}"#);
        assert_eq!(parse_response(&r).unwrap(), ApiPayload::Json(json!({ "status": true })));
    }

    #[test]
    fn test_plain_text() {
        let r = response(200, Some("text/plain"), b"pong");
        assert_eq!(parse_response(&r).unwrap(), ApiPayload::Text("pong".to_string()));
    }

    #[test]
    fn test_unknown_content_type_cascade() {
        let json = response(200, None, br#"[1,2]"#);
        assert_eq!(parse_response(&json).unwrap(), ApiPayload::Json(json!([1, 2])));

        let text = response(200, None, b"hello");
        assert_eq!(parse_response(&text).unwrap(), ApiPayload::Text("hello".to_string()));

        let binary = response(200, None, &[0xff, 0xfe, 0x00]);
        assert!(matches!(parse_response(&binary).unwrap(), ApiPayload::Binary { .. }));

        let empty = response(204, None, b"");
        assert_eq!(parse_response(&empty).unwrap(), ApiPayload::Empty);
    }

    #[test]
    fn test_empty_json_success() {
        let r = response(200, Some("application/json"), b"");
        assert_eq!(parse_response(&r).unwrap(), ApiPayload::Empty);
    }

    #[test]
    fn test_upload_success_requires_json() {
        let ok = response(201, Some("application/json"), br#"{"status":true,"data":{"id":9}}"#);
        assert_eq!(
            classify_upload_response(&ok).unwrap(),
            json!({ "status": true, "data": { "id": 9 } })
        );

        let garbled = response(200, Some("text/html"), b"<html/>");
        let err = classify_upload_response(&garbled).unwrap_err();
        assert_eq!(err.message, "Invalid response from server");
        assert_eq!(err.status, Some(200));
    }

    #[test]
    fn test_upload_failure_messages() {
        let with_body = response(413, Some("application/json"), br#"{"message":"File too large"}"#);
        let err = classify_upload_response(&with_body).unwrap_err();
        assert_eq!(err.message, "File too large");
        assert_eq!(err.status, Some(413));

        let without_body = response(502, Some("text/html"), b"Bad gateway");
        let err = classify_upload_response(&without_body).unwrap_err();
        assert_eq!(err.message, "Upload failed with status 502");
        assert!(err.payload.is_none());
    }
}
