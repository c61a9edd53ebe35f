//! Cache, supersession and error reporting of `ApiClient`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeBackend, client, pipeline};
use libris_http::http::header::{CONTENT_TYPE, HeaderValue};
use libris_http::http::{Method, StatusCode};
use libris_http::{
    AbortController, ApiClient, ApiPayload, Body, Error, FilePart, GetOptions, HttpResponse,
    MutationOptions, Navigator, QueryParams, RouteTracker, Session, UploadOptions,
    install_standard_interceptors,
};
use serde_json::json;

fn data(payload: &ApiPayload) -> i64 {
    payload.as_json().unwrap()["data"].as_i64().unwrap()
}

#[tokio::test]
async fn test_cacheable_get_hits_network_once() {
    let backend = FakeBackend::counting();
    let client = client(&backend);

    let first = client.get("/course", &QueryParams::new(), GetOptions::default()).await.unwrap();
    let second = client.get("/course", &QueryParams::new(), GetOptions::default()).await.unwrap();

    assert_eq!(backend.calls(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_expired_entry_triggers_exactly_one_refetch() {
    let backend = FakeBackend::counting();
    let client = client(&backend);
    let options = || GetOptions::default().cache_time(Duration::from_millis(30));

    client.get("/course", &QueryParams::new(), options()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let refreshed = client.get("/course", &QueryParams::new(), options()).await.unwrap();
    let cached = client.get("/course", &QueryParams::new(), options()).await.unwrap();

    assert_eq!(backend.calls(), 2);
    assert_eq!(data(&refreshed), 2);
    assert_eq!(data(&cached), 2);
}

#[tokio::test]
async fn test_no_cache_option_bypasses_cache() {
    let backend = FakeBackend::counting();
    let client = client(&backend);

    client.get("/course", &QueryParams::new(), GetOptions::default()).await.unwrap();
    client
        .get("/course", &QueryParams::new(), GetOptions::default().no_cache())
        .await
        .unwrap();
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_non_allow_listed_get_is_not_cached() {
    let backend = FakeBackend::counting();
    let client = client(&backend);

    client.get("/notices", &QueryParams::new(), GetOptions::default()).await.unwrap();
    client.get("/notices", &QueryParams::new(), GetOptions::default()).await.unwrap();
    assert_eq!(backend.calls(), 2);

    // books are cached only when paginated
    client.get("/books", &QueryParams::new(), GetOptions::default()).await.unwrap();
    client.get("/books", &QueryParams::new(), GetOptions::default()).await.unwrap();
    assert_eq!(backend.calls(), 4);

    let page = QueryParams::new().set("page", 1);
    client.get("/books", &page, GetOptions::default()).await.unwrap();
    client.get("/books", &page, GetOptions::default()).await.unwrap();
    assert_eq!(backend.calls(), 5);
}

#[tokio::test]
async fn test_mutation_invalidates_matching_entries_only() {
    let backend = FakeBackend::counting();
    let client = client(&backend);
    let page = QueryParams::new().set("page", 1);

    client.get("/books", &page, GetOptions::default()).await.unwrap();
    client.get("/course", &QueryParams::new(), GetOptions::default()).await.unwrap();
    assert_eq!(client.cache().len(), 2);

    client
        .post("/books", Some(&json!({ "title": "SICP" })), MutationOptions::clear_cache("/books"))
        .await
        .unwrap();

    assert!(!client.cache().contains("/books?page=1"));
    assert!(client.cache().contains("/course"));

    client.get("/books", &page, GetOptions::default()).await.unwrap();
    assert_eq!(backend.calls(), 4);
}

#[tokio::test]
async fn test_failed_mutation_keeps_cache() {
    let backend = FakeBackend::new(|n, request| {
        if request.method() == Method::DELETE {
            Ok(HttpResponse::json(
                StatusCode::FORBIDDEN,
                &json!({ "status": false, "message": "Not allowed" }),
            ))
        } else {
            Ok(HttpResponse::json(StatusCode::OK, &json!({ "status": true, "data": n })))
        }
    });
    let client = client(&backend);

    client.get("/course", &QueryParams::new(), GetOptions::default()).await.unwrap();
    let error = client
        .delete("/course/4", MutationOptions::clear_cache("/course"))
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(403));
    assert_eq!(error.to_api_error().message, "Not allowed");
    assert!(client.cache().contains("/course"));
}

#[tokio::test]
async fn test_rapid_duplicate_get_supersedes_first() {
    let backend = FakeBackend::counting();
    backend.push_delay(Duration::from_secs(5));
    let client = client(&backend);
    let page = QueryParams::new().set("page", 1).set("search", "rust");

    let first = client.get("/books", &page, GetOptions::default());
    let second = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.get("/books", &page, GetOptions::default()).await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(first.unwrap_err().is_cancelled());
    assert_eq!(data(&second.unwrap()), 2);
    assert!(client.in_flight().is_empty());

    let cached = client.get("/books", &page, GetOptions::default()).await.unwrap();
    assert_eq!(data(&cached), 2);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_cancel_request() {
    let backend = FakeBackend::counting();
    backend.push_delay(Duration::from_secs(5));
    let client = client(&backend);

    let params = QueryParams::new();
    let pending = client.get("/resources", &params, GetOptions::default());
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.cancel_request("/resources", &QueryParams::new())
    };
    let (result, cancelled) = tokio::join!(pending, cancel);

    assert!(cancelled);
    assert!(result.unwrap_err().is_cancelled());
    assert!(!client.cancel_request("/resources", &QueryParams::new()));
    assert!(client.cache().is_empty());
}

#[tokio::test]
async fn test_caller_signal_cancels_get() {
    let backend = FakeBackend::counting();
    backend.push_delay(Duration::from_secs(5));
    let client = client(&backend);

    let controller = AbortController::new();
    controller.abort();
    let result = client
        .get("/course", &QueryParams::new(), GetOptions::default().signal(controller.signal()))
        .await;

    assert!(result.unwrap_err().is_cancelled());
    assert!(client.in_flight().is_empty());
}

#[tokio::test]
async fn test_get_sends_accept_and_drops_empty_params() {
    let backend = FakeBackend::counting();
    let client = client(&backend);
    let params = QueryParams::new()
        .set("library_id", "LIB-7")
        .set("search", "")
        .set_opt::<i64>("page", None);

    client.get("/issued-books", &params, GetOptions::default()).await.unwrap();

    let sent = backend.last_request();
    assert_eq!(sent.url, "http://api.test/api/issued-books?library_id=LIB-7");
    assert_eq!(sent.config.headers["accept"], "application/json");
}

#[tokio::test]
async fn test_unauthorized_html_response_clears_session() {
    let backend = FakeBackend::new(|_, _| {
        Ok(HttpResponse::new(StatusCode::UNAUTHORIZED, "<html><body>Login</body></html>")
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/html")))
    });
    let pipeline = pipeline(&backend);
    let session = Session::in_memory();
    session.store_login("expired", &json!({ "id": 1 })).unwrap();
    session.store().set("token", "legacy").unwrap();
    let navigator = Arc::new(RouteTracker::new("/books"));
    install_standard_interceptors(&pipeline, session.clone(), navigator.clone());
    let client = ApiClient::new(Arc::new(pipeline));

    let error = client
        .get("/user", &QueryParams::new(), GetOptions::default())
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(401));
    assert_eq!(error.to_api_error().message, "Request failed with status 401");
    assert!(session.store().get("auth_token").is_none());
    assert!(session.store().get("token").is_none());
    assert!(session.store().get("user").is_none());
    assert_eq!(navigator.current_route(), "/login");
}

#[tokio::test]
async fn test_network_outage_yields_displayable_error() {
    let backend = FakeBackend::new(|_, _| Err(Error::Network("connection reset".into())));
    let pipeline = pipeline(&backend);
    install_standard_interceptors(
        &pipeline,
        Session::in_memory(),
        Arc::new(RouteTracker::default()),
    );
    let client = ApiClient::new(Arc::new(pipeline));

    let error = client
        .post("/issue-book", Some(&json!({ "book_id": 3 })), MutationOptions::default())
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(503));
    assert!(error.to_api_error().message.starts_with("Network error"));
}

#[tokio::test]
async fn test_upload_sends_multipart_and_invalidates() {
    let backend = FakeBackend::replying(
        StatusCode::CREATED,
        json!({ "status": true, "data": { "id": 12 } }),
    );
    let client = client(&backend);
    client.cache().set("/resources", ApiPayload::Empty, None);

    let file = FilePart::new("notes.pdf", b"%PDF-1.7 lecture".to_vec());
    let value = client
        .upload(
            "/notes",
            &json!({ "title": "Week 1", "course_id": 4, "_method": "PUT" }),
            Some(file),
            UploadOptions::default().clear_cache("/resources"),
        )
        .await
        .unwrap();

    assert_eq!(value["data"]["id"], 12);
    assert!(client.cache().is_empty());

    let sent = backend.last_request();
    assert_eq!(sent.method(), Method::POST);
    match sent.config.body.unwrap() {
        Body::Multipart(form) => {
            assert_eq!(form.get("title"), Some("Week 1"));
            assert_eq!(form.get("course_id"), Some("4"));
            assert_eq!(form.get("_method"), Some("PUT"));
            let file = form.file.unwrap();
            assert_eq!(file.field_name, "file");
            assert_eq!(file.content_type.as_deref(), Some("application/pdf"));
        }
        other => panic!("expected multipart body, got {other:?}"),
    }
}

#[tokio::test]
async fn test_upload_rejects_non_json_success() {
    let backend = FakeBackend::new(|_, _| Ok(HttpResponse::new(StatusCode::OK, "done")));
    let client = client(&backend);

    let error = client
        .upload("/ebooks", &json!({ "title": "T" }), None, UploadOptions::default())
        .await
        .unwrap_err();
    assert_eq!(error.to_api_error().message, "Invalid response from server");
}
