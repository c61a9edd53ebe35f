use serde_json::Value;
use url::form_urlencoded;

use crate::data::QueryParams;

/// True for `scheme://...` and protocol-relative `//host/...` URLs.
pub fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    match url.find("://") {
        Some(idx) if idx > 0 => url[..idx]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        _ => false,
    }
}

/// The path component of an absolute URL or a bare path.
pub fn url_path(url: &str) -> String {
    if is_absolute_url(url) {
        let parsed = if url.starts_with("//") {
            url::Url::parse(&format!("http:{url}"))
        } else {
            url::Url::parse(url)
        };
        if let Ok(parsed) = parsed {
            return parsed.path().to_string();
        }
    }
    url.split(['?', '#']).next().unwrap_or_default().to_string()
}

/// Segment-aware prefix match: `/user` matches `/user` and `/user/3`, not `/username`.
pub fn path_matches_prefix(path: &str, prefix: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path.starts_with('/');
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Join an endpoint onto the base URL unless it is already absolute.
pub fn join_base(base: &str, endpoint: &str) -> String {
    if is_absolute_url(endpoint) {
        return endpoint.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// Render a query value; `None` means the parameter is dropped.
fn render_param(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render_param).collect();
            (!parts.is_empty()).then(|| parts.join(","))
        }
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Form-encode the present parameters in key order.
pub fn encode_query(params: &QueryParams) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.iter() {
        if let Some(rendered) = render_param(value) {
            serializer.append_pair(key, &rendered);
        }
    }
    serializer.finish()
}

/// Build a full request URL.
///
/// Parameters that are `null` or empty strings are omitted.
///
/// # Examples
///
/// ```
/// use libris_http::{QueryParams, build_url};
/// use serde_json::Value;
///
/// let params = QueryParams::new().set("a", 1).set("b", Value::Null).set("c", "");
/// assert_eq!(build_url("https://lib.example.edu/api", "/course", &params),
///            "https://lib.example.edu/api/course?a=1");
/// ```
pub fn build_url(base: &str, endpoint: &str, params: &QueryParams) -> String {
    let mut url = join_base(base, endpoint);
    let query = encode_query(params);
    if !query.is_empty() {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&query);
    }
    url
}

/// Deterministic key for the cache and the in-flight registry.
///
/// Independent of the base URL, so switching environments keeps keys stable.
pub fn cache_key(endpoint: &str, params: &QueryParams) -> String {
    let path = if is_absolute_url(endpoint) {
        endpoint.to_string()
    } else {
        format!("/{}", endpoint.trim_start_matches('/'))
    };
    let query = encode_query(params);
    if query.is_empty() {
        path
    } else if path.contains('?') {
        format!("{path}&{query}")
    } else {
        format!("{path}?{query}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_url_drops_null_and_empty() {
        let params = QueryParams::new()
            .set("a", 1)
            .set("b", Value::Null)
            .set("c", "");
        let url = build_url("http://localhost:8000/api", "/course", &params);
        assert!(url.contains("a=1"));
        assert!(!url.contains("b="));
        assert!(!url.contains("c="));
        assert!(!url.contains("undefined"));
        assert_eq!(url, "http://localhost:8000/api/course?a=1");
    }

    #[test]
    fn test_build_url_without_params() {
        assert_eq!(
            build_url("http://localhost:8000/api/", "course", &QueryParams::new()),
            "http://localhost:8000/api/course"
        );
    }

    #[test]
    fn test_build_url_keeps_absolute_endpoint() {
        let url = build_url(
            "http://localhost:8000/api",
            "https://cdn.example.org/covers",
            &QueryParams::new().set("id", 4),
        );
        assert_eq!(url, "https://cdn.example.org/covers?id=4");
    }

    #[test]
    fn test_build_url_encodes_values() {
        let params = QueryParams::new().set("search", "data & algorithms");
        let url = build_url("http://h/api", "/books", &params);
        assert_eq!(url, "http://h/api/books?search=data+%26+algorithms");
    }

    #[test]
    fn test_cache_key_sorted_and_stable() {
        let a = QueryParams::new().set("page", 2).set("search", "rust");
        let b = QueryParams::new().set("search", "rust").set("page", 2);
        assert_eq!(cache_key("/books", &a), cache_key("books", &b));
        assert_eq!(cache_key("/books", &a), "/books?page=2&search=rust");
    }

    #[test]
    fn test_cache_key_ignores_dropped_params() {
        let with_empty = QueryParams::new().set("search", "").set("page", 1);
        let without = QueryParams::new().set("page", 1);
        assert_eq!(cache_key("/books", &with_empty), cache_key("/books", &without));
    }

    #[test]
    fn test_array_and_object_params() {
        let params = QueryParams::new()
            .set("ids", json!([1, 2, 3]))
            .set("filter", json!({ "year": 2024 }));
        let query = encode_query(&params);
        assert!(query.contains("ids=1%2C2%2C3"));
        assert!(query.contains("filter=%7B%22year%22%3A2024%7D"));
    }

    #[test]
    fn test_is_absolute_url() {
        assert!(is_absolute_url("https://example.org/x"));
        assert!(is_absolute_url("http://localhost:8000"));
        assert!(is_absolute_url("//cdn.example.org/a.png"));
        assert!(!is_absolute_url("/course"));
        assert!(!is_absolute_url("course?next=http://x"));
    }

    #[test]
    fn test_path_matches_prefix() {
        assert!(path_matches_prefix("/user", "/user"));
        assert!(path_matches_prefix("/user/7", "/user"));
        assert!(path_matches_prefix("/user?x=1", "/user"));
        assert!(!path_matches_prefix("/username", "/user"));
        assert!(!path_matches_prefix("/api/user", "/user"));
    }

    #[test]
    fn test_url_path() {
        assert_eq!(url_path("https://lib.example.edu/api/notices/3?x=1"), "/api/notices/3");
        assert_eq!(url_path("/notices?draft=1"), "/notices");
        assert_eq!(url_path("//cdn.example.org/a/b"), "/a/b");
    }
}
