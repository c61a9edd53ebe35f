//! Pure transformations: URL and cache-key construction, response parsing,
//! multipart flattening and notice payload reshaping. No I/O happens here.

mod multipart;
mod notice;
mod parse;
mod url;

pub use multipart::{flatten_fields, guess_content_type};
pub use notice::{
    DEFAULT_NOTICE_USER_ID, DEFAULT_NOTIFICATION_TYPE, is_notice_mutation, reshape_notice_payload,
};
pub use parse::{ContentKind, classify_upload_response, error_message, parse_response};
pub use url::{
    build_url, cache_key, encode_query, is_absolute_url, join_base, path_matches_prefix, url_path,
};
