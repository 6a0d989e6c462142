// src/headers.rs
// Response headers every mock controller handler is expected to send

use crate::version::{API_VERSION, PLATFORM_VERSION};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};

/// `DEIS_API_VERSION`, lowercased as `HeaderName` requires
pub const API_VERSION_NAME: HeaderName = HeaderName::from_static("deis_api_version");

/// `DEIS_PLATFORM_VERSION`, lowercased as `HeaderName` requires
pub const PLATFORM_VERSION_NAME: HeaderName = HeaderName::from_static("deis_platform_version");

/// The version headers every controller response carries
pub fn expected_headers() -> [(HeaderName, HeaderValue); 2] {
    [
        (API_VERSION_NAME, HeaderValue::from_static(API_VERSION)),
        (
            PLATFORM_VERSION_NAME,
            HeaderValue::from_static(PLATFORM_VERSION),
        ),
    ]
}

/// Write the expected controller headers into `headers`.
///
/// The version headers are always overwritten. `Content-Type` defaults to
/// `application/json` but a type the response already declares is kept.
pub fn set_headers(headers: &mut HeaderMap) {
    for (name, value) in expected_headers() {
        headers.insert(name, value);
    }
    headers
        .entry(CONTENT_TYPE)
        .or_insert(HeaderValue::from_static("application/json"));
}

/// Turn `response` into a [`Response`] carrying the expected controller headers
pub fn with_headers(response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    set_headers(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version;

    #[test]
    fn test_set_headers_api_version() {
        let mut headers = HeaderMap::new();
        set_headers(&mut headers);
        assert_eq!(
            headers.get(version::API_VERSION_HEADER).unwrap(),
            version::API_VERSION
        );
        assert_eq!(
            headers.get(version::PLATFORM_VERSION_HEADER).unwrap(),
            version::PLATFORM_VERSION
        );
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_set_headers_overwrites() {
        let mut headers = HeaderMap::new();
        headers.insert(API_VERSION_NAME, HeaderValue::from_static("1.0"));
        set_headers(&mut headers);
        assert_eq!(headers.get_all(API_VERSION_NAME).iter().count(), 1);
        assert_eq!(headers.get(API_VERSION_NAME).unwrap(), version::API_VERSION);
    }

    #[test]
    fn test_with_headers_keeps_status_and_body() {
        let response = with_headers((axum::http::StatusCode::CREATED, "{}"));
        assert_eq!(response.status(), axum::http::StatusCode::CREATED);
        assert_eq!(
            response.headers().get("DEIS_API_VERSION").unwrap(),
            version::API_VERSION
        );
    }

    #[test]
    fn test_set_headers_keeps_existing_content_type() {
        let response = with_headers((axum::http::StatusCode::BAD_REQUEST, "missing field"));
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            response.headers().get(API_VERSION_NAME).unwrap(),
            version::API_VERSION
        );
    }

    #[test]
    fn test_expected_headers_are_version_only() {
        let names: Vec<_> = expected_headers().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec![API_VERSION_NAME, PLATFORM_VERSION_NAME]);
    }
}
