//! Authentication integration tests.
//!
//! Tests verify:
//! - The correct key is accepted in the form field and in the header
//! - Missing and wrong keys are rejected with 401 before any image work
//! - A server without a key rejects everything with 500

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use tower::ServiceExt;

use lqip_server::RouterConfig;

use super::test_utils::{
    body_json, create_test_png, multipart_request, raw_request, test_router,
    test_router_with_config, urlencoded_body, TEST_API_KEY,
};

// =============================================================================
// Valid Keys
// =============================================================================

#[tokio::test]
async fn test_form_api_key_accepted() {
    let (router, service) = test_router();

    let request = multipart_request(
        &create_test_png(32, 32),
        None,
        Some(TEST_API_KEY),
        "application/json",
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(service.computations(), 1);
}

#[tokio::test]
async fn test_header_api_key_accepted() {
    let (router, _) = test_router();

    let request = raw_request(
        &create_test_png(32, 32),
        "image/png",
        None,
        Some(TEST_API_KEY),
        "application/json",
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Rejected Keys
// =============================================================================

#[tokio::test]
async fn test_form_missing_api_key() {
    let (router, service) = test_router();

    let request = multipart_request(&create_test_png(32, 32), None, None, "application/json");
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_api_key");
    assert_eq!(json["message"], "Invalid API Key");
    assert_eq!(json["status"], 401);
    assert_eq!(service.computations(), 0);
}

#[tokio::test]
async fn test_form_wrong_api_key() {
    let (router, service) = test_router();

    let request = multipart_request(
        &create_test_png(32, 32),
        Some("webp"),
        Some("wrong-key"),
        "application/json",
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_api_key");
    assert_eq!(service.computations(), 0);
}

#[tokio::test]
async fn test_wrong_key_checked_before_missing_file() {
    let (router, _) = test_router();

    let body = urlencoded_body(&[("apiKey", b"wrong-key".as_slice())]);
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_header_missing_api_key() {
    let (router, service) = test_router();

    let request = raw_request(
        &create_test_png(32, 32),
        "image/png",
        None,
        None,
        "image/webp",
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(service.computations(), 0);
}

#[tokio::test]
async fn test_header_wrong_api_key() {
    let (router, service) = test_router();

    let request = raw_request(
        &create_test_png(32, 32),
        "image/png",
        None,
        Some("TEST-API-KEY"),
        "image/webp",
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(service.computations(), 0);
}

#[tokio::test]
async fn test_key_in_wrong_place_rejected() {
    let (router, _) = test_router();

    // A form upload does not read the header
    let mut request = multipart_request(&create_test_png(32, 32), None, None, "application/json");
    request
        .headers_mut()
        .insert("x-api-key", TEST_API_KEY.parse().unwrap());

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Unconfigured Server
// =============================================================================

#[tokio::test]
async fn test_unconfigured_server_rejects_everything() {
    let (router, service) = test_router_with_config(RouterConfig::without_api_key());

    let request = multipart_request(
        &create_test_png(32, 32),
        None,
        Some(TEST_API_KEY),
        "application/json",
    );
    let response = router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "not_configured");
    assert_eq!(json["message"], "App not set up correctly");

    // The configuration check comes before the content type check
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(service.computations(), 0);
}

#[tokio::test]
async fn test_empty_configured_key_is_unconfigured() {
    let (router, _) = test_router_with_config(RouterConfig::new(""));

    let request = raw_request(
        &create_test_png(8, 8),
        "image/png",
        None,
        Some(""),
        "application/json",
    );
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// CORS
// =============================================================================

#[tokio::test]
async fn test_cors_preflight_allows_api_key_header() {
    let (router, _) = test_router();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/")
        .header("origin", "https://example.com")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "x-api-key")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
    let allowed_headers = response
        .headers()
        .get("access-control-allow-headers")
        .unwrap()
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed_headers.contains("x-api-key"));
}

#[tokio::test]
async fn test_cors_restricted_origin() {
    let (router, _) = test_router_with_config(
        RouterConfig::new(TEST_API_KEY).with_cors_origins(vec!["https://app.example".to_string()]),
    );

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/")
        .header("origin", "https://evil.example")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}
