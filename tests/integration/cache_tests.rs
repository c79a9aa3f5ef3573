//! Memo cache integration tests.
//!
//! Tests verify:
//! - Repeated uploads of the same image are served from the cache
//! - The cache key covers both the image bytes and the output format
//! - Concurrent uploads of the same image run one reduction
//! - The cache respects its capacity

use std::sync::Arc;

use axum::http::StatusCode;
use tower::ServiceExt;

use lqip_server::{create_router_with_shared_service, LqipService, RouterConfig};

use super::test_utils::{body_bytes, create_test_png, raw_request, test_router, TEST_API_KEY};

fn cache_hit_header(response: &axum::http::Response<axum::body::Body>) -> String {
    response
        .headers()
        .get("x-lqip-cache-hit")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_repeated_upload_hits_cache() {
    let (router, service) = test_router();
    let png = create_test_png(80, 60);

    let first = router
        .clone()
        .oneshot(raw_request(&png, "image/png", None, Some(TEST_API_KEY), "image/webp"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    assert_eq!(cache_hit_header(&first), "false");
    let first_body = body_bytes(first).await;

    let second = router
        .oneshot(raw_request(&png, "image/png", None, Some(TEST_API_KEY), "image/webp"))
        .await
        .unwrap();
    assert_eq!(cache_hit_header(&second), "true");
    let second_body = body_bytes(second).await;

    assert_eq!(first_body, second_body);
    assert_eq!(service.computations(), 1);
    assert_eq!(service.cache().len().await, 1);
}

#[tokio::test]
async fn test_format_is_part_of_cache_key() {
    let (router, service) = test_router();
    let png = create_test_png(40, 40);

    for format in ["webp", "jpeg", "jpg"] {
        let response = router
            .clone()
            .oneshot(raw_request(
                &png,
                "image/png",
                Some(format),
                Some(TEST_API_KEY),
                "application/json",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(cache_hit_header(&response), "false");
    }

    assert_eq!(service.computations(), 3);
}

#[tokio::test]
async fn test_different_images_cached_independently() {
    let (router, service) = test_router();

    for size in [20, 30, 40] {
        let response = router
            .clone()
            .oneshot(raw_request(
                &create_test_png(size, size),
                "image/png",
                None,
                Some(TEST_API_KEY),
                "application/json",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(service.computations(), 3);
    assert_eq!(service.cache().len().await, 3);
}

#[tokio::test]
async fn test_failed_reduction_not_cached() {
    let (router, service) = test_router();
    let garbage = b"not an image at all";

    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(raw_request(
                garbage,
                "image/png",
                None,
                Some(TEST_API_KEY),
                "application/json",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    assert_eq!(service.computations(), 2);
    assert!(service.cache().is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_single_reduction() {
    let (router, service) = test_router();
    let png = Arc::new(create_test_png(512, 512));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let router = router.clone();
            let png = Arc::clone(&png);
            tokio::spawn(async move {
                let response = router
                    .oneshot(raw_request(
                        &png,
                        "image/png",
                        None,
                        Some(TEST_API_KEY),
                        "image/webp",
                    ))
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::CREATED);
                body_bytes(response).await
            })
        })
        .collect();

    let mut bodies = Vec::new();
    for handle in handles {
        bodies.push(handle.await.unwrap());
    }

    assert_eq!(service.computations(), 1);
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_cache_capacity_respected() {
    let service = Arc::new(LqipService::with_cache_capacity(2));
    let router = create_router_with_shared_service(
        Arc::clone(&service),
        RouterConfig::new(TEST_API_KEY).with_tracing(false),
    );

    for size in [10, 11, 12, 13] {
        let response = router
            .clone()
            .oneshot(raw_request(
                &create_test_png(size, size),
                "image/png",
                None,
                Some(TEST_API_KEY),
                "application/json",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(service.cache().len().await, 2);
    assert_eq!(service.cache().capacity(), 2);

    // The oldest image was evicted and is reduced again
    let response = router
        .oneshot(raw_request(
            &create_test_png(10, 10),
            "image/png",
            None,
            Some(TEST_API_KEY),
            "application/json",
        ))
        .await
        .unwrap();
    assert_eq!(cache_hit_header(&response), "false");
    assert_eq!(service.computations(), 5);
}
