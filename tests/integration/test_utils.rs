//! Test utilities for integration tests.
//!
//! Images are generated in-process with the `image` crate; request bodies are
//! built by hand so tests control every byte sent to the router.

use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

use lqip_server::{create_router_with_shared_service, LqipService, RouterConfig};

pub const TEST_API_KEY: &str = "test-api-key";

pub const BOUNDARY: &str = "----lqip-test-boundary";

// =============================================================================
// Test Images
// =============================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
    })
}

/// Create an RGB PNG with a gradient.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// Create an RGBA PNG with a half-transparent left side.
pub fn create_test_rgba_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        let alpha = if x < width / 2 { 0 } else { 255 };
        Rgba([200, 100, 50, alpha])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// Create an RGB JPEG with a gradient.
pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .encode_image(&gradient(width, height))
        .unwrap();
    buf
}

/// Check if data is a valid JPEG (SOI marker).
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

/// Check if data is a WebP file (RIFF....WEBP).
pub fn is_valid_webp(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP"
}

// =============================================================================
// Request Bodies
// =============================================================================

/// Builder for `multipart/form-data` bodies.
#[derive(Default)]
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

/// Content-Type header value for bodies from [`MultipartBuilder`].
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Build an `application/x-www-form-urlencoded` body; values may be binary.
pub fn urlencoded_body(fields: &[(&str, &[u8])]) -> String {
    fields
        .iter()
        .map(|(name, value)| {
            let name: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
            let value: String = url::form_urlencoded::byte_serialize(value).collect();
            format!("{name}={value}")
        })
        .collect::<Vec<_>>()
        .join("&")
}

// =============================================================================
// Requests
// =============================================================================

/// A multipart upload with the given image, format and API key.
pub fn multipart_request(
    image: &[u8],
    output_format: Option<&str>,
    api_key: Option<&str>,
    accept: &str,
) -> Request<Body> {
    let mut form = MultipartBuilder::new().file("file", "upload.png", "image/png", image);
    if let Some(format) = output_format {
        form = form.text("outputFormat", format);
    }
    if let Some(key) = api_key {
        form = form.text("apiKey", key);
    }

    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", multipart_content_type())
        .header("accept", accept)
        .body(Body::from(form.build()))
        .unwrap()
}

/// A raw `image/*` upload with options in headers.
pub fn raw_request(
    image: &[u8],
    content_type: &str,
    output_format: Option<&str>,
    api_key: Option<&str>,
    accept: &str,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", content_type)
        .header("accept", accept);
    if let Some(format) = output_format {
        builder = builder.header("x-output-format", format);
    }
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }

    builder.body(Body::from(image.to_vec())).unwrap()
}

// =============================================================================
// Router and Responses
// =============================================================================

/// Router with the test API key, plus a handle on its service.
pub fn test_router() -> (Router, Arc<LqipService>) {
    test_router_with_config(RouterConfig::new(TEST_API_KEY))
}

pub fn test_router_with_config(config: RouterConfig) -> (Router, Arc<LqipService>) {
    let service = Arc::new(LqipService::new());
    let router = create_router_with_shared_service(Arc::clone(&service), config.with_tracing(false));
    (router, service)
}

pub async fn body_bytes(response: Response<Body>) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = body_bytes(response).await;
    serde_json::from_slice(&body).unwrap()
}
