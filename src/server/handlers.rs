//! HTTP request handler for the LQIP API.
//!
//! # Endpoints
//!
//! - `POST /` - Reduce an uploaded image to a placeholder

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::{LqipError, RequestError};
use crate::lqip::{content_key, LqipOptions, LqipService, OutputFormat, Resize};

use super::auth::{ApiKeyAuth, API_KEY_FIELD, API_KEY_HEADER};

/// Header selecting the output format for raw image uploads.
pub const OUTPUT_FORMAT_HEADER: &str = "x-output-format";

/// Response header reporting whether the placeholder came from the memo cache.
pub const CACHE_HIT_HEADER: &str = "x-lqip-cache-hit";

/// Bounding box used for every HTTP reduction.
pub const HTTP_RESIZE: u32 = 16;

/// Output format when the request does not name one.
const DEFAULT_OUTPUT_FORMAT: &str = "webp";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to the handler via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Memoizing reduction service
    pub lqip_service: Arc<LqipService>,

    /// API key check
    pub auth: ApiKeyAuth,
}

impl AppState {
    /// Create state sharing an existing service.
    pub fn with_shared_service(lqip_service: Arc<LqipService>, auth: ApiKeyAuth) -> Self {
        Self { lqip_service, auth }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "invalid_api_key", "invalid_format")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    pub status: u16,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: status.as_u16(),
        }
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert RequestError to HTTP response.
///
/// - 4xx errors are logged at WARN level (client errors)
/// - 5xx errors are logged at ERROR level (server errors)
impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            RequestError::Auth(auth_err) => return auth_err.clone().into_response(),

            RequestError::MissingFile => (StatusCode::BAD_REQUEST, "missing_file"),
            RequestError::InvalidContentType => {
                (StatusCode::BAD_REQUEST, "invalid_content_type")
            }
            RequestError::InvalidBody { status, .. } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST),
                "invalid_body",
            ),

            RequestError::Lqip(LqipError::InvalidFormat(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_format")
            }
            RequestError::Lqip(LqipError::Decode { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "decode_error")
            }
            RequestError::Lqip(LqipError::Encode { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "encode_error")
            }
            RequestError::Lqip(LqipError::Task(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Request Decoding
// =============================================================================

/// How the request body carries the image, decided by `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    /// `multipart/form-data` with `file`, `outputFormat`, `apiKey` fields
    Multipart,

    /// `application/x-www-form-urlencoded` with the same fields
    UrlEncoded,

    /// `image/*`: the body is the image, options come from headers
    RawImage,

    /// Anything else
    Unsupported,
}

impl RequestShape {
    /// Classify a `Content-Type` header value.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return RequestShape::Unsupported;
        };

        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "multipart/form-data" => RequestShape::Multipart,
            "application/x-www-form-urlencoded" => RequestShape::UrlEncoded,
            m if m.starts_with("image/") => RequestShape::RawImage,
            _ => RequestShape::Unsupported,
        }
    }
}

/// Fields extracted from a form body.
#[derive(Debug, Default)]
struct FormUpload {
    file: Option<Bytes>,
    output_format: Option<String>,
    api_key: Option<String>,
}

async fn read_multipart(request: Request, state: &AppState) -> Result<FormUpload, RequestError> {
    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| RequestError::InvalidBody {
            status: e.status().as_u16(),
            message: e.body_text(),
        })?;

    let field_error = |e: axum::extract::multipart::MultipartError| RequestError::InvalidBody {
        status: e.status().as_u16(),
        message: e.body_text(),
    };

    let mut upload = FormUpload::default();
    while let Some(field) = multipart.next_field().await.map_err(field_error)? {
        match field.name() {
            Some("file") => upload.file = Some(field.bytes().await.map_err(field_error)?),
            Some("outputFormat") => {
                upload.output_format = Some(field.text().await.map_err(field_error)?)
            }
            Some(API_KEY_FIELD) => {
                upload.api_key = Some(field.text().await.map_err(field_error)?)
            }
            _ => {} // Ignore other fields
        }
    }

    Ok(upload)
}

async fn read_urlencoded(request: Request, state: &AppState) -> Result<FormUpload, RequestError> {
    let body = read_body(request, state).await?;

    let mut upload = FormUpload::default();
    for pair in body.split(|b| *b == b'&').filter(|p| !p.is_empty()) {
        let (name, value) = match pair.iter().position(|b| *b == b'=') {
            Some(i) => (&pair[..i], &pair[i + 1..]),
            None => (pair, &[][..]),
        };
        let text = || String::from_utf8_lossy(&form_component(value)).into_owned();

        match form_component(name).as_slice() {
            b"file" => upload.file = Some(Bytes::from(form_component(value))),
            b"outputFormat" => upload.output_format = Some(text()),
            name if name == API_KEY_FIELD.as_bytes() => upload.api_key = Some(text()),
            _ => {}
        }
    }

    Ok(upload)
}

/// Decode one `application/x-www-form-urlencoded` component to raw bytes.
///
/// Non-UTF-8 bytes are kept intact so binary `file` fields survive.
fn form_component(input: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = input
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    urlencoding::decode_binary(&spaced).into_owned()
}

async fn read_body(request: Request, state: &AppState) -> Result<Bytes, RequestError> {
    Bytes::from_request(request, state)
        .await
        .map_err(|e| RequestError::InvalidBody {
            status: e.status().as_u16(),
            message: e.body_text(),
        })
}

fn header_str(headers: &HeaderMap, name: impl header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

/// Empty values fall back to the default format.
fn resolve_format(requested: Option<String>) -> Result<OutputFormat, LqipError> {
    requested
        .as_deref()
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_OUTPUT_FORMAT)
        .parse()
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle placeholder requests.
///
/// # Endpoint
///
/// `POST /`
///
/// # Request
///
/// Either a form (`multipart/form-data` or `application/x-www-form-urlencoded`)
/// with fields:
///
/// - `file`: the image
/// - `outputFormat`: `webp` (default), `jpeg` or `jpg`
/// - `apiKey`: the server's API key
///
/// or a raw body with `Content-Type: image/*` and headers:
///
/// - `x-api-key`: the server's API key
/// - `x-output-format`: `webp` (default), `jpeg` or `jpg`
///
/// # Response
///
/// - `201 Created`: the placeholder bytes, when `Accept` starts with `image/`
/// - `200 OK`: JSON metadata otherwise:
///
/// ```json
/// {
///   "originalWidth": 100,
///   "originalHeight": 100,
///   "width": 16,
///   "height": 16,
///   "type": "webp",
///   "dataURIBase64": "data:image/webp;base64,UklGR..."
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: missing file, unsupported content type, invalid format
/// - `401 Unauthorized`: missing or wrong API key
/// - `413 Payload Too Large`: body over the configured limit
/// - `422 Unprocessable Entity`: the file is not a decodable image
/// - `500 Internal Server Error`: no server API key configured, encode failure
pub async fn lqip_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, RequestError> {
    state.auth.ensure_configured()?;

    let headers = request.headers().clone();
    let content_type = header_str(&headers, header::CONTENT_TYPE);

    let (file, format) = match RequestShape::from_content_type(content_type.as_deref()) {
        shape @ (RequestShape::Multipart | RequestShape::UrlEncoded) => {
            let upload = if shape == RequestShape::Multipart {
                read_multipart(request, &state).await?
            } else {
                read_urlencoded(request, &state).await?
            };

            state.auth.verify(upload.api_key.as_deref())?;
            let file = upload.file.ok_or(RequestError::MissingFile)?;
            (file, resolve_format(upload.output_format)?)
        }

        RequestShape::RawImage => {
            // Authenticate before reading the body
            state
                .auth
                .verify(header_str(&headers, API_KEY_HEADER).as_deref())?;
            let format = resolve_format(header_str(&headers, OUTPUT_FORMAT_HEADER))?;
            (read_body(request, &state).await?, format)
        }

        RequestShape::Unsupported => return Err(RequestError::InvalidContentType),
    };

    let key = content_key(&file, format);
    let options = LqipOptions::default()
        .with_resize(Resize::Bound(HTTP_RESIZE))
        .with_format(format);

    let reduction = state.lqip_service.reduce(&key, file, options).await?;
    let image = &reduction.image;

    debug!(
        format = format.as_str(),
        width = image.metadata.width,
        height = image.metadata.height,
        bytes = image.content.len(),
        cache_hit = reduction.cache_hit,
        "Served placeholder"
    );

    let cache_hit = reduction.cache_hit.to_string();

    let accepts_image = header_str(&headers, header::ACCEPT)
        .is_some_and(|accept| accept.starts_with("image/"));

    if accepts_image {
        return Ok((
            StatusCode::CREATED,
            [
                (header::CONTENT_TYPE, format.content_type()),
                (header::CONTENT_LENGTH, image.content.len().to_string()),
                (header::HeaderName::from_static(CACHE_HIT_HEADER), cache_hit),
            ],
            Body::from(image.content.clone()),
        )
            .into_response());
    }

    Ok((
        StatusCode::OK,
        [(header::HeaderName::from_static(CACHE_HIT_HEADER), cache_hit)],
        Json(&image.metadata),
    )
        .into_response())
}

// =============================================================================
// Tests
// =============================================================================
