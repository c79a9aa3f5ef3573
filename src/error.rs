use thiserror::Error;

use crate::server::auth::AuthError;

/// Errors produced while reducing an image to a placeholder.
#[derive(Debug, Clone, Error)]
pub enum LqipError {
    /// Requested output format is not one of webp, jpeg or jpg
    #[error("Invalid output format \"{0}\"")]
    InvalidFormat(String),

    /// Source bytes could not be decoded as an image
    #[error("Failed to decode image: {message}")]
    Decode { message: String },

    /// Resized image could not be encoded in the requested format
    #[error("Failed to encode {format} image: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    /// The blocking reduction task panicked or was cancelled
    #[error("Reduction task failed: {0}")]
    Task(String),
}

impl LqipError {
    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        LqipError::Decode {
            message: err.to_string(),
        }
    }

    pub(crate) fn encode(format: &'static str, err: impl std::fmt::Display) -> Self {
        LqipError::Encode {
            format,
            message: err.to_string(),
        }
    }
}

/// Errors raised while handling a `POST /` request, before or around the
/// reduction itself.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Server misconfiguration or a rejected client key
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Form request without a `file` field
    #[error("No file found")]
    MissingFile,

    /// Content type is neither a form encoding nor `image/*`
    #[error("Invalid content type")]
    InvalidContentType,

    /// Body could not be read or parsed (malformed multipart, too large, ...)
    #[error("Invalid request body: {message}")]
    InvalidBody { status: u16, message: String },

    /// Reduction failed
    #[error(transparent)]
    Lqip(#[from] LqipError),
}
