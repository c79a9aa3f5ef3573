//! Reduction options.
//!
//! Options control three things: the resize target, the output format, and
//! format-specific encoder overrides. Defaults produce a 16px WebP at quality 20.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::LqipError;

/// Default bounding box for placeholders, in pixels.
pub const DEFAULT_RESIZE: u32 = 16;

/// Default encoder quality for both WebP and JPEG.
pub const DEFAULT_QUALITY: u8 = 20;

/// Default WebP alpha plane quality.
pub const DEFAULT_ALPHA_QUALITY: u8 = 20;

// =============================================================================
// Resize
// =============================================================================

/// Resize target for a reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resize {
    /// Fit inside an `n x n` box, never exceeding the original dimensions.
    Bound(u32),

    /// Produce exactly `width x height`, cropping to preserve aspect ratio.
    Exact { width: u32, height: u32 },
}

impl Resize {
    /// Compute the bounding box to fit into for an image of the given size.
    ///
    /// For `Bound(n)` each axis is clamped to `min(n, original)`. Zero bounds
    /// are raised to 1 so the encoder always receives a non-empty image.
    pub fn target_box(&self, original_width: u32, original_height: u32) -> (u32, u32) {
        match *self {
            Resize::Bound(n) => (
                n.min(original_width).max(1),
                n.min(original_height).max(1),
            ),
            Resize::Exact { width, height } => (width.max(1), height.max(1)),
        }
    }
}

impl Default for Resize {
    fn default() -> Self {
        Resize::Bound(DEFAULT_RESIZE)
    }
}

impl FromStr for Resize {
    type Err = String;

    /// Parse `"16"` as a bound or `"32x24"` as exact dimensions.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("invalid resize value: {s:?}"))
        };

        match s.split_once(['x', 'X']) {
            Some((w, h)) => Ok(Resize::Exact {
                width: parse(w)?,
                height: parse(h)?,
            }),
            None => Ok(Resize::Bound(parse(s)?)),
        }
    }
}

impl fmt::Display for Resize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resize::Bound(n) => write!(f, "{n}"),
            Resize::Exact { width, height } => write!(f, "{width}x{height}"),
        }
    }
}

// =============================================================================
// Output Format
// =============================================================================

/// Encoded output format.
///
/// `Jpeg` remembers whether it was requested as `"jpg"` or `"jpeg"` so that
/// the response type echoes the caller's spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    #[default]
    Webp,
    Jpeg,
    Jpg,
}

impl OutputFormat {
    /// The format name as reported in metadata and in `image/<name>`.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Webp => "webp",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Jpg => "jpg",
        }
    }

    /// Value for the `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("image/{}", self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = LqipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "webp" => Ok(OutputFormat::Webp),
            "jpeg" => Ok(OutputFormat::Jpeg),
            "jpg" => Ok(OutputFormat::Jpg),
            other => Err(LqipError::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Encoder Overrides
// =============================================================================

/// Format-specific encoder overrides.
///
/// Every field is optional; unset fields fall back to the format default.
/// JPEG only honours `quality`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncoderOverrides {
    /// Encoder quality (1-100)
    pub quality: Option<u8>,

    /// WebP alpha plane quality (0-100)
    pub alpha_quality: Option<u8>,

    /// WebP sharp RGB->YUV conversion
    pub smart_subsample: Option<bool>,
}

impl EncoderOverrides {
    /// Effective quality, clamped to 1-100.
    pub fn quality(&self) -> u8 {
        self.quality.unwrap_or(DEFAULT_QUALITY).clamp(1, 100)
    }

    /// Effective alpha quality, clamped to 0-100.
    pub fn alpha_quality(&self) -> u8 {
        self.alpha_quality.unwrap_or(DEFAULT_ALPHA_QUALITY).min(100)
    }

    /// Effective smart subsampling flag.
    pub fn smart_subsample(&self) -> bool {
        self.smart_subsample.unwrap_or(true)
    }
}

// =============================================================================
// Options
// =============================================================================

/// Options for a single reduction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LqipOptions {
    pub resize: Resize,
    pub output_format: OutputFormat,
    pub output_options: EncoderOverrides,
}

impl LqipOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resize(mut self, resize: Resize) -> Self {
        self.resize = resize;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_overrides(mut self, overrides: EncoderOverrides) -> Self {
        self.output_options = overrides;
        self
    }
}
