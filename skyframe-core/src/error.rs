//! Domain-specific error types for the display pipeline.
//!
//! Library operations return `Result<T, SkyframeError>`. The display
//! adapter itself never surfaces these to its caller; it logs them and
//! paints an overlay instead.

use thiserror::Error;

/// The canonical error type for skyframe.
#[derive(Debug, Error)]
pub enum SkyframeError {
    // ── Display Errors ───────────────────────────────────────────
    /// The encoded frame could not be decoded as an image.
    #[error("invalid image data: {0}")]
    InvalidImage(String),

    /// The panel refused or failed to take a decoded frame.
    #[error("render failed: {0}")]
    Render(String),

    /// Drawing a synthetic overlay bitmap failed.
    #[error("overlay drawing failed: {0}")]
    Overlay(String),

    /// A bitmap was requested with unusable dimensions.
    #[error("invalid bitmap size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    // ── Link Errors ──────────────────────────────────────────────
    /// The link I/O layer reported an error.
    #[error("link error: {0}")]
    Link(#[from] std::io::Error),

    /// A frame grew past the configured limit before its end marker.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A text frame carried a payload that is not valid base64.
    #[error("encoding error: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The UI loop is gone; posted commands cannot be delivered.
    #[error("ui loop closed")]
    ChannelClosed,

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for SkyframeError {
    fn from(s: String) -> Self {
        SkyframeError::Other(s)
    }
}

impl From<&str> for SkyframeError {
    fn from(s: &str) -> Self {
        SkyframeError::Other(s.to_string())
    }
}

impl From<image::ImageError> for SkyframeError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::Decoding(_) | image::ImageError::Unsupported(_) => {
                SkyframeError::InvalidImage(e.to_string())
            }
            other => SkyframeError::Render(other.to_string()),
        }
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for SkyframeError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        SkyframeError::ChannelClosed
    }
}

impl SkyframeError {
    /// Whether this error means the bytes were not a decodable image.
    pub fn is_invalid_image(&self) -> bool {
        matches!(self, SkyframeError::InvalidImage(_))
    }
}
