//! Synthetic status bitmaps shown in place of real frames.

use chrono::NaiveTime;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::{FONT_7X13_BOLD, FONT_9X15_BOLD, FONT_10X20};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

use crate::bitmap::Bitmap;
use crate::error::SkyframeError;

pub const DARK_GREEN: Rgb888 = Rgb888::new(0x00, 0x64, 0x00);
pub const DARK_RED: Rgb888 = Rgb888::new(0x8B, 0x00, 0x00);
pub const BLUE: Rgb888 = Rgb888::new(0x00, 0x00, 0xFF);

/// Top-left corner of the overlay text.
const TEXT_ORIGIN: Point = Point::new(10, 10);

/// Headline of every error overlay.
pub const ERROR_HEADLINE: &str = "VIDEO ERROR";

/// What an overlay communicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    /// Session started, no frame received yet.
    Ready,
    /// A frame could not be shown.
    Error { reason: String, frame: u64 },
    /// Manual diagnostic pattern.
    Test { time: NaiveTime },
}

impl Overlay {
    /// Error overlay for `reason`, stamped with the current frame count.
    pub fn error(reason: impl Into<String>, frame: u64) -> Self {
        Overlay::Error {
            reason: reason.into(),
            frame,
        }
    }

    /// Test overlay stamped with the local wall-clock time.
    pub fn test_now() -> Self {
        Overlay::Test {
            time: chrono::Local::now().time(),
        }
    }

    /// The text drawn onto the overlay.
    pub fn caption(&self) -> String {
        match self {
            Overlay::Ready => "VIDEO SYSTEM READY\nWaiting for payload video...".to_string(),
            Overlay::Error { reason, frame } => {
                format!("{ERROR_HEADLINE}\n{reason}\n\nFrame: {frame}")
            }
            Overlay::Test { time } => format!(
                "TEST MODE\nSimple video display\n\nTime: {}",
                time.format("%H:%M:%S")
            ),
        }
    }

    pub fn background(&self) -> Rgb888 {
        match self {
            Overlay::Ready => DARK_GREEN,
            Overlay::Error { .. } => DARK_RED,
            Overlay::Test { .. } => BLUE,
        }
    }

    fn text_style(&self) -> MonoTextStyle<'static, Rgb888> {
        let font = match self {
            Overlay::Ready => &FONT_9X15_BOLD,
            Overlay::Error { .. } => &FONT_7X13_BOLD,
            Overlay::Test { .. } => &FONT_10X20,
        };
        MonoTextStyle::new(font, Rgb888::WHITE)
    }

    /// Draw the overlay into a new `width × height` bitmap.
    pub fn render(&self, width: u32, height: u32) -> Result<Bitmap, SkyframeError> {
        let mut bitmap = Bitmap::filled(width, height, self.background())
            .map_err(|e| SkyframeError::Overlay(e.to_string()))?;

        let caption = self.caption();
        let _ = Text::with_baseline(&caption, TEXT_ORIGIN, self.text_style(), Baseline::Top)
            .draw(&mut bitmap);

        Ok(bitmap)
    }
}

// ── Tests ────────────────────────────────────────────────────────
