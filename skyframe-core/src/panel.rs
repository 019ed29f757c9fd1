//! The drawable surface a display paints into.
//!
//! [`Panel`] is the seam between the display adapter and whatever GUI
//! toolkit hosts it. [`MemoryPanel`] keeps everything in process and is
//! what tests and headless hosts use.

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::RgbColor;

use crate::bitmap::Bitmap;
use crate::error::SkyframeError;

// ── ScaleMode ────────────────────────────────────────────────────

/// How the retained image maps onto the panel surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    /// Draw at native size from the top-left corner.
    #[default]
    Normal,
    /// Stretch the image to fill the panel.
    Stretch,
}

// ── PanelImage ───────────────────────────────────────────────────

/// The image a panel currently retains.
#[derive(Debug, Clone)]
pub struct PanelImage {
    bitmap: Bitmap,
    caption: Option<String>,
}

impl PanelImage {
    /// A real camera frame.
    pub fn frame(bitmap: Bitmap) -> Self {
        Self {
            bitmap,
            caption: None,
        }
    }

    /// A synthetic overlay and the text drawn on it.
    pub fn overlay(bitmap: Bitmap, caption: impl Into<String>) -> Self {
        Self {
            bitmap,
            caption: Some(caption.into()),
        }
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// Overlay text, `None` for camera frames.
    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn is_overlay(&self) -> bool {
        self.caption.is_some()
    }
}

// ── Panel ────────────────────────────────────────────────────────

/// A GUI surface that shows one image at a time.
///
/// Implementations are owned by the UI thread; nothing here needs to be
/// `Send`.
pub trait Panel {
    /// Client size in pixels.
    fn size(&self) -> (u32, u32);

    fn set_scale_mode(&mut self, mode: ScaleMode);

    fn set_background(&mut self, color: Rgb888);

    /// Draw `bitmap` straight onto the surface without retaining it.
    ///
    /// The next repaint of the retained image or background replaces it.
    fn paint(&mut self, bitmap: &Bitmap) -> Result<(), SkyframeError>;

    /// Replace the retained image. The previous image is dropped.
    ///
    /// `Err` means the new image was not kept. A surface that keeps the
    /// image but cannot draw it right now returns `Ok` and redraws later.
    fn set_image(&mut self, image: Option<PanelImage>) -> Result<(), SkyframeError>;

    fn image(&self) -> Option<&PanelImage>;
}

// ── MemoryPanel ──────────────────────────────────────────────────

/// An in-process panel that records what was drawn on it.
#[derive(Debug)]
pub struct MemoryPanel {
    width: u32,
    height: u32,
    scale_mode: ScaleMode,
    background: Rgb888,
    image: Option<PanelImage>,
    surface: Option<Bitmap>,
    image_updates: u64,
    released: u64,
    paints: u64,
}

impl MemoryPanel {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scale_mode: ScaleMode::Normal,
            background: Rgb888::BLACK,
            image: None,
            surface: None,
            image_updates: 0,
            released: 0,
            paints: 0,
        }
    }

    /// Resize the panel, as a host window would on `WM_SIZE`.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.scale_mode
    }

    pub fn background(&self) -> Rgb888 {
        self.background
    }

    /// The last bitmap painted directly onto the surface.
    pub fn surface(&self) -> Option<&Bitmap> {
        self.surface.as_ref()
    }

    /// How many times a new image was installed.
    pub fn image_updates(&self) -> u64 {
        self.image_updates
    }

    /// How many retained images have been released.
    pub fn released(&self) -> u64 {
        self.released
    }

    pub fn paints(&self) -> u64 {
        self.paints
    }
}

impl Panel for MemoryPanel {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_scale_mode(&mut self, mode: ScaleMode) {
        self.scale_mode = mode;
    }

    fn set_background(&mut self, color: Rgb888) {
        self.background = color;
        self.surface = None;
    }

    fn paint(&mut self, bitmap: &Bitmap) -> Result<(), SkyframeError> {
        self.surface = Some(bitmap.clone());
        self.paints += 1;
        Ok(())
    }

    fn set_image(&mut self, image: Option<PanelImage>) -> Result<(), SkyframeError> {
        if self.image.take().is_some() {
            self.released += 1;
        }
        if image.is_some() {
            self.image_updates += 1;
        }
        self.image = image;
        Ok(())
    }

    fn image(&self) -> Option<&PanelImage> {
        self.image.as_ref()
    }
}

// ── Tests ────────────────────────────────────────────────────────
