//! Headless panel that mirrors the display into a PNG file.
//!
//! Used where no native window is available (or with `--headless`):
//! every new image, and every direct paint, is written to the snapshot
//! path so an operator can watch it with any image viewer.

use std::path::{Path, PathBuf};

use embedded_graphics::pixelcolor::Rgb888;
use image::ImageFormat;
use tracing::debug;

use skyframe_core::{Bitmap, MemoryPanel, Panel, PanelImage, ScaleMode, SkyframeError};

pub struct SnapshotPanel {
    inner: MemoryPanel,
    path: PathBuf,
    written: u64,
}

impl SnapshotPanel {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            inner: MemoryPanel::new(width, height),
            path: path.into(),
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshots written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn write(&mut self, bitmap: &Bitmap) -> Result<(), SkyframeError> {
        bitmap
            .to_rgba_image()
            .save_with_format(&self.path, ImageFormat::Png)
            .map_err(|e| SkyframeError::Render(format!("snapshot {}: {e}", self.path.display())))?;
        self.written += 1;
        debug!(path = %self.path.display(), "snapshot written");
        Ok(())
    }
}

impl Panel for SnapshotPanel {
    fn size(&self) -> (u32, u32) {
        self.inner.size()
    }

    fn set_scale_mode(&mut self, mode: ScaleMode) {
        self.inner.set_scale_mode(mode);
    }

    fn set_background(&mut self, color: Rgb888) {
        self.inner.set_background(color);
    }

    fn paint(&mut self, bitmap: &Bitmap) -> Result<(), SkyframeError> {
        self.inner.paint(bitmap)?;
        self.write(bitmap)
    }

    fn set_image(&mut self, image: Option<PanelImage>) -> Result<(), SkyframeError> {
        if let Some(image) = &image {
            self.write(image.bitmap())?;
        }
        self.inner.set_image(image)
    }

    fn image(&self) -> Option<&PanelImage> {
        self.inner.image()
    }
}
