//! Native window panel: blits bitmaps into the viewer window.
//!
//! Uses GDI `StretchDIBits` for maximum compatibility. Bitmaps from
//! `skyframe-core` are already BGRA8, so they go to GDI as-is.

#[cfg(target_os = "windows")]
mod platform {
    use embedded_graphics::pixelcolor::Rgb888;
    use embedded_graphics::prelude::RgbColor;
    use windows::Win32::Foundation::*;
    use windows::Win32::Graphics::Gdi::*;

    use skyframe_core::{Bitmap, Panel, PanelImage, ScaleMode, SkyframeError};

    /// A [`Panel`] backed by a window's client area.
    pub struct WindowPanel {
        hwnd: HWND,
        width: u32,
        height: u32,
        scale_mode: ScaleMode,
        background: Rgb888,
        image: Option<PanelImage>,
    }

    impl WindowPanel {
        /// Create a panel covering the given window.
        pub fn new(hwnd: HWND, width: u32, height: u32) -> Self {
            Self {
                hwnd,
                width,
                height,
                scale_mode: ScaleMode::Normal,
                background: Rgb888::BLACK,
                image: None,
            }
        }

        /// Update the client size (call after WM_SIZE) and repaint.
        pub fn resize(&mut self, width: u32, height: u32) {
            self.width = width;
            self.height = height;
            self.repaint();
        }

        /// Redraw the retained image, or the background if there is none.
        ///
        /// Best-effort: a failed draw is logged and retried on the next
        /// repaint.
        pub fn repaint(&self) {
            let result = match &self.image {
                Some(image) => self.blit(image.bitmap()),
                None => self.fill_background(),
            };
            if let Err(e) = result {
                tracing::warn!("repaint failed: {e}");
            }
        }

        /// Minimized windows have an empty client area.
        fn is_hidden(&self) -> bool {
            self.width == 0 || self.height == 0
        }

        fn fill_background(&self) -> Result<(), SkyframeError> {
            if self.is_hidden() {
                return Ok(());
            }
            let c = self.background;
            let colorref = COLORREF(c.r() as u32 | (c.g() as u32) << 8 | (c.b() as u32) << 16);
            unsafe {
                let hdc = GetDC(self.hwnd);
                if hdc.is_invalid() {
                    return Err(SkyframeError::Render("GetDC failed".into()));
                }
                let brush = CreateSolidBrush(colorref);
                let rect = RECT {
                    left: 0,
                    top: 0,
                    right: self.width as i32,
                    bottom: self.height as i32,
                };
                FillRect(hdc, &rect, brush);
                let _ = DeleteObject(brush);
                ReleaseDC(self.hwnd, hdc);
            }
            Ok(())
        }

        fn blit(&self, bitmap: &Bitmap) -> Result<(), SkyframeError> {
            if self.is_hidden() {
                return Ok(());
            }
            let (dst_w, dst_h) = match self.scale_mode {
                ScaleMode::Stretch => (self.width, self.height),
                ScaleMode::Normal => (bitmap.width(), bitmap.height()),
            };

            unsafe {
                let hdc = GetDC(self.hwnd);
                if hdc.is_invalid() {
                    return Err(SkyframeError::Render("GetDC failed".into()));
                }

                let bmi = BITMAPINFO {
                    bmiHeader: BITMAPINFOHEADER {
                        biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                        biWidth: bitmap.width() as i32,
                        // Negative height = top-down DIB (origin at top-left).
                        biHeight: -(bitmap.height() as i32),
                        biPlanes: 1,
                        biBitCount: 32,
                        biCompression: BI_RGB.0,
                        biSizeImage: 0,
                        biXPelsPerMeter: 0,
                        biYPelsPerMeter: 0,
                        biClrUsed: 0,
                        biClrImportant: 0,
                    },
                    bmiColors: [RGBQUAD::default(); 1],
                };

                let lines = StretchDIBits(
                    hdc,
                    0,
                    0,
                    dst_w as i32,
                    dst_h as i32,
                    0,
                    0,
                    bitmap.width() as i32,
                    bitmap.height() as i32,
                    Some(bitmap.data().as_ptr() as *const _),
                    &bmi,
                    DIB_RGB_COLORS,
                    SRCCOPY,
                );

                ReleaseDC(self.hwnd, hdc);

                if lines == 0 {
                    return Err(SkyframeError::Render("StretchDIBits copied no lines".into()));
                }
            }

            Ok(())
        }
    }

    impl Panel for WindowPanel {
        fn size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn set_scale_mode(&mut self, mode: ScaleMode) {
            self.scale_mode = mode;
        }

        fn set_background(&mut self, color: Rgb888) {
            self.background = color;
            self.repaint();
        }

        fn paint(&mut self, bitmap: &Bitmap) -> Result<(), SkyframeError> {
            self.blit(bitmap)
        }

        fn set_image(&mut self, image: Option<PanelImage>) -> Result<(), SkyframeError> {
            // The image is kept either way; drawing it is best-effort.
            self.image = image;
            self.repaint();
            Ok(())
        }

        fn image(&self) -> Option<&PanelImage> {
            self.image.as_ref()
        }
    }

    // ── Tests ────────────────────────────────────────────────────

}

#[cfg(target_os = "windows")]
pub use platform::*;

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
pub mod stub {
    use embedded_graphics::pixelcolor::Rgb888;

    use skyframe_core::{Bitmap, Panel, PanelImage, ScaleMode, SkyframeError};

    pub struct WindowPanel;

    impl WindowPanel {
        pub fn new(_hwnd: (), _w: u32, _h: u32) -> Self {
            Self
        }

        pub fn resize(&mut self, _w: u32, _h: u32) {}

        pub fn repaint(&self) {}
    }

    impl Panel for WindowPanel {
        fn size(&self) -> (u32, u32) {
            (0, 0)
        }

        fn set_scale_mode(&mut self, _mode: ScaleMode) {}

        fn set_background(&mut self, _color: Rgb888) {}

        fn paint(&mut self, _bitmap: &Bitmap) -> Result<(), SkyframeError> {
            Err(SkyframeError::Render(
                "window rendering is only supported on Windows".into(),
            ))
        }

        fn set_image(&mut self, _image: Option<PanelImage>) -> Result<(), SkyframeError> {
            Err(SkyframeError::Render(
                "window rendering is only supported on Windows".into(),
            ))
        }

        fn image(&self) -> Option<&PanelImage> {
            None
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub use stub::*;
