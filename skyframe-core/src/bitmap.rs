//! Owned pixel buffers shared between the decoder, overlays and panels.
//!
//! Pixels are stored as tightly packed BGRA8 rows, the layout GDI's
//! `StretchDIBits` expects, so a native panel can blit a bitmap without
//! converting it first.

use std::convert::Infallible;

use embedded_graphics::Pixel;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use image::RgbaImage;

use crate::error::SkyframeError;

/// Bytes per BGRA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Largest accepted edge length, in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// A BGRA8 image owned by whoever holds it.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Create a black, fully opaque bitmap.
    pub fn new(width: u32, height: u32) -> Result<Self, SkyframeError> {
        Self::filled(width, height, Rgb888::BLACK)
    }

    /// Create a bitmap filled with a single colour.
    pub fn filled(width: u32, height: u32, color: Rgb888) -> Result<Self, SkyframeError> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(SkyframeError::InvalidSize { width, height });
        }
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        let mut bitmap = Self {
            width,
            height,
            data: vec![0u8; len],
        };
        bitmap.fill(color);
        Ok(bitmap)
    }

    /// Convert a decoded RGBA image into BGRA8.
    pub fn from_rgba_image(img: &RgbaImage) -> Result<Self, SkyframeError> {
        let (width, height) = img.dimensions();
        let mut bitmap = Self::new(width, height)?;
        for (src, dst) in img
            .as_raw()
            .chunks_exact(4)
            .zip(bitmap.data.chunks_exact_mut(BYTES_PER_PIXEL))
        {
            dst[0] = src[2];
            dst[1] = src[1];
            dst[2] = src[0];
            dst[3] = src[3];
        }
        Ok(bitmap)
    }

    /// Convert back to an RGBA image (for PNG snapshots).
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut raw = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(BYTES_PER_PIXEL) {
            raw.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        }
        // Buffer length always matches width * height * 4.
        RgbaImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw BGRA8 bytes, `width * height * 4` long.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Colour at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let off = self.offset(x, y);
        let px = &self.data[off..off + BYTES_PER_PIXEL];
        Some(Rgb888::new(px[2], px[1], px[0]))
    }

    /// Paint every pixel with `color`.
    pub fn fill(&mut self, color: Rgb888) {
        let bgra = [color.b(), color.g(), color.r(), 0xFF];
        for px in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&bgra);
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    fn put(&mut self, x: u32, y: u32, color: Rgb888) {
        let off = self.offset(x, y);
        self.data[off] = color.b();
        self.data[off + 1] = color.g();
        self.data[off + 2] = color.r();
        self.data[off + 3] = 0xFF;
    }
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

// ── embedded-graphics integration ────────────────────────────────

impl OriginDimensions for Bitmap {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Bitmap {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            // Clip silently; text may run past the right edge.
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let (x, y) = (point.x as u32, point.y as u32);
            if x < self.width && y < self.height {
                self.put(x, y, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    #[test]
    fn zero_sized_bitmap_is_rejected() {
        assert!(matches!(
            Bitmap::new(0, 10),
            Err(SkyframeError::InvalidSize { width: 0, height: 10 })
        ));
        assert!(Bitmap::new(10, 0).is_err());
        assert!(Bitmap::new(MAX_DIMENSION + 1, 1).is_err());
    }

    #[test]
    fn filled_bitmap_stores_bgra() {
        let bmp = Bitmap::filled(2, 2, Rgb888::new(0x10, 0x20, 0x30)).unwrap();
        assert_eq!(bmp.data().len(), 16);
        assert_eq!(&bmp.data()[..4], &[0x30, 0x20, 0x10, 0xFF]);
        assert_eq!(bmp.pixel(1, 1), Some(Rgb888::new(0x10, 0x20, 0x30)));
        assert_eq!(bmp.pixel(2, 0), None);
    }

    #[test]
    fn rgba_conversion_swaps_channels() {
        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(1, 0, image::Rgba([0xAA, 0xBB, 0xCC, 0xFF]));
        let bmp = Bitmap::from_rgba_image(&img).unwrap();
        assert_eq!(bmp.pixel(1, 0), Some(Rgb888::new(0xAA, 0xBB, 0xCC)));
        assert_eq!(bmp.to_rgba_image().get_pixel(1, 0).0, [0xAA, 0xBB, 0xCC, 0xFF]);
    }

    #[test]
    fn draw_target_clips_out_of_bounds() {
        let mut bmp = Bitmap::new(4, 4).unwrap();
        Rectangle::new(Point::new(2, 2), Size::new(10, 10))
            .into_styled(PrimitiveStyle::with_fill(Rgb888::RED))
            .draw(&mut bmp)
            .unwrap();
        assert_eq!(bmp.pixel(3, 3), Some(Rgb888::RED));
        assert_eq!(bmp.pixel(1, 1), Some(Rgb888::BLACK));
    }
}
