//! The shared raster target every stroke draws onto.

use crate::color::PackedColor;
use image::{ImageFormat, Rgba, RgbaImage};
use kurbo::Point;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Surface errors.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for surface operations.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Drawing primitives the stroke engine needs from a canvas.
///
/// Implementations have no internal synchronization; all calls come from
/// the drawing executor.
pub trait Surface {
    /// Fill a disc of radius `half_extent` centered on `center`.
    fn draw_disc(&mut self, center: Point, half_extent: f64, color: PackedColor);

    /// Fill an axis-aligned square extending `half_extent` from `center`.
    fn draw_square(&mut self, center: Point, half_extent: f64, color: PackedColor);

    /// Reset every pixel to the background color.
    fn clear_to_background(&mut self);

    /// Color under `point`, or `None` when it lies outside the surface.
    fn pixel_color(&self, point: Point) -> Option<PackedColor>;

    /// Color that erasing paints.
    fn background(&self) -> PackedColor;
}

/// An owned RGBA bitmap.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    bitmap: RgbaImage,
    background: PackedColor,
}

impl RasterSurface {
    /// Create a surface filled with `background`.
    pub fn new(width: u32, height: u32, background: PackedColor) -> Self {
        Self {
            bitmap: RgbaImage::from_pixel(width, height, Rgba(background.to_rgba8())),
            background,
        }
    }

    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    /// Borrow the underlying bitmap.
    pub fn bitmap(&self) -> &RgbaImage {
        &self.bitmap
    }

    /// Replace the bitmap with a blank one of a new size, as when the
    /// hosting view is resized.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.bitmap = RgbaImage::from_pixel(width, height, Rgba(self.background.to_rgba8()));
    }

    /// Encode the current contents as PNG.
    pub fn to_png(&self) -> SurfaceResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.bitmap
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Write the current contents to a PNG file.
    pub fn save_png(&self, path: impl AsRef<Path>) -> SurfaceResult<()> {
        self.bitmap
            .save_with_format(path.as_ref(), ImageFormat::Png)?;
        log::info!("Saved surface to: {:?}", path.as_ref());
        Ok(())
    }

    /// Pixel bounds covering `center ± half_extent`, clipped to the bitmap.
    /// Returns `None` when nothing is visible.
    fn clip(&self, center: Point, half_extent: f64) -> Option<(u32, u32, u32, u32)> {
        if !half_extent.is_finite() || !center.x.is_finite() || !center.y.is_finite() {
            return None;
        }
        let x0 = (center.x - half_extent).floor().max(0.0);
        let y0 = (center.y - half_extent).floor().max(0.0);
        let x1 = (center.x + half_extent).ceil().min(self.width() as f64);
        let y1 = (center.y + half_extent).ceil().min(self.height() as f64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

impl Surface for RasterSurface {
    fn draw_disc(&mut self, center: Point, half_extent: f64, color: PackedColor) {
        let Some((x0, y0, x1, y1)) = self.clip(center, half_extent) else {
            return;
        };
        let r2 = half_extent * half_extent;
        let pixel = Rgba(color.to_rgba8());
        for y in y0..y1 {
            for x in x0..x1 {
                // Sample at the pixel center.
                let dx = x as f64 + 0.5 - center.x;
                let dy = y as f64 + 0.5 - center.y;
                if dx * dx + dy * dy <= r2 {
                    self.bitmap.put_pixel(x, y, pixel);
                }
            }
        }
    }

    fn draw_square(&mut self, center: Point, half_extent: f64, color: PackedColor) {
        let Some((x0, y0, x1, y1)) = self.clip(center, half_extent) else {
            return;
        };
        let pixel = Rgba(color.to_rgba8());
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = (x as f64 + 0.5 - center.x).abs();
                let dy = (y as f64 + 0.5 - center.y).abs();
                if dx <= half_extent && dy <= half_extent {
                    self.bitmap.put_pixel(x, y, pixel);
                }
            }
        }
    }

    fn clear_to_background(&mut self) {
        let pixel = Rgba(self.background.to_rgba8());
        for p in self.bitmap.pixels_mut() {
            *p = pixel;
        }
    }

    fn pixel_color(&self, point: Point) -> Option<PackedColor> {
        if !point.x.is_finite() || !point.y.is_finite() || point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        let (x, y) = (point.x as u32, point.y as u32);
        let Rgba([r, g, b, a]) = *self.bitmap.get_pixel_checked(x, y)?;
        Some(PackedColor::from_rgba8(r, g, b, a))
    }

    fn background(&self) -> PackedColor {
        self.background
    }
}
