//! The output surface the overlay is composited onto.
//!
//! The canvas is a transparent RGBA layer stacked over the video frame, the
//! same way an overlay element sits over a video element. It is cleared and
//! fully repainted for every processed frame.

use crate::{geometry::SurfaceSize, raster::Window, utils::safe_cast::u32_to_i32};
use image::{imageops, DynamicImage, Rgba, RgbImage, RgbaImage};
use tiny_skia::{ColorU8, Pixmap, PixmapPaint, Transform};

/// RGBA output surface backed by a premultiplied tiny-skia pixmap
#[derive(Debug, Clone)]
pub struct Canvas {
    size: SurfaceSize,
    // None for a zero-area surface
    pixmap: Option<Pixmap>,
}

impl Canvas {
    /// Create a transparent canvas
    #[must_use]
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            pixmap: Pixmap::new(size.width, size.height),
        }
    }

    #[must_use]
    pub const fn size(&self) -> SurfaceSize {
        self.size
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.size.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.size.height
    }

    /// Match the surface to new dimensions. Returns whether the size changed.
    ///
    /// Resizing discards the contents, like resizing a drawing surface does.
    pub fn resize(&mut self, size: SurfaceSize) -> bool {
        if self.size == size {
            return false;
        }
        *self = Self::new(size);
        true
    }

    /// Make every pixel transparent
    pub fn clear(&mut self) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(tiny_skia::Color::TRANSPARENT);
        }
    }

    /// Whether nothing has been painted since the last clear
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pixmap
            .as_ref()
            .map_or(true, |pixmap| pixmap.pixels().iter().all(|px| px.alpha() == 0))
    }

    /// Straight-alpha color at `(x, y)`; transparent outside the surface
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        self.pixmap
            .as_ref()
            .and_then(|pixmap| pixmap.pixel(x, y))
            .map_or(Rgba([0, 0, 0, 0]), |px| straight(px.demultiply()))
    }

    /// Drawing target, or `None` for a zero-area surface
    pub fn pixmap_mut(&mut self) -> Option<&mut Pixmap> {
        self.pixmap.as_mut()
    }

    /// Source-over a window-sized layer at the window's position
    pub fn composite(&mut self, layer: &Pixmap, window: Window) {
        let (Some(pixmap), Ok(x), Ok(y)) = (self.pixmap.as_mut(), u32_to_i32(window.x), u32_to_i32(window.y)) else {
            return;
        };
        pixmap.draw_pixmap(x, y, layer.as_ref(), &PixmapPaint::default(), Transform::identity(), None);
    }

    /// Straight-alpha copy of the surface
    #[must_use]
    pub fn to_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.size.width, self.size.height);
        if let Some(pixmap) = &self.pixmap {
            for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
                *dst = straight(src.demultiply());
            }
        }
        image
    }
}

fn straight(color: ColorU8) -> Rgba<u8> {
    Rgba([color.red(), color.green(), color.blue(), color.alpha()])
}

/// Premultiplied pixmap holding `image`, or `None` for an empty image
#[must_use]
pub fn pixmap_from_image(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
    }
    Some(pixmap)
}

/// Stack the overlay over a video frame for display.
///
/// The overlay is anchored at the top-left corner; pixels outside either
/// image are left as in the frame.
#[must_use]
pub fn compose_preview(frame: &RgbImage, overlay: &RgbaImage) -> RgbImage {
    let mut out = DynamicImage::ImageRgb8(frame.clone()).into_rgba8();
    imageops::overlay(&mut out, overlay, 0, 0);
    DynamicImage::ImageRgba8(out).into_rgb8()
}
