//! Eyelid-clipped iris compositing.
//!
//! Per eye, every overlay paint is intersected with the eyelid clip, so no
//! overlay pixel lands outside the eye opening however wrong the iris
//! estimate is. The clip is a per-eye value and is dropped before the next eye.

use crate::{
    canvas::{pixmap_from_image, Canvas},
    color::{Tint, TintBlend},
    constants::{
        DEBUG_POINT_RADIUS, DEFAULT_DEBUG_STROKE_WIDTH, DEFAULT_FALLBACK_ALPHA, DEFAULT_HIGHLIGHT_ALPHA,
        DEFAULT_HIGHLIGHT_OFFSET, DEFAULT_HIGHLIGHT_RADIUS, DEFAULT_TEXTURE_CLIP_SCALE, DEFAULT_TEXTURE_SCALE,
        DEFAULT_TINT_OPACITY, EYELID_DEBUG_COLOR, IRIS_DEBUG_COLOR,
    },
    geometry::{EyeGeometry, PixelPoint},
    raster::{circle_path, outline_path, square_rect, ClipMask},
};
use image::RgbaImage;
use tiny_skia::{BlendMode, Color, FillRule, FilterQuality, Paint, Pixmap, PixmapPaint, Rect, Stroke, Transform};

/// Compositing parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Texture square side in iris radii
    pub texture_scale: f64,
    /// Texture clip circle radius in iris radii
    pub texture_clip_scale: f64,
    /// Catch-light offset up and left, in iris radii
    pub highlight_offset: f64,
    /// Catch-light radius in iris radii
    pub highlight_radius: f64,
    pub highlight_alpha: f64,
    pub tint_opacity: f64,
    pub tint_blend: TintBlend,
    /// Fill the iris disc with the tint when no texture is available
    pub solid_fallback: bool,
    pub fallback_alpha: f64,
    /// Stroke eyelid and iris contours
    pub debug_contours: bool,
    /// Dot every eye landmark
    pub debug_points: bool,
    pub debug_stroke_width: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            texture_scale: DEFAULT_TEXTURE_SCALE,
            texture_clip_scale: DEFAULT_TEXTURE_CLIP_SCALE,
            highlight_offset: DEFAULT_HIGHLIGHT_OFFSET,
            highlight_radius: DEFAULT_HIGHLIGHT_RADIUS,
            highlight_alpha: DEFAULT_HIGHLIGHT_ALPHA,
            tint_opacity: DEFAULT_TINT_OPACITY,
            tint_blend: TintBlend::default(),
            solid_fallback: false,
            fallback_alpha: DEFAULT_FALLBACK_ALPHA,
            debug_contours: false,
            debug_points: false,
            debug_stroke_width: DEFAULT_DEBUG_STROKE_WIDTH,
        }
    }
}

/// What happened to one eye during a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyePaint {
    /// Texture, highlight and tint were composited
    Textured,
    /// No texture; the iris disc was filled with the tint
    Solid,
    /// Nothing was painted for this eye (no texture, or the eye is closed)
    Skipped,
}

/// Paints iris overlays onto a [`Canvas`]
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    options: RenderOptions,
}

impl OverlayRenderer {
    #[must_use]
    pub const fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub const fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut RenderOptions {
        &mut self.options
    }

    /// Replace the canvas contents with the overlay for all given eyes.
    ///
    /// Debug overlays go on last so the tint never touches them.
    pub fn render_frame(
        &self,
        canvas: &mut Canvas,
        eyes: &[EyeGeometry],
        tint: Tint,
        texture: Option<&RgbaImage>,
    ) -> Vec<EyePaint> {
        canvas.clear();
        let painted = eyes.iter().map(|eye| self.render_eye(canvas, eye, tint, texture)).collect();
        for eye in eyes {
            self.render_debug(canvas, eye);
        }
        painted
    }

    /// Composite one eye inside its eyelid clip.
    ///
    /// The eye is painted into its own layer spanning the eyelid window, so
    /// the tint only reaches pixels this eye painted. The layer is then laid
    /// over the canvas.
    pub fn render_eye(
        &self,
        canvas: &mut Canvas,
        eye: &EyeGeometry,
        tint: Tint,
        texture: Option<&RgbaImage>,
    ) -> EyePaint {
        let Some(clip) = ClipMask::polygon(&eye.eyelid, canvas.size()) else {
            return EyePaint::Skipped;
        };
        let window = clip.window();
        let Some(mut layer) = Pixmap::new(window.width, window.height) else {
            return EyePaint::Skipped;
        };

        let painted = match texture.and_then(pixmap_from_image) {
            Some(texture) => {
                self.paint_textured(&mut layer, &clip, eye, &texture);
                self.apply_tint(&mut layer, tint);
                EyePaint::Textured
            }
            None if self.options.solid_fallback => {
                if let Some(disc) = circle_path(eye.iris.center, eye.iris.radius) {
                    let paint = solid_paint(tint.to_color(self.options.fallback_alpha), BlendMode::SourceOver);
                    layer.fill_path(&disc, &paint, FillRule::Winding, window.transform(), Some(clip.mask()));
                }
                EyePaint::Solid
            }
            None => return EyePaint::Skipped,
        };

        canvas.composite(&layer, window);
        painted
    }

    /// Texture square held inside a circle, then the catch-light, all inside the clip
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)] // Pixel sizes fit f32
    fn paint_textured(&self, layer: &mut Pixmap, clip: &ClipMask, eye: &EyeGeometry, texture: &Pixmap) {
        let opts = &self.options;
        let to_layer = clip.window().transform();
        let center = eye.iris.center;
        let radius = eye.iris.radius;

        if let Some(square) = square_rect(center, radius * opts.texture_scale) {
            let area = clip.intersected(circle_path(center, radius * opts.texture_clip_scale).as_ref());
            let placement = Transform::from_row(
                square.width() / texture.width() as f32,
                0.0,
                0.0,
                square.height() / texture.height() as f32,
                square.x(),
                square.y(),
            )
            .post_concat(to_layer);
            let paint = PixmapPaint {
                quality: FilterQuality::Bilinear,
                ..PixmapPaint::default()
            };
            layer.draw_pixmap(0, 0, texture.as_ref(), &paint, placement, Some(area.mask()));
        }

        let offset = radius * opts.highlight_offset;
        let highlight = PixelPoint::new(center.x - offset, center.y - offset);
        if let Some(disc) = circle_path(highlight, radius * opts.highlight_radius) {
            let mut white = Color::WHITE;
            white.set_alpha(opts.highlight_alpha as f32);
            let paint = solid_paint(white, BlendMode::SourceOver);
            layer.fill_path(&disc, &paint, FillRule::Winding, to_layer, Some(clip.mask()));
        }
    }

    /// Lay the tint over what the layer holds, keeping its coverage
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)] // Opacity is in [0, 1]
    fn apply_tint(&self, layer: &mut Pixmap, tint: Tint) {
        let Some(bounds) = Rect::from_xywh(0.0, 0.0, layer.width() as f32, layer.height() as f32) else {
            return;
        };
        let mut tinted = layer.clone();
        let paint = solid_paint(tint.to_color(1.0), self.options.tint_blend.blend_mode());
        tinted.fill_rect(bounds, &paint, Transform::identity(), None);

        let mix = PixmapPaint {
            opacity: self.options.tint_opacity.clamp(0.0, 1.0) as f32,
            blend_mode: BlendMode::SourceAtop,
            quality: FilterQuality::Nearest,
        };
        layer.draw_pixmap(0, 0, tinted.as_ref(), &mix, Transform::identity(), None);
    }

    /// Unclipped diagnostic strokes, opaque and drawn over the composited eyes
    #[allow(clippy::cast_possible_truncation)] // Stroke width fits f32
    pub fn render_debug(&self, canvas: &mut Canvas, eye: &EyeGeometry) {
        let opts = &self.options;
        if !opts.debug_contours && !opts.debug_points {
            return;
        }
        let Some(pixmap) = canvas.pixmap_mut() else {
            return;
        };
        let shapes = [
            (&eye.eyelid, solid_paint(debug_color(EYELID_DEBUG_COLOR), BlendMode::SourceOver)),
            (&eye.iris_contour, solid_paint(debug_color(IRIS_DEBUG_COLOR), BlendMode::SourceOver)),
        ];

        if opts.debug_contours {
            let stroke = Stroke {
                width: opts.debug_stroke_width as f32,
                ..Stroke::default()
            };
            for (points, paint) in &shapes {
                if let Some(outline) = outline_path(points) {
                    pixmap.stroke_path(&outline, paint, &stroke, Transform::identity(), None);
                }
            }
        }

        if opts.debug_points {
            for (points, paint) in &shapes {
                for dot in points.iter().filter_map(|p| circle_path(*p, DEBUG_POINT_RADIUS)) {
                    pixmap.fill_path(&dot, paint, FillRule::Winding, Transform::identity(), None);
                }
            }
        }
    }
}

/// Aliased solid paint, so clip edges stay exact
fn solid_paint(color: Color, blend_mode: BlendMode) -> Paint<'static> {
    let mut paint = Paint {
        blend_mode,
        anti_alias: false,
        ..Paint::default()
    };
    paint.set_color(color);
    paint
}

fn debug_color(rgb: [u8; 3]) -> Color {
    Color::from_rgba8(rgb[0], rgb[1], rgb[2], 255)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::{IrisGeometry, SurfaceSize},
        landmarks::EyeSide,
        raster::point_in_polygon,
    };
    use image::Rgba;

    fn near(actual: u8, expected: u8) -> bool {
        actual.abs_diff(expected) <= 2
    }

    fn almond(cx: f64, cy: f64, half_w: f64, half_h: f64) -> Vec<PixelPoint> {
        (0..16)
            .map(|i| {
                let t = f64::from(i) / 16.0 * std::f64::consts::TAU;
                PixelPoint::new(cx + half_w * t.cos(), cy + half_h * t.sin())
            })
            .collect()
    }

    fn eye(center: PixelPoint, radius: f64) -> EyeGeometry {
        EyeGeometry {
            side: EyeSide::Left,
            iris: IrisGeometry::new(center, radius),
            iris_contour: vec![
                PixelPoint::new(center.x + radius, center.y),
                PixelPoint::new(center.x, center.y + radius),
                PixelPoint::new(center.x - radius, center.y),
                PixelPoint::new(center.x, center.y - radius),
            ],
            eyelid: almond(center.x, center.y, 25.0, 8.0),
        }
    }

    fn texture() -> RgbaImage {
        RgbaImage::from_pixel(16, 16, Rgba([120, 80, 40, 255]))
    }

    #[test]
    fn test_textured_eye_stays_in_clip() {
        let mut canvas = Canvas::new(SurfaceSize::new(200, 120));
        let renderer = OverlayRenderer::default();
        let geometry = eye(PixelPoint::new(100.0, 60.0), 12.0);

        let tex = texture();
        let painted = renderer.render_eye(&mut canvas, &geometry, Tint::default(), Some(&tex));
        assert_eq!(painted, EyePaint::Textured);
        assert!(!canvas.is_blank());

        for (x, y, px) in canvas.to_image().enumerate_pixels() {
            if px[3] > 0 {
                let centre = PixelPoint::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                assert!(point_in_polygon(centre, &geometry.eyelid), "pixel ({x}, {y}) outside eyelid");
            }
        }
    }

    #[test]
    fn test_missing_texture_skips_eye() {
        let mut canvas = Canvas::new(SurfaceSize::new(200, 120));
        let renderer = OverlayRenderer::default();
        let painted = renderer.render_frame(
            &mut canvas,
            &[eye(PixelPoint::new(100.0, 60.0), 12.0)],
            Tint::default(),
            None,
        );
        assert_eq!(painted, vec![EyePaint::Skipped]);
        assert!(canvas.is_blank());
    }

    #[test]
    fn test_solid_fallback() {
        let mut canvas = Canvas::new(SurfaceSize::new(200, 120));
        let renderer = OverlayRenderer::new(RenderOptions {
            solid_fallback: true,
            ..RenderOptions::default()
        });
        let painted = renderer.render_eye(&mut canvas, &eye(PixelPoint::new(100.0, 60.0), 6.0), Tint::new(0, 0, 255), None);
        assert_eq!(painted, EyePaint::Solid);

        let px = canvas.pixel(100, 60);
        assert!(near(px[2], 255));
        assert!(near(px[3], 217)); // 0.85 * 255
        assert_eq!(canvas.pixel(100, 75)[3], 0);
    }

    #[test]
    fn test_tint_applied_over_texture() {
        let mut canvas = Canvas::new(SurfaceSize::new(200, 120));
        let renderer = OverlayRenderer::default();
        let tex = texture();
        renderer.render_eye(&mut canvas, &eye(PixelPoint::new(100.0, 60.0), 12.0), Tint::new(0, 0, 255), Some(&tex));

        // Away from the highlight: half texture, half tint
        let px = canvas.pixel(108, 62);
        assert_eq!(px[3], 255);
        assert!(near(px[0], 60));
        assert!(near(px[2], 148));
    }

    #[test]
    fn test_overlapping_eyes_tint_once() {
        let renderer = OverlayRenderer::default();
        let tex = texture();
        let first = eye(PixelPoint::new(100.0, 60.0), 12.0);
        // Same eyelid, iris far enough left that it paints nothing near the first iris
        let mut second = first.clone();
        second.iris = IrisGeometry::new(PixelPoint::new(80.0, 60.0), 4.0);

        let mut alone = Canvas::new(SurfaceSize::new(200, 120));
        renderer.render_frame(&mut alone, &[first.clone()], Tint::new(0, 0, 255), Some(&tex));
        let mut both = Canvas::new(SurfaceSize::new(200, 120));
        renderer.render_frame(&mut both, &[first, second], Tint::new(0, 0, 255), Some(&tex));

        for (x, y) in [(108, 62), (100, 52), (112, 60)] {
            assert_eq!(both.pixel(x, y), alone.pixel(x, y), "pixel ({x}, {y}) tinted twice");
        }
        assert!(near(both.pixel(108, 62)[0], 60));
    }

    #[test]
    fn test_closed_eye_paints_nothing() {
        let mut canvas = Canvas::new(SurfaceSize::new(200, 120));
        let renderer = OverlayRenderer::default();
        let mut geometry = eye(PixelPoint::new(100.0, 60.0), 12.0);
        geometry.eyelid = almond(100.0, 60.0, 25.0, 0.0);

        let tex = texture();
        let painted = renderer.render_eye(&mut canvas, &geometry, Tint::default(), Some(&tex));
        assert_eq!(painted, EyePaint::Skipped);
        assert!(canvas.is_blank());
    }

    #[test]
    fn test_debug_contours_toggle() {
        let geometry = eye(PixelPoint::new(100.0, 60.0), 12.0);

        let mut canvas = Canvas::new(SurfaceSize::new(200, 120));
        OverlayRenderer::default().render_frame(&mut canvas, &[geometry.clone()], Tint::default(), None);
        assert!(canvas.is_blank());

        let renderer = OverlayRenderer::new(RenderOptions {
            debug_contours: true,
            ..RenderOptions::default()
        });
        renderer.render_frame(&mut canvas, &[geometry], Tint::default(), None);
        assert!(!canvas.is_blank());
        // Contour pixel on the right end of the eyelid
        assert_eq!(canvas.pixel(124, 60), Rgba([0x00, 0xff, 0x88, 255]));
    }
}
