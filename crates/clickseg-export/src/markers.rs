//! Click marker rasterisation via tiny-skia.

use clickseg_core::{Marker, RgbaImage};
use image::Rgba;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// Ring width of a marker in pixels.
pub const MARKER_STROKE_WIDTH: f32 = 2.0;

/// Draw `markers` over `image`.
///
/// Marker centers must be in the image's own pixel space (lay them out
/// with `DisplayRect::at_origin(width, height)`). Each marker is a disc
/// of its stroke color at `fill_alpha`, outlined by an anti-aliased ring
/// that stays inside the marker's diameter.
#[must_use = "returns the annotated image"]
pub fn render_markers(image: &RgbaImage, markers: &[Marker]) -> RgbaImage {
    let (width, height) = image.dimensions();
    if markers.is_empty() {
        return image.clone();
    }
    let Some(mut pixmap) = Pixmap::new(width, height) else {
        return image.clone();
    };
    for marker in markers {
        draw_marker(&mut pixmap, marker);
    }
    blend_over(image, &pixmap_to_rgba(&pixmap))
}

#[allow(clippy::cast_possible_truncation)]
fn draw_marker(pixmap: &mut Pixmap, marker: &Marker) {
    let radius = (marker.radius() as f32 - MARKER_STROKE_WIDTH / 2.0).max(0.5);
    let Some(circle) =
        PathBuilder::from_circle(marker.center.x as f32, marker.center.y as f32, radius)
    else {
        return;
    };
    let [r, g, b] = marker.stroke.0;

    let mut paint = Paint::default();
    paint.anti_alias = true;
    paint.set_color_rgba8(r, g, b, marker.fill_alpha);
    pixmap.fill_path(&circle, &paint, FillRule::Winding, Transform::identity(), None);

    paint.set_color_rgba8(r, g, b, 255);
    let stroke = Stroke {
        width: MARKER_STROKE_WIDTH,
        ..Stroke::default()
    };
    pixmap.stroke_path(&circle, &paint, &stroke, Transform::identity(), None);
}

/// Convert a premultiplied pixmap to a straight-alpha `RgbaImage`.
#[allow(clippy::cast_possible_truncation)]
fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let data = pixmap.data();
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (i, pixel) in img.pixels_mut().enumerate() {
        let off = i * 4;
        let a = data[off + 3];
        if a != 0 {
            let r = u16::from(data[off]) * 255 / u16::from(a);
            let g = u16::from(data[off + 1]) * 255 / u16::from(a);
            let b = u16::from(data[off + 2]) * 255 / u16::from(a);
            *pixel = Rgba([r as u8, g as u8, b as u8, a]);
        }
    }
    img
}

/// Source-over composite of `layer` onto `base` (straight alpha).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend_over(base: &RgbaImage, layer: &RgbaImage) -> RgbaImage {
    let mut out = base.clone();
    for (dst, src) in out.pixels_mut().zip(layer.pixels()) {
        let sa = f32::from(src.0[3]) / 255.0;
        if sa <= 0.0 {
            continue;
        }
        let da = f32::from(dst.0[3]) / 255.0;
        let oa = da.mul_add(1.0 - sa, sa);
        for c in 0..3 {
            let s = f32::from(src.0[c]) * sa;
            let d = f32::from(dst.0[c]) * da * (1.0 - sa);
            dst.0[c] = ((s + d) / oa).round().clamp(0.0, 255.0) as u8;
        }
        dst.0[3] = (oa * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out
}
