//! Mask compositing: overlays, cut-outs, trimming, and bounds.
//!
//! Every function here is pure and operates on in-memory rasters. The
//! per-frame path is [`colorize`] (and optionally [`composite_preview`]);
//! the rest runs on demand when the user exports a result, so the
//! full-image scans are acceptable.
//!
//! Masks and images may have different resolutions. Mask lookups use
//! nearest-neighbor scaling: native pixel `x` reads mask column
//! `floor(x * mask_width / image_width)`.

use image::{Rgba, RgbaImage};

use crate::types::{Bounds, Dimensions, Mask, Overlay, Rgb};

/// Options for [`apply_mask_to_image`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CutoutOptions {
    /// Crop the result to the bounding box of its visible pixels.
    pub trim_to_content: bool,
    /// Extra pixels kept around the content when trimming.
    pub padding: u32,
}

impl CutoutOptions {
    /// Trim to content with the given padding.
    #[must_use]
    pub const fn trimmed(padding: u32) -> Self {
        Self {
            trim_to_content: true,
            padding,
        }
    }
}

/// Render a mask as a single-color overlay.
///
/// Output alpha equals the mask's alpha, so soft edges are preserved.
/// Pixels with zero alpha are fully transparent black.
#[must_use = "returns the overlay"]
pub fn colorize(mask: &Mask, color: Rgb) -> Overlay {
    let src = mask.as_rgba();
    let raster = RgbaImage::from_fn(src.width(), src.height(), |x, y| {
        let alpha = src.get_pixel(x, y).0[3];
        if alpha > 0 {
            Rgba([color.r(), color.g(), color.b(), alpha])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    Overlay::new(raster)
}

/// The mask as a standalone RGBA image.
#[must_use]
pub fn mask_to_image(mask: &Mask) -> RgbaImage {
    mask.as_rgba().clone()
}

/// Cut the masked object out of `image`.
///
/// RGB is copied from the source image; alpha is zeroed wherever the
/// corresponding (nearest-neighbor scaled) mask pixel is unselected and
/// left untouched elsewhere. With `trim_to_content` the result is then
/// cropped via [`trim_to_content`].
#[must_use = "returns the composited image"]
pub fn apply_mask_to_image(image: &RgbaImage, mask: &Mask, options: CutoutOptions) -> RgbaImage {
    let mut out = image.clone();
    let native = Dimensions::of(image);
    let scaled = mask.dimensions();

    if scaled.is_empty() {
        // Nothing can be selected by an empty raster.
        for pixel in out.pixels_mut() {
            pixel.0[3] = 0;
        }
    } else {
        let columns: Vec<u32> = (0..native.width)
            .map(|x| nearest(x, native.width, scaled.width))
            .collect();
        for y in 0..native.height {
            let mask_y = nearest(y, native.height, scaled.height);
            for x in 0..native.width {
                let mask_x = columns[x as usize];
                if mask.alpha_at(mask_x, mask_y) == Some(0) {
                    out.get_pixel_mut(x, y).0[3] = 0;
                }
            }
        }
    }

    if options.trim_to_content {
        trim_to_content(&out, options.padding)
    } else {
        out
    }
}

/// Crop `image` to the bounding box of its non-transparent pixels,
/// grown by `padding` and clamped to the image.
///
/// Returns an unmodified copy when no pixel is visible.
#[must_use = "returns the trimmed image"]
pub fn trim_to_content(image: &RgbaImage, padding: u32) -> RgbaImage {
    let Some(bounds) = content_bounds(image) else {
        return image.clone();
    };
    let region = bounds.expand(padding, Dimensions::of(image));
    image::imageops::crop_imm(image, region.left, region.top, region.width, region.height)
        .to_image()
}

/// Bounding box of the selected pixels of `mask`, or `None` when every
/// pixel is transparent.
#[must_use]
pub fn compute_bounds(mask: &Mask) -> Option<Bounds> {
    content_bounds(mask.as_rgba())
}

/// Bounding box of the pixels with nonzero alpha in any RGBA raster.
#[must_use]
pub fn content_bounds(image: &RgbaImage) -> Option<Bounds> {
    let mut found: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[3] == 0 {
            continue;
        }
        found = Some(match found {
            None => (x, y, x, y),
            Some((left, top, right, bottom)) => {
                (left.min(x), top.min(y), right.max(x), bottom.max(y))
            }
        });
    }
    found.map(|(left, top, right, bottom)| Bounds::from_edges(left, top, right, bottom))
}

/// Blend an overlay onto an image for display.
///
/// The overlay is scaled to the image with nearest-neighbor lookups and
/// composited source-over with its alpha multiplied by `opacity`
/// (clamped to `0.0..=1.0`). The result keeps the image's own alpha.
#[must_use = "returns the composited preview"]
pub fn composite_preview(image: &RgbaImage, overlay: &Overlay, opacity: f32) -> RgbaImage {
    let mut out = image.clone();
    let layer = overlay.as_rgba();
    let native = Dimensions::of(image);
    let scaled = Dimensions::of(layer);
    let opacity = opacity.clamp(0.0, 1.0);
    if scaled.is_empty() || opacity <= 0.0 {
        return out;
    }

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let src = layer.get_pixel(
            nearest(x, native.width, scaled.width),
            nearest(y, native.height, scaled.height),
        );
        let alpha = f32::from(src.0[3]) / 255.0 * opacity;
        if alpha <= 0.0 {
            continue;
        }
        for c in 0..3 {
            let blended = f32::from(src.0[c]).mul_add(alpha, f32::from(pixel.0[c]) * (1.0 - alpha));
            #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                pixel.0[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

/// Nearest-neighbor index: `floor(i * to / from)`, clamped into `0..to`.
fn nearest(i: u32, from: u32, to: u32) -> u32 {
    if from == 0 || to == 0 {
        return 0;
    }
    let scaled = u64::from(i) * u64::from(to) / u64::from(from);
    #[expect(clippy::cast_possible_truncation)]
    let scaled = scaled.min(u64::from(to - 1)) as u32;
    scaled
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(rgba))
    }

    /// Mask with a single opaque rectangle `[x0, x1] × [y0, y1]`.
    fn rect_mask(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> Mask {
        Mask::from_rgba(RgbaImage::from_fn(width, height, |x, y| {
            if (x0..=x1).contains(&x) && (y0..=y1).contains(&y) {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        }))
    }

    // --- colorize ---

    #[test]
    fn colorize_preserves_soft_alpha() {
        let mask = Mask::from_rgba(RgbaImage::from_fn(3, 1, |x, _| {
            Rgba([0, 0, 0, [0, 77, 255][x as usize]])
        }));
        let overlay = colorize(&mask, Rgb::new(10, 20, 30));
        let raster = overlay.as_rgba();
        assert_eq!(raster.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(raster.get_pixel(1, 0).0, [10, 20, 30, 77]);
        assert_eq!(raster.get_pixel(2, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn colorize_keeps_mask_resolution() {
        let mask = rect_mask(7, 5, 0, 0, 1, 1);
        let overlay = colorize(&mask, Rgb::new(1, 2, 3));
        assert_eq!(overlay.as_rgba().dimensions(), (7, 5));
    }

    // --- apply_mask_to_image ---

    #[test]
    fn cutout_keeps_rgb_and_clears_unselected_alpha() {
        let image = RgbaImage::from_fn(4, 4, |x, y| Rgba([x as u8, y as u8, 9, 200]));
        let mask = rect_mask(4, 4, 1, 1, 2, 2);
        let out = apply_mask_to_image(&image, &mask, CutoutOptions::default());
        for (x, y, p) in out.enumerate_pixels() {
            assert_eq!(&p.0[..3], &[x as u8, y as u8, 9]);
            let inside = (1..=2).contains(&x) && (1..=2).contains(&y);
            assert_eq!(p.0[3], if inside { 200 } else { 0 }, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn cutout_scales_low_resolution_mask() {
        // 2x2 mask over a 4x4 image: each mask pixel covers a 2x2 block.
        let mask = rect_mask(2, 2, 1, 0, 1, 0);
        let out = apply_mask_to_image(&solid(4, 4, [5, 5, 5, 255]), &mask, CutoutOptions::default());
        for (x, y, p) in out.enumerate_pixels() {
            let selected = x >= 2 && y < 2;
            assert_eq!(p.0[3], if selected { 255 } else { 0 }, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn cutout_scales_high_resolution_mask() {
        // 8x8 mask over a 4x4 image: native x reads mask column 2x.
        let mask = rect_mask(8, 8, 2, 2, 2, 2);
        let out = apply_mask_to_image(&solid(4, 4, [5, 5, 5, 255]), &mask, CutoutOptions::default());
        assert_eq!(out.get_pixel(1, 1).0[3], 255);
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
        assert_eq!(out.get_pixel(2, 2).0[3], 0);
    }

    #[test]
    fn cutout_with_trim_crops_to_selection() {
        let mask = rect_mask(10, 10, 3, 4, 5, 8);
        let out = apply_mask_to_image(&solid(10, 10, [1, 2, 3, 255]), &mask, CutoutOptions::trimmed(0));
        assert_eq!(out.dimensions(), (3, 5));
        assert!(out.pixels().all(|p| p.0 == [1, 2, 3, 255]));
    }

    #[test]
    fn full_mask_cutout_is_fully_opaque() {
        let mask = rect_mask(100, 100, 0, 0, 99, 99);
        let out = apply_mask_to_image(&solid(100, 100, [9, 9, 9, 255]), &mask, CutoutOptions::default());
        assert_eq!(out.dimensions(), (100, 100));
        assert!(out.pixels().all(|p| p.0[3] == 255));
    }

    // --- trim_to_content ---

    #[test]
    fn trim_without_content_returns_input() {
        let image = solid(6, 4, [50, 60, 70, 0]);
        let out = trim_to_content(&image, 3);
        assert_eq!(out, image);
    }

    #[test]
    fn trim_padding_is_clamped() {
        let mut image = solid(10, 10, [0, 0, 0, 0]);
        image.put_pixel(1, 8, Rgba([1, 1, 1, 1]));
        let out = trim_to_content(&image, 3);
        // left: max(0, 1-3)=0, right: 1+3=4, top: 8-3=5, bottom: min(9, 11)=9.
        assert_eq!(out.dimensions(), (5, 5));
        assert_eq!(out.get_pixel(1, 3).0, [1, 1, 1, 1]);
    }

    #[test]
    fn trim_is_idempotent_with_padding() {
        let mut image = solid(20, 12, [0, 0, 0, 0]);
        image.put_pixel(6, 4, Rgba([9, 9, 9, 255]));
        image.put_pixel(10, 7, Rgba([9, 9, 9, 255]));
        let once = trim_to_content(&image, 2);
        let twice = trim_to_content(&once, 2);
        assert_eq!(once, twice);
    }

    // --- compute_bounds ---

    #[test]
    fn bounds_of_transparent_mask_is_none() {
        let mask = Mask::from_rgba(solid(5, 5, [255, 255, 255, 0]));
        assert_eq!(compute_bounds(&mask), None);
    }

    #[test]
    fn bounds_of_full_mask_covers_image() {
        let mask = rect_mask(100, 100, 0, 0, 99, 99);
        assert_eq!(
            compute_bounds(&mask),
            Some(Bounds {
                left: 0,
                top: 0,
                right: 99,
                bottom: 99,
                width: 100,
                height: 100,
            }),
        );
    }

    #[test]
    fn bounds_counts_faint_pixels() {
        let mut raster = solid(9, 9, [0, 0, 0, 0]);
        raster.put_pixel(2, 7, Rgba([0, 0, 0, 1]));
        raster.put_pixel(6, 3, Rgba([0, 0, 0, 1]));
        let bounds = compute_bounds(&Mask::from_rgba(raster)).unwrap();
        assert_eq!(bounds, Bounds::from_edges(2, 3, 6, 7));
    }

    // --- composite_preview ---

    #[test]
    fn preview_blends_with_opacity() {
        let image = solid(2, 2, [0, 0, 0, 255]);
        let mask = rect_mask(2, 2, 0, 0, 0, 0);
        let overlay = colorize(&mask, Rgb::new(200, 100, 50));
        let out = composite_preview(&image, &overlay, 0.5);
        assert_eq!(out.get_pixel(0, 0).0, [100, 50, 25, 255]);
        assert_eq!(out.get_pixel(1, 1).0, [0, 0, 0, 255]);
    }

    #[test]
    fn preview_with_zero_opacity_is_unchanged() {
        let image = solid(3, 3, [10, 20, 30, 255]);
        let overlay = colorize(&rect_mask(3, 3, 0, 0, 2, 2), Rgb::new(255, 0, 0));
        assert_eq!(composite_preview(&image, &overlay, 0.0), image);
    }

    #[test]
    fn nearest_index_is_floor_and_clamped() {
        assert_eq!(nearest(0, 4, 2), 0);
        assert_eq!(nearest(1, 4, 2), 0);
        assert_eq!(nearest(2, 4, 2), 1);
        assert_eq!(nearest(3, 4, 2), 1);
        assert_eq!(nearest(2, 3, 7), 4);
        assert_eq!(nearest(5, 0, 7), 0);
    }
}
