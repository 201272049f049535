//! Integration test: segment a synthetic image, trim the cut-out, and export it.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::cast_possible_truncation
)]

use clickseg_core::compositor::{apply_mask_to_image, compute_bounds};
use clickseg_core::markers::layout_markers;
use clickseg_core::{Click, CutoutOptions, Dimensions, DisplayRect, Mask, RgbaImage, SegmenterConfig};
use clickseg_export::{ImageFormat, encode, render_markers};
use image::Rgba;

/// 64x48 opaque image with a 16x8 selection at (20, 10) in a half-size mask.
fn fixture() -> (RgbaImage, Mask) {
    let image = RgbaImage::from_fn(64, 48, |x, y| Rgba([(x * 4) as u8, (y * 5) as u8, 200, 255]));
    let mask = Mask::from_rgba(RgbaImage::from_fn(32, 24, |x, y| {
        if (10..18).contains(&x) && (5..9).contains(&y) {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    }));
    (image, mask)
}

#[test]
fn trimmed_cutout_round_trips_through_png() {
    let (image, mask) = fixture();
    let bounds = compute_bounds(&mask).expect("mask selects pixels");
    assert_eq!((bounds.width, bounds.height), (8, 4));

    let cutout = apply_mask_to_image(&image, &mask, CutoutOptions::trimmed(2));
    // Native selection is 16x8 at (20, 10); padding adds 2 on each side.
    assert_eq!(cutout.dimensions(), (20, 12));

    let encoded = encode(&cutout, ImageFormat::Png, None).unwrap();
    let decoded = image::load_from_memory(&encoded.bytes).unwrap().into_rgba8();
    assert_eq!(decoded, cutout);

    // The padding ring is transparent; the selection keeps source colors.
    assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
    assert_eq!(decoded.get_pixel(2, 2).0, image.get_pixel(20, 10).0);
}

#[test]
fn markers_render_onto_native_preview() {
    let (image, _) = fixture();
    let clicks = [Click::include(24.0, 12.0), Click::exclude(50.0, 40.0)];
    let dims = Dimensions::of(&image);
    let markers = layout_markers(
        &clicks,
        DisplayRect::at_origin(f64::from(dims.width), f64::from(dims.height)),
        dims,
        &SegmenterConfig::default(),
    );

    let annotated = render_markers(&image, &markers);

    assert_eq!(annotated.dimensions(), image.dimensions());
    assert_ne!(annotated.get_pixel(24, 12), image.get_pixel(24, 12));
    assert_ne!(annotated.get_pixel(50, 40), image.get_pixel(50, 40));
    assert_eq!(annotated.get_pixel(0, 47), image.get_pixel(0, 47));
}
