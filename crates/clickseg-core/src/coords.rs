//! Coordinate mapping between the display surface and native image pixels.
//!
//! The image is usually laid out at a different size than its native
//! resolution (CSS `max-width: 100%`, HiDPI scaling, zoom). Pointer
//! events arrive in display space; clicks are stored in image space.
//! Scale factors are `image / display` in one direction and
//! `display / image` in the other.
//!
//! Both directions return `None` when either side has no usable extent
//! (e.g. the surface has not been laid out yet), rather than dividing
//! by zero.

use crate::types::{Dimensions, DisplayRect, Point};

/// Map a pointer position on the display surface to native image pixels.
///
/// `pointer` is in the same frame as `rect.left`/`rect.top` (client
/// coordinates for a bounding client rect).
#[must_use]
pub fn to_image_space(pointer: Point, rect: DisplayRect, image: Dimensions) -> Option<Point> {
    if !rect.is_laid_out() || image.is_empty() || !pointer.is_finite() {
        return None;
    }
    let scale_x = f64::from(image.width) / rect.width;
    let scale_y = f64::from(image.height) / rect.height;
    Some(Point::new(
        (pointer.x - rect.left) * scale_x,
        (pointer.y - rect.top) * scale_y,
    ))
}

/// Map a native image position to the display surface.
///
/// The result is in the same frame as `rect.left`/`rect.top`; pass
/// [`DisplayRect::at_origin`] to get surface-local coordinates.
#[must_use]
pub fn to_display_space(point: Point, rect: DisplayRect, image: Dimensions) -> Option<Point> {
    if !rect.is_laid_out() || image.is_empty() || !point.is_finite() {
        return None;
    }
    let scale_x = rect.width / f64::from(image.width);
    let scale_y = rect.height / f64::from(image.height);
    Some(Point::new(
        point.x.mul_add(scale_x, rect.left),
        point.y.mul_add(scale_y, rect.top),
    ))
}

/// Returns `true` if `point` lies within `[0, width) × [0, height)`.
#[must_use]
pub fn contains(image: Dimensions, point: Point) -> bool {
    point.is_finite()
        && point.x >= 0.0
        && point.y >= 0.0
        && point.x < f64::from(image.width)
        && point.y < f64::from(image.height)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const IMAGE: Dimensions = Dimensions::new(1000, 500);

    fn approx_eq(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn half_size_surface_doubles_coordinates() {
        let rect = DisplayRect::new(0.0, 0.0, 500.0, 250.0);
        let p = to_image_space(Point::new(100.0, 50.0), rect, IMAGE).unwrap();
        assert!(approx_eq(p, Point::new(200.0, 100.0)), "got {p:?}");
    }

    #[test]
    fn rect_origin_is_subtracted() {
        let rect = DisplayRect::new(40.0, 30.0, 1000.0, 500.0);
        let p = to_image_space(Point::new(40.0, 30.0), rect, IMAGE).unwrap();
        assert!(approx_eq(p, Point::new(0.0, 0.0)), "got {p:?}");
    }

    #[test]
    fn display_space_inverts_image_space() {
        let rect = DisplayRect::new(12.5, 7.0, 333.0, 111.0);
        let pointer = Point::new(100.25, 64.5);
        let image = to_image_space(pointer, rect, IMAGE).unwrap();
        let back = to_display_space(image, rect, IMAGE).unwrap();
        assert!(approx_eq(back, pointer), "got {back:?}");
    }

    #[test]
    fn non_uniform_scale_is_per_axis() {
        let rect = DisplayRect::at_origin(100.0, 100.0);
        let p = to_display_space(Point::new(500.0, 250.0), rect, IMAGE).unwrap();
        assert!(approx_eq(p, Point::new(50.0, 50.0)), "got {p:?}");
    }

    #[test]
    fn unlaid_out_surface_is_unavailable() {
        let rect = DisplayRect::at_origin(0.0, 0.0);
        assert_eq!(to_image_space(Point::new(1.0, 1.0), rect, IMAGE), None);
        assert_eq!(to_display_space(Point::new(1.0, 1.0), rect, IMAGE), None);
    }

    #[test]
    fn empty_image_is_unavailable() {
        let rect = DisplayRect::at_origin(100.0, 100.0);
        let empty = Dimensions::new(0, 10);
        assert_eq!(to_image_space(Point::new(1.0, 1.0), rect, empty), None);
        assert_eq!(to_display_space(Point::new(1.0, 1.0), rect, empty), None);
    }

    #[test]
    fn contains_is_half_open() {
        assert!(contains(IMAGE, Point::new(0.0, 0.0)));
        assert!(contains(IMAGE, Point::new(999.9, 499.9)));
        assert!(!contains(IMAGE, Point::new(1000.0, 10.0)));
        assert!(!contains(IMAGE, Point::new(-0.1, 10.0)));
        assert!(!contains(IMAGE, Point::new(f64::NAN, 10.0)));
    }
}
