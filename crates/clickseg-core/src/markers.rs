//! Click marker layout in display space.

use crate::config::SegmenterConfig;
use crate::coords;
use crate::types::{Click, ClickType, Dimensions, DisplayRect, Point, Rgb};

/// Alpha of a marker's fill (the stroke color at ~20% opacity).
pub const MARKER_FILL_ALPHA: u8 = 0x33;

/// A circle drawn over the image at a click position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    /// Circle center, in the frame of the rect passed to [`layout_markers`].
    pub center: Point,
    /// Circle diameter in display pixels.
    pub diameter: f64,
    /// Ring color.
    pub stroke: Rgb,
    /// Fill alpha; the fill color is `stroke`.
    pub fill_alpha: u8,
    /// The click this marker represents.
    pub kind: ClickType,
}

impl Marker {
    /// Circle radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }
}

/// Place one marker per click.
///
/// Returns nothing when markers are hidden or the surface has no usable
/// size yet. Pass [`DisplayRect::at_origin`] for surface-local positions.
#[must_use]
pub fn layout_markers(
    clicks: &[Click],
    rect: DisplayRect,
    image: Dimensions,
    config: &SegmenterConfig,
) -> Vec<Marker> {
    if !config.show_markers {
        return Vec::new();
    }
    clicks
        .iter()
        .filter_map(|click| {
            let center = coords::to_display_space(click.position(), rect, image)?;
            Some(Marker {
                center,
                diameter: config.marker_size,
                stroke: config.marker_color(click.kind),
                fill_alpha: MARKER_FILL_ALPHA,
                kind: click.kind,
            })
        })
        .collect()
}
