//! Presentation and behavior settings for a [`Segmenter`](crate::Segmenter).

use serde::{Deserialize, Serialize};

use crate::types::{ClickType, Rgb};

/// Configuration for the interactive segmenter.
///
/// All fields have defaults, so a JSON document only needs the keys it
/// wants to change:
///
/// ```
/// # use clickseg_core::SegmenterConfig;
/// let config: SegmenterConfig =
///     serde_json::from_str(r##"{ "overlay_color": "#ff0000", "show_markers": false }"##).unwrap();
/// assert!(!config.show_markers);
/// assert_eq!(config.marker_size, SegmenterConfig::DEFAULT_MARKER_SIZE);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Opacity applied to the overlay when compositing a preview.
    ///
    /// Must be within `0.0..=1.0`.
    pub overlay_opacity: f32,

    /// Color of the mask overlay.
    pub overlay_color: Rgb,

    /// Marker color for include clicks.
    pub include_color: Rgb,

    /// Marker color for exclude clicks.
    pub exclude_color: Rgb,

    /// Whether click markers are laid out at all.
    pub show_markers: bool,

    /// Marker diameter in display pixels. Must be positive.
    pub marker_size: f64,

    /// Initialize the engine from [`Segmenter::start`](crate::Segmenter::start).
    pub auto_initialize: bool,

    /// Click type used by pointer clicks until changed.
    pub click_mode: ClickType,
}

impl SegmenterConfig {
    /// Default overlay opacity.
    pub const DEFAULT_OVERLAY_OPACITY: f32 = 0.5;
    /// Default overlay color (`#6366f1`).
    pub const DEFAULT_OVERLAY_COLOR: Rgb = Rgb::new(0x63, 0x66, 0xf1);
    /// Default include marker color (`#10b981`).
    pub const DEFAULT_INCLUDE_COLOR: Rgb = Rgb::new(0x10, 0xb9, 0x81);
    /// Default exclude marker color (`#ef4444`).
    pub const DEFAULT_EXCLUDE_COLOR: Rgb = Rgb::new(0xef, 0x44, 0x44);
    /// Default marker diameter.
    pub const DEFAULT_MARKER_SIZE: f64 = 20.0;

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first out-of-range field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.overlay_opacity) {
            return Err(ConfigError::OverlayOpacity(self.overlay_opacity));
        }
        if !(self.marker_size.is_finite() && self.marker_size > 0.0) {
            return Err(ConfigError::MarkerSize(self.marker_size));
        }
        Ok(())
    }

    /// Marker color for the given click type.
    #[must_use]
    pub const fn marker_color(&self, kind: ClickType) -> Rgb {
        match kind {
            ClickType::Include => self.include_color,
            ClickType::Exclude => self.exclude_color,
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            overlay_opacity: Self::DEFAULT_OVERLAY_OPACITY,
            overlay_color: Self::DEFAULT_OVERLAY_COLOR,
            include_color: Self::DEFAULT_INCLUDE_COLOR,
            exclude_color: Self::DEFAULT_EXCLUDE_COLOR,
            show_markers: true,
            marker_size: Self::DEFAULT_MARKER_SIZE,
            auto_initialize: true,
            click_mode: ClickType::Include,
        }
    }
}

/// Out-of-range configuration values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `overlay_opacity` outside `0.0..=1.0` (or NaN).
    #[error("overlay_opacity must be within 0..=1, got {0}")]
    OverlayOpacity(f32),

    /// `marker_size` not a positive finite number.
    #[error("marker_size must be positive, got {0}")]
    MarkerSize(f64),
}
