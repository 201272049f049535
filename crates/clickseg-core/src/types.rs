//! Shared types for the clickseg segmentation core.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can reference decoded
/// images and masks without depending on `image` directly.
pub use image::RgbaImage;

/// Re-export `GrayImage` for engines that produce alpha-only masks.
pub use image::GrayImage;

/// A 2D point, used for both native image pixels and display-surface
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns `true` if both coordinates are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of an RGBA raster.
    #[must_use]
    pub fn of(image: &RgbaImage) -> Self {
        Self::new(image.width(), image.height())
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Geometric center of the image in pixel coordinates.
    #[must_use]
    pub fn center(self) -> Point {
        Point::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }
}

/// Where the image surface is laid out on screen, in display pixels.
///
/// Mirrors a bounding client rect: `left`/`top` locate the surface's
/// origin in the same frame as pointer events, `width`/`height` give
/// its laid-out (possibly scaled) size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayRect {
    /// Horizontal offset of the surface origin.
    pub left: f64,
    /// Vertical offset of the surface origin.
    pub top: f64,
    /// Laid-out width.
    pub width: f64,
    /// Laid-out height.
    pub height: f64,
}

impl DisplayRect {
    /// Create a new display rect.
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// A rect of the given size whose origin is the surface itself.
    ///
    /// Use this to compute positions local to the surface (e.g. for
    /// absolutely positioned click markers).
    #[must_use]
    pub const fn at_origin(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Returns `true` if the rect has a usable (positive, finite) size.
    #[must_use]
    pub fn is_laid_out(&self) -> bool {
        self.width.is_finite()
            && self.height.is_finite()
            && self.left.is_finite()
            && self.top.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// Whether a click adds to or subtracts from the selected object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickType {
    /// Foreground click: this pixel belongs to the object.
    #[default]
    Include,
    /// Background click: this pixel does not belong to the object.
    Exclude,
}

impl ClickType {
    /// Lowercase label used in serialized form and CLI arguments.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Exclude => "exclude",
        }
    }
}

impl fmt::Display for ClickType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ClickType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "include" | "+" | "fg" => Ok(Self::Include),
            "exclude" | "-" | "bg" => Ok(Self::Exclude),
            other => Err(format!("unknown click type: {other:?}")),
        }
    }
}

/// A single user click in native image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Click {
    /// Horizontal position in image pixels.
    pub x: f64,
    /// Vertical position in image pixels.
    pub y: f64,
    /// Include or exclude.
    #[serde(rename = "type")]
    pub kind: ClickType,
}

impl Click {
    /// Create a new click.
    #[must_use]
    pub const fn new(x: f64, y: f64, kind: ClickType) -> Self {
        Self { x, y, kind }
    }

    /// Create an include click.
    #[must_use]
    pub const fn include(x: f64, y: f64) -> Self {
        Self::new(x, y, ClickType::Include)
    }

    /// Create an exclude click.
    #[must_use]
    pub const fn exclude(x: f64, y: f64) -> Self {
        Self::new(x, y, ClickType::Exclude)
    }

    /// The click position as a point.
    #[must_use]
    pub const fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// An RGB color.
///
/// Serialized as a CSS hex string (`"#6366f1"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// Create a color from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// Red channel.
    #[must_use]
    pub const fn r(self) -> u8 {
        self.0[0]
    }

    /// Green channel.
    #[must_use]
    pub const fn g(self) -> u8 {
        self.0[1]
    }

    /// Blue channel.
    #[must_use]
    pub const fn b(self) -> u8 {
        self.0[2]
    }

    /// Parse a CSS hex color string (e.g. `"#1a1a1a"` or `" #fff "`).
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the string is not a
    /// `#rgb` or `#rrggbb` color.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let s = s.trim();
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("not a hex color: {s:?}"))?;
        match hex.len() {
            3 => {
                // Short form: #rgb → #rrggbb
                let mut rgb = [0u8; 3];
                for (i, ch) in hex.chars().enumerate() {
                    let n = ch
                        .to_digit(16)
                        .ok_or_else(|| format!("invalid hex char: {ch}"))?;
                    #[expect(clippy::cast_possible_truncation)]
                    {
                        rgb[i] = (n * 17) as u8;
                    }
                }
                Ok(Self(rgb))
            }
            // `from_str_radix` alone would accept a leading sign.
            6 if hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
                let n = u32::from_str_radix(hex, 16)
                    .map_err(|_| format!("invalid hex color: {s:?}"))?;
                let [_, r, g, b] = n.to_be_bytes();
                Ok(Self([r, g, b]))
            }
            6 => Err(format!("invalid hex color: {s:?}")),
            _ => Err(format!("unexpected hex length: {s:?}")),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r(), self.g(), self.b())
    }
}

impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Raw per-pixel segmentation output.
///
/// A pixel is selected when its alpha channel is nonzero; partial alpha
/// marks soft edges. The mask may have a different resolution from the
/// image it was computed for. Masks are immutable and cheap to clone:
/// every segmentation produces a brand-new `Mask`.
#[derive(Debug, Clone)]
pub struct Mask(Arc<RgbaImage>);

impl Mask {
    /// Wrap an RGBA raster as a mask.
    #[must_use]
    pub fn from_rgba(raster: RgbaImage) -> Self {
        Self(Arc::new(raster))
    }

    /// Build a mask from an alpha-only raster.
    ///
    /// Each luma value becomes the alpha of a white pixel.
    #[must_use]
    pub fn from_alpha(alpha: &GrayImage) -> Self {
        let raster = RgbaImage::from_fn(alpha.width(), alpha.height(), |x, y| {
            image::Rgba([255, 255, 255, alpha.get_pixel(x, y).0[0]])
        });
        Self::from_rgba(raster)
    }

    /// Mask width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Mask height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Mask dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.0)
    }

    /// Alpha value at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        self.0.get_pixel_checked(x, y).map(|p| p.0[3])
    }

    /// Returns `true` if no pixel is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.pixels().all(|p| p.0[3] == 0)
    }

    /// The underlying RGBA raster.
    #[must_use]
    pub fn as_rgba(&self) -> &RgbaImage {
        &self.0
    }

    /// Returns `true` if both handles share the same raster allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Mask {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.0.dimensions() == other.0.dimensions() && self.0.as_raw() == other.0.as_raw())
    }
}

/// A colorized rendering of a [`Mask`] at the mask's own resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay(RgbaImage);

impl Overlay {
    pub(crate) const fn new(raster: RgbaImage) -> Self {
        Self(raster)
    }

    /// The overlay raster.
    #[must_use]
    pub const fn as_rgba(&self) -> &RgbaImage {
        &self.0
    }

    /// Consumes the overlay and returns its raster.
    #[must_use]
    pub fn into_rgba(self) -> RgbaImage {
        self.0
    }
}

/// Axis-aligned bounding box of selected pixels, with inclusive
/// `right`/`bottom` edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Leftmost selected column.
    pub left: u32,
    /// Topmost selected row.
    pub top: u32,
    /// Rightmost selected column.
    pub right: u32,
    /// Bottommost selected row.
    pub bottom: u32,
    /// `right - left + 1`.
    pub width: u32,
    /// `bottom - top + 1`.
    pub height: u32,
}

impl Bounds {
    /// Build bounds from inclusive edges.
    #[must_use]
    pub const fn from_edges(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            width: right - left + 1,
            height: bottom - top + 1,
        }
    }

    /// Grow by `padding` on every side, clamped to `limits`.
    #[must_use]
    pub fn expand(self, padding: u32, limits: Dimensions) -> Self {
        Self::from_edges(
            self.left.saturating_sub(padding),
            self.top.saturating_sub(padding),
            self.right
                .saturating_add(padding)
                .min(limits.width.saturating_sub(1)),
            self.bottom
                .saturating_add(padding)
                .min(limits.height.saturating_sub(1)),
        )
    }
}

/// Identifier of one image epoch (one loaded image and its session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpochId(pub(crate) u64);

impl EpochId {
    /// The numeric value, for logging.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EpochId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch-{}", self.0)
    }
}

/// Lifecycle of a [`Segmenter`](crate::Segmenter).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// The engine has not been initialized.
    #[default]
    Uninitialized,
    /// Engine initialization is in progress.
    Initializing,
    /// The engine is ready; no image is loaded.
    Ready,
    /// An image is being decoded and embedded.
    LoadingImage,
    /// An image is loaded and no segmentation is in flight.
    ImageReady,
    /// At least one segmentation is in flight.
    Segmenting,
    /// The last transition failed.
    Error,
}

/// Error returned by the inference engine collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    /// Create an engine error from any displayable message.
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    /// The engine's error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Category of a [`SegmenterError`], as reported through error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The engine failed to initialize.
    EngineInit,
    /// The image source was bad or could not be decoded.
    ImageLoad,
    /// Embedding precomputation failed.
    Embedding,
    /// The engine failed to segment after clicks were recorded.
    Segmentation,
    /// An operation was attempted on a disposed session.
    SessionClosed,
    /// Clicks were supplied that do not belong to the current image.
    InvalidClickSpace,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EngineInit => "EngineInitError",
            Self::ImageLoad => "ImageLoadError",
            Self::Embedding => "EmbeddingError",
            Self::Segmentation => "SegmentationError",
            Self::SessionClosed => "SessionClosed",
            Self::InvalidClickSpace => "InvalidClickSpace",
        })
    }
}

/// Errors that can occur while driving a segmentation session.
#[derive(Debug, thiserror::Error)]
pub enum SegmenterError {
    /// The engine failed to initialize.
    #[error("engine initialization failed: {0}")]
    EngineInit(#[source] EngineError),

    /// The image source was empty.
    #[error("image source is empty")]
    EmptyImage,

    /// The image bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Embedding precomputation or session creation failed.
    #[error("embedding precomputation failed: {0}")]
    Embedding(#[source] EngineError),

    /// The engine failed to produce a mask.
    #[error("segmentation failed: {0}")]
    Segmentation(#[source] EngineError),

    /// The session was already disposed.
    #[error("segmentation session is closed")]
    SessionClosed,

    /// Clicks do not belong to the current image's coordinate space.
    #[error("invalid click space: {0}")]
    InvalidClickSpace(String),
}

impl SegmenterError {
    /// The taxonomy category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EngineInit(_) => ErrorKind::EngineInit,
            Self::EmptyImage | Self::ImageDecode(_) => ErrorKind::ImageLoad,
            Self::Embedding(_) => ErrorKind::Embedding,
            Self::Segmentation(_) => ErrorKind::Segmentation,
            Self::SessionClosed => ErrorKind::SessionClosed,
            Self::InvalidClickSpace(_) => ErrorKind::InvalidClickSpace,
        }
    }

    /// Returns `true` for programmer-contract violations that should
    /// never occur in a correct caller.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self, Self::SessionClosed | Self::InvalidClickSpace(_))
    }
}
