//! clickseg-core: Interactive click-driven segmentation (sans-IO).
//!
//! The user places include/exclude clicks on an image; an external
//! inference engine turns the click history into a mask; this crate
//! keeps the two consistent and renders the result:
//!
//! pointer -> image-space click -> history -> session adapter ->
//! engine mask -> overlay / cut-out / bounds.
//!
//! This crate has **no I/O dependencies**: the engine is reached
//! through the traits in [`engine`], images arrive as bytes or rasters,
//! and results are in-memory rasters. Encoding lives in
//! `clickseg-export`; browser interaction lives in `clickseg-io`.

pub mod adapter;
pub mod compositor;
pub mod config;
pub mod controller;
pub mod coords;
pub mod engine;
pub mod events;
pub mod history;
pub mod markers;
pub mod source;
pub mod types;

pub use adapter::{Recompute, Replay, SessionAdapter};
pub use compositor::CutoutOptions;
pub use config::{ConfigError, SegmenterConfig};
pub use controller::{ListenerId, Segmenter};
pub use engine::{EngineSession, SegmentationEngine};
pub use events::SegmenterEvent;
pub use history::ClickHistory;
pub use markers::Marker;
pub use source::ImageSource;
pub use types::{
    Bounds, Click, ClickType, Dimensions, DisplayRect, EngineError, EpochId, ErrorKind,
    GrayImage, LifecycleState, Mask, Overlay, Point, Rgb, RgbaImage, SegmenterError,
};
