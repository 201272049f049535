//! Seam to the external inference engine.
//!
//! The neural network itself (model loading, image embedding, mask
//! decoding) lives outside this crate. The core only needs the handful
//! of operations below and treats every asynchronous call as an opaque
//! awaitable. Futures are not required to be `Send`: the controller runs
//! on a single logical thread (typically the browser main thread).

use std::future::Future;

use crate::types::{ClickType, EngineError, Mask, RgbaImage};

/// Process-wide engine entry points.
pub trait SegmentationEngine {
    /// Per-image session handle produced by [`create_session`](Self::create_session).
    type Session: EngineSession;

    /// Load the model and prepare the runtime.
    fn initialize(&self) -> impl Future<Output = Result<(), EngineError>>;

    /// Compute and cache the image embedding that later segmentations
    /// for `image` reuse.
    fn precompute_embedding(&self, image: &RgbaImage)
    -> impl Future<Output = Result<(), EngineError>>;

    /// Create a session bound to `image`.
    ///
    /// Called once per image, after [`precompute_embedding`](Self::precompute_embedding)
    /// succeeded for the same image.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] if the engine cannot allocate a session.
    fn create_session(&self, image: &RgbaImage) -> Result<Self::Session, EngineError>;
}

/// Click-driven segmentation state for one image.
///
/// The session accumulates clicks; [`segment`](Self::segment) decodes a
/// mask for everything added so far. There is no way to jump to an
/// arbitrary history other than [`reset`](Self::reset) followed by a
/// replay.
pub trait EngineSession {
    /// Record a click at native image coordinates.
    fn add_click(&mut self, x: f64, y: f64, kind: ClickType);

    /// Forget the most recent click.
    fn remove_last_click(&mut self);

    /// Forget all clicks.
    fn reset(&mut self);

    /// Compute the mask for the clicks recorded so far.
    fn segment(&mut self, image: &RgbaImage) -> impl Future<Output = Result<Mask, EngineError>>;

    /// Release engine resources held by this session.
    fn dispose(self);
}
