//! An engine that answers every segmentation with a precomputed mask.
//!
//! Useful for exporting results produced elsewhere: the clicks still go
//! through the controller (validation, history, markers) but inference
//! is replaced by a mask file.

use clickseg_core::{
    ClickType, EngineError, EngineSession, GrayImage, Mask, RgbaImage, SegmentationEngine,
};
use image::DynamicImage;

/// Serves a fixed mask.
#[derive(Debug, Clone)]
pub struct ReplayEngine {
    mask: Mask,
}

impl ReplayEngine {
    /// Serve `mask` for every segmentation.
    pub const fn new(mask: Mask) -> Self {
        Self { mask }
    }
}

/// Interpret a decoded mask file.
///
/// Images with an alpha channel use it directly; opaque images are read
/// as grayscale with luma as selection strength.
pub fn mask_from_image(image: DynamicImage) -> Mask {
    if image.color().has_alpha() {
        Mask::from_rgba(image.into_rgba8())
    } else {
        let luma: GrayImage = image.into_luma8();
        Mask::from_alpha(&luma)
    }
}

impl SegmentationEngine for ReplayEngine {
    type Session = ReplaySession;

    async fn initialize(&self) -> Result<(), EngineError> {
        tracing::debug!(
            width = self.mask.width(),
            height = self.mask.height(),
            "replay engine ready"
        );
        Ok(())
    }

    async fn precompute_embedding(&self, _image: &RgbaImage) -> Result<(), EngineError> {
        Ok(())
    }

    fn create_session(&self, _image: &RgbaImage) -> Result<ReplaySession, EngineError> {
        Ok(ReplaySession {
            mask: self.mask.clone(),
            clicks: Vec::new(),
        })
    }
}

/// Session for [`ReplayEngine`].
#[derive(Debug)]
pub struct ReplaySession {
    mask: Mask,
    clicks: Vec<ClickType>,
}

impl EngineSession for ReplaySession {
    fn add_click(&mut self, _x: f64, _y: f64, kind: ClickType) {
        self.clicks.push(kind);
    }

    fn remove_last_click(&mut self) {
        self.clicks.pop();
    }

    fn reset(&mut self) {
        self.clicks.clear();
    }

    /// The stored mask once any include click exists, otherwise nothing.
    async fn segment(&mut self, _image: &RgbaImage) -> Result<Mask, EngineError> {
        if self.clicks.contains(&ClickType::Include) {
            Ok(self.mask.clone())
        } else {
            Ok(Mask::from_rgba(RgbaImage::new(
                self.mask.width(),
                self.mask.height(),
            )))
        }
    }

    fn dispose(self) {}
}
