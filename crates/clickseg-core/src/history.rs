//! Ordered click history for one image epoch.
//!
//! A [`ClickHistory`] is an immutable snapshot: every mutation returns a
//! new history and leaves the previous one valid for any consumer still
//! holding it (an in-flight recompute, a listener, the caller's undo
//! stack). Snapshots share their storage, so cloning is cheap.

use std::sync::Arc;

use crate::coords;
use crate::types::{Click, Dimensions, EpochId, SegmenterError};

/// The ordered clicks sent to the engine for one image.
///
/// Insertion order is interaction order and is replayed in that order
/// whenever the engine session has to be rebuilt.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickHistory {
    epoch: EpochId,
    clicks: Arc<[Click]>,
}

impl ClickHistory {
    /// An empty history for the given epoch.
    #[must_use]
    pub fn new(epoch: EpochId) -> Self {
        Self {
            epoch,
            clicks: Arc::from([]),
        }
    }

    /// The epoch this history belongs to.
    #[must_use]
    pub const fn epoch(&self) -> EpochId {
        self.epoch
    }

    /// All clicks in interaction order.
    #[must_use]
    pub fn clicks(&self) -> &[Click] {
        &self.clicks
    }

    /// Number of clicks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clicks.len()
    }

    /// Returns `true` if there are no clicks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clicks.is_empty()
    }

    /// The most recent click, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Click> {
        self.clicks.last()
    }

    /// Returns `true` if `other` was recorded against the same image.
    #[must_use]
    pub fn is_same_epoch(&self, other: &Self) -> bool {
        self.epoch == other.epoch
    }

    /// A new history with `click` appended.
    #[must_use = "histories are immutable; use the returned history"]
    pub fn append(&self, click: Click) -> Self {
        let mut clicks = Vec::with_capacity(self.clicks.len() + 1);
        clicks.extend_from_slice(&self.clicks);
        clicks.push(click);
        self.with_clicks(clicks)
    }

    /// A new history without the most recent click.
    ///
    /// An empty history stays empty.
    #[must_use = "histories are immutable; use the returned history"]
    pub fn remove_last(&self) -> Self {
        match self.clicks.split_last() {
            Some((_, rest)) => self.with_clicks(rest.to_vec()),
            None => self.clone(),
        }
    }

    /// An empty history for the same epoch.
    #[must_use = "histories are immutable; use the returned history"]
    pub fn clear(&self) -> Self {
        Self::new(self.epoch)
    }

    /// A new history containing exactly `clicks`.
    ///
    /// # Errors
    ///
    /// Returns [`SegmenterError::InvalidClickSpace`] if any click has a
    /// non-finite coordinate or lies outside `bounds`, the native size
    /// of this epoch's image.
    pub fn replace_all(&self, clicks: &[Click], bounds: Dimensions) -> Result<Self, SegmenterError> {
        if let Some((index, click)) = clicks
            .iter()
            .enumerate()
            .find(|(_, c)| !coords::contains(bounds, c.position()))
        {
            return Err(SegmenterError::InvalidClickSpace(format!(
                "click {index} at ({}, {}) is outside the {}x{} image",
                click.x, click.y, bounds.width, bounds.height,
            )));
        }
        Ok(self.with_clicks(clicks.to_vec()))
    }

    fn with_clicks(&self, clicks: Vec<Click>) -> Self {
        Self {
            epoch: self.epoch,
            clicks: Arc::from(clicks),
        }
    }
}
