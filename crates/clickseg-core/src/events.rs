//! Notifications emitted by a [`Segmenter`](crate::Segmenter).

use crate::history::ClickHistory;
use crate::types::{Dimensions, ErrorKind, Mask};

/// A state change observable by the embedding caller.
///
/// Each event fires at most once per transition. Listeners run
/// synchronously, in subscription order, with no internal borrows held,
/// so a listener may query the segmenter it is subscribed to.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmenterEvent {
    /// The engine finished initializing.
    Initialized,
    /// A new image epoch began.
    ImageLoaded(Dimensions),
    /// The click history changed.
    ClicksUpdated(ClickHistory),
    /// The displayed mask changed; `None` means no selection.
    MaskUpdated(Option<Mask>),
    /// An operation failed.
    Error {
        /// Taxonomy category.
        kind: ErrorKind,
        /// Human-readable description.
        message: String,
    },
}

impl SegmenterEvent {
    /// Short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::ImageLoaded(_) => "image-loaded",
            Self::ClicksUpdated(_) => "clicks-updated",
            Self::MaskUpdated(_) => "mask-updated",
            Self::Error { .. } => "error",
        }
    }
}
