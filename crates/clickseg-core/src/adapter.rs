//! Segmentation session adapter: one engine session per image epoch.
//!
//! The adapter owns the engine session and keeps it consistent with the
//! click history the controller asks for. Recompute requests are
//! serialized through an async mutex and tagged with a monotonically
//! increasing ticket:
//!
//! - a request that reaches the session after a newer request was made
//!   never touches the engine;
//! - a result that arrives after a newer request was made is discarded.
//!
//! A burst of clicks therefore converges on segmenting the final
//! history, and a slow response can never clobber a newer one.
//! Cancellation is soft: the engine call itself always runs to
//! completion.

use std::cell::Cell;

use futures::lock::Mutex;
use tracing::{debug, error, warn};

use crate::engine::{EngineSession, SegmentationEngine};
use crate::history::ClickHistory;
use crate::types::{Click, Mask, RgbaImage, SegmenterError};

/// How the session is brought in line with the requested history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Replay {
    /// Apply only the difference from what the session already knows.
    #[default]
    Incremental,
    /// Reset the session and replay every click.
    Full,
}

/// Outcome of [`SessionAdapter::recompute`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recompute {
    /// The engine produced a mask with at least one selected pixel.
    Mask(Mask),
    /// The engine ran and selected nothing.
    Empty,
    /// The history is empty; the engine was not asked to segment.
    Cleared,
    /// A newer request exists; this one was skipped or its result dropped.
    Superseded,
}

/// Engine session plus the clicks it has been told about.
struct Live<S> {
    session: S,
    applied: Vec<Click>,
}

impl<S: EngineSession> Live<S> {
    fn sync(&mut self, target: &[Click], replay: Replay) {
        if replay == Replay::Full {
            self.replay(target);
            return;
        }
        if target == self.applied.as_slice() {
            return;
        }
        if target.is_empty() {
            self.session.reset();
            self.applied.clear();
        } else if target.starts_with(&self.applied) {
            for click in &target[self.applied.len()..] {
                self.session.add_click(click.x, click.y, click.kind);
            }
            self.applied.extend_from_slice(&target[self.applied.len()..]);
        } else if self.applied.starts_with(target) {
            for _ in target.len()..self.applied.len() {
                self.session.remove_last_click();
            }
            self.applied.truncate(target.len());
        } else {
            self.replay(target);
        }
    }

    fn replay(&mut self, target: &[Click]) {
        self.session.reset();
        for click in target {
            self.session.add_click(click.x, click.y, click.kind);
        }
        self.applied = target.to_vec();
    }
}

/// Exclusive owner of one engine session.
pub struct SessionAdapter<S: EngineSession> {
    live: Mutex<Option<Live<S>>>,
    latest: Cell<u64>,
    closed: Cell<bool>,
    /// A reset could not run because the session was busy.
    reset_pending: Cell<bool>,
}

impl<S: EngineSession> SessionAdapter<S> {
    /// Wrap an already created session.
    #[must_use]
    pub fn new(session: S) -> Self {
        Self {
            live: Mutex::new(Some(Live {
                session,
                applied: Vec::new(),
            })),
            latest: Cell::new(0),
            closed: Cell::new(false),
            reset_pending: Cell::new(false),
        }
    }

    /// Precompute the embedding for `image` and create its session.
    ///
    /// # Errors
    ///
    /// Returns [`SegmenterError::Embedding`] if either engine call fails.
    #[allow(clippy::future_not_send)] // single-threaded; Send is not needed
    pub async fn open<E>(engine: &E, image: &RgbaImage) -> Result<Self, SegmenterError>
    where
        E: SegmentationEngine<Session = S>,
    {
        engine
            .precompute_embedding(image)
            .await
            .map_err(SegmenterError::Embedding)?;
        let session = engine
            .create_session(image)
            .map_err(SegmenterError::Embedding)?;
        Ok(Self::new(session))
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Bring the session in line with `history` and segment.
    ///
    /// An empty history yields [`Recompute::Cleared`] without asking the
    /// engine to segment; the session itself is reset right away when
    /// idle, or by the next request otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`SegmenterError::SessionClosed`] if the adapter was
    /// closed before the call, and [`SegmenterError::Segmentation`] if
    /// the engine fails on the newest request.
    #[allow(clippy::future_not_send)] // single-threaded; Send is not needed
    pub async fn recompute(
        &self,
        image: &RgbaImage,
        history: &ClickHistory,
        replay: Replay,
    ) -> Result<Recompute, SegmenterError> {
        if self.closed.get() {
            error!(epoch = %history.epoch(), "recompute requested on a closed session");
            return Err(SegmenterError::SessionClosed);
        }
        let ticket = self.next_ticket();

        if history.is_empty() {
            self.sync_if_idle(&[], replay);
            return Ok(Recompute::Cleared);
        }

        let mut guard = self.live.lock().await;
        if self.is_stale(ticket) {
            debug!(ticket, "skipping superseded recompute");
            return Ok(Recompute::Superseded);
        }
        let Some(live) = guard.as_mut() else {
            error!(epoch = %history.epoch(), "session disposed while a recompute was queued");
            return Err(SegmenterError::SessionClosed);
        };
        let replay = if self.reset_pending.replace(false) {
            Replay::Full
        } else {
            replay
        };
        live.sync(history.clicks(), replay);
        debug!(ticket, clicks = history.len(), ?replay, "segmenting");
        let result = live.session.segment(image).await;
        drop(guard);

        if self.is_stale(ticket) {
            debug!(ticket, ok = result.is_ok(), "discarding stale segmentation result");
            return Ok(Recompute::Superseded);
        }
        match result {
            Ok(mask) if mask.is_empty() => Ok(Recompute::Empty),
            Ok(mask) => Ok(Recompute::Mask(mask)),
            Err(e) => Err(SegmenterError::Segmentation(e)),
        }
    }

    /// Supersede any in-flight request and reset the session.
    ///
    /// The reset happens immediately when the session is idle; otherwise
    /// the next recompute replays from scratch.
    pub fn invalidate_and_reset(&self) {
        self.next_ticket();
        self.sync_if_idle(&[], Replay::Full);
    }

    /// Dispose the engine session.
    ///
    /// Waits for an in-flight engine call to settle (its result is
    /// discarded) and disposes exactly once; later calls are no-ops.
    #[allow(clippy::future_not_send)] // single-threaded; Send is not needed
    pub async fn close(&self) {
        self.closed.set(true);
        self.next_ticket();
        let mut guard = self.live.lock().await;
        if let Some(live) = guard.take() {
            live.session.dispose();
            debug!("engine session disposed");
        }
    }

    fn next_ticket(&self) -> u64 {
        let ticket = self.latest.get() + 1;
        self.latest.set(ticket);
        ticket
    }

    fn is_stale(&self, ticket: u64) -> bool {
        self.latest.get() != ticket
    }

    fn sync_if_idle(&self, target: &[Click], replay: Replay) {
        match self.live.try_lock() {
            Some(mut guard) => {
                if let Some(live) = guard.as_mut() {
                    live.sync(target, replay);
                    self.reset_pending.set(false);
                }
            }
            None => {
                debug!(clicks = target.len(), "session busy; next recompute replays from scratch");
                self.reset_pending.set(true);
            }
        }
    }
}

impl<S: EngineSession> Drop for SessionAdapter<S> {
    fn drop(&mut self) {
        if let Some(live) = self.live.get_mut().take() {
            warn!("session adapter dropped without close; disposing session");
            live.session.dispose();
        }
    }
}
