//! The interactive segmenter: lifecycle, clicks, and render state.
//!
//! [`Segmenter`] ties the other modules together. It owns the engine,
//! the current image epoch (image, session, history, mask), and the
//! listeners that observe it. Every operation is an explicit call; there
//! are no implicit watchers.
//!
//! The segmenter runs on a single logical thread. Async operations may
//! be driven concurrently (e.g. several clicks in flight); the session
//! adapter serializes engine access and discards superseded results, and
//! results computed for a replaced image are dropped here.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use futures::lock::Mutex;
use tracing::{debug, error, warn};

use crate::adapter::{Recompute, Replay, SessionAdapter};
use crate::compositor::{self, CutoutOptions};
use crate::config::{ConfigError, SegmenterConfig};
use crate::coords;
use crate::engine::{EngineSession, SegmentationEngine};
use crate::events::SegmenterEvent;
use crate::history::ClickHistory;
use crate::markers::{self, Marker};
use crate::source::ImageSource;
use crate::types::{
    Click, ClickType, Dimensions, DisplayRect, EngineError, EpochId, LifecycleState, Mask,
    Overlay, Point, RgbaImage, SegmenterError,
};

type Listener = Rc<RefCell<dyn FnMut(&SegmenterEvent)>>;

/// Handle returned by [`Segmenter::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// One loaded image and everything derived from it.
struct Epoch<S: EngineSession> {
    id: EpochId,
    image: Arc<RgbaImage>,
    adapter: SessionAdapter<S>,
    history: RefCell<ClickHistory>,
    mask: RefCell<Option<Mask>>,
    in_flight: Cell<usize>,
}

impl<S: EngineSession> Epoch<S> {
    fn new(id: EpochId, image: RgbaImage, adapter: SessionAdapter<S>) -> Self {
        Self {
            id,
            image: Arc::new(image),
            adapter,
            history: RefCell::new(ClickHistory::new(id)),
            mask: RefCell::new(None),
            in_flight: Cell::new(0),
        }
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.image)
    }
}

type EpochOf<E> = Rc<Epoch<<E as SegmentationEngine>::Session>>;

/// Interactive click-driven segmenter for one image at a time.
///
/// ```
/// # use clickseg_core::{Segmenter, SegmenterConfig};
/// # fn demo<E: clickseg_core::SegmentationEngine>(engine: E) -> Result<(), Box<dyn std::error::Error>> {
/// let segmenter = Segmenter::new(engine, SegmenterConfig::default())?;
/// segmenter.subscribe(|event| println!("{}", event.name()));
/// # Ok(())
/// # }
/// ```
pub struct Segmenter<E: SegmentationEngine> {
    engine: E,
    config: RefCell<SegmenterConfig>,
    state: Cell<LifecycleState>,
    click_mode: Cell<ClickType>,

    initialized: Cell<bool>,
    initializing: Cell<bool>,
    init_lock: Mutex<()>,
    init_attempts: Cell<u64>,
    init_error: RefCell<Option<EngineError>>,

    epoch: RefCell<Option<EpochOf<E>>>,
    next_epoch: Cell<u64>,
    load_ticket: Cell<u64>,
    loading: Cell<usize>,
    pending_reset: Cell<bool>,
    torn_down: Cell<bool>,

    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_listener: Cell<u64>,
    dispatching: Cell<bool>,
    queued: RefCell<VecDeque<SegmenterEvent>>,
}

#[allow(clippy::future_not_send)] // single-threaded; Send is not needed
impl<E: SegmentationEngine> Segmenter<E> {
    /// Create a segmenter around `engine`.
    ///
    /// Nothing is initialized yet; call [`start`](Self::start) or
    /// [`initialize`](Self::initialize).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation.
    pub fn new(engine: E, config: SegmenterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            engine,
            click_mode: Cell::new(config.click_mode),
            config: RefCell::new(config),
            state: Cell::new(LifecycleState::Uninitialized),
            initialized: Cell::new(false),
            initializing: Cell::new(false),
            init_lock: Mutex::new(()),
            init_attempts: Cell::new(0),
            init_error: RefCell::new(None),
            epoch: RefCell::new(None),
            next_epoch: Cell::new(1),
            load_ticket: Cell::new(0),
            loading: Cell::new(0),
            pending_reset: Cell::new(false),
            torn_down: Cell::new(false),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
            dispatching: Cell::new(false),
            queued: RefCell::new(VecDeque::new()),
        })
    }

    /// Register a listener for [`SegmenterEvent`]s.
    ///
    /// Listeners run synchronously when an event fires and may call
    /// back into the segmenter. Events raised by such a call are queued
    /// and delivered, in order, once every listener has seen the current
    /// event.
    pub fn subscribe(&self, listener: impl FnMut(&SegmenterEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        let listener: Listener = Rc::new(RefCell::new(listener));
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(other, _)| *other != id);
        listeners.len() != before
    }

    /// Initialize the engine if `auto_initialize` is set.
    ///
    /// # Errors
    ///
    /// See [`initialize`](Self::initialize).
    pub async fn start(&self) -> Result<(), SegmenterError> {
        if self.config.borrow().auto_initialize {
            self.initialize().await
        } else {
            Ok(())
        }
    }

    /// Initialize the engine.
    ///
    /// Idempotent: once initialized, further calls return immediately.
    /// Concurrent callers share a single engine initialization and its
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SegmenterError::EngineInit`] if the engine fails, and
    /// [`SegmenterError::SessionClosed`] after [`teardown`](Self::teardown).
    pub async fn initialize(&self) -> Result<(), SegmenterError> {
        self.ensure_live()?;
        if self.initialized.get() {
            return Ok(());
        }
        let attempt = self.init_attempts.get();
        let guard = self.init_lock.lock().await;
        if self.initialized.get() {
            return Ok(());
        }
        if self.init_attempts.get() != attempt {
            // A concurrent attempt failed while this caller waited; it
            // already reported the error.
            if let Some(e) = self.init_error.borrow().clone() {
                return Err(SegmenterError::EngineInit(e));
            }
        }
        self.initializing.set(true);
        self.state.set(LifecycleState::Initializing);
        debug!("initializing engine");

        let result = self.engine.initialize().await;
        self.initializing.set(false);
        drop(guard);

        match result {
            Ok(()) => {
                self.initialized.set(true);
                self.init_error.replace(None);
                self.state.set(self.resting_state());
                debug!("engine initialized");
                self.emit(&SegmenterEvent::Initialized);
                self.apply_deferred_reset();
                Ok(())
            }
            Err(e) => {
                self.init_attempts.set(attempt + 1);
                self.init_error.replace(Some(e.clone()));
                let err = self.fail(SegmenterError::EngineInit(e));
                self.apply_deferred_reset();
                Err(err)
            }
        }
    }

    /// Load a new image and begin a new epoch.
    ///
    /// Initializes the engine first when needed. On success the previous
    /// epoch's session is closed and its clicks and mask are cleared
    /// (with notifications only for what was non-empty). On failure the
    /// previous epoch stays current and displayed.
    ///
    /// When loads overlap, only the newest installs its epoch. An older
    /// load that finishes later closes its own session and returns
    /// `Ok(None)`; its failure, if any, is logged and not reported.
    ///
    /// # Errors
    ///
    /// Returns [`SegmenterError::EmptyImage`] or
    /// [`SegmenterError::ImageDecode`] for a bad source,
    /// [`SegmenterError::Embedding`] if the engine cannot embed the image,
    /// and any error from [`initialize`](Self::initialize).
    pub async fn load_image(
        &self,
        source: impl Into<ImageSource>,
    ) -> Result<Option<Dimensions>, SegmenterError> {
        self.ensure_live()?;
        if !self.initialized.get() {
            self.initialize().await?;
        }

        let ticket = self.load_ticket.get() + 1;
        self.load_ticket.set(ticket);
        self.loading.set(self.loading.get() + 1);
        self.state.set(LifecycleState::LoadingImage);
        debug!(ticket, "loading image");

        let opened = self.open_epoch(source.into()).await;
        self.loading.set(self.loading.get() - 1);
        let superseded = self.load_ticket.get() != ticket;

        let (image, adapter) = match opened {
            Ok(opened) => opened,
            Err(e) if superseded => {
                debug!(ticket, error = %e, "superseded image load failed");
                self.settle_after_superseded_load();
                return Ok(None);
            }
            Err(e) => {
                let err = self.fail(e);
                self.apply_deferred_reset();
                return Err(err);
            }
        };

        if superseded {
            debug!(ticket, "discarding superseded image load");
            adapter.close().await;
            self.settle_after_superseded_load();
            return Ok(None);
        }

        let id = EpochId(self.next_epoch.get());
        self.next_epoch.set(id.0 + 1);
        let epoch = Rc::new(Epoch::new(id, image, adapter));
        let dimensions = epoch.dimensions();
        let cleared_history = epoch.history.borrow().clone();
        let previous = self.epoch.replace(Some(epoch));

        let (had_clicks, had_mask) = previous.as_ref().map_or((false, false), |prev| {
            (
                !prev.history.borrow().is_empty(),
                prev.mask.borrow().is_some(),
            )
        });
        self.state.set(self.resting_state());
        debug!(epoch = %id, width = dimensions.width, height = dimensions.height, "image loaded");

        self.emit(&SegmenterEvent::ImageLoaded(dimensions));
        if had_clicks {
            self.emit(&SegmenterEvent::ClicksUpdated(cleared_history));
        }
        if had_mask {
            self.emit(&SegmenterEvent::MaskUpdated(None));
        }
        if let Some(previous) = previous {
            debug!(epoch = %previous.id, "closing previous session");
            previous.adapter.close().await;
        }
        self.apply_deferred_reset();
        Ok(Some(dimensions))
    }

    /// Place a click at a pointer position on the display surface.
    ///
    /// The click type is the current [`click_mode`](Self::click_mode).
    /// Ignored (with a warning) while initializing or loading, when no
    /// image is loaded, when the surface has no usable size, or when the
    /// pointer lies outside the image.
    ///
    /// # Errors
    ///
    /// Returns [`SegmenterError::Segmentation`] if the engine fails. The
    /// click is kept in the history regardless.
    pub async fn click(&self, pointer: Point, rect: DisplayRect) -> Result<(), SegmenterError> {
        let Some(epoch) = self.interactive_epoch("click")? else {
            return Ok(());
        };
        let dimensions = epoch.dimensions();
        let Some(position) = coords::to_image_space(pointer, rect, dimensions)
            .filter(|p| coords::contains(dimensions, *p))
        else {
            warn!(x = pointer.x, y = pointer.y, ?rect, "ignoring click outside the image");
            return Ok(());
        };
        let click = Click::new(position.x, position.y, self.click_mode.get());
        self.push_click(epoch, click).await
    }

    /// Append a click given in native image coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`SegmenterError::InvalidClickSpace`] if the click lies
    /// outside the current image, and [`SegmenterError::Segmentation`]
    /// if the engine fails.
    pub async fn add_click(&self, click: Click) -> Result<(), SegmenterError> {
        let Some(epoch) = self.interactive_epoch("add_click")? else {
            return Ok(());
        };
        let dimensions = epoch.dimensions();
        if !coords::contains(dimensions, click.position()) {
            return Err(self.fail(SegmenterError::InvalidClickSpace(format!(
                "click at ({}, {}) is outside the {}x{} image",
                click.x, click.y, dimensions.width, dimensions.height,
            ))));
        }
        self.push_click(epoch, click).await
    }

    /// Remove the most recent click and re-segment.
    ///
    /// A no-op (no events) when the history is empty. When the last
    /// click is removed the mask is cleared without calling the engine.
    ///
    /// # Errors
    ///
    /// Returns [`SegmenterError::Segmentation`] if the engine fails.
    pub async fn undo(&self) -> Result<(), SegmenterError> {
        let Some(epoch) = self.interactive_epoch("undo")? else {
            return Ok(());
        };
        let history = {
            let current = epoch.history.borrow();
            if current.is_empty() {
                return Ok(());
            }
            current.remove_last()
        };
        self.commit_history(&epoch, history.clone());
        self.recompute(epoch, history, Replay::Incremental).await
    }

    /// Clear all clicks and the mask, and reset the engine session.
    ///
    /// Deferred until the operation settles while initializing or
    /// loading. Notifications fire only for what actually changed, so
    /// repeated resets are indistinguishable from one.
    pub fn reset(&self) {
        if self.torn_down.get() {
            return;
        }
        if self.initializing.get() || self.loading.get() > 0 {
            debug!("deferring reset until the current operation settles");
            self.pending_reset.set(true);
            return;
        }
        self.apply_reset();
    }

    /// Set the click type used by [`click`](Self::click).
    pub fn set_click_mode(&self, mode: ClickType) {
        self.click_mode.set(mode);
    }

    /// The click type used by [`click`](Self::click).
    #[must_use]
    pub fn click_mode(&self) -> ClickType {
        self.click_mode.get()
    }

    /// Replace the whole history with `clicks` and segment from scratch.
    ///
    /// # Errors
    ///
    /// Returns [`SegmenterError::InvalidClickSpace`] if any click lies
    /// outside the current image, and [`SegmenterError::Segmentation`]
    /// if the engine fails.
    pub async fn segment_with_clicks(&self, clicks: &[Click]) -> Result<(), SegmenterError> {
        let Some(epoch) = self.interactive_epoch("segment_with_clicks")? else {
            return Ok(());
        };
        let replaced = epoch
            .history
            .borrow()
            .replace_all(clicks, epoch.dimensions());
        let history = replaced.map_err(|e| self.fail(e))?;
        self.commit_history(&epoch, history.clone());
        self.recompute(epoch, history, Replay::Full).await
    }

    /// Restore a history snapshot taken earlier for the current image.
    ///
    /// # Errors
    ///
    /// Returns [`SegmenterError::InvalidClickSpace`] if the snapshot was
    /// taken for a different image, plus the errors of
    /// [`segment_with_clicks`](Self::segment_with_clicks).
    pub async fn restore_history(&self, snapshot: &ClickHistory) -> Result<(), SegmenterError> {
        let Some(epoch) = self.interactive_epoch("restore_history")? else {
            return Ok(());
        };
        let same_epoch = epoch.history.borrow().is_same_epoch(snapshot);
        if !same_epoch {
            return Err(self.fail(SegmenterError::InvalidClickSpace(format!(
                "history from {} cannot be restored into {}",
                snapshot.epoch(),
                epoch.id,
            ))));
        }
        self.segment_with_clicks(snapshot.clicks()).await
    }

    /// Re-run segmentation for the current history, replaying every click.
    ///
    /// Useful as a retry after a segmentation error.
    ///
    /// # Errors
    ///
    /// Returns [`SegmenterError::Segmentation`] if the engine fails.
    pub async fn resegment(&self) -> Result<(), SegmenterError> {
        let Some(epoch) = self.interactive_epoch("resegment")? else {
            return Ok(());
        };
        let history = epoch.history.borrow().clone();
        self.recompute(epoch, history, Replay::Full).await
    }

    /// Segment "everything" by placing a single include click at the
    /// image center.
    ///
    /// This approximates automatic segmentation; it does not enumerate
    /// objects.
    ///
    /// # Errors
    ///
    /// See [`segment_with_clicks`](Self::segment_with_clicks).
    pub async fn segment_everything(&self) -> Result<(), SegmenterError> {
        let Some(epoch) = self.interactive_epoch("segment_everything")? else {
            return Ok(());
        };
        let center = epoch.dimensions().center();
        debug!(epoch = %epoch.id, "segment everything: center click");
        self.segment_with_clicks(&[Click::include(center.x, center.y)])
            .await
    }

    /// The current image cut out by the current mask, or `None` when
    /// there is no mask.
    #[must_use]
    pub fn extract_mask(&self, options: CutoutOptions) -> Option<RgbaImage> {
        let epoch = self.current_epoch()?;
        let mask = epoch.mask.borrow().clone()?;
        Some(compositor::apply_mask_to_image(&epoch.image, &mask, options))
    }

    /// Clicks of the current epoch, in interaction order.
    #[must_use]
    pub fn clicks(&self) -> Vec<Click> {
        self.history()
            .map(|h| h.clicks().to_vec())
            .unwrap_or_default()
    }

    /// Snapshot of the current epoch's history.
    #[must_use]
    pub fn history(&self) -> Option<ClickHistory> {
        self.current_epoch().map(|e| e.history.borrow().clone())
    }

    /// The current mask, or `None` when nothing is selected.
    #[must_use]
    pub fn mask(&self) -> Option<Mask> {
        self.current_epoch().and_then(|e| e.mask.borrow().clone())
    }

    /// The current mask colorized with the configured overlay color.
    #[must_use]
    pub fn overlay(&self) -> Option<Overlay> {
        let mask = self.mask()?;
        Some(compositor::colorize(&mask, self.config.borrow().overlay_color))
    }

    /// The current image with the overlay blended at the configured
    /// opacity. Without a mask this is a copy of the image.
    #[must_use]
    pub fn preview(&self) -> Option<RgbaImage> {
        let epoch = self.current_epoch()?;
        let Some(overlay) = self.overlay() else {
            return Some(epoch.image.as_ref().clone());
        };
        let opacity = self.config.borrow().overlay_opacity;
        Some(compositor::composite_preview(&epoch.image, &overlay, opacity))
    }

    /// Click markers laid out on a surface at `rect`.
    #[must_use]
    pub fn markers(&self, rect: DisplayRect) -> Vec<Marker> {
        let Some(epoch) = self.current_epoch() else {
            return Vec::new();
        };
        let history = epoch.history.borrow().clone();
        markers::layout_markers(
            history.clicks(),
            rect,
            epoch.dimensions(),
            &self.config.borrow(),
        )
    }

    /// The current epoch's image.
    #[must_use]
    pub fn current_image(&self) -> Option<Arc<RgbaImage>> {
        self.current_epoch().map(|e| Arc::clone(&e.image))
    }

    /// Native size of the current image.
    #[must_use]
    pub fn image_dimensions(&self) -> Option<Dimensions> {
        self.current_epoch().map(|e| e.dimensions())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Returns `true` once the engine has initialized.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// Returns `true` while initializing, loading, or segmenting.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state.get(),
            LifecycleState::Initializing | LifecycleState::LoadingImage | LifecycleState::Segmenting
        )
    }

    /// A copy of the current configuration.
    #[must_use]
    pub fn config(&self) -> SegmenterConfig {
        self.config.borrow().clone()
    }

    /// Replace the configuration. Also applies its `click_mode`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] and keeps the old configuration if
    /// `config` fails validation.
    pub fn set_config(&self, config: SegmenterConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.click_mode.set(config.click_mode);
        self.config.replace(config);
        Ok(())
    }

    /// Close the current session and stop accepting work.
    ///
    /// In-flight loads close their own sessions when they finish. Later
    /// mutating operations fail with [`SegmenterError::SessionClosed`].
    pub async fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }
        self.load_ticket.set(self.load_ticket.get() + 1);
        self.pending_reset.set(false);
        self.state.set(LifecycleState::Uninitialized);
        let epoch = self.epoch.take();
        if let Some(epoch) = epoch {
            debug!(epoch = %epoch.id, "teardown: closing session");
            epoch.adapter.close().await;
        }
    }

    async fn open_epoch(
        &self,
        source: ImageSource,
    ) -> Result<(RgbaImage, SessionAdapter<E::Session>), SegmenterError> {
        let image = source.decode()?;
        let adapter = SessionAdapter::open(&self.engine, &image).await?;
        Ok((image, adapter))
    }

    async fn push_click(&self, epoch: EpochOf<E>, click: Click) -> Result<(), SegmenterError> {
        let history = epoch.history.borrow().append(click);
        debug!(epoch = %epoch.id, clicks = history.len(), kind = %click.kind, "click");
        self.commit_history(&epoch, history.clone());
        self.recompute(epoch, history, Replay::Incremental).await
    }

    async fn recompute(
        &self,
        epoch: EpochOf<E>,
        history: ClickHistory,
        replay: Replay,
    ) -> Result<(), SegmenterError> {
        epoch.in_flight.set(epoch.in_flight.get() + 1);
        if !history.is_empty() {
            self.state.set(LifecycleState::Segmenting);
        }
        let outcome = epoch
            .adapter
            .recompute(&epoch.image, &history, replay)
            .await;
        epoch.in_flight.set(epoch.in_flight.get() - 1);

        if !self.is_current(&epoch) {
            debug!(epoch = %epoch.id, "discarding result for a replaced image");
            return Ok(());
        }

        let mask = match outcome {
            Ok(Recompute::Mask(mask)) => Some(mask),
            Ok(Recompute::Empty) => None,
            Ok(Recompute::Cleared) => {
                let had_mask = epoch.mask.take().is_some();
                self.finish_segmenting(&epoch);
                if had_mask {
                    self.emit(&SegmenterEvent::MaskUpdated(None));
                }
                return Ok(());
            }
            Ok(Recompute::Superseded) => {
                self.finish_segmenting(&epoch);
                return Ok(());
            }
            Err(e) => return Err(self.fail(e)),
        };
        epoch.mask.replace(mask.clone());
        self.finish_segmenting(&epoch);
        debug!(epoch = %epoch.id, clicks = history.len(), selected = mask.is_some(), "mask updated");
        self.emit(&SegmenterEvent::MaskUpdated(mask));
        Ok(())
    }

    fn apply_reset(&self) {
        let Some(epoch) = self.current_epoch() else {
            return;
        };
        epoch.adapter.invalidate_and_reset();
        let cleared = {
            let mut history = epoch.history.borrow_mut();
            if history.is_empty() {
                None
            } else {
                *history = history.clear();
                Some(history.clone())
            }
        };
        let had_mask = epoch.mask.take().is_some();
        self.state.set(self.resting_state());
        debug!(epoch = %epoch.id, "reset");

        if let Some(history) = cleared {
            self.emit(&SegmenterEvent::ClicksUpdated(history));
        }
        if had_mask {
            self.emit(&SegmenterEvent::MaskUpdated(None));
        }
    }

    fn apply_deferred_reset(&self) {
        if self.initializing.get() || self.loading.get() > 0 {
            return;
        }
        if self.pending_reset.replace(false) {
            self.apply_reset();
        }
    }

    fn commit_history(&self, epoch: &Epoch<E::Session>, history: ClickHistory) {
        epoch.history.replace(history.clone());
        self.emit(&SegmenterEvent::ClicksUpdated(history));
    }

    /// The epoch a mutating operation should act on, or `None` if the
    /// operation is to be ignored.
    fn interactive_epoch(&self, operation: &str) -> Result<Option<EpochOf<E>>, SegmenterError> {
        self.ensure_live()?;
        if self.initializing.get() || self.loading.get() > 0 {
            warn!(operation, state = ?self.state.get(), "ignoring operation while busy");
            return Ok(None);
        }
        let epoch = self.current_epoch();
        if epoch.is_none() {
            warn!(operation, "ignoring operation without an image");
        }
        Ok(epoch)
    }

    fn ensure_live(&self) -> Result<(), SegmenterError> {
        if self.torn_down.get() {
            return Err(self.fail(SegmenterError::SessionClosed));
        }
        Ok(())
    }

    fn current_epoch(&self) -> Option<EpochOf<E>> {
        self.epoch.borrow().clone()
    }

    fn is_current(&self, epoch: &EpochOf<E>) -> bool {
        self.epoch
            .borrow()
            .as_ref()
            .is_some_and(|current| Rc::ptr_eq(current, epoch))
    }

    /// State after a successful transition, given what is still running.
    fn resting_state(&self) -> LifecycleState {
        if self.initializing.get() {
            return LifecycleState::Initializing;
        }
        if self.loading.get() > 0 {
            return LifecycleState::LoadingImage;
        }
        match self.current_epoch() {
            Some(epoch) if epoch.in_flight.get() > 0 => LifecycleState::Segmenting,
            Some(_) => LifecycleState::ImageReady,
            None if self.initialized.get() => LifecycleState::Ready,
            None => LifecycleState::Uninitialized,
        }
    }

    fn finish_segmenting(&self, epoch: &Epoch<E::Session>) {
        if epoch.in_flight.get() == 0 && self.loading.get() == 0 && !self.initializing.get() {
            self.state.set(LifecycleState::ImageReady);
        }
    }

    fn settle_after_superseded_load(&self) {
        if self.loading.get() == 0 && self.state.get() == LifecycleState::LoadingImage {
            self.state.set(self.resting_state());
        }
    }

    /// Move to `Error`, log, and notify listeners once.
    fn fail(&self, err: SegmenterError) -> SegmenterError {
        if err.is_contract_violation() {
            error!(kind = %err.kind(), "{err}");
        } else {
            warn!(kind = %err.kind(), "{err}");
        }
        self.state.set(LifecycleState::Error);
        self.emit(&SegmenterEvent::Error {
            kind: err.kind(),
            message: err.to_string(),
        });
        err
    }

    fn emit(&self, event: &SegmenterEvent) {
        self.queued.borrow_mut().push_back(event.clone());
        if self.dispatching.replace(true) {
            debug!(event = event.name(), "queueing event raised by a listener");
            return;
        }
        loop {
            let next = self.queued.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            debug!(event = event.name(), "emitting event");
            let listeners: Vec<Listener> = self
                .listeners
                .borrow()
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect();
            for listener in listeners {
                if let Ok(mut listener) = listener.try_borrow_mut() {
                    (&mut *listener)(&event);
                }
            }
        }
        self.dispatching.set(false);
    }
}
