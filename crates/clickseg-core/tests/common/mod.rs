//! Scripted fake engine shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::future_not_send)]

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use clickseg_core::{
    Click, ClickType, Dimensions, EngineError, EngineSession, Mask, RgbaImage, SegmentationEngine,
    Segmenter, SegmenterConfig, SegmenterEvent,
};
use image::Rgba;

/// Produces the engine's mask from the clicks a session knows about.
pub type MaskFn = Rc<dyn Fn(&[Click], Dimensions) -> Result<Mask, EngineError>>;

/// Everything the engine was asked to do.
#[derive(Debug, Default)]
pub struct Calls {
    pub initialize: usize,
    pub embeddings: usize,
    pub sessions: usize,
    pub disposed: usize,
    /// Click list seen by each `segment` call.
    pub segments: Vec<Vec<Click>>,
}

#[derive(Clone)]
pub struct FakeEngine {
    pub calls: Rc<RefCell<Calls>>,
    pub fail_init: Rc<Cell<bool>>,
    pub fail_embedding: Rc<Cell<bool>>,
    /// How many times each `segment` call yields before answering.
    pub segment_yields: Rc<Cell<usize>>,
    mask_fn: MaskFn,
}

impl FakeEngine {
    pub fn new(mask_fn: impl Fn(&[Click], Dimensions) -> Result<Mask, EngineError> + 'static) -> Self {
        Self {
            calls: Rc::new(RefCell::new(Calls::default())),
            fail_init: Rc::new(Cell::new(false)),
            fail_embedding: Rc::new(Cell::new(false)),
            segment_yields: Rc::new(Cell::new(1)),
            mask_fn: Rc::new(mask_fn),
        }
    }
}

impl SegmentationEngine for FakeEngine {
    type Session = FakeSession;

    async fn initialize(&self) -> Result<(), EngineError> {
        YieldNow::default().await;
        self.calls.borrow_mut().initialize += 1;
        if self.fail_init.get() {
            return Err(EngineError::new("model failed to load"));
        }
        Ok(())
    }

    async fn precompute_embedding(&self, _image: &RgbaImage) -> Result<(), EngineError> {
        YieldNow::default().await;
        self.calls.borrow_mut().embeddings += 1;
        if self.fail_embedding.get() {
            return Err(EngineError::new("encoder out of memory"));
        }
        Ok(())
    }

    fn create_session(&self, _image: &RgbaImage) -> Result<FakeSession, EngineError> {
        self.calls.borrow_mut().sessions += 1;
        Ok(FakeSession {
            clicks: Vec::new(),
            calls: Rc::clone(&self.calls),
            yields: Rc::clone(&self.segment_yields),
            mask_fn: Rc::clone(&self.mask_fn),
        })
    }
}

pub struct FakeSession {
    clicks: Vec<Click>,
    calls: Rc<RefCell<Calls>>,
    yields: Rc<Cell<usize>>,
    mask_fn: MaskFn,
}

impl EngineSession for FakeSession {
    fn add_click(&mut self, x: f64, y: f64, kind: ClickType) {
        self.clicks.push(Click::new(x, y, kind));
    }

    fn remove_last_click(&mut self) {
        self.clicks.pop();
    }

    fn reset(&mut self) {
        self.clicks.clear();
    }

    async fn segment(&mut self, image: &RgbaImage) -> Result<Mask, EngineError> {
        self.calls.borrow_mut().segments.push(self.clicks.clone());
        for _ in 0..self.yields.get() {
            YieldNow::default().await;
        }
        (self.mask_fn)(&self.clicks, Dimensions::of(image))
    }

    fn dispose(self) {
        self.calls.borrow_mut().disposed += 1;
    }
}

/// Returns `Pending` once, so concurrently driven operations interleave
/// at every engine call.
#[derive(Default)]
pub struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

// --- mask scripts ---

fn filled(dims: Dimensions, alpha: u8) -> Mask {
    Mask::from_rgba(RgbaImage::from_pixel(
        dims.width,
        dims.height,
        Rgba([255, 255, 255, alpha]),
    ))
}

/// Every pixel selected, whatever the clicks.
pub fn full_mask(_clicks: &[Click], dims: Dimensions) -> Result<Mask, EngineError> {
    Ok(filled(dims, 255))
}

/// Every pixel has alpha equal to the number of clicks.
pub fn count_mask(clicks: &[Click], dims: Dimensions) -> Result<Mask, EngineError> {
    Ok(filled(dims, u8::try_from(clicks.len()).unwrap_or(u8::MAX)))
}

/// Full selection while include clicks outnumber exclude clicks,
/// otherwise nothing.
pub fn balance_mask(clicks: &[Click], dims: Dimensions) -> Result<Mask, EngineError> {
    let includes = clicks.iter().filter(|c| c.kind == ClickType::Include).count();
    let excludes = clicks.len() - includes;
    Ok(filled(dims, if includes > excludes { 255 } else { 0 }))
}

/// A pixel is selected when its nearest click is an include click.
/// Order-sensitive on ties, so it tells histories apart.
pub fn nearest_click_mask(clicks: &[Click], dims: Dimensions) -> Result<Mask, EngineError> {
    let raster = RgbaImage::from_fn(dims.width, dims.height, |x, y| {
        let (px, py) = (f64::from(x) + 0.5, f64::from(y) + 0.5);
        let nearest = clicks.iter().min_by(|a, b| {
            let da = (a.x - px).hypot(a.y - py);
            let db = (b.x - px).hypot(b.y - py);
            da.total_cmp(&db)
        });
        match nearest {
            Some(c) if c.kind == ClickType::Include => Rgba([255, 255, 255, 255]),
            _ => Rgba([0, 0, 0, 0]),
        }
    });
    Ok(Mask::from_rgba(raster))
}

/// Fails whenever the newest click is an exclude click.
pub fn fail_on_exclude(clicks: &[Click], dims: Dimensions) -> Result<Mask, EngineError> {
    match clicks.last() {
        Some(c) if c.kind == ClickType::Exclude => Err(EngineError::new("decoder crashed")),
        _ => full_mask(clicks, dims),
    }
}

// --- fixtures ---

/// Opaque image with a horizontal color gradient.
pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            u8::try_from(x % 256).unwrap(),
            u8::try_from(y % 256).unwrap(),
            128,
            255,
        ])
    })
}

pub fn segmenter(engine: &FakeEngine) -> Segmenter<FakeEngine> {
    Segmenter::new(engine.clone(), SegmenterConfig::default()).unwrap()
}

/// Collect every event the segmenter emits.
pub fn record(segmenter: &Segmenter<FakeEngine>) -> Rc<RefCell<Vec<SegmenterEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    segmenter.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}

pub fn mask_updates(events: &[SegmenterEvent]) -> Vec<Option<Mask>> {
    events
        .iter()
        .filter_map(|e| match e {
            SegmenterEvent::MaskUpdated(mask) => Some(mask.clone()),
            _ => None,
        })
        .collect()
}

pub fn click_updates(events: &[SegmenterEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            SegmenterEvent::ClicksUpdated(history) => Some(history.len()),
            _ => None,
        })
        .collect()
}

pub fn error_kinds(events: &[SegmenterEvent]) -> Vec<clickseg_core::ErrorKind> {
    events
        .iter()
        .filter_map(|e| match e {
            SegmenterEvent::Error { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}
