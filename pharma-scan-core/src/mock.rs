//! Scripted collaborators for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::bitmap::Bitmap;
use crate::models::config::{CameraConstraints, FacingMode};
use crate::models::error::{AcquisitionError, BindError, StreamError};
use crate::models::outcome::{DecodedSymbol, ScanOutcome};
use crate::models::state::{Generation, SessionState};
use crate::models::symbology::{FormatSet, SymbolFormat};
use crate::traits::camera_provider::{
    AcquireCallback, CameraDevice, CameraProvider, PermissionStatus, VideoStream,
};
use crate::traits::render_surface::RenderSurface;
use crate::traits::scan_delegate::ScanDelegate;
use crate::traits::symbol_decoder::{DecodeAttempt, SymbolDecoder};

const FAULT_TAG: u8 = 250;

/// Tracks how many streams are alive and bound at any instant.
#[derive(Debug, Default)]
pub struct Ledger {
    live: AtomicUsize,
    bound: AtomicUsize,
    max_live: AtomicUsize,
    max_bound: AtomicUsize,
    created: AtomicUsize,
    double_binds: AtomicUsize,
}

impl Ledger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn stream_created(&self) {
        self.created.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
    }

    fn stream_stopped(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    fn stream_bound(&self) {
        let bound = self.bound.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_bound.fetch_max(bound, Ordering::SeqCst);
    }

    fn stream_unbound(&self) {
        self.bound.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn bound_streams(&self) -> usize {
        self.bound.load(Ordering::SeqCst)
    }

    pub fn max_live_streams(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn max_bound_streams(&self) -> usize {
        self.max_bound.load(Ordering::SeqCst)
    }

    pub fn streams_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn double_binds(&self) -> usize {
        self.double_binds.load(Ordering::SeqCst)
    }
}

pub fn blank_frame() -> Bitmap {
    Bitmap::blank(16, 16).unwrap()
}

/// A frame `MockDecoder` reads back as `text` in `format`.
pub fn symbol_frame(text: &str, format: SymbolFormat) -> Bitmap {
    let tag = SymbolFormat::ALL.iter().position(|f| *f == format).unwrap() as u8;
    let mut luma = vec![tag];
    luma.extend(text.bytes());
    Bitmap::from_luma(luma.len() as u32, 1, luma).unwrap()
}

/// A frame that makes `MockDecoder` fault.
pub fn fault_frame() -> Bitmap {
    Bitmap::from_luma(2, 1, vec![FAULT_TAG, 0]).unwrap()
}

/// Reads the encoding produced by `symbol_frame`. Ignores the allow-list so
/// the controller's own filtering is exercised.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockDecoder;

impl SymbolDecoder for MockDecoder {
    fn decode(&self, image: &Bitmap, _formats: &FormatSet) -> DecodeAttempt {
        if image.is_uniform() {
            return DecodeAttempt::NotFound;
        }
        let luma = image.luma();
        if luma[0] == FAULT_TAG {
            return DecodeAttempt::Fault("decoder crashed".into());
        }
        match SymbolFormat::ALL.get(luma[0] as usize) {
            Some(format) => DecodeAttempt::Found(DecodedSymbol::new(
                String::from_utf8_lossy(&luma[1..]).into_owned(),
                *format,
            )),
            None => DecodeAttempt::NotFound,
        }
    }
}

/// Stream replaying scripted frames, then blank ones.
pub struct MockStream {
    label: String,
    ledger: Arc<Ledger>,
    frames: Mutex<VecDeque<Bitmap>>,
    failure: Mutex<Option<String>>,
    stopped: AtomicBool,
    stop_calls: AtomicUsize,
}

impl MockStream {
    pub fn with_frames(ledger: &Arc<Ledger>, frames: Vec<Bitmap>) -> Arc<Self> {
        ledger.stream_created();
        Arc::new(Self {
            label: format!("mock-camera-{}", ledger.streams_created()),
            ledger: Arc::clone(ledger),
            frames: Mutex::new(frames.into()),
            failure: Mutex::new(None),
            stopped: AtomicBool::new(false),
            stop_calls: AtomicUsize::new(0),
        })
    }

    pub fn blank(ledger: &Arc<Ledger>) -> Arc<Self> {
        Self::with_frames(ledger, Vec::new())
    }

    pub fn fail_with(&self, detail: &str) {
        *self.failure.lock() = Some(detail.to_string());
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl VideoStream for MockStream {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn grab_frame(&self) -> Result<Option<Bitmap>, StreamError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(StreamError("track ended".into()));
        }
        if let Some(detail) = self.failure.lock().clone() {
            return Err(StreamError(detail));
        }
        let next = self.frames.lock().pop_front();
        Ok(Some(next.unwrap_or_else(blank_frame)))
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.ledger.stream_stopped();
        }
    }
}

/// Preview surface that records binds.
pub struct MockSurface {
    ledger: Arc<Ledger>,
    mounted: AtomicBool,
    attached: AtomicBool,
    rejection: Mutex<Option<String>>,
}

impl MockSurface {
    fn new(ledger: &Arc<Ledger>, mounted: bool) -> Arc<Self> {
        Arc::new(Self {
            ledger: Arc::clone(ledger),
            mounted: AtomicBool::new(mounted),
            attached: AtomicBool::new(false),
            rejection: Mutex::new(None),
        })
    }

    pub fn mounted(ledger: &Arc<Ledger>) -> Arc<Self> {
        Self::new(ledger, true)
    }

    pub fn unmounted(ledger: &Arc<Ledger>) -> Arc<Self> {
        Self::new(ledger, false)
    }

    pub fn reject_playback(&self, detail: &str) {
        *self.rejection.lock() = Some(detail.to_string());
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}

impl RenderSurface for MockSurface {
    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn attach(&self, _stream: &Arc<dyn VideoStream>) -> Result<(), BindError> {
        if let Some(detail) = self.rejection.lock().clone() {
            return Err(BindError::PlaybackRejected(detail));
        }
        if self.attached.swap(true, Ordering::SeqCst) {
            self.ledger.double_binds.fetch_add(1, Ordering::SeqCst);
        } else {
            self.ledger.stream_bound();
        }
        Ok(())
    }

    fn detach(&self) {
        if self.attached.swap(false, Ordering::SeqCst) {
            self.ledger.stream_unbound();
        }
    }
}

/// How the mock camera answers the next acquisition request.
pub enum AcquireScript {
    /// Grant immediately, streaming these frames.
    Grant(Vec<Bitmap>),
    /// Deny immediately through the callback.
    Deny(String),
    /// Fail synchronously.
    NoDevice(String),
    /// Park the request until the test completes it.
    Defer,
}

/// Test-side control over a `MockCamera` moved into a controller.
pub struct CameraControl {
    ledger: Arc<Ledger>,
    script: Mutex<VecDeque<AcquireScript>>,
    pending: Mutex<VecDeque<AcquireCallback>>,
    requests: AtomicUsize,
    available: AtomicBool,
    permission: Mutex<PermissionStatus>,
    last_constraints: Mutex<Option<CameraConstraints>>,
}

impl CameraControl {
    pub fn script(&self, step: AcquireScript) {
        self.script.lock().push_back(step);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_permission(&self, status: PermissionStatus) {
        *self.permission.lock() = status;
    }

    pub fn last_constraints(&self) -> Option<CameraConstraints> {
        self.last_constraints.lock().clone()
    }

    /// Complete the oldest parked request with a stream. Returns the stream.
    pub fn grant_oldest(&self, frames: Vec<Bitmap>) -> Option<Arc<MockStream>> {
        let callback = self.pending.lock().pop_front()?;
        let stream = MockStream::with_frames(&self.ledger, frames);
        callback(Ok(stream.clone() as Arc<dyn VideoStream>));
        Some(stream)
    }

    /// Complete the newest parked request with a stream.
    pub fn grant_newest(&self, frames: Vec<Bitmap>) -> Option<Arc<MockStream>> {
        let callback = self.pending.lock().pop_back()?;
        let stream = MockStream::with_frames(&self.ledger, frames);
        callback(Ok(stream.clone() as Arc<dyn VideoStream>));
        Some(stream)
    }

    /// Fail the oldest parked request.
    pub fn fail_oldest(&self, err: AcquisitionError) -> bool {
        let Some(callback) = self.pending.lock().pop_front() else {
            return false;
        };
        callback(Err(err));
        true
    }
}

pub struct MockCamera {
    control: Arc<CameraControl>,
}

impl MockCamera {
    pub fn new(ledger: &Arc<Ledger>) -> (Self, Arc<CameraControl>) {
        let control = Arc::new(CameraControl {
            ledger: Arc::clone(ledger),
            script: Mutex::new(VecDeque::new()),
            pending: Mutex::new(VecDeque::new()),
            requests: AtomicUsize::new(0),
            available: AtomicBool::new(true),
            permission: Mutex::new(PermissionStatus::Prompt),
            last_constraints: Mutex::new(None),
        });
        (
            Self {
                control: Arc::clone(&control),
            },
            control,
        )
    }
}

impl CameraProvider for MockCamera {
    fn is_available(&self) -> bool {
        self.control.available.load(Ordering::SeqCst)
    }

    fn permission_status(&self) -> PermissionStatus {
        *self.control.permission.lock()
    }

    fn available_devices(&self) -> Vec<CameraDevice> {
        if !self.is_available() {
            return Vec::new();
        }
        vec![CameraDevice {
            id: "mock-rear".into(),
            label: "Mock Rear Camera".into(),
            facing: Some(FacingMode::Environment),
        }]
    }

    fn acquire(
        &mut self,
        constraints: &CameraConstraints,
        on_complete: AcquireCallback,
    ) -> Result<(), AcquisitionError> {
        self.control.requests.fetch_add(1, Ordering::SeqCst);
        *self.control.last_constraints.lock() = Some(constraints.clone());

        let step = self.control.script.lock().pop_front();
        match step.unwrap_or(AcquireScript::Grant(Vec::new())) {
            AcquireScript::Grant(frames) => {
                let stream = MockStream::with_frames(&self.control.ledger, frames);
                on_complete(Ok(stream as Arc<dyn VideoStream>));
            }
            AcquireScript::Deny(detail) => on_complete(Err(AcquisitionError::PermissionDenied(detail))),
            AcquireScript::NoDevice(detail) => return Err(AcquisitionError::DeviceUnavailable(detail)),
            AcquireScript::Defer => self.control.pending.lock().push_back(on_complete),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateEvent {
    State(Generation, SessionState),
    Success(String),
    Outcome(ScanOutcome),
    Warning(String),
}

/// Delegate that records every event and mirrors it onto a channel.
pub struct RecordingDelegate {
    events: Mutex<Vec<DelegateEvent>>,
    tx: Mutex<mpsc::Sender<DelegateEvent>>,
}

impl RecordingDelegate {
    pub fn new() -> (Arc<Self>, mpsc::Receiver<DelegateEvent>) {
        let (tx, rx) = mpsc::channel();
        (
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
                tx: Mutex::new(tx),
            }),
            rx,
        )
    }

    fn record(&self, event: DelegateEvent) {
        self.events.lock().push(event.clone());
        let _ = self.tx.lock().send(event);
    }

    pub fn events(&self) -> Vec<DelegateEvent> {
        self.events.lock().clone()
    }

    pub fn outcomes(&self) -> Vec<ScanOutcome> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DelegateEvent::Outcome(o) => Some(o),
                _ => None,
            })
            .collect()
    }

    pub fn successes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DelegateEvent::Success(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DelegateEvent::Warning(w) => Some(w),
                _ => None,
            })
            .collect()
    }

    pub fn states_of(&self, generation: Generation) -> Vec<SessionState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DelegateEvent::State(g, s) if g == generation => Some(s),
                _ => None,
            })
            .collect()
    }
}

impl ScanDelegate for RecordingDelegate {
    fn on_state_changed(&self, generation: Generation, state: SessionState) {
        self.record(DelegateEvent::State(generation, state));
    }

    fn on_scan_success(&self, text: &str) {
        self.record(DelegateEvent::Success(text.to_string()));
    }

    fn on_outcome(&self, outcome: &ScanOutcome) {
        self.record(DelegateEvent::Outcome(outcome.clone()));
    }

    fn on_decode_warning(&self, detail: &str) {
        self.record(DelegateEvent::Warning(detail.to_string()));
    }
}

/// Block until the next outcome event, skipping others.
pub fn wait_for_outcome(
    rx: &mpsc::Receiver<DelegateEvent>,
    timeout: Duration,
) -> Option<ScanOutcome> {
    wait_for(rx, timeout, |e| match e {
        DelegateEvent::Outcome(o) => Some(o),
        _ => None,
    })
}

/// Block until an event matching `pick` arrives.
pub fn wait_for<T>(
    rx: &mpsc::Receiver<DelegateEvent>,
    timeout: Duration,
    mut pick: impl FnMut(DelegateEvent) -> Option<T>,
) -> Option<T> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.checked_duration_since(Instant::now())?;
        match rx.recv_timeout(remaining) {
            Ok(event) => {
                if let Some(found) = pick(event) {
                    return Some(found);
                }
            }
            Err(_) => return None,
        }
    }
}
