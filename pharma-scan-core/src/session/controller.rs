use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, ReentrantMutex};

use crate::models::bitmap::Bitmap;
use crate::models::config::ScannerConfiguration;
use crate::models::error::{AcquisitionError, BindError, ScanError, StreamError};
use crate::models::outcome::ScanOutcome;
use crate::models::state::{Generation, SessionMode, SessionState};
use crate::session::acquisition::AcquisitionSession;
use crate::session::decode_source::{
    DecodeSource, FrameSink, LiveStreamSource, LoopControl, StillImageSource,
};
use crate::traits::camera_provider::{
    AcquireCallback, CameraDevice, CameraProvider, PermissionStatus, VideoStream,
};
use crate::traits::render_surface::RenderSurface;
use crate::traits::scan_delegate::ScanDelegate;
use crate::traits::symbol_decoder::{DecodeAttempt, SymbolDecoder};

type StreamResult = Result<Arc<dyn VideoStream>, AcquisitionError>;

/// Delegate call decided under the state lock, delivered after it is released.
enum Notification {
    State(Generation, SessionState),
    Success(String),
    Outcome(ScanOutcome),
    Warning(String),
}

/// Bounded wait for the render surface of one attempt.
struct Watchdog {
    generation: Generation,
    handle: thread::JoinHandle<()>,
}

impl Watchdog {
    fn wake(&self) {
        self.handle.thread().unpark();
    }

    fn join(self) {
        if self.handle.thread().id() == thread::current().id() {
            return;
        }
        if self.handle.join().is_err() {
            log::error!("surface watchdog for {} panicked", self.generation);
        }
    }
}

/// Worker threads that have been told to stop and still need joining.
#[derive(Default)]
struct Retired {
    samplers: Vec<LiveStreamSource>,
    watchdogs: Vec<Watchdog>,
}

impl Retired {
    fn absorb(&mut self, other: Retired) {
        self.samplers.extend(other.samplers);
        self.watchdogs.extend(other.watchdogs);
    }

    fn join_all(self) {
        for source in self.samplers {
            source.join();
        }
        for watchdog in self.watchdogs {
            watchdog.join();
        }
    }
}

#[derive(Default)]
struct Effects {
    notifications: Vec<Notification>,
    retired: Retired,
    acquire: Option<Generation>,
}

impl Effects {
    fn state(&mut self, generation: Generation, state: SessionState) {
        self.notifications
            .push(Notification::State(generation, state));
    }
}

enum Ending {
    Outcome(ScanOutcome),
    Cancelled,
}

struct ControllerState {
    generation: Generation,
    mode: Option<SessionMode>,
    session: Option<AcquisitionSession>,
    surface: Option<Arc<dyn RenderSurface>>,
    watchdog: Option<Watchdog>,
    /// Notifications in the order their state changes happened.
    outbox: VecDeque<Notification>,
}

impl ControllerState {
    /// The current session, if it belongs to `generation` and is in `state`.
    fn session_in(
        &mut self,
        generation: Generation,
        state: SessionState,
    ) -> Option<&mut AcquisitionSession> {
        self.session
            .as_mut()
            .filter(|s| s.generation() == generation && s.state() == state)
    }

    fn retire_watchdog(&mut self, fx: &mut Effects) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.wake();
            fx.retired.watchdogs.push(watchdog);
        }
    }
}

fn step(session: &mut AcquisitionSession, next: SessionState, fx: &mut Effects) {
    if session.advance(next) {
        fx.state(session.generation(), next);
    }
}

/// State shared between the controller, camera completions, the surface
/// watchdog and the frame sampler.
struct Core<D: SymbolDecoder> {
    config: ScannerConfiguration,
    decoder: D,
    state: Mutex<ControllerState>,
    delegate: Mutex<Option<Arc<dyn ScanDelegate>>>,
    /// Held while the outbox is drained; the count is the nesting depth of
    /// delegate callbacks that re-enter the controller.
    delivery: ReentrantMutex<Cell<u32>>,
    /// Threads retired by a nested dispatch, joined by the outermost one.
    deferred: Mutex<Retired>,
}

impl<D: SymbolDecoder> Core<D> {
    /// Run `f` under the state lock, then queue the notifications it produced
    /// before the lock is released.
    fn locked<R>(
        &self,
        fx: &mut Effects,
        f: impl FnOnce(&mut ControllerState, &mut Effects) -> R,
    ) -> R {
        let mut st = self.state.lock();
        let out = f(&mut st, fx);
        st.outbox.extend(fx.notifications.drain(..));
        out
    }

    /// Allocate the next generation and start its session.
    fn begin_attempt(
        self: &Arc<Self>,
        st: &mut ControllerState,
        mode: SessionMode,
        fx: &mut Effects,
    ) -> Generation {
        let generation = st.generation.next();
        st.generation = generation;
        st.retire_watchdog(fx);

        let mut session = AcquisitionSession::new(generation, mode);
        fx.state(generation, SessionState::Idle);

        if mode == SessionMode::Camera {
            let mounted = st.surface.as_ref().is_some_and(|s| s.is_mounted());
            if mounted {
                step(&mut session, SessionState::Acquiring, fx);
                fx.acquire = Some(generation);
            } else {
                step(&mut session, SessionState::WaitingForSurface, fx);
                st.watchdog = self.spawn_surface_watchdog(generation);
            }
        }

        log::info!("scan attempt {} opened in {} mode", generation, mode.as_str());
        st.session = Some(session);
        generation
    }

    fn spawn_surface_watchdog(self: &Arc<Self>, generation: Generation) -> Option<Watchdog> {
        let weak = Arc::downgrade(self);
        let timeout = self.config.surface_wait_timeout;
        let deadline = Instant::now() + timeout;
        let spawned = thread::Builder::new()
            .name(format!("surface-watchdog-{}", generation.value()))
            .spawn(move || loop {
                let Some(core) = weak.upgrade() else {
                    return;
                };
                if !core.waiting_for_surface(generation) {
                    return;
                }
                let now = Instant::now();
                if now >= deadline {
                    core.surface_wait_expired(generation, timeout);
                    return;
                }
                drop(core);
                thread::park_timeout(deadline - now);
            });
        match spawned {
            Ok(handle) => Some(Watchdog { generation, handle }),
            Err(err) => {
                log::error!("failed to start surface watchdog for {}: {}", generation, err);
                None
            }
        }
    }

    fn waiting_for_surface(&self, generation: Generation) -> bool {
        self.state
            .lock()
            .session
            .as_ref()
            .is_some_and(|s| {
                s.generation() == generation && s.state() == SessionState::WaitingForSurface
            })
    }

    /// Terminate the current session, if still running, and queue its outcome.
    fn terminate_current(&self, st: &mut ControllerState, fx: &mut Effects, ending: Ending) {
        st.retire_watchdog(fx);
        let Some(session) = st.session.as_mut() else {
            return;
        };
        let generation = session.generation();
        if !session.terminate(&mut fx.retired.samplers) {
            return;
        }
        fx.state(generation, SessionState::Terminated);

        match ending {
            Ending::Outcome(outcome) => {
                log::info!("scan attempt {} finished: {:?}", generation, outcome);
                if let ScanOutcome::Decoded(symbol) = &outcome {
                    fx.notifications
                        .push(Notification::Success(symbol.text.clone()));
                }
                fx.notifications.push(Notification::Outcome(outcome));
            }
            Ending::Cancelled => {
                log::info!("scan attempt {} cancelled", generation);
                if self.config.report_cancellation {
                    fx.notifications
                        .push(Notification::Outcome(ScanOutcome::Cancelled));
                }
            }
        }
    }

    /// Deliver queued notifications in order, then join retired threads.
    ///
    /// One thread drains the outbox at a time. A delegate callback that
    /// re-enters the controller drains on the same thread; the threads its
    /// nested call retires are joined once the outermost delivery finishes.
    fn dispatch(&self, fx: Effects) {
        let depth = self.delivery.lock();
        depth.set(depth.get() + 1);
        self.drain_outbox();
        depth.set(depth.get() - 1);
        let outermost = depth.get() == 0;
        drop(depth);

        if outermost {
            let mut retired = fx.retired;
            retired.absorb(std::mem::take(&mut *self.deferred.lock()));
            retired.join_all();
        } else {
            self.deferred.lock().absorb(fx.retired);
        }
    }

    fn drain_outbox(&self) {
        let delegate = self.delegate.lock().clone();
        loop {
            let Some(notification) = self.state.lock().outbox.pop_front() else {
                return;
            };
            let Some(delegate) = &delegate else {
                continue;
            };
            match notification {
                Notification::State(generation, state) => delegate.on_state_changed(generation, state),
                Notification::Success(text) => delegate.on_scan_success(&text),
                Notification::Outcome(outcome) => delegate.on_outcome(&outcome),
                Notification::Warning(detail) => delegate.on_decode_warning(&detail),
            }
        }
    }

    fn acquisition_finished(self: &Arc<Self>, generation: Generation, result: StreamResult) {
        let mut fx = Effects::default();
        self.locked(&mut fx, |st, fx| {
            let surface = st.surface.clone();

            let Some(session) = st.session_in(generation, SessionState::Acquiring) else {
                match result {
                    Ok(stream) => {
                        log::debug!(
                            "stopping stale stream {} for superseded attempt {}",
                            stream.label(),
                            generation
                        );
                        stream.stop();
                    }
                    Err(err) => {
                        log::debug!("ignoring stale acquisition failure for {}: {}", generation, err)
                    }
                }
                return;
            };

            let ending = match result {
                Err(err) => {
                    log::warn!("camera acquisition failed for {}: {}", generation, err);
                    Some(Ending::Outcome(err.into()))
                }
                Ok(stream) => match session.adopt_stream(stream, surface) {
                    Err(err) => {
                        log::warn!("could not bind stream for {}: {}", generation, err);
                        Some(Ending::Outcome(err.into()))
                    }
                    Ok(stream) => {
                        step(session, SessionState::Active, fx);
                        let weak: Weak<Self> = Arc::downgrade(self);
                        let sink: Weak<dyn FrameSink> = weak;
                        match LiveStreamSource::start(
                            generation,
                            stream,
                            self.config.sample_interval,
                            sink,
                        ) {
                            Ok(source) => {
                                session.start_source(DecodeSource::LiveStream(source));
                                None
                            }
                            Err(err) => {
                                log::error!("failed to start frame sampler for {}: {}", generation, err);
                                Some(Ending::Outcome(ScanOutcome::DeviceUnavailable(format!(
                                    "failed to start frame sampler: {err}"
                                ))))
                            }
                        }
                    }
                },
            };

            if let Some(ending) = ending {
                self.terminate_current(st, fx, ending);
            }
        });
        self.dispatch(fx);
    }

    fn surface_wait_expired(&self, generation: Generation, waited: Duration) {
        let mut fx = Effects::default();
        self.locked(&mut fx, |st, fx| {
            if st
                .session_in(generation, SessionState::WaitingForSurface)
                .is_none()
            {
                return;
            }
            log::warn!("render surface not mounted within {:?} for {}", waited, generation);
            self.terminate_current(
                st,
                fx,
                Ending::Outcome(BindError::SurfaceWaitExpired(waited).into()),
            );
        });
        self.dispatch(fx);
    }

    fn still_image_decoded(&self, generation: Generation, attempt: DecodeAttempt) {
        let mut fx = Effects::default();
        self.locked(&mut fx, |st, fx| {
            if st.session_in(generation, SessionState::Active).is_none() {
                log::debug!("discarding stale image decode for {}", generation);
                return;
            }

            let outcome = match attempt {
                DecodeAttempt::Found(symbol) if self.config.formats.contains(symbol.format) => {
                    ScanOutcome::Decoded(symbol)
                }
                DecodeAttempt::Found(symbol) => {
                    log::debug!("ignoring {} symbol outside the allow-list", symbol.format);
                    ScanOutcome::DecodeNotFound
                }
                DecodeAttempt::NotFound => ScanOutcome::DecodeNotFound,
                DecodeAttempt::Fault(detail) => {
                    log::warn!("decoder failed on uploaded image: {}", detail);
                    ScanOutcome::DecodeNotFound
                }
            };
            self.terminate_current(st, fx, Ending::Outcome(outcome));
        });
        self.dispatch(fx);
    }
}

impl<D: SymbolDecoder> FrameSink for Core<D> {
    fn decode_frame(&self, frame: &Bitmap) -> DecodeAttempt {
        self.decoder.decode(frame, &self.config.formats)
    }

    fn frame_decoded(&self, generation: Generation, attempt: DecodeAttempt) -> LoopControl {
        let mut fx = Effects::default();
        let control = self.locked(&mut fx, |st, fx| {
            let Some(session) = st.session_in(generation, SessionState::Active) else {
                log::debug!("discarding stale frame result for {}", generation);
                return LoopControl::Stop;
            };

            match attempt {
                DecodeAttempt::Found(symbol) if self.config.formats.contains(symbol.format) => {
                    self.terminate_current(st, fx, Ending::Outcome(ScanOutcome::Decoded(symbol)));
                    LoopControl::Stop
                }
                DecodeAttempt::Found(symbol) => {
                    log::trace!("ignoring {} symbol outside the allow-list", symbol.format);
                    session.reset_faults();
                    LoopControl::Continue
                }
                DecodeAttempt::NotFound => {
                    session.reset_faults();
                    LoopControl::Continue
                }
                DecodeAttempt::Fault(detail) => {
                    let streak = session.record_fault();
                    if streak >= self.config.max_consecutive_faults {
                        log::error!(
                            "decoder failed on {} consecutive frames for {}: {}",
                            streak,
                            generation,
                            detail
                        );
                        self.terminate_current(
                            st,
                            fx,
                            Ending::Outcome(ScanOutcome::DeviceUnavailable(format!(
                                "stream frames cannot be decoded: {detail}"
                            ))),
                        );
                        LoopControl::Stop
                    } else {
                        if streak == 1 {
                            log::warn!("decoder fault for {}: {}", generation, detail);
                            fx.notifications.push(Notification::Warning(detail));
                        }
                        LoopControl::Continue
                    }
                }
            }
        });
        self.dispatch(fx);
        control
    }

    fn stream_failed(&self, generation: Generation, err: StreamError) {
        let mut fx = Effects::default();
        self.locked(&mut fx, |st, fx| {
            if st.session_in(generation, SessionState::Active).is_none() {
                return;
            }
            log::error!("camera stream failed for {}: {}", generation, err);
            self.terminate_current(
                st,
                fx,
                Ending::Outcome(ScanOutcome::DeviceUnavailable(err.to_string())),
            );
        });
        self.dispatch(fx);
    }
}

/// Where an acquisition completion goes if it fires before `acquire` returns.
enum Completion {
    Requesting,
    Deferred(StreamResult),
    Returned,
}

fn deliver<D: SymbolDecoder>(core: &Weak<Core<D>>, generation: Generation, result: StreamResult) {
    match core.upgrade() {
        Some(core) => core.acquisition_finished(generation, result),
        None => {
            if let Ok(stream) = result {
                stream.stop();
            }
        }
    }
}

/// Public entry point for scanning.
///
/// Owns at most one `AcquisitionSession` at a time and reports exactly one
/// `ScanOutcome` per attempt through the delegate. Caller-driven
/// cancellation is silent unless `report_cancellation` is set. Delegate
/// callbacks arrive one at a time, in the order the state changes happened.
///
/// ```text
/// open(mode) ──→ session #N ──→ outcome ──→ (switch_mode → #N+1 | close)
/// ```
pub struct ScanController<C: CameraProvider, D: SymbolDecoder> {
    camera: Mutex<C>,
    core: Arc<Core<D>>,
}

impl<C: CameraProvider, D: SymbolDecoder> ScanController<C, D> {
    pub fn new(camera: C, decoder: D, config: ScannerConfiguration) -> Result<Self, ScanError> {
        config.validate().map_err(ScanError::Configuration)?;
        Ok(Self {
            camera: Mutex::new(camera),
            core: Arc::new(Core {
                config,
                decoder,
                state: Mutex::new(ControllerState {
                    generation: Generation::default(),
                    mode: None,
                    session: None,
                    surface: None,
                    watchdog: None,
                    outbox: VecDeque::new(),
                }),
                delegate: Mutex::new(None),
                delivery: ReentrantMutex::new(Cell::new(0)),
                deferred: Mutex::new(Retired::default()),
            }),
        })
    }

    pub fn set_delegate(&self, delegate: Arc<dyn ScanDelegate>) {
        *self.core.delegate.lock() = Some(delegate);
    }

    pub fn config(&self) -> &ScannerConfiguration {
        &self.core.config
    }

    pub fn mode(&self) -> Option<SessionMode> {
        self.core.state.lock().mode
    }

    pub fn is_open(&self) -> bool {
        self.mode().is_some()
    }

    /// Generation of the most recent attempt (zero before the first `open`).
    pub fn current_generation(&self) -> Generation {
        self.core.state.lock().generation
    }

    pub fn session_state(&self) -> Option<SessionState> {
        self.core.state.lock().session.as_ref().map(|s| s.state())
    }

    /// Whether the current session holds an unreleased camera stream.
    pub fn holds_stream(&self) -> bool {
        self.core
            .state
            .lock()
            .session
            .as_ref()
            .is_some_and(|s| s.holds_stream())
    }

    pub fn available_cameras(&self) -> Vec<CameraDevice> {
        self.camera.lock().available_devices()
    }

    /// Start a new attempt in `mode`.
    pub fn open(&self, mode: SessionMode) -> Result<Generation, ScanError> {
        let mut fx = Effects::default();
        let opened = self.core.locked(&mut fx, |st, fx| {
            if st.mode.is_some() {
                return Err(ScanError::AlreadyOpen);
            }
            st.mode = Some(mode);
            Ok(self.core.begin_attempt(st, mode, fx))
        });
        self.finish(fx);
        opened
    }

    /// Cancel the current attempt and start a fresh one in `mode`.
    ///
    /// The old session's stream is released before the new generation is
    /// allocated. Switching to the current mode is a rescan.
    pub fn switch_mode(&self, mode: SessionMode) -> Result<Generation, ScanError> {
        let mut fx = Effects::default();
        let switched = self.core.locked(&mut fx, |st, fx| {
            if st.mode.is_none() {
                return Err(ScanError::NotOpen);
            }
            self.core.terminate_current(st, fx, Ending::Cancelled);
            st.mode = Some(mode);
            Ok(self.core.begin_attempt(st, mode, fx))
        });
        self.finish(fx);
        switched
    }

    /// Decode an uploaded image. Valid once per upload attempt.
    ///
    /// The outcome is reported through the delegate before this returns.
    pub fn supply_image(&self, image: Bitmap) -> Result<(), ScanError> {
        let mut fx = Effects::default();
        let started = self.core.locked(&mut fx, |st, fx| {
            match st.mode {
                None => return Err(ScanError::NotOpen),
                Some(SessionMode::Camera) => return Err(ScanError::WrongMode("upload")),
                Some(SessionMode::Upload) => {}
            }
            let session = st
                .session
                .as_mut()
                .filter(|s| s.state() == SessionState::Idle)
                .ok_or(ScanError::NotAwaitingImage)?;
            session.start_source(DecodeSource::StillImage(StillImageSource::new(image)));
            let pass = session
                .take_still_pass()
                .ok_or(ScanError::NotAwaitingImage)?;
            step(session, SessionState::Active, fx);
            Ok((session.generation(), pass))
        });
        self.core.dispatch(fx);
        let (generation, pass) = started?;

        let attempt = pass.decode(&self.core.decoder, &self.core.config.formats);
        self.core.still_image_decoded(generation, attempt);
        Ok(())
    }

    /// Cancel the current attempt and release everything. Idempotent.
    pub fn close(&self) {
        let mut fx = Effects::default();
        self.core.locked(&mut fx, |st, fx| {
            if st.mode.take().is_none() {
                return;
            }
            self.core.terminate_current(st, fx, Ending::Cancelled);
            st.session = None;
        });
        self.core.dispatch(fx);
    }

    /// The render surface is mounted and can receive a stream.
    pub fn surface_mounted(&self, surface: Arc<dyn RenderSurface>) {
        let mut fx = Effects::default();
        self.core.locked(&mut fx, |st, fx| {
            st.surface = Some(surface);
            let generation = st.generation;
            if let Some(session) = st.session_in(generation, SessionState::WaitingForSurface) {
                step(session, SessionState::Acquiring, fx);
                fx.acquire = Some(generation);
                st.retire_watchdog(fx);
            }
        });
        self.finish(fx);
    }

    /// The render surface is going away; nothing may stay bound to it.
    pub fn surface_unmounting(&self) {
        let mut fx = Effects::default();
        self.core.locked(&mut fx, |st, fx| {
            st.surface = None;
            let binding = st.session.as_ref().is_some_and(|s| {
                matches!(s.state(), SessionState::Acquiring | SessionState::Active)
                    && s.mode() == SessionMode::Camera
            });
            if binding {
                self.core.terminate_current(st, fx, Ending::Cancelled);
            }
        });
        self.core.dispatch(fx);
    }

    fn finish(&self, mut fx: Effects) {
        let acquire = fx.acquire.take();
        self.core.dispatch(fx);
        if let Some(generation) = acquire {
            self.request_stream(generation);
        }
    }

    fn request_stream(&self, generation: Generation) {
        let mut camera = self.camera.lock();

        // A delegate callback may have closed or replaced the attempt since
        // the request was decided.
        let current = self
            .core
            .state
            .lock()
            .session_in(generation, SessionState::Acquiring)
            .is_some();
        if !current {
            log::debug!("attempt {} ended before the camera was requested", generation);
            return;
        }

        let refused = if !camera.is_available() {
            Some(AcquisitionError::DeviceUnavailable(
                "no camera found on this device".into(),
            ))
        } else if camera.permission_status() == PermissionStatus::Denied {
            Some(AcquisitionError::PermissionDenied(
                "camera access is blocked for this app".into(),
            ))
        } else {
            None
        };
        if let Some(err) = refused {
            drop(camera);
            self.core.acquisition_finished(generation, Err(err));
            return;
        }

        let phase = Arc::new(Mutex::new(Completion::Requesting));
        let on_complete: AcquireCallback = {
            let phase = Arc::clone(&phase);
            let core = Arc::downgrade(&self.core);
            Box::new(move |result: StreamResult| {
                {
                    let mut phase = phase.lock();
                    if matches!(*phase, Completion::Requesting) {
                        *phase = Completion::Deferred(result);
                        return;
                    }
                }
                deliver(&core, generation, result);
            })
        };

        log::info!("requesting camera stream for {}", generation);
        let requested = camera.acquire(&self.core.config.constraints, on_complete);
        drop(camera);

        let completion = std::mem::replace(&mut *phase.lock(), Completion::Returned);
        if let Completion::Deferred(result) = completion {
            self.core.acquisition_finished(generation, result);
        }
        if let Err(err) = requested {
            self.core.acquisition_finished(generation, Err(err));
        }
    }
}

impl<C: CameraProvider, D: SymbolDecoder> Drop for ScanController<C, D> {
    fn drop(&mut self) {
        self.close();
    }
}
