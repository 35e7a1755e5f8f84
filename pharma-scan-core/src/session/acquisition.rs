use std::sync::Arc;

use crate::models::error::BindError;
use crate::models::state::{Generation, SessionMode, SessionState};
use crate::session::decode_source::{DecodeSource, LiveStreamSource, StillImageSource};
use crate::session::resource_handle::ResourceHandle;
use crate::traits::camera_provider::VideoStream;
use crate::traits::render_surface::RenderSurface;

/// One attempt to turn camera frames or an uploaded image into a decoded symbol.
///
/// Owns the stream and the decode source for its whole lifetime. Every exit
/// goes through `terminate`, which stops the decode source and releases the
/// stream.
#[derive(Debug)]
pub struct AcquisitionSession {
    generation: Generation,
    mode: SessionMode,
    state: SessionState,
    handle: ResourceHandle,
    source: Option<DecodeSource>,
    fault_streak: u32,
}

impl AcquisitionSession {
    pub fn new(generation: Generation, mode: SessionMode) -> Self {
        Self {
            generation,
            mode,
            state: SessionState::Idle,
            handle: ResourceHandle::empty(),
            source: None,
            fault_streak: 0,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn holds_stream(&self) -> bool {
        self.handle.is_live()
    }

    /// Move to `next`. Illegal transitions are refused and logged.
    pub fn advance(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(next, self.mode) {
            log::warn!(
                "session {} refused transition {} -> {}",
                self.generation,
                self.state.as_str(),
                next.as_str()
            );
            return false;
        }
        log::debug!(
            "session {} {} -> {}",
            self.generation,
            self.state.as_str(),
            next.as_str()
        );
        self.state = next;
        true
    }

    /// Take ownership of `stream` and bind it to `surface`.
    ///
    /// On failure the stream stays owned by the session and is released by
    /// the following `terminate`.
    pub fn adopt_stream(
        &mut self,
        stream: Arc<dyn VideoStream>,
        surface: Option<Arc<dyn RenderSurface>>,
    ) -> Result<Arc<dyn VideoStream>, BindError> {
        self.handle.release();
        self.handle = ResourceHandle::acquired(Arc::clone(&stream));
        let surface = surface.ok_or(BindError::SurfaceNotMounted)?;
        self.handle.bind_to_surface(surface)?;
        Ok(stream)
    }

    /// Install the session's decode source, stopping any live one it replaces.
    pub(crate) fn start_source(&mut self, source: DecodeSource) {
        log::debug!("session {} decoding from {}", self.generation, source);
        if let Some(DecodeSource::LiveStream(previous)) = self.source.replace(source) {
            previous.stop();
        }
    }

    pub fn is_sampling(&self) -> bool {
        matches!(&self.source, Some(DecodeSource::LiveStream(live)) if live.is_running())
    }

    /// Hand out the pending still-image pass. An upload is decoded once, so
    /// later calls get `None`.
    pub(crate) fn take_still_pass(&mut self) -> Option<StillImageSource> {
        match self.source.take() {
            Some(DecodeSource::StillImage(pass)) => Some(pass),
            other => {
                self.source = other;
                None
            }
        }
    }

    pub(crate) fn record_fault(&mut self) -> u32 {
        self.fault_streak += 1;
        self.fault_streak
    }

    pub(crate) fn reset_faults(&mut self) {
        self.fault_streak = 0;
    }

    /// Enter `Terminated`: stop the decode source and release the stream.
    ///
    /// Returns `false` if the session had already terminated. The stopped
    /// sampler is pushed to `retired` so the caller can join it once no
    /// locks are held.
    pub(crate) fn terminate(&mut self, retired: &mut Vec<LiveStreamSource>) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        if let Some(DecodeSource::LiveStream(source)) = self.source.take() {
            source.stop();
            retired.push(source);
        }
        self.handle.release();
        self.fault_streak = 0;
        self.advance(SessionState::Terminated)
    }
}
