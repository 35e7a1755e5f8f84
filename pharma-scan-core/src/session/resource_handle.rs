use std::sync::Arc;

use crate::models::error::BindError;
use crate::traits::camera_provider::VideoStream;
use crate::traits::render_surface::RenderSurface;

/// Scoped ownership of one acquired camera stream.
///
/// The stream is stopped exactly once: by `release()` or, failing that, on
/// drop. An empty handle (acquisition never succeeded) releases nothing.
pub struct ResourceHandle {
    stream: Option<Arc<dyn VideoStream>>,
    surface: Option<Arc<dyn RenderSurface>>,
}

impl ResourceHandle {
    pub fn empty() -> Self {
        Self {
            stream: None,
            surface: None,
        }
    }

    /// Take ownership of a stream delivered by a successful acquisition.
    pub fn acquired(stream: Arc<dyn VideoStream>) -> Self {
        log::info!("camera stream acquired: {}", stream.label());
        Self {
            stream: Some(stream),
            surface: None,
        }
    }

    /// Whether this handle still owns an unreleased stream.
    pub fn is_live(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_bound(&self) -> bool {
        self.surface.is_some()
    }

    pub fn stream(&self) -> Option<&Arc<dyn VideoStream>> {
        self.stream.as_ref()
    }

    /// Attach the stream to `surface` and start playback.
    pub fn bind_to_surface(&mut self, surface: Arc<dyn RenderSurface>) -> Result<(), BindError> {
        let stream = self
            .stream
            .as_ref()
            .ok_or(BindError::NoStream)?;

        if !surface.is_mounted() {
            return Err(BindError::SurfaceNotMounted);
        }

        if let Err(err) = surface.attach(stream) {
            log::warn!("failed to bind {} to render surface: {}", stream.label(), err);
            // Playback may have half-started.
            surface.detach();
            return Err(err);
        }

        self.surface = Some(surface);
        Ok(())
    }

    /// Detach from the surface and stop every track. Idempotent.
    ///
    /// Returns `true` if a stream was actually stopped by this call.
    pub fn release(&mut self) -> bool {
        if let Some(surface) = self.surface.take() {
            surface.detach();
        }
        match self.stream.take() {
            Some(stream) => {
                stream.stop();
                log::info!("camera stream released: {}", stream.label());
                true
            }
            None => false,
        }
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("live", &self.is_live())
            .field("bound", &self.is_bound())
            .finish()
    }
}
