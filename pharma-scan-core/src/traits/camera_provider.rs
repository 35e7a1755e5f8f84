use std::sync::Arc;

use crate::models::bitmap::Bitmap;
use crate::models::config::{CameraConstraints, FacingMode};
use crate::models::error::{AcquisitionError, StreamError};

/// Completion of an acquisition request.
///
/// Invoked at most once, from any thread, possibly before `acquire` returns.
pub type AcquireCallback =
    Box<dyn FnOnce(Result<Arc<dyn VideoStream>, AcquisitionError>) + Send + 'static>;

/// Host camera permission as far as it is known without prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    /// Requesting a stream will prompt the user.
    Prompt,
    Denied,
}

/// A camera the host can open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub id: String,
    pub label: String,
    pub facing: Option<FacingMode>,
}

/// Host access to camera hardware.
///
/// Implemented by the embedding platform (browser bridge, V4L2, AVFoundation, ...).
pub trait CameraProvider: Send {
    /// Whether any camera exists and the capture API is supported.
    fn is_available(&self) -> bool;

    fn permission_status(&self) -> PermissionStatus;

    fn available_devices(&self) -> Vec<CameraDevice>;

    /// Start acquiring a stream matching `constraints`.
    ///
    /// Either fails synchronously (and never calls `on_complete`) or returns
    /// `Ok` and later calls `on_complete` exactly once. The request cannot be
    /// aborted; a stream delivered after the caller lost interest is stopped
    /// by the caller.
    fn acquire(
        &mut self,
        constraints: &CameraConstraints,
        on_complete: AcquireCallback,
    ) -> Result<(), AcquisitionError>;
}

/// A live camera stream.
pub trait VideoStream: Send + Sync {
    /// Human-readable track label, used in logs.
    fn label(&self) -> String;

    /// Current frame, or `None` if no new frame is ready yet.
    fn grab_frame(&self) -> Result<Option<Bitmap>, StreamError>;

    /// Stop every underlying track. Must be idempotent.
    fn stop(&self);
}
