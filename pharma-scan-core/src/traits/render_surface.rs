use std::sync::Arc;

use crate::models::error::BindError;
use crate::traits::camera_provider::VideoStream;

/// The UI element a live stream is previewed in.
///
/// The UI layer reports mount/unmount through `ScanController::surface_mounted`
/// and `ScanController::surface_unmounting`; a stream is never attached before
/// the former or kept attached after the latter.
pub trait RenderSurface: Send + Sync {
    fn is_mounted(&self) -> bool;

    /// Attach `stream` and start playback.
    fn attach(&self, stream: &Arc<dyn VideoStream>) -> Result<(), BindError>;

    /// Drop whatever stream is attached. Must be idempotent.
    fn detach(&self);
}
