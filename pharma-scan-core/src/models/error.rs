use std::time::Duration;

use thiserror::Error;

/// Failure to obtain a camera stream from the host.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("camera not available: {0}")]
    DeviceUnavailable(String),
}

/// Failure to attach an acquired stream to the render surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("no camera stream to bind")]
    NoStream,

    #[error("render surface is not mounted")]
    SurfaceNotMounted,

    #[error("render surface was not mounted within {0:?}")]
    SurfaceWaitExpired(Duration),

    #[error("playback rejected: {0}")]
    PlaybackRejected(String),
}

/// A live stream stopped delivering frames.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("stream error: {0}")]
pub struct StreamError(pub String);

/// Misuse of the controller API.
///
/// Session outcomes (decoded, denied, ...) are never reported through this
/// type; they go to the `ScanDelegate` exactly once per attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("scanner is already open")]
    AlreadyOpen,

    #[error("scanner is not open")]
    NotOpen,

    #[error("operation requires {0} mode")]
    WrongMode(&'static str),

    #[error("session is not waiting for an image")]
    NotAwaitingImage,

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("configuration failed: {0}")]
    Configuration(String),
}
