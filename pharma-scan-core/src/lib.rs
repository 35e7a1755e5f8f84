//! # pharma-scan-core
//!
//! Acquisition-and-decode sessions for serial-number scanning.
//!
//! Turns a live camera feed or an uploaded still image into a decoded
//! identifier, while owning the camera stream safely across open, close and
//! mode-switch events. Symbol recognition, camera hardware and the preview
//! surface are supplied by the host through traits.
//!
//! ## Architecture
//!
//! ```text
//! pharma-scan-core (this crate)
//! ├── traits/    ← CameraProvider, VideoStream, RenderSurface, SymbolDecoder, ScanDelegate
//! ├── models/    ← ScanOutcome, SessionState, ScannerConfiguration, SymbolFormat, Bitmap, errors
//! └── session/   ← ScanController → AcquisitionSession → ResourceHandle + DecodeSource
//! ```
//!
//! Every attempt gets a fresh `Generation`. Camera completions, watchdog
//! timeouts and frame results carry the generation they were issued for and
//! are discarded once it is no longer current; a stream that arrives late is
//! stopped on the spot.

pub mod models;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod mock;

pub use models::bitmap::Bitmap;
pub use models::config::{CameraConstraints, FacingMode, ScannerConfiguration};
pub use models::error::{AcquisitionError, BindError, ScanError, StreamError};
pub use models::outcome::{DecodedSymbol, ScanOutcome};
pub use models::state::{Generation, SessionMode, SessionState};
pub use models::symbology::{FormatSet, SymbolFormat};
pub use session::acquisition::AcquisitionSession;
pub use session::controller::ScanController;
pub use session::decode_source::{DecodeSource, LiveStreamSource, LoopControl, StillImageSource};
pub use session::resource_handle::ResourceHandle;
pub use traits::camera_provider::{
    AcquireCallback, CameraDevice, CameraProvider, PermissionStatus, VideoStream,
};
pub use traits::render_surface::RenderSurface;
pub use traits::scan_delegate::ScanDelegate;
pub use traits::symbol_decoder::{DecodeAttempt, SymbolDecoder};
