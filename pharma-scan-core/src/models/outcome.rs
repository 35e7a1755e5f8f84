use serde::{Deserialize, Serialize};

use super::error::{AcquisitionError, BindError};
use super::symbology::SymbolFormat;

/// A successfully decoded symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedSymbol {
    pub text: String,
    pub format: SymbolFormat,
}

impl DecodedSymbol {
    pub fn new(text: impl Into<String>, format: SymbolFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}

/// Result of one logical scan attempt, delivered to the caller exactly once.
///
/// Per-frame "no symbol here" results in live mode never become an outcome;
/// they are filtered inside the sampling loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ScanOutcome {
    Decoded(DecodedSymbol),
    /// Only surfaced when `report_cancellation` is enabled.
    Cancelled,
    PermissionDenied(String),
    DeviceUnavailable(String),
    BindFailed(String),
    /// Upload mode only: the single decode pass found nothing.
    DecodeNotFound,
}

impl ScanOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Decoded(_))
    }

    pub fn decoded_text(&self) -> Option<&str> {
        match self {
            Self::Decoded(symbol) => Some(&symbol.text),
            _ => None,
        }
    }

    /// Short user-facing message for rendering.
    pub fn user_message(&self) -> String {
        match self {
            Self::Decoded(symbol) => format!("Scanned {}", symbol.text),
            Self::Cancelled => "Scan cancelled".into(),
            Self::PermissionDenied(_) => {
                "Camera access was denied. Allow camera access or upload a photo instead.".into()
            }
            Self::DeviceUnavailable(detail) => {
                format!("No usable camera ({detail}). Try uploading a photo instead.")
            }
            Self::BindFailed(detail) => format!("Could not start the camera preview ({detail})."),
            Self::DecodeNotFound => {
                "No barcode was found in the image. Try a sharper, well-lit photo.".into()
            }
        }
    }
}

impl From<AcquisitionError> for ScanOutcome {
    fn from(err: AcquisitionError) -> Self {
        match err {
            AcquisitionError::PermissionDenied(detail) => Self::PermissionDenied(detail),
            AcquisitionError::DeviceUnavailable(detail) => Self::DeviceUnavailable(detail),
        }
    }
}

impl From<BindError> for ScanOutcome {
    fn from(err: BindError) -> Self {
        Self::BindFailed(err.to_string())
    }
}
