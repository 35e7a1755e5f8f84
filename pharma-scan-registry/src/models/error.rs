use thiserror::Error;

/// Errors raised by the product registry and its stores.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid serial number: {0}")]
    InvalidSerial(String),

    #[error("invalid product: {0}")]
    InvalidProduct(String),

    #[error("serial number {0} is already registered")]
    DuplicateSerial(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors raised while preparing an image for, or reading a verdict from,
/// an authenticity classifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("unsupported image data")]
    UnsupportedImage,

    #[error("invalid classifier response: {0}")]
    InvalidResponse(String),

    #[error("classifier transport failed: {0}")]
    Transport(String),

    #[error("no authenticity classifier is configured")]
    NotConfigured,
}
