use crate::models::bitmap::Bitmap;
use crate::models::outcome::DecodedSymbol;
use crate::models::symbology::FormatSet;

/// Result of one decode pass over one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeAttempt {
    Found(DecodedSymbol),
    /// No symbol in this image. Expected for most live frames.
    NotFound,
    /// The decoder itself failed.
    Fault(String),
}

/// External symbol recognition capability.
pub trait SymbolDecoder: Send + Sync + 'static {
    /// Decode `image`, considering only symbols in `formats`.
    fn decode(&self, image: &Bitmap, formats: &FormatSet) -> DecodeAttempt;
}
