use super::error::ScanError;

/// An 8-bit grayscale image: a sampled video frame or an uploaded photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    luma: Vec<u8>,
}

impl Bitmap {
    /// Wrap raw row-major luma samples.
    pub fn from_luma(width: u32, height: u32, luma: Vec<u8>) -> Result<Self, ScanError> {
        if width == 0 || height == 0 {
            return Err(ScanError::InvalidImage(format!(
                "empty dimensions {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize;
        if luma.len() != expected {
            return Err(ScanError::InvalidImage(format!(
                "expected {expected} luma bytes for {width}x{height}, got {}",
                luma.len()
            )));
        }
        Ok(Self {
            width,
            height,
            luma,
        })
    }

    /// Decode an encoded upload (PNG, JPEG, ...) and convert it to grayscale.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, ScanError> {
        if bytes.is_empty() {
            return Err(ScanError::InvalidImage("empty upload".into()));
        }
        let img = image::load_from_memory(bytes)
            .map_err(|e| ScanError::InvalidImage(format!("failed to decode upload: {e}")))?;
        let gray = img.to_luma8();
        let (width, height) = gray.dimensions();
        Self::from_luma(width, height, gray.into_raw())
    }

    /// A uniform image with no content.
    pub fn blank(width: u32, height: u32) -> Result<Self, ScanError> {
        Self::from_luma(width, height, vec![255; width as usize * height as usize])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn luma(&self) -> &[u8] {
        &self.luma
    }

    /// Whether every pixel has the same value.
    pub fn is_uniform(&self) -> bool {
        self.luma.windows(2).all(|w| w[0] == w[1])
    }
}
