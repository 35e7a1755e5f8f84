use std::fmt;

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::error::ClassifierError;

/// An uploaded package photo, ready to hand to a classifier.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    data: Vec<u8>,
    media_type: &'static str,
    sha256: String,
}

impl ImagePayload {
    /// Sniff the media type from the data's magic bytes and record its
    /// SHA-256 digest. Only formats a browser upload can carry are accepted.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ClassifierError> {
        let format = image::guess_format(&data).map_err(|_| ClassifierError::UnsupportedImage)?;
        match format {
            ImageFormat::Png
            | ImageFormat::Jpeg
            | ImageFormat::WebP
            | ImageFormat::Gif
            | ImageFormat::Bmp => {}
            _ => return Err(ClassifierError::UnsupportedImage),
        }
        let sha256 = hex_encode(&Sha256::digest(&data));
        Ok(Self {
            data,
            media_type: format.to_mime_type(),
            sha256,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn media_type(&self) -> &'static str {
        self.media_type
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("media_type", &self.media_type)
            .field("len", &self.data.len())
            .field("sha256", &self.sha256)
            .finish()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A classifier's judgement on one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticityVerdict {
    #[serde(alias = "isAuthentic")]
    pub is_authentic: bool,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub rationale: String,
    #[serde(default)]
    pub anomalies: Vec<String>,
}

impl AuthenticityVerdict {
    /// Read a verdict out of a classifier's text reply.
    ///
    /// The reply may wrap the JSON object in prose or a Markdown code fence;
    /// the outermost `{ ... }` span is parsed.
    pub fn from_response(text: &str) -> Result<Self, ClassifierError> {
        let body = extract_json_object(text)
            .ok_or_else(|| ClassifierError::InvalidResponse("no JSON object in response".into()))?;
        let verdict: Self = serde_json::from_str(body)
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;
        verdict.validate()?;
        Ok(verdict)
    }

    pub fn validate(&self) -> Result<(), ClassifierError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ClassifierError::InvalidResponse(format!(
                "confidence {} is outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// A single-shot authenticity check on one image.
///
/// Implementations make exactly one request per call and never retry; a
/// failed call is reported to the caller as is.
pub trait AuthenticityClassifier: Send + Sync {
    fn assess(&self, image: &ImagePayload) -> Result<AuthenticityVerdict, ClassifierError>;
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use approx::assert_relative_eq;
    use image::{DynamicImage, GrayImage};

    use super::*;

    fn png_bytes(shade: u8) -> Vec<u8> {
        let img = GrayImage::from_pixel(4, 4, image::Luma([shade]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn payload_sniffs_png() {
        let payload = ImagePayload::from_bytes(png_bytes(10)).unwrap();
        assert_eq!(payload.media_type(), "image/png");
        assert_eq!(payload.sha256().len(), 64);
        assert!(payload.sha256().chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        assert!(!payload.is_empty());
    }

    #[test]
    fn digest_tracks_content() {
        let a = ImagePayload::from_bytes(png_bytes(10)).unwrap();
        let b = ImagePayload::from_bytes(png_bytes(10)).unwrap();
        let c = ImagePayload::from_bytes(png_bytes(200)).unwrap();
        assert_eq!(a.sha256(), b.sha256());
        assert_ne!(a.sha256(), c.sha256());
    }

    #[test]
    fn payload_rejects_non_images() {
        assert_eq!(
            ImagePayload::from_bytes(b"%PDF-1.7 not an image".to_vec()),
            Err(ClassifierError::UnsupportedImage)
        );
        assert_eq!(
            ImagePayload::from_bytes(Vec::new()),
            Err(ClassifierError::UnsupportedImage)
        );
    }

    #[test]
    fn verdict_from_bare_json() {
        let verdict = AuthenticityVerdict::from_response(
            r#"{"is_authentic": true, "confidence": 0.87, "rationale": "Hologram and print quality match"}"#,
        )
        .unwrap();
        assert!(verdict.is_authentic);
        assert_relative_eq!(verdict.confidence, 0.87);
        assert!(verdict.anomalies.is_empty());
    }

    #[test]
    fn verdict_inside_prose_and_fence() {
        let reply = "Here is my assessment:\n```json\n{\n  \"isAuthentic\": false,\n  \"confidence\": 0.4,\n  \"rationale\": \"Blurred lot code\",\n  \"anomalies\": [\"font mismatch\", \"missing seal\"]\n}\n```\nLet me know if you need more.";
        let verdict = AuthenticityVerdict::from_response(reply).unwrap();
        assert!(!verdict.is_authentic);
        assert_relative_eq!(verdict.confidence, 0.4);
        assert_eq!(verdict.anomalies, vec!["font mismatch", "missing seal"]);
    }

    #[test]
    fn verdict_rejects_out_of_range_confidence() {
        let err = AuthenticityVerdict::from_response(
            r#"{"is_authentic": true, "confidence": 1.5, "rationale": "sure"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidResponse(msg) if msg.contains("1.5")));

        assert!(AuthenticityVerdict::from_response(
            r#"{"is_authentic": true, "confidence": -0.1, "rationale": "sure"}"#
        )
        .is_err());
    }

    #[test]
    fn verdict_rejects_missing_object_or_fields() {
        assert!(matches!(
            AuthenticityVerdict::from_response("I cannot tell."),
            Err(ClassifierError::InvalidResponse(_))
        ));
        assert!(matches!(
            AuthenticityVerdict::from_response(r#"{"confidence": 0.5}"#),
            Err(ClassifierError::InvalidResponse(_))
        ));
    }
}
