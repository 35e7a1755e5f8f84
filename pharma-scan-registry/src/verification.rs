use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use pharma_scan_core::ScanOutcome;
use serde::Serialize;

use crate::authenticity::{AuthenticityClassifier, AuthenticityVerdict, ImagePayload};
use crate::models::error::{ClassifierError, RegistryError};
use crate::models::product::{NewProduct, Product};
use crate::models::serial::SerialNumber;
use crate::payload::parse_scanned_text;
use crate::store::ProductStore;

/// Result of checking a serial against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verification {
    Registered { product: Product, expired: bool },
    NotRegistered { serial: SerialNumber },
}

impl Verification {
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered { .. })
    }

    pub fn serial(&self) -> &SerialNumber {
        match self {
            Self::Registered { product, .. } => &product.serial_number,
            Self::NotRegistered { serial } => serial,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Registered { product, expired: false } => {
                format!("{} by {} is registered", product.name, product.manufacturer)
            }
            Self::Registered { product, expired: true } => {
                format!("{} is registered but past its expiry date", product.name)
            }
            Self::NotRegistered { serial } => {
                format!("Serial {} is not in the registry", serial)
            }
        }
    }
}

/// Registration and verification service over a product store.
pub struct Registry<S: ProductStore> {
    store: S,
    classifier: Option<Arc<dyn AuthenticityClassifier>>,
}

impl<S: ProductStore> Registry<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            classifier: None,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn AuthenticityClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn register(&self, form: NewProduct) -> Result<Product, RegistryError> {
        let product = form.validate(Utc::now())?;
        self.store.insert(product.clone())?;
        info!(
            "Registered {} ({}, {})",
            product.serial_number, product.name, product.manufacturer
        );
        Ok(product)
    }

    pub fn products(&self) -> Result<Vec<Product>, RegistryError> {
        self.store.list()
    }

    /// Look up a typed-in serial.
    pub fn lookup(&self, raw_serial: &str) -> Result<Verification, RegistryError> {
        self.lookup_on(raw_serial, today())
    }

    pub fn lookup_on(&self, raw_serial: &str, today: NaiveDate) -> Result<Verification, RegistryError> {
        let serial = SerialNumber::parse(raw_serial)?;
        self.verify_serial(serial, today)
    }

    /// Look up the serial carried by decoded symbol text, which may be a
    /// GS1 element string rather than a bare serial.
    pub fn verify_scanned(&self, text: &str) -> Result<Verification, RegistryError> {
        self.verify_scanned_on(text, today())
    }

    pub fn verify_scanned_on(&self, text: &str, today: NaiveDate) -> Result<Verification, RegistryError> {
        let payload = parse_scanned_text(text);
        let serial = payload.serial_number()?;
        if let Some(gtin) = &payload.gtin {
            debug!("Scanned code for {} carries GTIN {}", serial, gtin);
        }
        self.verify_serial(serial, today)
    }

    /// Verify a scan outcome. Returns `None` for anything but a decode.
    pub fn verify_outcome(&self, outcome: &ScanOutcome) -> Option<Result<Verification, RegistryError>> {
        outcome.decoded_text().map(|text| self.verify_scanned(text))
    }

    /// Run one authenticity check on an uploaded photo. No retry is made.
    pub fn assess_image(&self, data: Vec<u8>) -> Result<AuthenticityVerdict, ClassifierError> {
        let classifier = self.classifier.as_ref().ok_or(ClassifierError::NotConfigured)?;
        let image = ImagePayload::from_bytes(data)?;
        debug!(
            "Assessing {} image ({} bytes, sha256 {})",
            image.media_type(),
            image.len(),
            image.sha256()
        );
        match classifier.assess(&image) {
            Ok(verdict) => {
                verdict.validate()?;
                info!(
                    "Authenticity verdict for {}: authentic={} confidence={:.2}",
                    image.sha256(),
                    verdict.is_authentic,
                    verdict.confidence
                );
                Ok(verdict)
            }
            Err(e) => {
                warn!("Authenticity check failed: {}", e);
                Err(e)
            }
        }
    }

    fn verify_serial(&self, serial: SerialNumber, today: NaiveDate) -> Result<Verification, RegistryError> {
        match self.store.find_by_serial(&serial)? {
            Some(product) => {
                let expired = product.is_expired_on(today);
                Ok(Verification::Registered { product, expired })
            }
            None => {
                info!("Serial {} is not registered", serial);
                Ok(Verification::NotRegistered { serial })
            }
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
