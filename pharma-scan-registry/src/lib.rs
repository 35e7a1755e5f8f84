//! # pharma-scan-registry
//!
//! The registry side of serial scanning: what a decoded code is checked
//! against once `pharma-scan-core` has produced it.
//!
//! ```text
//! pharma-scan-registry (this crate)
//! ├── models/        ← SerialNumber, Product, NewProduct, errors
//! ├── store/         ← ProductStore trait, MemoryStore, JsonFileStore
//! ├── payload        ← GS1 / AIM parsing of decoded text
//! ├── authenticity   ← ImagePayload, AuthenticityVerdict, AuthenticityClassifier
//! └── verification   ← Registry service
//! ```

pub mod authenticity;
pub mod models;
pub mod payload;
pub mod store;
pub mod verification;

pub use authenticity::{AuthenticityClassifier, AuthenticityVerdict, ImagePayload};
pub use models::error::{ClassifierError, RegistryError};
pub use models::product::{NewProduct, Product};
pub use models::serial::SerialNumber;
pub use payload::{parse_scanned_text, ScannedPayload};
pub use store::json_file::JsonFileStore;
pub use store::memory::MemoryStore;
pub use store::ProductStore;
pub use verification::{Registry, Verification};
