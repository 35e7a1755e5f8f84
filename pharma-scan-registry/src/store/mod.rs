pub mod json_file;
pub mod memory;

use crate::models::error::RegistryError;
use crate::models::product::Product;
use crate::models::serial::SerialNumber;

/// Persistent set of registered products, keyed by normalized serial.
///
/// Implementations must be safe to share between threads.
pub trait ProductStore: Send + Sync {
    fn find_by_serial(&self, serial: &SerialNumber) -> Result<Option<Product>, RegistryError>;

    /// Insert a new product. Fails with `DuplicateSerial` if the serial is
    /// already present; the existing record is left untouched.
    fn insert(&self, product: Product) -> Result<(), RegistryError>;

    /// All products, oldest registration first.
    fn list(&self) -> Result<Vec<Product>, RegistryError>;
}

pub(crate) fn sort_by_registration(products: &mut [Product]) {
    products.sort_by(|a, b| {
        a.registered_at
            .cmp(&b.registered_at)
            .then_with(|| a.serial_number.cmp(&b.serial_number))
    });
}
