use std::collections::HashMap;

use parking_lot::RwLock;

use super::{sort_by_registration, ProductStore};
use crate::models::error::RegistryError;
use crate::models::product::Product;
use crate::models::serial::SerialNumber;

/// In-process store. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    products: RwLock<HashMap<SerialNumber, Product>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.products.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.read().is_empty()
    }
}

impl ProductStore for MemoryStore {
    fn find_by_serial(&self, serial: &SerialNumber) -> Result<Option<Product>, RegistryError> {
        Ok(self.products.read().get(serial).cloned())
    }

    fn insert(&self, product: Product) -> Result<(), RegistryError> {
        let mut products = self.products.write();
        if products.contains_key(&product.serial_number) {
            return Err(RegistryError::DuplicateSerial(product.serial_number.to_string()));
        }
        products.insert(product.serial_number.clone(), product);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Product>, RegistryError> {
        let mut all: Vec<Product> = self.products.read().values().cloned().collect();
        sort_by_registration(&mut all);
        Ok(all)
    }
}
