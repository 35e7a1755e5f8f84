use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use parking_lot::RwLock;

use super::{sort_by_registration, ProductStore};
use crate::models::error::RegistryError;
use crate::models::product::Product;
use crate::models::serial::SerialNumber;

/// Store backed by a single pretty-printed JSON array on disk.
///
/// The whole registry is held in memory and rewritten on every insert. Writes
/// go to `{path}.tmp` first and are renamed over the target, so a crash
/// mid-write leaves the previous file intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    products: RwLock<BTreeMap<SerialNumber, Product>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty registry; it is
    /// created on the first insert.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let products = if path.exists() {
            load(&path)?
        } else {
            debug!("Registry file {} does not exist yet", path.display());
            BTreeMap::new()
        };
        info!(
            "Opened registry {} with {} product(s)",
            path.display(),
            products.len()
        );
        Ok(Self {
            path,
            products: RwLock::new(products),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, products: &BTreeMap<SerialNumber, Product>) -> Result<(), RegistryError> {
        let mut ordered: Vec<Product> = products.values().cloned().collect();
        sort_by_registration(&mut ordered);
        let json = serde_json::to_string_pretty(&ordered)
            .map_err(|e| RegistryError::Storage(format!("failed to serialize registry: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| RegistryError::Storage(format!("failed to write registry: {}", e)))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            fs::remove_file(&tmp).ok();
            RegistryError::Storage(format!("failed to replace registry: {}", e))
        })?;
        Ok(())
    }
}

fn load(path: &Path) -> Result<BTreeMap<SerialNumber, Product>, RegistryError> {
    let json = fs::read_to_string(path)
        .map_err(|e| RegistryError::Storage(format!("failed to read registry: {}", e)))?;
    if json.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let list: Vec<Product> = serde_json::from_str(&json)
        .map_err(|e| RegistryError::Storage(format!("failed to parse registry: {}", e)))?;

    let mut products = BTreeMap::new();
    for product in list {
        let serial = product.serial_number.clone();
        if products.insert(serial.clone(), product).is_some() {
            return Err(RegistryError::Storage(format!(
                "registry file lists serial {} twice",
                serial
            )));
        }
    }
    Ok(products)
}

impl ProductStore for JsonFileStore {
    fn find_by_serial(&self, serial: &SerialNumber) -> Result<Option<Product>, RegistryError> {
        Ok(self.products.read().get(serial).cloned())
    }

    fn insert(&self, product: Product) -> Result<(), RegistryError> {
        let mut products = self.products.write();
        let serial = product.serial_number.clone();
        if products.contains_key(&serial) {
            return Err(RegistryError::DuplicateSerial(serial.to_string()));
        }
        products.insert(serial.clone(), product);
        if let Err(e) = self.persist(&products) {
            products.remove(&serial);
            return Err(e);
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<Product>, RegistryError> {
        let mut all: Vec<Product> = self.products.read().values().cloned().collect();
        sort_by_registration(&mut all);
        Ok(all)
    }
}
