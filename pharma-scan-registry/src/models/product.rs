use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::RegistryError;
use super::serial::SerialNumber;

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_BATCH_LEN: usize = 50;

/// A registered product unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub serial_number: SerialNumber,
    pub name: String,
    pub manufacturer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacture_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    pub registered_at: DateTime<Utc>,
}

impl Product {
    /// A product is usable through its expiry date and expired the day after.
    pub fn is_expired_on(&self, day: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < day)
    }
}

/// Unvalidated registration form, as submitted by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub serial_number: String,
    pub name: String,
    pub manufacturer: String,
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub manufacture_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

impl NewProduct {
    pub fn new(
        serial_number: impl Into<String>,
        name: impl Into<String>,
        manufacturer: impl Into<String>,
    ) -> Self {
        Self {
            serial_number: serial_number.into(),
            name: name.into(),
            manufacturer: manufacturer.into(),
            ..Default::default()
        }
    }

    pub fn with_batch(mut self, batch: impl Into<String>) -> Self {
        self.batch_number = Some(batch.into());
        self
    }

    pub fn with_dates(mut self, manufactured: Option<NaiveDate>, expires: Option<NaiveDate>) -> Self {
        self.manufacture_date = manufactured;
        self.expiry_date = expires;
        self
    }

    /// Validate the form and build the product record it describes.
    pub fn validate(self, registered_at: DateTime<Utc>) -> Result<Product, RegistryError> {
        let serial_number = SerialNumber::parse(&self.serial_number)?;
        let name = required_text("name", &self.name, MAX_NAME_LEN)?;
        let manufacturer = required_text("manufacturer", &self.manufacturer, MAX_NAME_LEN)?;

        let batch_number = match self.batch_number.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(batch) if batch.chars().count() > MAX_BATCH_LEN => {
                return Err(RegistryError::InvalidProduct(format!(
                    "batch number exceeds {MAX_BATCH_LEN} characters"
                )));
            }
            Some(batch) => Some(batch.to_string()),
        };

        if let (Some(made), Some(expires)) = (self.manufacture_date, self.expiry_date) {
            if expires < made {
                return Err(RegistryError::InvalidProduct(format!(
                    "expiry date {expires} precedes manufacture date {made}"
                )));
            }
        }

        Ok(Product {
            id: Uuid::new_v4(),
            serial_number,
            name,
            manufacturer,
            batch_number,
            manufacture_date: self.manufacture_date,
            expiry_date: self.expiry_date,
            registered_at,
        })
    }
}

fn required_text(field: &str, value: &str, max: usize) -> Result<String, RegistryError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RegistryError::InvalidProduct(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(RegistryError::InvalidProduct(format!(
            "{field} exceeds {max} characters"
        )));
    }
    Ok(value.to_string())
}
