use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::RegistryError;

pub const MIN_SERIAL_LEN: usize = 8;
pub const MAX_SERIAL_LEN: usize = 20;

/// A normalized product serial number: 8 to 20 uppercase ASCII
/// alphanumerics.
///
/// Lookups and duplicate checks compare normalized values, so `ab12cd34`
/// and ` AB12CD34 ` name the same product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerialNumber(String);

impl SerialNumber {
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RegistryError::InvalidSerial("serial number is empty".into()));
        }
        if let Some(bad) = trimmed.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(RegistryError::InvalidSerial(format!(
                "unexpected character {bad:?} in {trimmed:?}"
            )));
        }
        let len = trimmed.len();
        if !(MIN_SERIAL_LEN..=MAX_SERIAL_LEN).contains(&len) {
            return Err(RegistryError::InvalidSerial(format!(
                "expected {MIN_SERIAL_LEN} to {MAX_SERIAL_LEN} characters, got {len}"
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SerialNumber {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SerialNumber {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SerialNumber> for String {
    fn from(serial: SerialNumber) -> Self {
        serial.0
    }
}

impl AsRef<str> for SerialNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
