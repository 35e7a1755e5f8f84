use std::fmt;

use serde::{Deserialize, Serialize};

/// Symbol families a decoder can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolFormat {
    #[serde(rename = "EAN_13")]
    Ean13,
    #[serde(rename = "EAN_8")]
    Ean8,
    #[serde(rename = "UPC_A")]
    UpcA,
    #[serde(rename = "UPC_E")]
    UpcE,
    #[serde(rename = "CODE_128")]
    Code128,
    #[serde(rename = "CODE_39")]
    Code39,
    #[serde(rename = "CODE_93")]
    Code93,
    #[serde(rename = "CODABAR")]
    Codabar,
    #[serde(rename = "ITF")]
    Itf,
    #[serde(rename = "QR_CODE")]
    QrCode,
    #[serde(rename = "DATA_MATRIX")]
    DataMatrix,
    #[serde(rename = "PDF_417")]
    Pdf417,
    #[serde(rename = "AZTEC")]
    Aztec,
}

impl SymbolFormat {
    pub const ALL: [SymbolFormat; 13] = [
        Self::Ean13,
        Self::Ean8,
        Self::UpcA,
        Self::UpcE,
        Self::Code128,
        Self::Code39,
        Self::Code93,
        Self::Codabar,
        Self::Itf,
        Self::QrCode,
        Self::DataMatrix,
        Self::Pdf417,
        Self::Aztec,
    ];

    /// 2D matrix symbologies; everything else is a linear barcode.
    pub fn is_matrix(&self) -> bool {
        matches!(self, Self::QrCode | Self::DataMatrix | Self::Pdf417 | Self::Aztec)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ean13 => "EAN_13",
            Self::Ean8 => "EAN_8",
            Self::UpcA => "UPC_A",
            Self::UpcE => "UPC_E",
            Self::Code128 => "CODE_128",
            Self::Code39 => "CODE_39",
            Self::Code93 => "CODE_93",
            Self::Codabar => "CODABAR",
            Self::Itf => "ITF",
            Self::QrCode => "QR_CODE",
            Self::DataMatrix => "DATA_MATRIX",
            Self::Pdf417 => "PDF_417",
            Self::Aztec => "AZTEC",
        }
    }

    fn bit(&self) -> u16 {
        1 << (*self as u16)
    }
}

impl fmt::Display for SymbolFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Explicit allow-list of symbol formats a session accepts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FormatSet(u16);

impl FormatSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn of(formats: &[SymbolFormat]) -> Self {
        formats.iter().fold(Self::empty(), |set, f| set.with(*f))
    }

    /// Retail linear codes plus the matrix codes used on pharma packs.
    pub fn retail_and_matrix() -> Self {
        Self::of(&[
            SymbolFormat::Ean13,
            SymbolFormat::Ean8,
            SymbolFormat::UpcA,
            SymbolFormat::UpcE,
            SymbolFormat::Code128,
            SymbolFormat::Code39,
            SymbolFormat::QrCode,
            SymbolFormat::DataMatrix,
        ])
    }

    pub fn with(self, format: SymbolFormat) -> Self {
        Self(self.0 | format.bit())
    }

    pub fn contains(&self, format: SymbolFormat) -> bool {
        self.0 & format.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = SymbolFormat> + '_ {
        SymbolFormat::ALL.into_iter().filter(|f| self.contains(*f))
    }
}

impl fmt::Debug for FormatSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<SymbolFormat> for FormatSet {
    fn from_iter<I: IntoIterator<Item = SymbolFormat>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |set, f| set.with(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_membership() {
        let set = FormatSet::of(&[SymbolFormat::Code128, SymbolFormat::QrCode]);
        assert!(set.contains(SymbolFormat::Code128));
        assert!(set.contains(SymbolFormat::QrCode));
        assert!(!set.contains(SymbolFormat::Ean13));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn iteration_follows_declaration_order() {
        let set: FormatSet = [SymbolFormat::DataMatrix, SymbolFormat::Ean8].into_iter().collect();
        let formats: Vec<_> = set.iter().collect();
        assert_eq!(formats, vec![SymbolFormat::Ean8, SymbolFormat::DataMatrix]);
    }

    #[test]
    fn default_set_has_linear_and_matrix_codes() {
        let set = FormatSet::retail_and_matrix();
        assert!(set.iter().any(|f| f.is_matrix()));
        assert!(set.iter().any(|f| !f.is_matrix()));
        assert!(!set.contains(SymbolFormat::Aztec));
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&SymbolFormat::Code128).unwrap();
        assert_eq!(json, "\"CODE_128\"");
        let parsed: SymbolFormat = serde_json::from_str("\"DATA_MATRIX\"").unwrap();
        assert_eq!(parsed, SymbolFormat::DataMatrix);
    }
}
