//! Extraction of registry identifiers from decoded symbol text.
//!
//! Pharmaceutical packs usually carry a GS1 element string (GTIN, expiry,
//! batch and serial) rather than a bare serial. Scanners may prefix it with
//! an AIM symbology identifier and separate variable-length fields with the
//! ASCII group separator. Anything that does not parse as GS1 is taken
//! verbatim as the serial candidate.

use chrono::NaiveDate;
use log::debug;

use crate::models::error::RegistryError;
use crate::models::serial::SerialNumber;

const GROUP_SEPARATOR: char = '\u{1d}';

/// AIM identifiers announcing GS1 data (DataMatrix, Code 128, QR, DataBar).
const GS1_SYMBOLOGY_IDS: [&str; 4] = ["]d2", "]C1", "]Q3", "]e0"];

/// Fields recovered from one scanned code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedPayload {
    pub gtin: Option<String>,
    pub expiry: Option<NaiveDate>,
    pub batch: Option<String>,
    pub serial: Option<String>,
}

impl ScannedPayload {
    /// The normalized serial, if the code carried a valid one.
    pub fn serial_number(&self) -> Result<SerialNumber, RegistryError> {
        match &self.serial {
            Some(serial) => SerialNumber::parse(serial),
            None => Err(RegistryError::InvalidSerial(
                "scanned code carries no serial number".into(),
            )),
        }
    }

    /// Apply one application identifier. Returns false for identifiers this
    /// parser does not know and for malformed fixed-length values.
    fn apply(&mut self, ai: &str, value: &str) -> bool {
        match ai {
            "01" if value.len() == 14 && value.bytes().all(|b| b.is_ascii_digit()) => {
                self.gtin = Some(value.to_string());
                true
            }
            "17" => match parse_gs1_date(value) {
                Some(date) => {
                    self.expiry = Some(date);
                    true
                }
                None => false,
            },
            "10" => {
                self.batch = Some(value.to_string());
                true
            }
            "21" => {
                self.serial = Some(value.to_string());
                true
            }
            _ => false,
        }
    }
}

/// Parse decoded symbol text into registry identifiers.
pub fn parse_scanned_text(text: &str) -> ScannedPayload {
    let (symbology, body) = split_symbology_id(text);
    let body = body
        .trim_matches(|c: char| c != GROUP_SEPARATOR && c.is_whitespace())
        .trim_start_matches(GROUP_SEPARATOR);

    if body.starts_with('(') {
        if let Some(payload) = parse_bracketed(body) {
            return payload;
        }
    }

    let announced = symbology.is_some_and(|id| GS1_SYMBOLOGY_IDS.contains(&id));
    if announced || body.contains(GROUP_SEPARATOR) {
        if let Some(payload) = parse_element_string(body) {
            return payload;
        }
        debug!("Scanned text is not a GS1 element string, using it verbatim");
    }

    ScannedPayload {
        serial: Some(body.trim_end_matches(GROUP_SEPARATOR).to_string()),
        ..Default::default()
    }
}

fn split_symbology_id(text: &str) -> (Option<&str>, &str) {
    match (text.get(..3), text.get(3..)) {
        (Some(id), Some(rest)) if id.starts_with(']') => (Some(id), rest),
        _ => (None, text),
    }
}

/// Human-readable form: `(01)09506000134352(17)261231(21)ABC123`.
fn parse_bracketed(body: &str) -> Option<ScannedPayload> {
    let mut payload = ScannedPayload::default();
    let mut recognized = false;
    let mut rest = body;

    while !rest.is_empty() {
        let open = rest.strip_prefix('(')?;
        let close = open.find(')')?;
        let ai = &open[..close];
        let after = &open[close + 1..];
        let end = after.find('(').unwrap_or(after.len());
        recognized |= payload.apply(ai, &after[..end]);
        rest = &after[end..];
    }

    recognized.then_some(payload)
}

/// Raw form: fixed-length fields run together, variable-length fields end
/// at a group separator or the end of the data.
fn parse_element_string(body: &str) -> Option<ScannedPayload> {
    let mut payload = ScannedPayload::default();
    let mut recognized = false;
    let mut rest = body;

    while !rest.is_empty() {
        let ai = rest.get(..2)?;
        let after = &rest[2..];
        let consumed = match ai {
            "01" | "17" => {
                let len = if ai == "01" { 14 } else { 6 };
                let value = after.get(..len)?;
                if !payload.apply(ai, value) {
                    return None;
                }
                len
            }
            "10" | "21" => {
                let end = after.find(GROUP_SEPARATOR).unwrap_or(after.len());
                payload.apply(ai, &after[..end]);
                end
            }
            _ => {
                debug!("Stopping at unsupported application identifier {ai}");
                break;
            }
        };
        recognized = true;
        rest = after[consumed..].trim_start_matches(GROUP_SEPARATOR);
    }

    recognized.then_some(payload)
}

/// GS1 YYMMDD. Day `00` means the last day of the month.
fn parse_gs1_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = 2000 + value[0..2].parse::<i32>().ok()?;
    let month = value[2..4].parse::<u32>().ok()?;
    let day = value[4..6].parse::<u32>().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    if day == 0 {
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        return NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt();
    }
    NaiveDate::from_ymd_opt(year, month, day)
}
