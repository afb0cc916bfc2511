// Manual barcode entry
//
// The typed fallback for when the camera path is unavailable or refused.
// Validation is purely local; a rejected entry never changes session state.

use super::error::{ScanError, ScanResult};
use super::types::{BarcodeFormat, DecodeSource, Decoded};

/// Longest supported symbology (EAN-13) caps manual input length
pub const MAX_MANUAL_DIGITS: usize = 13;

/// Validate a typed barcode and synthesize the decoded result.
///
/// Accepts 1 to 13 ASCII digits. The symbology is inferred from the length
/// when it matches one exactly; other lengths carry no format.
pub fn validate(text: &str) -> ScanResult<Decoded> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ScanError::manual("barcode must not be empty"));
    }
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScanError::manual("barcode must contain digits only"));
    }
    if text.len() > MAX_MANUAL_DIGITS {
        return Err(ScanError::manual(format!(
            "barcode must be at most {MAX_MANUAL_DIGITS} digits"
        )));
    }
    let format = match text.len() {
        13 => Some(BarcodeFormat::Ean13),
        8 => Some(BarcodeFormat::Ean8),
        _ => None,
    };
    Ok(Decoded {
        text: text.to_string(),
        format,
        source: DecodeSource::Manual,
    })
}
