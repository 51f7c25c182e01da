// ============================================================
// CSV TEXT DECODING
// ============================================================
// Try a fixed list of encodings, first clean decode wins

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::domain::error::{AppError, Result};

/// Candidate text encodings for uploaded CSV bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvEncoding {
    /// BOM-sniffed, UTF-8 otherwise
    SystemDefault,
    Utf8,
    /// UTF-8 with a leading signature (BOM) removed
    Utf8Sig,
    Latin1,
    Windows1252,
}

/// Preference order. Latin-1 maps every byte, so later entries only matter
/// if that decoder is ever made strict.
pub const ENCODING_PREFERENCE: [CsvEncoding; 5] = [
    CsvEncoding::SystemDefault,
    CsvEncoding::Utf8,
    CsvEncoding::Utf8Sig,
    CsvEncoding::Latin1,
    CsvEncoding::Windows1252,
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

impl CsvEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            CsvEncoding::SystemDefault => "default",
            CsvEncoding::Utf8 => "utf-8",
            CsvEncoding::Utf8Sig => "utf-8-sig",
            CsvEncoding::Latin1 => "latin-1",
            CsvEncoding::Windows1252 => "windows-1252",
        }
    }

    /// Decode without replacement characters; `None` on any invalid sequence.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            CsvEncoding::SystemDefault => match Encoding::for_bom(bytes) {
                Some((encoding, bom_len)) => encoding
                    .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
                    .map(|text| text.into_owned()),
                None => UTF_8
                    .decode_without_bom_handling_and_without_replacement(bytes)
                    .map(|text| text.into_owned()),
            },
            CsvEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            CsvEncoding::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(str::to_string)
            }
            CsvEncoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
            CsvEncoding::Windows1252 => WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
        }
    }
}

/// Decode CSV bytes with the first encoding in `ENCODING_PREFERENCE` that succeeds.
pub fn decode_csv_bytes(bytes: &[u8]) -> Result<(String, CsvEncoding)> {
    for encoding in ENCODING_PREFERENCE {
        if let Some(text) = encoding.decode(bytes) {
            tracing::debug!("Decoded CSV as {}", encoding.label());
            return Ok((text, encoding));
        }
        tracing::debug!("CSV is not valid {}", encoding.label());
    }

    let tried: Vec<&str> = ENCODING_PREFERENCE[1..].iter().map(|e| e.label()).collect();
    Err(AppError::ParseError(format!(
        "Could not decode CSV using encodings {}",
        tried.join(", ")
    )))
}
