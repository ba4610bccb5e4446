use std::fs;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use serde::Serialize;

use crate::error::Result;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Serialize, PartialEq)]
pub struct EncodingDetectionResult {
    pub best: String,
    pub confidence: f32,
    pub had_bom: bool,
}

/// Guesses the encoding of a quest or lang file.
pub fn detect_bytes(bytes: &[u8]) -> EncodingDetectionResult {
    if bytes.starts_with(UTF8_BOM) {
        return EncodingDetectionResult {
            best: "utf-8".into(),
            confidence: 0.99,
            had_bom: true,
        };
    }
    if std::str::from_utf8(bytes).is_ok() {
        return EncodingDetectionResult {
            best: "utf-8".into(),
            confidence: estimate_confidence(bytes, UTF_8),
            had_bom: false,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);

    EncodingDetectionResult {
        best: encoding.name().to_lowercase(),
        confidence: estimate_confidence(bytes, encoding),
        had_bom: false,
    }
}

pub fn detect_from_file(path: &Path) -> Result<EncodingDetectionResult> {
    Ok(detect_bytes(&fs::read(path)?))
}

/// Decodes file content to text. A UTF-8 BOM is dropped; invalid UTF-8 falls
/// back to the detected legacy encoding (old packs ship cp1252 lang files).
pub fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, had_errors) = encoding.decode(bytes);
    tracing::warn!(encoding = encoding.name(), had_errors, "input is not utf-8, decoded with fallback");
    text.into_owned()
}

pub fn read_text(path: &Path) -> Result<String> {
    Ok(decode(&fs::read(path)?))
}

fn estimate_confidence(bytes: &[u8], encoding: &'static Encoding) -> f32 {
    let (text, _, had_errors) = encoding.decode(bytes);

    if had_errors {
        return 0.35;
    }

    let len = text.len();
    if len < 64 {
        0.55
    } else if len < 512 {
        0.70
    } else if len < 4096 {
        0.82
    } else {
        0.90
    }
}
