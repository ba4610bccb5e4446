//! Pattern guard: decides which strings go to the translator and keeps
//! Minecraft formatting codes intact across translation.

use regex::Regex;
use std::sync::LazyLock;

/// Token that stands in for a formatting code while the text is translated.
pub const CODE_TOKEN: &str = "^^*^^";

/// Share of Cyrillic letters at which a string counts as already translated.
const CYRILLIC_THRESHOLD: f32 = 0.3;

const MIN_LEN: usize = 3;

static TECHNICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_.\-]+:[a-z0-9_./\-]+$").unwrap());

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]*\}|%(?:\d+\$)?[-+ 0#]*\d*(?:\.\d+)?[sdfix]|%%").unwrap());

// `\d{1,3}` comes first so `&12` is one code, not `&1` followed by a literal `2`.
static FORMAT_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[&§](?:\d{1,3}|[0-9a-fk-or])").unwrap());

pub fn is_technical_id(text: &str) -> bool {
    TECHNICAL_RE.is_match(text.trim())
}

pub fn has_placeholder(text: &str) -> bool {
    PLACEHOLDER_RE.is_match(text)
}

/// Fraction of alphabetic characters that are Cyrillic; 0.0 when there are no letters.
pub fn cyrillic_ratio(text: &str) -> f32 {
    let mut letters = 0usize;
    let mut cyrillic = 0usize;
    for ch in text.chars().filter(|c| c.is_alphabetic()) {
        letters += 1;
        if ('\u{0400}'..='\u{04FF}').contains(&ch) {
            cyrillic += 1;
        }
    }
    if letters == 0 {
        return 0.0;
    }
    cyrillic as f32 / letters as f32
}

/// Why a string is left alone, if it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    TooShort,
    TechnicalId,
    Placeholder,
    AlreadyTranslated,
}

pub fn skip_reason(text: &str) -> Option<SkipReason> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(SkipReason::Empty);
    }
    if trimmed.chars().count() < MIN_LEN {
        return Some(SkipReason::TooShort);
    }
    if is_technical_id(trimmed) {
        return Some(SkipReason::TechnicalId);
    }
    if has_placeholder(trimmed) {
        return Some(SkipReason::Placeholder);
    }
    if cyrillic_ratio(trimmed) >= CYRILLIC_THRESHOLD {
        return Some(SkipReason::AlreadyTranslated);
    }
    None
}

pub fn should_translate(text: &str) -> bool {
    skip_reason(text).is_none()
}

/// Codes lifted out of a string by [`protect`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Protected {
    pub text: String,
    pub codes: Vec<String>,
}

pub fn format_codes(text: &str) -> Vec<&str> {
    FORMAT_CODE_RE.find_iter(text).map(|m| m.as_str()).collect()
}

pub fn protect(text: &str) -> Protected {
    let codes: Vec<String> = format_codes(text).into_iter().map(str::to_string).collect();
    if codes.is_empty() {
        return Protected {
            text: text.to_string(),
            codes,
        };
    }
    let text = FORMAT_CODE_RE.replace_all(text, regex::NoExpand(CODE_TOKEN)).into_owned();
    Protected { text, codes }
}

/// Outcome of putting codes back into translated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub text: String,
    /// Tokens found in the translated text.
    pub tokens: usize,
    /// Codes that were lifted out before translation.
    pub codes: usize,
}

impl Restored {
    pub fn is_complete(&self) -> bool {
        self.tokens == self.codes
    }
}

/// Replaces tokens with `codes` in order. Codes without a token are dropped,
/// tokens without a code are removed.
pub fn restore(translated: &str, codes: &[String]) -> Restored {
    let tokens = translated.matches(CODE_TOKEN).count();
    if tokens == 0 {
        return Restored {
            text: translated.to_string(),
            tokens,
            codes: codes.len(),
        };
    }

    let mut out = String::with_capacity(translated.len());
    let mut parts = translated.split(CODE_TOKEN);
    if let Some(first) = parts.next() {
        out.push_str(first);
    }
    for (i, part) in parts.enumerate() {
        if let Some(code) = codes.get(i) {
            out.push_str(code);
        }
        out.push_str(part);
    }

    Restored {
        text: out,
        tokens,
        codes: codes.len(),
    }
}
