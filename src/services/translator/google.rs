use reqwest::blocking::Client;
use serde_json::Value;

use super::{retry, Translator};
use crate::error::{CoreError, Result};

const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Google Translate through the public web endpoint.
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(client: Client, endpoint: Option<&str>) -> Self {
        GoogleTranslator {
            client,
            endpoint: endpoint
                .filter(|e| !e.trim().is_empty())
                .unwrap_or(DEFAULT_ENDPOINT)
                .to_string(),
        }
    }
}

impl Translator for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let body = retry::send_with_retry(|| {
            self.client
                .post(&self.endpoint)
                .query(&[("client", "gtx"), ("sl", "auto"), ("tl", target_lang), ("dt", "t")])
                .form(&[("q", text)])
        })?;
        parse_response(&body)
    }
}

/// The answer is `[[["translated", "source", ...], ...], ...]`; segments are concatenated.
pub fn parse_response(body: &str) -> Result<String> {
    let v: Value = serde_json::from_str(body)?;
    let segments = v
        .get(0)
        .and_then(|s| s.as_array())
        .ok_or_else(|| CoreError::Api {
            status: 200,
            message: "unexpected response shape".into(),
        })?;

    let mut out = String::new();
    for seg in segments {
        if let Some(t) = seg.get(0).and_then(|t| t.as_str()) {
            out.push_str(t);
        }
    }
    Ok(out)
}
