use reqwest::blocking::Client;
use serde_json::{json, Value};

use super::{retry, Translator};
use crate::error::{CoreError, Result};

fn endpoint_for(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some("https://api.openai.com/v1/chat/completions"),
        "deepseek" => Some("https://api.deepseek.com/v1/chat/completions"),
        _ => None,
    }
}

/// OpenAI-compatible chat-completions backend.
pub struct ChatTranslator {
    client: Client,
    provider: String,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatTranslator {
    pub fn new(client: Client, provider: &str, endpoint: &str, api_key: &str, model: &str) -> Result<Self> {
        let endpoint = if endpoint.trim().is_empty() {
            endpoint_for(provider)
                .ok_or_else(|| CoreError::Config(format!("provider {provider:?} needs translator.endpoint")))?
                .to_string()
        } else {
            endpoint.trim().to_string()
        };
        if api_key.trim().is_empty() {
            return Err(CoreError::Config("translator.api_key is required".into()));
        }
        if model.trim().is_empty() {
            return Err(CoreError::Config("translator.model is required".into()));
        }

        Ok(ChatTranslator {
            client,
            provider: provider.to_string(),
            endpoint,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

impl Translator for ChatTranslator {
    fn name(&self) -> &str {
        &self.provider
    }

    fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt() },
                { "role": "user", "content": build_prompt(text, target_lang) }
            ],
            "temperature": 0.3
        });

        let text = retry::send_with_retry(|| {
            self.client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
        })?;
        parse_response(&text)
    }
}

fn system_prompt() -> &'static str {
    "You are a professional Minecraft mod and quest translator. \
     Keep every ^^*^^ token and every |SEPARATOR| marker exactly where it belongs. \
     Answer with the translation only."
}

fn build_prompt(text: &str, target_lang: &str) -> String {
    format!("Translate from English to {target_lang}.\nText:\n{text}")
}

pub fn parse_response(body: &str) -> Result<String> {
    let v: Value = serde_json::from_str(body)?;
    v.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|t| t.trim().to_string())
        .ok_or_else(|| CoreError::Api {
            status: 200,
            message: "Invalid AI response: missing choices[0].message.content".into(),
        })
}
