pub mod chat;
pub mod google;
pub mod retry;

#[cfg(test)]
pub mod testing;

use reqwest::blocking::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::model::settings::TranslatorSettings;

/// Machine translation capability. Implementations block the calling thread.
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    fn translate(&self, text: &str, target_lang: &str) -> Result<String>;
}

pub fn from_settings(cfg: &TranslatorSettings) -> Result<Arc<dyn Translator>> {
    let client = Client::builder()
        .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
        .build()?;

    let backend = cfg.backend.trim().to_lowercase();
    match backend.as_str() {
        "google" | "" => Ok(Arc::new(google::GoogleTranslator::new(client, Some(&cfg.endpoint)))),
        "openai" | "deepseek" | "custom" => Ok(Arc::new(chat::ChatTranslator::new(
            client,
            &backend,
            &cfg.endpoint,
            &cfg.api_key,
            &cfg.model,
        )?)),
        other => Err(CoreError::Config(format!("unsupported translator backend {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_configured_backend() {
        let cfg = TranslatorSettings::default();
        assert_eq!(from_settings(&cfg).unwrap().name(), "google");

        let cfg = TranslatorSettings {
            backend: "DeepSeek".into(),
            api_key: "k".into(),
            model: "deepseek-chat".into(),
            ..TranslatorSettings::default()
        };
        assert_eq!(from_settings(&cfg).unwrap().name(), "deepseek");
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let cfg = TranslatorSettings {
            backend: "babelfish".into(),
            ..TranslatorSettings::default()
        };
        assert!(matches!(from_settings(&cfg), Err(CoreError::Config(_))));
    }
}
