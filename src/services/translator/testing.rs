use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::Translator;
use crate::error::{CoreError, Result};

pub const SEPARATOR: &str = " |SEPARATOR| ";

/// Scripted translator. Known strings come from the dictionary, unknown ones get a
/// `[lang] ` prefix. Batches joined with [`SEPARATOR`] are translated part by part.
#[derive(Default)]
pub struct FakeTranslator {
    dict: HashMap<String, String>,
    failing: HashSet<String>,
    fail_all: bool,
    mangle_separator: bool,
    drop_tokens: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, from: &str, to: &str) -> Self {
        self.dict.insert(from.to_string(), to.to_string());
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    pub fn failing_always(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Corrupts the separator whenever a batch has more than one part.
    pub fn mangling_separator(mut self) -> Self {
        self.mangle_separator = true;
        self
    }

    pub fn dropping_tokens(mut self) -> Self {
        self.drop_tokens = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn one(&self, part: &str, lang: &str) -> Result<String> {
        if self.failing.contains(part) {
            return Err(CoreError::Api {
                status: 500,
                message: format!("cannot translate {part:?}"),
            });
        }
        let out = match self.dict.get(part) {
            Some(t) => t.clone(),
            None => format!("[{lang}] {part}"),
        };
        if self.drop_tokens {
            return Ok(out.replacen(crate::services::guard::CODE_TOKEN, "", 1));
        }
        Ok(out)
    }
}

impl Translator for FakeTranslator {
    fn name(&self) -> &str {
        "fake"
    }

    fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail_all {
            return Err(CoreError::Api {
                status: 503,
                message: "service unavailable".into(),
            });
        }

        let parts: Vec<&str> = text.split(SEPARATOR).collect();
        let translated = parts
            .iter()
            .map(|p| self.one(p, target_lang))
            .collect::<Result<Vec<_>>>()?;

        if self.mangle_separator && translated.len() > 1 {
            return Ok(translated.join(" | SEPARATOR | "));
        }
        Ok(translated.join(SEPARATOR))
    }
}

/// Pipeline over `fake` with an in-memory cache and no delay between batches.
pub fn fake_pipeline(fake: std::sync::Arc<FakeTranslator>) -> crate::services::pipeline::Pipeline {
    use crate::services::cache::TranslationCache;
    use crate::services::pipeline::{Pipeline, PipelineOptions};

    let options = PipelineOptions {
        batch_delay: std::time::Duration::ZERO,
        ..PipelineOptions::default()
    };
    Pipeline::new(fake, std::sync::Arc::new(TranslationCache::in_memory(100)), options)
}
