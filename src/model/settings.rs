use serde::{Deserialize, Serialize};

fn default_target_lang() -> String {
    "ru".to_string()
}

fn default_cache_path() -> String {
    "translation_cache.db".to_string()
}

fn default_memory_capacity() -> usize {
    10_000
}

fn default_max_batch_length() -> usize {
    4000
}

fn default_separator() -> String {
    " |SEPARATOR| ".to_string()
}

fn default_batch_delay_ms() -> u64 {
    300
}

fn default_workers() -> usize {
    3
}

fn default_backend() -> String {
    "google".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Engine settings. Every field has a default so a missing config file is fine.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_target_lang", alias = "lang")]
    pub target_lang: String,

    /// Minecraft resource locale for output files; derived from `target_lang` when empty.
    #[serde(default)]
    pub locale: String,

    #[serde(default = "default_cache_path")]
    pub cache_path: String,

    #[serde(default)]
    pub no_cache: bool,

    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    #[serde(default = "default_max_batch_length")]
    pub max_batch_length: usize,

    #[serde(default = "default_separator")]
    pub separator: String,

    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub strict_format_codes: bool,

    /// JSON terminology file applied after translation; empty means none.
    #[serde(default)]
    pub glossary: String,

    /// Translate the strings of every jar in one pass before building the archives.
    #[serde(default)]
    pub preload_jars: bool,

    /// Name translated jars like their source instead of `<stem>_<lang>.jar`.
    #[serde(default)]
    pub replace_original: bool,

    #[serde(default)]
    pub translator: TranslatorSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslatorSettings {
    #[serde(default = "default_backend", alias = "provider")]
    pub backend: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub model: String,

    /// Overrides the backend's built-in endpoint.
    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        TranslatorSettings {
            backend: default_backend(),
            api_key: String::new(),
            model: String::new(),
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            target_lang: default_target_lang(),
            locale: String::new(),
            cache_path: default_cache_path(),
            no_cache: false,
            memory_capacity: default_memory_capacity(),
            max_batch_length: default_max_batch_length(),
            separator: default_separator(),
            batch_delay_ms: default_batch_delay_ms(),
            workers: default_workers(),
            strict_format_codes: false,
            glossary: String::new(),
            preload_jars: false,
            replace_original: false,
            translator: TranslatorSettings::default(),
        }
    }
}

impl Settings {
    /// Resource locale for `lang`: `ru` -> `ru_ru`, `pt-BR` -> `pt_br`.
    pub fn locale_for(&self, lang: &str) -> String {
        if !self.locale.trim().is_empty() && lang == self.target_lang {
            return self.locale.trim().to_lowercase();
        }
        locale_from_lang(lang)
    }
}

pub fn locale_from_lang(lang: &str) -> String {
    let lang = lang.trim().to_lowercase().replace('-', "_");
    if lang.contains('_') {
        lang
    } else {
        format!("{lang}_{lang}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_is_derived_from_language() {
        assert_eq!(locale_from_lang("ru"), "ru_ru");
        assert_eq!(locale_from_lang("pt-BR"), "pt_br");
        assert_eq!(locale_from_lang("zh_CN"), "zh_cn");
    }

    #[test]
    fn explicit_locale_applies_to_target_lang_only() {
        let settings = Settings {
            locale: "uk_UA".into(),
            target_lang: "uk".into(),
            ..Settings::default()
        };
        assert_eq!(settings.locale_for("uk"), "uk_ua");
        assert_eq!(settings.locale_for("de"), "de_de");
    }

    #[test]
    fn empty_json_gives_defaults() {
        let s: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(s.target_lang, "ru");
        assert_eq!(s.max_batch_length, 4000);
        assert_eq!(s.translator.backend, "google");
    }
}
