//! Settings loading: defaults, then TOML files, then environment, then CLI flags.

use std::path::{Path, PathBuf};

use config::{Environment, File, FileFormat};

use crate::error::Result;
use crate::model::settings::Settings;

pub const DEFAULT_CONFIG_FILE: &str = "blocklate.toml";
pub const ENV_PREFIX: &str = "BLOCKLATE";

/// Builder over the `config` crate that produces [`Settings`].
pub struct SettingsLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_prefix: Option<String>,
    files: Vec<PathBuf>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: config::Config::builder(),
            env_prefix: None,
            files: Vec::new(),
        }
    }

    #[must_use]
    pub fn add_toml_file(mut self, path: impl AsRef<Path>) -> Self {
        let p = path.as_ref();
        self.builder = self
            .builder
            .add_source(File::from(p).format(FileFormat::Toml).required(true));
        self.files.push(p.to_path_buf());
        self
    }

    #[must_use]
    pub fn add_toml_file_optional(mut self, path: impl AsRef<Path>) -> Self {
        let p = path.as_ref();
        self.builder = self
            .builder
            .add_source(File::from(p).format(FileFormat::Toml).required(false));
        if p.exists() {
            self.files.push(p.to_path_buf());
        }
        self
    }

    #[cfg(test)]
    #[must_use]
    pub fn add_toml_str(mut self, content: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(content, FileFormat::Toml));
        self
    }

    /// `BLOCKLATE_TARGET_LANG=de`, `BLOCKLATE_TRANSLATOR__API_KEY=...`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    #[cfg(test)]
    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn build(self) -> Result<Settings> {
        let builder = match &self.env_prefix {
            Some(prefix) => self.builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__"),
            ),
            None => self.builder,
        };
        let settings: Settings = builder.build()?.try_deserialize()?;
        tracing::debug!(files = ?self.files, lang = %settings.target_lang, "settings loaded");
        Ok(settings)
    }
}

/// Loads settings the way the binary does: `--config` file (required) or
/// `blocklate.toml` in the working directory (optional), then the environment.
pub fn load(config_file: Option<&Path>) -> Result<Settings> {
    let loader = match config_file {
        Some(path) => SettingsLoader::new().add_toml_file(path),
        None => SettingsLoader::new().add_toml_file_optional(DEFAULT_CONFIG_FILE),
    };
    loader.with_env_prefix(ENV_PREFIX).build()
}

/// Command-line values that win over every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub lang: Option<String>,
    pub cache: Option<String>,
    pub no_cache: bool,
    pub workers: Option<usize>,
}

impl Overrides {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(lang) = &self.lang {
            settings.target_lang = lang.clone();
        }
        if let Some(cache) = &self.cache {
            settings.cache_path = cache.clone();
        }
        if self.no_cache {
            settings.no_cache = true;
        }
        if let Some(workers) = self.workers {
            settings.workers = workers.max(1);
        }
    }
}
