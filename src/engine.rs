use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::model::report::{JobReport, TranslationStats};
use crate::model::settings::Settings;
use crate::services::cache::TranslationCache;
use crate::services::control::RunContext;
use crate::services::glossary::Glossary;
use crate::services::jar::{self, JarSurvey};
use crate::services::pipeline::{Pipeline, PipelineOptions};
use crate::services::translator::{self, Translator};
use crate::services::worker::{self, Job};

/// Everything a command needs: settings plus the shared cache and translator.
pub struct Engine {
    settings: Settings,
    pipeline: Pipeline,
}

impl Engine {
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let cache = if settings.no_cache {
            TranslationCache::in_memory(settings.memory_capacity)
        } else {
            TranslationCache::open(&settings.cache_path, settings.memory_capacity)
        };
        let glossary = match settings.glossary.trim() {
            "" => Glossary::default(),
            path => Glossary::load(Path::new(path))?,
        };
        let translator = translator::from_settings(&settings.translator)?;
        Ok(Self::assemble(settings, translator, Arc::new(cache), glossary))
    }

    pub fn with_parts(settings: Settings, translator: Arc<dyn Translator>, cache: Arc<TranslationCache>) -> Self {
        Self::assemble(settings, translator, cache, Glossary::default())
    }

    fn assemble(
        settings: Settings,
        translator: Arc<dyn Translator>,
        cache: Arc<TranslationCache>,
        glossary: Glossary,
    ) -> Self {
        tracing::info!(
            translator = translator.name(),
            lang = %settings.target_lang,
            degraded_cache = cache.is_degraded(),
            glossary_terms = glossary.len(),
            "engine ready"
        );
        let options = PipelineOptions {
            glossary,
            ..PipelineOptions::from_settings(&settings)
        };
        let pipeline = Pipeline::new(translator, cache, options);
        Engine { settings, pipeline }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Requested language, or the configured one when none or a blank one is given.
    pub fn lang<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(l) if !l.trim().is_empty() => l.trim(),
            _ => &self.settings.target_lang,
        }
    }

    pub fn translate_texts<S: AsRef<str>>(
        &self,
        texts: &[S],
        lang: Option<&str>,
        run: &RunContext,
    ) -> (Vec<String>, TranslationStats) {
        self.pipeline.batch_translate(texts, self.lang(lang), run)
    }

    /// Sorts jars by whether they still need a translation into `lang`.
    pub fn analyze_jars(&self, jars: &[PathBuf], lang: Option<&str>) -> JarSurvey {
        let locale = self.settings.locale_for(self.lang(lang));
        jar::survey(jars, &locale)
    }

    /// Translates the distinct strings of all `jars` in one pass so the
    /// per-jar jobs that follow are served from the cache.
    pub fn preload_jars(&self, jars: &[PathBuf], lang: Option<&str>, run: &RunContext) -> TranslationStats {
        let lang = self.lang(lang);
        let strings = jar::collect_unique_strings(jars, &self.settings.locale_for(lang));
        tracing::info!(jars = jars.len(), strings = strings.len(), "preloading jar strings");
        self.pipeline.batch_translate(&strings, lang, run).1
    }

    pub fn run_jobs(
        &self,
        jobs: Vec<Job>,
        lang: Option<&str>,
        workers: Option<usize>,
        run: &RunContext,
    ) -> Vec<JobReport> {
        let lang = self.lang(lang);
        let locale = self.settings.locale_for(lang);
        let workers = workers.unwrap_or(self.settings.workers);
        worker::run_jobs(jobs, workers, &self.pipeline, lang, &locale, run)
    }
}
