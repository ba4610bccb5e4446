//! Batch translation: filter, cache, pack, translate, restore, write back.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::model::entry::{apply_translations, Outcome, TextEntry};
use crate::model::report::TranslationStats;
use crate::model::settings::Settings;
use crate::services::batch::create_smart_batches;
use crate::services::cache::TranslationCache;
use crate::services::control::RunContext;
use crate::services::glossary::Glossary;
use crate::services::guard::{self, Protected};
use crate::services::translator::Translator;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_batch_length: usize,
    pub separator: String,
    pub batch_delay: Duration,
    pub strict_format_codes: bool,
    /// Applied to every new translation before it is cached.
    pub glossary: Glossary,
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        PipelineOptions {
            max_batch_length: settings.max_batch_length.max(1),
            separator: if settings.separator.trim().is_empty() {
                Settings::default().separator
            } else {
                settings.separator.clone()
            },
            batch_delay: Duration::from_millis(settings.batch_delay_ms),
            strict_format_codes: settings.strict_format_codes,
            glossary: Glossary::default(),
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// A string on its way to the translator: codes lifted out, outer whitespace set aside.
struct Pending {
    source: String,
    protected: Protected,
    lead: String,
    trail: String,
}

impl Pending {
    fn new(source: &str) -> Self {
        let core = source.trim();
        let start = source.len() - source.trim_start().len();
        let end = start + core.len();
        Pending {
            source: source.to_string(),
            protected: guard::protect(core),
            lead: source[..start].to_string(),
            trail: source[end..].to_string(),
        }
    }

    fn text(&self) -> &str {
        &self.protected.text
    }
}

impl AsRef<str> for Pending {
    fn as_ref(&self) -> &str {
        self.text()
    }
}

pub struct Pipeline {
    translator: Arc<dyn Translator>,
    cache: Arc<TranslationCache>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(translator: Arc<dyn Translator>, cache: Arc<TranslationCache>, options: PipelineOptions) -> Self {
        Pipeline {
            translator,
            cache,
            options,
        }
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    #[cfg(test)]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn translator_name(&self) -> &str {
        self.translator.name()
    }

    /// Translates `texts` into `lang`, keeping order. Never fails: anything that
    /// cannot be translated comes back as the original text.
    pub fn batch_translate<S: AsRef<str>>(
        &self,
        texts: &[S],
        lang: &str,
        run: &RunContext,
    ) -> (Vec<String>, TranslationStats) {
        let (outcomes, stats) = self.translate_outcomes(texts, lang, run);
        let out = texts
            .iter()
            .zip(&outcomes)
            .map(|(t, o)| o.text_or(t.as_ref()).to_string())
            .collect();
        (out, stats)
    }

    /// Like [`Pipeline::batch_translate`] but says, per input, whether it was
    /// translated, skipped, failed or never attempted.
    pub fn translate_outcomes<S: AsRef<str>>(
        &self,
        texts: &[S],
        lang: &str,
        run: &RunContext,
    ) -> (Vec<Outcome>, TranslationStats) {
        let mut results: Vec<Outcome> = vec![Outcome::Skipped; texts.len()];
        let mut stats = TranslationStats {
            total_strings: texts.len(),
            ..Default::default()
        };

        // Unique candidates, each with the positions it fills.
        let mut unique: Vec<&str> = Vec::new();
        let mut positions: Vec<Vec<usize>> = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (i, text) in texts.iter().enumerate() {
            let text = text.as_ref();
            if !guard::should_translate(text) {
                continue;
            }
            stats.filtered_strings += 1;
            results[i] = Outcome::Pending;
            match seen.get(text) {
                Some(&u) => positions[u].push(i),
                None => {
                    seen.insert(text, unique.len());
                    unique.push(text);
                    positions.push(vec![i]);
                }
            }
        }

        tracing::debug!(
            total = texts.len(),
            candidates = stats.filtered_strings,
            unique = unique.len(),
            "filtered strings"
        );
        if unique.is_empty() {
            return (results, stats);
        }

        let (cached, uncached) = self.cache.get_batch(&unique[..], lang);
        for (u, hit) in cached.into_iter().enumerate() {
            if let Some(hit) = hit {
                stats.cache_hits += 1;
                for &i in &positions[u] {
                    results[i] = Outcome::Translated(hit.clone());
                }
            }
        }

        if uncached.is_empty() {
            return (results, stats);
        }

        let pending: Vec<Pending> = uncached.iter().map(|&u| Pending::new(unique[u])).collect();
        let translated = self.translate_pending(&pending, lang, run, &mut stats);

        let mut new_sources: Vec<&str> = Vec::new();
        let mut new_translations: Vec<String> = Vec::new();
        for ((p, &u), outcome) in pending.iter().zip(&uncached).zip(translated) {
            for &i in &positions[u] {
                results[i] = outcome.clone();
            }
            if let Outcome::Translated(out) = outcome {
                new_sources.push(&p.source);
                new_translations.push(out);
            }
        }

        stats.new_translations = new_translations.len();
        self.cache.save_batch(&new_sources[..], &new_translations[..], lang);

        tracing::info!(
            lang,
            cache_hits = stats.cache_hits,
            new = stats.new_translations,
            failed = stats.failed,
            batches = stats.api_batches,
            "batch translation finished"
        );
        (results, stats)
    }

    /// Runs every entry of one document through a single translation call.
    pub fn translate_entries(&self, entries: &mut [TextEntry], lang: &str, run: &RunContext) -> TranslationStats {
        let originals: Vec<&str> = entries.iter().map(|e| e.original.as_str()).collect();
        let (outcomes, stats) = self.translate_outcomes(&originals[..], lang, run);
        apply_translations(entries, outcomes);
        stats
    }

    /// Returns the outcome per pending string. Strings after a cancellation stay `Pending`.
    fn translate_pending(
        &self,
        pending: &[Pending],
        lang: &str,
        run: &RunContext,
        stats: &mut TranslationStats,
    ) -> Vec<Outcome> {
        let overhead = self.options.separator.chars().count();
        let batches = create_smart_batches(pending, self.options.max_batch_length, overhead);
        tracing::debug!(strings = pending.len(), batches = batches.len(), "packed batches");

        let mut out: Vec<Outcome> = Vec::with_capacity(pending.len());
        let mut done = 0usize;

        for (n, batch) in batches.iter().enumerate() {
            if run.checkpoint().is_err() {
                tracing::info!(batch = n + 1, "translation cancelled");
                stats.cancelled = true;
                break;
            }
            if n > 0 && !self.options.batch_delay.is_zero() {
                thread::sleep(self.options.batch_delay);
            }

            stats.api_batches += 1;
            let raw = self.translate_batch(batch, lang, n + 1, stats);
            for (p, r) in batch.iter().zip(raw) {
                out.push(match r.and_then(|t| self.finish(p, &t, stats)) {
                    Some(t) => Outcome::Translated(t),
                    None => Outcome::Failed,
                });
            }

            done += batch.len();
            run.reporter.percent(done, pending.len());
        }

        out.resize(pending.len(), Outcome::Pending);
        out
    }

    fn translate_batch(
        &self,
        batch: &[Pending],
        lang: &str,
        number: usize,
        stats: &mut TranslationStats,
    ) -> Vec<Option<String>> {
        if batch.len() == 1 {
            return vec![self.translate_one(&batch[0], lang, stats)];
        }

        let joined = batch.iter().map(Pending::text).collect::<Vec<_>>().join(&self.options.separator);
        tracing::debug!(batch = number, strings = batch.len(), chars = joined.chars().count(), "sending batch");

        let response = match self.translator.translate(&joined, lang) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(batch = number, error = %e, "batch translation failed, keeping originals");
                stats.failed += batch.len();
                return vec![None; batch.len()];
            }
        };

        let parts: Vec<String> = response
            .split(self.options.separator.trim())
            .map(|p| p.trim().to_string())
            .collect();

        if parts.len() == batch.len() {
            return parts.into_iter().map(Some).collect();
        }

        tracing::warn!(
            batch = number,
            expected = batch.len(),
            got = parts.len(),
            "separator lost in translation, retrying strings one by one"
        );
        stats.fallback_batches += 1;
        batch.iter().map(|p| self.translate_one(p, lang, stats)).collect()
    }

    fn translate_one(&self, p: &Pending, lang: &str, stats: &mut TranslationStats) -> Option<String> {
        match self.translator.translate(p.text(), lang) {
            Ok(t) => Some(t.trim().to_string()),
            Err(e) => {
                tracing::error!(text = %p.source, error = %e, "translation failed, keeping original");
                stats.failed += 1;
                None
            }
        }
    }

    fn finish(&self, p: &Pending, translated: &str, stats: &mut TranslationStats) -> Option<String> {
        if translated.is_empty() {
            stats.failed += 1;
            return None;
        }
        let restored = guard::restore(translated, &p.protected.codes);
        if !restored.is_complete() {
            if self.options.strict_format_codes {
                tracing::warn!(text = %p.source, "format codes lost, keeping original");
                stats.failed += 1;
                return None;
            }
            tracing::debug!(
                text = %p.source,
                tokens = restored.tokens,
                codes = restored.codes,
                "format codes partially restored"
            );
        }
        let text = if self.options.glossary.is_empty() {
            restored.text
        } else {
            self.options.glossary.apply(&restored.text)
        };
        Some(format!("{}{}{}", p.lead, text, p.trail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::control::JobControl;
    use crate::services::translator::testing::FakeTranslator;
    use pretty_assertions::assert_eq;

    fn options() -> PipelineOptions {
        PipelineOptions {
            batch_delay: Duration::ZERO,
            ..PipelineOptions::default()
        }
    }

    fn pipeline(fake: Arc<FakeTranslator>, options: PipelineOptions) -> Pipeline {
        Pipeline::new(fake, Arc::new(TranslationCache::in_memory(100)), options)
    }

    #[test]
    fn only_translatable_strings_reach_the_translator() {
        let fake = Arc::new(FakeTranslator::new().with("hello world", "привет мир"));
        let p = pipeline(fake.clone(), options());
        let input = ["hello world", "minecraft:stone", "{player} joined"];

        let (out, stats) = p.batch_translate(&input, "ru", &RunContext::default());

        assert_eq!(out, vec!["привет мир", "minecraft:stone", "{player} joined"]);
        assert_eq!(fake.calls(), vec!["hello world"]);
        assert_eq!(stats.filtered_strings, 1);
        assert_eq!(stats.new_translations, 1);
    }

    #[test]
    fn second_run_is_served_from_cache() {
        let fake = Arc::new(FakeTranslator::new());
        let p = pipeline(fake.clone(), options());
        let input = ["Open the chest", "Kill the dragon"];

        let (first, s1) = p.batch_translate(&input, "ru", &RunContext::default());
        let (second, s2) = p.batch_translate(&input, "ru", &RunContext::default());

        assert_eq!(first, second);
        assert_eq!(s1.new_translations, 2);
        assert_eq!(s2.new_translations, 0);
        assert_eq!(s2.cache_hits, 2);
        assert_eq!(fake.calls().len(), 1);
    }

    #[test]
    fn batches_are_joined_and_split() {
        let fake = Arc::new(FakeTranslator::new().with("Gather wood", "Соберите дерево").with("Build a house", "Постройте дом"));
        let p = pipeline(fake.clone(), options());

        let (out, stats) = p.batch_translate(&["Gather wood", "Build a house"], "ru", &RunContext::default());

        assert_eq!(out, vec!["Соберите дерево", "Постройте дом"]);
        assert_eq!(stats.api_batches, 1);
        assert_eq!(fake.calls(), vec!["Gather wood |SEPARATOR| Build a house"]);
    }

    #[test]
    fn misaligned_batch_falls_back_to_single_strings() {
        let fake = Arc::new(FakeTranslator::new().mangling_separator());
        let p = pipeline(fake.clone(), options());

        let (out, stats) = p.batch_translate(&["First quest", "Second quest"], "ru", &RunContext::default());

        assert_eq!(out, vec!["[ru] First quest", "[ru] Second quest"]);
        assert_eq!(stats.fallback_batches, 1);
        assert_eq!(stats.new_translations, 2);
        assert_eq!(fake.calls().len(), 3);
    }

    #[test]
    fn failed_string_keeps_original_and_is_not_cached() {
        let fake = Arc::new(FakeTranslator::new().failing_on("Broken text"));
        let p = pipeline(fake, options());

        let (out, stats) = p.batch_translate(&["Broken text"], "ru", &RunContext::default());

        assert_eq!(out, vec!["Broken text"]);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.new_translations, 0);
        assert_eq!(p.cache().get_batch(&["Broken text"], "ru").1, vec![0]);
    }

    #[test]
    fn failed_batch_keeps_originals() {
        let fake = Arc::new(FakeTranslator::new().failing_always());
        let p = pipeline(fake, options());
        let input = ["Mine some ore", "Smelt the ore"];

        let (out, stats) = p.batch_translate(&input, "ru", &RunContext::default());

        assert_eq!(out, input);
        assert_eq!(stats.failed, 2);
    }

    #[test]
    fn format_codes_survive_translation() {
        let fake = Arc::new(FakeTranslator::new().with("^^*^^Hello ^^*^^World", "^^*^^Привет ^^*^^Мир"));
        let p = pipeline(fake.clone(), options());

        let (out, _) = p.batch_translate(&["&aHello &cWorld"], "ru", &RunContext::default());

        assert_eq!(out, vec!["&aПривет &cМир"]);
        assert_eq!(fake.calls(), vec!["^^*^^Hello ^^*^^World"]);
    }

    #[test]
    fn strict_mode_rejects_lost_codes() {
        let strict = PipelineOptions {
            strict_format_codes: true,
            ..options()
        };
        let fake = Arc::new(FakeTranslator::new().dropping_tokens());
        let p = pipeline(fake.clone(), strict);
        let (out, stats) = p.batch_translate(&["&aHello &cWorld"], "ru", &RunContext::default());
        assert_eq!(out, vec!["&aHello &cWorld"]);
        assert_eq!(stats.failed, 1);

        let lenient = pipeline(fake, options());
        let (out, _) = lenient.batch_translate(&["&aHello &cWorld"], "ru", &RunContext::default());
        assert_eq!(out, vec!["[ru] Hello &aWorld"]);
    }

    #[test]
    fn outcomes_tell_failed_from_skipped() {
        let fake = Arc::new(FakeTranslator::new().failing_on("Broken text"));
        let p = pipeline(fake, options());

        let (outcomes, stats) = p.translate_outcomes(&["Broken text", "minecraft:stone", "Good text"], "ru", &RunContext::default());

        assert_eq!(
            outcomes,
            vec![Outcome::Failed, Outcome::Skipped, Outcome::Translated("[ru] Good text".into())]
        );
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn cancelled_strings_stay_pending() {
        let p = pipeline(Arc::new(FakeTranslator::new()), options());
        let control = JobControl::new();
        control.cancel();
        let run = RunContext::new(control, Default::default());

        let (outcomes, _) = p.translate_outcomes(&["Find the village", "{player}"], "ru", &run);

        assert_eq!(outcomes, vec![Outcome::Pending, Outcome::Skipped]);
    }

    #[test]
    fn glossary_fixes_terms_in_new_translations() {
        let opts = PipelineOptions {
            glossary: Glossary::from_pairs([("Creeper", "Крипер")]).unwrap(),
            ..options()
        };
        let p = pipeline(Arc::new(FakeTranslator::new()), opts);

        let (out, _) = p.batch_translate(&["&aKill the creeper"], "ru", &RunContext::default());

        assert_eq!(out, vec!["[ru] &aKill the Крипер"]);
        assert_eq!(
            p.cache().get_batch(&["&aKill the creeper"], "ru").0,
            vec![Some("[ru] &aKill the Крипер".to_string())]
        );
    }

    #[test]
    fn duplicates_are_translated_once() {
        let fake = Arc::new(FakeTranslator::new());
        let p = pipeline(fake.clone(), options());

        let (out, stats) = p.batch_translate(&["Same text", "Same text"], "ru", &RunContext::default());

        assert_eq!(out, vec!["[ru] Same text", "[ru] Same text"]);
        assert_eq!(fake.calls(), vec!["Same text"]);
        assert_eq!(stats.filtered_strings, 2);
        assert_eq!(stats.new_translations, 1);
    }

    #[test]
    fn outer_whitespace_is_preserved() {
        let fake = Arc::new(FakeTranslator::new().with("Stone bricks", "Каменные кирпичи"));
        let p = pipeline(fake, options());
        let (out, _) = p.batch_translate(&["  Stone bricks\n"], "ru", &RunContext::default());
        assert_eq!(out, vec!["  Каменные кирпичи\n"]);
    }

    #[test]
    fn small_budget_splits_into_several_batches() {
        let fake = Arc::new(FakeTranslator::new());
        let opts = PipelineOptions {
            max_batch_length: 30,
            ..options()
        };
        let p = pipeline(fake.clone(), opts);
        let input = ["Alpha quest", "Beta quest", "Gamma quest"];

        let (_, stats) = p.batch_translate(&input, "ru", &RunContext::default());

        assert_eq!(stats.api_batches, 3);
        assert_eq!(fake.calls().len(), 3);
    }

    #[test]
    fn cancelled_run_returns_inputs_unchanged() {
        let fake = Arc::new(FakeTranslator::new());
        let p = pipeline(fake.clone(), options());
        let control = JobControl::new();
        control.cancel();
        let run = RunContext::new(control, Default::default());

        let (out, stats) = p.batch_translate(&["Find the village"], "ru", &run);

        assert_eq!(out, vec!["Find the village"]);
        assert!(stats.cancelled);
        assert!(fake.calls().is_empty());
    }
}
