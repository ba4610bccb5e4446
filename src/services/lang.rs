//! Mod lang files (`assets/<mod>/lang/en_us.json`) and Patchouli book pages.

use std::path::{Component, Path, PathBuf};

use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::model::entry::TextEntry;
use crate::model::report::{JobKind, JobReport, JobStatus, TranslationStats};
use crate::parsers::json;
use crate::services::control::RunContext;
use crate::services::pipeline::Pipeline;
use crate::services::{encoding, output, qa};

pub const SOURCE_LOCALE: &str = "en_us";

/// A translated JSON document ready to be written.
#[derive(Debug)]
pub struct TranslatedDoc {
    pub text: String,
    pub entries: Vec<TextEntry>,
    pub stats: TranslationStats,
}

/// Which of the two JSON layouts a file uses.
pub fn kind_of(path: &Path) -> JobKind {
    let in_book = path
        .components()
        .any(|c| matches!(c, Component::Normal(n) if n == "patchouli_books"));
    if in_book {
        JobKind::Patchouli
    } else {
        JobKind::Lang
    }
}

/// `lang/en_us.json` becomes `lang/ru_ru.json`.
pub fn lang_output_path(input: &Path, locale: &str) -> PathBuf {
    input.with_file_name(format!("{locale}.json"))
}

/// Swaps the last `en_us` directory of a Patchouli page path for `locale`.
pub fn patchouli_output_path(input: &Path, locale: &str) -> Option<PathBuf> {
    let parts: Vec<Component<'_>> = input.components().collect();
    let pos = parts
        .iter()
        .rposition(|c| matches!(c, Component::Normal(n) if *n == SOURCE_LOCALE))?;
    // the file itself is not a directory
    if pos + 1 == parts.len() {
        return None;
    }

    let mut out = PathBuf::new();
    for (i, c) in parts.iter().enumerate() {
        if i == pos {
            out.push(locale);
        } else {
            out.push(c.as_os_str());
        }
    }
    Some(out)
}

/// Original strings of a lang or Patchouli document, in document order.
pub fn source_strings(source: &str, kind: JobKind) -> Result<Vec<String>> {
    let root: Value = serde_json::from_str(source)?;
    let entries = match kind {
        JobKind::Patchouli => json::patchouli_entries(&root),
        _ => json::lang_entries(&root)?,
    };
    Ok(entries.into_iter().map(|e| e.original).collect())
}

pub fn translate_lang_source(source: &str, pipeline: &Pipeline, lang: &str, run: &RunContext) -> Result<TranslatedDoc> {
    let mut root: Value = serde_json::from_str(source)?;
    let mut entries = json::lang_entries(&root)?;
    let stats = pipeline.translate_entries(&mut entries, lang, run);
    json::apply_lang(&mut root, &entries);
    Ok(TranslatedDoc {
        text: json::to_pretty(&root)?,
        entries,
        stats,
    })
}

pub fn translate_patchouli_source(
    source: &str,
    pipeline: &Pipeline,
    lang: &str,
    run: &RunContext,
) -> Result<TranslatedDoc> {
    let mut root: Value = serde_json::from_str(source)?;
    let mut entries = json::patchouli_entries(&root);
    let stats = pipeline.translate_entries(&mut entries, lang, run);
    json::apply_patchouli(&mut root, &entries);
    Ok(TranslatedDoc {
        text: json::to_pretty(&root)?,
        entries,
        stats,
    })
}

/// Translates a lang or Patchouli file next to the original. `output` overrides
/// the derived target path.
pub fn process_json_file(
    input: &Path,
    output: Option<&Path>,
    pipeline: &Pipeline,
    lang: &str,
    locale: &str,
    run: &RunContext,
) -> JobReport {
    let kind = kind_of(input);
    match translate_json_file(input, output, kind, pipeline, lang, locale, run) {
        Ok(report) => report,
        Err(CoreError::Cancelled) => JobReport::cancelled(input, kind),
        Err(e) => {
            tracing::error!(path = %input.display(), error = %e, "json file failed");
            JobReport::failed(input, kind, e.to_string())
        }
    }
}

fn translate_json_file(
    input: &Path,
    out_override: Option<&Path>,
    kind: JobKind,
    pipeline: &Pipeline,
    lang: &str,
    locale: &str,
    run: &RunContext,
) -> Result<JobReport> {
    run.checkpoint()?;

    let out_path = match out_override {
        Some(p) => p.to_path_buf(),
        None if kind == JobKind::Patchouli => patchouli_output_path(input, locale).ok_or_else(|| {
            CoreError::Layout(format!("{} is not under an {SOURCE_LOCALE} directory", input.display()))
        })?,
        None => lang_output_path(input, locale),
    };
    if out_path == input {
        return Ok(skipped(input, kind, "source is already the target locale"));
    }

    let source = encoding::read_text(input)?;
    let doc = match kind {
        JobKind::Patchouli => translate_patchouli_source(&source, pipeline, lang, run)?,
        _ => translate_lang_source(&source, pipeline, lang, run)?,
    };

    let mut report = JobReport::new(input, kind);
    report.files = 1;
    report.stats = doc.stats;
    if report.stats.cancelled {
        report.status = JobStatus::Cancelled;
        return Ok(report);
    }

    output::write_atomic(&out_path, doc.text.as_bytes())?;
    report.issues = qa::run(&doc.entries);
    report.output = Some(out_path);
    tracing::info!(path = %input.display(), strings = doc.entries.len(), "json file translated");
    run.reporter.message(format!("{}: done", input.display()));
    Ok(report)
}

fn skipped(input: &Path, kind: JobKind, reason: &str) -> JobReport {
    let mut r = JobReport::new(input, kind);
    r.status = JobStatus::Skipped(reason.to_string());
    r
}
