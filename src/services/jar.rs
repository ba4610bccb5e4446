//! Mod archives: translate the bundled `en_us` resources into a new jar.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{CoreError, Result};
use crate::model::report::{JobKind, JobReport, JobStatus};
use crate::services::control::RunContext;
use crate::services::lang::{self, SOURCE_LOCALE};
use crate::services::pipeline::Pipeline;
use crate::services::{encoding, guard, output, qa};

/// Largest archive entry read into memory. Lang files and book pages are far smaller.
pub const MAX_ENTRY_BYTES: u64 = 16 * 1024 * 1024;

static LANG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^assets/[^/]+/lang/en_us\.json$").unwrap());

static BOOK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^assets/[^/]+/patchouli_books/(?:.+/)?en_us/.+\.json$").unwrap());

/// An archive entry to translate and where its translation goes.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    name: String,
    target: String,
    kind: JobKind,
}

/// `mods/gears-1.2.jar` becomes `<output_dir>/gears-1.2_ru.jar`, or
/// `<output_dir>/gears-1.2.jar` when the original name is kept.
pub fn jar_output_path(jar: &Path, output_dir: &Path, lang: &str, replace_original: bool) -> PathBuf {
    if replace_original {
        if let Some(name) = jar.file_name() {
            return output_dir.join(name);
        }
    }
    let stem = jar
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mod".to_string());
    output_dir.join(format!("{stem}_{lang}.jar"))
}

fn has_locale_lang(names: &[String], locale: &str) -> bool {
    let suffix = format!("/lang/{locale}.json");
    names.iter().any(|n| n.starts_with("assets/") && n.ends_with(&suffix))
}

fn has_locale_book(names: &[String], locale: &str) -> bool {
    let dir = format!("/{locale}/");
    names.iter().any(|n| n.contains("/patchouli_books/") && n.contains(&dir))
}

/// Picks the entries to translate. A category that already ships `locale` is left alone.
fn plan(names: &[String], locale: &str) -> Vec<Candidate> {
    let skip_lang = has_locale_lang(names, locale);
    let skip_book = has_locale_book(names, locale);
    if skip_lang {
        tracing::debug!(locale, "archive already has lang files for locale");
    }
    if skip_book {
        tracing::debug!(locale, "archive already has patchouli pages for locale");
    }

    let source_dir = format!("/{SOURCE_LOCALE}/");
    let mut out = Vec::new();
    for name in names {
        if !skip_lang && LANG_RE.is_match(name) {
            let target = name.replace("/lang/en_us.json", &format!("/lang/{locale}.json"));
            out.push(Candidate {
                name: name.clone(),
                target,
                kind: JobKind::Lang,
            });
        } else if !skip_book && BOOK_RE.is_match(name) {
            let Some(pos) = name.rfind(&source_dir) else { continue };
            let target = format!("{}/{locale}/{}", &name[..pos], &name[pos + source_dir.len()..]);
            out.push(Candidate {
                name: name.clone(),
                target,
                kind: JobKind::Patchouli,
            });
        }
    }
    out.retain(|c| !names.contains(&c.target));
    out
}

/// Outcome of looking into a jar without translating anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JarState {
    NeedsTranslation,
    /// Every resource category already ships the target locale.
    AlreadyTranslated,
    /// No `en_us` lang files or book pages.
    NoFiles,
    /// Resources exist but hold nothing worth sending to the translator.
    NoStrings,
    Unreadable,
}

#[derive(Debug, Clone, Serialize)]
pub struct JarAnalysis {
    pub jar: PathBuf,
    pub state: JarState,
    pub lang_files: usize,
    pub book_files: usize,
    /// Strings that would reach the translator.
    pub strings: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Pre-scan of a set of jars, grouped by state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JarSurvey {
    pub jars: Vec<JarAnalysis>,
    pub need_translation: usize,
    pub already_translated: usize,
    pub no_files: usize,
    pub no_strings: usize,
    pub unreadable: usize,
    pub lang_files: usize,
    pub book_files: usize,
    pub strings: usize,
}

fn open_archive(jar: &Path) -> Result<ZipArchive<BufReader<File>>> {
    Ok(ZipArchive::new(BufReader::new(File::open(jar)?))?)
}

/// Classifies one jar. Never fails; an unreadable archive is a state of its own.
pub fn analyze(jar: &Path, locale: &str) -> JarAnalysis {
    let mut analysis = JarAnalysis {
        jar: jar.to_path_buf(),
        state: JarState::Unreadable,
        lang_files: 0,
        book_files: 0,
        strings: 0,
        error: None,
    };
    let mut archive = match open_archive(jar) {
        Ok(a) => a,
        Err(e) => {
            analysis.error = Some(e.to_string());
            return analysis;
        }
    };

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    analysis.lang_files = names.iter().filter(|n| LANG_RE.is_match(n)).count();
    analysis.book_files = names.iter().filter(|n| BOOK_RE.is_match(n)).count();
    if analysis.lang_files + analysis.book_files == 0 {
        analysis.state = JarState::NoFiles;
        return analysis;
    }

    let candidates = plan(&names, locale);
    if candidates.is_empty() {
        analysis.state = JarState::AlreadyTranslated;
        return analysis;
    }

    let (strings, errors) = planned_strings(&mut archive, &candidates);
    for e in &errors {
        tracing::debug!(jar = %jar.display(), error = %e, "entry not counted");
    }
    analysis.strings = strings.len();
    analysis.state = if strings.is_empty() {
        JarState::NoStrings
    } else {
        JarState::NeedsTranslation
    };
    analysis
}

pub fn survey(jars: &[PathBuf], locale: &str) -> JarSurvey {
    let mut survey = JarSurvey::default();
    for jar in jars {
        let a = analyze(jar, locale);
        match a.state {
            JarState::NeedsTranslation => survey.need_translation += 1,
            JarState::AlreadyTranslated => survey.already_translated += 1,
            JarState::NoFiles => survey.no_files += 1,
            JarState::NoStrings => survey.no_strings += 1,
            JarState::Unreadable => survey.unreadable += 1,
        }
        survey.lang_files += a.lang_files;
        survey.book_files += a.book_files;
        survey.strings += a.strings;
        survey.jars.push(a);
    }
    tracing::info!(
        jars = jars.len(),
        need_translation = survey.need_translation,
        strings = survey.strings,
        "jars analyzed"
    );
    survey
}

/// Unique translatable strings across `jars`, in first-seen order. Unreadable
/// jars and entries are left out.
pub fn collect_unique_strings(jars: &[PathBuf], locale: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for jar in jars {
        let mut archive = match open_archive(jar) {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(jar = %jar.display(), error = %e, "jar left out of preload");
                continue;
            }
        };
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        let (strings, _) = planned_strings(&mut archive, &plan(&names, locale));
        out.extend(strings.into_iter().filter(|s| seen.insert(s.clone())));
    }
    out
}

/// Source strings of the planned entries that the guard lets through, plus
/// one message per entry that could not be read.
fn planned_strings<R: Read + Seek>(archive: &mut ZipArchive<R>, candidates: &[Candidate]) -> (Vec<String>, Vec<String>) {
    let mut strings = Vec::new();
    let mut errors = Vec::new();
    for c in candidates {
        let found = read_entry(archive, &c.name).and_then(|bytes| lang::source_strings(&encoding::decode(&bytes), c.kind));
        match found {
            Ok(found) => strings.extend(found.into_iter().filter(|s| guard::should_translate(s))),
            Err(e) => errors.push(format!("{}: {e}", c.name)),
        }
    }
    (strings, errors)
}

/// Writes the translated jar into `output_dir`. The source is only replaced when
/// `replace_original` is set and `output_dir` is its own directory.
pub fn translate_jar(
    jar: &Path,
    output_dir: &Path,
    replace_original: bool,
    pipeline: &Pipeline,
    lang: &str,
    locale: &str,
    run: &RunContext,
) -> JobReport {
    match run_jar(jar, output_dir, replace_original, pipeline, lang, locale, run) {
        Ok(report) => report,
        Err(CoreError::Cancelled) => JobReport::cancelled(jar, JobKind::Jar),
        Err(e) => {
            tracing::error!(jar = %jar.display(), error = %e, "jar failed");
            JobReport::failed(jar, JobKind::Jar, e.to_string())
        }
    }
}

fn run_jar(
    jar: &Path,
    output_dir: &Path,
    replace_original: bool,
    pipeline: &Pipeline,
    lang: &str,
    locale: &str,
    run: &RunContext,
) -> Result<JobReport> {
    run.checkpoint()?;

    let mut archive = open_archive(jar)?;
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    let candidates = plan(&names, locale);

    let mut report = JobReport::new(jar, JobKind::Jar);
    if candidates.is_empty() {
        tracing::info!(jar = %jar.display(), "nothing to translate");
        report.status = JobStatus::Skipped("no untranslated resources".into());
        return Ok(report);
    }

    let mut added: Vec<(String, String)> = Vec::with_capacity(candidates.len());
    for (i, c) in candidates.iter().enumerate() {
        run.checkpoint()?;

        let doc = read_entry(&mut archive, &c.name).and_then(|bytes| {
            let source = encoding::decode(&bytes);
            match c.kind {
                JobKind::Patchouli => lang::translate_patchouli_source(&source, pipeline, lang, run),
                _ => lang::translate_lang_source(&source, pipeline, lang, run),
            }
        });
        let doc = match doc {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(jar = %jar.display(), entry = %c.name, error = %e, "entry skipped");
                report.errors.push(format!("{}: {e}", c.name));
                continue;
            }
        };

        report.stats += &doc.stats;
        if doc.stats.cancelled {
            return Err(CoreError::Cancelled);
        }
        report.files += 1;
        report.issues.extend(qa::run(&doc.entries).into_iter().map(|mut issue| {
            issue.entry_id = format!("{}#{}", c.name, issue.entry_id);
            issue
        }));
        added.push((c.target.clone(), doc.text));
        run.reporter.message(format!("{}: {}/{} entries", jar.display(), i + 1, candidates.len()));
    }

    if added.is_empty() {
        report.status = JobStatus::Skipped("no readable resources".into());
        return Ok(report);
    }

    let out_path = jar_output_path(jar, output_dir, lang, replace_original);
    write_jar(&mut archive, &out_path, &added)?;
    tracing::info!(
        jar = %jar.display(),
        output = %out_path.display(),
        entries = added.len(),
        new = report.stats.new_translations,
        "jar translated"
    );
    report.output = Some(out_path);
    Ok(report)
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    read_limited(archive, name, MAX_ENTRY_BYTES)
}

/// Reads at most `limit` bytes. The size in the entry header is not trusted.
fn read_limited<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str, limit: u64) -> Result<Vec<u8>> {
    let file = archive.by_name(name)?;
    if file.size() > limit {
        return Err(CoreError::Layout(format!("{name} is larger than {limit} bytes")));
    }
    let mut buf = Vec::new();
    file.take(limit + 1).read_to_end(&mut buf)?;
    if buf.len() as u64 > limit {
        return Err(CoreError::Layout(format!("{name} is larger than {limit} bytes")));
    }
    Ok(buf)
}

/// Raw-copies every original entry, appends the translations, then swaps the temp file in.
fn write_jar<R: Read + Seek>(archive: &mut ZipArchive<R>, out_path: &Path, added: &[(String, String)]) -> Result<()> {
    let tmp = output::temp_beside(out_path)?;
    let mut zip = ZipWriter::new(tmp);

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        zip.raw_copy_file(entry)?;
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, text) in added {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(text.as_bytes())?;
    }

    let tmp = zip.finish()?;
    tmp.persist(out_path)?;
    Ok(())
}
