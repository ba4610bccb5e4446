//! FTB Quests: `.snbt` chapter files and whole quest directories.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{CoreError, Result};
use crate::model::report::{JobKind, JobReport, JobStatus};
use crate::parsers::snbt;
use crate::services::control::RunContext;
use crate::services::pipeline::Pipeline;
use crate::services::{encoding, output, qa, rebuild};

/// `config/ftbquests/quests` becomes `config/ftbquests/quests-translate`.
pub fn translated_dir(dir: &Path) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "quests".to_string());
    dir.with_file_name(format!("{name}-translate"))
}

/// Translates one `.snbt` file into `output`. Failures end up in the report.
pub fn process_snbt_file(input: &Path, output: &Path, pipeline: &Pipeline, lang: &str, run: &RunContext) -> JobReport {
    match translate_snbt(input, output, pipeline, lang, run) {
        Ok(report) => report,
        Err(CoreError::Cancelled) => JobReport::cancelled(input, JobKind::Quest),
        Err(e) => {
            tracing::error!(path = %input.display(), error = %e, "quest file failed");
            JobReport::failed(input, JobKind::Quest, e.to_string())
        }
    }
}

fn translate_snbt(input: &Path, out_path: &Path, pipeline: &Pipeline, lang: &str, run: &RunContext) -> Result<JobReport> {
    run.checkpoint()?;

    let source = encoding::read_text(input)?;
    let root = snbt::parse(&source)?;
    let mut entries = snbt::extract(&root);

    let mut report = JobReport::new(input, JobKind::Quest);
    report.files = 1;

    if !entries.is_empty() {
        report.stats = pipeline.translate_entries(&mut entries, lang, run);
        if report.stats.cancelled {
            report.status = JobStatus::Cancelled;
            return Ok(report);
        }
    }

    let text = rebuild::splice(&source, &entries);
    output::write_atomic(out_path, text.as_bytes())?;

    report.issues = qa::run(&entries);
    report.output = Some(out_path.to_path_buf());
    tracing::info!(
        path = %input.display(),
        strings = entries.len(),
        new = report.stats.new_translations,
        "quest file translated"
    );
    run.reporter.message(format!("{}: done", input.display()));
    Ok(report)
}

/// Translates every `.snbt` under `dir` into the sibling `<dir>-translate`,
/// copying all other files unchanged.
pub fn process_quest_dir(dir: &Path, pipeline: &Pipeline, lang: &str, run: &RunContext) -> JobReport {
    if !dir.is_dir() {
        return JobReport::failed(dir, JobKind::Quest, format!("{} is not a directory", dir.display()));
    }

    let out_root = translated_dir(dir);
    let mut report = JobReport::new(dir, JobKind::Quest);
    report.output = Some(out_root.clone());

    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut snbt_files = 0usize;
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        let Ok(rel) = path.strip_prefix(dir) else { continue };
        let target = out_root.join(rel);

        if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("snbt")) {
            snbt_files += 1;
            report.absorb(process_snbt_file(path, &target, pipeline, lang, run));
        } else if run.checkpoint().is_ok() {
            if let Err(e) = copy_file(path, &target) {
                tracing::warn!(path = %path.display(), error = %e, "copy failed");
                report.errors.push(format!("{}: {e}", path.display()));
            }
        } else {
            report.status = JobStatus::Cancelled;
        }

        if report.status == JobStatus::Cancelled {
            tracing::info!(dir = %dir.display(), "quest translation cancelled");
            break;
        }
    }

    if snbt_files == 0 && report.status == JobStatus::Done {
        report.status = JobStatus::Skipped("no .snbt files".into());
    }
    report
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::control::JobControl;
    use crate::services::translator::testing::{fake_pipeline, FakeTranslator};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const QUEST: &str = "{\n\ttitle: \"Getting Started\"\n\tquests: [{\n\t\ttitle: \"&aFirst Steps\"\n\t\ticon: \"minecraft:oak_log\"\n\t\tx: 0.0d\n\t}]\n}\n";

    #[test]
    fn translates_file_and_keeps_everything_else() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("chapter.snbt");
        fs::write(&input, QUEST).unwrap();
        let out = dir.path().join("out").join("chapter.snbt");

        let fake = Arc::new(FakeTranslator::new().with("Getting Started", "Начало"));
        let report = process_snbt_file(&input, &out, &fake_pipeline(fake), "ru", &RunContext::default());

        assert_eq!(report.status, JobStatus::Done);
        assert_eq!(report.stats.new_translations, 2);
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "{\n\ttitle: \"Начало\"\n\tquests: [{\n\t\ttitle: \"[ru] &aFirst Steps\"\n\t\ticon: \"minecraft:oak_log\"\n\t\tx: 0.0d\n\t}]\n}\n"
        );
        assert_eq!(fs::read_to_string(&input).unwrap(), QUEST);
    }

    #[test]
    fn translator_failure_is_flagged_and_keeps_originals() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("chapter.snbt");
        fs::write(&input, QUEST).unwrap();
        let out = dir.path().join("out.snbt");

        let fake = Arc::new(FakeTranslator::new().failing_on("Getting Started"));
        let report = process_snbt_file(&input, &out, &fake_pipeline(fake), "ru", &RunContext::default());

        assert_eq!(report.status, JobStatus::Done);
        assert_eq!(report.stats.failed, 2);
        let codes: Vec<&str> = report.issues.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["FAILED", "FAILED"]);
        assert_eq!(fs::read_to_string(&out).unwrap(), QUEST);
    }

    #[test]
    fn syntax_error_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.snbt");
        fs::write(&input, "{ title: \"open").unwrap();
        let out = dir.path().join("broken.out.snbt");

        let report = process_snbt_file(
            &input,
            &out,
            &fake_pipeline(Arc::new(FakeTranslator::new())),
            "ru",
            &RunContext::default(),
        );

        assert!(report.is_error());
        assert!(report.status.to_string().starts_with("ERROR: "));
        assert!(!out.exists());
    }

    #[test]
    fn directory_goes_to_sibling_and_copies_other_files() {
        let root = tempfile::tempdir().unwrap();
        let quests = root.path().join("quests");
        fs::create_dir_all(quests.join("chapters")).unwrap();
        fs::write(quests.join("chapters").join("start.snbt"), QUEST).unwrap();
        fs::write(quests.join("chapters").join("bad.snbt"), "{ title: ").unwrap();
        fs::write(quests.join("data.txt"), "keep me").unwrap();

        let report = process_quest_dir(
            &quests,
            &fake_pipeline(Arc::new(FakeTranslator::new())),
            "ru",
            &RunContext::default(),
        );

        let out = root.path().join("quests-translate");
        assert_eq!(report.output.as_deref(), Some(out.as_path()));
        assert_eq!(report.status, JobStatus::Done);
        assert_eq!(report.files, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(out.join("chapters").join("start.snbt").exists());
        assert!(!out.join("chapters").join("bad.snbt").exists());
        assert_eq!(fs::read_to_string(out.join("data.txt")).unwrap(), "keep me");
    }

    #[test]
    fn cancelled_run_writes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let quests = root.path().join("quests");
        fs::create_dir_all(&quests).unwrap();
        fs::write(quests.join("a.snbt"), QUEST).unwrap();

        let control = JobControl::new();
        control.cancel();
        let run = RunContext::new(control, Default::default());
        let report = process_quest_dir(&quests, &fake_pipeline(Arc::new(FakeTranslator::new())), "ru", &run);

        assert_eq!(report.status, JobStatus::Cancelled);
        assert!(!root.path().join("quests-translate").join("a.snbt").exists());
    }

    #[test]
    fn sibling_name() {
        assert_eq!(
            translated_dir(Path::new("config/ftbquests/quests")),
            PathBuf::from("config/ftbquests/quests-translate")
        );
    }
}
