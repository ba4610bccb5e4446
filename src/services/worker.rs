//! Fixed-size pool that runs translation jobs in parallel.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;

use flume::bounded;
use serde::{Deserialize, Serialize};

use crate::model::report::{JobKind, JobReport};
use crate::services::control::RunContext;
use crate::services::pipeline::Pipeline;
use crate::services::{jar, lang, quests};

/// One unit of work for the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Job {
    /// A whole FTB Quests directory.
    QuestDir { dir: PathBuf },
    /// A single `.snbt`, lang `.json` or Patchouli `.json` file.
    File {
        path: PathBuf,
        #[serde(default)]
        output: Option<PathBuf>,
    },
    Jar {
        jar: PathBuf,
        output_dir: PathBuf,
        /// Write the translated jar under the original file name.
        #[serde(default)]
        replace_original: bool,
    },
}

impl Job {
    pub fn input(&self) -> &Path {
        match self {
            Job::QuestDir { dir } => dir,
            Job::File { path, .. } => path,
            Job::Jar { jar, .. } => jar,
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            Job::QuestDir { .. } => JobKind::Quest,
            Job::File { path, .. } if is_ext(path, "snbt") => JobKind::Quest,
            Job::File { path, .. } if is_ext(path, "jar") => JobKind::Jar,
            Job::File { path, .. } => lang::kind_of(path),
            Job::Jar { .. } => JobKind::Jar,
        }
    }

    /// Builds the job matching a path on disk.
    pub fn for_path(path: impl Into<PathBuf>, output: Option<PathBuf>) -> Job {
        let path = path.into();
        if path.is_dir() {
            return Job::QuestDir { dir: path };
        }
        Job::File { path, output }
    }

    pub fn run(&self, pipeline: &Pipeline, lang: &str, locale: &str, run: &RunContext) -> JobReport {
        match self {
            Job::QuestDir { dir } => quests::process_quest_dir(dir, pipeline, lang, run),
            Job::Jar {
                jar,
                output_dir,
                replace_original,
            } => jar::translate_jar(jar, output_dir, *replace_original, pipeline, lang, locale, run),
            Job::File { path, output } => match self.kind() {
                JobKind::Quest => {
                    let out = output.clone().unwrap_or_else(|| default_snbt_output(path));
                    quests::process_snbt_file(path, &out, pipeline, lang, run)
                }
                JobKind::Jar => {
                    let dir = output.clone().unwrap_or_else(|| parent_dir(path));
                    jar::translate_jar(path, &dir, false, pipeline, lang, locale, run)
                }
                JobKind::Lang | JobKind::Patchouli => {
                    lang::process_json_file(path, output.as_deref(), pipeline, lang, locale, run)
                }
            },
        }
    }
}

fn is_ext(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `quests/chapters/a.snbt` goes to `quests/chapters-translate/a.snbt`.
fn default_snbt_output(path: &Path) -> PathBuf {
    let dir = quests::translated_dir(&parent_dir(path));
    match path.file_name() {
        Some(name) => dir.join(name),
        None => dir,
    }
}

/// Runs `jobs` on `workers` threads. Reports come back in submission order; a
/// failing or panicking job only affects its own report.
pub fn run_jobs(
    jobs: Vec<Job>,
    workers: usize,
    pipeline: &Pipeline,
    lang: &str,
    locale: &str,
    run: &RunContext,
) -> Vec<JobReport> {
    let total = jobs.len();
    if total == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, total);
    tracing::info!(jobs = total, workers, lang, "starting jobs");

    let (job_tx, job_rx) = bounded::<(usize, Job)>(total);
    let (report_tx, report_rx) = bounded::<(usize, JobReport)>(total);
    for pair in jobs.into_iter().enumerate() {
        if job_tx.send(pair).is_err() {
            break;
        }
    }
    drop(job_tx);

    thread::scope(|scope| {
        for worker in 0..workers {
            let job_rx = job_rx.clone();
            let report_tx = report_tx.clone();
            scope.spawn(move || {
                for (index, job) in job_rx.iter() {
                    let report = run_one(worker, &job, pipeline, lang, locale, run);
                    run.reporter.message(format!("{}: {}", job.input().display(), report.status));
                    if report_tx.send((index, report)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(report_tx);

    let mut reports: Vec<(usize, JobReport)> = report_rx.try_iter().collect();
    reports.sort_by_key(|(index, _)| *index);
    reports.into_iter().map(|(_, r)| r).collect()
}

fn run_one(worker: usize, job: &Job, pipeline: &Pipeline, lang: &str, locale: &str, run: &RunContext) -> JobReport {
    if run.control.is_cancelled() {
        return JobReport::cancelled(job.input(), job.kind());
    }
    tracing::debug!(worker, input = %job.input().display(), "job started");

    match panic::catch_unwind(AssertUnwindSafe(|| job.run(pipeline, lang, locale, run))) {
        Ok(report) => report,
        Err(_) => {
            tracing::error!(worker, input = %job.input().display(), "job panicked");
            JobReport::failed(job.input(), job.kind(), "internal error")
        }
    }
}
