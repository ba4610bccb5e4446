use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::path::PathBuf;

use crate::services::qa::QaIssue;

/// Counters for one or more `batch_translate` calls.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct TranslationStats {
    pub total_strings: usize,
    pub filtered_strings: usize,
    pub cache_hits: usize,
    pub new_translations: usize,
    pub failed: usize,
    pub api_batches: usize,
    pub fallback_batches: usize,
    #[serde(default)]
    pub cancelled: bool,
}

impl AddAssign<&TranslationStats> for TranslationStats {
    fn add_assign(&mut self, rhs: &TranslationStats) {
        self.total_strings += rhs.total_strings;
        self.filtered_strings += rhs.filtered_strings;
        self.cache_hits += rhs.cache_hits;
        self.new_translations += rhs.new_translations;
        self.failed += rhs.failed;
        self.api_batches += rhs.api_batches;
        self.fallback_batches += rhs.fallback_batches;
        self.cancelled |= rhs.cancelled;
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Quest,
    Lang,
    Patchouli,
    Jar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Done,
    Skipped(String),
    Cancelled,
    Error(String),
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Done => f.write_str("done"),
            JobStatus::Skipped(reason) => write!(f, "skipped: {reason}"),
            JobStatus::Cancelled => f.write_str("cancelled"),
            JobStatus::Error(reason) => write!(f, "ERROR: {reason}"),
        }
    }
}

impl Serialize for JobStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct JobReport {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub kind: JobKind,
    pub status: JobStatus,
    pub stats: TranslationStats,
    pub files: usize,
    pub issues: Vec<QaIssue>,
    /// Per-file failures of a directory or archive job that still completed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl JobReport {
    pub fn new(input: impl Into<PathBuf>, kind: JobKind) -> Self {
        JobReport {
            input: input.into(),
            output: None,
            kind,
            status: JobStatus::Done,
            stats: TranslationStats::default(),
            files: 0,
            issues: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn failed(input: impl Into<PathBuf>, kind: JobKind, reason: impl Into<String>) -> Self {
        let mut r = JobReport::new(input, kind);
        r.status = JobStatus::Error(reason.into());
        r
    }

    /// Folds a nested report (one file of a directory or archive) into this one.
    pub fn absorb(&mut self, other: JobReport) {
        self.stats += &other.stats;
        self.files += other.files;
        self.issues.extend(other.issues);
        self.errors.extend(other.errors);
        match other.status {
            JobStatus::Cancelled => self.status = JobStatus::Cancelled,
            JobStatus::Error(reason) => self.errors.push(format!("{}: {reason}", other.input.display())),
            JobStatus::Done | JobStatus::Skipped(_) => {}
        }
    }

    pub fn cancelled(input: impl Into<PathBuf>, kind: JobKind) -> Self {
        let mut r = JobReport::new(input, kind);
        r.status = JobStatus::Cancelled;
        r
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, JobStatus::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_add_up() {
        let mut total = TranslationStats::default();
        let part = TranslationStats {
            total_strings: 3,
            cache_hits: 1,
            new_translations: 2,
            ..Default::default()
        };
        total += &part;
        total += &part;
        assert_eq!(total.total_strings, 6);
        assert_eq!(total.new_translations, 4);
        assert!(!total.cancelled);
    }

    #[test]
    fn absorb_collects_child_failures() {
        let mut dir = JobReport::new("quests", JobKind::Quest);
        let mut ok = JobReport::new("quests/a.snbt", JobKind::Quest);
        ok.files = 1;
        dir.absorb(ok);
        dir.absorb(JobReport::failed("quests/b.snbt", JobKind::Quest, "bad syntax"));

        assert_eq!(dir.status, JobStatus::Done);
        assert_eq!(dir.files, 1);
        assert_eq!(dir.errors, vec!["quests/b.snbt: bad syntax".to_string()]);

        dir.absorb(JobReport::cancelled("quests/c.snbt", JobKind::Quest));
        assert_eq!(dir.status, JobStatus::Cancelled);
    }

    #[test]
    fn status_serializes_as_string() {
        let s = serde_json::to_string(&JobStatus::Error("disk full".into())).unwrap();
        assert_eq!(s, "\"ERROR: disk full\"");
        assert_eq!(JobStatus::Skipped("no lang files".into()).to_string(), "skipped: no lang files");
    }
}
