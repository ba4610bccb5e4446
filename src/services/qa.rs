use crate::model::entry::{EntryStatus, TextEntry};
use crate::services::guard;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaIssue {
    pub entry_id: String,
    pub code: String,
    pub message: String,
}

impl QaIssue {
    fn new(entry: &TextEntry, code: &str, message: String) -> Self {
        QaIssue {
            entry_id: entry.entry_id.clone(),
            code: code.to_string(),
            message,
        }
    }
}

/// Checks translated entries for broken formatting and suspicious output.
pub fn run(entries: &[TextEntry]) -> Vec<QaIssue> {
    let mut issues: Vec<QaIssue> = Vec::new();

    for e in entries {
        let original_trim = e.original.trim();
        let translation_trim = e.translation.trim();

        match e.status {
            EntryStatus::Translated => {
                if translation_trim.is_empty() {
                    issues.push(QaIssue::new(
                        e,
                        "EMPTY_TRANSLATION",
                        "status is translated but the translation is empty".into(),
                    ));
                    continue;
                }
            }
            EntryStatus::Failed => {
                issues.push(QaIssue::new(e, "FAILED", "translation failed, original kept".into()));
                continue;
            }
            EntryStatus::Untranslated | EntryStatus::Skipped => continue,
        }

        if translation_trim == original_trim {
            issues.push(QaIssue::new(
                e,
                "SAME_AS_ORIGINAL",
                "translation is identical to the original".into(),
            ));
        }

        let before = guard::format_codes(&e.original);
        let after = guard::format_codes(&e.translation);
        if before != after {
            issues.push(QaIssue::new(
                e,
                "FORMAT_CODES_LOST",
                format!("format codes {before:?} became {after:?}"),
            ));
        }

        if e.translation.contains(guard::CODE_TOKEN) {
            issues.push(QaIssue::new(
                e,
                "PLACEHOLDER_LEFT",
                "protection token left in the translation".into(),
            ));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translated(original: &str, translation: &str) -> TextEntry {
        let mut e = TextEntry::new("1-title", "title", original.into());
        e.translation = translation.into();
        e.status = EntryStatus::Translated;
        e
    }

    fn codes(issues: &[QaIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.code.as_str()).collect()
    }

    #[test]
    fn clean_translation_has_no_issues() {
        assert!(run(&[translated("&aHello &lWorld", "&aПривет &lМир")]).is_empty());
    }

    #[test]
    fn lost_codes_are_reported() {
        let issues = run(&[translated("&aHello &lWorld", "&aПривет Мир")]);
        assert_eq!(codes(&issues), vec!["FORMAT_CODES_LOST"]);
    }

    #[test]
    fn leftover_token_is_reported() {
        let issues = run(&[translated("&aHello", "^^*^^Привет ^^*^^")]);
        assert!(codes(&issues).contains(&"PLACEHOLDER_LEFT"));
    }

    #[test]
    fn status_checks() {
        let mut failed = TextEntry::new("2-title", "title", "Stone".into());
        failed.status = EntryStatus::Failed;
        let same = translated("Stone", "Stone");
        let mut empty = translated("Stone", "");
        empty.translation.clear();
        let skipped = TextEntry::new("3-title", "title", "minecraft:stone".into());

        let issues = run(&[failed, same, empty, skipped]);
        assert_eq!(codes(&issues), vec!["FAILED", "SAME_AS_ORIGINAL", "EMPTY_TRANSLATION"]);
    }
}
