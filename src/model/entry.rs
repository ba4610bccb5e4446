use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One translatable string found in a document.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TextEntry {
    pub entry_id: String,

    /// Field key (`title`, `description`) or JSON path (`pages[0].text`).
    #[serde(default)]
    pub field: String,

    #[serde(default)]
    pub original: String,

    #[serde(default)]
    pub translation: String,

    #[serde(default)]
    pub status: EntryStatus,

    /// Byte span of the whole source literal, quotes included.
    #[serde(skip)]
    pub span: Option<Range<usize>>,

    /// Quote character of the source literal, if any.
    #[serde(skip)]
    pub quote: Option<char>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    #[default]
    Untranslated,
    Translated,
    Skipped,
    Failed,
}

impl TextEntry {
    pub fn new(entry_id: impl Into<String>, field: impl Into<String>, original: String) -> Self {
        TextEntry {
            entry_id: entry_id.into(),
            field: field.into(),
            original,
            translation: String::new(),
            status: EntryStatus::Untranslated,
            span: None,
            quote: None,
        }
    }

    /// Text to write back: the translation if there is one, else the original.
    pub fn output(&self) -> &str {
        if self.translation.trim().is_empty() {
            &self.original
        } else {
            &self.translation
        }
    }
}

/// What the pipeline did with one input string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Translated now or served from the cache.
    Translated(String),
    /// Filtered out before reaching the translator.
    Skipped,
    /// The translator errored or returned something unusable.
    Failed,
    /// Never attempted, the run was cancelled first.
    Pending,
}

impl Outcome {
    /// The translation, or `original` when there is none.
    pub fn text_or<'a>(&'a self, original: &'a str) -> &'a str {
        match self {
            Outcome::Translated(t) => t,
            _ => original,
        }
    }
}

impl From<&str> for Outcome {
    fn from(text: &str) -> Self {
        Outcome::Translated(text.to_string())
    }
}

/// Fills `translation`/`status` for entries from outcomes aligned with them.
pub fn apply_translations(entries: &mut [TextEntry], outcomes: Vec<Outcome>) {
    for (e, outcome) in entries.iter_mut().zip(outcomes) {
        e.translation.clear();
        e.status = match outcome {
            Outcome::Translated(t) if t == e.original => EntryStatus::Skipped,
            Outcome::Translated(t) => {
                e.translation = t;
                EntryStatus::Translated
            }
            Outcome::Skipped => EntryStatus::Skipped,
            Outcome::Failed => EntryStatus::Failed,
            Outcome::Pending => EntryStatus::Untranslated,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_falls_back_to_original() {
        let mut e = TextEntry::new("1", "title", "Stone".into());
        assert_eq!(e.output(), "Stone");
        e.translation = "Камень".into();
        assert_eq!(e.output(), "Камень");
    }

    #[test]
    fn unchanged_strings_are_marked_skipped() {
        let mut entries = vec![
            TextEntry::new("1", "title", "Stone".into()),
            TextEntry::new("2", "title", "minecraft:stone".into()),
        ];
        apply_translations(&mut entries, vec!["Камень".into(), "minecraft:stone".into()]);
        assert_eq!(entries[0].status, EntryStatus::Translated);
        assert_eq!(entries[1].status, EntryStatus::Skipped);
        assert_eq!(entries[1].output(), "minecraft:stone");
    }

    #[test]
    fn outcomes_map_to_statuses() {
        let mut entries = vec![
            TextEntry::new("1", "title", "Stone".into()),
            TextEntry::new("2", "title", "Iron".into()),
            TextEntry::new("3", "title", "Gold".into()),
        ];
        entries[1].translation = "stale".into();
        apply_translations(&mut entries, vec![Outcome::Skipped, Outcome::Failed, Outcome::Pending]);
        assert_eq!(entries[0].status, EntryStatus::Skipped);
        assert_eq!(entries[1].status, EntryStatus::Failed);
        assert_eq!(entries[1].output(), "Iron");
        assert_eq!(entries[2].status, EntryStatus::Untranslated);
    }
}
