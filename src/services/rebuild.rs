use crate::model::entry::{EntryStatus, TextEntry};
use crate::parsers::snbt::quote_string;

/// Rewrites `source` with every translated literal spliced into its original span.
///
/// Everything outside the spans (layout, comments, numbers, other keys) is
/// copied byte for byte. Entries without a span or translation are left alone.
pub fn splice(source: &str, entries: &[TextEntry]) -> String {
    let mut edits: Vec<(&std::ops::Range<usize>, String)> = entries
        .iter()
        .filter(|e| e.status == EntryStatus::Translated && !e.translation.trim().is_empty())
        .filter_map(|e| {
            let span = e.span.as_ref()?;
            let quote = e.quote.unwrap_or('"');
            Some((span, quote_string(&e.translation, quote)))
        })
        .collect();
    edits.sort_by_key(|(span, _)| span.start);

    let mut out = String::with_capacity(source.len() + source.len() / 4);
    let mut cursor = 0;
    for (span, literal) in edits {
        // overlapping or out-of-range spans would corrupt the document
        if span.start < cursor || span.end > source.len() {
            tracing::warn!(start = span.start, end = span.end, "skipping bad span");
            continue;
        }
        out.push_str(&source[cursor..span.start]);
        out.push_str(&literal);
        cursor = span.end;
    }
    out.push_str(&source[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::apply_translations;
    use crate::parsers::snbt;
    use pretty_assertions::assert_eq;

    #[test]
    fn splices_translations_and_keeps_layout() {
        let src = "{\n\ttitle: \"Stone Age\"\n\tx: 1.5d\n\tdescription: [\"Mine \\\"rocks\\\".\", \"\"]\n}\n";
        let root = snbt::parse(src).unwrap();
        let mut entries = snbt::extract(&root);
        let originals: Vec<String> = entries.iter().map(|e| e.original.clone()).collect();
        assert_eq!(originals, vec!["Stone Age", "Mine \"rocks\".", ""]);

        apply_translations(
            &mut entries,
            vec!["Каменный век".into(), "Добывай \"камни\".".into(), "".into()],
        );
        let out = splice(src, &entries);
        assert_eq!(
            out,
            "{\n\ttitle: \"Каменный век\"\n\tx: 1.5d\n\tdescription: [\"Добывай \\\"камни\\\".\", \"\"]\n}\n"
        );
        assert!(snbt::parse(&out).is_ok());
    }

    #[test]
    fn untranslated_source_is_returned_unchanged() {
        let src = "{ title: 'Ore' }";
        let root = snbt::parse(src).unwrap();
        let entries = snbt::extract(&root);
        assert_eq!(splice(src, &entries), src);
    }

    #[test]
    fn keeps_single_quotes() {
        let src = "{ title: 'Ore' }";
        let root = snbt::parse(src).unwrap();
        let mut entries = snbt::extract(&root);
        apply_translations(&mut entries, vec!["Руда 'X'".into()]);
        assert_eq!(splice(src, &entries), "{ title: 'Руда \\'X\\'' }");
    }
}
