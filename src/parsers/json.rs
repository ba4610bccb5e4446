//! String extraction for mod lang files and Patchouli book pages.

use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::model::entry::TextEntry;

/// Patchouli keys that hold reader-facing text. Everything else (`type`, `icon`,
/// `entry`, `recipe`, ...) is an identifier and must stay as is.
const PATCHOULI_TEXT_KEYS: &[&str] = &[
    "name",
    "title",
    "subtitle",
    "text",
    "description",
    "landing_text",
    "link_text",
];

/// Top-level string values of a lang file, in key order.
pub fn lang_entries(root: &Value) -> Result<Vec<TextEntry>> {
    let obj = root
        .as_object()
        .ok_or_else(|| CoreError::Layout("lang file is not a JSON object".into()))?;

    Ok(obj
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| TextEntry::new(k.clone(), k.clone(), s.to_string())))
        .collect())
}

/// Writes translations back into a lang object; `entries` must come from [`lang_entries`].
pub fn apply_lang(root: &mut Value, entries: &[TextEntry]) {
    if let Some(obj) = root.as_object_mut() {
        for e in entries {
            if let Some(slot) = obj.get_mut(&e.field) {
                *slot = Value::String(e.output().to_string());
            }
        }
    }
}

fn is_patchouli_text(key: &str) -> bool {
    PATCHOULI_TEXT_KEYS.contains(&key)
}

/// Reader-facing strings of a Patchouli page, in document order.
pub fn patchouli_entries(root: &Value) -> Vec<TextEntry> {
    let mut out = Vec::new();
    collect(root, "", false, &mut out);
    out
}

fn collect(value: &Value, path: &str, text_context: bool, out: &mut Vec<TextEntry>) {
    match value {
        Value::String(s) if text_context => {
            out.push(TextEntry::new(format!("{}-{}", out.len() + 1, path), path, s.clone()));
        }
        Value::Object(map) => {
            for (k, v) in map {
                let child = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                collect(v, &child, is_patchouli_text(k), out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                collect(v, &format!("{path}[{i}]"), text_context, out);
            }
        }
        _ => {}
    }
}

/// Replaces the strings found by [`patchouli_entries`] with their output text.
pub fn apply_patchouli(root: &mut Value, entries: &[TextEntry]) {
    let mut it = entries.iter();
    replace(root, false, &mut it);
}

fn replace<'a>(value: &mut Value, text_context: bool, it: &mut impl Iterator<Item = &'a TextEntry>) {
    match value {
        Value::String(s) if text_context => {
            if let Some(e) = it.next() {
                *s = e.output().to_string();
            }
        }
        Value::Object(map) => {
            for (k, v) in map.iter_mut() {
                let ctx = is_patchouli_text(k);
                replace(v, ctx, it);
            }
        }
        Value::Array(items) => {
            for v in items {
                replace(v, text_context, it);
            }
        }
        _ => {}
    }
}

/// Serializes the way mod lang files are usually written: pretty, two-space indent.
pub fn to_pretty(value: &Value) -> Result<String> {
    let mut s = serde_json::to_string_pretty(value)?;
    s.push('\n');
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::apply_translations;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn lang_keeps_key_order() {
        let root: Value = serde_json::from_str(
            r#"{"item.mod.zeta": "Zeta", "block.mod.alpha": "Alpha", "mod.count": 3}"#,
        )
        .unwrap();
        let mut entries = lang_entries(&root).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].field, "item.mod.zeta");

        apply_translations(&mut entries, vec!["Зета".into(), "Альфа".into()]);
        let mut out = root.clone();
        apply_lang(&mut out, &entries);
        assert_eq!(
            serde_json::to_string(&out).unwrap(),
            r#"{"item.mod.zeta":"Зета","block.mod.alpha":"Альфа","mod.count":3}"#
        );
    }

    #[test]
    fn lang_must_be_an_object() {
        assert!(lang_entries(&json!(["a"])).is_err());
    }

    #[test]
    fn patchouli_collects_only_text_keys() {
        let page = json!({
            "name": "Getting Started",
            "icon": "minecraft:book",
            "category": "basics",
            "pages": [
                { "type": "text", "text": "Welcome to the mod." },
                { "type": "spotlight", "item": "mod:gear", "title": "Gears", "text": "Gears turn." }
            ]
        });
        let entries = patchouli_entries(&page);
        let texts: Vec<_> = entries.iter().map(|e| (e.field.as_str(), e.original.as_str())).collect();
        assert_eq!(
            texts,
            vec![
                ("name", "Getting Started"),
                ("pages[0].text", "Welcome to the mod."),
                ("pages[1].title", "Gears"),
                ("pages[1].text", "Gears turn."),
            ]
        );
    }

    #[test]
    fn patchouli_apply_mirrors_collect() {
        let mut page = json!({
            "name": "Tools",
            "pages": [{ "type": "text", "text": "Use tools." }]
        });
        let mut entries = patchouli_entries(&page);
        apply_translations(&mut entries, vec!["Инструменты".into(), "Используйте инструменты.".into()]);
        apply_patchouli(&mut page, &entries);
        assert_eq!(
            page,
            json!({
                "name": "Инструменты",
                "pages": [{ "type": "text", "text": "Используйте инструменты." }]
            })
        );
    }
}
