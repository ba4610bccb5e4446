//! Fixed terminology applied to finished translations.
//!
//! A glossary file is a JSON object. Values are either replacements or nested
//! sections of replacements:
//!
//! ```json
//! { "minecraft_terms": { "Creeper": "Крипер" }, "mod_specific": { "Mana": "Мана" } }
//! ```

use std::path::Path;

use regex::{NoExpand, Regex};
use serde_json::Value;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
struct Term {
    pattern: Regex,
    replacement: String,
}

/// Whole-word, case-insensitive replacements. Longer terms are applied first.
#[derive(Debug, Clone, Default)]
pub struct Glossary {
    terms: Vec<Term>,
}

impl Glossary {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let root: Value = serde_json::from_str(&text)?;
        let mut pairs = Vec::new();
        collect(&root, &mut pairs)?;
        let glossary = Self::from_pairs(pairs)?;
        tracing::info!(path = %path.display(), terms = glossary.len(), "glossary loaded");
        Ok(glossary)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut entries: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().trim().to_string(), v.into()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        entries.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));

        let terms = entries
            .into_iter()
            .map(|(term, replacement)| {
                let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&term)))
                    .map_err(|e| CoreError::Config(format!("glossary term {term:?}: {e}")))?;
                Ok(Term { pattern, replacement })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Glossary { terms })
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for term in &self.terms {
            if term.pattern.is_match(&out) {
                out = term.pattern.replace_all(&out, NoExpand(&term.replacement)).into_owned();
            }
        }
        out
    }
}

fn collect(value: &Value, out: &mut Vec<(String, String)>) -> Result<()> {
    let Value::Object(map) = value else {
        return Err(CoreError::Layout("glossary must be a JSON object".into()));
    };
    for (key, v) in map {
        match v {
            Value::String(s) => out.push((key.clone(), s.clone())),
            Value::Object(_) => collect(v, out)?,
            _ => return Err(CoreError::Layout(format!("glossary entry {key:?} is not a string or section"))),
        }
    }
    Ok(())
}
