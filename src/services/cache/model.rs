use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub source_text: String,
    pub target_lang: String,
    pub translated_text: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_entries: usize,
    pub store_entries: Option<usize>,
    pub degraded: bool,
}
