use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::model::CacheEntry;
use crate::error::Result;

// SQLite's default bound-parameter limit is 999; one slot is taken by the language.
const MAX_PARAMS: usize = 900;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS translations (
        source_hash TEXT PRIMARY KEY,
        source_text TEXT,
        target_lang TEXT,
        translated_text TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_lang ON translations(target_lang);
";

/// SQLite backing store. Opens a fresh connection per operation so it can be
/// shared between worker threads; SQLite serializes the writers.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = SqliteStore {
            path: path.as_ref().to_path_buf(),
        };
        if let Some(parent) = store.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        store.connect()?.execute_batch(SCHEMA)?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Looks up `hashes` for `target_lang`, returning only the ones found.
    pub fn get_many(&self, hashes: &[String], target_lang: &str) -> Result<HashMap<String, String>> {
        let mut found = HashMap::new();
        if hashes.is_empty() {
            return Ok(found);
        }

        let conn = self.connect()?;
        for chunk in hashes.chunks(MAX_PARAMS) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql = format!(
                "SELECT source_hash, translated_text FROM translations \
                 WHERE target_lang = ? AND source_hash IN ({placeholders})"
            );
            let mut stmt = conn.prepare(&sql)?;
            let args = std::iter::once(target_lang).chain(chunk.iter().map(String::as_str));
            let rows = stmt.query_map(params_from_iter(args), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (hash, text) = row?;
                found.insert(hash, text);
            }
        }

        Ok(found)
    }

    pub fn save_many(&self, entries: &[CacheEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO translations \
                 (source_hash, source_text, target_lang, translated_text) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for e in entries {
                stmt.execute(params![e.source_hash, e.source_text, e.target_lang, e.translated_text])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.connect()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM translations", [], |row| row.get(0))?;
        Ok(n.max(0) as usize)
    }

    #[cfg(test)]
    pub fn load_entry(&self, hash: &str) -> Result<Option<CacheEntry>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT source_hash, source_text, target_lang, translated_text, created_at \
             FROM translations WHERE source_hash = ?1",
        )?;
        let mut rows = stmt.query(params![hash])?;
        match rows.next()? {
            Some(row) => Ok(Some(CacheEntry {
                source_hash: row.get(0)?,
                source_text: row.get(1)?,
                target_lang: row.get(2)?,
                translated_text: row.get(3)?,
                created_at: row.get(4)?,
            })),
            None => Ok(None),
        }
    }
}
