use sha2::{Digest, Sha256};

/// Content address of a (text, language) pair.
pub fn cache_key(text: &str, target_lang: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b":");
    hasher.update(target_lang.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}
