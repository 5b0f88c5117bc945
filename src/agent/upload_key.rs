use crate::config::{UPLOAD_KEY_CHARSET, UPLOAD_KEY_LEN};
use rand::Rng;

/// Random per-message prefix for uploaded files.
///
/// Generated once per incoming message; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadKey(String);

impl UploadKey {
    /// Generate a fresh key of `UPLOAD_KEY_LEN` uppercase letters and digits
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_with_len(UPLOAD_KEY_LEN)
    }

    /// Generate a fresh key of the given length
    #[must_use]
    pub fn generate_with_len(len: usize) -> Self {
        let mut rng = rand::thread_rng();
        let key = (0..len)
            .map(|_| char::from(UPLOAD_KEY_CHARSET[rng.gen_range(0..UPLOAD_KEY_CHARSET.len())]))
            .collect();
        Self(key)
    }

    /// Wrap an existing key
    #[must_use]
    pub fn from_string(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UploadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_shape() {
        let key = UploadKey::generate();
        assert_eq!(key.as_str().len(), UPLOAD_KEY_LEN);
        assert!(key
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = UploadKey::generate();
        let b = UploadKey::generate();
        assert_ne!(a, b);
    }
}
