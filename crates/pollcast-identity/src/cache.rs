//! Memoized digests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{compute_digest_with, ContentDigest, ORDINAL_MARKER_CLASS};

/// Content-string keyed memo of [`compute_digest_with`].
///
/// Digest lookups scan every question on the page per inbound payload entry,
/// so hashing the same markup again and again is the common case.
#[derive(Debug)]
pub struct DigestCache {
    marker_class: String,
    entries: Mutex<HashMap<String, ContentDigest>>,
}

impl Default for DigestCache {
    fn default() -> Self {
        Self::with_marker_class(ORDINAL_MARKER_CLASS)
    }
}

impl DigestCache {
    /// Create an empty cache using the default ordinal-marker class.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache that strips `marker_class` spans before hashing.
    pub fn with_marker_class(marker_class: impl Into<String>) -> Self {
        Self {
            marker_class: marker_class.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn marker_class(&self) -> &str {
        &self.marker_class
    }

    /// Digest of `content`, computed at most once per distinct string.
    pub fn digest(&self, content: &str) -> ContentDigest {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(digest) = entries.get(content) {
            return *digest;
        }
        let digest = compute_digest_with(content, &self.marker_class);
        entries.insert(content.to_string(), digest);
        digest
    }

    /// Number of distinct contents hashed so far.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether nothing has been hashed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
