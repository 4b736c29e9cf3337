//! Pollcast Identity
//!
//! Stable identity for content the overlay does not control.
//!
//! The quiz page is rebuilt by a third party on every load, so nothing on it
//! carries a durable identifier. A question or answer is instead identified by
//! a SHA-256 digest of its rendered markup, after ordinal markers (`a.`, `b.`)
//! have been stripped so that shuffling answers does not change who they are.
//!
//! # Design
//!
//! - [`canonicalize`] removes ordinal-marker spans. It is idempotent.
//! - [`compute_digest`] hashes the canonical form. It is deterministic and
//!   side-effect free, so results can be memoized by content string.
//! - [`DigestCache`] is that memo.
//!
//! Every client that votes on the same page must arrive at the same digest,
//! which is why the hash primitive is fixed to SHA-256 over UTF-8 bytes.

mod cache;
mod canonical;
mod digest;
mod error;

pub use cache::DigestCache;
pub use canonical::{canonicalize, canonicalize_with, ORDINAL_MARKER_CLASS};
pub use digest::{ContentDigest, DIGEST_HEX_LEN};
pub use error::{Error, Result};

use sha2::{Digest, Sha256};

/// Compute the content digest of rendered markup.
///
/// The content is canonicalized first, so `"<span class=\"answernumber\">a. </span>4"`
/// and `"4"` share a digest.
pub fn compute_digest(content: &str) -> ContentDigest {
    compute_digest_with(content, ORDINAL_MARKER_CLASS)
}

/// [`compute_digest`] with a page-specific ordinal-marker class.
pub fn compute_digest_with(content: &str, marker_class: &str) -> ContentDigest {
    let canonical = canonicalize_with(content, marker_class);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    ContentDigest::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_deterministic() {
        let a = compute_digest("What is 2+2?");
        let b = compute_digest("What is 2+2?");
        assert_eq!(a, b);
    }

    #[test]
    fn digest_different_inputs() {
        assert_ne!(compute_digest("4"), compute_digest("5"));
        assert_ne!(compute_digest("a day"), compute_digest("a week"));
    }

    #[test]
    fn digest_matches_sha256_hex() {
        // Plain content is hashed verbatim, so other clients can reproduce it.
        assert_eq!(
            compute_digest("abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_ignores_ordinal_marker() {
        let labelled = compute_digest(r#"<span class="answernumber">b. </span>a day"#);
        let relabelled = compute_digest(r#"<span class="answernumber">d. </span>a day"#);
        assert_eq!(labelled, relabelled);
        assert_eq!(labelled, compute_digest("a day"));
    }

    #[test]
    fn custom_marker_class_is_stripped() {
        assert_eq!(
            compute_digest_with(r#"<span class="ordinal">ii. </span>a day"#, "ordinal"),
            compute_digest("a day")
        );
    }

    #[test]
    fn empty_content_has_a_digest() {
        assert_eq!(compute_digest("").to_hex().len(), DIGEST_HEX_LEN);
    }
}
