//! Error fingerprinting for grouping identical errors.
//!
//! The fingerprint is the first 16 hex characters of the SHA-256 digest of
//! the raw error message. Nothing is normalised, so messages that embed
//! variable data (IDs, line numbers, timestamps) land in separate issues.

use sha2::{Digest, Sha256};

/// Length of a fingerprint in hex characters (64 bits of the digest).
pub const FINGERPRINT_LEN: usize = 16;

/// Compute the grouping fingerprint of an error message.
#[must_use]
pub fn compute_fingerprint(message: &str) -> String {
    let digest = Sha256::digest(message.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}

/// Whether `value` has the shape of a fingerprint produced by
/// [`compute_fingerprint`].
#[must_use]
pub fn is_fingerprint(value: &str) -> bool {
    value.len() == FINGERPRINT_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_message_same_fingerprint() {
        let f1 = compute_fingerprint("NullPointerException at line 42");
        let f2 = compute_fingerprint("NullPointerException at line 42");

        assert_eq!(f1, f2);
    }

    #[test]
    fn matches_truncated_sha256() {
        // sha256("hello") = 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824
        assert_eq!(compute_fingerprint("hello"), "2cf24dba5fb0a30e");
        // sha256("") = e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
        assert_eq!(compute_fingerprint(""), "e3b0c44298fc1c14");
    }

    #[test]
    fn no_normalisation_applied() {
        let base = compute_fingerprint("Request 42 failed");

        assert_ne!(base, compute_fingerprint("Request 43 failed"));
        assert_ne!(base, compute_fingerprint("request 42 failed"));
        assert_ne!(base, compute_fingerprint("Request 42 failed "));
    }

    #[test]
    fn fingerprint_is_valid_hex() {
        let messages = [
            "",
            "a",
            "TypeError: undefined is not a function",
            "ünïcödé failure ✗",
            "multi\nline\nmessage",
        ];

        for message in messages {
            let result = compute_fingerprint(message);
            assert_eq!(result.len(), FINGERPRINT_LEN);
            assert!(is_fingerprint(&result), "{result} is not a fingerprint");
        }
    }

    #[test]
    fn distinct_messages_do_not_collide() {
        let fingerprints: std::collections::HashSet<_> = (0..10_000)
            .map(|i| compute_fingerprint(&format!("error number {i}")))
            .collect();

        assert_eq!(fingerprints.len(), 10_000);
    }

    #[test]
    fn fingerprint_shape_check() {
        assert!(is_fingerprint("0123456789abcdef"));
        assert!(!is_fingerprint("0123456789ABCDEF"));
        assert!(!is_fingerprint("0123456789abcde"));
        assert!(!is_fingerprint("0123456789abcdefa"));
        assert!(!is_fingerprint("0123456789abcdeg"));
    }
}
