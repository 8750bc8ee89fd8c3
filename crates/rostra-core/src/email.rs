//! Email normalization and validation.
//!
//! The normalized email is the logical primary key of an employee within an
//! organization, so every intake path must apply the same normalization
//! before anything else looks at the value.

use regex::Regex;
use std::sync::LazyLock;

/// Accepts anything of the shape `local@domain.tld` with no whitespace.
/// Deliberately permissive: the upstream systems already hold these
/// addresses, so strict RFC validation would only create skipped rows.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

/// Lowercase and trim an email address.
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Validate an already-normalized email address.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_trims() {
        assert_eq!(normalize_email("  Alice@Example.COM  "), "alice@example.com");
    }

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(is_valid_email("x@y.z"));
    }

    #[test]
    fn test_invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign.example.com"));
        assert!(!is_valid_email("no-domain@"));
        assert!(!is_valid_email("no-tld@example"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("two@@example.com"));
    }
}
