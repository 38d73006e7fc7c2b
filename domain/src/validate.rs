//! Lightweight input validation helpers. Keep logic minimal and deterministic.

use crate::Code;
use crate::CoreError;

/// Validate a redirect target. Intentionally only a non-emptiness check —
/// the service stores and returns the URL byte-for-byte, without parsing,
/// normalization, or scheme checks.
pub fn validate_long_url(s: &str) -> Result<(), CoreError> {
    if s.trim().is_empty() {
        return Err(CoreError::InvalidUrl("empty".into()));
    }
    Ok(())
}

/// Validate a caller-supplied custom code: non-empty, at least `min_length`
/// characters, and within the alphabet superset accepted by `Code::new`.
///
/// The minimum length is deliberately above the auto-generated code length,
/// so random and custom codes stay disjoint in practice.
pub fn validate_custom_code(s: &str, min_length: usize) -> Result<Code, CoreError> {
    if s.is_empty() {
        return Err(CoreError::InvalidCode("empty".into()));
    }
    if s.len() < min_length {
        return Err(CoreError::InvalidCode(format!(
            "custom codes must be at least {} characters",
            min_length
        )));
    }
    Code::new(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_validation_is_non_emptiness_only() {
        assert!(validate_long_url("https://example.com").is_ok());
        assert!(validate_long_url("ftp://example.com").is_ok());
        assert!(validate_long_url("not even a url").is_ok());
        assert!(validate_long_url("").is_err());
        assert!(validate_long_url("   ").is_err());
    }

    #[test]
    fn custom_code_length_policy() {
        assert!(validate_custom_code("mycustom", 8).is_ok());
        assert!(validate_custom_code("short", 8).is_err());
        assert!(validate_custom_code("", 8).is_err());
        // exactly at the boundary
        assert!(validate_custom_code("12345678", 8).is_ok());
        assert!(validate_custom_code("1234567", 8).is_err());
    }

    #[test]
    fn custom_code_charset_delegates_to_code() {
        assert!(validate_custom_code("my-custom_1", 8).is_ok());
        assert!(validate_custom_code("bad/chars!!", 8).is_err());
    }
}
