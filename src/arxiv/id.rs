//! arXiv identifier validation and normalisation.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::ArxivError;

/// Modern ids: `YYMM.NNNN` or `YYMM.NNNNN`, optionally versioned
fn new_style() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}\.\d{4,5}(v\d+)?$").expect("static regex"))
}

/// Legacy ids: `archive[.SC]/YYMMNNN`, optionally versioned
fn old_style() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z][a-z-]*(\.[A-Z]{2})?/\d{7}(v\d+)?$").expect("static regex")
    })
}

/// Whether `id` is a well-formed arXiv identifier (either scheme)
pub fn is_valid_arxiv_id(id: &str) -> bool {
    new_style().is_match(id) || old_style().is_match(id)
}

/// Fail with a validation error naming `id` if it is malformed
pub fn validate_id(id: &str) -> Result<(), ArxivError> {
    if is_valid_arxiv_id(id) {
        Ok(())
    } else {
        Err(ArxivError::Validation(format!(
            "Invalid arXiv ID format: {}",
            id
        )))
    }
}

/// Remove a trailing `vN` version suffix, if any
pub fn strip_version(id: &str) -> &str {
    match id.rfind('v') {
        Some(pos)
            if pos > 0
                && pos + 1 < id.len()
                && id[pos + 1..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            &id[..pos]
        }
        _ => id,
    }
}

/// Parse an arXiv ID from various formats
///
/// Handles formats like:
/// - "2301.12345"
/// - "2301.12345v1" (version is kept)
/// - "arXiv:2301.12345"
/// - "https://arxiv.org/abs/2301.12345v1"
/// - "https://arxiv.org/pdf/2301.12345v1.pdf"
/// - "hep-th/9901001"
pub fn normalize_id(input: &str) -> Result<String, ArxivError> {
    let mut id = input.trim();

    for marker in ["/abs/", "/pdf/"] {
        if let Some(pos) = id.find(marker) {
            id = &id[pos + marker.len()..];
            break;
        }
    }
    id = id.trim_end_matches('/');
    id = id.strip_suffix(".pdf").unwrap_or(id);

    if id.get(..6).is_some_and(|p| p.eq_ignore_ascii_case("arxiv:")) {
        id = &id[6..];
    }

    if id.is_empty() {
        return Err(ArxivError::Validation("Empty arXiv ID".to_string()));
    }

    validate_id(id)?;
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        for id in [
            "2301.00001",
            "2301.12345v3",
            "0704.0001",
            "hep-th/9901001",
            "hep-th/9901001v2",
            "math.GT/0309136",
        ] {
            assert!(is_valid_arxiv_id(id), "{id} should be valid");
        }
    }

    #[test]
    fn test_invalid_ids() {
        for id in [
            "",
            "2301.1",
            "12345",
            "2301.123456",
            "2301.12345v",
            "HEP-TH/9901001",
            "hep-th/990100",
            "2301.12345 ",
        ] {
            assert!(!is_valid_arxiv_id(id), "{id:?} should be invalid");
        }
    }

    #[test]
    fn test_validate_id_names_offender() {
        let err = validate_id("bogus").unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_strip_version() {
        assert_eq!(strip_version("2301.12345v2"), "2301.12345");
        assert_eq!(strip_version("2301.12345"), "2301.12345");
        assert_eq!(strip_version("hep-th/9901001v10"), "hep-th/9901001");
        assert_eq!(strip_version("v1"), "v1");
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("2301.12345").unwrap(), "2301.12345");
        assert_eq!(normalize_id("arXiv:2301.12345").unwrap(), "2301.12345");
        assert_eq!(normalize_id("ARXIV:2301.12345v2").unwrap(), "2301.12345v2");
        assert_eq!(
            normalize_id("https://arxiv.org/abs/2301.12345v1").unwrap(),
            "2301.12345v1"
        );
        assert_eq!(
            normalize_id("https://arxiv.org/pdf/2301.12345v1.pdf").unwrap(),
            "2301.12345v1"
        );
        assert_eq!(
            normalize_id("http://arxiv.org/abs/hep-th/9901001").unwrap(),
            "hep-th/9901001"
        );
    }

    #[test]
    fn test_normalize_id_errors() {
        assert!(normalize_id("").is_err());
        assert!(normalize_id("arxiv:").is_err());
        assert!(normalize_id("https://example.com/paper").is_err());
    }
}
