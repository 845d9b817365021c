//! Error taxonomy shared by every component of the crate.

/// Errors that can occur when searching arXiv or downloading papers
#[derive(Debug, thiserror::Error)]
pub enum ArxivError {
    /// Bad caller input; never retried
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport failure or non-2xx HTTP status
    #[error("Network error: {0}")]
    Network(String),

    /// Structurally invalid response payload
    #[error("Parse error: {0}")]
    Parse(String),

    /// A well-formed lookup matched nothing upstream
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded or rendered
    #[error("Config error: {0}")]
    Config(String),
}

impl ArxivError {
    /// Whether a retry may succeed where this attempt failed
    pub fn is_transient(&self) -> bool {
        matches!(self, ArxivError::Network(_))
    }
}

impl From<reqwest::Error> for ArxivError {
    fn from(err: reqwest::Error) -> Self {
        ArxivError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ArxivError {
    fn from(err: serde_json::Error) -> Self {
        ArxivError::Parse(format!("JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_errors_are_transient() {
        assert!(ArxivError::Network("connection reset".to_string()).is_transient());
        assert!(!ArxivError::Validation("bad id".to_string()).is_transient());
        assert!(!ArxivError::Parse("unexpected eof".to_string()).is_transient());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!ArxivError::from(io).is_transient());
    }

    #[test]
    fn test_display_names_the_problem() {
        let err = ArxivError::Validation("Invalid arXiv ID format: 12345".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: Invalid arXiv ID format: 12345"
        );
    }
}
