use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for llmcat operations
#[derive(Error, Debug)]
pub enum LlmcatError {
    /// Base directory is missing or not a directory
    #[error("Invalid base directory: {path}")]
    InvalidBaseDirectory { path: PathBuf },

    /// Home directory lookup or path normalization failed
    #[error("Failed to expand path {path}: {message}")]
    PathExpansion { path: String, message: String },

    /// Glob pattern is malformed or traversing for it failed
    #[error("Failed to expand glob pattern {pattern}: {message}")]
    PatternExpansion { pattern: String, message: String },

    /// Resolved path vanished or turned into a directory before it was read
    #[error("Cannot access file {path}: {message}")]
    FileAccess { path: PathBuf, message: String },

    /// Opening or reading a resolved file failed
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing to the output stream failed
    #[error("Failed to write output: {0}")]
    OutputWrite(#[source] io::Error),

    /// Regex compilation error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LlmcatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LlmcatError::InvalidBaseDirectory {
            path: PathBuf::from("/no/such/dir"),
        };
        assert_eq!(format!("{err}"), "Invalid base directory: /no/such/dir");

        let err = LlmcatError::PatternExpansion {
            pattern: "[a-".to_string(),
            message: "unclosed character class".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Failed to expand glob pattern [a-: unclosed character class"
        );

        let err = LlmcatError::FileAccess {
            path: PathBuf::from("/tmp/gone.txt"),
            message: "is a directory, not a file".to_string(),
        };
        assert!(format!("{err}").contains("/tmp/gone.txt"));

        let err = LlmcatError::PathExpansion {
            path: "~/notes".to_string(),
            message: "home directory not found".to_string(),
        };
        assert!(format!("{err}").contains("~/notes"));
    }

    #[test]
    fn test_error_sources() {
        use std::error::Error as _;

        let err = LlmcatError::FileRead {
            path: PathBuf::from("locked.txt"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(format!("{err}").contains("locked.txt"));
        assert!(err.source().is_some());

        let err = LlmcatError::OutputWrite(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert_eq!(format!("{err}"), "Failed to write output: pipe");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: LlmcatError = json_err.into();
        assert!(matches!(err, LlmcatError::Json(_)));
    }
}
