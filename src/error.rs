use std::path::PathBuf;

use crate::document::DocumentFormat;

pub type Result<T, E = ManifestError> = std::result::Result<T, E>;

/// Errors raised while loading, expanding, filtering or saving a manifest tree.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Unknown format of {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {} document {}: {message}", .format.as_str(), .path.display())]
    Parse {
        path: PathBuf,
        format: DocumentFormat,
        message: String,
    },

    #[error("Failed to serialize {} document: {message}", .format.as_str())]
    Serialize {
        format: DocumentFormat,
        message: String,
    },

    #[error("{context} is missing required key `{key}`")]
    MissingKey { key: &'static str, context: String },

    #[error("{context}: expected {expected}")]
    UnexpectedShape {
        context: String,
        expected: &'static str,
    },

    #[error("Invalid cleanup pattern")]
    InvalidPattern(#[from] regex::Error),
}

impl ManifestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            ManifestError::NotFound(path)
        } else {
            ManifestError::Io { path, source }
        }
    }

    pub(crate) fn missing_key(key: &'static str, context: impl Into<String>) -> Self {
        ManifestError::MissingKey {
            key,
            context: context.into(),
        }
    }

    pub(crate) fn shape(context: impl Into<String>, expected: &'static str) -> Self {
        ManifestError::UnexpectedShape {
            context: context.into(),
            expected,
        }
    }
}
