//! Resource loading error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::BackendError;

/// Errors produced by the resource cache's load operations.
///
/// Lookup misses are not errors; the try-get accessors return `Option`.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A shader source file could not be read.
    #[error("failed to read shader source {path}: {source}")]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An image could not be opened or decoded.
    #[error("failed to decode image {path}: {reason}")]
    DecodeFailure { path: PathBuf, reason: String },
    /// The backend rejected the asset (compile, link, or upload failure).
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_path() {
        let err = ResourceError::FileNotFound {
            path: PathBuf::from("assets/shaders/missing.wgsl"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("assets/shaders/missing.wgsl"));

        let err = ResourceError::DecodeFailure {
            path: PathBuf::from("broken.png"),
            reason: "unexpected end of file".into(),
        };
        assert!(err.to_string().contains("unexpected end of file"));
    }
}
