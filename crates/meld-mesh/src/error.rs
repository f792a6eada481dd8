//! Error types for surface loading.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshLoadError>;

/// Errors raised while reading or writing a surface geometry file.
#[derive(Debug, Error)]
pub enum MeshLoadError {
    /// The geometry file could not be opened or read.
    #[error("cannot read surface {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not well-formed XML.
    #[error("malformed GIFTI XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// A required data array (coordinates or triangles) is absent.
    #[error("missing {0} data array")]
    MissingArray(&'static str),

    /// An attribute value is missing or cannot be parsed.
    #[error("invalid attribute {name}={value:?}")]
    InvalidAttribute { name: &'static str, value: String },

    /// Encoding or data type this reader does not handle.
    #[error("unsupported {kind}: {value}")]
    Unsupported { kind: &'static str, value: String },

    /// Base64 payload could not be decoded.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Payload length disagrees with the declared dimensions.
    #[error("{array} payload holds {actual} values, expected {expected}")]
    SizeMismatch {
        array: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Array has the wrong shape for its role (e.g. coordinates not N×3).
    #[error("{array} array has shape {dims:?}, expected [n, 3]")]
    BadShape { array: &'static str, dims: Vec<usize> },

    /// An ASCII value could not be parsed as a number.
    #[error("invalid number {0:?} in ASCII payload")]
    InvalidNumber(String),

    /// A triangle refers to a vertex that does not exist.
    #[error("face {face} references vertex {vertex}, but only {vertices} vertices exist")]
    FaceOutOfRange {
        face: usize,
        vertex: i64,
        vertices: usize,
    },
}

impl MeshLoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
