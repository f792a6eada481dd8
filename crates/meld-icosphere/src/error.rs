//! Error types for the icosphere engine.

use thiserror::Error;

use crate::cache::CacheKey;
use crate::neighbours::DegenerateReason;

/// Result type for icosphere operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or querying icosphere levels.
#[derive(Debug, Error)]
pub enum Error {
    /// The level's surface file is missing or malformed.
    #[error("cannot load icosphere level {level}: {source}")]
    MeshLoad {
        level: u8,
        #[source]
        source: meld_mesh::MeshLoadError,
    },

    /// A vertex's triangle fan does not close into a single ring.
    #[error("level {level}: vertex {vertex} has no single closed neighbour ring ({reason})")]
    DegenerateVertex {
        level: u8,
        vertex: u32,
        reason: DegenerateReason,
    },

    /// A cache entry exists but cannot be decoded or does not fit the mesh.
    #[error("cache entry {key} is corrupt: {reason}")]
    CacheCorruption { key: CacheKey, reason: String },

    /// Reading or writing a cache file failed.
    #[error("cache I/O error: {0}")]
    CacheIo(#[from] std::io::Error),

    /// Cache envelope could not be serialized.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// The level was not built by this registry.
    #[error("icosphere level {0} is not loaded")]
    UnknownLevel(u8),

    /// Configuration values are out of range or unparseable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
