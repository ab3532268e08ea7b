//! Error types for hierarchy construction.

use bvhtrace::BvhError;
use thiserror::Error;

/// Errors that can occur while building a hierarchy.
#[derive(Error, Debug)]
pub enum BuildError {
    /// No triangles were given.
    #[error("no triangles to build from")]
    EmptyInput,

    /// Build settings are out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// A triangle has a non-finite vertex (index in build input order).
    #[error("triangle {0} has a non-finite vertex")]
    DegenerateTriangle(usize),

    /// Mesh vertex or index buffers are malformed.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// The finished node and primitive arrays were rejected.
    #[error("hierarchy rejected: {0}")]
    Hierarchy(#[from] BvhError),

    /// Settings could not be parsed.
    #[error("failed to parse settings: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;
