//! Error types for spatial indexing and GML decoding.

use std::io;
use thiserror::Error;

/// Errors that can occur in spatial indexing operations.
///
/// The taxonomy keeps three remediation paths distinguishable for callers:
/// "no index exists yet" ([`SpatialError::IndexNotFound`]), "an index exists
/// but its bytes are broken" ([`SpatialError::IndexCorrupt`]) and "the input
/// geometry is malformed" (the decoder variants).
#[derive(Debug, Error)]
pub enum SpatialError {
    /// Index construction or a nearest-neighbour search was asked to work
    /// over zero eligible items.
    #[error("spatial index holds no eligible items")]
    EmptyIndex,

    /// No persisted index file exists (or it is unreadable) for the database.
    #[error("no spatial index found for database '{0}'")]
    IndexNotFound(String),

    /// The persisted index bytes are structurally invalid.
    #[error("spatial index is corrupt: {0}")]
    IndexCorrupt(String),

    /// A GML element does not describe any known geometry type.
    #[error("unrecognized geometry type <{0}>")]
    UnrecognizedGeometryType(String),

    /// A polygon's boundary elements are inconsistent.
    #[error("invalid polygon boundary: {0}")]
    MissingBoundary(String),

    /// A coordinate tuple could not be read.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// A structurally well-formed element produced an invalid geometry.
    #[error("geometry construction failed: {0}")]
    GeometryConstruction(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for spatial operations.
pub type SpatialResult<T> = Result<T, SpatialError>;
