//! Document-store collaborator interface.

use std::path::PathBuf;

use crate::error::SpatialResult;
use crate::gml::GmlElement;
use crate::strtree::types::ItemRef;

/// Access to the host database's persisted documents.
///
/// The engine needs exactly two things from the store: resolving an item
/// reference to its geometry-bearing element (for query refinement), and
/// knowing where a database keeps its metadata so the index file can live
/// alongside it.
pub trait DocumentStore: Send + Sync {
    /// Resolves an item reference to its geometry element.
    fn node(&self, database: &str, item: ItemRef) -> SpatialResult<GmlElement>;

    /// Directory holding the database's metadata files.
    fn database_dir(&self, database: &str) -> SpatialResult<PathBuf>;
}
