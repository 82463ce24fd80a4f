//! # gmlindex - Spatial Indexing for GML Document Collections
//!
//! This crate answers spatial queries over a collection of GML geometry
//! documents without scanning every document. It bulk-loads a balanced
//! bounding-box tree (Sort-Tile-Recursive packing) over a database's
//! geometries, persists it in a compact binary layout, caches the loaded
//! tree per database for the life of the process, and runs three query
//! algorithms on top:
//!
//! - **Range queries**: every item whose envelope intersects a query
//!   envelope, by pruned tree traversal.
//! - **Nearest neighbour**: the closest item to a query object, and the
//!   globally closest pair of items, both by branch-and-bound over
//!   envelope lower bounds with exact distances from the geometry kernel.
//! - **Predicate queries**: contains / intersects / overlaps / covers /
//!   crosses / touches / equals, by filter-refine: envelope filtering
//!   through the tree, exact evaluation only on the survivors.
//!
//! Exact computational geometry and document storage stay outside the
//! crate: the engine consumes them through the [`GeometryKernel`] and
//! [`DocumentStore`] traits.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gmlindex::{Envelope, IndexEntry, SpatialEngine};
//!
//! # fn main() -> gmlindex::SpatialResult<()> {
//! let engine = SpatialEngine::new(store, kernel);
//!
//! // Index a database's geometries once...
//! let entries = vec![IndexEntry::new(Envelope::new(0.0, 0.0, 1.0, 1.0), 101)];
//! engine.build_index("city", entries)?;
//!
//! // ...then query it.
//! let query = gmlindex::gml::decode(&query_element)?;
//! let hits = engine.intersects("city", &query)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod geometry;
pub mod gml;
pub mod kernel;
pub mod store;
pub mod strtree;

pub use config::IndexConfig;
pub use engine::SpatialEngine;
pub use envelope::Envelope;
pub use error::{SpatialError, SpatialResult};
pub use geometry::{Coordinate, Geometry, LineString, LinearRing, Point, Polygon};
pub use gml::GmlElement;
pub use kernel::{GeometryKernel, PredicateKind};
pub use store::DocumentStore;
pub use strtree::{bulk_load, IndexCache, IndexEntry, ItemRef, NodeId, StrTree, TreeNode};
