//! Bulk-loaded STR-tree: construction, queries, persistence and caching.
//!
//! The tree is built once per database from a full batch of entries
//! (Sort-Tile-Recursive packing, no insert/split machinery), persisted in a
//! flat children-before-parents binary layout, cached process-wide per
//! database, and traversed read-only by every query.

pub mod builder;
pub mod cache;
pub mod persistence;
pub mod query;
pub mod types;

pub use builder::bulk_load;
pub use cache::IndexCache;
pub use query::{nearest_neighbour, nearest_pair, range_query};
pub use types::{IndexEntry, ItemRef, NodeId, StrTree, TreeNode};
