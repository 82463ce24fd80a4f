//! The spatial query engine.
//!
//! `SpatialEngine` ties the pieces together: the per-database tree cache,
//! the persisted index files, the GML decoder, and the two collaborators
//! supplied by the host, the document store (resolving item references to
//! geometry elements) and the geometry kernel (exact predicates and
//! distances).
//!
//! Predicate queries run the filter-refine pipeline: a cheap envelope
//! range query over the tree narrows the candidates, and only those
//! candidates are materialized into exact geometries and handed to the
//! kernel. Bounding the decode work to envelope-intersecting candidates is
//! the entire point of having the index.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::IndexConfig;
use crate::error::SpatialResult;
use crate::geometry::Geometry;
use crate::gml;
use crate::kernel::{GeometryKernel, PredicateKind};
use crate::store::DocumentStore;
use crate::strtree::cache::IndexCache;
use crate::strtree::{builder, persistence, query};
use crate::strtree::{IndexEntry, ItemRef, StrTree};
use crate::Envelope;

/// Spatial indexing and querying over the databases of a document store.
///
/// Queries run synchronously on the calling thread; the engine schedules
/// nothing itself. A built tree is immutable, so any number of threads may
/// query the same database concurrently.
pub struct SpatialEngine {
    store: Arc<dyn DocumentStore>,
    kernel: Arc<dyn GeometryKernel>,
    cache: IndexCache,
    config: IndexConfig,
}

impl SpatialEngine {
    /// Creates an engine with the default configuration.
    pub fn new(store: Arc<dyn DocumentStore>, kernel: Arc<dyn GeometryKernel>) -> Self {
        Self::with_config(store, kernel, IndexConfig::default())
    }

    /// Creates an engine with an explicit configuration.
    pub fn with_config(
        store: Arc<dyn DocumentStore>,
        kernel: Arc<dyn GeometryKernel>,
        config: IndexConfig,
    ) -> Self {
        Self {
            store,
            kernel,
            cache: IndexCache::new(),
            config,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    fn index_path(&self, database: &str) -> SpatialResult<PathBuf> {
        Ok(self
            .store
            .database_dir(database)?
            .join(self.config.index_file_name()))
    }

    /// Builds a database's index from a full batch of entries, persists it
    /// and replaces any cached tree.
    ///
    /// This is also the explicit rebuild path: a corrupt or stale index is
    /// never rebuilt behind the caller's back, it takes a new `build_index`
    /// call with a fresh enumeration of the database's geometries.
    pub fn build_index(
        &self,
        database: &str,
        entries: Vec<IndexEntry>,
    ) -> SpatialResult<Arc<StrTree>> {
        let tree = builder::bulk_load(entries, self.config.branching_factor())?;
        persistence::write_to_file(&tree, &self.index_path(database)?)?;
        let tree = Arc::new(tree);
        self.cache.insert(database, tree.clone());
        log::info!(
            "built spatial index for '{}': {} items, height {}",
            database,
            tree.item_count(),
            tree.height()
        );
        Ok(tree)
    }

    /// Returns the database's tree, reading the persisted index on first
    /// access. Concurrent first accesses decode the file once.
    pub fn load_index(&self, database: &str) -> SpatialResult<Arc<StrTree>> {
        self.cache.get_or_load(database, || {
            persistence::read_from_file(&self.index_path(database)?, database)
        })
    }

    /// Drops the database's cached tree, forcing the next query to re-read
    /// the persisted index. Returns whether a tree was cached.
    pub fn evict_index(&self, database: &str) -> bool {
        self.cache.evict(database)
    }

    /// Returns every indexed item whose envelope intersects the query
    /// geometry's envelope. An empty query geometry matches nothing.
    pub fn range_query(&self, database: &str, query: &Geometry) -> SpatialResult<Vec<ItemRef>> {
        match query.envelope() {
            Some(envelope) => self.range_query_envelope(database, &envelope),
            None => Ok(Vec::new()),
        }
    }

    /// Returns every indexed item whose envelope intersects the query
    /// envelope.
    pub fn range_query_envelope(
        &self,
        database: &str,
        envelope: &Envelope,
    ) -> SpatialResult<Vec<ItemRef>> {
        let tree = self.load_index(database)?;
        Ok(query::range_query(&tree, envelope))
    }

    /// Finds the indexed item nearest to the given item, other than the
    /// item itself.
    pub fn nearest_neighbour(&self, database: &str, item: ItemRef) -> SpatialResult<ItemRef> {
        let element = self.store.node(database, item)?;
        let geometry = gml::decode(&element)?;
        let envelope = self.kernel.envelope_of(&geometry)?;
        let tree = self.load_index(database)?;
        query::nearest_neighbour(&tree, &envelope, item, Some(item), self.kernel.as_ref())
    }

    /// Finds the two closest distinct items in the whole database.
    ///
    /// A self-join over the index; see [`query::nearest_pair`] for the cost
    /// caveat.
    pub fn nearest_pair(&self, database: &str) -> SpatialResult<(ItemRef, ItemRef)> {
        let tree = self.load_index(database)?;
        query::nearest_pair(&tree, self.kernel.as_ref())
    }

    /// Evaluates an exact spatial predicate against the database.
    ///
    /// Filter: a range query over the query geometry's envelope. Refine:
    /// each candidate, and only each candidate, is resolved through the
    /// document store, decoded, and tested with the kernel, query geometry
    /// on the left-hand side. Decode and kernel errors surface unchanged;
    /// there is no partial-result mode.
    pub fn evaluate(
        &self,
        database: &str,
        query_geometry: &Geometry,
        predicate: PredicateKind,
    ) -> SpatialResult<Vec<ItemRef>> {
        let envelope = match query_geometry.envelope() {
            Some(envelope) => envelope,
            None => return Ok(Vec::new()),
        };
        let tree = self.load_index(database)?;
        let candidates = query::range_query(&tree, &envelope);
        log::debug!(
            "{} on '{}': {} candidates of {} items",
            predicate,
            database,
            candidates.len(),
            tree.item_count()
        );

        let mut matches = Vec::new();
        for item in candidates {
            let element = self.store.node(database, item)?;
            let candidate = gml::decode(&element)?;
            if self.kernel.predicate(predicate, query_geometry, &candidate)? {
                matches.push(item);
            }
        }
        Ok(matches)
    }

    /// Items the query geometry contains.
    pub fn contains(&self, database: &str, query: &Geometry) -> SpatialResult<Vec<ItemRef>> {
        self.evaluate(database, query, PredicateKind::Contains)
    }

    /// Items the query geometry intersects.
    pub fn intersects(&self, database: &str, query: &Geometry) -> SpatialResult<Vec<ItemRef>> {
        self.evaluate(database, query, PredicateKind::Intersects)
    }

    /// Items the query geometry overlaps.
    pub fn overlaps(&self, database: &str, query: &Geometry) -> SpatialResult<Vec<ItemRef>> {
        self.evaluate(database, query, PredicateKind::Overlaps)
    }

    /// Items the query geometry covers.
    pub fn covers(&self, database: &str, query: &Geometry) -> SpatialResult<Vec<ItemRef>> {
        self.evaluate(database, query, PredicateKind::Covers)
    }

    /// Items the query geometry crosses.
    pub fn crosses(&self, database: &str, query: &Geometry) -> SpatialResult<Vec<ItemRef>> {
        self.evaluate(database, query, PredicateKind::Crosses)
    }

    /// Items the query geometry touches.
    pub fn touches(&self, database: &str, query: &Geometry) -> SpatialResult<Vec<ItemRef>> {
        self.evaluate(database, query, PredicateKind::Touches)
    }

    /// Items spatially equal to the query geometry.
    pub fn equals(&self, database: &str, query: &Geometry) -> SpatialResult<Vec<ItemRef>> {
        self.evaluate(database, query, PredicateKind::Equals)
    }
}
