//! Shared fixtures for integration tests: an in-memory document store and
//! a bounding-box geometry kernel.
//!
//! The kernel reasons about envelopes only, which is exact for the point
//! geometries the tests index. The engine treats the kernel as an opaque
//! service, so these fixtures exercise the full pipeline without dragging
//! in a computational-geometry library.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tempfile::TempDir;

use gmlindex::{
    DocumentStore, Envelope, Geometry, GeometryKernel, GmlElement, IndexEntry, ItemRef,
    PredicateKind, SpatialError, SpatialResult,
};

/// Builds a `gml:Point` element at the given position.
pub fn point_element(x: f64, y: f64) -> GmlElement {
    GmlElement::new("gml:Point")
        .with_child(GmlElement::new("gml:coordinates").with_text(format!("{},{}", x, y)))
}

/// Builds a `gml:Polygon` element with only an inner boundary, which the
/// decoder must reject.
pub fn inner_only_polygon_element() -> GmlElement {
    GmlElement::new("gml:Polygon").with_child(
        GmlElement::new("gml:innerBoundaryIs").with_child(
            GmlElement::new("gml:LinearRing").with_child(
                GmlElement::new("gml:coordinates").with_text("0,0 1,0 1,1 0,0"),
            ),
        ),
    )
}

struct MemoryStoreInner {
    dir: TempDir,
    documents: RwLock<HashMap<(String, ItemRef), GmlElement>>,
    envelopes: Arc<RwLock<HashMap<ItemRef, Envelope>>>,
}

/// An in-memory document store backed by a temporary directory for the
/// persisted index files.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryStoreInner {
                dir: TempDir::new().expect("failed to create temp dir"),
                documents: RwLock::new(HashMap::new()),
                envelopes: Arc::new(RwLock::new(HashMap::new())),
            }),
        }
    }

    /// Stores a point document and returns its index entry.
    pub fn add_point(&self, database: &str, item: ItemRef, x: f64, y: f64) -> IndexEntry {
        self.add_document(database, item, point_element(x, y), Envelope::point(x, y))
    }

    /// Stores an arbitrary document with the envelope it should be indexed
    /// under.
    pub fn add_document(
        &self,
        database: &str,
        item: ItemRef,
        element: GmlElement,
        envelope: Envelope,
    ) -> IndexEntry {
        self.inner
            .documents
            .write()
            .insert((database.to_string(), item), element);
        self.inner.envelopes.write().insert(item, envelope);
        IndexEntry::new(envelope, item)
    }

    /// A kernel sharing this store's item envelopes.
    pub fn kernel(&self) -> Arc<BboxKernel> {
        Arc::new(BboxKernel {
            envelopes: self.inner.envelopes.clone(),
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn node(&self, database: &str, item: ItemRef) -> SpatialResult<GmlElement> {
        self.inner
            .documents
            .read()
            .get(&(database.to_string(), item))
            .cloned()
            .ok_or_else(|| {
                SpatialError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no document {} in database '{}'", item, database),
                ))
            })
    }

    fn database_dir(&self, database: &str) -> SpatialResult<PathBuf> {
        let dir = self.inner.dir.path().join(database);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// A geometry kernel that evaluates predicates and distances on envelopes.
/// Exact for point geometries, which is all the tests index.
pub struct BboxKernel {
    envelopes: Arc<RwLock<HashMap<ItemRef, Envelope>>>,
}

impl BboxKernel {
    fn envelope(&self, item: ItemRef) -> SpatialResult<Envelope> {
        self.envelopes.read().get(&item).copied().ok_or_else(|| {
            SpatialError::GeometryConstruction(format!("unknown item {}", item))
        })
    }
}

impl GeometryKernel for BboxKernel {
    fn predicate(
        &self,
        kind: PredicateKind,
        query: &Geometry,
        candidate: &Geometry,
    ) -> SpatialResult<bool> {
        let (q, c) = match (query.envelope(), candidate.envelope()) {
            (Some(q), Some(c)) => (q, c),
            _ => return Ok(false),
        };
        Ok(match kind {
            PredicateKind::Contains | PredicateKind::Covers => q.contains(&c),
            PredicateKind::Intersects => q.intersects(&c),
            PredicateKind::Equals => q == c,
            PredicateKind::Overlaps | PredicateKind::Crosses => {
                q.intersects(&c) && !q.contains(&c) && !c.contains(&q)
            }
            PredicateKind::Touches => q.intersects(&c) && q.distance_to(&c) == 0.0 && q != c,
        })
    }

    fn item_distance(&self, a: ItemRef, b: ItemRef) -> SpatialResult<f64> {
        Ok(self.envelope(a)?.distance_to(&self.envelope(b)?))
    }
}

/// A store wrapper recording which items the engine materializes, used to
/// verify filter-refine soundness.
pub struct RecordingStore {
    inner: MemoryStore,
    resolved: Mutex<Vec<ItemRef>>,
    resolutions: AtomicUsize,
}

impl RecordingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            resolved: Mutex::new(Vec::new()),
            resolutions: AtomicUsize::new(0),
        }
    }

    pub fn resolved_items(&self) -> Vec<ItemRef> {
        self.resolved.lock().clone()
    }

    pub fn resolution_count(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

impl DocumentStore for RecordingStore {
    fn node(&self, database: &str, item: ItemRef) -> SpatialResult<GmlElement> {
        self.resolved.lock().push(item);
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        self.inner.node(database, item)
    }

    fn database_dir(&self, database: &str) -> SpatialResult<PathBuf> {
        self.inner.database_dir(database)
    }
}
