//! Exact-geometry collaborator interface.
//!
//! The index only ever reasons about envelopes. Whenever a query needs an
//! exact answer, a boolean predicate between two geometries or the true
//! distance between two indexed items, it delegates to a
//! [`GeometryKernel`] supplied by the host. The kernel is free to resolve
//! item references through the document store, cache decoded geometries, or
//! use whatever computational-geometry machinery it likes; the engine
//! treats it as opaque.

use std::fmt::{self, Display};

use crate::envelope::Envelope;
use crate::error::{SpatialError, SpatialResult};
use crate::geometry::Geometry;
use crate::strtree::types::ItemRef;

/// Spatial predicates evaluated during query refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    Contains,
    Intersects,
    Overlaps,
    Covers,
    Crosses,
    Touches,
    Equals,
}

impl PredicateKind {
    pub fn name(&self) -> &'static str {
        match self {
            PredicateKind::Contains => "contains",
            PredicateKind::Intersects => "intersects",
            PredicateKind::Overlaps => "overlaps",
            PredicateKind::Covers => "covers",
            PredicateKind::Crosses => "crosses",
            PredicateKind::Touches => "touches",
            PredicateKind::Equals => "equals",
        }
    }
}

impl Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Exact geometry computations consumed by the query engine.
pub trait GeometryKernel: Send + Sync {
    /// Computes the envelope of a geometry.
    ///
    /// The default implementation derives it from the geometry's
    /// coordinates and rejects empty geometries, which have no envelope.
    fn envelope_of(&self, geometry: &Geometry) -> SpatialResult<Envelope> {
        geometry.envelope().ok_or_else(|| {
            SpatialError::GeometryConstruction(format!(
                "an empty {} has no envelope",
                geometry.type_name()
            ))
        })
    }

    /// Evaluates an exact boolean predicate with `query` on the left-hand
    /// side: `predicate(Contains, q, c)` asks whether `q` contains `c`.
    fn predicate(
        &self,
        kind: PredicateKind,
        query: &Geometry,
        candidate: &Geometry,
    ) -> SpatialResult<bool>;

    /// Computes the exact distance between two indexed items, resolving
    /// each reference to its full geometry internally.
    fn item_distance(&self, a: ItemRef, b: ItemRef) -> SpatialResult<f64>;
}
