//! Geometry model produced by the GML decoder.
//!
//! The decoder only ever produces a fixed set of shapes, so [`Geometry`] is a
//! closed tagged union dispatched by pattern matching rather than an
//! open-ended trait hierarchy. The index itself never looks inside a
//! geometry beyond its envelope; exact predicates and distances are the
//! geometry kernel's business.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::envelope::Envelope;
use crate::error::{SpatialError, SpatialResult};

/// A coordinate with an optional elevation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Coordinate {
    /// Creates a new 2D coordinate.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    /// Creates a new coordinate with an elevation.
    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Calculates the planar (2D) distance to another coordinate.
    pub fn distance(&self, other: &Coordinate) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.z {
            Some(z) => write!(f, "({}, {}, {})", self.x, self.y, z),
            None => write!(f, "({}, {})", self.x, self.y),
        }
    }
}

/// A single-position geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    coordinate: Coordinate,
}

impl Point {
    /// Creates a new point at the given coordinate.
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }

    pub fn x(&self) -> f64 {
        self.coordinate.x
    }

    pub fn y(&self) -> f64 {
        self.coordinate.y
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    pub fn envelope(&self) -> Envelope {
        Envelope::point(self.coordinate.x, self.coordinate.y)
    }
}

/// An open sequence of at least two positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineString {
    coordinates: Vec<Coordinate>,
}

impl LineString {
    /// Creates a line string, requiring at least two positions.
    pub fn new(coordinates: Vec<Coordinate>) -> SpatialResult<Self> {
        if coordinates.len() < 2 {
            return Err(SpatialError::GeometryConstruction(format!(
                "a line string needs at least 2 coordinates, found {}",
                coordinates.len()
            )));
        }
        Ok(Self { coordinates })
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn envelope(&self) -> Envelope {
        envelope_of_coordinates(&self.coordinates)
    }
}

/// A closed sequence of at least four positions whose first and last
/// positions coincide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRing {
    coordinates: Vec<Coordinate>,
}

impl LinearRing {
    /// Creates a linear ring, validating closure and minimum length.
    pub fn new(coordinates: Vec<Coordinate>) -> SpatialResult<Self> {
        if coordinates.len() < 4 {
            return Err(SpatialError::GeometryConstruction(format!(
                "a linear ring needs at least 4 coordinates, found {}",
                coordinates.len()
            )));
        }
        let first = &coordinates[0];
        let last = &coordinates[coordinates.len() - 1];
        if first.x != last.x || first.y != last.y {
            return Err(SpatialError::GeometryConstruction(
                "a linear ring must be closed".to_string(),
            ));
        }
        Ok(Self { coordinates })
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn envelope(&self) -> Envelope {
        envelope_of_coordinates(&self.coordinates)
    }
}

/// An area bounded by one exterior ring and any number of interior rings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    exterior: LinearRing,
    interiors: Vec<LinearRing>,
}

impl Polygon {
    pub fn new(exterior: LinearRing, interiors: Vec<LinearRing>) -> Self {
        Self {
            exterior,
            interiors,
        }
    }

    pub fn exterior(&self) -> &LinearRing {
        &self.exterior
    }

    pub fn interiors(&self) -> &[LinearRing] {
        &self.interiors
    }

    /// The polygon's envelope is its exterior ring's envelope; holes cannot
    /// extend past the shell.
    pub fn envelope(&self) -> Envelope {
        self.exterior.envelope()
    }
}

/// The closed set of geometry shapes the GML decoder can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Point),
    LineString(LineString),
    LinearRing(LinearRing),
    Polygon(Polygon),
    MultiPoint(Vec<Point>),
    MultiLineString(Vec<LineString>),
    MultiPolygon(Vec<Polygon>),
    GeometryCollection(Vec<Geometry>),
}

impl Geometry {
    /// Computes the envelope of this geometry, or `None` when the geometry
    /// is empty (a multi-geometry with no members).
    pub fn envelope(&self) -> Option<Envelope> {
        match self {
            Geometry::Point(p) => Some(p.envelope()),
            Geometry::LineString(l) => Some(l.envelope()),
            Geometry::LinearRing(r) => Some(r.envelope()),
            Geometry::Polygon(p) => Some(p.envelope()),
            Geometry::MultiPoint(points) => {
                union_envelopes(points.iter().map(|p| p.envelope()))
            }
            Geometry::MultiLineString(lines) => {
                union_envelopes(lines.iter().map(|l| l.envelope()))
            }
            Geometry::MultiPolygon(polygons) => {
                union_envelopes(polygons.iter().map(|p| p.envelope()))
            }
            Geometry::GeometryCollection(members) => {
                union_envelopes(members.iter().filter_map(|g| g.envelope()))
            }
        }
    }

    /// Name of this geometry's shape, for logs and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::LinearRing(_) => "LinearRing",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            Geometry::GeometryCollection(_) => "GeometryCollection",
        }
    }
}

fn envelope_of_coordinates(coordinates: &[Coordinate]) -> Envelope {
    let mut envelope = Envelope::empty();
    for c in coordinates {
        envelope.expand(&Envelope::point(c.x, c.y));
    }
    envelope
}

fn union_envelopes(envelopes: impl Iterator<Item = Envelope>) -> Option<Envelope> {
    let mut result: Option<Envelope> = None;
    for envelope in envelopes {
        result = Some(match result {
            Some(acc) => acc.union(&envelope),
            None => envelope,
        });
    }
    result
}
