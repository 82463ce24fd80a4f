//! GML element-tree decoder.
//!
//! Geometries arrive from the document store as already-parsed element
//! trees, not as raw XML text; [`GmlElement`] is the minimal tree shape the
//! decoder needs (qualified name, text content, child elements). The
//! decoder walks that tree and produces a [`Geometry`] value, failing with
//! a typed error the moment the tree stops looking like GML.

use crate::error::{SpatialError, SpatialResult};
use crate::geometry::{Coordinate, Geometry, LineString, LinearRing, Point, Polygon};

const GML_POINT: &str = "gml:Point";
const GML_LINESTRING: &str = "gml:LineString";
const GML_LINEARRING: &str = "gml:LinearRing";
const GML_POLYGON: &str = "gml:Polygon";
const GML_MULTIPOINT: &str = "gml:MultiPoint";
const GML_MULTILINESTRING: &str = "gml:MultiLineString";
const GML_MULTIPOLYGON: &str = "gml:MultiPolygon";
const GML_MULTIGEOMETRY: &str = "gml:MultiGeometry";
const GML_POINT_MEMBER: &str = "gml:pointMember";
const GML_LINESTRING_MEMBER: &str = "gml:lineStringMember";
const GML_POLYGON_MEMBER: &str = "gml:polygonMember";
const GML_GEOMETRY_MEMBER: &str = "gml:geometryMember";
const GML_OUTER_BOUNDARY: &str = "gml:outerBoundaryIs";
const GML_INNER_BOUNDARY: &str = "gml:innerBoundaryIs";
const GML_COORDINATES: &str = "gml:coordinates";
const GML_COORD: &str = "gml:coord";
const GML_X: &str = "gml:X";
const GML_Y: &str = "gml:Y";
const GML_Z: &str = "gml:Z";

/// Geometry element names that may appear directly inside `gml:MultiGeometry`.
const SINGLE_GEOMETRY_NAMES: [&str; 3] = [GML_POINT, GML_LINESTRING, GML_POLYGON];

/// An XML element reduced to what the decoder cares about: its qualified
/// name, its text content and its child elements.
#[derive(Debug, Clone, PartialEq)]
pub struct GmlElement {
    name: String,
    text: String,
    children: Vec<GmlElement>,
}

impl GmlElement {
    /// Creates an element with the given qualified name (e.g. `gml:Point`).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Sets the element's text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Appends a child element.
    pub fn with_child(mut self, child: GmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[GmlElement] {
        &self.children
    }
}

/// Decodes a GML element tree into a geometry.
///
/// Dispatches on the element name over the closed set of shapes the
/// geometry model supports. An unknown name fails with
/// [`SpatialError::UnrecognizedGeometryType`]; malformed content fails with
/// the decoder error matching what went wrong.
pub fn decode(element: &GmlElement) -> SpatialResult<Geometry> {
    match element.name() {
        GML_POINT => Ok(Geometry::Point(decode_point(element)?)),
        GML_LINESTRING => Ok(Geometry::LineString(decode_line_string(element)?)),
        GML_LINEARRING => Ok(Geometry::LinearRing(decode_ring(element)?)),
        GML_POLYGON => Ok(Geometry::Polygon(decode_polygon(element)?)),
        GML_MULTIPOINT => {
            let members = decode_members(element, GML_POINT_MEMBER, &[GML_POINT])?;
            let points = members
                .into_iter()
                .map(|g| match g {
                    Geometry::Point(p) => Ok(p),
                    other => Err(member_type_error(GML_MULTIPOINT, &other)),
                })
                .collect::<SpatialResult<Vec<_>>>()?;
            Ok(Geometry::MultiPoint(points))
        }
        GML_MULTILINESTRING => {
            let members = decode_members(element, GML_LINESTRING_MEMBER, &[GML_LINESTRING])?;
            let lines = members
                .into_iter()
                .map(|g| match g {
                    Geometry::LineString(l) => Ok(l),
                    other => Err(member_type_error(GML_MULTILINESTRING, &other)),
                })
                .collect::<SpatialResult<Vec<_>>>()?;
            Ok(Geometry::MultiLineString(lines))
        }
        GML_MULTIPOLYGON => {
            let members = decode_members(element, GML_POLYGON_MEMBER, &[GML_POLYGON])?;
            let polygons = members
                .into_iter()
                .map(|g| match g {
                    Geometry::Polygon(p) => Ok(p),
                    other => Err(member_type_error(GML_MULTIPOLYGON, &other)),
                })
                .collect::<SpatialResult<Vec<_>>>()?;
            Ok(Geometry::MultiPolygon(polygons))
        }
        GML_MULTIGEOMETRY => {
            let members =
                decode_members(element, GML_GEOMETRY_MEMBER, &SINGLE_GEOMETRY_NAMES)?;
            Ok(Geometry::GeometryCollection(members))
        }
        other => Err(SpatialError::UnrecognizedGeometryType(other.to_string())),
    }
}

/// Parses the text content of a `gml:coordinates` element.
///
/// Tuples are separated by whitespace, components within a tuple by commas.
/// One component is an x value (y defaults to 0), two are x and y, three add
/// an elevation. Anything else, an empty list, or a component that is not a
/// finite number fails with [`SpatialError::InvalidCoordinate`].
pub fn parse_coordinates(text: &str) -> SpatialResult<Vec<Coordinate>> {
    let mut coordinates = Vec::new();
    for tuple in text.split_whitespace() {
        let components: Vec<&str> = tuple.split(',').collect();
        let coordinate = match components[..] {
            [x] => Coordinate::new(parse_component(x)?, 0.0),
            [x, y] => Coordinate::new(parse_component(x)?, parse_component(y)?),
            [x, y, z] => Coordinate::with_z(
                parse_component(x)?,
                parse_component(y)?,
                parse_component(z)?,
            ),
            _ => {
                return Err(SpatialError::InvalidCoordinate(format!(
                    "expected 1 to 3 components per tuple, found {} in '{}'",
                    components.len(),
                    tuple
                )))
            }
        };
        coordinates.push(coordinate);
    }
    if coordinates.is_empty() {
        return Err(SpatialError::InvalidCoordinate(
            "empty coordinate list".to_string(),
        ));
    }
    Ok(coordinates)
}

fn parse_component(text: &str) -> SpatialResult<f64> {
    let trimmed = text.trim();
    let value: f64 = trimmed.parse().map_err(|_| {
        SpatialError::InvalidCoordinate(format!("'{}' is not a number", trimmed))
    })?;
    if !value.is_finite() {
        return Err(SpatialError::InvalidCoordinate(format!(
            "'{}' is not finite",
            trimmed
        )));
    }
    Ok(value)
}

fn decode_point(element: &GmlElement) -> SpatialResult<Point> {
    let coordinates = coordinate_sequence(element)?;
    match coordinates[..] {
        [coordinate] => Ok(Point::new(coordinate)),
        _ => Err(SpatialError::GeometryConstruction(format!(
            "a point needs exactly 1 coordinate, found {}",
            coordinates.len()
        ))),
    }
}

fn decode_line_string(element: &GmlElement) -> SpatialResult<LineString> {
    LineString::new(coordinate_sequence(element)?)
}

fn decode_ring(element: &GmlElement) -> SpatialResult<LinearRing> {
    LinearRing::new(coordinate_sequence(element)?)
}

fn decode_polygon(element: &GmlElement) -> SpatialResult<Polygon> {
    let mut shell: Option<LinearRing> = None;
    let mut interiors = Vec::new();
    for child in element.children() {
        match child.name() {
            GML_OUTER_BOUNDARY => {
                if shell.is_some() {
                    return Err(SpatialError::MissingBoundary(
                        "polygon has more than one outer boundary".to_string(),
                    ));
                }
                shell = Some(boundary_ring(child)?);
            }
            GML_INNER_BOUNDARY => interiors.push(boundary_ring(child)?),
            other => {
                return Err(SpatialError::GeometryConstruction(format!(
                    "unexpected element <{}> in <{}>",
                    other, GML_POLYGON
                )))
            }
        }
    }
    match shell {
        Some(exterior) => Ok(Polygon::new(exterior, interiors)),
        None if interiors.is_empty() => Err(SpatialError::MissingBoundary(
            "polygon has no outer boundary".to_string(),
        )),
        None => Err(SpatialError::MissingBoundary(
            "polygon has an inner boundary but no outer boundary".to_string(),
        )),
    }
}

/// Extracts the linear ring wrapped by a boundary element.
fn boundary_ring(boundary: &GmlElement) -> SpatialResult<LinearRing> {
    match boundary.children() {
        [ring] if ring.name() == GML_LINEARRING => decode_ring(ring),
        _ => Err(SpatialError::GeometryConstruction(format!(
            "<{}> must wrap exactly one <{}>",
            boundary.name(),
            GML_LINEARRING
        ))),
    }
}

/// Collects the member geometries of a multi-geometry element.
///
/// A member is either wrapped (`<gml:pointMember><gml:Point>…`) or written
/// directly as one of the allowed single-geometry elements. Other children
/// are ignored, matching how permissive GML documents are in practice.
fn decode_members(
    element: &GmlElement,
    member_name: &str,
    allowed: &[&str],
) -> SpatialResult<Vec<Geometry>> {
    let mut members = Vec::new();
    for child in element.children() {
        if child.name() == member_name {
            let inner = child.children().first().ok_or_else(|| {
                SpatialError::GeometryConstruction(format!(
                    "<{}> has no child geometry",
                    member_name
                ))
            })?;
            members.push(decode(inner)?);
        } else if allowed.contains(&child.name()) {
            members.push(decode(child)?);
        }
    }
    Ok(members)
}

fn member_type_error(container: &str, found: &Geometry) -> SpatialError {
    SpatialError::GeometryConstruction(format!(
        "<{}> member must not be a {}",
        container,
        found.type_name()
    ))
}

/// Reads the coordinate sequence of a single-geometry element: either one
/// `gml:coordinates` text blob or a run of `gml:coord` elements.
fn coordinate_sequence(element: &GmlElement) -> SpatialResult<Vec<Coordinate>> {
    let mut coordinates = Vec::new();
    for child in element.children() {
        match child.name() {
            GML_COORDINATES => return parse_coordinates(child.text()),
            GML_COORD => coordinates.push(decode_coord(child)?),
            other => {
                return Err(SpatialError::GeometryConstruction(format!(
                    "unexpected element <{}> in <{}>",
                    other,
                    element.name()
                )))
            }
        }
    }
    Ok(coordinates)
}

/// Reads one `gml:coord` element with `gml:X`/`gml:Y`/`gml:Z` children.
fn decode_coord(element: &GmlElement) -> SpatialResult<Coordinate> {
    let mut x = None;
    let mut y = 0.0;
    let mut z = None;
    for child in element.children() {
        let value = parse_component(child.text())?;
        match child.name() {
            GML_X => x = Some(value),
            GML_Y => y = value,
            GML_Z => z = Some(value),
            other => {
                return Err(SpatialError::InvalidCoordinate(format!(
                    "unexpected element <{}> in <{}>",
                    other, GML_COORD
                )))
            }
        }
    }
    let x = x.ok_or_else(|| {
        SpatialError::InvalidCoordinate(format!("<{}> is missing <{}>", GML_COORD, GML_X))
    })?;
    Ok(match z {
        Some(z) => Coordinate::with_z(x, y, z),
        None => Coordinate::new(x, y),
    })
}
