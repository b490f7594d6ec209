//! Feature geometry and its assembly from raw coordinate sub-sequences.
//!
//! The coordinate stream of a feature arrives as a flat list of
//! sub-sequences with no structural typing. Classification is positional:
//! one point is a point, two or three points are a line, four or more
//! points closing on themselves are a polygon ring. Multi-part features
//! classify by their first sub-sequence, and a multi-polygon reconstructs
//! its shell/hole hierarchy from spatial ring containment. Containment
//! itself comes from the `geo` crate.

use ahash::AHashSet;
use geo::{Contains, LineString};
use indexmap::IndexMap;

use crate::error::{DmfError, Result};

/// A 3D coordinate. Ring closure compares `x` and `y` only; `z` rides
/// along untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinate {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn eq_2d(&self, other: &Coordinate) -> bool {
        self.x == other.x && self.y == other.y
    }
}

/// A polygon as one shell ring plus zero or more hole rings.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub shell: Vec<Coordinate>,
    pub holes: Vec<Vec<Coordinate>>,
}

/// Feature geometry variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coordinate),
    LineString(Vec<Coordinate>),
    Polygon(Polygon),
    MultiPoint(Vec<Coordinate>),
    MultiLineString(Vec<Vec<Coordinate>>),
    MultiPolygon(Vec<Polygon>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeClass {
    Point,
    LineString,
    Polygon,
}

/// Classify one sub-sequence by point count and closure.
fn detect_shape(coordinates: &[Coordinate]) -> ShapeClass {
    match coordinates.len() {
        1 => ShapeClass::Point,
        2 | 3 => ShapeClass::LineString,
        _ => {
            if coordinates[0].eq_2d(&coordinates[coordinates.len() - 1]) {
                ShapeClass::Polygon
            } else {
                ShapeClass::LineString
            }
        }
    }
}

fn build_point(coordinates: &[Coordinate]) -> Result<Coordinate> {
    if coordinates.len() != 1 {
        return Err(DmfError::InvalidGeometry(format!(
            "point built from {} coordinates",
            coordinates.len()
        )));
    }

    Ok(coordinates[0])
}

fn build_line_string(coordinates: &[Coordinate]) -> Result<Vec<Coordinate>> {
    if coordinates.len() < 2 {
        return Err(DmfError::InvalidGeometry(format!(
            "line string built from {} coordinates",
            coordinates.len()
        )));
    }

    Ok(coordinates.to_vec())
}

fn build_ring(coordinates: &[Coordinate]) -> Result<Vec<Coordinate>> {
    if coordinates.len() < 4 {
        return Err(DmfError::InvalidGeometry(format!(
            "ring built from {} coordinates",
            coordinates.len()
        )));
    }
    if !coordinates[0].eq_2d(&coordinates[coordinates.len() - 1]) {
        return Err(DmfError::InvalidGeometry("ring is not closed".to_string()));
    }

    Ok(coordinates.to_vec())
}

fn to_geo_polygon(ring: &[Coordinate]) -> geo::Polygon<f64> {
    let exterior: LineString<f64> = ring.iter().map(|c| (c.x, c.y)).collect();
    geo::Polygon::new(exterior, Vec::new())
}

fn rings_equal(a: &[Coordinate], b: &[Coordinate]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(p, q)| p.eq_2d(q))
}

/// Reconstruct a multi-polygon from a flat list of rings.
///
/// For every ordered pair of distinct rings a containment edge is recorded;
/// when several rings contain the same ring, the last one wins. Rings that
/// are contained but contain nothing themselves are holes, grouped under
/// their recorded parent; every grouped parent becomes a shell, and any
/// ring left over becomes a holeless polygon of its own.
fn build_complex_polygon(coordinate_lists: &[Vec<Coordinate>]) -> Result<Geometry> {
    let rings: Vec<Vec<Coordinate>> = coordinate_lists
        .iter()
        .map(|list| build_ring(list))
        .collect::<Result<_>>()?;
    let shapes: Vec<geo::Polygon<f64>> = rings.iter().map(|ring| to_geo_polygon(ring)).collect();

    let mut parent_by_ring: Vec<Option<usize>> = vec![None; rings.len()];
    for i in 0..rings.len() {
        for j in 0..rings.len() {
            if i == j || rings_equal(&rings[i], &rings[j]) {
                continue;
            }
            if shapes[i].contains(&shapes[j]) {
                parent_by_ring[j] = Some(i);
            }
        }
    }

    let parents: AHashSet<usize> = parent_by_ring.iter().flatten().copied().collect();

    // Only leaf rings are holes; group them by their parent ring.
    let mut holes_by_shell: IndexMap<usize, Vec<usize>> = IndexMap::new();
    for (ring, parent) in parent_by_ring.iter().enumerate() {
        if let Some(parent) = parent {
            if !parents.contains(&ring) {
                holes_by_shell.entry(*parent).or_default().push(ring);
            }
        }
    }

    let mut consumed = vec![false; rings.len()];
    let mut polygons = Vec::new();
    for (&shell, holes) in &holes_by_shell {
        polygons.push(Polygon {
            shell: rings[shell].clone(),
            holes: holes.iter().map(|&hole| rings[hole].clone()).collect(),
        });
        consumed[shell] = true;
        for &hole in holes {
            consumed[hole] = true;
        }
    }

    // Whatever took part in no shell/hole pairing stands alone.
    for (ring, consumed) in consumed.iter().enumerate() {
        if !consumed {
            polygons.push(Polygon {
                shell: rings[ring].clone(),
                holes: Vec::new(),
            });
        }
    }

    Ok(Geometry::MultiPolygon(polygons))
}

/// Assemble feature geometry from its coordinate sub-sequences.
///
/// Empty sub-sequences are discarded first; a feature with nothing left has
/// no geometry and returns `None` (its layer keeps no object for it).
pub fn build_geometry(mut coordinate_lists: Vec<Vec<Coordinate>>) -> Result<Option<Geometry>> {
    coordinate_lists.retain(|list| !list.is_empty());

    match coordinate_lists.len() {
        0 => Ok(None),
        1 => {
            let list = &coordinate_lists[0];
            let geometry = match detect_shape(list) {
                ShapeClass::Point => Geometry::Point(build_point(list)?),
                ShapeClass::LineString => Geometry::LineString(build_line_string(list)?),
                ShapeClass::Polygon => Geometry::Polygon(Polygon {
                    shell: build_ring(list)?,
                    holes: Vec::new(),
                }),
            };
            Ok(Some(geometry))
        }
        _ => {
            let geometry = match detect_shape(&coordinate_lists[0]) {
                ShapeClass::Point => Geometry::MultiPoint(
                    coordinate_lists
                        .iter()
                        .map(|list| build_point(list))
                        .collect::<Result<_>>()?,
                ),
                ShapeClass::LineString => Geometry::MultiLineString(
                    coordinate_lists
                        .iter()
                        .map(|list| build_line_string(list))
                        .collect::<Result<_>>()?,
                ),
                ShapeClass::Polygon => build_complex_polygon(&coordinate_lists)?,
            };
            Ok(Some(geometry))
        }
    }
}
