//! Symbol library entries and their drawing primitives.
//!
//! A symbol is a small picture in a local integer coordinate space, built
//! from typed primitives. On disk the primitives are flat 32-byte draw
//! records; the reconstruction into typed primitives (including merging
//! multi-record polylines) happens in the reader. Shape invariants live in
//! the primitive constructors.

use crate::error::{DmfError, Result};
use crate::types::{Brush, Pen, Point2D};

/// Placement behavior of a symbol, from its on-disk type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolType {
    Single,
    Linear,
    Areal,
    LinearOriented,
    LinearScalable,
    Bilinear,
}

impl SymbolType {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(SymbolType::Single),
            1 => Some(SymbolType::Linear),
            2 => Some(SymbolType::Areal),
            3 => Some(SymbolType::LinearOriented),
            4 => Some(SymbolType::LinearScalable),
            5 => Some(SymbolType::Bilinear),
            _ => None,
        }
    }
}

/// A symbol library entry.
#[derive(Debug)]
pub struct Symbol {
    pub symbol_type: SymbolType,
    /// Symbol length in micrometers.
    pub length: u32,
    /// Symbol height in micrometers.
    pub height: u32,
    pub primitives: Vec<Primitive>,
}

/// A reconstructed drawing primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Rectangle(RectanglePrimitive),
    Circle(CirclePrimitive),
    Semicircle(SemicirclePrimitive),
    Polyline(PolylinePrimitive),
}

impl Primitive {
    pub fn group_number(&self) -> u8 {
        match self {
            Primitive::Rectangle(p) => p.group_number,
            Primitive::Circle(p) => p.group_number,
            Primitive::Semicircle(p) => p.group_number,
            Primitive::Polyline(p) => p.group_number,
        }
    }

    pub fn pen(&self) -> Pen {
        match self {
            Primitive::Rectangle(p) => p.pen,
            Primitive::Circle(p) => p.pen,
            Primitive::Semicircle(p) => p.pen,
            Primitive::Polyline(p) => p.pen,
        }
    }

    pub fn brush(&self) -> Brush {
        match self {
            Primitive::Rectangle(p) => p.brush,
            Primitive::Circle(p) => p.brush,
            Primitive::Semicircle(p) => p.brush,
            Primitive::Polyline(p) => p.brush,
        }
    }
}

/// An axis-aligned rectangle between two corners.
#[derive(Debug, Clone, PartialEq)]
pub struct RectanglePrimitive {
    pub group_number: u8,
    pub pen: Pen,
    pub brush: Brush,
    pub left_top: Point2D,
    pub right_bottom: Point2D,
}

impl RectanglePrimitive {
    /// Corner coordinates must be strictly increasing on both axes.
    pub fn new(
        group_number: u8,
        pen: Pen,
        brush: Brush,
        left_top: Point2D,
        right_bottom: Point2D,
    ) -> Result<Self> {
        if right_bottom.x <= left_top.x || right_bottom.y <= left_top.y {
            return Err(DmfError::InvalidGeometry(format!(
                "rectangle corners ({}, {})..({}, {}) are not increasing",
                left_top.x, left_top.y, right_bottom.x, right_bottom.y
            )));
        }

        Ok(Self {
            group_number,
            pen,
            brush,
            left_top,
            right_bottom,
        })
    }

    pub fn width(&self) -> u32 {
        (self.right_bottom.x - self.left_top.x) as u32
    }

    pub fn height(&self) -> u32 {
        (self.right_bottom.y - self.left_top.y) as u32
    }
}

/// A circle stored as its bounding square.
#[derive(Debug, Clone, PartialEq)]
pub struct CirclePrimitive {
    pub group_number: u8,
    pub pen: Pen,
    pub brush: Brush,
    pub left_top: Point2D,
    pub right_bottom: Point2D,
}

impl CirclePrimitive {
    /// The bounding box must be a square with strictly increasing corners
    /// and an even side, so the centre lands on integer coordinates.
    pub fn new(
        group_number: u8,
        pen: Pen,
        brush: Brush,
        left_top: Point2D,
        right_bottom: Point2D,
    ) -> Result<Self> {
        if right_bottom.x <= left_top.x || right_bottom.y <= left_top.y {
            return Err(DmfError::InvalidGeometry(
                "circle bounding corners are not increasing".to_string(),
            ));
        }
        let width = right_bottom.x - left_top.x;
        let height = right_bottom.y - left_top.y;
        if width != height {
            return Err(DmfError::InvalidGeometry(format!(
                "circle bounding box {width}x{height} is not square"
            )));
        }
        if width % 2 != 0 {
            return Err(DmfError::InvalidGeometry(format!(
                "circle side {width} has no integer radius"
            )));
        }

        Ok(Self {
            group_number,
            pen,
            brush,
            left_top,
            right_bottom,
        })
    }

    pub fn centre(&self) -> Point2D {
        Point2D::new(
            (self.left_top.x + self.right_bottom.x) / 2,
            (self.left_top.y + self.right_bottom.y) / 2,
        )
    }

    pub fn radius(&self) -> u32 {
        ((self.right_bottom.x - self.left_top.x) / 2) as u32
    }
}

/// A half circle from one endpoint of its diameter to the other.
#[derive(Debug, Clone, PartialEq)]
pub struct SemicirclePrimitive {
    pub group_number: u8,
    pub pen: Pen,
    pub brush: Brush,
    pub first: Point2D,
    pub second: Point2D,
}

impl SemicirclePrimitive {
    /// The endpoints must be distinct and their x sum even, so the centre
    /// has an integer x coordinate.
    pub fn new(
        group_number: u8,
        pen: Pen,
        brush: Brush,
        first: Point2D,
        second: Point2D,
    ) -> Result<Self> {
        if first == second {
            return Err(DmfError::InvalidGeometry(
                "semicircle endpoints coincide".to_string(),
            ));
        }
        if (first.x + second.x).rem_euclid(2) != 0 {
            return Err(DmfError::InvalidGeometry(
                "semicircle centre is not on integer coordinates".to_string(),
            ));
        }

        Ok(Self {
            group_number,
            pen,
            brush,
            first,
            second,
        })
    }

    pub fn centre(&self) -> Point2D {
        Point2D::new(
            (self.first.x + self.second.x) / 2,
            (self.first.y + self.second.y) / 2,
        )
    }

    pub fn radius(&self) -> f64 {
        let centre = self.centre();
        let dx = (self.first.x - centre.x) as f64;
        let dy = (self.first.y - centre.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Angle of the arc start, measured from the centre to the first point.
    pub fn start_angle(&self) -> f64 {
        let centre = self.centre();
        ((centre.y - self.first.y) as f64).atan2((centre.x - self.first.x) as f64)
    }
}

/// An open polyline through two or more points.
#[derive(Debug, Clone, PartialEq)]
pub struct PolylinePrimitive {
    pub group_number: u8,
    pub pen: Pen,
    pub brush: Brush,
    pub points: Vec<Point2D>,
}

impl PolylinePrimitive {
    pub fn new(group_number: u8, pen: Pen, brush: Brush, points: Vec<Point2D>) -> Result<Self> {
        if points.len() < 2 {
            return Err(DmfError::InvalidGeometry(format!(
                "polyline with {} points",
                points.len()
            )));
        }

        Ok(Self {
            group_number,
            pen,
            brush,
            points,
        })
    }
}
