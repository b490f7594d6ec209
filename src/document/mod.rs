//! Decoded DMF document structure.
//!
//! The whole object graph is produced by one decode pass and is read-only
//! afterwards. Attribute descriptors and symbols are shared library
//! collections: layers, features and other descriptors reference them
//! through `Arc` rather than owning copies.

pub mod geometry;
pub mod symbol;

pub use geometry::{Coordinate, Geometry, Polygon};
pub use symbol::{
    CirclePrimitive, PolylinePrimitive, Primitive, RectanglePrimitive, SemicirclePrimitive,
    Symbol, SymbolType,
};

use std::sync::Arc;

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::error::{DmfError, Result};
use crate::types::{AttributeValue, Brush, Font, Pen, State, ValueType};

/// Kind of objects a layer holds, from its status byte pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerObjectsType {
    Polygon,
    Polyline,
    SmoothPolygon,
    SmoothPolyline,
    Symbol,
    /// The format reserves further codes (chainage, tables, terrain models,
    /// sheet marking, layer groups) that this decoder does not distinguish.
    Unknown,
}

impl LayerObjectsType {
    /// Combine the shape-family flag with the objects-type code.
    pub fn from_codes(is_polygon: bool, code: u8) -> Self {
        match code {
            1 if is_polygon => LayerObjectsType::Polygon,
            1 => LayerObjectsType::Polyline,
            2 if is_polygon => LayerObjectsType::SmoothPolygon,
            2 => LayerObjectsType::SmoothPolyline,
            4 => LayerObjectsType::Symbol,
            _ => LayerObjectsType::Unknown,
        }
    }
}

/// An attribute descriptor from the attribute list.
///
/// Descriptors with `id <= 0` are "service" (reserved) attributes; they live
/// in a separate collection and are addressed by non-positive numbers.
/// `format` is reserved by the producing system and carried through opaque.
#[derive(Debug)]
pub struct Attribute {
    pub id: i32,
    pub name: String,
    pub value_type: ValueType,
    pub state: State,
    pub min_scale: i32,
    pub max_scale: i32,
    pub brush: Brush,
    pub font: Font,
    pub symbol: Option<Arc<Symbol>>,
    pub format: String,
}

/// The two attribute collections, addressed by the sign of a reference
/// number.
///
/// All consumers go through [`AttributeLibrary::resolve`]; the sign-based
/// offset arithmetic lives nowhere else.
#[derive(Debug, Default)]
pub struct AttributeLibrary {
    pub service: Vec<Arc<Attribute>>,
    pub normal: Vec<Arc<Attribute>>,
}

impl AttributeLibrary {
    /// Resolve a signed attribute number to its descriptor.
    ///
    /// Numbers `<= 0` address the service collection counted back from its
    /// end; numbers `>= 1` address the normal collection 1-based.
    pub fn resolve(&self, number: i32) -> Result<&Arc<Attribute>> {
        let (collection, index) = if number <= 0 {
            (
                &self.service,
                number as isize + self.service.len() as isize - 1,
            )
        } else {
            (&self.normal, number as isize - 1)
        };

        usize::try_from(index)
            .ok()
            .and_then(|index| collection.get(index))
            .ok_or_else(|| {
                DmfError::InvalidContent(format!("attribute number {number} is out of range"))
            })
    }
}

bitflags! {
    /// Per-feature status bits. Bits outside the named set are dropped.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FeatureStatus: u32 {
        const HIDDEN = 1 << 1;
        const DELETED = 1 << 2;
        const MARKED = 1 << 4;
    }
}

/// A geographic feature with its geometry and typed attribute values.
///
/// `attribute_values` is keyed by the signed attribute number used in the
/// file and preserves the order values appeared in the attribute string.
#[derive(Debug)]
pub struct Feature {
    pub id: i32,
    pub scale: f32,
    pub symbol_orientation: i32,
    pub geometry: Geometry,
    pub attribute_values: IndexMap<i32, (Arc<Attribute>, AttributeValue)>,
    pub status: FeatureStatus,
}

impl Feature {
    pub fn is_hidden(&self) -> bool {
        self.status.contains(FeatureStatus::HIDDEN)
    }

    pub fn is_deleted(&self) -> bool {
        self.status.contains(FeatureStatus::DELETED)
    }

    pub fn is_marked(&self) -> bool {
        self.status.contains(FeatureStatus::MARKED)
    }

    /// Look up a typed value by signed attribute number.
    pub fn value(&self, number: i32) -> Option<&AttributeValue> {
        self.attribute_values.get(&number).map(|(_, value)| value)
    }
}

/// One map layer with its descriptors resolved and its features attached.
///
/// `id` is the stable identifier stored in the layer record; `index` is the
/// position in the layer list and is what feature records reference. Layers
/// whose objects are not spatial features keep an empty feature list.
#[derive(Debug)]
pub struct Layer {
    pub id: i32,
    pub index: i32,
    pub name: String,
    pub state: State,
    pub min_scale: i32,
    pub max_scale: i32,
    pub pen: Pen,
    pub brush: Brush,
    pub symbol: Option<Arc<Symbol>>,
    pub objects_type: LayerObjectsType,
    pub attributes: Vec<Arc<Attribute>>,
    pub features: Vec<Feature>,
}

/// The decoded map: the root of the object graph.
#[derive(Debug)]
pub struct Map {
    pub name: String,
    /// Map scale denominator.
    pub scale: f64,
    pub layers: Vec<Layer>,
}
