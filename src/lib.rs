//! # dmfrust
//!
//! A pure Rust reader for GeoSystem DMF digital vector map files.
//!
//! DMF is a legacy binary GIS/photogrammetry container mixing fixed-size
//! headers, self-describing variable records, 80-bit extended-precision
//! coordinates, bit-array attribute masks and a control-character
//! mini-language for per-feature attribute values. This crate decodes one
//! such file (raw or zlib-compressed) into an immutable [`Map`] object
//! graph of layers, attribute descriptors, symbols and geographic
//! features in a single forward pass.
//!
//! ```rust,no_run
//! use dmfrust::DmfReader;
//!
//! let map = DmfReader::read_from_file("survey.dmf")?;
//! for layer in &map.layers {
//!     println!("{}: {} features", layer.name, layer.features.len());
//! }
//! # Ok::<(), dmfrust::DmfError>(())
//! ```

pub mod document;
pub mod error;
pub mod io;
pub mod types;

pub use document::{
    Attribute, AttributeLibrary, Coordinate, Feature, FeatureStatus, Geometry, Layer,
    LayerObjectsType, Map, Polygon, Primitive, Symbol, SymbolType,
};
pub use error::{DmfError, Result};
pub use io::DmfReader;
pub use types::{
    AttributeValue, Brush, BrushStyle, Color, Font, FontStyle, Pen, PenStyle, Point2D, State,
    ValueType, Version,
};
