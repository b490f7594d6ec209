//! DMF file reader — main orchestrator for decoding map files.
//!
//! The reader walks the stream strictly top to bottom: signature, header,
//! layer list, attribute list, symbol list, version-gated access policies,
//! feature list, then a final assembly pass that cross-references
//! attribute numbers, symbol numbers and layer bit-masks into the
//! [`Map`] object graph.
//!
//! Every self-describing record (layer, attribute, symbol, feature)
//! declares its own byte size up front. The reader measures what its
//! known fields actually consume, rejects records whose declared size is
//! smaller than that, and skips the excess as vendor-reserved padding,
//! which is the format's forward-compatibility mechanism.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use encoding_rs::Encoding;
use indexmap::IndexMap;

use crate::document::{
    geometry::build_geometry, Attribute, AttributeLibrary, CirclePrimitive, Coordinate, Feature,
    FeatureStatus, Layer, LayerObjectsType, Map, PolylinePrimitive, Primitive,
    RectanglePrimitive, SemicirclePrimitive, Symbol, SymbolType,
};
use crate::error::{DmfError, Result};
use crate::io::attribute_string::parse_attribute_string;
use crate::io::framing::{framed_stream, read_signature};
use crate::io::stream_reader::{BitArray, StreamReader};
use crate::types::{
    charsets, Brush, BrushStyle, Color, Font, FontStyle, Pen, PenStyle, Point2D, State,
    ValueType, Version,
};

// ── Format constants ──────────────────────────────────────────────────────

/// Minimum map header size; larger headers carry reserved trailing data.
const HEADER_MIN_SIZE: u32 = 910;

/// Fixed layer/attribute list header size.
const LIST_HEADER_SIZE: u32 = 13;

/// Fixed symbol header size.
const SYMBOL_HEADER_SIZE: u32 = 24;

/// Fixed feature header size.
const FEATURE_HEADER_SIZE: u32 = 44;

/// Break sentinel x value between coordinate sub-sequences.
const COORDINATE_BREAK_X: f64 = -2684354.56;
const COORDINATE_BREAK_EPSILON: f64 = 1e-6;

/// Break sentinel x value inside polyline primitive runs.
const PRIMITIVE_BREAK_X: i32 = -268435456;

/// The access-policy block exists only in this version.
const ACCESS_POLICY_VERSION: Version = Version::new(1, 15);

// ── Intermediate records ──────────────────────────────────────────────────

struct HeaderRecord {
    scale: f64,
    feature_count: u32,
    name: String,
    #[allow(dead_code)]
    left_image_file: String,
    #[allow(dead_code)]
    right_image_file: String,
}

struct LayerRecord {
    id: i32,
    index: i32,
    name: String,
    state: State,
    min_scale: i32,
    max_scale: i32,
    pen: Pen,
    brush: Brush,
    symbol_number: u32,
    objects_type: LayerObjectsType,
    attribute_bits: BitArray,
}

struct AttributeRecord {
    id: i32,
    name: String,
    value_type: ValueType,
    state: State,
    min_scale: i32,
    max_scale: i32,
    brush: Brush,
    font: Font,
    symbol_number: u32,
    format: String,
}

struct AttributeRecords {
    service: Vec<AttributeRecord>,
    normal: Vec<AttributeRecord>,
}

struct FeatureRecord {
    layer_index: i32,
    id: i32,
    scale: f32,
    symbol_orientation: i32,
    status: FeatureStatus,
    attributes: Vec<(i32, String)>,
    coordinate_lists: Vec<Vec<Coordinate>>,
}

/// One raw 32-byte draw record, before primitive reconstruction.
struct PrimitiveRecord {
    tag: u8,
    group_number: u8,
    pen: Pen,
    brush: Brush,
    first: Point2D,
    second: Point2D,
}

// ── DmfReader ─────────────────────────────────────────────────────────────

/// Reads a DMF byte stream and produces a [`Map`].
///
/// # Usage
///
/// ```rust,no_run
/// use dmfrust::io::reader::DmfReader;
///
/// let map = DmfReader::read_from_file("survey.dmf").unwrap();
/// println!("{} layers", map.layers.len());
/// ```
pub struct DmfReader<R: Read> {
    stream: R,
    encoding: &'static Encoding,
}

impl DmfReader<BufReader<File>> {
    /// Open and decode a DMF file from disk.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Map> {
        let file = File::open(path.as_ref()).map_err(DmfError::Io)?;
        DmfReader::new(BufReader::new(file)).read()
    }
}

impl<R: Read> DmfReader<R> {
    /// Wrap a readable byte source positioned at the start of the file.
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            encoding: encoding_rs::WINDOWS_1251,
        }
    }

    /// Override the single-byte legacy encoding used for embedded text.
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Decode the whole stream into a [`Map`].
    ///
    /// All-or-nothing: either the complete object graph comes back or the
    /// first error encountered does, and the stream is left wherever the
    /// failure happened.
    pub fn read(self) -> Result<Map> {
        let mut stream = self.stream;
        let signature = read_signature(&mut stream)?;
        if !signature.is_supported() {
            return Err(DmfError::UnsupportedVersion(signature.version));
        }

        let body = framed_stream(stream, signature.is_compressed)?;
        let decoder = MapDecoder {
            cursor: StreamReader::with_encoding(body, self.encoding),
            version: signature.version,
        };
        decoder.decode()
    }
}

// ── Decoder ───────────────────────────────────────────────────────────────

struct MapDecoder<R: Read> {
    cursor: StreamReader<R>,
    version: Version,
}

impl<R: Read> MapDecoder<R> {
    fn decode(mut self) -> Result<Map> {
        let header = self.read_header()?;
        let layer_records = self.read_layer_list()?;
        let attribute_records = self.read_attribute_list()?;
        let symbols = self.read_symbol_list()?;
        if self.version == ACCESS_POLICY_VERSION {
            self.read_access_policies()?;
        }
        let feature_records = self.read_feature_list(header.feature_count)?;

        assemble(header, layer_records, attribute_records, symbols, feature_records)
    }

    // ── Header ────────────────────────────────────────────────────────────

    fn read_header(&mut self) -> Result<HeaderRecord> {
        let header_size = self.cursor.read_u32()?;
        if header_size < HEADER_MIN_SIZE {
            return Err(DmfError::InvalidFormat(format!(
                "map header size {header_size} is below the {HEADER_MIN_SIZE}-byte minimum"
            )));
        }

        let scale = self.cursor.read_extended()?;
        let feature_count = self.cursor.read_u32()?;
        let _units = self.cursor.read_i32()?;
        let _status = self.cursor.read_i32()?;

        // geometric frame: 4 corner structures of 3 extended reals each,
        // reserved and not decoded
        self.cursor.skip(120)?;

        let name = self.cursor.read_short_string(255)?;
        let left_image_file = self.cursor.read_short_string(255)?;
        let right_image_file = self.cursor.read_short_string(255)?;

        self.cursor.skip((header_size - HEADER_MIN_SIZE) as u64)?;

        Ok(HeaderRecord {
            scale,
            feature_count,
            name,
            left_image_file,
            right_image_file,
        })
    }

    // ── Layer list ────────────────────────────────────────────────────────

    fn read_layer_list(&mut self) -> Result<Vec<LayerRecord>> {
        // total list size, informational only
        let _total_size = self.cursor.read_u32()?;

        let header_size = self.cursor.read_u32()?;
        if header_size != LIST_HEADER_SIZE {
            return Err(DmfError::UnsupportedFormat(format!(
                "layer list header size {header_size}"
            )));
        }

        let normal_count = self.cursor.read_u32()? as i32;
        let _status = self.cursor.read_i32()?;
        let service_count = self.read_service_count("layer")?;
        let first_service_number = -service_count + 1;
        let _reserved = self.cursor.read_u8()?;

        let mut layers = Vec::new();
        for number in first_service_number..=normal_count {
            layers.push(self.read_layer(number)?);
        }

        Ok(layers)
    }

    fn read_layer(&mut self, index: i32) -> Result<LayerRecord> {
        let descriptor_size = self.cursor.read_u32()?;
        let start = self.cursor.position();

        let is_polygon = self.cursor.read_u8()? & 1 == 1;
        let _ = self.cursor.read_u8()?;
        let state_code = self.cursor.read_u8()?;
        let state = State::from_code(state_code).ok_or_else(|| {
            DmfError::InvalidContent(format!("layer {index}: unsupported state code {state_code}"))
        })?;
        let objects_type = LayerObjectsType::from_codes(is_polygon, self.cursor.read_u8()?);

        let id = self.cursor.read_i32()?;
        let min_scale = self.cursor.read_i32()?;
        let max_scale = self.cursor.read_i32()?;

        let pen_color = self.cursor.read_i32()?;
        let pen_width = self.cursor.read_i32()?;
        let brush_color = self.cursor.read_i32()?;
        let _font_color = self.cursor.read_i32()?;
        let _font_size = self.cursor.read_i32()?;

        let pen_style = PenStyle(self.cursor.read_u8()?);
        let brush_style = BrushStyle(self.cursor.read_u8()?);
        let _font_style = self.cursor.read_u8()?;

        let name = self.cursor.read_short_string(0)?;
        let _font_name = self.cursor.read_short_string(0)?;

        let _reserved = self.cursor.read_i32()?;

        let bits_length = self.cursor.read_u32()?;
        let attribute_bits = self.cursor.read_bit_array(bits_length as usize)?;

        let symbol_number = self.cursor.read_u32()?;
        // format is reserved on layers; read and drop
        let _format = self.cursor.read_short_string(0)?;
        let _reference_count = self.cursor.read_u32()?;

        let pen_width_fraction = self.cursor.read_i32()?;
        let _font_size_fraction = self.cursor.read_i32()?;

        self.skip_record_padding("layer", index, descriptor_size, start)?;

        Ok(LayerRecord {
            id,
            index,
            name,
            state,
            min_scale,
            max_scale,
            pen: Pen::new(
                Color(pen_color),
                pen_width * 10 + pen_width_fraction,
                pen_style,
            ),
            brush: Brush::new(Color(brush_color), brush_style),
            symbol_number,
            objects_type,
            attribute_bits,
        })
    }

    // ── Attribute list ────────────────────────────────────────────────────

    fn read_attribute_list(&mut self) -> Result<AttributeRecords> {
        let _total_size = self.cursor.read_u32()?;

        let header_size = self.cursor.read_u32()?;
        if header_size != LIST_HEADER_SIZE {
            return Err(DmfError::UnsupportedFormat(format!(
                "attribute list header size {header_size}"
            )));
        }

        let normal_count = self.cursor.read_u32()? as i32;
        let _status = self.cursor.read_i32()?;
        let service_count = self.read_service_count("attribute")?;
        let first_service_number = -service_count + 1;
        let _reserved = self.cursor.read_u8()?;

        let mut service = Vec::new();
        for number in first_service_number..=0 {
            service.push(self.read_attribute(number)?);
        }

        let mut normal = Vec::new();
        for number in 1..=normal_count {
            normal.push(self.read_attribute(number)?);
        }

        Ok(AttributeRecords { service, normal })
    }

    fn read_attribute(&mut self, number: i32) -> Result<AttributeRecord> {
        let descriptor_size = self.cursor.read_u32()?;
        let start = self.cursor.position();

        let _ = self.cursor.read_u16()?;
        let state_code = self.cursor.read_u8()?;
        let state = State::from_code(state_code).ok_or_else(|| {
            DmfError::InvalidContent(format!(
                "attribute {number}: unsupported state code {state_code}"
            ))
        })?;

        let type_code = self.cursor.read_u8()?;
        let value_type = ValueType::from_code(type_code).ok_or_else(|| {
            DmfError::UnsupportedContent(format!(
                "attribute {number}: unsupported value type code {type_code}"
            ))
        })?;

        let id = self.cursor.read_i32()?;
        let min_scale = self.cursor.read_i32()?;
        let max_scale = self.cursor.read_i32()?;

        let _pen_color = self.cursor.read_i32()?;
        let _pen_width = self.cursor.read_i32()?;
        let brush_color = self.cursor.read_i32()?;
        let font_color = self.cursor.read_i32()?;
        let font_size = self.cursor.read_i32()?;

        let _pen_style = self.cursor.read_u8()?;
        let brush_style = BrushStyle(self.cursor.read_u8()?);
        let font_style = FontStyle::from_bits_truncate(self.cursor.read_u8()?);

        let name = self.cursor.read_short_string(0)?;

        // the font name may carry a character-set suffix: "Arial:204"
        let font_name = self.cursor.read_short_string(0)?;
        let (font_name, charset) = match font_name.split_once(':') {
            Some((base, suffix)) => {
                let charset = suffix.parse::<u8>().map_err(|_| {
                    DmfError::InvalidContent(format!(
                        "attribute {number}: character set '{suffix}' is not a byte"
                    ))
                })?;
                (base.to_string(), charset)
            }
            None => (font_name, charsets::DEFAULT),
        };

        let _reserved = self.cursor.read_i32()?;

        // attribute records carry a bit array of their own; it is unused
        let bits_length = self.cursor.read_u32()?;
        self.cursor.skip(bits_length as u64)?;

        let symbol_number = self.cursor.read_u32()?;
        let format = self.cursor.read_short_string(0)?;
        let _reference_count = self.cursor.read_u32()?;

        let _pen_width_fraction = self.cursor.read_i32()?;
        let font_size_fraction = self.cursor.read_i32()?;

        self.skip_record_padding("attribute", number, descriptor_size, start)?;

        Ok(AttributeRecord {
            id,
            name,
            value_type,
            state,
            min_scale,
            max_scale,
            brush: Brush::new(Color(brush_color), brush_style),
            font: Font {
                style: font_style,
                color: Color(font_color),
                size: font_size * 10 + font_size_fraction,
                charset,
                name: font_name,
            },
            symbol_number,
            format,
        })
    }

    // ── Symbol list ───────────────────────────────────────────────────────

    fn read_symbol_list(&mut self) -> Result<Vec<Arc<Symbol>>> {
        let _total_size = self.cursor.read_u32()?;
        let count = self.cursor.read_u32()?;

        let mut symbols = Vec::new();
        for number in 1..=count {
            symbols.push(Arc::new(self.read_symbol(number as i32)?));
        }

        Ok(symbols)
    }

    fn read_symbol(&mut self, number: i32) -> Result<Symbol> {
        let descriptor_size = self.cursor.read_u32()?;
        let start = self.cursor.position();

        let header_size = self.cursor.read_u32()?;
        if header_size != SYMBOL_HEADER_SIZE {
            return Err(DmfError::UnsupportedFormat(format!(
                "symbol {number}: header size {header_size}"
            )));
        }

        let _id = self.cursor.read_u32()?;
        let record_count = self.cursor.read_u32()?;
        let length = self.cursor.read_u32()?;

        let type_code = self.cursor.read_u32()?;
        let symbol_type = SymbolType::from_code(type_code).ok_or_else(|| {
            DmfError::UnsupportedContent(format!(
                "symbol {number}: unsupported symbol type code {type_code}"
            ))
        })?;

        let height = self.cursor.read_u32()?;

        let mut records = Vec::with_capacity(record_count as usize);
        for _ in 0..record_count {
            records.push(self.read_primitive_record()?);
        }
        let primitives = build_primitives(&records, number)?;

        self.skip_record_padding("symbol", number, descriptor_size, start)?;

        Ok(Symbol {
            symbol_type,
            length,
            height,
            primitives,
        })
    }

    /// One fixed 32-byte raw draw record.
    fn read_primitive_record(&mut self) -> Result<PrimitiveRecord> {
        let tag = self.cursor.read_u8()?;
        let group_number = self.cursor.read_u8()?;
        let pen_style = PenStyle(self.cursor.read_u8()?);
        let brush_style = BrushStyle(self.cursor.read_u8()?);
        let pen_color = self.cursor.read_i32()?;
        let pen_width = self.cursor.read_i32()?;
        let brush_color = self.cursor.read_i32()?;
        let x1 = self.cursor.read_i32()?;
        let y1 = self.cursor.read_i32()?;
        let x2 = self.cursor.read_i32()?;
        let y2 = self.cursor.read_i32()?;

        Ok(PrimitiveRecord {
            tag,
            group_number,
            pen: Pen::new(Color(pen_color), pen_width, pen_style),
            brush: Brush::new(Color(brush_color), brush_style),
            first: Point2D::new(x1, y1),
            second: Point2D::new(x2, y2),
        })
    }

    // ── Access policies (v1.15 only) ──────────────────────────────────────

    fn read_access_policies(&mut self) -> Result<()> {
        let total_size = self.cursor.read_i32()?;
        let record_size = self.cursor.read_i32()?;
        let count = self.cursor.read_i32()?;

        if record_size < 0
            || count < 0
            || total_size as i64 != record_size as i64 * count as i64 + 8
        {
            return Err(DmfError::InvalidFormat(format!(
                "access policy list size {total_size} does not match {count} records of {record_size} bytes"
            )));
        }

        // records are consumed and discarded; their content is not modeled
        for _ in 0..count {
            self.cursor.skip(record_size as u64)?;
        }

        Ok(())
    }

    // ── Feature list ──────────────────────────────────────────────────────

    fn read_feature_list(&mut self, count: u32) -> Result<Vec<FeatureRecord>> {
        let mut features = Vec::new();
        for number in 0..count {
            features.push(self.read_feature(number as i32)?);
        }
        Ok(features)
    }

    fn read_feature(&mut self, number: i32) -> Result<FeatureRecord> {
        let descriptor_size = self.cursor.read_u32()?;
        let start = self.cursor.position();

        let _point_format = self.cursor.read_u16()?;

        let header_size = self.cursor.read_u32()?;
        if header_size != FEATURE_HEADER_SIZE {
            return Err(DmfError::UnsupportedFormat(format!(
                "feature {number}: header size {header_size}"
            )));
        }

        let point_count = self.cursor.read_i32()?;
        // the layer id is superseded by the layer index below
        let _layer_id = self.cursor.read_i32()?;
        let _kind = self.cursor.read_i32()?;
        let layer_index = self.cursor.read_i32()?;
        let id = self.cursor.read_i32()?;
        let status = FeatureStatus::from_bits_truncate(self.cursor.read_i32()? as u32);
        let _where = self.cursor.read_i32()?;
        let scale = self.cursor.read_f32()?;
        let _group = self.cursor.read_i32()?;
        let _parent = self.cursor.read_i32()?;
        let symbol_orientation = self.cursor.read_i32()?;

        let attribute_string_length = self.cursor.read_i32()?;
        if attribute_string_length < 0 {
            return Err(DmfError::InvalidFormat(format!(
                "feature {number}: negative attribute string length"
            )));
        }
        let attribute_bytes = self.cursor.read_bytes(attribute_string_length as usize)?;
        let (attribute_text, _, _) = self.cursor.encoding().decode(&attribute_bytes);
        let attributes = parse_attribute_string(&attribute_text)?;

        // the coordinate stream encodes multiple geometry parts in one flat
        // run, delimited by break sentinels
        let mut coordinate_lists = Vec::new();
        let mut current = Vec::new();
        for _ in 0..point_count {
            let _point_status = self.cursor.read_i32()?;
            let x = self.cursor.read_extended()?;
            let y = self.cursor.read_extended()?;
            let z = self.cursor.read_extended()?;

            if (x - COORDINATE_BREAK_X).abs() < COORDINATE_BREAK_EPSILON {
                coordinate_lists.push(std::mem::take(&mut current));
            } else {
                current.push(Coordinate::new(x, y, z));
            }
        }
        coordinate_lists.push(current);

        self.skip_record_padding("feature", number, descriptor_size, start)?;

        Ok(FeatureRecord {
            layer_index,
            id,
            scale,
            symbol_orientation,
            status,
            attributes,
            coordinate_lists,
        })
    }

    /// The service entry count of a list is stored negated.
    fn read_service_count(&mut self, list_kind: &str) -> Result<i32> {
        self.cursor.read_i32()?.checked_neg().ok_or_else(|| {
            DmfError::InvalidFormat(format!("{list_kind} list service entry count overflows"))
        })
    }

    // ── Shared record accounting ──────────────────────────────────────────

    /// Check a record's declared size against the bytes consumed since
    /// `start` and skip the remainder as reserved padding.
    fn skip_record_padding(
        &mut self,
        record_kind: &str,
        number: i32,
        descriptor_size: u32,
        start: u64,
    ) -> Result<()> {
        let consumed = self.cursor.position() - start;
        if (descriptor_size as u64) < consumed {
            return Err(DmfError::InvalidFormat(format!(
                "{record_kind} {number}: descriptor size {descriptor_size} is below the {consumed} bytes its content occupies"
            )));
        }
        self.cursor.skip(descriptor_size as u64 - consumed)
    }
}

// ── Primitive reconstruction ──────────────────────────────────────────────

/// Merge a symbol's flat draw records into typed primitives.
///
/// Rectangle, circle and semicircle records map one-to-one. Consecutive
/// polyline records concatenate point by point; a break-sentinel point
/// closes the current run (runs of fewer than two points are dropped) and
/// the next real record restarts the group/pen/brush context. `L` records
/// are legal but unsupported and contribute nothing.
fn build_primitives(records: &[PrimitiveRecord], symbol_number: i32) -> Result<Vec<Primitive>> {
    let mut primitives = Vec::new();
    let mut index = 0;

    while index < records.len() {
        let record = &records[index];
        match record.tag {
            b'R' => {
                primitives.push(Primitive::Rectangle(RectanglePrimitive::new(
                    record.group_number,
                    record.pen,
                    record.brush,
                    record.first,
                    record.second,
                )?));
                index += 1;
            }
            b'C' => {
                primitives.push(Primitive::Circle(CirclePrimitive::new(
                    record.group_number,
                    record.pen,
                    record.brush,
                    record.first,
                    record.second,
                )?));
                index += 1;
            }
            b'M' => {
                primitives.push(Primitive::Semicircle(SemicirclePrimitive::new(
                    record.group_number,
                    record.pen,
                    record.brush,
                    record.first,
                    record.second,
                )?));
                index += 1;
            }
            b'P' => {
                let mut group_number = record.group_number;
                let mut pen = record.pen;
                let mut brush = record.brush;
                let mut points: Vec<Point2D> = Vec::new();

                while index < records.len() && records[index].tag == b'P' {
                    let record = &records[index];
                    for point in [record.first, record.second] {
                        if point.x == PRIMITIVE_BREAK_X {
                            if points.len() > 1 {
                                primitives.push(Primitive::Polyline(PolylinePrimitive::new(
                                    group_number,
                                    pen,
                                    brush,
                                    std::mem::take(&mut points),
                                )?));
                            } else {
                                points.clear();
                            }
                        } else {
                            if points.is_empty() {
                                group_number = record.group_number;
                                pen = record.pen;
                                brush = record.brush;
                            }
                            points.push(point);
                        }
                    }
                    index += 1;
                }

                if points.len() > 1 {
                    primitives.push(Primitive::Polyline(PolylinePrimitive::new(
                        group_number,
                        pen,
                        brush,
                        points,
                    )?));
                }
            }
            // legal but unsupported draw command; skipped, not an error
            b'L' => {
                index += 1;
            }
            other => {
                return Err(DmfError::UnsupportedContent(format!(
                    "symbol {symbol_number}: unknown primitive record tag 0x{other:02X}"
                )));
            }
        }
    }

    Ok(primitives)
}

// ── Assembly pass ─────────────────────────────────────────────────────────

fn resolve_symbol(number: u32, symbols: &[Arc<Symbol>]) -> Result<Option<Arc<Symbol>>> {
    if number == 0 {
        return Ok(None);
    }
    symbols
        .get(number as usize - 1)
        .cloned()
        .map(Some)
        .ok_or_else(|| {
            DmfError::InvalidContent(format!(
                "symbol number {number} exceeds the {}-entry symbol library",
                symbols.len()
            ))
        })
}

fn build_attribute(record: AttributeRecord, symbols: &[Arc<Symbol>]) -> Result<Arc<Attribute>> {
    Ok(Arc::new(Attribute {
        id: record.id,
        name: record.name,
        value_type: record.value_type,
        state: record.state,
        min_scale: record.min_scale,
        max_scale: record.max_scale,
        brush: record.brush,
        font: record.font,
        symbol: resolve_symbol(record.symbol_number, symbols)?,
        format: record.format,
    }))
}

/// Cross-reference the decoded lists into the final object graph.
fn assemble(
    header: HeaderRecord,
    layer_records: Vec<LayerRecord>,
    attribute_records: AttributeRecords,
    symbols: Vec<Arc<Symbol>>,
    feature_records: Vec<FeatureRecord>,
) -> Result<Map> {
    let library = AttributeLibrary {
        service: attribute_records
            .service
            .into_iter()
            .map(|record| build_attribute(record, &symbols))
            .collect::<Result<_>>()?,
        normal: attribute_records
            .normal
            .into_iter()
            .map(|record| build_attribute(record, &symbols))
            .collect::<Result<_>>()?,
    };

    // group features by the layer index they were read under; features
    // whose coordinate stream collapses to nothing are dropped entirely
    let mut features_by_layer: AHashMap<i32, Vec<Feature>> = AHashMap::new();
    for record in feature_records {
        let Some(geometry) = build_geometry(record.coordinate_lists)? else {
            continue;
        };

        let mut attribute_values = IndexMap::new();
        for (number, raw_value) in record.attributes {
            let descriptor = library.resolve(number)?;
            let value = descriptor.value_type.parse(&raw_value)?;
            attribute_values.insert(number, (Arc::clone(descriptor), value));
        }

        features_by_layer
            .entry(record.layer_index)
            .or_default()
            .push(Feature {
                id: record.id,
                scale: record.scale,
                symbol_orientation: record.symbol_orientation,
                geometry,
                attribute_values,
                status: record.status,
            });
    }

    let mut layers = Vec::new();
    for record in layer_records {
        // bits below 11 address the service collection by position, the
        // rest address the normal collection shifted by 11
        let mut attributes = Vec::new();
        for bit in 0..record.attribute_bits.len().min(11) {
            if record.attribute_bits.get(bit) {
                let attribute = library.service.get(bit).ok_or_else(|| {
                    DmfError::InvalidContent(format!(
                        "layer {}: attribute bit {bit} has no service attribute",
                        record.index
                    ))
                })?;
                attributes.push(Arc::clone(attribute));
            }
        }
        for bit in 11..record.attribute_bits.len() {
            if record.attribute_bits.get(bit) {
                let attribute = library.normal.get(bit - 11).ok_or_else(|| {
                    DmfError::InvalidContent(format!(
                        "layer {}: attribute bit {bit} has no attribute",
                        record.index
                    ))
                })?;
                attributes.push(Arc::clone(attribute));
            }
        }

        let features = features_by_layer.remove(&record.index).unwrap_or_default();

        layers.push(Layer {
            id: record.id,
            index: record.index,
            name: record.name,
            state: record.state,
            min_scale: record.min_scale,
            max_scale: record.max_scale,
            pen: record.pen,
            brush: record.brush,
            symbol: resolve_symbol(record.symbol_number, &symbols)?,
            objects_type: record.objects_type,
            attributes,
            features,
        });
    }

    Ok(Map {
        name: header.name,
        scale: header.scale,
        layers,
    })
}
