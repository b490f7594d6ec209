//! Shared test support: synthesize DMF byte streams in memory.
//!
//! The writers here mirror the record layouts the decoder consumes, with
//! knobs for deliberately malformed sizes so failure paths can be driven
//! end to end.

use std::io::Write;

/// Little-endian byte sink with the format's field encodings.
#[derive(Default)]
pub struct StreamWriter {
    pub bytes: Vec<u8>,
}

impl StreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn f32(&mut self, value: f32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn raw(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn zeros(&mut self, count: usize) {
        self.bytes.extend(std::iter::repeat(0u8).take(count));
    }

    /// 10-byte extended-precision real.
    pub fn extended(&mut self, value: f64) {
        self.bytes.extend_from_slice(&encode_extended(value));
    }

    /// Length-prefixed short string, zero-padded to `max_length` bytes of
    /// text when that is larger than the string.
    pub fn short_string(&mut self, text: &str, max_length: usize) {
        assert!(text.len() <= 255);
        self.u8(text.len() as u8);
        self.raw(text.as_bytes());
        if max_length > text.len() {
            self.zeros(max_length - text.len());
        }
    }
}

/// Widen an f64 into the 80-bit x87 extended layout.
pub fn encode_extended(value: f64) -> [u8; 10] {
    let bits = value.to_bits();
    let sign = (bits >> 63) as u16;
    let double_exponent = ((bits >> 52) & 0x7FF) as i32;
    let fraction = bits & 0x000F_FFFF_FFFF_FFFF;

    let (extended_exponent, significand) = if double_exponent == 0 {
        (0u16, fraction << 11)
    } else {
        ((double_exponent - 1023 + 16383) as u16, 1u64 << 63 | fraction << 11)
    };

    let mut bytes = [0u8; 10];
    bytes[..8].copy_from_slice(&significand.to_le_bytes());
    bytes[8..].copy_from_slice(&(extended_exponent | sign << 15).to_le_bytes());
    bytes
}

/// 32-byte signature block.
pub fn signature(version: &str, compressed: bool) -> Vec<u8> {
    let mut bytes = vec![b' '; 32];
    bytes[..23].copy_from_slice(b"GeoSystem DMF, Version ");
    bytes[23..23 + version.len()].copy_from_slice(version.as_bytes());
    if compressed {
        bytes[28] = b'C';
    }
    bytes[31] = 0x1A;
    bytes
}

pub fn write_header(out: &mut StreamWriter, scale: f64, feature_count: u32, name: &str) {
    let mut body = StreamWriter::new();
    body.extended(scale);
    body.u32(feature_count);
    body.i32(0); // units
    body.i32(0); // status
    body.zeros(120); // frame
    body.short_string(name, 255);
    body.short_string("left.tif", 255);
    body.short_string("right.tif", 255);
    assert_eq!(body.len(), 910);

    out.u32(body.len() as u32);
    out.raw(&body.bytes);
}

// ── Layers ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct LayerSpec {
    pub is_polygon: bool,
    pub state_code: u8,
    pub objects_code: u8,
    pub id: i32,
    pub min_scale: i32,
    pub max_scale: i32,
    pub pen_color: i32,
    pub pen_width: i32,
    pub pen_width_fraction: i32,
    pub brush_color: i32,
    pub pen_style: u8,
    pub brush_style: u8,
    pub name: String,
    pub font_name: String,
    pub attribute_bits: Vec<u8>,
    pub symbol_number: u32,
    pub format: String,
    /// Reserved trailing bytes appended inside the declared size.
    pub padding: usize,
    /// Offset applied to the declared descriptor size.
    pub size_adjust: i64,
}

impl Default for LayerSpec {
    fn default() -> Self {
        Self {
            is_polygon: false,
            state_code: 0,
            objects_code: 1,
            id: 1,
            min_scale: 0,
            max_scale: 50_000,
            pen_color: 0,
            pen_width: 1,
            pen_width_fraction: 0,
            brush_color: 0,
            pen_style: 0,
            brush_style: 0,
            name: "layer".to_string(),
            font_name: "Arial".to_string(),
            attribute_bits: Vec::new(),
            symbol_number: 0,
            format: String::new(),
            padding: 0,
            size_adjust: 0,
        }
    }
}

pub fn write_layer(out: &mut StreamWriter, spec: &LayerSpec) {
    let mut body = StreamWriter::new();
    body.u8(spec.is_polygon as u8);
    body.u8(0);
    body.u8(spec.state_code);
    body.u8(spec.objects_code);
    body.i32(spec.id);
    body.i32(spec.min_scale);
    body.i32(spec.max_scale);
    body.i32(spec.pen_color);
    body.i32(spec.pen_width);
    body.i32(spec.brush_color);
    body.i32(0); // font color, reserved
    body.i32(0); // font size, reserved
    body.u8(spec.pen_style);
    body.u8(spec.brush_style);
    body.u8(0); // font style, reserved
    body.short_string(&spec.name, 0);
    body.short_string(&spec.font_name, 0);
    body.i32(0); // reserved
    body.u32(spec.attribute_bits.len() as u32);
    body.raw(&spec.attribute_bits);
    body.u32(spec.symbol_number);
    body.short_string(&spec.format, 0);
    body.u32(0); // reference counter
    body.i32(spec.pen_width_fraction);
    body.i32(0); // font size fraction, reserved
    body.zeros(spec.padding);

    out.u32((body.len() as i64 + spec.size_adjust) as u32);
    out.raw(&body.bytes);
}

pub fn write_layer_list(out: &mut StreamWriter, service: &[LayerSpec], normal: &[LayerSpec]) {
    let mut entries = StreamWriter::new();
    for spec in service.iter().chain(normal) {
        write_layer(&mut entries, spec);
    }

    out.u32(13 + entries.len() as u32);
    out.u32(13);
    out.u32(normal.len() as u32);
    out.i32(0);
    out.i32(-(service.len() as i32));
    out.u8(0);
    out.raw(&entries.bytes);
}

// ── Attributes ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AttributeSpec {
    pub state_code: u8,
    pub value_type_code: u8,
    pub id: i32,
    pub min_scale: i32,
    pub max_scale: i32,
    pub brush_color: i32,
    pub font_color: i32,
    pub font_size: i32,
    pub font_size_fraction: i32,
    pub brush_style: u8,
    pub font_style: u8,
    pub name: String,
    pub font_name: String,
    pub symbol_number: u32,
    pub format: String,
    pub padding: usize,
    pub size_adjust: i64,
}

impl Default for AttributeSpec {
    fn default() -> Self {
        Self {
            state_code: 0,
            value_type_code: 5, // string
            id: 1,
            min_scale: 0,
            max_scale: 50_000,
            brush_color: 0,
            font_color: 0,
            font_size: 10,
            font_size_fraction: 0,
            brush_style: 0,
            font_style: 0,
            name: "attribute".to_string(),
            font_name: "Arial".to_string(),
            symbol_number: 0,
            format: String::new(),
            padding: 0,
            size_adjust: 0,
        }
    }
}

pub fn write_attribute(out: &mut StreamWriter, spec: &AttributeSpec) {
    let mut body = StreamWriter::new();
    body.u16(0); // status, reserved pair
    body.u8(spec.state_code);
    body.u8(spec.value_type_code);
    body.i32(spec.id);
    body.i32(spec.min_scale);
    body.i32(spec.max_scale);
    body.i32(0); // pen color, reserved
    body.i32(0); // pen width, reserved
    body.i32(spec.brush_color);
    body.i32(spec.font_color);
    body.i32(spec.font_size);
    body.u8(0); // pen style, reserved
    body.u8(spec.brush_style);
    body.u8(spec.font_style);
    body.short_string(&spec.name, 0);
    body.short_string(&spec.font_name, 0);
    body.i32(0); // reserved
    body.u32(0); // unused bit array length
    body.u32(spec.symbol_number);
    body.short_string(&spec.format, 0);
    body.u32(0); // reference counter
    body.i32(0); // pen width fraction
    body.i32(spec.font_size_fraction);
    body.zeros(spec.padding);

    out.u32((body.len() as i64 + spec.size_adjust) as u32);
    out.raw(&body.bytes);
}

pub fn write_attribute_list(
    out: &mut StreamWriter,
    service: &[AttributeSpec],
    normal: &[AttributeSpec],
) {
    let mut entries = StreamWriter::new();
    for spec in service.iter().chain(normal) {
        write_attribute(&mut entries, spec);
    }

    out.u32(13 + entries.len() as u32);
    out.u32(13);
    out.u32(normal.len() as u32);
    out.i32(0);
    out.i32(-(service.len() as i32));
    out.u8(0);
    out.raw(&entries.bytes);
}

// ── Symbols ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PrimitiveRecordSpec {
    pub tag: u8,
    pub group_number: u8,
    pub pen_style: u8,
    pub brush_style: u8,
    pub pen_color: i32,
    pub pen_width: i32,
    pub brush_color: i32,
    pub first: (i32, i32),
    pub second: (i32, i32),
}

impl PrimitiveRecordSpec {
    pub fn new(tag: u8, first: (i32, i32), second: (i32, i32)) -> Self {
        Self {
            tag,
            group_number: 1,
            pen_style: 0,
            brush_style: 0,
            pen_color: 0,
            pen_width: 1,
            brush_color: 0,
            first,
            second,
        }
    }
}

#[derive(Clone)]
pub struct SymbolSpec {
    pub header_size: u32,
    pub type_code: u32,
    pub length: u32,
    pub height: u32,
    pub records: Vec<PrimitiveRecordSpec>,
    pub padding: usize,
    pub size_adjust: i64,
}

impl Default for SymbolSpec {
    fn default() -> Self {
        Self {
            header_size: 24,
            type_code: 0, // single
            length: 1000,
            height: 1000,
            records: Vec::new(),
            padding: 0,
            size_adjust: 0,
        }
    }
}

pub fn write_symbol(out: &mut StreamWriter, spec: &SymbolSpec) {
    let mut body = StreamWriter::new();
    body.u32(spec.header_size);
    body.u32(0); // id, reserved
    body.u32(spec.records.len() as u32);
    body.u32(spec.length);
    body.u32(spec.type_code);
    body.u32(spec.height);
    for record in &spec.records {
        body.u8(record.tag);
        body.u8(record.group_number);
        body.u8(record.pen_style);
        body.u8(record.brush_style);
        body.i32(record.pen_color);
        body.i32(record.pen_width);
        body.i32(record.brush_color);
        body.i32(record.first.0);
        body.i32(record.first.1);
        body.i32(record.second.0);
        body.i32(record.second.1);
    }
    body.zeros(spec.padding);

    out.u32((body.len() as i64 + spec.size_adjust) as u32);
    out.raw(&body.bytes);
}

pub fn write_symbol_list(out: &mut StreamWriter, symbols: &[SymbolSpec]) {
    let mut entries = StreamWriter::new();
    for spec in symbols {
        write_symbol(&mut entries, spec);
    }
    out.u32(8 + entries.len() as u32);
    out.u32(symbols.len() as u32);
    out.raw(&entries.bytes);
}

// ── Features ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum FeaturePoint {
    Real(f64, f64, f64),
    Break,
}

/// Break sentinel x value between coordinate sub-sequences.
pub const COORDINATE_BREAK_X: f64 = -2684354.56;

/// Break sentinel x value inside polyline primitive runs.
pub const PRIMITIVE_BREAK_X: i32 = -268435456;

#[derive(Clone)]
pub struct FeatureSpec {
    pub header_size: u32,
    pub layer_id: i32,
    pub layer_index: i32,
    pub id: i32,
    pub status: u32,
    pub scale: f32,
    pub symbol_orientation: i32,
    pub attribute_string: String,
    pub points: Vec<FeaturePoint>,
    pub padding: usize,
    pub size_adjust: i64,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self {
            header_size: 44,
            layer_id: 1,
            layer_index: 1,
            id: 1,
            status: 0,
            scale: 1.0,
            symbol_orientation: 0,
            attribute_string: String::new(),
            points: Vec::new(),
            padding: 0,
            size_adjust: 0,
        }
    }
}

pub fn write_feature(out: &mut StreamWriter, spec: &FeatureSpec) {
    let mut body = StreamWriter::new();
    body.u16(0); // point storage format, reserved
    body.u32(spec.header_size);
    body.i32(spec.points.len() as i32);
    body.i32(spec.layer_id);
    body.i32(0); // kind, reserved
    body.i32(spec.layer_index);
    body.i32(spec.id);
    body.i32(spec.status as i32);
    body.i32(0); // where, reserved
    body.f32(spec.scale);
    body.i32(0); // group, reserved
    body.i32(0); // parent, reserved
    body.i32(spec.symbol_orientation);
    body.i32(spec.attribute_string.len() as i32);
    body.raw(spec.attribute_string.as_bytes());
    for point in &spec.points {
        body.i32(0); // point status
        match point {
            FeaturePoint::Real(x, y, z) => {
                body.extended(*x);
                body.extended(*y);
                body.extended(*z);
            }
            FeaturePoint::Break => {
                body.extended(COORDINATE_BREAK_X);
                body.extended(0.0);
                body.extended(0.0);
            }
        }
    }
    body.zeros(spec.padding);

    out.u32((body.len() as i64 + spec.size_adjust) as u32);
    out.raw(&body.bytes);
}

// ── Whole files ───────────────────────────────────────────────────────────

pub struct MapFile {
    pub version: &'static str,
    pub compressed: bool,
    pub scale: f64,
    pub name: String,
    pub service_layers: Vec<LayerSpec>,
    pub normal_layers: Vec<LayerSpec>,
    pub service_attributes: Vec<AttributeSpec>,
    pub normal_attributes: Vec<AttributeSpec>,
    pub symbols: Vec<SymbolSpec>,
    /// (record size, record count) for the v1.15 access-policy block.
    pub access_policies: (i32, i32),
    pub features: Vec<FeatureSpec>,
}

impl Default for MapFile {
    fn default() -> Self {
        Self {
            version: "1.10",
            compressed: false,
            scale: 10_000.0,
            name: "test map".to_string(),
            service_layers: Vec::new(),
            normal_layers: Vec::new(),
            service_attributes: Vec::new(),
            normal_attributes: Vec::new(),
            symbols: Vec::new(),
            access_policies: (16, 0),
            features: Vec::new(),
        }
    }
}

impl MapFile {
    pub fn build(&self) -> Vec<u8> {
        let mut body = StreamWriter::new();
        write_header(&mut body, self.scale, self.features.len() as u32, &self.name);
        write_layer_list(&mut body, &self.service_layers, &self.normal_layers);
        write_attribute_list(
            &mut body,
            &self.service_attributes,
            &self.normal_attributes,
        );
        write_symbol_list(&mut body, &self.symbols);
        if self.version == "1.15" {
            let (record_size, count) = self.access_policies;
            body.i32(record_size * count + 8);
            body.i32(record_size);
            body.i32(count);
            body.zeros((record_size * count) as usize);
        }
        for feature in &self.features {
            write_feature(&mut body, feature);
        }

        let mut file = signature(self.version, self.compressed);
        if self.compressed {
            let mut encoder =
                flate2::write::ZlibEncoder::new(&mut file, flate2::Compression::default());
            encoder.write_all(&body.bytes).unwrap();
            encoder.finish().unwrap();
        } else {
            file.extend_from_slice(&body.bytes);
        }
        file
    }
}
