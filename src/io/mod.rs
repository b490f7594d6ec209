//! DMF decoding pipeline.
//!
//! The pipeline is a strictly sequential, single-pass walk over one byte
//! stream: signature → optional decompression framing → header → layer
//! list → attribute list → symbol list → optional access policies →
//! feature list → assembly. No component seeks backward or re-reads
//! earlier bytes.
//!
//! # Module Structure
//!
//! - [`extended`] — 80-bit extended-precision float to f64 conversion
//! - [`stream_reader`] — forward-only byte cursor with position tracking
//! - [`framing`] — file signature and raw/decompressed stream selection
//! - [`attribute_string`] — tokenizer for the per-feature attribute string
//! - [`reader`] — the orchestrating [`DmfReader`]

pub mod attribute_string;
pub mod extended;
pub mod framing;
pub mod reader;
pub mod stream_reader;

pub use framing::Signature;
pub use reader::DmfReader;
pub use stream_reader::{BitArray, StreamReader};
