//! Ogawa archive decoding.
//!
//! Ogawa is the binary container used by Alembic files (.abc): a tree of
//! groups whose leaves are untyped data blocks. This module decodes the
//! Alembic records stored in those blocks.
//!
//! ## File Structure
//!
//! ```text
//! +------------------+
//! | Magic: "Ogawa"   |  5 bytes
//! +------------------+
//! | Frozen flag      |  1 byte (0x00 or 0xFF)
//! +------------------+
//! | Version          |  2 bytes (u16 LE)
//! +------------------+
//! | Root Group Pos   |  8 bytes (u64 LE)
//! +------------------+
//! | ... Data ...     |
//! +------------------+
//! ```
//!
//! - [`storage`] - block capability traits and the in-memory [`MemGroup`]
//! - [`reader`] - file-backed storage ([`IStreams`], [`IGroup`], [`IData`])
//! - [`convert`] - saturating element conversion
//! - [`read_util`] - header and sample decoders
//! - [`archive`] - archive, object and property readers

mod format;
pub mod storage;
pub mod reader;
pub mod convert;
pub mod read_util;
pub mod archive;

pub use format::*;
pub use storage::{BlockGroup, DataBlock, MemChild, MemData, MemGroup};
pub use reader::{open_root, IData, IGroup, IStreams, ReadOptions};
pub use convert::{convert, convert_in_place, ScanOrder};
pub use read_util::{
    decode_object_headers, decode_property_headers, decode_time_samplings, read_array_sample,
    read_data_into, read_dimensions, read_sample_key, read_scalar_sample, read_typed_data,
};
pub use archive::{
    Archive, ArrayPropertyReader, CompoundReader, ObjectReader, PropertyReader,
    ScalarPropertyReader,
};
