//! # abc-decode
//!
//! Decoder for the Alembic (.abc) Ogawa archive layout: object and property
//! headers, the archive time sampling table, and typed sample data with
//! saturating conversion between element kinds.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (element kinds, DataType, Dimensions, errors)
//! - [`core`] - Time sampling, metadata, headers and samples
//! - [`ogawa`] - Storage, record decoders and the archive walker
//!
//! ## Example
//!
//! ```ignore
//! use abc_decode::prelude::*;
//!
//! let archive = Archive::open("animation.abc", &ReadOptions::default())?;
//! let top = archive.top(0)?;
//!
//! for child in top.child_headers() {
//!     println!("{}", child.full_name);
//! }
//! ```

pub mod util;
pub mod core;
pub mod ogawa;

// Re-export commonly used types
pub use util::{DataType, Dimensions, Error, PlainOldDataType, Result};
pub use ogawa::{Archive, ReadOptions};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{DataType, Dimensions, Error, PlainOldDataType, Result};
    pub use crate::core::{
        MetaData, ObjectHeader, PropertyHeader, PropertyType, Sample, SampleSelector,
        TimeSampling, TimeSamplingRegistry,
    };
    pub use crate::ogawa::{
        Archive, ArrayPropertyReader, BlockGroup, CompoundReader, DataBlock, MemGroup,
        ObjectReader, PropertyReader, ReadOptions, ScalarPropertyReader,
    };
}
