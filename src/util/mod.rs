//! Utility types shared by every layer.
//!
//! - [`PlainOldDataType`] - Enum of element kinds
//! - [`DataType`] - POD + extent (dimensionality)
//! - [`Dimensions`] - Array sample shape
//! - [`Error`] / [`Result`] - Error handling

mod pod;
mod data_type;
mod error;
mod dimensions;

pub use pod::*;
pub use data_type::*;
pub use error::*;
pub use dimensions::*;

/// Time value in seconds.
pub type Chrono = f64;
