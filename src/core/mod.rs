//! Core layer - format-independent archive model.
//!
//! This module provides:
//! - [`TimeSampling`] / [`TimeSamplingRegistry`] - Sample index to time mapping
//! - [`MetaData`] - Key-value metadata storage
//! - [`ObjectHeader`] / [`PropertyHeader`] - Headers for objects and properties
//! - [`Sample`] / [`SampleSelector`] - Materialized samples and their selection

mod time_sampling;
mod metadata;
mod header;
mod sample;

pub use time_sampling::{
    TimeSampling, TimeSamplingRegistry, TimeSamplingType, ACYCLIC_TIME_PER_CYCLE,
};
pub use metadata::MetaData;
pub use header::{ObjectHeader, PropertyHeader, PropertyType};
pub use sample::{PodBuffer, Sample, SampleSelector, SampleValues};
