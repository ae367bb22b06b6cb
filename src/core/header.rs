//! Headers for objects and properties.
//!
//! Headers are decoded per query and owned by the caller; the only shared
//! piece is the time sampling a property header points at.

use std::sync::Arc;

use crate::util::{DataType, Error, Result};
use super::{MetaData, TimeSampling};

/// Header information for an object in the hierarchy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectHeader {
    /// Name of this object (not full path).
    pub name: String,
    /// Full path from root (e.g., "/parent/child").
    pub full_name: String,
    /// Metadata containing schema info, etc.
    pub meta_data: MetaData,
}

impl ObjectHeader {
    /// Create a header, deriving the full path from the parent's.
    pub fn new(name: impl Into<String>, parent_full_name: &str, meta_data: MetaData) -> Self {
        let name = name.into();
        let full_name = format!("{}/{}", parent_full_name, name);
        Self { name, full_name, meta_data }
    }

    /// Get the schema name from metadata.
    pub fn schema(&self) -> Option<&str> {
        self.meta_data.schema()
    }
}

/// Type of property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyType {
    /// Container for other properties.
    Compound,
    /// Single value per sample.
    Scalar,
    /// Array of values per sample.
    Array,
}

impl PropertyType {
    /// Decode the 2-bit kind field: 0 = compound, 1 = scalar, else array.
    pub const fn from_bits(bits: u32) -> Self {
        match bits {
            0 => Self::Compound,
            1 => Self::Scalar,
            _ => Self::Array,
        }
    }
}

/// Header information for a property.
///
/// For compound properties only `name` and `meta_data` carry meaning;
/// the sampling fields stay at their zero values.
#[derive(Clone, Debug)]
pub struct PropertyHeader {
    /// Name of this property.
    pub name: String,
    /// Property type.
    pub property_type: PropertyType,
    /// Data type (POD + extent); `None` for compounds.
    pub data_type: Option<DataType>,
    /// Scalar-like arrays hold exactly one element per sample.
    pub is_scalar_like: bool,
    /// Every sample has the same dimensions.
    pub is_homogeneous: bool,
    /// Number of samples written.
    pub next_sample_index: u32,
    /// First sample that differs from sample 0.
    pub first_changed_index: u32,
    /// Last sample that differs from its predecessor.
    pub last_changed_index: u32,
    /// Index into the archive time sampling registry.
    pub time_sampling_index: u32,
    /// Resolved time sampling; `None` for compounds.
    pub time_sampling: Option<Arc<TimeSampling>>,
    /// Metadata.
    pub meta_data: MetaData,
}

impl PropertyHeader {
    /// Create a compound property header.
    pub fn compound(name: impl Into<String>, meta_data: MetaData) -> Self {
        Self {
            name: name.into(),
            property_type: PropertyType::Compound,
            data_type: None,
            is_scalar_like: false,
            is_homogeneous: false,
            next_sample_index: 0,
            first_changed_index: 0,
            last_changed_index: 0,
            time_sampling_index: 0,
            time_sampling: None,
            meta_data,
        }
    }

    /// Check if this is a scalar property.
    pub fn is_scalar(&self) -> bool {
        self.property_type == PropertyType::Scalar
    }

    /// Check if this is an array property.
    pub fn is_array(&self) -> bool {
        self.property_type == PropertyType::Array
    }

    /// Check if this is a compound property.
    pub fn is_compound(&self) -> bool {
        self.property_type == PropertyType::Compound
    }

    /// All samples equal sample 0.
    pub fn is_constant(&self) -> bool {
        self.first_changed_index == 0 && self.last_changed_index == 0
    }

    /// Number of logical samples.
    pub fn num_samples(&self) -> usize {
        self.next_sample_index as usize
    }

    /// Map a logical sample index to the index of the stored sample.
    ///
    /// Only samples `first_changed..=last_changed` are stored after sample 0;
    /// earlier indices repeat sample 0 and later ones repeat the last change.
    pub fn stored_sample_index(&self, index: usize) -> Result<usize> {
        if index >= self.num_samples() {
            return Err(Error::SampleOutOfBounds {
                index,
                count: self.num_samples(),
            });
        }

        let first = self.first_changed_index as usize;
        let last = self.last_changed_index as usize;
        if self.is_constant() || index < first {
            return Ok(0);
        }
        // first > last can only come from a corrupt header
        let offset = index.min(last).checked_sub(first).ok_or_else(|| {
            Error::invalid(format!(
                "property {} changes from sample {} but last changes at {}",
                self.name, first, last
            ))
        })?;
        Ok(offset + 1)
    }

    /// Get the interpretation from metadata (e.g., "point", "vector", "normal").
    pub fn interpretation(&self) -> Option<&str> {
        self.meta_data.interpretation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animated(next: u32, first: u32, last: u32) -> PropertyHeader {
        PropertyHeader {
            property_type: PropertyType::Array,
            data_type: Some(DataType::VEC3F),
            next_sample_index: next,
            first_changed_index: first,
            last_changed_index: last,
            ..PropertyHeader::compound("P", MetaData::new())
        }
    }

    #[test]
    fn test_object_header_path() {
        let header = ObjectHeader::new("mesh", "/root", MetaData::new());
        assert_eq!(header.name, "mesh");
        assert_eq!(header.full_name, "/root/mesh");

        let top = ObjectHeader::new("top", "", MetaData::new());
        assert_eq!(top.full_name, "/top");
    }

    #[test]
    fn test_property_type_bits() {
        assert_eq!(PropertyType::from_bits(0), PropertyType::Compound);
        assert_eq!(PropertyType::from_bits(1), PropertyType::Scalar);
        assert_eq!(PropertyType::from_bits(2), PropertyType::Array);
        assert_eq!(PropertyType::from_bits(3), PropertyType::Array);
    }

    #[test]
    fn test_compound_header() {
        let header = PropertyHeader::compound(".geom", MetaData::new());
        assert!(header.is_compound());
        assert!(header.data_type.is_none());
        assert!(header.time_sampling.is_none());
    }

    #[test]
    fn test_stored_sample_index() {
        // Samples 0..10, changes between 3 and 6
        let header = animated(10, 3, 6);
        assert_eq!(header.stored_sample_index(0).unwrap(), 0);
        assert_eq!(header.stored_sample_index(2).unwrap(), 0);
        assert_eq!(header.stored_sample_index(3).unwrap(), 1);
        assert_eq!(header.stored_sample_index(6).unwrap(), 4);
        assert_eq!(header.stored_sample_index(9).unwrap(), 4);
        assert!(matches!(
            header.stored_sample_index(10),
            Err(Error::SampleOutOfBounds { index: 10, count: 10 })
        ));
    }

    #[test]
    fn test_constant_and_default_policy() {
        let constant = animated(5, 0, 0);
        assert!(constant.is_constant());
        assert_eq!(constant.stored_sample_index(4).unwrap(), 0);

        // Default policy: everything after sample 0 is stored
        let every = animated(5, 1, 4);
        assert_eq!(every.stored_sample_index(4).unwrap(), 4);
    }

    #[test]
    fn test_inverted_change_range() {
        let header = animated(10, 5, 2);
        assert_eq!(header.stored_sample_index(3).unwrap(), 0);
        assert!(matches!(header.stored_sample_index(6), Err(Error::InvalidStructure(_))));

        // default policy for a single sample: first 1, last 0
        let single = animated(1, 1, 0);
        assert_eq!(single.stored_sample_index(0).unwrap(), 0);
    }
}
