//! Samples and sample selection.
//!
//! A [`Sample`] is one materialized, fully owned time slice of a property.

use crate::util::{Chrono, DataType, Dimensions, Error, PodElement, Result};
use super::TimeSampling;

/// Sample selector for reading property samples.
#[derive(Clone, Copy, Debug)]
pub enum SampleSelector {
    /// Select by exact index.
    Index(usize),
    /// Select by time - floor (largest index <= time).
    TimeFloor(Chrono),
    /// Select by time - ceil (smallest index >= time).
    TimeCeil(Chrono),
    /// Select by time - nearest.
    TimeNear(Chrono),
}

impl SampleSelector {
    /// Resolve to a sample index against a property's sampling.
    pub fn resolve(&self, sampling: &TimeSampling, num_samples: usize) -> usize {
        match *self {
            Self::Index(i) => i,
            Self::TimeFloor(t) => sampling.floor_index(t, num_samples).0,
            Self::TimeCeil(t) => sampling.ceil_index(t, num_samples).0,
            Self::TimeNear(t) => sampling.near_index(t, num_samples).0,
        }
    }
}

impl Default for SampleSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl From<usize> for SampleSelector {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<Chrono> for SampleSelector {
    fn from(time: Chrono) -> Self {
        Self::TimeNear(time)
    }
}

/// Byte buffer with 8-byte alignment, so it can be viewed as any POD slice.
#[derive(Clone, Default)]
pub struct PodBuffer {
    words: Vec<u64>,
    len: usize,
}

impl PodBuffer {
    /// Zero-filled buffer of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self {
            words: vec![0u64; len.div_ceil(8)],
            len,
        }
    }

    /// Copy bytes into a new aligned buffer.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut buf = Self::zeroed(bytes.len());
        buf.as_bytes_mut().copy_from_slice(bytes);
        buf
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len]
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shrink the logical length. Never grows.
    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }
}

impl PartialEq for PodBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for PodBuffer {}

impl std::fmt::Debug for PodBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PodBuffer({} bytes)", self.len)
    }
}

/// Decoded sample values.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleValues {
    /// Numeric and boolean kinds, little-endian element bytes.
    Pod(PodBuffer),
    /// String and wide-string kinds, one entry per terminated string.
    Strings(Vec<String>),
}

/// One materialized sample.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    data_type: DataType,
    dims: Dimensions,
    values: SampleValues,
}

impl Sample {
    /// Create a sample from decoded parts.
    pub fn new(data_type: DataType, dims: Dimensions, values: SampleValues) -> Self {
        Self { data_type, dims, values }
    }

    /// Sample with no values, as produced by an empty data block.
    pub fn empty(data_type: DataType) -> Self {
        let values = if data_type.pod.is_string() {
            SampleValues::Strings(Vec::new())
        } else {
            SampleValues::Pod(PodBuffer::default())
        };
        Self::new(data_type, Dimensions::d1(0), values)
    }

    /// Data type the values are exposed as.
    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Shape of the sample.
    #[inline]
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// Decoded values.
    #[inline]
    pub fn values(&self) -> &SampleValues {
        &self.values
    }

    /// Number of POD elements (or strings).
    pub fn len(&self) -> usize {
        match &self.values {
            SampleValues::Pod(buf) => match self.data_type.pod.num_bytes() {
                0 => 0,
                n => buf.len() / n,
            },
            SampleValues::Strings(strings) => strings.len(),
        }
    }

    /// True if no values were decoded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw element bytes; empty for string samples.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.values {
            SampleValues::Pod(buf) => buf.as_bytes(),
            SampleValues::Strings(_) => &[],
        }
    }

    /// Typed view of the elements. `T` must match the exposed POD.
    pub fn as_slice<T: PodElement>(&self) -> Result<&[T]> {
        if T::POD_TYPE != self.data_type.pod {
            return Err(Error::InvalidConversion {
                from: self.data_type.pod,
                to: T::POD_TYPE,
            });
        }
        bytemuck::try_cast_slice::<u8, T>(self.as_bytes())
            .map_err(|e| Error::invalid(format!("Sample buffer cast failed: {}", e)))
    }

    /// String values, if this is a string sample.
    pub fn strings(&self) -> Option<&[String]> {
        match &self.values {
            SampleValues::Strings(strings) => Some(strings),
            SampleValues::Pod(_) => None,
        }
    }
}
