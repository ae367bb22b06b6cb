//! Plain Old Data types - the element kinds a sample can be stored as.

use bytemuck::{Pod, Zeroable};
use half::f16;
use std::fmt;

use super::Error;

/// Plain Old Data type enum - the element kinds of the format (codes 0-13).
///
/// The discriminant is the 4-bit code stored in property header info words.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PlainOldDataType {
    /// Boolean (stored as u8: 0 = false, non-zero = true)
    Boolean = 0,
    /// Unsigned 8-bit integer
    Uint8 = 1,
    /// Signed 8-bit integer
    Int8 = 2,
    /// Unsigned 16-bit integer
    Uint16 = 3,
    /// Signed 16-bit integer
    Int16 = 4,
    /// Unsigned 32-bit integer
    Uint32 = 5,
    /// Signed 32-bit integer
    Int32 = 6,
    /// Unsigned 64-bit integer
    Uint64 = 7,
    /// Signed 64-bit integer
    Int64 = 8,
    /// 16-bit floating point (IEEE 754 half precision)
    Float16 = 9,
    /// 32-bit floating point (IEEE 754 single precision)
    Float32 = 10,
    /// 64-bit floating point (IEEE 754 double precision)
    Float64 = 11,
    /// Zero-terminated 8-bit string
    String = 12,
    /// Zero-terminated string of 32-bit code units
    Wstring = 13,
}

impl PlainOldDataType {
    /// Number of element kinds.
    pub const COUNT: usize = 14;

    /// All kinds in code order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Boolean,
        Self::Uint8,
        Self::Int8,
        Self::Uint16,
        Self::Int16,
        Self::Uint32,
        Self::Int32,
        Self::Uint64,
        Self::Int64,
        Self::Float16,
        Self::Float32,
        Self::Float64,
        Self::String,
        Self::Wstring,
    ];

    /// Size in bytes of one element as laid out on disk.
    ///
    /// For String/Wstring this is the width of one code unit, not of a
    /// whole string.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Boolean | Self::Uint8 | Self::Int8 | Self::String => 1,
            Self::Uint16 | Self::Int16 | Self::Float16 => 2,
            Self::Uint32 | Self::Int32 | Self::Float32 | Self::Wstring => 4,
            Self::Uint64 | Self::Int64 | Self::Float64 => 8,
        }
    }

    /// Returns the name of this type as a string.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "bool_t",
            Self::Uint8 => "uint8_t",
            Self::Int8 => "int8_t",
            Self::Uint16 => "uint16_t",
            Self::Int16 => "int16_t",
            Self::Uint32 => "uint32_t",
            Self::Int32 => "int32_t",
            Self::Uint64 => "uint64_t",
            Self::Int64 => "int64_t",
            Self::Float16 => "float16_t",
            Self::Float32 => "float32_t",
            Self::Float64 => "float64_t",
            Self::String => "string",
            Self::Wstring => "wstring",
        }
    }

    /// Parse POD type from its name string.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|pod| pod.name() == name)
    }

    /// Map a wire code to its kind.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Boolean),
            1 => Some(Self::Uint8),
            2 => Some(Self::Int8),
            3 => Some(Self::Uint16),
            4 => Some(Self::Int16),
            5 => Some(Self::Uint32),
            6 => Some(Self::Int32),
            7 => Some(Self::Uint64),
            8 => Some(Self::Int64),
            9 => Some(Self::Float16),
            10 => Some(Self::Float32),
            11 => Some(Self::Float64),
            12 => Some(Self::String),
            13 => Some(Self::Wstring),
            _ => None,
        }
    }

    /// Returns true if this is a numeric type (int or float).
    #[inline]
    pub const fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Returns true if this is an integer type.
    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Uint8
                | Self::Int8
                | Self::Uint16
                | Self::Int16
                | Self::Uint32
                | Self::Int32
                | Self::Uint64
                | Self::Int64
        )
    }

    /// Returns true if this is a floating point type.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    /// Returns true if this is a string type.
    #[inline]
    pub const fn is_string(self) -> bool {
        matches!(self, Self::String | Self::Wstring)
    }
}

impl TryFrom<u8> for PlainOldDataType {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_u8(code).ok_or(Error::UnknownElementKind(code))
    }
}

impl fmt::Display for PlainOldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// === POD Trait for typed sample views ===

/// Rust types a numeric sample buffer can be viewed as.
pub trait PodElement: Pod + Zeroable + Copy + Default {
    /// The corresponding PlainOldDataType enum value.
    const POD_TYPE: PlainOldDataType;
}

impl PodElement for u8 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Uint8;
}

impl PodElement for i8 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Int8;
}

impl PodElement for u16 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Uint16;
}

impl PodElement for i16 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Int16;
}

impl PodElement for u32 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Uint32;
}

impl PodElement for i32 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Int32;
}

impl PodElement for u64 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Uint64;
}

impl PodElement for i64 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Int64;
}

impl PodElement for f16 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Float16;
}

impl PodElement for f32 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Float32;
}

impl PodElement for f64 {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Float64;
}

/// Boolean with guaranteed 1-byte storage, matching the on-disk bool_t.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Bool(u8);

impl Bool {
    pub const TRUE: Self = Self(1);
    pub const FALSE: Self = Self(0);

    #[inline]
    pub const fn new(v: bool) -> Self {
        Self(v as u8)
    }

    #[inline]
    pub const fn get(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Bool {
    #[inline]
    fn from(v: bool) -> Self {
        Self::new(v)
    }
}

impl From<Bool> for bool {
    #[inline]
    fn from(v: Bool) -> Self {
        v.get()
    }
}

impl fmt::Debug for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl PodElement for Bool {
    const POD_TYPE: PlainOldDataType = PlainOldDataType::Boolean;
}
