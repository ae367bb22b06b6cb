//! Saturating conversion between element kinds.
//!
//! One routine covers every ordered pair of kinds. Each element is loaded
//! into a wide intermediate ([`Value`]), clamped into the destination kind's
//! representable range and stored. Strings only convert to their own kind.
//!
//! Source and destination may be the same memory. When the destination
//! element is narrower than the source the scan runs low to high, otherwise
//! high to low, so no source element is overwritten before it is read.

use byteorder::{ByteOrder, LittleEndian};
use half::f16;

use crate::util::{Error, PlainOldDataType, Result};

/// Element value widened to a type that holds every kind exactly
/// (integers) or as closely as the source allows (floats).
#[derive(Clone, Copy, Debug, PartialEq)]
enum Value {
    Int(i128),
    Float(f64),
}

impl Value {
    fn is_zero(self) -> bool {
        match self {
            Value::Int(i) => i == 0,
            Value::Float(f) => f == 0.0,
        }
    }
}

/// Representable range of a destination kind.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Bounds {
    Bool,
    Int { min: i128, max: i128 },
    /// Floats are symmetric: `[-max, max]`.
    Float { max: f64 },
}

/// Range table, one row per non-string kind.
fn bounds(pod: PlainOldDataType) -> Option<Bounds> {
    use PlainOldDataType::*;

    let bounds = match pod {
        Boolean => Bounds::Bool,
        Uint8 => Bounds::Int { min: 0, max: u8::MAX as i128 },
        Int8 => Bounds::Int { min: i8::MIN as i128, max: i8::MAX as i128 },
        Uint16 => Bounds::Int { min: 0, max: u16::MAX as i128 },
        Int16 => Bounds::Int { min: i16::MIN as i128, max: i16::MAX as i128 },
        Uint32 => Bounds::Int { min: 0, max: u32::MAX as i128 },
        Int32 => Bounds::Int { min: i32::MIN as i128, max: i32::MAX as i128 },
        Uint64 => Bounds::Int { min: 0, max: u64::MAX as i128 },
        Int64 => Bounds::Int { min: i64::MIN as i128, max: i64::MAX as i128 },
        Float16 => Bounds::Float { max: f16::MAX.to_f64() },
        Float32 => Bounds::Float { max: f32::MAX as f64 },
        Float64 => Bounds::Float { max: f64::MAX },
        String | Wstring => return None,
    };
    Some(bounds)
}

/// Clamp into `bounds`. Float to integer truncates toward zero; NaN becomes 0
/// for integers and stays NaN for floats.
fn saturate(value: Value, bounds: Bounds) -> Value {
    match bounds {
        Bounds::Bool => Value::Int(!value.is_zero() as i128),
        Bounds::Int { min, max } => {
            let i = match value {
                Value::Int(i) => i,
                Value::Float(f) => f as i128,
            };
            Value::Int(i.clamp(min, max))
        }
        // Integers in range stay integers so `store` casts them only once
        Bounds::Float { max } => match value {
            Value::Int(i) if (i as f64) > max => Value::Float(max),
            Value::Int(i) if (i as f64) < -max => Value::Float(-max),
            Value::Int(i) => Value::Int(i),
            Value::Float(f) => Value::Float(f.clamp(-max, max)),
        },
    }
}

fn load(pod: PlainOldDataType, b: &[u8]) -> Value {
    use PlainOldDataType::*;

    match pod {
        Boolean => Value::Int((b[0] != 0) as i128),
        Uint8 => Value::Int(b[0] as i128),
        Int8 => Value::Int(b[0] as i8 as i128),
        Uint16 => Value::Int(LittleEndian::read_u16(b) as i128),
        Int16 => Value::Int(LittleEndian::read_i16(b) as i128),
        Uint32 => Value::Int(LittleEndian::read_u32(b) as i128),
        Int32 => Value::Int(LittleEndian::read_i32(b) as i128),
        Uint64 => Value::Int(LittleEndian::read_u64(b) as i128),
        Int64 => Value::Int(LittleEndian::read_i64(b) as i128),
        Float16 => Value::Float(f16::from_bits(LittleEndian::read_u16(b)).to_f64()),
        Float32 => Value::Float(LittleEndian::read_f32(b) as f64),
        Float64 => Value::Float(LittleEndian::read_f64(b)),
        String | Wstring => unreachable!("string kinds never reach the numeric path"),
    }
}

/// Store a value already saturated into `pod`'s range.
fn store(pod: PlainOldDataType, value: Value, out: &mut [u8]) {
    use PlainOldDataType::*;

    let i = match value {
        Value::Int(i) => i,
        Value::Float(f) => f as i128,
    };
    match pod {
        Boolean | Uint8 => out[0] = i as u8,
        Int8 => out[0] = i as i8 as u8,
        Uint16 => LittleEndian::write_u16(out, i as u16),
        Int16 => LittleEndian::write_i16(out, i as i16),
        Uint32 => LittleEndian::write_u32(out, i as u32),
        Int32 => LittleEndian::write_i32(out, i as i32),
        Uint64 => LittleEndian::write_u64(out, i as u64),
        Int64 => LittleEndian::write_i64(out, i as i64),
        // an in-range integer fits f64 exactly, so this still rounds once
        Float16 => {
            let h = match value {
                Value::Int(i) => f16::from_f64(i as f64),
                Value::Float(f) => f16::from_f64(f),
            };
            LittleEndian::write_u16(out, h.to_bits())
        }
        Float32 => LittleEndian::write_f32(
            out,
            match value {
                Value::Int(i) => i as f32,
                Value::Float(f) => f as f32,
            },
        ),
        Float64 => LittleEndian::write_f64(
            out,
            match value {
                Value::Int(i) => i as f64,
                Value::Float(f) => f,
            },
        ),
        String | Wstring => unreachable!("string kinds never reach the numeric path"),
    }
}

/// Element scan direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanOrder {
    LowToHigh,
    HighToLow,
}

impl ScanOrder {
    /// Low to high when narrowing, high to low otherwise.
    pub const fn for_conversion(from: PlainOldDataType, to: PlainOldDataType) -> Self {
        if to.num_bytes() < from.num_bytes() {
            Self::LowToHigh
        } else {
            Self::HighToLow
        }
    }

    fn indices(self, count: usize) -> impl Iterator<Item = usize> {
        let reverse = self == Self::HighToLow;
        (0..count).map(move |i| if reverse { count - 1 - i } else { i })
    }
}

/// Strings only pair with themselves.
fn check_pair(from: PlainOldDataType, to: PlainOldDataType) -> Result<()> {
    if from != to && (from.is_string() || to.is_string()) {
        return Err(Error::InvalidConversion { from, to });
    }
    Ok(())
}

/// Bytes the destination needs for `byte_count` source bytes.
pub fn converted_len(from: PlainOldDataType, to: PlainOldDataType, byte_count: usize) -> usize {
    if from == to {
        byte_count
    } else {
        byte_count / from.num_bytes() * to.num_bytes()
    }
}

fn ensure_capacity(needed: usize, got: usize) -> Result<()> {
    if got < needed {
        return Err(Error::BufferTooSmall { needed, got });
    }
    Ok(())
}

/// Convert `src` (whole elements of `from`) into `dst` as `to`.
///
/// Returns the number of bytes written. A trailing partial source element
/// is ignored.
pub fn convert(
    from: PlainOldDataType,
    to: PlainOldDataType,
    src: &[u8],
    dst: &mut [u8],
) -> Result<usize> {
    check_pair(from, to)?;
    let needed = converted_len(from, to, src.len());
    ensure_capacity(needed, dst.len())?;

    if from == to {
        dst[..needed].copy_from_slice(src);
        return Ok(needed);
    }

    let (sw, dw) = (from.num_bytes(), to.num_bytes());
    let Some(to_bounds) = bounds(to) else {
        return Err(Error::InvalidConversion { from, to });
    };
    for i in ScanOrder::for_conversion(from, to).indices(src.len() / sw) {
        let value = saturate(load(from, &src[i * sw..(i + 1) * sw]), to_bounds);
        store(to, value, &mut dst[i * dw..(i + 1) * dw]);
    }
    Ok(needed)
}

/// Convert the first `byte_count` bytes of `buf` from `from` to `to`,
/// writing the result over the same buffer.
///
/// Returns the number of bytes of converted output at the front of `buf`.
pub fn convert_in_place(
    from: PlainOldDataType,
    to: PlainOldDataType,
    buf: &mut [u8],
    byte_count: usize,
) -> Result<usize> {
    check_pair(from, to)?;
    let needed = converted_len(from, to, byte_count);
    ensure_capacity(needed.max(byte_count), buf.len())?;

    if from == to {
        return Ok(needed);
    }

    let (sw, dw) = (from.num_bytes(), to.num_bytes());
    let Some(to_bounds) = bounds(to) else {
        return Err(Error::InvalidConversion { from, to });
    };
    for i in ScanOrder::for_conversion(from, to).indices(byte_count / sw) {
        // Element i is read out before its slot (or any later one) is written
        let value = saturate(load(from, &buf[i * sw..(i + 1) * sw]), to_bounds);
        store(to, value, &mut buf[i * dw..(i + 1) * dw]);
    }
    Ok(needed)
}
