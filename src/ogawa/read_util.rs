//! Alembic record decoding on top of Ogawa blocks.
//!
//! Header decoders are pure functions over a byte snapshot of one block.
//! Sample readers go through the [`DataBlock`] capability and never hold
//! state between calls.

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, trace};

use super::convert::{self, converted_len};
use super::format::*;
use super::storage::DataBlock;
use crate::core::{
    MetaData, ObjectHeader, PodBuffer, PropertyHeader, PropertyType, Sample, SampleValues,
    TimeSampling, TimeSamplingRegistry,
};
use crate::util::{DataType, Dimensions, Error, PlainOldDataType, Result};

// ============================================================================
// Byte cursor
// ============================================================================

/// Little-endian reader over one record stream.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, needed: usize, what: &'static str) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(needed).filter(|&end| end <= self.buf.len());
        let Some(end) = end else {
            return Err(Error::Truncated {
                what,
                pos: self.pos,
                needed,
                len: self.buf.len(),
            });
        };
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u32(&mut self, what: &'static str) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4, what)?))
    }

    fn f64(&mut self, what: &'static str) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.take(8, what)?))
    }

    /// `[len: u32][len bytes]`
    fn sized(&mut self, what: &'static str) -> Result<&'a [u8]> {
        let len = self.u32(what)? as usize;
        self.take(len, what)
    }

    fn name(&mut self) -> Result<String> {
        Ok(String::from_utf8_lossy(self.sized("name")?).into_owned())
    }

    fn meta_data(&mut self) -> Result<MetaData> {
        Ok(MetaData::parse_bytes(self.sized("metadata")?))
    }
}

// ============================================================================
// Time Sampling Parsing
// ============================================================================

/// Decode the archive time sampling stream.
///
/// Each record is `[max sample: u32][time per cycle: f64][count: u32]`
/// followed by `count` sample times. Returns the samplings and their max
/// sample counts, both in record order.
pub fn decode_time_samplings(buf: &[u8]) -> Result<(Vec<TimeSampling>, Vec<u32>)> {
    let mut samplings = Vec::new();
    let mut max_samples = Vec::new();
    let mut cur = Cursor::new(buf);

    while !cur.at_end() {
        max_samples.push(cur.u32("time sampling max sample")?);
        let time_per_cycle = cur.f64("time per cycle")?;
        let count = cur.u32("time sample count")? as usize;

        let raw = cur.take(count.saturating_mul(8), "sample times")?;
        let times: Vec<f64> = raw.chunks_exact(8).map(LittleEndian::read_f64).collect();

        let sampling = if time_per_cycle == crate::core::ACYCLIC_TIME_PER_CYCLE {
            TimeSampling::acyclic(times)
        } else {
            TimeSampling::cyclic(time_per_cycle, times)
        };
        trace!(index = samplings.len(), kind = ?sampling.sampling_type, "time sampling");
        samplings.push(sampling);
    }

    debug!(count = samplings.len(), "decoded time samplings");
    Ok((samplings, max_samples))
}

// ============================================================================
// Object Header Parsing
// ============================================================================

/// Decode the child object headers of one object.
///
/// Records are `[name len: u32][name][metadata len: u32][metadata]`; full
/// paths are built from `parent_full_name`.
pub fn decode_object_headers(buf: &[u8], parent_full_name: &str) -> Result<Vec<ObjectHeader>> {
    let mut headers = Vec::new();
    let mut cur = Cursor::new(buf);

    while !cur.at_end() {
        let name = cur.name()?;
        let meta_data = cur.meta_data()?;
        headers.push(ObjectHeader::new(name, parent_full_name, meta_data));
    }

    trace!(parent = parent_full_name, count = headers.len(), "decoded object headers");
    Ok(headers)
}

// ============================================================================
// Property Header Parsing
// ============================================================================

/// Decode the property headers of one compound.
///
/// Time sampling indices are resolved through `registry`; an index it does
/// not hold fails the whole call.
pub fn decode_property_headers(
    buf: &[u8],
    registry: &TimeSamplingRegistry,
) -> Result<Vec<PropertyHeader>> {
    let mut headers = Vec::new();
    let mut cur = Cursor::new(buf);

    while !cur.at_end() {
        let info = cur.u32("property info")?;
        let ptype = info & PTYPE_MASK;
        let property_type = PropertyType::from_bits(ptype);

        if property_type == PropertyType::Compound {
            let name = cur.name()?;
            let meta_data = cur.meta_data()?;
            headers.push(PropertyHeader::compound(name, meta_data));
            continue;
        }

        let pod = PlainOldDataType::try_from(((info & POD_MASK) >> POD_SHIFT) as u8)?;
        let extent = ((info & EXTENT_MASK) >> EXTENT_SHIFT) as u8;

        let next_sample_index = cur.u32("next sample index")?;
        let (first_changed_index, last_changed_index) = if info & NEEDS_FIRST_LAST_MASK != 0 {
            (cur.u32("first changed index")?, cur.u32("last changed index")?)
        } else {
            (1, next_sample_index.wrapping_sub(1))
        };

        let time_sampling_index = if info & HAS_TSIDX_MASK != 0 {
            cur.u32("time sampling index")?
        } else {
            0
        };
        let time_sampling = registry.get(time_sampling_index)?.clone();

        let name = cur.name()?;
        let meta_data = cur.meta_data()?;

        headers.push(PropertyHeader {
            name,
            property_type,
            data_type: Some(DataType::new(pod, extent)),
            is_scalar_like: ptype & 1 != 0,
            is_homogeneous: info & HOMOGENEOUS_MASK != 0,
            next_sample_index,
            first_changed_index,
            last_changed_index,
            time_sampling_index,
            time_sampling: Some(time_sampling),
            meta_data,
        });
    }

    trace!(count = headers.len(), "decoded property headers");
    Ok(headers)
}

// ============================================================================
// Sample Data
// ============================================================================

/// Payload size of a sample block after the key, or `None` if empty.
fn payload_len<D: DataBlock>(block: &D) -> Result<Option<usize>> {
    let size = block.size();
    if size == 0 {
        return Ok(None);
    }
    if size < DATA_KEY_SIZE as u64 {
        return Err(Error::MalformedRecord { size });
    }
    Ok(Some((size - DATA_KEY_SIZE as u64) as usize))
}

fn read_payload<D: DataBlock>(block: &D, slot: usize, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    block.read(DATA_KEY_SIZE as u64, &mut buf, slot)?;
    Ok(buf)
}

/// Split zero-terminated strings. Text after the last terminator is dropped.
fn split_strings(payload: &[u8]) -> Vec<String> {
    let count = payload.iter().filter(|&&b| b == 0).count();
    payload
        .split(|&b| b == 0)
        .take(count)
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// Split zero-terminated 32-bit code unit strings.
fn split_wide_strings(payload: &[u8]) -> Vec<String> {
    let units: Vec<u32> = payload.chunks_exact(4).map(LittleEndian::read_u32).collect();
    let count = units.iter().filter(|&&u| u == 0).count();
    units
        .split(|&u| u == 0)
        .take(count)
        .map(|s| {
            s.iter()
                .map(|&u| char::from_u32(u).unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        })
        .collect()
}

fn count_terminators(pod: PlainOldDataType, payload: &[u8]) -> usize {
    match pod {
        PlainOldDataType::Wstring => payload
            .chunks_exact(4)
            .filter(|unit| LittleEndian::read_u32(unit) == 0)
            .count(),
        _ => payload.iter().filter(|&&b| b == 0).count(),
    }
}

/// Read the 16-byte key of a sample block without its payload.
pub fn read_sample_key<D: DataBlock>(block: &D, slot: usize) -> Result<Option<[u8; DATA_KEY_SIZE]>> {
    if payload_len(block)?.is_none() {
        return Ok(None);
    }
    let mut key = [0u8; DATA_KEY_SIZE];
    block.read(0, &mut key, slot)?;
    Ok(Some(key))
}

/// Dimensions of an array sample.
///
/// An explicit dims block holds one u32 extent per rank. Without one the
/// sample is rank 1 and its length is derived from the data block.
pub fn read_dimensions<D: DataBlock>(
    dims: &D,
    data: &D,
    slot: usize,
    data_type: DataType,
) -> Result<Dimensions> {
    if !dims.is_empty() {
        let rank = (dims.size() / 4) as usize;
        let mut raw = vec![0u8; rank * 4];
        dims.read(0, &mut raw, slot)?;
        let sizes: Vec<usize> = raw
            .chunks_exact(4)
            .map(|b| LittleEndian::read_u32(b) as usize)
            .collect();
        return Ok(Dimensions::from(sizes));
    }

    let Some(len) = payload_len(data)? else {
        return Ok(Dimensions::d1(0));
    };

    let extent = data_type.extent.max(1) as usize;
    let count = if data_type.pod.is_string() {
        count_terminators(data_type.pod, &read_payload(data, slot, len)?) / extent
    } else {
        match data_type.num_bytes() {
            0 => 0,
            n => len / n,
        }
    };
    Ok(Dimensions::d1(count))
}

/// Read a sample payload into `dest`, converting from `stored` to `as_pod`.
///
/// Returns the number of bytes written. An empty block writes nothing.
/// `dest` must hold the larger of the stored payload and its converted size,
/// since widening conversions run in place.
#[tracing::instrument(level = "trace", skip_all, fields(slot = slot, %stored, %as_pod))]
pub fn read_data_into<D: DataBlock>(
    block: &D,
    slot: usize,
    stored: PlainOldDataType,
    as_pod: PlainOldDataType,
    dest: &mut [u8],
) -> Result<usize> {
    if stored != as_pod && (stored.is_string() || as_pod.is_string()) {
        return Err(Error::InvalidConversion { from: stored, to: as_pod });
    }
    let Some(len) = payload_len(block)? else {
        return Ok(0);
    };

    let needed = converted_len(stored, as_pod, len);
    if stored == as_pod || stored.num_bytes() <= as_pod.num_bytes() {
        let capacity = needed.max(len);
        if dest.len() < capacity {
            return Err(Error::BufferTooSmall { needed: capacity, got: dest.len() });
        }
        block.read(DATA_KEY_SIZE as u64, &mut dest[..len], slot)?;
        convert::convert_in_place(stored, as_pod, dest, len)
    } else {
        let staging = read_payload(block, slot, len)?;
        convert::convert(stored, as_pod, &staging, dest)
    }
}

/// Read one sample block as `as_pod` values shaped by `dims`.
///
/// An empty block yields an empty sample. String kinds take their value
/// count from the terminators in the payload.
#[tracing::instrument(level = "trace", skip_all, fields(slot = slot, stored = %data_type, %as_pod))]
pub fn read_typed_data<D: DataBlock>(
    block: &D,
    slot: usize,
    data_type: DataType,
    as_pod: PlainOldDataType,
    dims: Dimensions,
) -> Result<Sample> {
    let stored = data_type.pod;
    if stored != as_pod && (stored.is_string() || as_pod.is_string()) {
        return Err(Error::InvalidConversion { from: stored, to: as_pod });
    }
    let out_type = data_type.with_pod(as_pod);
    let Some(len) = payload_len(block)? else {
        return Ok(Sample::empty(out_type));
    };

    let values = match stored {
        PlainOldDataType::String => SampleValues::Strings(split_strings(&read_payload(block, slot, len)?)),
        PlainOldDataType::Wstring => {
            SampleValues::Strings(split_wide_strings(&read_payload(block, slot, len)?))
        }
        _ => {
            let mut buf = PodBuffer::zeroed(converted_len(stored, as_pod, len).max(len));
            let written = read_data_into(block, slot, stored, as_pod, buf.as_bytes_mut())?;
            buf.truncate(written);
            SampleValues::Pod(buf)
        }
    };
    Ok(Sample::new(out_type, dims, values))
}

/// Read an array sample from its dims and data blocks.
///
/// For numeric kinds the dimensions must account for every decoded value.
pub fn read_array_sample<D: DataBlock>(
    dims: &D,
    data: &D,
    slot: usize,
    data_type: DataType,
    as_pod: PlainOldDataType,
) -> Result<Sample> {
    let dimensions = read_dimensions(dims, data, slot, data_type)?;
    let sample = read_typed_data(data, slot, data_type, as_pod, dimensions)?;

    let extent = data_type.extent as usize;
    if !data_type.pod.is_string() && extent != 0 {
        let expected = sample.dims().num_points().saturating_mul(extent);
        if expected != sample.len() {
            return Err(Error::invalid(format!(
                "array sample dimensions {} need {} values, data block holds {}",
                sample.dims(),
                expected,
                sample.len()
            )));
        }
    }
    Ok(sample)
}

/// Read a scalar sample: `extent` values from one data block.
pub fn read_scalar_sample<D: DataBlock>(
    data: &D,
    slot: usize,
    data_type: DataType,
    as_pod: PlainOldDataType,
) -> Result<Sample> {
    read_typed_data(data, slot, data_type, as_pod, Dimensions::d1(data_type.extent as usize))
}
