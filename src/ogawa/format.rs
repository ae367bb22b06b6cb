//! Ogawa format constants.
//!
//! Everything here is persistent wire format: changing a value breaks
//! interoperability with existing archives.

/// Magic bytes at the start of an Ogawa file.
pub const OGAWA_MAGIC: &[u8; 5] = b"Ogawa";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Offset of the frozen flag in the header.
pub const FROZEN_OFFSET: usize = 5;

/// Offset of the version in the header.
pub const VERSION_OFFSET: usize = 6;

/// Offset of the root group position in the header.
pub const ROOT_POS_OFFSET: usize = 8;

/// Frozen flag value when archive is frozen (finalized).
pub const FROZEN_FLAG: u8 = 0xFF;

/// Bit set on child offsets that point at data rather than a group.
pub const TYPE_FLAG_MASK: u64 = 1 << 63;

/// Mask to extract the actual offset from a child pointer.
pub const OFFSET_MASK: u64 = !TYPE_FLAG_MASK;

/// Every non-empty sample data block starts with this many key bytes.
pub const DATA_KEY_SIZE: usize = 16;

/// Archive layout version this decoder understands.
pub const ALEMBIC_OGAWA_FILE_VERSION: i32 = 0;

/// Oldest library version that wrote this layout.
pub const MIN_ALEMBIC_VERSION: i32 = 9999;

// Property header info word, low to high:
// 0000 0000 0000 0000 0000 0000 0000 0011  property type
// 0000 0000 0000 0000 0000 0000 0011 1100  element kind
// 0000 0000 0000 0000 0000 0000 0100 0000  explicit time sampling index
// 0000 0000 0000 0000 0000 0000 1000 0000  explicit first/last changed
// 0000 0000 0000 0000 1111 1111 0000 0000  extent
// 0000 0000 0000 0001 0000 0000 0000 0000  homogeneous

pub const PTYPE_MASK: u32 = 0x0003;
pub const POD_MASK: u32 = 0x003c;
pub const POD_SHIFT: u32 = 2;
pub const HAS_TSIDX_MASK: u32 = 0x0040;
pub const NEEDS_FIRST_LAST_MASK: u32 = 0x0080;
pub const EXTENT_MASK: u32 = 0xff00;
pub const EXTENT_SHIFT: u32 = 8;
pub const HOMOGENEOUS_MASK: u32 = 0x1_0000;

/// Check if a child offset represents a group (MSB clear).
#[inline]
pub const fn is_group_offset(offset: u64) -> bool {
    (offset & TYPE_FLAG_MASK) == 0
}

/// Check if a child offset represents data (MSB set).
#[inline]
pub const fn is_data_offset(offset: u64) -> bool {
    (offset & TYPE_FLAG_MASK) != 0
}

/// Extract the actual position from a child offset.
#[inline]
pub const fn extract_offset(offset: u64) -> u64 {
    offset & OFFSET_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets() {
        assert!(is_group_offset(0x1234));
        assert!(!is_data_offset(0x1234));

        let data_offset = 0x5678 | TYPE_FLAG_MASK;
        assert!(is_data_offset(data_offset));
        assert_eq!(extract_offset(data_offset), 0x5678);
        assert_eq!(data_offset, 0x8000000000005678);
    }

    #[test]
    fn test_info_masks_are_disjoint() {
        let masks = [
            PTYPE_MASK,
            POD_MASK,
            HAS_TSIDX_MASK,
            NEEDS_FIRST_LAST_MASK,
            EXTENT_MASK,
            HOMOGENEOUS_MASK,
        ];
        for (i, a) in masks.iter().enumerate() {
            for b in &masks[i + 1..] {
                assert_eq!(a & b, 0);
            }
        }
        assert_eq!(POD_MASK >> POD_SHIFT, 0xf);
        assert_eq!(EXTENT_MASK >> EXTENT_SHIFT, 0xff);
    }
}
