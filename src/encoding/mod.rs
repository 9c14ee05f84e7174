pub mod bitpacked;
pub mod byte_stream_split;
pub mod delta_bitpacked;
pub mod delta_byte_array;
pub mod delta_length_byte_array;
pub mod hybrid_rle;
pub mod plain;
pub mod uleb128;
pub mod zigzag_leb128;

pub use crate::thrift_bridge::Encoding;

use crate::error::{Error, Result};

/// Reads the `u32` little-endian length prefix of a byte-array value or a
/// v1 level stream.
pub fn get_length(values: &[u8]) -> Result<u32> {
    let bytes: [u8; 4] = values
        .get(0..4)
        .ok_or_else(|| Error::corrupt("a length prefix requires 4 bytes"))?
        .try_into()
        .unwrap();
    Ok(u32::from_le_bytes(bytes))
}

/// Returns the ceil of `value / 8`.
#[inline]
pub fn ceil8(value: usize) -> usize {
    value / 8 + ((value % 8 != 0) as usize)
}

/// The number of bits required to encode levels in `0..=max_level`.
#[inline]
pub fn get_bit_width(max_level: i16) -> usize {
    (64 - (max_level as u64).leading_zeros()) as usize
}
