use super::{delta_bitpacked, delta_length_byte_array};
use crate::error::Result;

/// Decodes [Delta strings](https://github.com/apache/parquet-format/blob/master/Encodings.md#delta-strings-delta_byte_array--7):
/// a `DELTA_BINARY_PACKED` stream of prefix lengths, a delta-length stream
/// of suffixes, each value reconstructed as `prev[..prefix] + suffix`.
/// # Implementation
/// This struct does not allocate on the heap.
#[derive(Debug)]
pub struct Decoder<'a> {
    values: &'a [u8],
    prefix_lengths: delta_bitpacked::Decoder<'a>,
}

impl<'a> Decoder<'a> {
    pub fn try_new(values: &'a [u8]) -> Result<Self> {
        let prefix_lengths = delta_bitpacked::Decoder::try_new(values)?;
        Ok(Self {
            values,
            prefix_lengths,
        })
    }

    /// Moves to the suffix-length stream. The prefix lengths must have been
    /// fully consumed by reference first.
    pub fn into_lengths(self) -> Result<delta_length_byte_array::Decoder<'a>> {
        delta_length_byte_array::Decoder::try_new(
            &self.values[self.prefix_lengths.consumed_bytes()..],
        )
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        self.prefix_lengths.next()
    }
}
