use super::delta_bitpacked;
use crate::error::Result;

/// Decodes [Delta-length byte arrays](https://github.com/apache/parquet-format/blob/master/Encodings.md#delta-length-byte-array-delta_length_byte_array--6):
/// a `DELTA_BINARY_PACKED` stream of lengths followed by the concatenated
/// bytes. The lengths must be fully consumed by reference before calling
/// [`Decoder::into_values`].
/// # Implementation
/// This struct does not allocate on the heap.
#[derive(Debug)]
pub struct Decoder<'a> {
    values: &'a [u8],
    lengths: delta_bitpacked::Decoder<'a>,
    total_length: usize,
}

impl<'a> Decoder<'a> {
    pub fn try_new(values: &'a [u8]) -> Result<Self> {
        let lengths = delta_bitpacked::Decoder::try_new(values)?;
        Ok(Self {
            values,
            lengths,
            total_length: 0,
        })
    }

    /// Consumes this decoder and returns the slice of concatenated values.
    pub fn into_values(self) -> Result<&'a [u8]> {
        let start = self.lengths.consumed_bytes();
        self.values
            .get(start..start + self.total_length)
            .ok_or_else(|| {
                crate::error::Error::corrupt("delta-length byte payload ends mid-stream")
            })
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.lengths.next();
        if let Some(Ok(length)) = &result {
            self.total_length += *length as usize;
        }
        result
    }
}
