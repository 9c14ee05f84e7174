use crate::error::{Error, Result};

/// Decodes an unsigned LEB128-encoded integer, returning it together with
/// the number of bytes consumed.
pub fn decode(values: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0;
    let mut shift = 0;

    let mut consumed = 0;
    for byte in values {
        consumed += 1;
        if shift == 63 && *byte > 1 {
            return Err(Error::corrupt("uleb128 value overflows an u64"));
        };

        result |= u64::from(byte & 0x7f) << shift;

        if byte & 0x80 == 0 {
            return Ok((result, consumed));
        }

        shift += 7;
    }
    Err(Error::corrupt("uleb128 value ends mid-stream"))
}
