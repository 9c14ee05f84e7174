use super::uleb128;
use crate::error::Result;

/// Decodes a zigzag-encoded LEB128 integer, returning it together with the
/// number of bytes consumed.
pub fn decode(values: &[u8]) -> Result<(i64, usize)> {
    let (u, consumed) = uleb128::decode(values)?;
    Ok(((u >> 1) as i64 ^ -((u & 1) as i64), consumed))
}
