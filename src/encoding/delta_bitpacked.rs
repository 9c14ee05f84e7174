use super::{bitpacked, ceil8, uleb128, zigzag_leb128};
use crate::error::{Error, Result};

/// A block of the delta stream: a zigzag `min_delta`, one bit width per
/// mini block, then the packed mini blocks. Mini blocks not required to
/// hold the remaining values may be omitted by writers.
#[derive(Debug)]
struct Block<'a> {
    min_delta: i64,
    bitwidths: &'a [u8],
    values: &'a [u8],
    values_per_mini_block: usize,
    remaining: usize,
    current_index: usize,
    current_miniblock: Option<bitpacked::Decoder<'a, u64>>,
    // whether a mini block (possibly of width zero) is currently entered.
    miniblock_loaded: bool,
    // number of bytes consumed from the start of the block.
    consumed_bytes: usize,
}

impl<'a> Block<'a> {
    fn try_new(
        mut values: &'a [u8],
        num_mini_blocks: usize,
        values_per_mini_block: usize,
        length: usize,
    ) -> Result<Self> {
        let length = std::cmp::min(length, num_mini_blocks * values_per_mini_block);

        let mut consumed_bytes = 0;
        let (min_delta, consumed) = zigzag_leb128::decode(values)?;
        consumed_bytes += consumed;
        values = &values[consumed..];

        if num_mini_blocks > values.len() {
            return Err(Error::corrupt("delta header ends mid-stream"));
        }
        let bitwidths = &values[..num_mini_blocks];
        consumed_bytes += num_mini_blocks;
        values = &values[num_mini_blocks..];

        Ok(Block {
            min_delta,
            bitwidths,
            values,
            values_per_mini_block,
            remaining: length,
            current_index: 0,
            current_miniblock: None,
            miniblock_loaded: false,
            consumed_bytes,
        })
    }

    fn advance_miniblock(&mut self) -> Result<()> {
        let num_bits = *self
            .bitwidths
            .first()
            .ok_or_else(|| Error::corrupt("delta block has no mini blocks left"))?
            as usize;
        self.bitwidths = &self.bitwidths[1..];

        self.current_miniblock = if num_bits > 0 {
            let length = std::cmp::min(self.remaining, self.values_per_mini_block);

            let miniblock_length = ceil8(self.values_per_mini_block * num_bits);
            if miniblock_length > self.values.len() {
                return Err(Error::corrupt("delta mini block ends mid-stream"));
            }
            let (miniblock, remainder) = self.values.split_at(miniblock_length);

            self.values = remainder;
            self.consumed_bytes += miniblock_length;

            Some(bitpacked::Decoder::try_new(miniblock, num_bits, length)?)
        } else {
            None
        };
        self.current_index = 0;
        Ok(())
    }

    fn next_delta(&mut self) -> Option<Result<i64>> {
        if self.remaining == 0 {
            return None;
        }
        if !self.miniblock_loaded {
            if let Err(e) = self.advance_miniblock() {
                return Some(Err(e));
            }
            self.miniblock_loaded = true;
        }

        let packed = self
            .current_miniblock
            .as_mut()
            .map(|x| x.next().unwrap_or(0))
            .unwrap_or(0);
        let delta = self.min_delta.wrapping_add(packed as i64);
        self.current_index += 1;
        self.remaining -= 1;

        if self.remaining > 0 && self.current_index == self.values_per_mini_block {
            self.current_miniblock = None;
            self.miniblock_loaded = false;
            self.current_index = 0;
        }

        Some(Ok(delta))
    }
}

/// Decoder of parquet's `DELTA_BINARY_PACKED`. Implements
/// `Iterator<Item = Result<i64>>`; callers narrow to `i32` when the column
/// is 32 bits wide.
/// # Implementation
/// This struct does not allocate on the heap.
#[derive(Debug)]
pub struct Decoder<'a> {
    num_mini_blocks: usize,
    values_per_mini_block: usize,
    remaining: usize,
    current_value: i64,
    started: bool,
    values: &'a [u8],
    current_block: Option<Block<'a>>,
    // bytes consumed up to, but excluding, the current block.
    consumed_bytes: usize,
}

impl<'a> Decoder<'a> {
    pub fn try_new(mut values: &'a [u8]) -> Result<Self> {
        let mut consumed_bytes = 0;
        let (block_size, consumed) = uleb128::decode(values)?;
        consumed_bytes += consumed;
        values = &values[consumed..];
        let (num_mini_blocks, consumed) = uleb128::decode(values)?;
        let num_mini_blocks = num_mini_blocks as usize;
        consumed_bytes += consumed;
        values = &values[consumed..];
        let (total_count, consumed) = uleb128::decode(values)?;
        let total_count = total_count as usize;
        consumed_bytes += consumed;
        values = &values[consumed..];
        let (first_value, consumed) = zigzag_leb128::decode(values)?;
        consumed_bytes += consumed;
        values = &values[consumed..];

        if block_size % 128 != 0 || num_mini_blocks == 0 || block_size % num_mini_blocks as u64 != 0
        {
            return Err(Error::corrupt(format!(
                "invalid delta header: block size {}, {} mini blocks",
                block_size, num_mini_blocks
            )));
        }
        let values_per_mini_block = block_size as usize / num_mini_blocks;
        if values_per_mini_block % 8 != 0 {
            return Err(Error::corrupt(
                "delta mini blocks must hold a multiple of 8 values",
            ));
        }

        Ok(Self {
            num_mini_blocks,
            values_per_mini_block,
            remaining: total_count,
            current_value: first_value,
            started: false,
            values,
            current_block: None,
            consumed_bytes,
        })
    }

    /// Returns the total number of bytes consumed up to this point by this
    /// decoder. The iterator must be exhausted before calling this.
    pub fn consumed_bytes(&self) -> usize {
        self.consumed_bytes
            + self
                .current_block
                .as_ref()
                .map(|block| block.consumed_bytes)
                .unwrap_or(0)
    }

    fn next_delta(&mut self) -> Result<i64> {
        loop {
            if let Some(block) = &mut self.current_block {
                match block.next_delta() {
                    Some(delta) => return delta,
                    None => {
                        self.values = &self.values[block.consumed_bytes..];
                        self.consumed_bytes += block.consumed_bytes;
                        self.current_block = None;
                    }
                }
            } else {
                self.current_block = Some(Block::try_new(
                    self.values,
                    self.num_mini_blocks,
                    self.values_per_mini_block,
                    self.remaining,
                )?);
            }
        }
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        if !self.started {
            self.started = true;
            self.remaining -= 1;
            return Some(Ok(self.current_value));
        }
        let delta = match self.next_delta() {
            Ok(delta) => delta,
            Err(e) => {
                self.remaining = 0;
                return Some(Err(e));
            }
        };
        self.current_value = self.current_value.wrapping_add(delta);
        self.remaining -= 1;
        Some(Ok(self.current_value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
