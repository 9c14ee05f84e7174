// See https://github.com/apache/parquet-format/blob/master/Encodings.md#run-length-encoding--bit-packing-hybrid-rle--3
use super::{bitpacked, ceil8, uleb128};
use crate::error::{Error, Result};

/// A run of the RLE/bit-packed hybrid stream.
#[derive(Debug, PartialEq, Eq)]
pub enum HybridEncoded<'a> {
    /// A bit-packed slice holding `run_length` values. Bit-packed groups
    /// are always multiples of 8 values wide.
    Bitpacked { packed: &'a [u8], run_length: usize },
    /// A single value repeated `run_length` times.
    Rle { value: u32, run_length: usize },
}

/// An iterator over the runs of an RLE/bit-packed hybrid stream.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    values: &'a [u8],
    num_bits: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(values: &'a [u8], num_bits: usize) -> Self {
        Self { values, num_bits }
    }

    /// Returns the number of bits being used by this decoder.
    #[inline]
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<HybridEncoded<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.values.is_empty() {
            return None;
        }
        let (indicator, consumed) = match uleb128::decode(self.values) {
            Ok(x) => x,
            Err(e) => {
                self.values = &[];
                return Some(Err(e));
            }
        };
        self.values = &self.values[consumed..];
        if indicator & 1 == 1 {
            // is bitpacking
            let num_groups = (indicator >> 1) as usize;
            let bytes = num_groups * self.num_bits;
            let bytes = std::cmp::min(bytes, self.values.len());
            let (packed, remaining) = self.values.split_at(bytes);
            self.values = remaining;
            Some(Ok(HybridEncoded::Bitpacked {
                packed,
                run_length: num_groups * 8,
            }))
        } else {
            // is rle
            let run_length = (indicator >> 1) as usize;
            // repeated-value := value that is repeated, using a fixed-width
            // of round-up-to-next-byte(bit-width)
            let rle_bytes = ceil8(self.num_bits);
            if rle_bytes > self.values.len() {
                self.values = &[];
                return Some(Err(Error::corrupt("rle run ends mid-stream")));
            }
            let mut bytes = [0u8; std::mem::size_of::<u32>()];
            self.values[..rle_bytes]
                .iter()
                .enumerate()
                .for_each(|(i, byte)| bytes[i] = *byte);
            let value = u32::from_le_bytes(bytes);
            self.values = &self.values[rle_bytes..];
            Some(Ok(HybridEncoded::Rle { value, run_length }))
        }
    }
}

enum State<'a> {
    Bitpacked(bitpacked::Decoder<'a, u32>),
    Rle { value: u32, length: usize },
    Finished,
}

/// Decoder of a bounded RLE/bit-packed hybrid stream, as used for levels
/// and dictionary indices. It is an iterator of `u32`.
pub struct HybridRleDecoder<'a> {
    runs: Decoder<'a>,
    state: State<'a>,
    remaining: usize,
}

impl<'a> HybridRleDecoder<'a> {
    pub fn new(values: &'a [u8], num_bits: usize, length: usize) -> Self {
        Self {
            runs: Decoder::new(values, num_bits),
            state: State::Finished,
            remaining: length,
        }
    }

    fn load_run(&mut self) -> Result<bool> {
        loop {
            match self.runs.next().transpose()? {
                Some(HybridEncoded::Bitpacked { packed, run_length }) => {
                    if run_length == 0 {
                        continue;
                    }
                    let length = std::cmp::min(run_length, self.remaining);
                    self.state = State::Bitpacked(bitpacked::Decoder::try_new(
                        packed,
                        self.runs.num_bits(),
                        length,
                    )?);
                    return Ok(true);
                }
                Some(HybridEncoded::Rle { value, run_length }) => {
                    if run_length == 0 {
                        continue;
                    }
                    self.state = State::Rle {
                        value,
                        length: run_length,
                    };
                    return Ok(true);
                }
                None => {
                    self.state = State::Finished;
                    return Ok(false);
                }
            }
        }
    }
}

impl<'a> Iterator for HybridRleDecoder<'a> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        if self.runs.num_bits() == 0 {
            self.remaining -= 1;
            return Some(Ok(0));
        }
        loop {
            let next = match &mut self.state {
                State::Finished => None,
                State::Bitpacked(decoder) => decoder.next(),
                State::Rle { value, length } => {
                    if *length == 0 {
                        None
                    } else {
                        *length -= 1;
                        Some(*value)
                    }
                }
            };
            match next {
                Some(value) => {
                    self.remaining -= 1;
                    return Some(Ok(value));
                }
                None => match self.load_run() {
                    Ok(true) => continue,
                    Ok(false) => {
                        self.remaining = 0;
                        return Some(Err(Error::corrupt(
                            "hybrid rle stream ended before all values were read",
                        )));
                    }
                    Err(e) => {
                        self.remaining = 0;
                        return Some(Err(e));
                    }
                },
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
