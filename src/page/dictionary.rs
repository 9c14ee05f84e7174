use crate::encoding::plain::BinaryIter;
use crate::error::{Error, Result};
use crate::schema::types::PhysicalType;
use crate::types::{decode, NativeType};

use super::ValueBatch;

/// A decompressed and decoded dictionary page: an ordered array of typed
/// values keyed by small integer index. Parsed once per column chunk and
/// shared by reference across that chunk's data pages.
#[derive(Debug, Clone, PartialEq)]
pub enum Dictionary {
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Int96(Vec<[u32; 3]>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Binary { values: Vec<u8>, offsets: Vec<i32> },
}

fn read_plain_fixed<T: NativeType>(buf: &[u8], num_values: usize) -> Result<Vec<T>> {
    let size = std::mem::size_of::<T>();
    if buf.len() < num_values * size {
        return Err(Error::corrupt("dictionary page ends mid-stream"));
    }
    Ok(buf[..num_values * size]
        .chunks_exact(size)
        .map(decode)
        .collect())
}

fn read_plain_binary(buf: &[u8], num_values: usize) -> Result<(Vec<u8>, Vec<i32>)> {
    let mut values = Vec::new();
    let mut offsets = Vec::with_capacity(num_values + 1);
    offsets.push(0i32);
    for value in BinaryIter::new(buf, num_values) {
        values.extend_from_slice(value?);
        offsets.push(values.len() as i32);
    }
    Ok((values, offsets))
}

impl Dictionary {
    /// Parses an uncompressed dictionary page of `num_values` entries,
    /// stored in `PLAIN` under the column's physical type.
    pub fn read(buf: &[u8], num_values: usize, physical_type: PhysicalType) -> Result<Self> {
        Ok(match physical_type {
            PhysicalType::Boolean => {
                return Err(Error::corrupt(
                    "boolean columns cannot be dictionary-encoded",
                ))
            }
            PhysicalType::Int32 => Dictionary::Int32(read_plain_fixed(buf, num_values)?),
            PhysicalType::Int64 => Dictionary::Int64(read_plain_fixed(buf, num_values)?),
            PhysicalType::Int96 => Dictionary::Int96(read_plain_fixed(buf, num_values)?),
            PhysicalType::Float => Dictionary::Float(read_plain_fixed(buf, num_values)?),
            PhysicalType::Double => Dictionary::Double(read_plain_fixed(buf, num_values)?),
            PhysicalType::ByteArray => {
                let (values, offsets) = read_plain_binary(buf, num_values)?;
                Dictionary::Binary { values, offsets }
            }
            PhysicalType::FixedLenByteArray(size) => {
                if buf.len() < num_values * size {
                    return Err(Error::corrupt("dictionary page ends mid-stream"));
                }
                let values = buf[..num_values * size].to_vec();
                let offsets = (0..=num_values).map(|i| (i * size) as i32).collect();
                Dictionary::Binary { values, offsets }
            }
        })
    }

    pub fn len(&self) -> usize {
        match self {
            Dictionary::Int32(v) => v.len(),
            Dictionary::Int64(v) => v.len(),
            Dictionary::Int96(v) => v.len(),
            Dictionary::Float(v) => v.len(),
            Dictionary::Double(v) => v.len(),
            Dictionary::Binary { offsets, .. } => offsets.len() - 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves `indices` into a dense [`ValueBatch`]. Every index must be
    /// below the dictionary length.
    pub fn gather(&self, indices: &[u32]) -> Result<ValueBatch> {
        let len = self.len();
        if let Some(out_of_range) = indices.iter().find(|index| **index as usize >= len) {
            return Err(Error::corrupt(format!(
                "dictionary index {} is out of range of the {} dictionary entries",
                out_of_range, len
            )));
        }
        Ok(match self {
            Dictionary::Int32(v) => {
                ValueBatch::Int32(indices.iter().map(|i| v[*i as usize]).collect())
            }
            Dictionary::Int64(v) => {
                ValueBatch::Int64(indices.iter().map(|i| v[*i as usize]).collect())
            }
            Dictionary::Int96(v) => {
                ValueBatch::Int96(indices.iter().map(|i| v[*i as usize]).collect())
            }
            Dictionary::Float(v) => {
                ValueBatch::Float(indices.iter().map(|i| v[*i as usize]).collect())
            }
            Dictionary::Double(v) => {
                ValueBatch::Double(indices.iter().map(|i| v[*i as usize]).collect())
            }
            Dictionary::Binary { values, offsets } => {
                let mut out_values = Vec::new();
                let mut out_offsets = Vec::with_capacity(indices.len() + 1);
                out_offsets.push(0i32);
                for index in indices {
                    let index = *index as usize;
                    let start = offsets[index] as usize;
                    let end = offsets[index + 1] as usize;
                    out_values.extend_from_slice(&values[start..end]);
                    out_offsets.push(out_values.len() as i32);
                }
                ValueBatch::Binary {
                    values: out_values,
                    offsets: out_offsets,
                }
            }
        })
    }
}
