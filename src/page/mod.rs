mod dictionary;
pub use dictionary::Dictionary;

use std::sync::Arc;

use bytes::Bytes;

pub use parquet_format_safe::{
    DataPageHeader as DataPageHeaderV1, DataPageHeaderV2, PageHeader as ThriftPageHeader,
};

pub use crate::thrift_bridge::{DataPageHeaderExt, PageType};

use crate::compression::Compression;
use crate::encoding::Encoding;
use crate::error::Result;
use crate::metadata::ColumnDescriptor;
use crate::schema::types::PhysicalType;

#[derive(Debug, Clone)]
pub enum DataPageHeader {
    V1(DataPageHeaderV1),
    V2(DataPageHeaderV2),
}

impl DataPageHeader {
    pub fn num_values(&self) -> usize {
        match self {
            DataPageHeader::V1(d) => d.num_values as usize,
            DataPageHeader::V2(d) => d.num_values as usize,
        }
    }

    pub fn encoding(&self) -> Result<Encoding> {
        match self {
            DataPageHeader::V1(d) => d.encoding(),
            DataPageHeader::V2(d) => d.encoding(),
        }
    }
}

/// A scanned, still-compressed data page: the parsed header, a slice of
/// the file mapping with the page body as stored, and a reference to the
/// chunk's dictionary. Producing one does not decompress anything.
#[derive(Debug, Clone)]
pub struct PageInfo {
    pub(crate) header: DataPageHeader,
    pub(crate) body: Bytes,
    pub(crate) compression: Compression,
    pub(crate) uncompressed_size: usize,
    pub(crate) crc: Option<u32>,
    pub(crate) dictionary: Option<Arc<Dictionary>>,
    pub(crate) descriptor: ColumnDescriptor,
}

impl PageInfo {
    pub fn header(&self) -> &DataPageHeader {
        &self.header
    }

    pub fn num_values(&self) -> usize {
        self.header.num_values()
    }

    pub fn compressed_size(&self) -> usize {
        self.body.len()
    }

    pub fn uncompressed_size(&self) -> usize {
        self.uncompressed_size
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn dictionary(&self) -> Option<&Arc<Dictionary>> {
        self.dictionary.as_ref()
    }

    pub fn descriptor(&self) -> &ColumnDescriptor {
        &self.descriptor
    }
}

/// Dense, typed values of a decoded page or an assembled batch: one array
/// per physical type. Byte arrays are a single buffer addressed by
/// offsets; fixed-size binaries share that representation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueBatch {
    Bool(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Int96(Vec<[u32; 3]>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Binary { values: Vec<u8>, offsets: Vec<i32> },
}

impl ValueBatch {
    /// An empty batch holding values of `physical_type`.
    pub fn for_type(physical_type: PhysicalType) -> Self {
        match physical_type {
            PhysicalType::Boolean => ValueBatch::Bool(vec![]),
            PhysicalType::Int32 => ValueBatch::Int32(vec![]),
            PhysicalType::Int64 => ValueBatch::Int64(vec![]),
            PhysicalType::Int96 => ValueBatch::Int96(vec![]),
            PhysicalType::Float => ValueBatch::Float(vec![]),
            PhysicalType::Double => ValueBatch::Double(vec![]),
            PhysicalType::ByteArray | PhysicalType::FixedLenByteArray(_) => ValueBatch::Binary {
                values: vec![],
                offsets: vec![0],
            },
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ValueBatch::Bool(v) => v.len(),
            ValueBatch::Int32(v) => v.len(),
            ValueBatch::Int64(v) => v.len(),
            ValueBatch::Int96(v) => v.len(),
            ValueBatch::Float(v) => v.len(),
            ValueBatch::Double(v) => v.len(),
            ValueBatch::Binary { offsets, .. } => offsets.len() - 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        match self {
            ValueBatch::Bool(v) => v.clear(),
            ValueBatch::Int32(v) => v.clear(),
            ValueBatch::Int64(v) => v.clear(),
            ValueBatch::Int96(v) => v.clear(),
            ValueBatch::Float(v) => v.clear(),
            ValueBatch::Double(v) => v.clear(),
            ValueBatch::Binary { values, offsets } => {
                values.clear();
                offsets.clear();
                offsets.push(0);
            }
        }
    }

    /// Appends a default-valued slot, used for null positions of flat
    /// batches.
    pub fn push_default(&mut self) {
        match self {
            ValueBatch::Bool(v) => v.push(false),
            ValueBatch::Int32(v) => v.push(0),
            ValueBatch::Int64(v) => v.push(0),
            ValueBatch::Int96(v) => v.push([0; 3]),
            ValueBatch::Float(v) => v.push(0.0),
            ValueBatch::Double(v) => v.push(0.0),
            ValueBatch::Binary { offsets, .. } => offsets.push(*offsets.last().unwrap()),
        }
    }

    /// Appends the `index`-th value of `src`, which must hold the same
    /// physical type.
    pub fn push_from(&mut self, src: &ValueBatch, index: usize) {
        match (self, src) {
            (ValueBatch::Bool(dst), ValueBatch::Bool(src)) => dst.push(src[index]),
            (ValueBatch::Int32(dst), ValueBatch::Int32(src)) => dst.push(src[index]),
            (ValueBatch::Int64(dst), ValueBatch::Int64(src)) => dst.push(src[index]),
            (ValueBatch::Int96(dst), ValueBatch::Int96(src)) => dst.push(src[index]),
            (ValueBatch::Float(dst), ValueBatch::Float(src)) => dst.push(src[index]),
            (ValueBatch::Double(dst), ValueBatch::Double(src)) => dst.push(src[index]),
            (
                ValueBatch::Binary { values, offsets },
                ValueBatch::Binary {
                    values: src_values,
                    offsets: src_offsets,
                },
            ) => {
                let start = src_offsets[index] as usize;
                let end = src_offsets[index + 1] as usize;
                values.extend_from_slice(&src_values[start..end]);
                offsets.push(values.len() as i32);
            }
            _ => unreachable!("batches of one column share a physical type"),
        }
    }

    /// Appends all values of `other`, which must hold the same physical
    /// type.
    pub fn append(&mut self, other: ValueBatch) {
        match (self, other) {
            (ValueBatch::Bool(dst), ValueBatch::Bool(mut src)) => dst.append(&mut src),
            (ValueBatch::Int32(dst), ValueBatch::Int32(mut src)) => dst.append(&mut src),
            (ValueBatch::Int64(dst), ValueBatch::Int64(mut src)) => dst.append(&mut src),
            (ValueBatch::Int96(dst), ValueBatch::Int96(mut src)) => dst.append(&mut src),
            (ValueBatch::Float(dst), ValueBatch::Float(mut src)) => dst.append(&mut src),
            (ValueBatch::Double(dst), ValueBatch::Double(mut src)) => dst.append(&mut src),
            (
                ValueBatch::Binary { values, offsets },
                ValueBatch::Binary {
                    values: src_values,
                    offsets: src_offsets,
                },
            ) => {
                let base = values.len() as i32;
                values.extend_from_slice(&src_values);
                offsets.extend(src_offsets[1..].iter().map(|offset| base + offset));
            }
            _ => unreachable!("batches of one column share a physical type"),
        }
    }

    /// Removes and returns the first `n` values.
    pub fn take_front(&mut self, n: usize) -> ValueBatch {
        match self {
            ValueBatch::Bool(v) => ValueBatch::Bool(v.drain(..n).collect()),
            ValueBatch::Int32(v) => ValueBatch::Int32(v.drain(..n).collect()),
            ValueBatch::Int64(v) => ValueBatch::Int64(v.drain(..n).collect()),
            ValueBatch::Int96(v) => ValueBatch::Int96(v.drain(..n).collect()),
            ValueBatch::Float(v) => ValueBatch::Float(v.drain(..n).collect()),
            ValueBatch::Double(v) => ValueBatch::Double(v.drain(..n).collect()),
            ValueBatch::Binary { values, offsets } => {
                let boundary = offsets[n] as usize;
                let head_values = values.drain(..boundary).collect();
                let mut head_offsets: Vec<i32> = offsets.drain(..n).collect();
                head_offsets.push(boundary as i32);
                // rebase what remains
                for offset in offsets.iter_mut() {
                    *offset -= boundary as i32;
                }
                ValueBatch::Binary {
                    values: head_values,
                    offsets: head_offsets,
                }
            }
        }
    }

    /// The `index`-th byte-array value. `None` for non-binary batches.
    pub fn binary_value(&self, index: usize) -> Option<&[u8]> {
        match self {
            ValueBatch::Binary { values, offsets } => {
                Some(&values[offsets[index] as usize..offsets[index + 1] as usize])
            }
            _ => None,
        }
    }
}

/// A fully decoded data page: levels plus dense values. Values hold only
/// the present positions; `def` identifies where the holes are.
#[derive(Debug, Clone)]
pub struct DecodedPage {
    /// Repetition levels, empty when the column's max repetition level is 0.
    pub rep: Vec<u16>,
    /// Definition levels, empty when the column's max definition level is 0.
    pub def: Vec<u16>,
    /// Dense values of the present positions.
    pub values: ValueBatch,
    /// Number of level slots (present and null) in this page.
    pub num_values: usize,
    /// For v2 pages, the number of rows (count of zero repetition levels).
    pub num_rows: Option<usize>,
}
