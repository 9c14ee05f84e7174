use parquet_format_safe::{ColumnChunk, ColumnMetaData};

use crate::compression::Compression;
use crate::error::{Error, Result};
use crate::thrift_bridge::Encoding;

use super::column_descriptor::ColumnDescriptor;

/// Metadata of a column chunk: the thrift struct together with the
/// [`ColumnDescriptor`], so that consumers have access to levels and
/// physical type without re-walking the schema.
#[derive(Debug, Clone)]
pub struct ColumnChunkMetaData {
    column_chunk: ColumnChunk,
    column_descr: ColumnDescriptor,
    compression: Compression,
}

impl ColumnChunkMetaData {
    /// Method to convert from thrift.
    pub fn try_from_thrift(
        column_descr: ColumnDescriptor,
        column_chunk: ColumnChunk,
    ) -> Result<Self> {
        let metadata = column_chunk.meta_data.as_ref().ok_or_else(|| {
            Error::corrupt(format!(
                "column chunk of {} has no metadata",
                column_descr.path_string()
            ))
        })?;
        let compression = metadata.codec.try_into()?;
        Ok(Self {
            column_chunk,
            column_descr,
            compression,
        })
    }

    fn column_metadata(&self) -> &ColumnMetaData {
        // presence was validated in `try_from_thrift`.
        self.column_chunk.meta_data.as_ref().unwrap()
    }

    /// Descriptor of this column.
    pub fn descriptor(&self) -> &ColumnDescriptor {
        &self.column_descr
    }

    /// Total number of values (including nulls) in this column chunk.
    pub fn num_values(&self) -> i64 {
        self.column_metadata().num_values
    }

    /// Compression codec of this column chunk.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Returns the total compressed size of this column chunk.
    pub fn compressed_size(&self) -> i64 {
        self.column_metadata().total_compressed_size
    }

    /// Returns the total uncompressed size of this column chunk.
    pub fn uncompressed_size(&self) -> i64 {
        self.column_metadata().total_uncompressed_size
    }

    /// Returns the offset of the first data page.
    pub fn data_page_offset(&self) -> i64 {
        self.column_metadata().data_page_offset
    }

    /// Returns the offset of the dictionary page, if any.
    pub fn dictionary_page_offset(&self) -> Option<i64> {
        self.column_metadata().dictionary_page_offset
    }

    /// The set of encodings used by pages of this chunk.
    pub fn encodings(&self) -> Result<Vec<Encoding>> {
        self.column_metadata()
            .encodings
            .iter()
            .map(|encoding| (*encoding).try_into())
            .collect()
    }

    /// Returns the offset and length in bytes of this column chunk within
    /// the file: from the dictionary page (or first data page) to the end
    /// of the chunk.
    pub fn byte_range(&self) -> Result<(u64, u64)> {
        let start = self
            .dictionary_page_offset()
            .unwrap_or_else(|| self.data_page_offset());
        let length = self.compressed_size();
        if start < 0 || length < 0 {
            return Err(Error::corrupt(format!(
                "column chunk of {} has a negative offset or length",
                self.column_descr.path_string()
            )));
        }
        Ok((start as u64, length as u64))
    }
}
