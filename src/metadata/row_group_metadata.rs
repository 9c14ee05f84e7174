use parquet_format_safe::RowGroup;

use crate::error::{Error, Result};

use super::{ColumnChunkMetaData, SchemaDescriptor};

/// Metadata of a row group: one column chunk per leaf column, covering the
/// same contiguous slice of rows.
#[derive(Debug, Clone)]
pub struct RowGroupMetaData {
    columns: Vec<ColumnChunkMetaData>,
    num_rows: i64,
    total_byte_size: i64,
}

impl RowGroupMetaData {
    /// Number of rows in this row group.
    pub fn num_rows(&self) -> i64 {
        self.num_rows
    }

    /// Total byte size of all uncompressed column data in this row group.
    pub fn total_byte_size(&self) -> i64 {
        self.total_byte_size
    }

    /// The column chunks of this row group, in leaf order.
    pub fn columns(&self) -> &[ColumnChunkMetaData] {
        &self.columns
    }

    /// Method to convert from thrift.
    pub fn try_from_thrift(schema_descr: &SchemaDescriptor, rg: RowGroup) -> Result<Self> {
        if schema_descr.num_columns() != rg.columns.len() {
            return Err(Error::corrupt(format!(
                "a row group has {} column chunks but the schema has {} leaves",
                rg.columns.len(),
                schema_descr.num_columns()
            )));
        }
        let columns = rg
            .columns
            .into_iter()
            .zip(schema_descr.columns())
            .map(|(column_chunk, descriptor)| {
                ColumnChunkMetaData::try_from_thrift(descriptor.clone(), column_chunk)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            columns,
            num_rows: rg.num_rows,
            total_byte_size: rg.total_byte_size,
        })
    }
}
