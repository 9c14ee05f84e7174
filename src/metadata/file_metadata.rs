use crate::error::{Error, Result};
use crate::schema::types::SchemaNode;

use super::{RowGroupMetaData, SchemaDescriptor};

pub type KeyValue = parquet_format_safe::KeyValue;

/// Metadata of a Parquet file.
#[derive(Debug, Clone)]
pub struct FileMetaData {
    version: i32,
    num_rows: i64,
    created_by: Option<String>,
    row_groups: Vec<RowGroupMetaData>,
    key_value_metadata: Option<Vec<KeyValue>>,
    schema_descr: SchemaDescriptor,
}

impl FileMetaData {
    /// Version of this file.
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Number of rows in the file.
    pub fn num_rows(&self) -> i64 {
        self.num_rows
    }

    /// String message for the application that wrote this file.
    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    /// The row groups of this file, in row order.
    pub fn row_groups(&self) -> &[RowGroupMetaData] {
        &self.row_groups
    }

    /// Key-value metadata of this file.
    pub fn key_value_metadata(&self) -> &Option<Vec<KeyValue>> {
        &self.key_value_metadata
    }

    /// The root schema node of this file.
    pub fn schema(&self) -> &SchemaNode {
        self.schema_descr.root()
    }

    /// Returns a reference to the schema descriptor.
    pub fn schema_descr(&self) -> &SchemaDescriptor {
        &self.schema_descr
    }

    /// Method to convert from thrift.
    pub fn try_from_thrift(metadata: parquet_format_safe::FileMetaData) -> Result<Self> {
        let root = SchemaNode::try_from_thrift(&metadata.schema)?;
        let schema_descr = SchemaDescriptor::try_new(root)?;

        let row_groups = metadata
            .row_groups
            .into_iter()
            .map(|rg| RowGroupMetaData::try_from_thrift(&schema_descr, rg))
            .collect::<Result<Vec<_>>>()?;

        let total_group_rows: i64 = row_groups.iter().map(|rg| rg.num_rows()).sum();
        if total_group_rows < metadata.num_rows {
            return Err(Error::corrupt(format!(
                "the file declares {} rows but its row groups hold {}",
                metadata.num_rows, total_group_rows
            )));
        }

        Ok(FileMetaData {
            version: metadata.version,
            num_rows: metadata.num_rows,
            created_by: metadata.created_by,
            row_groups,
            key_value_metadata: metadata.key_value_metadata,
            schema_descr,
        })
    }
}
