// the single allowed exception is the read-only file mapping
#![deny(unsafe_code)]
//! Reader of rows from Parquet files.
//!
//! This crate materializes records - flat and nested - from the per-column
//! page streams of a Parquet file. It scans column chunks into pages,
//! decodes pages in parallel on a shared worker pool, assembles decoded
//! values into batches of whole records, and reconstructs nested structs,
//! lists and maps from definition and repetition levels.

pub mod compression;
pub mod encoding;
pub mod error;
pub mod metadata;
pub mod page;
pub mod read;
pub mod record;
pub mod schema;
mod thrift_bridge;
pub mod types;

const FOOTER_SIZE: usize = 8;
const PARQUET_MAGIC: [u8; 4] = [b'P', b'A', b'R', b'1'];
const PARQUET_MAGIC_ENCRYPTED: [u8; 4] = [b'P', b'A', b'R', b'E'];

/// The maximum number of bytes the thrift deserializer is allowed to
/// allocate while reading a footer or a page header.
const DEFAULT_MAX_HEADER_SIZE: usize = 1024 * 1024;
