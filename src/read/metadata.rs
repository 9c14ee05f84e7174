use parquet_format_safe::thrift::protocol::TCompactInputProtocol;

use crate::error::{Error, Result};
use crate::metadata::FileMetaData;
use crate::{DEFAULT_MAX_HEADER_SIZE, FOOTER_SIZE, PARQUET_MAGIC, PARQUET_MAGIC_ENCRYPTED};

/// Parses file metadata from the raw footer bytes (without the trailing
/// `[len][magic]`).
pub fn deserialize_metadata(data: &[u8], max_size: usize) -> Result<FileMetaData> {
    let mut reader = data;
    let mut prot = TCompactInputProtocol::new(&mut reader, max_size);
    let metadata = parquet_format_safe::FileMetaData::read_from_in_protocol(&mut prot)?;
    FileMetaData::try_from_thrift(metadata)
}

/// Reads a file's metadata from its mapped bytes.
// Layout of Parquet file
// +---------------------------+-----+---+
// |      Rest of file         |  B  | A |
// +---------------------------+-----+---+
// where A: parquet footer (len + magic), B: parquet metadata.
pub fn read_metadata(mapping: &[u8]) -> Result<FileMetaData> {
    let len = mapping.len();
    if len < FOOTER_SIZE {
        return Err(Error::corrupt(
            "the file is smaller than the 8 byte footer",
        ));
    }

    let magic = &mapping[len - 4..];
    if magic == PARQUET_MAGIC_ENCRYPTED {
        return Err(Error::unsupported(
            "the file has an encrypted footer; decryption is not supported",
        ));
    }
    if magic != PARQUET_MAGIC {
        return Err(Error::corrupt("the file's magic is invalid"));
    }

    let metadata_len: [u8; 4] = mapping[len - 8..len - 4].try_into().unwrap();
    let metadata_len = i32::from_le_bytes(metadata_len);
    if metadata_len < 0 {
        return Err(Error::corrupt(format!(
            "the metadata length is negative ({})",
            metadata_len
        )));
    }
    let footer_len = FOOTER_SIZE + metadata_len as usize;
    if footer_len > len {
        return Err(Error::corrupt(format!(
            "the metadata length ({}) is larger than the file",
            metadata_len
        )));
    }

    deserialize_metadata(
        &mapping[len - footer_len..len - FOOTER_SIZE],
        DEFAULT_MAX_HEADER_SIZE.max(metadata_len as usize),
    )
}
