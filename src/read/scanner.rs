use std::sync::Arc;

use bytes::Bytes;
use parquet_format_safe::thrift::protocol::TCompactInputProtocol;
use parquet_format_safe::PageHeader as ThriftPageHeader;

use crate::compression::CodecRegistry;
use crate::error::{Error, Result};
use crate::metadata::ColumnChunkMetaData;
use crate::page::{DataPageHeader, Dictionary, PageInfo, PageType};
use crate::DEFAULT_MAX_HEADER_SIZE;

/// Reads one page header from a streaming byte cursor, reporting the
/// number of bytes consumed through the advance of `reader`.
pub(crate) fn read_page_header(
    reader: &mut &[u8],
    max_size: usize,
) -> Result<ThriftPageHeader> {
    let mut prot = TCompactInputProtocol::new(reader, max_size);
    let page_header = ThriftPageHeader::read_from_in_protocol(&mut prot)?;
    Ok(page_header)
}

/// Walks the byte range of one column chunk and returns one [`PageInfo`]
/// per data page, all sharing the eagerly decoded dictionary. Data page
/// bytes are referenced by slices of `chunk`, not copied, and are not
/// decompressed here.
///
/// Scanning stops once the declared number of values has been seen; extra
/// trailing bytes after the last page are tolerated.
pub fn scan_column_chunk(
    chunk: Bytes,
    column: &ColumnChunkMetaData,
    codecs: &CodecRegistry,
) -> Result<Vec<PageInfo>> {
    let descriptor = column.descriptor();
    let compression = column.compression();
    let total_values = column.num_values();

    let context = |message: String, offset: usize| {
        Error::Corrupt(format!(
            "column {} at chunk offset {} ({:?}): {}",
            descriptor.path_string(),
            offset,
            compression,
            message
        ))
    };

    let mut pages = vec![];
    let mut dictionary: Option<Arc<Dictionary>> = None;
    let mut seen_values: i64 = 0;
    let mut offset = 0usize;

    while seen_values < total_values && offset < chunk.len() {
        let mut reader = &chunk[offset..];
        let before = reader.len();
        let header = read_page_header(&mut reader, DEFAULT_MAX_HEADER_SIZE)
            .map_err(|e| context(format!("cannot parse page header: {}", e), offset))?;
        let header_size = before - reader.len();
        let body_offset = offset + header_size;

        if header.compressed_page_size < 0 || header.uncompressed_page_size < 0 {
            return Err(context("the page declares a negative size".to_string(), offset));
        }
        let body_len = header.compressed_page_size as usize;
        if body_offset + body_len > chunk.len() {
            return Err(context(
                format!(
                    "the page body ({} bytes) runs past the end of the chunk",
                    body_len
                ),
                offset,
            ));
        }
        let body = chunk.slice(body_offset..body_offset + body_len);
        offset = body_offset + body_len;

        let type_: PageType = header.type_.try_into()?;
        match type_ {
            PageType::DictionaryPage => {
                let dict_header = header.dictionary_page_header.as_ref().ok_or_else(|| {
                    context("dictionary page without dictionary header".to_string(), offset)
                })?;
                let num_values: usize = dict_header.num_values.try_into().map_err(|_| {
                    context("dictionary declares a negative value count".to_string(), offset)
                })?;
                let uncompressed = codecs
                    .decompress(compression, &body, header.uncompressed_page_size as usize)
                    .map_err(|e| context(format!("cannot decompress dictionary: {}", e), offset))?;
                let dict = Dictionary::read(&uncompressed, num_values, descriptor.physical_type())
                    .map_err(|e| context(format!("cannot decode dictionary: {}", e), offset))?;
                dictionary = Some(Arc::new(dict));
            }
            PageType::DataPage => {
                let data_header = header.data_page_header.ok_or_else(|| {
                    context("data page without v1 header".to_string(), offset)
                })?;
                seen_values += data_header.num_values as i64;
                pages.push(PageInfo {
                    header: DataPageHeader::V1(data_header),
                    body,
                    compression,
                    uncompressed_size: header.uncompressed_page_size as usize,
                    crc: header.crc.map(|crc| crc as u32),
                    dictionary: dictionary.clone(),
                    descriptor: descriptor.clone(),
                });
            }
            PageType::DataPageV2 => {
                let data_header = header.data_page_header_v2.ok_or_else(|| {
                    context("data page without v2 header".to_string(), offset)
                })?;
                seen_values += data_header.num_values as i64;
                pages.push(PageInfo {
                    header: DataPageHeader::V2(data_header),
                    body,
                    compression,
                    uncompressed_size: header.uncompressed_page_size as usize,
                    crc: header.crc.map(|crc| crc as u32),
                    dictionary: dictionary.clone(),
                    descriptor: descriptor.clone(),
                });
            }
            // not produced by supported writers; skipped like trailing bytes
            PageType::IndexPage => {}
        }
    }

    Ok(pages)
}
