//! An in-memory Parquet file builder used by the integration tests: it
//! serializes pages and footers through the thrift output protocol, so the
//! reader is exercised against independently constructed bytes.

use parquet_format_safe::thrift::protocol::{TCompactOutputProtocol, TOutputProtocol};
use parquet_format_safe::{
    ColumnChunk, ColumnMetaData, CompressionCodec, ConvertedType, DataPageHeader,
    DataPageHeaderV2, DictionaryPageHeader, Encoding, FieldRepetitionType, FileMetaData,
    PageHeader, PageType, RowGroup, SchemaElement, Type,
};

pub fn leb128(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Encodes levels as RLE runs of the RLE/bit-packed hybrid.
pub fn hybrid_rle(values: &[u16], bit_width: usize) -> Vec<u8> {
    let rle_bytes = bit_width.div_ceil(8);
    let mut out = vec![];
    let mut i = 0;
    while i < values.len() {
        let value = values[i];
        let mut run = 1;
        while i + run < values.len() && values[i + run] == value {
            run += 1;
        }
        leb128((run as u64) << 1, &mut out);
        out.extend_from_slice(&(value as u32).to_le_bytes()[..rle_bytes]);
        i += run;
    }
    out
}

pub fn bit_width(max_level: i16) -> usize {
    (64 - (max_level as u64).leading_zeros()) as usize
}

pub fn plain_i32(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn plain_i64(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn plain_f64(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn plain_strings(values: &[&str]) -> Vec<u8> {
    let mut out = vec![];
    for value in values {
        out.extend_from_slice(&(value.len() as u32).to_le_bytes());
        out.extend_from_slice(value.as_bytes());
    }
    out
}

/// The values section of a dictionary-encoded page: one bit-width byte,
/// then indices in the hybrid encoding.
pub fn dict_indices(indices: &[u16], width: usize) -> Vec<u8> {
    let mut out = vec![width as u8];
    out.extend(hybrid_rle(indices, width));
    out
}

pub struct PageSpec {
    pub rep: Vec<u16>,
    pub def: Vec<u16>,
    pub values: Vec<u8>,
    pub num_values: i32,
    pub encoding: Encoding,
    pub with_crc: bool,
    /// When set, the page is written as `DATA_PAGE_V2` with these
    /// `(num_nulls, num_rows)`.
    pub v2: Option<(i32, i32)>,
}

impl PageSpec {
    pub fn plain(rep: Vec<u16>, def: Vec<u16>, values: Vec<u8>, num_values: i32) -> Self {
        Self {
            rep,
            def,
            values,
            num_values,
            encoding: Encoding::PLAIN,
            with_crc: false,
            v2: None,
        }
    }
}

pub struct ColumnSpec {
    pub type_: Type,
    pub path: Vec<String>,
    pub max_def: i16,
    pub max_rep: i16,
    pub pages: Vec<PageSpec>,
    /// `PLAIN`-encoded dictionary payload.
    pub dictionary: Option<(Vec<u8>, i32)>,
    pub encodings: Vec<Encoding>,
    pub codec: CompressionCodec,
}

impl ColumnSpec {
    pub fn flat(type_: Type, name: &str, max_def: i16, pages: Vec<PageSpec>) -> Self {
        Self {
            type_,
            path: vec![name.to_string()],
            max_def,
            max_rep: 0,
            pages,
            dictionary: None,
            encodings: vec![Encoding::PLAIN, Encoding::RLE],
            codec: CompressionCodec::UNCOMPRESSED,
        }
    }

    pub fn nested(type_: Type, path: &[&str], max_def: i16, max_rep: i16, pages: Vec<PageSpec>) -> Self {
        Self {
            type_,
            path: path.iter().map(|p| p.to_string()).collect(),
            max_def,
            max_rep,
            pages,
            dictionary: None,
            encodings: vec![Encoding::PLAIN, Encoding::RLE],
            codec: CompressionCodec::UNCOMPRESSED,
        }
    }
}

fn maybe_compress(codec: CompressionCodec, payload: &[u8]) -> Vec<u8> {
    match codec {
        CompressionCodec::SNAPPY => snap::raw::Encoder::new().compress_vec(payload).unwrap(),
        _ => payload.to_vec(),
    }
}

fn write_thrift<T: Fn(&mut TCompactOutputProtocol<&mut Vec<u8>>) -> parquet_format_safe::thrift::Result<usize>>(
    out: &mut Vec<u8>,
    write: T,
) {
    let mut protocol = TCompactOutputProtocol::new(out);
    write(&mut protocol).unwrap();
    protocol.flush().unwrap();
}

/// Serializes a complete single-row-group file.
pub fn build_file(schema: Vec<SchemaElement>, columns: Vec<ColumnSpec>, num_rows: i64) -> Vec<u8> {
    let mut out = b"PAR1".to_vec();

    let mut chunks = vec![];
    for column in &columns {
        let chunk_start = out.len() as i64;
        let mut dictionary_page_offset = None;

        if let Some((payload, dict_values)) = &column.dictionary {
            dictionary_page_offset = Some(chunk_start);
            let stored = maybe_compress(column.codec, payload);
            let header = PageHeader {
                type_: PageType::DICTIONARY_PAGE,
                uncompressed_page_size: payload.len() as i32,
                compressed_page_size: stored.len() as i32,
                crc: None,
                data_page_header: None,
                index_page_header: None,
                dictionary_page_header: Some(DictionaryPageHeader {
                    num_values: *dict_values,
                    encoding: Encoding::PLAIN,
                    is_sorted: None,
                }),
                data_page_header_v2: None,
            };
            write_thrift(&mut out, |protocol| header.write_to_out_protocol(protocol));
            out.extend_from_slice(&stored);
        }

        let data_page_offset = out.len() as i64;
        let mut num_values = 0i64;
        for page in &column.pages {
            if let Some((num_nulls, num_rows)) = page.v2 {
                // v2: level sections are never compressed and carry no
                // length prefix; this builder leaves the values raw too
                let rep_levels = if column.max_rep > 0 {
                    hybrid_rle(&page.rep, bit_width(column.max_rep))
                } else {
                    vec![]
                };
                let def_levels = if column.max_def > 0 {
                    hybrid_rle(&page.def, bit_width(column.max_def))
                } else {
                    vec![]
                };
                let mut payload = rep_levels.clone();
                payload.extend_from_slice(&def_levels);
                payload.extend_from_slice(&page.values);

                let header = PageHeader {
                    type_: PageType::DATA_PAGE_V2,
                    uncompressed_page_size: payload.len() as i32,
                    compressed_page_size: payload.len() as i32,
                    crc: page.with_crc.then(|| crc32fast::hash(&payload) as i32),
                    data_page_header: None,
                    index_page_header: None,
                    dictionary_page_header: None,
                    data_page_header_v2: Some(DataPageHeaderV2 {
                        num_values: page.num_values,
                        num_nulls,
                        num_rows,
                        encoding: page.encoding,
                        definition_levels_byte_length: def_levels.len() as i32,
                        repetition_levels_byte_length: rep_levels.len() as i32,
                        is_compressed: Some(false),
                        statistics: None,
                    }),
                };
                write_thrift(&mut out, |protocol| header.write_to_out_protocol(protocol));
                out.extend_from_slice(&payload);
            } else {
                let mut payload = vec![];
                if column.max_rep > 0 {
                    let levels = hybrid_rle(&page.rep, bit_width(column.max_rep));
                    payload.extend_from_slice(&(levels.len() as u32).to_le_bytes());
                    payload.extend_from_slice(&levels);
                }
                if column.max_def > 0 {
                    let levels = hybrid_rle(&page.def, bit_width(column.max_def));
                    payload.extend_from_slice(&(levels.len() as u32).to_le_bytes());
                    payload.extend_from_slice(&levels);
                }
                payload.extend_from_slice(&page.values);
                let stored = maybe_compress(column.codec, &payload);

                let header = PageHeader {
                    type_: PageType::DATA_PAGE,
                    uncompressed_page_size: payload.len() as i32,
                    compressed_page_size: stored.len() as i32,
                    crc: page.with_crc.then(|| crc32fast::hash(&stored) as i32),
                    data_page_header: Some(DataPageHeader {
                        num_values: page.num_values,
                        encoding: page.encoding,
                        definition_level_encoding: Encoding::RLE,
                        repetition_level_encoding: Encoding::RLE,
                        statistics: None,
                    }),
                    index_page_header: None,
                    dictionary_page_header: None,
                    data_page_header_v2: None,
                };
                write_thrift(&mut out, |protocol| header.write_to_out_protocol(protocol));
                out.extend_from_slice(&stored);
            }
            num_values += page.num_values as i64;
        }

        let total_compressed_size = out.len() as i64 - chunk_start;
        chunks.push(ColumnChunk {
            file_path: None,
            file_offset: chunk_start + total_compressed_size,
            meta_data: Some(ColumnMetaData {
                type_: column.type_,
                encodings: column.encodings.clone(),
                path_in_schema: column.path.clone(),
                codec: column.codec,
                num_values,
                total_uncompressed_size: total_compressed_size,
                total_compressed_size,
                key_value_metadata: None,
                data_page_offset,
                index_page_offset: None,
                dictionary_page_offset,
                statistics: None,
                encoding_stats: None,
                bloom_filter_offset: None,
            }),
            offset_index_offset: None,
            offset_index_length: None,
            column_index_offset: None,
            column_index_length: None,
            crypto_metadata: None,
            encrypted_column_metadata: None,
        });
    }

    let row_group = RowGroup {
        columns: chunks,
        total_byte_size: out.len() as i64 - 4,
        num_rows,
        sorting_columns: None,
        file_offset: None,
        total_compressed_size: None,
        ordinal: None,
    };

    let metadata = FileMetaData {
        version: 1,
        schema,
        num_rows,
        row_groups: vec![row_group],
        key_value_metadata: None,
        created_by: Some("parquet-rows test builder".to_string()),
        column_orders: None,
        encryption_algorithm: None,
        footer_signing_key_metadata: None,
    };

    let before = out.len();
    write_thrift(&mut out, |protocol| metadata.write_to_out_protocol(protocol));
    let metadata_len = (out.len() - before) as i32;
    out.extend_from_slice(&metadata_len.to_le_bytes());
    out.extend_from_slice(b"PAR1");
    out
}

// schema element helpers

pub fn root(name: &str, num_children: i32) -> SchemaElement {
    SchemaElement {
        type_: None,
        type_length: None,
        repetition_type: None,
        name: name.to_string(),
        num_children: Some(num_children),
        converted_type: None,
        scale: None,
        precision: None,
        field_id: None,
        logical_type: None,
    }
}

pub fn group(name: &str, repetition: FieldRepetitionType, num_children: i32) -> SchemaElement {
    SchemaElement {
        type_: None,
        type_length: None,
        repetition_type: Some(repetition),
        name: name.to_string(),
        num_children: Some(num_children),
        converted_type: None,
        scale: None,
        precision: None,
        field_id: None,
        logical_type: None,
    }
}

pub fn group_converted(
    name: &str,
    repetition: FieldRepetitionType,
    num_children: i32,
    converted: ConvertedType,
) -> SchemaElement {
    SchemaElement {
        converted_type: Some(converted),
        ..group(name, repetition, num_children)
    }
}

pub fn leaf(name: &str, repetition: FieldRepetitionType, type_: Type) -> SchemaElement {
    SchemaElement {
        type_: Some(type_),
        type_length: None,
        repetition_type: Some(repetition),
        name: name.to_string(),
        num_children: None,
        converted_type: None,
        scale: None,
        precision: None,
        field_id: None,
        logical_type: None,
    }
}

pub fn utf8_leaf(name: &str, repetition: FieldRepetitionType) -> SchemaElement {
    SchemaElement {
        converted_type: Some(ConvertedType::UTF8),
        ..leaf(name, repetition, Type::BYTE_ARRAY)
    }
}
