use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use bytes::Bytes;
use parquet_format_safe::{CompressionCodec, FieldRepetitionType, Type};
use rand::Rng;

use parquet_rows::compression::CodecRegistry;
use parquet_rows::error::Error;
use parquet_rows::read::{read_metadata, scan_column_chunk, PageCursor};

use super::build::*;
use super::read_flat::open;

const OPTIONAL: FieldRepetitionType = FieldRepetitionType::OPTIONAL;
const REQUIRED: FieldRepetitionType = FieldRepetitionType::REQUIRED;

fn many_pages_file(pages: usize) -> Vec<u8> {
    let schema = vec![root("schema", 1), leaf("x", REQUIRED, Type::INT32)];
    let columns = vec![ColumnSpec::flat(
        Type::INT32,
        "x",
        0,
        (0..pages)
            .map(|i| PageSpec::plain(vec![], vec![], plain_i32(&[i as i32]), 1))
            .collect(),
    )];
    build_file(schema, columns, pages as i64)
}

#[test]
fn cursor_joins_pages_in_file_order() {
    let data = many_pages_file(20);
    let mapping = Bytes::from(data);
    let metadata = read_metadata(&mapping).unwrap();
    let column = &metadata.row_groups()[0].columns()[0];
    let (start, length) = column.byte_range().unwrap();
    let chunk = mapping.slice(start as usize..(start + length) as usize);

    let codecs = Arc::new(CodecRegistry::new());
    let pages = scan_column_chunk(chunk, column, &codecs).unwrap();
    assert_eq!(pages.len(), 20);
    // scanning does not decompress: the slices are still as stored
    assert!(pages.iter().all(|page| page.compressed_size() > 0));

    let pool = Arc::new(
        rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap(),
    );
    let mut cursor = PageCursor::new(pages, pool, codecs, Arc::new(AtomicBool::new(false)));

    let mut decoded = vec![];
    while let Some(page) = cursor.next_page().unwrap() {
        match page.values {
            parquet_rows::page::ValueBatch::Int32(values) => decoded.extend(values),
            _ => unreachable!(),
        }
    }
    // pages arrive in file order regardless of decode completion order
    assert_eq!(decoded, (0..20).collect::<Vec<_>>());
}

#[test]
fn prefetch_depth_grows_with_misses_up_to_the_cap() {
    let data = many_pages_file(40);
    let mapping = Bytes::from(data);
    let metadata = read_metadata(&mapping).unwrap();
    let column = &metadata.row_groups()[0].columns()[0];
    let (start, length) = column.byte_range().unwrap();
    let chunk = mapping.slice(start as usize..(start + length) as usize);

    let codecs = Arc::new(CodecRegistry::new());
    let pages = scan_column_chunk(chunk, column, &codecs).unwrap();
    let pool = Arc::new(
        rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap(),
    );
    let mut cursor = PageCursor::new(pages, pool, codecs, Arc::new(AtomicBool::new(false)));

    while cursor.next_page().unwrap().is_some() {}

    // the depth starts at 4, never exceeds the cap of 8, and each growth
    // step was caused by at least one miss
    assert!(cursor.target_depth() >= 4);
    assert!(cursor.target_depth() <= 8);
    assert!(cursor.target_depth() - 4 <= cursor.misses());
}

#[test]
fn levels_above_the_maximum_are_corrupt() {
    let schema = vec![root("schema", 1), leaf("x", OPTIONAL, Type::INT32)];
    // a definition level of 3 on a column whose maximum is 1
    let columns = vec![ColumnSpec::flat(
        Type::INT32,
        "x",
        1,
        vec![PageSpec::plain(vec![], vec![1, 3, 1], plain_i32(&[1, 2, 3]), 3)],
    )];
    let reader = open(build_file(schema, columns, 3));
    let mut rows = reader.row_reader(None).unwrap();
    assert!(matches!(rows.next(), Err(Error::Corrupt(_))));
}

#[test]
fn sibling_columns_disagreeing_on_record_count_are_corrupt() {
    let schema = vec![
        root("schema", 1),
        group("s", OPTIONAL, 2),
        leaf("a", OPTIONAL, Type::INT32),
        leaf("b", OPTIONAL, Type::INT32),
    ];
    let columns = vec![
        ColumnSpec::nested(
            Type::INT32,
            &["s", "a"],
            2,
            0,
            vec![PageSpec::plain(vec![], vec![2, 2, 2], plain_i32(&[1, 2, 3]), 3)],
        ),
        ColumnSpec::nested(
            Type::INT32,
            &["s", "b"],
            2,
            0,
            vec![PageSpec::plain(vec![], vec![2, 2], plain_i32(&[4, 5]), 2)],
        ),
    ];
    let reader = open(build_file(schema, columns, 3));
    let mut rows = reader.row_reader(None).unwrap();
    assert!(matches!(rows.next(), Err(Error::Corrupt(_))));
}

#[test]
fn lzo_column_is_unsupported() {
    let schema = vec![root("schema", 1), leaf("x", REQUIRED, Type::INT32)];
    let mut column = ColumnSpec::flat(
        Type::INT32,
        "x",
        0,
        vec![PageSpec::plain(vec![], vec![], plain_i32(&[1]), 1)],
    );
    column.codec = CompressionCodec::LZO;
    let reader = open(build_file(schema, vec![column], 1));
    let mut rows = reader.row_reader(None).unwrap();
    assert!(matches!(rows.next(), Err(Error::Unsupported(_))));
}

#[test]
fn v2_pages_with_uncompressed_flag() {
    let schema = vec![root("schema", 1), leaf("x", OPTIONAL, Type::INT32)];
    let columns = vec![ColumnSpec::flat(
        Type::INT32,
        "x",
        1,
        vec![PageSpec {
            rep: vec![],
            def: vec![1, 0, 1, 1],
            values: plain_i32(&[10, 20, 30]),
            num_values: 4,
            encoding: parquet_format_safe::Encoding::PLAIN,
            with_crc: false,
            v2: Some((1, 4)),
        }],
    )];
    let reader = open(build_file(schema, columns, 4));
    let mut rows = reader.row_reader(None).unwrap();

    let mut values = vec![];
    while rows.next().unwrap() {
        values.push(if rows.is_null("x").unwrap() {
            None
        } else {
            Some(rows.get_i32("x").unwrap())
        });
    }
    assert_eq!(values, vec![Some(10), None, Some(20), Some(30)]);
}

#[test]
fn random_optional_column_roundtrip() {
    let mut rng = rand::thread_rng();
    let rows_total = 257;
    let mut expected: Vec<Option<i32>> = vec![];
    for _ in 0..rows_total {
        if rng.gen_bool(0.3) {
            expected.push(None);
        } else {
            expected.push(Some(rng.gen_range(-1000..1000)));
        }
    }

    // split the column into pages of uneven sizes
    let mut pages = vec![];
    let mut offset = 0;
    let mut page_len = 33;
    while offset < rows_total {
        let end = (offset + page_len).min(rows_total);
        let slice = &expected[offset..end];
        let def: Vec<u16> = slice.iter().map(|v| u16::from(v.is_some())).collect();
        let values: Vec<i32> = slice.iter().filter_map(|v| *v).collect();
        pages.push(PageSpec::plain(
            vec![],
            def,
            plain_i32(&values),
            slice.len() as i32,
        ));
        offset = end;
        page_len += 7;
    }

    let schema = vec![root("schema", 1), leaf("x", OPTIONAL, Type::INT32)];
    let columns = vec![ColumnSpec::flat(Type::INT32, "x", 1, pages)];
    let reader = open(build_file(schema, columns, rows_total as i64));
    let mut rows = reader.row_reader_with_batch_size(None, 16).unwrap();

    let mut actual = vec![];
    while rows.next().unwrap() {
        actual.push(if rows.is_null("x").unwrap() {
            None
        } else {
            Some(rows.get_i32("x").unwrap())
        });
    }
    assert_eq!(actual, expected);
}
