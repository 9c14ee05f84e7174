use std::sync::Arc;

use bytes::Bytes;
use parquet_format_safe::{
    CompressionCodec, ConvertedType, Encoding, FieldRepetitionType, SchemaElement, Type,
};

use parquet_rows::compression::CodecRegistry;
use parquet_rows::encoding::Encoding as CrateEncoding;
use parquet_rows::error::Error;
use parquet_rows::read::{read_metadata, FileReader};

use super::build::*;

pub fn open(data: Vec<u8>) -> FileReader {
    let mapping = Bytes::from(data);
    let metadata = read_metadata(&mapping).unwrap();
    let pool = Arc::new(
        rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .unwrap(),
    );
    FileReader::new(mapping, metadata, pool, CodecRegistry::new())
}

const OPTIONAL: FieldRepetitionType = FieldRepetitionType::OPTIONAL;
const REQUIRED: FieldRepetitionType = FieldRepetitionType::REQUIRED;

/// 2025-01-01T00:18:38Z in microseconds since the epoch.
const ROW0_PICKUP: i64 = 1_735_690_718_000_000;

fn timestamp_leaf(name: &str) -> SchemaElement {
    SchemaElement {
        converted_type: Some(ConvertedType::TIMESTAMP_MICROS),
        ..leaf(name, OPTIONAL, Type::INT64)
    }
}

/// A 5-row, 20-column taxi-trip-shaped file.
fn trips_file() -> Vec<u8> {
    let filler_count = 14;
    let mut schema = vec![
        root("schema", 6 + filler_count),
        leaf("VendorID", REQUIRED, Type::INT32),
        timestamp_leaf("tpep_pickup_datetime"),
        leaf("trip_distance", OPTIONAL, Type::DOUBLE),
        leaf("payment_type", OPTIONAL, Type::INT64),
        leaf("tip_amount", OPTIONAL, Type::DOUBLE),
        leaf("total_amount", OPTIONAL, Type::DOUBLE),
    ];
    let mut columns = vec![
        ColumnSpec::flat(
            Type::INT32,
            "VendorID",
            0,
            vec![PageSpec::plain(
                vec![],
                vec![],
                plain_i32(&[1, 2, 2, 1, 2]),
                5,
            )],
        ),
        ColumnSpec::flat(
            Type::INT64,
            "tpep_pickup_datetime",
            1,
            vec![PageSpec::plain(
                vec![],
                vec![1; 5],
                plain_i64(&[
                    ROW0_PICKUP,
                    ROW0_PICKUP + 60_000_000,
                    ROW0_PICKUP + 120_000_000,
                    ROW0_PICKUP + 180_000_000,
                    ROW0_PICKUP + 240_000_000,
                ]),
                5,
            )],
        ),
        ColumnSpec::flat(
            Type::DOUBLE,
            "trip_distance",
            1,
            vec![PageSpec::plain(
                vec![],
                vec![1; 5],
                plain_f64(&[1.6, 3.2, 0.9, 2.4, 5.1]),
                5,
            )],
        ),
        ColumnSpec::flat(
            Type::INT64,
            "payment_type",
            1,
            vec![PageSpec::plain(
                vec![],
                vec![1; 5],
                plain_i64(&[1, 1, 2, 2, 1]),
                5,
            )],
        ),
        ColumnSpec::flat(
            Type::DOUBLE,
            "tip_amount",
            1,
            // nulls at rows 2 and 3 are explicit zero amounts here; the
            // null case is covered by the filler columns below
            vec![PageSpec::plain(
                vec![],
                vec![1; 5],
                plain_f64(&[3.0, 2.5, 0.0, 0.0, 4.2]),
                5,
            )],
        ),
        ColumnSpec::flat(
            Type::DOUBLE,
            "total_amount",
            1,
            vec![PageSpec::plain(
                vec![],
                vec![1; 5],
                plain_f64(&[18.0, 21.5, 11.2, 9.7, 30.0]),
                5,
            )],
        ),
    ];
    for i in 0..filler_count {
        let name = format!("extra_{:02}", i);
        schema.push(leaf(&name, OPTIONAL, Type::DOUBLE));
        // odd rows are null in every filler column
        columns.push(ColumnSpec::flat(
            Type::DOUBLE,
            &name,
            1,
            vec![PageSpec::plain(
                vec![],
                vec![1, 0, 1, 0, 1],
                plain_f64(&[i as f64, i as f64 + 0.5, i as f64 + 1.0]),
                5,
            )],
        ));
    }
    build_file(schema, columns, 5)
}

#[test]
fn trips_spot_checks() {
    let reader = open(trips_file());
    let mut rows = reader.row_reader(None).unwrap();

    assert!(rows.has_next().unwrap());
    assert!(rows.next().unwrap());
    assert_eq!(rows.get_i32("VendorID").unwrap(), 1);
    assert_eq!(rows.get_i64("tpep_pickup_datetime").unwrap(), ROW0_PICKUP);
    assert_eq!(rows.get_f64("trip_distance").unwrap(), 1.6);
    assert_eq!(rows.get_f64("total_amount").unwrap(), 18.0);
    assert_eq!(rows.get_f64("extra_03").unwrap(), 3.0);

    // row 1: filler columns are null
    assert!(rows.next().unwrap());
    assert!(rows.is_null("extra_00").unwrap());
    assert!(matches!(
        rows.get_f64("extra_00"),
        Err(Error::NullAccess(_))
    ));

    assert!(rows.next().unwrap());
    assert!(rows.next().unwrap());
    // row 3
    assert_eq!(rows.get_i64("payment_type").unwrap(), 2);
    assert_eq!(rows.get_f64("tip_amount").unwrap(), 0.0);
    assert_eq!(rows.get_f64("total_amount").unwrap(), 9.7);

    assert!(rows.next().unwrap());
    assert!(!rows.next().unwrap());
    assert!(!rows.has_next().unwrap());
}

#[test]
fn accessor_errors() {
    let reader = open(trips_file());
    let mut rows = reader.row_reader(None).unwrap();
    assert!(rows.next().unwrap());

    assert!(matches!(rows.get_i64("VendorID"), Err(Error::Type(_))));
    assert!(matches!(rows.get_str("VendorID"), Err(Error::Type(_))));
    assert!(matches!(rows.get_i32("no_such"), Err(Error::Schema(_))));

    // accessor errors are not terminal
    assert_eq!(rows.get_i32("VendorID").unwrap(), 1);
    assert!(rows.next().unwrap());
}

#[test]
fn projection_by_name() {
    let reader = open(trips_file());
    let mut rows = reader
        .row_reader(Some(&["total_amount", "VendorID"]))
        .unwrap();
    // output order is schema order
    assert_eq!(rows.field_names().to_vec(), vec!["VendorID", "total_amount"]);
    assert!(rows.next().unwrap());
    assert_eq!(rows.get_i32_by_index(0).unwrap(), 1);
    assert_eq!(rows.get_f64_by_index(1).unwrap(), 18.0);

    assert!(matches!(
        reader.row_reader(Some(&["nope"])),
        Err(Error::Schema(_))
    ));
}

#[test]
fn small_batches_keep_row_order() {
    let reader = open(trips_file());
    let mut rows = reader.row_reader_with_batch_size(None, 2).unwrap();
    let mut vendors = vec![];
    while rows.next().unwrap() {
        vendors.push(rows.get_i32("VendorID").unwrap());
    }
    assert_eq!(vendors, vec![1, 2, 2, 1, 2]);
}

#[test]
fn values_split_across_pages() {
    let schema = vec![root("schema", 1), leaf("x", REQUIRED, Type::INT32)];
    let columns = vec![ColumnSpec::flat(
        Type::INT32,
        "x",
        0,
        vec![
            PageSpec::plain(vec![], vec![], plain_i32(&[1, 2, 3]), 3),
            PageSpec::plain(vec![], vec![], plain_i32(&[4]), 1),
            PageSpec::plain(vec![], vec![], plain_i32(&[5, 6]), 2),
        ],
    )];
    let reader = open(build_file(schema, columns, 6));
    let mut rows = reader.row_reader_with_batch_size(None, 4).unwrap();
    let mut values = vec![];
    while rows.next().unwrap() {
        values.push(rows.get_i32("x").unwrap());
    }
    assert_eq!(values, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn dictionary_encoded_strings() {
    let schema = vec![root("schema", 1), utf8_leaf("category", OPTIONAL)];
    let mut column = ColumnSpec::flat(
        Type::BYTE_ARRAY,
        "category",
        1,
        vec![PageSpec {
            rep: vec![],
            def: vec![1; 5],
            values: dict_indices(&[0, 1, 0, 2, 1], 2),
            num_values: 5,
            encoding: Encoding::RLE_DICTIONARY,
            with_crc: false,
            v2: None,
        }],
    );
    column.dictionary = Some((plain_strings(&["A", "B", "C"]), 3));
    column.encodings = vec![Encoding::PLAIN, Encoding::RLE, Encoding::RLE_DICTIONARY];
    let reader = open(build_file(schema, vec![column], 5));

    // the chunk advertises the dictionary encoding
    let encodings = reader.metadata().row_groups()[0].columns()[0]
        .encodings()
        .unwrap();
    assert!(encodings.contains(&CrateEncoding::RleDictionary));

    let mut rows = reader.row_reader(None).unwrap();
    let mut values = vec![];
    while rows.next().unwrap() {
        values.push(rows.get_str("category").unwrap().to_string());
    }
    assert_eq!(values, vec!["A", "B", "A", "C", "B"]);
}

#[test]
fn snappy_compressed_column() {
    let schema = vec![root("schema", 1), leaf("x", REQUIRED, Type::INT64)];
    let mut column = ColumnSpec::flat(
        Type::INT64,
        "x",
        0,
        vec![PageSpec::plain(
            vec![],
            vec![],
            plain_i64(&[10, 20, 30, 40]),
            4,
        )],
    );
    column.codec = CompressionCodec::SNAPPY;
    let reader = open(build_file(schema, vec![column], 4));
    let mut rows = reader.row_reader(None).unwrap();
    let mut values = vec![];
    while rows.next().unwrap() {
        values.push(rows.get_i64("x").unwrap());
    }
    assert_eq!(values, vec![10, 20, 30, 40]);
}

#[test]
fn crc_mismatch_is_corrupt() {
    let schema = vec![root("schema", 1), leaf("x", REQUIRED, Type::INT32)];
    let columns = vec![ColumnSpec::flat(
        Type::INT32,
        "x",
        0,
        vec![PageSpec {
            rep: vec![],
            def: vec![],
            values: plain_i32(&[7, 8, 9]),
            num_values: 3,
            encoding: Encoding::PLAIN,
            with_crc: true,
            v2: None,
        }],
    )];
    let mut data = build_file(schema, columns, 3);

    // sanity: the untouched file reads fine
    {
        let reader = open(data.clone());
        let mut rows = reader.row_reader(None).unwrap();
        assert!(rows.next().unwrap());
    }

    // flip one byte of the page body (the last byte of the chunk)
    let metadata = read_metadata(&data).unwrap();
    let chunk = &metadata.row_groups()[0].columns()[0];
    let (start, length) = chunk.byte_range().unwrap();
    let target = (start + length - 1) as usize;
    data[target] ^= 0xff;

    let reader = open(data);
    let mut rows = reader.row_reader(None).unwrap();
    let result = rows.next();
    assert!(matches!(result, Err(Error::Corrupt(_))), "{:?}", result);

    // the reader is unusable afterwards and keeps returning the error
    assert!(matches!(rows.next(), Err(Error::Corrupt(_))));
    assert!(matches!(rows.has_next(), Err(Error::Corrupt(_))));
}

#[test]
fn empty_pages_are_legal() {
    let schema = vec![root("schema", 1), leaf("x", REQUIRED, Type::INT32)];
    let columns = vec![ColumnSpec::flat(
        Type::INT32,
        "x",
        0,
        vec![
            PageSpec::plain(vec![], vec![], vec![], 0),
            PageSpec::plain(vec![], vec![], plain_i32(&[5]), 1),
        ],
    )];
    let reader = open(build_file(schema, columns, 1));
    let mut rows = reader.row_reader(None).unwrap();
    assert!(rows.next().unwrap());
    assert_eq!(rows.get_i32("x").unwrap(), 5);
    assert!(!rows.next().unwrap());
}

#[test]
fn closed_reader_errors() {
    let reader = open(trips_file());
    let mut rows = reader.row_reader(None).unwrap();
    assert!(rows.next().unwrap());
    reader.close();
    assert!(matches!(rows.next(), Err(Error::Io(_))));
}
