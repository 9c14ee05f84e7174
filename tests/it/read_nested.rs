use parquet_format_safe::{ConvertedType, FieldRepetitionType, Type};

use parquet_rows::error::Error;
use parquet_rows::record::Value;

use super::build::*;
use super::read_flat::open;

const OPTIONAL: FieldRepetitionType = FieldRepetitionType::OPTIONAL;
const REQUIRED: FieldRepetitionType = FieldRepetitionType::REQUIRED;
const REPEATED: FieldRepetitionType = FieldRepetitionType::REPEATED;

fn collect_rows(data: Vec<u8>, batch_size: usize) -> Vec<String> {
    let reader = open(data);
    let mut rows = reader
        .row_reader_with_batch_size(None, batch_size)
        .unwrap();
    let mut out = vec![];
    while rows.next().unwrap() {
        out.push(rows.row().unwrap().to_string());
    }
    out
}

/// `address` is an optional struct of three optional leaves.
fn struct_file() -> Vec<u8> {
    let schema = vec![
        root("schema", 1),
        group("address", OPTIONAL, 3),
        utf8_leaf("street", OPTIONAL),
        utf8_leaf("city", OPTIONAL),
        leaf("zip", OPTIONAL, Type::INT32),
    ];
    let columns = vec![
        ColumnSpec::nested(
            Type::BYTE_ARRAY,
            &["address", "street"],
            2,
            0,
            vec![PageSpec::plain(
                vec![],
                vec![2, 2, 0],
                plain_strings(&["123 Main St", "456 Oak Ave"]),
                3,
            )],
        ),
        ColumnSpec::nested(
            Type::BYTE_ARRAY,
            &["address", "city"],
            2,
            0,
            vec![PageSpec::plain(
                vec![],
                vec![2, 2, 0],
                plain_strings(&["New York", "Boston"]),
                3,
            )],
        ),
        ColumnSpec::nested(
            Type::INT32,
            &["address", "zip"],
            2,
            0,
            vec![PageSpec::plain(
                vec![],
                vec![2, 2, 0],
                plain_i32(&[10001, 2101]),
                3,
            )],
        ),
    ];
    build_file(schema, columns, 3)
}

#[test]
fn nested_struct_with_null_row() {
    let reader = open(struct_file());
    let mut rows = reader.row_reader(None).unwrap();

    assert!(rows.next().unwrap());
    let address = rows.row().unwrap().get("address").unwrap();
    let address = address.as_group().unwrap();
    assert_eq!(address.get("street").unwrap().as_str().unwrap(), "123 Main St");
    assert_eq!(address.get("city").unwrap().as_str().unwrap(), "New York");
    assert_eq!(address.get("zip").unwrap().as_int().unwrap(), 10001);

    assert!(rows.next().unwrap());
    assert!(rows.next().unwrap());

    // row 2: the whole struct is null; accessing it yields a null view,
    // not a panic
    let address = rows.row().unwrap().get("address").unwrap();
    assert!(address.is_null());
    assert!(matches!(address.as_group(), Err(Error::NullAccess(_))));
    assert!(rows.is_null("address").unwrap());

    assert!(!rows.next().unwrap());
}

/// `items` is a three-level list of structs.
fn items_file() -> Vec<u8> {
    let schema = vec![
        root("schema", 1),
        group_converted("items", OPTIONAL, 1, ConvertedType::LIST),
        group("list", REPEATED, 1),
        group("element", REQUIRED, 2),
        utf8_leaf("name", OPTIONAL),
        leaf("quantity", OPTIONAL, Type::INT32),
    ];
    let columns = vec![
        ColumnSpec::nested(
            Type::BYTE_ARRAY,
            &["items", "list", "element", "name"],
            3,
            1,
            vec![PageSpec::plain(
                vec![0, 1, 0, 0],
                vec![3, 3, 3, 1],
                plain_strings(&["apple", "banana", "cherry"]),
                4,
            )],
        ),
        ColumnSpec::nested(
            Type::INT32,
            &["items", "list", "element", "quantity"],
            3,
            1,
            vec![PageSpec::plain(
                vec![0, 1, 0, 0],
                vec![3, 3, 3, 1],
                plain_i32(&[5, 10, 7]),
                4,
            )],
        ),
    ];
    build_file(schema, columns, 3)
}

#[test]
fn list_of_structs() {
    let rows = collect_rows(items_file(), 1024);
    assert_eq!(
        rows,
        vec![
            "{items: [{name: \"apple\", quantity: 5}, {name: \"banana\", quantity: 10}]}",
            "{items: [{name: \"cherry\", quantity: 7}]}",
            "{items: []}",
        ]
    );
}

#[test]
fn empty_list_is_not_null() {
    let reader = open(items_file());
    let mut rows = reader.row_reader(None).unwrap();
    assert!(rows.next().unwrap());
    assert!(rows.next().unwrap());
    assert!(rows.next().unwrap());

    let items = rows.row().unwrap().get("items").unwrap();
    assert!(!items.is_null());
    assert_eq!(items.as_list().unwrap().len(), 0);
}

/// The classic Dremel address book: a repeated primitive and a repeated
/// group, without `LIST` wrappers.
fn address_book_file() -> Vec<u8> {
    let schema = vec![
        root("AddressBook", 3),
        utf8_leaf("owner", REQUIRED),
        utf8_leaf("ownerPhoneNumbers", REPEATED),
        group("contacts", REPEATED, 2),
        utf8_leaf("name", REQUIRED),
        utf8_leaf("phoneNumber", OPTIONAL),
    ];
    let columns = vec![
        ColumnSpec::nested(
            Type::BYTE_ARRAY,
            &["owner"],
            0,
            0,
            vec![PageSpec::plain(
                vec![],
                vec![],
                plain_strings(&["Julien Le Dem", "A. Nonymous"]),
                2,
            )],
        ),
        ColumnSpec::nested(
            Type::BYTE_ARRAY,
            &["ownerPhoneNumbers"],
            1,
            1,
            vec![PageSpec::plain(
                vec![0, 1, 0],
                vec![1, 1, 0],
                plain_strings(&["555 123 4567", "555 666 1337"]),
                3,
            )],
        ),
        ColumnSpec::nested(
            Type::BYTE_ARRAY,
            &["contacts", "name"],
            1,
            1,
            vec![PageSpec::plain(
                vec![0, 1, 0],
                vec![1, 1, 0],
                plain_strings(&["Dmitriy Ryaboy", "Chris Aniszczyk"]),
                3,
            )],
        ),
        ColumnSpec::nested(
            Type::BYTE_ARRAY,
            &["contacts", "phoneNumber"],
            2,
            1,
            vec![PageSpec::plain(
                vec![0, 1, 0],
                vec![2, 1, 0],
                plain_strings(&["555 987 6543"]),
                3,
            )],
        ),
    ];
    build_file(schema, columns, 2)
}

#[test]
fn address_book() {
    let reader = open(address_book_file());
    let mut rows = reader.row_reader(None).unwrap();

    assert!(rows.next().unwrap());
    let row = rows.row().unwrap();
    assert_eq!(row.get("owner").unwrap().as_str().unwrap(), "Julien Le Dem");
    let phones = row.get("ownerPhoneNumbers").unwrap().as_list().unwrap();
    assert_eq!(
        phones,
        &[
            Value::Str("555 123 4567".to_string()),
            Value::Str("555 666 1337".to_string())
        ]
    );
    let contacts = row.get("contacts").unwrap().as_list().unwrap();
    assert_eq!(contacts.len(), 2);
    let first = contacts[0].as_group().unwrap();
    assert_eq!(first.get("name").unwrap().as_str().unwrap(), "Dmitriy Ryaboy");
    assert_eq!(
        first.get("phoneNumber").unwrap().as_str().unwrap(),
        "555 987 6543"
    );
    let second = contacts[1].as_group().unwrap();
    assert_eq!(
        second.get("name").unwrap().as_str().unwrap(),
        "Chris Aniszczyk"
    );
    assert!(second.get("phoneNumber").unwrap().is_null());

    // the second record has empty lists, not nulls
    assert!(rows.next().unwrap());
    let row = rows.row().unwrap();
    assert_eq!(row.get("owner").unwrap().as_str().unwrap(), "A. Nonymous");
    assert_eq!(row.get("ownerPhoneNumbers").unwrap().as_list().unwrap().len(), 0);
    assert_eq!(row.get("contacts").unwrap().as_list().unwrap().len(), 0);

    assert!(!rows.next().unwrap());
}

/// `matrix` is a `list<list<i32>>` with empty inner lists and a null row.
fn matrix_file() -> Vec<u8> {
    let schema = vec![
        root("schema", 1),
        group_converted("matrix", OPTIONAL, 1, ConvertedType::LIST),
        group("list", REPEATED, 1),
        group_converted("element", OPTIONAL, 1, ConvertedType::LIST),
        group("list", REPEATED, 1),
        leaf("element", OPTIONAL, Type::INT32),
    ];
    let columns = vec![ColumnSpec::nested(
        Type::INT32,
        &["matrix", "list", "element", "list", "element"],
        5,
        2,
        vec![PageSpec::plain(
            vec![0, 2, 1, 2, 2, 1, 0, 0, 1, 1, 0, 2, 0],
            vec![5, 5, 5, 5, 5, 5, 5, 3, 5, 3, 5, 5, 0],
            plain_i32(&[1, 2, 3, 4, 5, 6, 7, 100, 8, 9]),
            13,
        )],
    )];
    build_file(schema, columns, 5)
}

#[test]
fn nested_lists() {
    let rows = collect_rows(matrix_file(), 1024);
    assert_eq!(
        rows,
        vec![
            "{matrix: [[1, 2], [3, 4, 5], [6]]}",
            "{matrix: [[7]]}",
            "{matrix: [[], [100], []]}",
            "{matrix: [[8, 9]]}",
            "{matrix: null}",
        ]
    );
}

#[test]
fn nested_lists_across_small_batches() {
    // batches must end on record boundaries even when records span values
    for batch_size in [1, 2, 3] {
        let rows = collect_rows(matrix_file(), batch_size);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[2], "{matrix: [[], [100], []]}");
        assert_eq!(rows[4], "{matrix: null}");
    }
}

/// `cube` is a `list<list<list<i32>>>` whose innermost empty list must be
/// preserved.
fn cube_file() -> Vec<u8> {
    let schema = vec![
        root("schema", 1),
        group_converted("cube", OPTIONAL, 1, ConvertedType::LIST),
        group("list", REPEATED, 1),
        group_converted("element", OPTIONAL, 1, ConvertedType::LIST),
        group("list", REPEATED, 1),
        group_converted("element", OPTIONAL, 1, ConvertedType::LIST),
        group("list", REPEATED, 1),
        leaf("element", OPTIONAL, Type::INT32),
    ];
    let columns = vec![ColumnSpec::nested(
        Type::INT32,
        &["cube", "list", "element", "list", "element", "list", "element"],
        7,
        3,
        vec![PageSpec::plain(
            vec![0, 1],
            vec![5, 7],
            plain_i32(&[100]),
            2,
        )],
    )];
    build_file(schema, columns, 1)
}

#[test]
fn triple_nested_list_preserves_empty_innermost() {
    let rows = collect_rows(cube_file(), 1024);
    assert_eq!(rows, vec!["{cube: [[[]], [[100]]]}"]);
}

/// `attrs` is a `map<string, i32>`.
fn map_file() -> Vec<u8> {
    let schema = vec![
        root("schema", 1),
        group_converted("attrs", OPTIONAL, 1, ConvertedType::MAP),
        group("key_value", REPEATED, 2),
        utf8_leaf("key", REQUIRED),
        leaf("value", OPTIONAL, Type::INT32),
    ];
    let columns = vec![
        ColumnSpec::nested(
            Type::BYTE_ARRAY,
            &["attrs", "key_value", "key"],
            2,
            1,
            vec![PageSpec::plain(
                vec![0, 1, 0],
                vec![2, 2, 1],
                plain_strings(&["a", "b"]),
                3,
            )],
        ),
        ColumnSpec::nested(
            Type::INT32,
            &["attrs", "key_value", "value"],
            3,
            1,
            vec![PageSpec::plain(
                vec![0, 1, 0],
                vec![3, 3, 1],
                plain_i32(&[1, 2]),
                3,
            )],
        ),
    ];
    build_file(schema, columns, 2)
}

#[test]
fn map_of_pairs() {
    let rows = collect_rows(map_file(), 1024);
    assert_eq!(
        rows,
        vec!["{attrs: {\"a\" -> 1, \"b\" -> 2}}", "{attrs: {}}"]
    );

    let reader = open(map_file());
    let mut reader = reader.row_reader(None).unwrap();
    assert!(reader.next().unwrap());
    let attrs = reader.row().unwrap().get("attrs").unwrap();
    let entries = attrs.as_map().unwrap();
    assert_eq!(entries[0].0.as_str().unwrap(), "a");
    assert_eq!(entries[0].1.as_int().unwrap(), 1);
}
