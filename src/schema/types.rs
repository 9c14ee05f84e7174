// see https://github.com/apache/parquet-format/blob/master/LogicalTypes.md
use parquet_format_safe::{ConvertedType, Type};

use crate::error::{Error, Result};
pub use crate::thrift_bridge::{GroupLogicalType, PrimitiveLogicalType, Repetition, TimeUnit};

/// The physical type of a leaf column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Int96,
    Float,
    Double,
    ByteArray,
    FixedLenByteArray(usize),
}

pub(crate) fn type_to_physical_type(type_: &Type, length: Option<i32>) -> Result<PhysicalType> {
    Ok(match *type_ {
        Type::BOOLEAN => PhysicalType::Boolean,
        Type::INT32 => PhysicalType::Int32,
        Type::INT64 => PhysicalType::Int64,
        Type::INT96 => PhysicalType::Int96,
        Type::FLOAT => PhysicalType::Float,
        Type::DOUBLE => PhysicalType::Double,
        Type::BYTE_ARRAY => PhysicalType::ByteArray,
        Type::FIXED_LEN_BYTE_ARRAY => {
            let length = length.ok_or_else(|| {
                Error::corrupt("a length must be defined for FIXED_LEN_BYTE_ARRAY")
            })?;
            PhysicalType::FixedLenByteArray(length.try_into()?)
        }
        _ => return Err(Error::corrupt("Type value out of range")),
    })
}

/// Converted (legacy logical) annotation of a primitive field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveConvertedType {
    Utf8,
    Enum,
    Decimal(usize, usize),
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Json,
    Bson,
    Interval,
}

/// Converted (legacy logical) annotation of a group field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupConvertedType {
    List,
    Map,
    MapKeyValue,
}

pub(crate) fn converted_to_primitive_converted(
    type_: &ConvertedType,
    maybe_decimal: Option<(i32, i32)>,
) -> Result<PrimitiveConvertedType> {
    use PrimitiveConvertedType::*;
    Ok(match *type_ {
        ConvertedType::UTF8 => Utf8,
        ConvertedType::ENUM => Enum,
        ConvertedType::DECIMAL => {
            if let Some((precision, scale)) = maybe_decimal {
                Decimal(precision.try_into()?, scale.try_into()?)
            } else {
                return Err(Error::corrupt("DECIMAL requires a precision and scale"));
            }
        }
        ConvertedType::DATE => Date,
        ConvertedType::TIME_MILLIS => TimeMillis,
        ConvertedType::TIME_MICROS => TimeMicros,
        ConvertedType::TIMESTAMP_MILLIS => TimestampMillis,
        ConvertedType::TIMESTAMP_MICROS => TimestampMicros,
        ConvertedType::UINT_8 => Uint8,
        ConvertedType::UINT_16 => Uint16,
        ConvertedType::UINT_32 => Uint32,
        ConvertedType::UINT_64 => Uint64,
        ConvertedType::INT_8 => Int8,
        ConvertedType::INT_16 => Int16,
        ConvertedType::INT_32 => Int32,
        ConvertedType::INT_64 => Int64,
        ConvertedType::JSON => Json,
        ConvertedType::BSON => Bson,
        ConvertedType::INTERVAL => Interval,
        _ => {
            return Err(Error::corrupt(
                "ConvertedType is not valid for a primitive field",
            ))
        }
    })
}

pub(crate) fn converted_to_group_converted(type_: &ConvertedType) -> Result<GroupConvertedType> {
    Ok(match *type_ {
        ConvertedType::LIST => GroupConvertedType::List,
        ConvertedType::MAP => GroupConvertedType::Map,
        ConvertedType::MAP_KEY_VALUE => GroupConvertedType::MapKeyValue,
        _ => {
            return Err(Error::corrupt(
                "ConvertedType is not valid for a group field",
            ))
        }
    })
}

/// Name, repetition and optional field id shared by all schema nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub repetition: Repetition,
    pub id: Option<i32>,
}

/// A node of the schema tree: a primitive leaf or a group. The root is a
/// group whose repetition is ignored.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaNode {
    Primitive {
        info: FieldInfo,
        physical_type: PhysicalType,
        converted_type: Option<PrimitiveConvertedType>,
        logical_type: Option<PrimitiveLogicalType>,
    },
    Group {
        info: FieldInfo,
        converted_type: Option<GroupConvertedType>,
        logical_type: Option<GroupLogicalType>,
        fields: Vec<SchemaNode>,
    },
}

impl SchemaNode {
    pub fn info(&self) -> &FieldInfo {
        match self {
            Self::Primitive { info, .. } => info,
            Self::Group { info, .. } => info,
        }
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn repetition(&self) -> Repetition {
        self.info().repetition
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group { .. })
    }

    /// The children of a group node. Empty for primitives.
    pub fn fields(&self) -> &[SchemaNode] {
        match self {
            Self::Group { fields, .. } => fields,
            Self::Primitive { .. } => &[],
        }
    }

    /// Whether this group is a `LIST`-annotated wrapper whose repeated
    /// child holds the elements.
    pub fn is_list_wrapper(&self) -> bool {
        match self {
            Self::Group {
                converted_type,
                logical_type,
                fields,
                info,
            } => {
                (*logical_type == Some(GroupLogicalType::List)
                    || *converted_type == Some(GroupConvertedType::List))
                    && info.repetition != Repetition::Repeated
                    && fields.len() == 1
                    && fields[0].repetition() == Repetition::Repeated
            }
            Self::Primitive { .. } => false,
        }
    }

    /// Whether this group is a `MAP`-annotated wrapper whose repeated
    /// child holds `{key, value}` pairs.
    pub fn is_map_wrapper(&self) -> bool {
        match self {
            Self::Group {
                converted_type,
                logical_type,
                fields,
                info,
            } => {
                (*logical_type == Some(GroupLogicalType::Map)
                    || *converted_type == Some(GroupConvertedType::Map)
                    || *converted_type == Some(GroupConvertedType::MapKeyValue))
                    && info.repetition != Repetition::Repeated
                    && fields.len() == 1
                    && fields[0].repetition() == Repetition::Repeated
                    && fields[0].fields().len() == 2
            }
            Self::Primitive { .. } => false,
        }
    }

    /// Whether the field's values carry UTF-8 text per its annotation.
    pub fn is_utf8(&self) -> bool {
        match self {
            Self::Primitive {
                converted_type,
                logical_type,
                ..
            } => matches!(
                logical_type,
                Some(PrimitiveLogicalType::String)
                    | Some(PrimitiveLogicalType::Enum)
                    | Some(PrimitiveLogicalType::Json)
            ) || matches!(
                converted_type,
                Some(PrimitiveConvertedType::Utf8)
                    | Some(PrimitiveConvertedType::Enum)
                    | Some(PrimitiveConvertedType::Json)
            ),
            Self::Group { .. } => false,
        }
    }

    pub fn physical_type(&self) -> Option<PhysicalType> {
        match self {
            Self::Primitive { physical_type, .. } => Some(*physical_type),
            Self::Group { .. } => None,
        }
    }
}
