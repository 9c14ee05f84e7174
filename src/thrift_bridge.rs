// Bridges thrift-generated structs to crate enums.
use parquet_format_safe::CompressionCodec;
use parquet_format_safe::DataPageHeader;
use parquet_format_safe::DataPageHeaderV2;
use parquet_format_safe::Encoding as ParquetEncoding;
use parquet_format_safe::FieldRepetitionType;
use parquet_format_safe::LogicalType as ParquetLogicalType;
use parquet_format_safe::PageType as ParquetPageType;
use parquet_format_safe::TimeUnit as ParquetTimeUnit;

use crate::error::Error;

/// The repetition of a parquet field.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub enum Repetition {
    /// When the field has no null values.
    Required,
    /// When the field may have null values.
    Optional,
    /// When the field may be repeated (list field).
    Repeated,
}

impl TryFrom<FieldRepetitionType> for Repetition {
    type Error = Error;

    fn try_from(repetition: FieldRepetitionType) -> Result<Self, Self::Error> {
        Ok(match repetition {
            FieldRepetitionType::REQUIRED => Repetition::Required,
            FieldRepetitionType::OPTIONAL => Repetition::Optional,
            FieldRepetitionType::REPEATED => Repetition::Repeated,
            _ => {
                return Err(Error::Corrupt(
                    "FieldRepetitionType value out of range".to_string(),
                ))
            }
        })
    }
}

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub enum Compression {
    Uncompressed,
    Snappy,
    Gzip,
    Lzo,
    Brotli,
    Lz4,
    Zstd,
    Lz4Raw,
}

impl TryFrom<CompressionCodec> for Compression {
    type Error = Error;

    fn try_from(codec: CompressionCodec) -> Result<Self, Self::Error> {
        Ok(match codec {
            CompressionCodec::UNCOMPRESSED => Compression::Uncompressed,
            CompressionCodec::SNAPPY => Compression::Snappy,
            CompressionCodec::GZIP => Compression::Gzip,
            CompressionCodec::LZO => Compression::Lzo,
            CompressionCodec::BROTLI => Compression::Brotli,
            CompressionCodec::LZ4 => Compression::Lz4,
            CompressionCodec::ZSTD => Compression::Zstd,
            CompressionCodec::LZ4_RAW => Compression::Lz4Raw,
            _ => {
                return Err(Error::Corrupt(
                    "CompressionCodec value out of range".to_string(),
                ))
            }
        })
    }
}

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub enum PageType {
    DataPage,
    DataPageV2,
    DictionaryPage,
    IndexPage,
}

impl TryFrom<ParquetPageType> for PageType {
    type Error = Error;

    fn try_from(type_: ParquetPageType) -> Result<Self, Self::Error> {
        Ok(match type_ {
            ParquetPageType::DATA_PAGE => PageType::DataPage,
            ParquetPageType::DATA_PAGE_V2 => PageType::DataPageV2,
            ParquetPageType::DICTIONARY_PAGE => PageType::DictionaryPage,
            ParquetPageType::INDEX_PAGE => PageType::IndexPage,
            _ => return Err(Error::Corrupt("PageType value out of range".to_string())),
        })
    }
}

/// Value encoding of a data or dictionary page.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub enum Encoding {
    /// Little-endian fixed width for numerics, `[len:u32][bytes]` for byte
    /// arrays, bit-packed for booleans.
    Plain,
    /// Deprecated dictionary encoding; indices are encoded like
    /// [`Encoding::RleDictionary`].
    PlainDictionary,
    /// Group-packed run length encoding, used for levels.
    Rle,
    /// Deprecated bit-packed encoding for levels.
    BitPacked,
    /// Block-oriented delta encoding for integers.
    DeltaBinaryPacked,
    /// Byte arrays with delta-encoded lengths followed by concatenated bytes.
    DeltaLengthByteArray,
    /// Incremental-encoded byte arrays: delta-encoded prefix lengths, then
    /// delta-length-encoded suffixes.
    DeltaByteArray,
    /// Dictionary indices encoded with the RLE/bit-packed hybrid.
    RleDictionary,
    /// Byte-plane split encoding for floating point values.
    ByteStreamSplit,
}

impl TryFrom<ParquetEncoding> for Encoding {
    type Error = Error;

    fn try_from(encoding: ParquetEncoding) -> Result<Self, Self::Error> {
        Ok(match encoding {
            ParquetEncoding::PLAIN => Encoding::Plain,
            ParquetEncoding::PLAIN_DICTIONARY => Encoding::PlainDictionary,
            ParquetEncoding::RLE => Encoding::Rle,
            ParquetEncoding::BIT_PACKED => Encoding::BitPacked,
            ParquetEncoding::DELTA_BINARY_PACKED => Encoding::DeltaBinaryPacked,
            ParquetEncoding::DELTA_LENGTH_BYTE_ARRAY => Encoding::DeltaLengthByteArray,
            ParquetEncoding::DELTA_BYTE_ARRAY => Encoding::DeltaByteArray,
            ParquetEncoding::RLE_DICTIONARY => Encoding::RleDictionary,
            ParquetEncoding::BYTE_STREAM_SPLIT => Encoding::ByteStreamSplit,
            _ => return Err(Error::Corrupt("Encoding value out of range".to_string())),
        })
    }
}

pub trait DataPageHeaderExt {
    fn encoding(&self) -> Result<Encoding, Error>;
    fn repetition_level_encoding(&self) -> Result<Encoding, Error>;
    fn definition_level_encoding(&self) -> Result<Encoding, Error>;
}

impl DataPageHeaderExt for DataPageHeader {
    fn encoding(&self) -> Result<Encoding, Error> {
        self.encoding.try_into()
    }

    fn repetition_level_encoding(&self) -> Result<Encoding, Error> {
        self.repetition_level_encoding.try_into()
    }

    fn definition_level_encoding(&self) -> Result<Encoding, Error> {
        self.definition_level_encoding.try_into()
    }
}

impl DataPageHeaderExt for DataPageHeaderV2 {
    fn encoding(&self) -> Result<Encoding, Error> {
        self.encoding.try_into()
    }

    fn repetition_level_encoding(&self) -> Result<Encoding, Error> {
        Ok(Encoding::Rle)
    }

    fn definition_level_encoding(&self) -> Result<Encoding, Error> {
        Ok(Encoding::Rle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl From<ParquetTimeUnit> for TimeUnit {
    fn from(unit: ParquetTimeUnit) -> Self {
        match unit {
            ParquetTimeUnit::MILLIS(_) => TimeUnit::Milliseconds,
            ParquetTimeUnit::MICROS(_) => TimeUnit::Microseconds,
            ParquetTimeUnit::NANOS(_) => TimeUnit::Nanoseconds,
        }
    }
}

/// Logical annotation of a primitive field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveLogicalType {
    String,
    Enum,
    Decimal(usize, usize),
    Date,
    Time {
        unit: TimeUnit,
        is_adjusted_to_utc: bool,
    },
    Timestamp {
        unit: TimeUnit,
        is_adjusted_to_utc: bool,
    },
    Integer {
        bit_width: i8,
        is_signed: bool,
    },
    Unknown,
    Json,
    Bson,
    Uuid,
}

/// Logical annotation of a group field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupLogicalType {
    Map,
    List,
}

impl TryFrom<ParquetLogicalType> for PrimitiveLogicalType {
    type Error = Error;

    fn try_from(type_: ParquetLogicalType) -> Result<Self, Self::Error> {
        Ok(match type_ {
            ParquetLogicalType::STRING(_) => PrimitiveLogicalType::String,
            ParquetLogicalType::ENUM(_) => PrimitiveLogicalType::Enum,
            ParquetLogicalType::DECIMAL(decimal) => PrimitiveLogicalType::Decimal(
                decimal.precision.try_into()?,
                decimal.scale.try_into()?,
            ),
            ParquetLogicalType::DATE(_) => PrimitiveLogicalType::Date,
            ParquetLogicalType::TIME(time) => PrimitiveLogicalType::Time {
                unit: time.unit.into(),
                is_adjusted_to_utc: time.is_adjusted_to_u_t_c,
            },
            ParquetLogicalType::TIMESTAMP(time) => PrimitiveLogicalType::Timestamp {
                unit: time.unit.into(),
                is_adjusted_to_utc: time.is_adjusted_to_u_t_c,
            },
            ParquetLogicalType::INTEGER(int) => PrimitiveLogicalType::Integer {
                bit_width: int.bit_width,
                is_signed: int.is_signed,
            },
            ParquetLogicalType::UNKNOWN(_) => PrimitiveLogicalType::Unknown,
            ParquetLogicalType::JSON(_) => PrimitiveLogicalType::Json,
            ParquetLogicalType::BSON(_) => PrimitiveLogicalType::Bson,
            ParquetLogicalType::UUID(_) => PrimitiveLogicalType::Uuid,
            _ => {
                return Err(Error::Corrupt(
                    "LogicalType value out of range".to_string(),
                ))
            }
        })
    }
}

impl TryFrom<ParquetLogicalType> for GroupLogicalType {
    type Error = Error;

    fn try_from(type_: ParquetLogicalType) -> Result<Self, Self::Error> {
        Ok(match type_ {
            ParquetLogicalType::LIST(_) => GroupLogicalType::List,
            ParquetLogicalType::MAP(_) => GroupLogicalType::Map,
            _ => {
                return Err(Error::Corrupt(
                    "LogicalType value out of range".to_string(),
                ))
            }
        })
    }
}
