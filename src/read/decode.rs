use crate::compression::{CodecRegistry, Compression};
use crate::encoding::{
    byte_stream_split, delta_byte_array, delta_length_byte_array, get_bit_width, get_length,
    hybrid_rle, plain, Encoding,
};
use crate::encoding::delta_bitpacked;
use crate::error::{Error, Result};
use crate::metadata::ColumnDescriptor;
use crate::page::{DataPageHeader, DecodedPage, Dictionary, PageInfo, ValueBatch};
use crate::schema::types::PhysicalType;
use crate::thrift_bridge::DataPageHeaderExt;
use crate::types::{decode as decode_native, NativeType};

/// Decodes one scanned page into levels and dense typed values:
/// decompression, level decoding, value decoding and dictionary
/// indirection. CRC-carrying pages are verified first, over the compressed
/// bytes as stored.
pub fn decode_page(info: &PageInfo, codecs: &CodecRegistry) -> Result<DecodedPage> {
    let descriptor = &info.descriptor;
    let context = |message: String| {
        Error::Corrupt(format!(
            "column {} ({:?}): {}",
            descriptor.path_string(),
            info.compression,
            message
        ))
    };

    if let Some(expected) = info.crc {
        let actual = crc32fast::hash(&info.body);
        if actual != expected {
            return Err(context(format!(
                "page checksum mismatch: header says {:#010x}, computed {:#010x}",
                expected, actual
            )));
        }
    }

    log::trace!(
        "decoding page of column {}: {} values, {} compressed bytes",
        descriptor.path_string(),
        info.num_values(),
        info.body.len()
    );

    match &info.header {
        DataPageHeader::V1(header) => decode_v1(info, header, codecs).map_err(|e| match e {
            Error::Corrupt(message) => context(message),
            e => e,
        }),
        DataPageHeader::V2(header) => decode_v2(info, header, codecs).map_err(|e| match e {
            Error::Corrupt(message) => context(message),
            e => e,
        }),
    }
}

fn decode_v1(
    info: &PageInfo,
    header: &parquet_format_safe::DataPageHeader,
    codecs: &CodecRegistry,
) -> Result<DecodedPage> {
    let descriptor = &info.descriptor;
    let max_rep = descriptor.max_rep_level();
    let max_def = descriptor.max_def_level();
    let num_values = header.num_values.try_into()?;

    for level_encoding in [
        header.repetition_level_encoding()?,
        header.definition_level_encoding()?,
    ] {
        if level_encoding != Encoding::Rle {
            return Err(Error::unsupported(format!(
                "level encoding {:?} is not supported",
                level_encoding
            )));
        }
    }

    // the v1 payload is [rep levels][def levels][values], compressed as one
    let decompressed;
    let buffer: &[u8] = if info.compression != Compression::Uncompressed {
        decompressed = codecs.decompress(info.compression, &info.body, info.uncompressed_size)?;
        &decompressed
    } else {
        &info.body
    };

    let (rep_bytes, def_bytes, values_bytes) =
        split_buffer_v1(buffer, max_rep > 0, max_def > 0)?;

    let rep = decode_levels(rep_bytes, max_rep, num_values)?;
    let def = decode_levels(def_bytes, max_def, num_values)?;
    let present = present_count(&def, max_def, num_values);

    let values = decode_values(
        values_bytes,
        header.encoding()?,
        descriptor,
        info.dictionary.as_deref(),
        present,
    )?;

    Ok(DecodedPage {
        rep,
        def,
        values,
        num_values,
        num_rows: None,
    })
}

fn decode_v2(
    info: &PageInfo,
    header: &parquet_format_safe::DataPageHeaderV2,
    codecs: &CodecRegistry,
) -> Result<DecodedPage> {
    let descriptor = &info.descriptor;
    let max_rep = descriptor.max_rep_level();
    let max_def = descriptor.max_def_level();
    let num_values = header.num_values.try_into()?;

    let rep_len: usize = header.repetition_levels_byte_length.try_into()?;
    let def_len: usize = header.definition_levels_byte_length.try_into()?;
    if rep_len + def_len > info.body.len() {
        return Err(Error::corrupt(
            "the level sections are larger than the page",
        ));
    }

    // v2 level sections are never compressed and have no length prefix
    let rep = decode_levels(&info.body[..rep_len], max_rep, num_values)?;
    let def = decode_levels(&info.body[rep_len..rep_len + def_len], max_def, num_values)?;
    let present = present_count(&def, max_def, num_values);

    // `is_compressed == false` turns the codec off for this page even when
    // the chunk declares one; a missing flag means compressed.
    let is_compressed = header.is_compressed.unwrap_or(true);
    let values_compressed = &info.body[rep_len + def_len..];
    let decompressed;
    let values_bytes: &[u8] = if is_compressed && info.compression != Compression::Uncompressed {
        let uncompressed_len = info
            .uncompressed_size
            .checked_sub(rep_len + def_len)
            .ok_or_else(|| Error::corrupt("the uncompressed size excludes the level sections"))?;
        decompressed = codecs.decompress(info.compression, values_compressed, uncompressed_len)?;
        &decompressed
    } else {
        values_compressed
    };

    let values = decode_values(
        values_bytes,
        header.encoding()?,
        descriptor,
        info.dictionary.as_deref(),
        present,
    )?;

    let num_rows = if max_rep == 0 {
        num_values
    } else {
        rep.iter().filter(|level| **level == 0).count()
    };

    Ok(DecodedPage {
        rep,
        def,
        values,
        num_values,
        num_rows: Some(num_rows),
    })
}

/// Splits a v1 page buffer into `(rep levels, def levels, values)`. Each
/// present level stream is preceded by its `u32` little-endian length.
fn split_buffer_v1(buffer: &[u8], has_rep: bool, has_def: bool) -> Result<(&[u8], &[u8], &[u8])> {
    let (rep, buffer) = if has_rep {
        let length = get_length(buffer)? as usize;
        if 4 + length > buffer.len() {
            return Err(Error::corrupt("the repetition levels run past the page"));
        }
        (&buffer[4..4 + length], &buffer[4 + length..])
    } else {
        (&[] as &[u8], buffer)
    };

    let (def, buffer) = if has_def {
        let length = get_length(buffer)? as usize;
        if 4 + length > buffer.len() {
            return Err(Error::corrupt("the definition levels run past the page"));
        }
        (&buffer[4..4 + length], &buffer[4 + length..])
    } else {
        (&[] as &[u8], buffer)
    };

    Ok((rep, def, buffer))
}

/// Decodes one RLE-hybrid level stream into `u16` levels. A maximum level
/// of 0 yields an empty (virtual all-zero) stream.
fn decode_levels(bytes: &[u8], max_level: i16, num_values: usize) -> Result<Vec<u16>> {
    if max_level == 0 {
        return Ok(vec![]);
    }
    let num_bits = get_bit_width(max_level);
    let levels = hybrid_rle::HybridRleDecoder::new(bytes, num_bits, num_values)
        .collect::<Result<Vec<_>>>()?;
    for level in &levels {
        if *level > max_level as u32 {
            return Err(Error::corrupt(format!(
                "level {} exceeds the maximum of {}",
                level, max_level
            )));
        }
    }
    Ok(levels.into_iter().map(|level| level as u16).collect())
}

fn present_count(def: &[u16], max_def: i16, num_values: usize) -> usize {
    if max_def == 0 {
        num_values
    } else {
        def.iter().filter(|d| **d == max_def as u16).count()
    }
}

fn read_plain_fixed<T: NativeType>(bytes: &[u8], present: usize) -> Result<Vec<T>> {
    let size = std::mem::size_of::<T>();
    if bytes.len() < present * size {
        return Err(Error::corrupt("plain values end mid-stream"));
    }
    Ok(bytes[..present * size]
        .chunks_exact(size)
        .map(decode_native)
        .collect())
}

fn decode_plain(
    bytes: &[u8],
    physical_type: PhysicalType,
    present: usize,
) -> Result<ValueBatch> {
    Ok(match physical_type {
        PhysicalType::Boolean => ValueBatch::Bool(
            plain::BooleanIter::new(bytes, present).collect::<Result<Vec<_>>>()?,
        ),
        PhysicalType::Int32 => ValueBatch::Int32(read_plain_fixed(bytes, present)?),
        PhysicalType::Int64 => ValueBatch::Int64(read_plain_fixed(bytes, present)?),
        PhysicalType::Int96 => ValueBatch::Int96(read_plain_fixed(bytes, present)?),
        PhysicalType::Float => ValueBatch::Float(read_plain_fixed(bytes, present)?),
        PhysicalType::Double => ValueBatch::Double(read_plain_fixed(bytes, present)?),
        PhysicalType::ByteArray => {
            let mut values = Vec::new();
            let mut offsets = Vec::with_capacity(present + 1);
            offsets.push(0i32);
            for value in plain::BinaryIter::new(bytes, present) {
                values.extend_from_slice(value?);
                offsets.push(values.len() as i32);
            }
            ValueBatch::Binary { values, offsets }
        }
        PhysicalType::FixedLenByteArray(size) => {
            if bytes.len() < present * size {
                return Err(Error::corrupt("fixed-size values end mid-stream"));
            }
            ValueBatch::Binary {
                values: bytes[..present * size].to_vec(),
                offsets: (0..=present).map(|i| (i * size) as i32).collect(),
            }
        }
    })
}

fn decode_dictionary_indices(
    bytes: &[u8],
    dictionary: Option<&Dictionary>,
    present: usize,
) -> Result<ValueBatch> {
    let dictionary = dictionary.ok_or_else(|| {
        Error::corrupt("a dictionary-encoded page must be preceded by a dictionary page")
    })?;
    // the first byte is the bit width of the indices (at most 32)
    let bit_width = *bytes
        .first()
        .ok_or_else(|| Error::corrupt("a dictionary-encoded page has no bit width"))?;
    if bit_width > 32 {
        return Err(Error::corrupt(format!(
            "dictionary indices cannot be {} bits wide",
            bit_width
        )));
    }
    let indices = hybrid_rle::HybridRleDecoder::new(&bytes[1..], bit_width as usize, present)
        .collect::<Result<Vec<_>>>()?;
    dictionary.gather(&indices)
}

fn decode_delta_integers(
    bytes: &[u8],
    physical_type: PhysicalType,
    present: usize,
) -> Result<ValueBatch> {
    let mut decoder = delta_bitpacked::Decoder::try_new(bytes)?;
    let values = decoder.by_ref().take(present).collect::<Result<Vec<_>>>()?;
    if values.len() != present {
        return Err(Error::corrupt(format!(
            "a delta-encoded page holds {} values but {} are present",
            values.len(),
            present
        )));
    }
    match physical_type {
        PhysicalType::Int32 => Ok(ValueBatch::Int32(
            values.into_iter().map(|v| v as i32).collect(),
        )),
        PhysicalType::Int64 => Ok(ValueBatch::Int64(values)),
        other => Err(Error::corrupt(format!(
            "DELTA_BINARY_PACKED cannot encode {:?}",
            other
        ))),
    }
}

fn decode_delta_length_byte_array(bytes: &[u8], present: usize) -> Result<ValueBatch> {
    let mut decoder = delta_length_byte_array::Decoder::try_new(bytes)?;
    let lengths = decoder
        .by_ref()
        .take(present)
        .collect::<Result<Vec<_>>>()?;
    if lengths.len() != present {
        return Err(Error::corrupt(
            "a delta-length page holds fewer lengths than present values",
        ));
    }
    let mut payload = decoder.into_values()?;
    let mut values = Vec::with_capacity(payload.len());
    let mut offsets = Vec::with_capacity(present + 1);
    offsets.push(0i32);
    for length in lengths {
        let length: usize = length.try_into()?;
        let (value, remaining) = payload.split_at(length);
        values.extend_from_slice(value);
        offsets.push(values.len() as i32);
        payload = remaining;
    }
    Ok(ValueBatch::Binary { values, offsets })
}

fn decode_delta_byte_array(bytes: &[u8], present: usize) -> Result<ValueBatch> {
    let mut decoder = delta_byte_array::Decoder::try_new(bytes)?;
    let prefix_lengths = decoder
        .by_ref()
        .take(present)
        .collect::<Result<Vec<_>>>()?;
    if prefix_lengths.len() != present {
        return Err(Error::corrupt(
            "a delta-strings page holds fewer prefixes than present values",
        ));
    }
    let mut lengths_decoder = decoder.into_lengths()?;
    let suffix_lengths = lengths_decoder
        .by_ref()
        .take(present)
        .collect::<Result<Vec<_>>>()?;
    if suffix_lengths.len() != present {
        return Err(Error::corrupt(
            "a delta-strings page holds fewer suffixes than present values",
        ));
    }
    let mut suffixes = lengths_decoder.into_values()?;

    let mut values: Vec<u8> = Vec::new();
    let mut offsets = Vec::with_capacity(present + 1);
    offsets.push(0i32);
    let mut previous: Vec<u8> = vec![];
    for (prefix_length, suffix_length) in prefix_lengths.into_iter().zip(suffix_lengths) {
        let prefix_length: usize = prefix_length.try_into()?;
        let suffix_length: usize = suffix_length.try_into()?;
        if prefix_length > previous.len() || suffix_length > suffixes.len() {
            return Err(Error::corrupt("a delta-strings value runs past the page"));
        }
        let (suffix, remaining) = suffixes.split_at(suffix_length);
        suffixes = remaining;

        let mut value = Vec::with_capacity(prefix_length + suffix_length);
        value.extend_from_slice(&previous[..prefix_length]);
        value.extend_from_slice(suffix);
        values.extend_from_slice(&value);
        offsets.push(values.len() as i32);
        previous = value;
    }
    Ok(ValueBatch::Binary { values, offsets })
}

fn decode_byte_stream_split(
    bytes: &[u8],
    physical_type: PhysicalType,
    present: usize,
) -> Result<ValueBatch> {
    let batch = match physical_type {
        PhysicalType::Float => {
            ValueBatch::Float(byte_stream_split::Decoder::<f32>::try_new(bytes)?.collect())
        }
        PhysicalType::Double => {
            ValueBatch::Double(byte_stream_split::Decoder::<f64>::try_new(bytes)?.collect())
        }
        other => {
            return Err(Error::corrupt(format!(
                "BYTE_STREAM_SPLIT cannot encode {:?}",
                other
            )))
        }
    };
    if batch.len() != present {
        return Err(Error::corrupt(format!(
            "a byte-stream-split page holds {} values but {} are present",
            batch.len(),
            present
        )));
    }
    Ok(batch)
}

fn decode_values(
    bytes: &[u8],
    encoding: Encoding,
    descriptor: &ColumnDescriptor,
    dictionary: Option<&Dictionary>,
    present: usize,
) -> Result<ValueBatch> {
    let physical_type = descriptor.physical_type();
    let values = match encoding {
        Encoding::Plain => decode_plain(bytes, physical_type, present)?,
        Encoding::PlainDictionary | Encoding::RleDictionary => {
            decode_dictionary_indices(bytes, dictionary, present)?
        }
        Encoding::DeltaBinaryPacked => decode_delta_integers(bytes, physical_type, present)?,
        Encoding::DeltaLengthByteArray => decode_delta_length_byte_array(bytes, present)?,
        Encoding::DeltaByteArray => decode_delta_byte_array(bytes, present)?,
        Encoding::ByteStreamSplit => decode_byte_stream_split(bytes, physical_type, present)?,
        Encoding::Rle | Encoding::BitPacked => {
            return Err(Error::unsupported(format!(
                "value encoding {:?} is not supported",
                encoding
            )))
        }
    };
    if values.len() != present {
        return Err(Error::corrupt(format!(
            "a page decoded {} values but its levels mark {} as present",
            values.len(),
            present
        )));
    }
    Ok(values)
}
