use std::collections::HashMap;
use std::sync::Arc;

pub use crate::thrift_bridge::Compression;

use crate::error::{Error, Result};

/// Parquet decompression codec interface.
pub trait Codec: std::fmt::Debug {
    /// Decompresses data stored in slice `input_buf` and writes output to
    /// `output_buf`. The output buffer must be pre-sized to the exact
    /// uncompressed length.
    fn decompress(&mut self, input_buf: &[u8], output_buf: &mut [u8]) -> Result<()>;
}

/// Given the compression type `codec`, returns a codec used to decompress
/// bytes of that compression type.
/// This returns `None` if the codec type is `UNCOMPRESSED`.
pub fn create_codec(codec: Compression) -> Result<Option<Box<dyn Codec>>> {
    match codec {
        #[cfg(feature = "brotli")]
        Compression::Brotli => Ok(Some(Box::new(BrotliCodec::new()))),
        #[cfg(feature = "gzip")]
        Compression::Gzip => Ok(Some(Box::new(GZipCodec::new()))),
        #[cfg(feature = "snappy")]
        Compression::Snappy => Ok(Some(Box::new(SnappyCodec::new()))),
        #[cfg(feature = "lz4")]
        Compression::Lz4 => Ok(Some(Box::new(Lz4Codec::new()))),
        #[cfg(feature = "lz4")]
        Compression::Lz4Raw => Ok(Some(Box::new(Lz4RawCodec::new()))),
        #[cfg(feature = "zstd")]
        Compression::Zstd => Ok(Some(Box::new(ZstdCodec::new()))),
        Compression::Uncompressed => Ok(None),
        _ => Err(Error::unsupported(format!(
            "compression {:?} is not installed",
            codec
        ))),
    }
}

/// The decompressor lookup handed to [`crate::read::FileReader`] at open
/// time. The default registry is the table of built-in codecs; hosts may
/// override individual entries.
#[derive(Default, Clone)]
pub struct CodecRegistry {
    overrides: HashMap<Compression, Arc<dyn Fn() -> Box<dyn Codec> + Send + Sync>>,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("CodecRegistry")
            .field("overrides", &self.overrides.keys())
            .finish()
    }
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the codec used for `compression` with a host-provided one.
    pub fn register<F: Fn() -> Box<dyn Codec> + Send + Sync + 'static>(
        &mut self,
        compression: Compression,
        factory: F,
    ) {
        self.overrides.insert(compression, Arc::new(factory));
    }

    /// Returns a codec for `compression`, or `None` for `UNCOMPRESSED`.
    pub fn create(&self, compression: Compression) -> Result<Option<Box<dyn Codec>>> {
        if let Some(factory) = self.overrides.get(&compression) {
            return Ok(Some(factory()));
        }
        create_codec(compression)
    }

    /// Decompresses `input` into a new buffer of exactly
    /// `uncompressed_len` bytes.
    pub fn decompress(
        &self,
        compression: Compression,
        input: &[u8],
        uncompressed_len: usize,
    ) -> Result<Vec<u8>> {
        match self.create(compression)? {
            Some(mut codec) => {
                let mut decompressed = vec![0; uncompressed_len];
                codec.decompress(input, &mut decompressed)?;
                Ok(decompressed)
            }
            None => Ok(input.to_vec()),
        }
    }
}

#[cfg(feature = "snappy")]
mod snappy_codec {
    use snap::raw::{decompress_len, Decoder};

    use crate::compression::Codec;
    use crate::error::{Error, Result};

    /// Codec for Snappy compression format.
    #[derive(Debug)]
    pub struct SnappyCodec {
        decoder: Decoder,
    }

    impl SnappyCodec {
        pub(crate) fn new() -> Self {
            Self {
                decoder: Decoder::new(),
            }
        }
    }

    impl From<snap::Error> for Error {
        fn from(e: snap::Error) -> Error {
            Error::Corrupt(format!("underlying snap error: {}", e))
        }
    }

    impl Codec for SnappyCodec {
        fn decompress(&mut self, input_buf: &[u8], output_buf: &mut [u8]) -> Result<()> {
            let len = decompress_len(input_buf)?;
            if len > output_buf.len() {
                return Err(Error::Corrupt(format!(
                    "snappy stream declares {} bytes but the page header promised {}",
                    len,
                    output_buf.len()
                )));
            }
            self.decoder
                .decompress(input_buf, output_buf)
                .map_err(|e| e.into())
                .map(|_| ())
        }
    }
}
#[cfg(feature = "snappy")]
pub use snappy_codec::*;

#[cfg(feature = "gzip")]
mod gzip_codec {
    use std::io::Read;

    use flate2::read;

    use crate::compression::Codec;
    use crate::error::Result;

    /// Codec for GZIP compression algorithm.
    #[derive(Debug)]
    pub struct GZipCodec {}

    impl GZipCodec {
        pub(crate) fn new() -> Self {
            Self {}
        }
    }

    impl Codec for GZipCodec {
        fn decompress(&mut self, input_buf: &[u8], output_buf: &mut [u8]) -> Result<()> {
            let mut decoder = read::GzDecoder::new(input_buf);
            decoder.read_exact(output_buf).map_err(|e| e.into())
        }
    }
}
#[cfg(feature = "gzip")]
pub use gzip_codec::*;

#[cfg(feature = "brotli")]
mod brotli_codec {
    use std::io::Read;

    use crate::compression::Codec;
    use crate::error::Result;

    const BROTLI_DEFAULT_BUFFER_SIZE: usize = 4096;

    /// Codec for Brotli compression algorithm.
    #[derive(Debug)]
    pub struct BrotliCodec {}

    impl BrotliCodec {
        pub(crate) fn new() -> Self {
            Self {}
        }
    }

    impl Codec for BrotliCodec {
        fn decompress(&mut self, input_buf: &[u8], output_buf: &mut [u8]) -> Result<()> {
            brotli::Decompressor::new(input_buf, BROTLI_DEFAULT_BUFFER_SIZE)
                .read_exact(output_buf)
                .map_err(|e| e.into())
        }
    }
}
#[cfg(feature = "brotli")]
pub use brotli_codec::*;

#[cfg(feature = "lz4")]
mod lz4_codec {
    use std::io::Read;

    use crate::compression::Codec;
    use crate::error::{Error, Result};

    /// Codec for the LZ4 frame format.
    #[derive(Debug)]
    pub struct Lz4Codec {}

    impl Lz4Codec {
        pub(crate) fn new() -> Self {
            Self {}
        }
    }

    impl Codec for Lz4Codec {
        fn decompress(&mut self, input_buf: &[u8], output_buf: &mut [u8]) -> Result<()> {
            let mut decoder = lz4::Decoder::new(input_buf)?;
            decoder.read_exact(output_buf).map_err(|e| e.into())
        }
    }

    /// Codec for raw (frameless) LZ4 blocks, `LZ4_RAW` in the format.
    #[derive(Debug)]
    pub struct Lz4RawCodec {}

    impl Lz4RawCodec {
        pub(crate) fn new() -> Self {
            Self {}
        }
    }

    impl Codec for Lz4RawCodec {
        fn decompress(&mut self, input_buf: &[u8], output_buf: &mut [u8]) -> Result<()> {
            let size = lz4_flex::block::decompress_into(input_buf, output_buf)
                .map_err(|e| Error::Corrupt(format!("underlying lz4 error: {}", e)))?;
            if size != output_buf.len() {
                return Err(Error::Corrupt(format!(
                    "lz4 block decompressed to {} bytes but the page header promised {}",
                    size,
                    output_buf.len()
                )));
            }
            Ok(())
        }
    }
}
#[cfg(feature = "lz4")]
pub use lz4_codec::*;

#[cfg(feature = "zstd")]
mod zstd_codec {
    use std::io::Read;

    use crate::compression::Codec;
    use crate::error::Result;

    /// Codec for Zstandard compression algorithm.
    #[derive(Debug)]
    pub struct ZstdCodec {}

    impl ZstdCodec {
        pub(crate) fn new() -> Self {
            Self {}
        }
    }

    impl Codec for ZstdCodec {
        fn decompress(&mut self, input_buf: &[u8], output_buf: &mut [u8]) -> Result<()> {
            let mut decoder = zstd::Decoder::new(input_buf)?;
            decoder.read_exact(output_buf).map_err(|e| e.into())
        }
    }
}
#[cfg(feature = "zstd")]
pub use zstd_codec::*;
