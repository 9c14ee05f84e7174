/// Errors surfaced by this crate.
///
/// All variants carry an owned message so that errors can be latched by a
/// reader and returned again on every subsequent call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Underlying file or mapping failure.
    Io(String),
    /// The file is known to be out of spec: bad header, truncated stream,
    /// count mismatch between levels and values, CRC mismatch.
    Corrupt(String),
    /// The file uses a feature this reader recognizes but does not
    /// implement, such as a codec whose feature is not active or an
    /// encrypted column.
    Unsupported(String),
    /// A requested column does not exist in the file or is not part of the
    /// active projection.
    Schema(String),
    /// A typed accessor was used against a column of an incompatible
    /// physical type.
    Type(String),
    /// A non-nullable accessor was used on a null value.
    NullAccess(String),
}

impl Error {
    pub(crate) fn corrupt<S: Into<String>>(message: S) -> Self {
        Self::Corrupt(message.into())
    }

    pub(crate) fn unsupported<S: Into<String>>(message: S) -> Self {
        Self::Unsupported(message.into())
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Io(message) => write!(fmt, "io: {}", message),
            Error::Corrupt(message) => write!(fmt, "corrupt file: {}", message),
            Error::Unsupported(message) => write!(fmt, "unsupported: {}", message),
            Error::Schema(message) => write!(fmt, "schema: {}", message),
            Error::Type(message) => write!(fmt, "type: {}", message),
            Error::NullAccess(message) => write!(fmt, "null access: {}", message),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(format!("underlying IO error: {}", e))
    }
}

impl From<parquet_format_safe::thrift::Error> for Error {
    fn from(e: parquet_format_safe::thrift::Error) -> Error {
        Error::Corrupt(format!("underlying thrift error: {}", e))
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(e: std::num::TryFromIntError) -> Error {
        Error::Corrupt(format!("number out of range: {}", e))
    }
}

/// A specialized `Result` for this crate's errors.
pub type Result<T> = std::result::Result<T, Error>;
