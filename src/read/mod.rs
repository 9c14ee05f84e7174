mod assembly;
mod cursor;
mod decode;
mod metadata;
mod reader;
mod scanner;

pub use assembly::{AssemblyBuffer, ColumnBatch};
pub use cursor::PageCursor;
pub use decode::decode_page;
pub use metadata::{deserialize_metadata, read_metadata};
pub use reader::{FileReader, RowReader, DEFAULT_BATCH_SIZE};
pub use scanner::scan_column_chunk;
