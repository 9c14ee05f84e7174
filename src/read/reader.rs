use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use crate::compression::CodecRegistry;
use crate::error::{Error, Result};
use crate::metadata::{ColumnDescriptor, FileMetaData};
use crate::page::{PageInfo, ValueBatch};
use crate::record::{build_assembly, Assembly, ColumnLevels, RecordAssembler, Row};
use crate::schema::types::SchemaNode;
use crate::schema::Repetition;

use super::assembly::{AssemblyBuffer, ColumnBatch};
use super::cursor::PageCursor;
use super::metadata::read_metadata;
use super::scanner::scan_column_chunk;

/// Default number of records per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// An open Parquet file: the read-only mapping, its parsed metadata, the
/// shared worker pool and the decompressor lookup. All row readers of a
/// file share these.
pub struct FileReader {
    mapping: Bytes,
    metadata: Arc<FileMetaData>,
    pool: Arc<rayon::ThreadPool>,
    codecs: Arc<CodecRegistry>,
    closed: Arc<AtomicBool>,
}

impl FileReader {
    /// Opens a file from its parts: a byte region covering the whole file
    /// (typically a memory mapping), parsed metadata, an executor and a
    /// decompressor lookup.
    pub fn new(
        mapping: Bytes,
        metadata: FileMetaData,
        pool: Arc<rayon::ThreadPool>,
        codecs: CodecRegistry,
    ) -> Self {
        Self {
            mapping,
            metadata: Arc::new(metadata),
            pool,
            codecs: Arc::new(codecs),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Memory-maps the file at `path`, reads its footer and opens it with
    /// a default worker pool and the built-in codecs.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mapping = map_file(&file)?;
        let metadata = read_metadata(&mapping)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .build()
            .map_err(|e| Error::Io(format!("cannot build the worker pool: {}", e)))?;
        Ok(Self::new(
            mapping,
            metadata,
            Arc::new(pool),
            CodecRegistry::new(),
        ))
    }

    pub fn metadata(&self) -> &FileMetaData {
        &self.metadata
    }

    /// Closes the file: every reader observes the flag at its next await
    /// and returns an error. In-flight decodes may complete and their
    /// output is discarded.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    /// Creates a row reader over the projected top-level fields, or over
    /// all fields when `projection` is `None`.
    pub fn row_reader(&self, projection: Option<&[&str]>) -> Result<RowReader> {
        self.row_reader_with_batch_size(projection, DEFAULT_BATCH_SIZE)
    }

    pub fn row_reader_with_batch_size(
        &self,
        projection: Option<&[&str]>,
        batch_size: usize,
    ) -> Result<RowReader> {
        if batch_size == 0 {
            return Err(Error::Schema("the batch size must be positive".to_string()));
        }
        let schema = self.metadata.schema_descr();

        // resolve the projection to top-level field indices, schema order
        let fields = schema.fields();
        let projected: Vec<usize> = match projection {
            None => (0..fields.len()).collect(),
            Some(names) => {
                for name in names {
                    if !fields.iter().any(|field| field.name() == *name) {
                        return Err(Error::Schema(format!(
                            "the file has no top-level field named {:?}",
                            name
                        )));
                    }
                }
                (0..fields.len())
                    .filter(|i| names.contains(&fields[*i].name()))
                    .collect()
            }
        };
        if projected.is_empty() {
            return Err(Error::Schema("the projection is empty".to_string()));
        }

        let projected_fields: Vec<SchemaNode> =
            projected.iter().map(|i| fields[*i].clone()).collect();
        let field_names: Vec<String> = projected_fields
            .iter()
            .map(|field| field.name().to_string())
            .collect();

        // leaves of the projection, in depth-first (file) order
        let leaves: Vec<usize> = projected
            .iter()
            .flat_map(|field| schema.leaves_of_field(*field))
            .collect();

        let is_flat = projected_fields.iter().all(|field| {
            !field.is_group() && field.repetition() != Repetition::Repeated
        });

        let mode = if is_flat {
            let mut columns = vec![];
            for leaf in &leaves {
                let descriptor = schema.column(*leaf).clone();
                let cursor = self.cursor_for_leaf(*leaf)?;
                let buffer = AssemblyBuffer::spawn(
                    cursor,
                    descriptor.clone(),
                    batch_size,
                    self.closed.clone(),
                );
                columns.push(FlatColumn {
                    buffer,
                    batch: None,
                });
            }
            Mode::Flat(FlatReader { columns })
        } else {
            let assembly = build_assembly(&projected_fields)?;
            let mut columns = vec![];
            for leaf in &leaves {
                let descriptor = schema.column(*leaf).clone();
                let cursor = self.cursor_for_leaf(*leaf)?;
                columns.push(NestedColumn {
                    cursor,
                    rep: vec![],
                    def: vec![],
                    values: ValueBatch::for_type(descriptor.physical_type()),
                    num_values: 0,
                    exhausted: false,
                    descriptor,
                });
            }
            Mode::Nested(NestedReader {
                assembly,
                columns,
                rows: vec![],
            })
        };

        Ok(RowReader {
            mode,
            field_names,
            batch_size,
            batch_len: 0,
            remaining: 0,
            current: None,
            closed: self.closed.clone(),
            error: None,
        })
    }

    /// Scans all row groups of one leaf column into a single page cursor.
    fn cursor_for_leaf(&self, leaf: usize) -> Result<PageCursor> {
        let mut pages: Vec<PageInfo> = vec![];
        for row_group in self.metadata.row_groups() {
            let column = &row_group.columns()[leaf];
            let (start, length) = column.byte_range()?;
            let (start, length) = (start as usize, length as usize);
            if start + length > self.mapping.len() {
                return Err(Error::Corrupt(format!(
                    "column {} declares bytes {}..{} beyond the file size {}",
                    column.descriptor().path_string(),
                    start,
                    start + length,
                    self.mapping.len()
                )));
            }
            let chunk = self.mapping.slice(start..start + length);
            pages.extend(scan_column_chunk(chunk, column, &self.codecs)?);
        }
        Ok(PageCursor::new(
            pages,
            self.pool.clone(),
            self.codecs.clone(),
            self.closed.clone(),
        ))
    }
}

#[allow(unsafe_code)]
fn map_file(file: &std::fs::File) -> Result<Bytes> {
    // the mapping is read-only and lives as long as the returned Bytes
    let mapping = unsafe { memmap2::Mmap::map(file) }?;
    Ok(Bytes::from_owner(mapping))
}

struct FlatColumn {
    buffer: AssemblyBuffer,
    batch: Option<ColumnBatch>,
}

struct FlatReader {
    columns: Vec<FlatColumn>,
}

struct NestedColumn {
    cursor: PageCursor,
    rep: Vec<u16>,
    def: Vec<u16>,
    values: ValueBatch,
    num_values: usize,
    exhausted: bool,
    descriptor: ColumnDescriptor,
}

impl NestedColumn {
    /// Records whose boundaries are certain: a record is complete once a
    /// later value starts a new one, or the column is exhausted.
    fn complete_records(&self) -> usize {
        let started = if self.rep.is_empty() {
            self.num_values
        } else {
            self.rep.iter().filter(|rep| **rep == 0).count()
        };
        if self.exhausted || self.descriptor.max_rep_level() == 0 {
            started
        } else {
            started.saturating_sub(1)
        }
    }

    /// Pulls pages until `target` records are buffered or the column ends.
    fn buffer_records(&mut self, target: usize) -> Result<()> {
        while !self.exhausted && self.complete_records() < target {
            match self.cursor.next_page()? {
                Some(page) => {
                    let max_rep = self.descriptor.max_rep_level();
                    let max_def = self.descriptor.max_def_level();
                    if max_rep > 0 {
                        if page.rep.len() != page.num_values {
                            return Err(Error::corrupt(
                                "a page is missing its repetition levels",
                            ));
                        }
                        self.rep.extend_from_slice(&page.rep);
                    }
                    if max_def > 0 {
                        if page.def.len() != page.num_values {
                            return Err(Error::corrupt(
                                "a page is missing its definition levels",
                            ));
                        }
                        self.def.extend_from_slice(&page.def);
                    }
                    self.num_values += page.num_values;
                    self.values.append(page.values);
                }
                None => self.exhausted = true,
            }
        }
        Ok(())
    }

    /// Splits off exactly `n` records from the front of the buffer.
    fn take_records(&mut self, n: usize) -> ColumnLevels {
        let max_def = self.descriptor.max_def_level() as u16;

        // level-slot boundary: the start of record `n`
        let end = if self.rep.is_empty() {
            n
        } else {
            let mut records = 0;
            let mut end = self.rep.len();
            for (i, rep) in self.rep.iter().enumerate() {
                if *rep == 0 {
                    if records == n {
                        end = i;
                        break;
                    }
                    records += 1;
                }
            }
            end
        };

        let rep: Vec<u16> = if self.rep.is_empty() {
            vec![]
        } else {
            self.rep.drain(..end).collect()
        };
        let def: Vec<u16> = if self.def.is_empty() {
            vec![]
        } else {
            self.def.drain(..end).collect()
        };
        let present = if self.def.is_empty() && def.is_empty() {
            end
        } else {
            def.iter().filter(|d| **d == max_def).count()
        };
        let values = self.values.take_front(present);
        self.num_values -= end;

        ColumnLevels {
            rep,
            def,
            values,
            num_values: end,
        }
    }
}

struct NestedReader {
    assembly: Assembly,
    columns: Vec<NestedColumn>,
    rows: Vec<Row>,
}

enum Mode {
    Flat(FlatReader),
    Nested(NestedReader),
}

/// A lazy, non-restartable reader of rows. `next()` advances to the next
/// row and returns whether one exists; typed accessors read the current
/// row. A terminal error renders the reader unusable: every subsequent
/// call returns the same error.
pub struct RowReader {
    mode: Mode,
    field_names: Vec<String>,
    batch_size: usize,
    batch_len: usize,
    /// rows of the current batch not yet served
    remaining: usize,
    /// index of the current row within the batch; `None` until `next()`
    /// establishes one
    current: Option<usize>,
    closed: Arc<AtomicBool>,
    error: Option<Error>,
}

impl RowReader {
    fn check_usable(&self) -> Result<()> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        if self.closed.load(Ordering::Relaxed) {
            return Err(Error::Io("the reader was closed".to_string()));
        }
        Ok(())
    }

    fn latch<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.error = Some(e.clone());
        }
        result
    }

    /// Whether another row is available. Loads the next batch when the
    /// current one is exhausted.
    pub fn has_next(&mut self) -> Result<bool> {
        self.check_usable()?;
        if self.remaining > 0 {
            return Ok(true);
        }
        let loaded = self.load_batch();
        self.latch(loaded)
    }

    /// Advances to the next row. Returns `false` at the end of the file.
    pub fn next(&mut self) -> Result<bool> {
        if !self.has_next()? {
            return Ok(false);
        }
        self.current = Some(self.batch_len - self.remaining);
        self.remaining -= 1;
        Ok(true)
    }

    fn load_batch(&mut self) -> Result<bool> {
        let batch_size = self.batch_size;
        let len = match &mut self.mode {
            Mode::Flat(flat) => flat.load_batch()?,
            Mode::Nested(nested) => nested.load_batch(batch_size)?,
        };
        self.batch_len = len;
        self.remaining = len;
        // the previous batch is gone; a row becomes current on `next()`
        self.current = None;
        Ok(len > 0)
    }

    fn current_row(&self) -> Result<usize> {
        self.current
            .ok_or_else(|| Error::Io("no row is current; call next() first".to_string()))
    }

    /// The projected top-level field names, in output order.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.field_names
            .iter()
            .position(|field| field == name)
            .ok_or_else(|| {
                Error::Schema(format!(
                    "the projection has no top-level field named {:?}",
                    name
                ))
            })
    }

    /// The current row of a nested reader as a materialized record.
    pub fn row(&self) -> Result<&Row> {
        match &self.mode {
            Mode::Nested(nested) => nested
                .rows
                .get(self.current_row()?)
                .ok_or_else(|| Error::Io("no row is current; call next() first".to_string())),
            Mode::Flat(_) => Err(Error::Type(
                "a flat reader exposes columns, not materialized rows".to_string(),
            )),
        }
    }

    fn flat_column(&self, index: usize) -> Result<&ColumnBatch> {
        match &self.mode {
            Mode::Flat(flat) => {
                let column = flat.columns.get(index).ok_or_else(|| {
                    Error::Schema(format!("the projection has no column at index {}", index))
                })?;
                column
                    .batch
                    .as_ref()
                    .ok_or_else(|| Error::Io("no row is current; call next() first".to_string()))
            }
            Mode::Nested(_) => Err(Error::Type(
                "a nested reader exposes rows, not flat columns".to_string(),
            )),
        }
    }

    /// Whether the current row's value of column `index` is null.
    pub fn is_null_by_index(&self, index: usize) -> Result<bool> {
        match &self.mode {
            Mode::Flat(_) => {
                let batch = self.flat_column(index)?;
                Ok(batch.is_null(self.current_row()?))
            }
            Mode::Nested(_) => Ok(self.row()?.get_by_index(index)?.is_null()),
        }
    }

    pub fn is_null(&self, name: &str) -> Result<bool> {
        self.is_null_by_index(self.column_index(name)?)
    }

    pub fn get_bool_by_index(&self, index: usize) -> Result<bool> {
        match &self.mode {
            Mode::Flat(_) => {
                let batch = self.flat_column(index)?;
                let row = self.current_row()?;
                self.not_null(batch, index)?;
                match &batch.values {
                    ValueBatch::Bool(values) => Ok(values[row]),
                    other => Err(self.wrong_type(index, other, "bool")),
                }
            }
            Mode::Nested(_) => self.row()?.get_by_index(index)?.as_bool(),
        }
    }

    pub fn get_i32_by_index(&self, index: usize) -> Result<i32> {
        match &self.mode {
            Mode::Flat(_) => {
                let batch = self.flat_column(index)?;
                let row = self.current_row()?;
                self.not_null(batch, index)?;
                match &batch.values {
                    ValueBatch::Int32(values) => Ok(values[row]),
                    other => Err(self.wrong_type(index, other, "i32")),
                }
            }
            Mode::Nested(_) => self.row()?.get_by_index(index)?.as_int(),
        }
    }

    pub fn get_i64_by_index(&self, index: usize) -> Result<i64> {
        match &self.mode {
            Mode::Flat(_) => {
                let batch = self.flat_column(index)?;
                let row = self.current_row()?;
                self.not_null(batch, index)?;
                match &batch.values {
                    ValueBatch::Int64(values) => Ok(values[row]),
                    other => Err(self.wrong_type(index, other, "i64")),
                }
            }
            Mode::Nested(_) => self.row()?.get_by_index(index)?.as_long(),
        }
    }

    pub fn get_f32_by_index(&self, index: usize) -> Result<f32> {
        match &self.mode {
            Mode::Flat(_) => {
                let batch = self.flat_column(index)?;
                let row = self.current_row()?;
                self.not_null(batch, index)?;
                match &batch.values {
                    ValueBatch::Float(values) => Ok(values[row]),
                    other => Err(self.wrong_type(index, other, "f32")),
                }
            }
            Mode::Nested(_) => self.row()?.get_by_index(index)?.as_float(),
        }
    }

    pub fn get_f64_by_index(&self, index: usize) -> Result<f64> {
        match &self.mode {
            Mode::Flat(_) => {
                let batch = self.flat_column(index)?;
                let row = self.current_row()?;
                self.not_null(batch, index)?;
                match &batch.values {
                    ValueBatch::Double(values) => Ok(values[row]),
                    other => Err(self.wrong_type(index, other, "f64")),
                }
            }
            Mode::Nested(_) => self.row()?.get_by_index(index)?.as_double(),
        }
    }

    pub fn get_bytes_by_index(&self, index: usize) -> Result<&[u8]> {
        match &self.mode {
            Mode::Flat(_) => {
                let batch = self.flat_column(index)?;
                let row = self.current_row()?;
                self.not_null(batch, index)?;
                batch
                    .values
                    .binary_value(row)
                    .ok_or_else(|| self.wrong_type(index, &batch.values, "bytes"))
            }
            Mode::Nested(_) => self.row()?.get_by_index(index)?.as_bytes(),
        }
    }

    pub fn get_str_by_index(&self, index: usize) -> Result<&str> {
        match &self.mode {
            Mode::Flat(_) => {
                let bytes = self.get_bytes_by_index(index)?;
                std::str::from_utf8(bytes)
                    .map_err(|_| Error::corrupt("a string value holds invalid UTF-8"))
            }
            Mode::Nested(_) => self.row()?.get_by_index(index)?.as_str(),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        self.get_bool_by_index(self.column_index(name)?)
    }

    pub fn get_i32(&self, name: &str) -> Result<i32> {
        self.get_i32_by_index(self.column_index(name)?)
    }

    pub fn get_i64(&self, name: &str) -> Result<i64> {
        self.get_i64_by_index(self.column_index(name)?)
    }

    pub fn get_f32(&self, name: &str) -> Result<f32> {
        self.get_f32_by_index(self.column_index(name)?)
    }

    pub fn get_f64(&self, name: &str) -> Result<f64> {
        self.get_f64_by_index(self.column_index(name)?)
    }

    pub fn get_bytes(&self, name: &str) -> Result<&[u8]> {
        self.get_bytes_by_index(self.column_index(name)?)
    }

    pub fn get_str(&self, name: &str) -> Result<&str> {
        self.get_str_by_index(self.column_index(name)?)
    }

    fn not_null(&self, batch: &ColumnBatch, index: usize) -> Result<()> {
        if batch.is_null(self.current_row()?) {
            Err(Error::NullAccess(format!(
                "column {:?} is null at the current row",
                self.field_names[index]
            )))
        } else {
            Ok(())
        }
    }

    fn wrong_type(&self, index: usize, batch: &ValueBatch, expected: &str) -> Error {
        let actual = match batch {
            ValueBatch::Bool(_) => "bool",
            ValueBatch::Int32(_) => "i32",
            ValueBatch::Int64(_) => "i64",
            ValueBatch::Int96(_) => "i96",
            ValueBatch::Float(_) => "f32",
            ValueBatch::Double(_) => "f64",
            ValueBatch::Binary { .. } => "bytes",
        };
        Error::Type(format!(
            "column {:?} holds {} values, not {}",
            self.field_names[index], actual, expected
        ))
    }
}

impl FlatReader {
    fn load_batch(&mut self) -> Result<usize> {
        let mut len: Option<usize> = None;
        let mut finished = 0usize;
        for column in self.columns.iter_mut() {
            let previous = column.batch.take();
            let batch = column.buffer.await_next_batch(previous)?;
            match &batch {
                Some(batch) => match len {
                    Some(len) if len != batch.len => {
                        return Err(Error::corrupt(
                            "columns disagree on the record count of a batch",
                        ))
                    }
                    _ => len = Some(batch.len),
                },
                None => finished += 1,
            }
            column.batch = batch;
        }
        if finished == self.columns.len() {
            return Ok(0);
        }
        if finished > 0 {
            return Err(Error::corrupt(
                "columns disagree on the record count of a batch",
            ));
        }
        Ok(len.unwrap_or(0))
    }
}

impl NestedReader {
    fn load_batch(&mut self, batch_size: usize) -> Result<usize> {
        for column in self.columns.iter_mut() {
            column.buffer_records(batch_size)?;
        }
        // all columns must agree on how many records are available
        let available: Vec<usize> = self
            .columns
            .iter()
            .map(|column| column.complete_records().min(batch_size))
            .collect();
        let n = available[0];
        if available.iter().any(|count| *count != n) {
            return Err(Error::corrupt(
                "columns disagree on the record count of a batch",
            ));
        }
        if n == 0 {
            self.rows = vec![];
            return Ok(0);
        }

        let columns: Vec<ColumnLevels> = self
            .columns
            .iter_mut()
            .map(|column| column.take_records(n))
            .collect();

        let assembler = RecordAssembler::new(&self.assembly);
        self.rows = assembler.assemble(&columns)?;
        Ok(self.rows.len())
    }
}
