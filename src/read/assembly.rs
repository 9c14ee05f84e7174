use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::encoding::ceil8;
use crate::error::{Error, Result};
use crate::metadata::ColumnDescriptor;
use crate::page::ValueBatch;

use super::cursor::PageCursor;

/// Ready batches a producer may buffer ahead of the consumer.
pub(crate) const READY_QUEUE_CAPACITY: usize = 2;
/// Value arrays circulating between the pool, the producer and the ready
/// queue.
pub(crate) const ARRAY_POOL_CAPACITY: usize = 3;

/// One flat column's worth of a batch: positional values (holes filled
/// with defaults) plus a validity bitmap for optional columns.
#[derive(Debug)]
pub struct ColumnBatch {
    pub values: ValueBatch,
    /// One bit per row, least significant first; `None` when the column
    /// cannot hold nulls.
    pub validity: Option<Vec<u8>>,
    pub len: usize,
}

impl ColumnBatch {
    pub fn is_null(&self, row: usize) -> bool {
        match &self.validity {
            Some(validity) => validity[row / 8] >> (row % 8) & 1 == 0,
            None => false,
        }
    }
}

type Buffers = (ValueBatch, Option<Vec<u8>>);

/// A single-producer/single-consumer buffer assembling decoded pages of
/// one flat column into batches of `batch_capacity` records.
///
/// A dedicated worker pulls pages from the cursor and appends them into a
/// pre-allocated array taken from a small pool; full batches go through a
/// bounded ready queue, which is also the back-pressure toward decoding.
/// The null bitmap is built while values are copied, so publishing a batch
/// requires no second pass.
pub struct AssemblyBuffer {
    ready: Receiver<Result<ColumnBatch>>,
    pool: Sender<Buffers>,
    handle: Option<JoinHandle<()>>,
    finished: bool,
    error: Option<Error>,
}

impl AssemblyBuffer {
    pub fn spawn(
        cursor: PageCursor,
        descriptor: ColumnDescriptor,
        batch_capacity: usize,
        closed: Arc<AtomicBool>,
    ) -> Self {
        let (ready_sender, ready) = bounded(READY_QUEUE_CAPACITY);
        let (pool, pool_receiver) = bounded::<Buffers>(ARRAY_POOL_CAPACITY);

        let nullable = descriptor.max_def_level() > 0;
        for _ in 0..ARRAY_POOL_CAPACITY {
            let _ = pool.send((
                ValueBatch::for_type(descriptor.physical_type()),
                nullable.then(Vec::new),
            ));
        }

        let handle = std::thread::spawn(move || {
            produce(
                cursor,
                descriptor,
                batch_capacity,
                closed,
                ready_sender,
                pool_receiver,
            )
        });

        Self {
            ready,
            pool,
            handle: Some(handle),
            finished: false,
            error: None,
        }
    }

    /// Returns the arrays of the previous batch to the pool, then blocks
    /// for the next batch. `None` means the column is exhausted. A
    /// producer-side error is latched and re-raised on every call.
    pub fn await_next_batch(&mut self, previous: Option<ColumnBatch>) -> Result<Option<ColumnBatch>> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        if let Some(previous) = previous {
            // never blocks: only buffers we handed out come back
            let _ = self.pool.try_send((previous.values, previous.validity));
        }
        if self.finished {
            return Ok(None);
        }
        match self.ready.recv() {
            Ok(Ok(batch)) => Ok(Some(batch)),
            Ok(Err(e)) => {
                self.error = Some(e.clone());
                Err(e)
            }
            Err(_) => {
                self.finished = true;
                Ok(None)
            }
        }
    }
}

impl Drop for AssemblyBuffer {
    fn drop(&mut self) {
        // closing both channel ends unblocks the producer wherever it is
        let (sender, _) = bounded(1);
        let (_, receiver) = bounded(1);
        drop(std::mem::replace(&mut self.pool, sender));
        drop(std::mem::replace(&mut self.ready, receiver));
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn produce(
    mut cursor: PageCursor,
    descriptor: ColumnDescriptor,
    batch_capacity: usize,
    closed: Arc<AtomicBool>,
    ready: Sender<Result<ColumnBatch>>,
    pool: Receiver<Buffers>,
) {
    let max_def = descriptor.max_def_level() as u16;
    // position within the current page: level slot and present-value index
    let mut page = None;
    let mut slot = 0usize;
    let mut present = 0usize;

    'batches: loop {
        let (mut values, mut validity) = match pool.recv() {
            Ok(buffers) => buffers,
            // consumer went away
            Err(_) => return,
        };
        values.clear();
        if let Some(validity) = validity.as_mut() {
            validity.clear();
            validity.resize(ceil8(batch_capacity), 0);
        }
        let mut len = 0usize;

        while len < batch_capacity {
            if closed.load(Ordering::Relaxed) {
                return;
            }
            if page.is_none() {
                match cursor.next_page() {
                    Ok(Some(next)) => {
                        page = Some(next);
                        slot = 0;
                        present = 0;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = ready.send(Err(e));
                        return;
                    }
                }
            }
            let current = page.as_ref().unwrap();
            while len < batch_capacity && slot < current.num_values {
                let is_present = max_def == 0 || current.def[slot] == max_def;
                if is_present {
                    values.push_from(&current.values, present);
                    present += 1;
                    if let Some(validity) = validity.as_mut() {
                        validity[len / 8] |= 1 << (len % 8);
                    }
                } else {
                    values.push_default();
                }
                slot += 1;
                len += 1;
            }
            if slot == current.num_values {
                page = None;
            }
        }

        if len == 0 {
            // end of column with nothing buffered
            return;
        }
        log::debug!(
            "column {}: publishing batch of {} records",
            descriptor.path_string(),
            len
        );
        let batch = ColumnBatch {
            values,
            validity,
            len,
        };
        let exhausted = len < batch_capacity;
        if ready.send(Ok(batch)).is_err() {
            return;
        }
        if exhausted {
            break 'batches;
        }
    }
}
