use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, TryRecvError};

use crate::compression::CodecRegistry;
use crate::error::{Error, Result};
use crate::page::{DecodedPage, PageInfo};

use super::decode::decode_page;

/// Prefetch depth a cursor starts with.
pub(crate) const INITIAL_PREFETCH_DEPTH: usize = 4;
/// Hard cap on the prefetch depth.
pub(crate) const PREFETCH_DEPTH_CAP: usize = 8;

/// A per-column cursor over decoded pages.
///
/// Pages are decoded on the shared worker pool; the cursor keeps a bounded
/// FIFO of in-flight decodes and always joins them in file order. The
/// prefetch depth is adaptive: every miss (an empty queue while pages
/// remain, or joining a decode that has not finished) grows the depth by
/// one, up to the cap. Hits never shrink it, so slow columns keep the
/// extra parallelism they accumulated.
pub struct PageCursor {
    pages: VecDeque<PageInfo>,
    queue: VecDeque<Receiver<Result<DecodedPage>>>,
    pool: Arc<rayon::ThreadPool>,
    codecs: Arc<CodecRegistry>,
    closed: Arc<AtomicBool>,
    target_depth: usize,
    misses: usize,
    column: String,
}

impl PageCursor {
    pub fn new(
        pages: Vec<PageInfo>,
        pool: Arc<rayon::ThreadPool>,
        codecs: Arc<CodecRegistry>,
        closed: Arc<AtomicBool>,
    ) -> Self {
        let column = pages
            .first()
            .map(|info| info.descriptor().path_string())
            .unwrap_or_default();
        let mut this = Self {
            pages: pages.into(),
            queue: VecDeque::new(),
            pool,
            codecs,
            closed,
            target_depth: INITIAL_PREFETCH_DEPTH,
            misses: 0,
            column,
        };
        this.fill();
        this
    }

    /// Submits pending pages to the pool until the queue holds
    /// `target_depth` in-flight decodes or no pages remain.
    fn fill(&mut self) {
        while self.queue.len() < self.target_depth {
            let info = match self.pages.pop_front() {
                Some(info) => info,
                None => break,
            };
            let (sender, receiver) = bounded(1);
            let codecs = self.codecs.clone();
            let closed = self.closed.clone();
            self.pool.spawn(move || {
                if closed.load(Ordering::Relaxed) {
                    // cancelled; drop the page slice without decoding
                    return;
                }
                // the receiver may be gone if the cursor was dropped
                let _ = sender.send(decode_page(&info, &codecs));
            });
            self.queue.push_back(receiver);
        }
    }

    fn on_miss(&mut self) {
        self.misses += 1;
        if self.target_depth < PREFETCH_DEPTH_CAP {
            self.target_depth += 1;
            log::debug!(
                "column {}: prefetch miss, growing depth to {}",
                self.column,
                self.target_depth
            );
        }
    }

    /// Returns the next page in file order, or `None` once the column is
    /// exhausted. Blocks only if the front decode has not finished.
    pub fn next_page(&mut self) -> Result<Option<DecodedPage>> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(Error::Io("the reader was closed".to_string()));
        }
        let receiver = match self.queue.pop_front() {
            Some(receiver) => receiver,
            None => {
                // nothing in flight: decode synchronously if pages remain
                let info = match self.pages.pop_front() {
                    Some(info) => info,
                    None => return Ok(None),
                };
                self.on_miss();
                let page = decode_page(&info, &self.codecs)?;
                self.fill();
                return Ok(Some(page));
            }
        };
        let page = match receiver.try_recv() {
            Ok(result) => result?,
            Err(TryRecvError::Empty) => {
                self.on_miss();
                receiver
                    .recv()
                    .map_err(|_| Error::Io("the reader was closed".to_string()))??
            }
            Err(TryRecvError::Disconnected) => {
                return Err(Error::Io("the reader was closed".to_string()))
            }
        };
        self.fill();
        Ok(Some(page))
    }

    /// The current prefetch target depth.
    pub fn target_depth(&self) -> usize {
        self.target_depth
    }

    /// The number of misses observed so far.
    pub fn misses(&self) -> usize {
        self.misses
    }
}
