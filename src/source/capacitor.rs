//! Capacitor stream: one producer, independent readers
//!
//! Buffers byte chunks from a single producer so that several readers can
//! consume the same data, each at its own pace. A stalled reader never stalls
//! the producer or another reader; chunks every registered reader has
//! consumed are dropped, so lockstep consumers keep memory bounded. Readers
//! must be forked before consumption begins, since trimming only retains
//! chunks a registered reader still needs.

use crate::source::ByteStream;
use bytes::Bytes;
use futures::Stream;
use futures_util::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

const LOG_TARGET: &str = "resono::source::capacitor";

struct State {
    chunks: VecDeque<Bytes>,
    /// Absolute index of `chunks[0]`
    base: u64,
    /// Reader id -> next absolute chunk index it will read
    readers: HashMap<u64, u64>,
    next_reader_id: u64,
    finished: bool,
    error: Option<String>,
    wakers: Vec<Waker>,
    /// Signalled (with a stored permit) when the last reader deregisters,
    /// so a pump blocked on a silent source can stand down
    last_reader_gone: Arc<Notify>,
}

impl State {
    fn wake_all(&mut self) {
        for waker in self.wakers.drain(..) {
            waker.wake();
        }
    }

    /// Drops chunks that every registered reader has consumed.
    fn trim(&mut self) {
        let min_next = match self.readers.values().min() {
            Some(min) => *min,
            None => return,
        };
        while self.base < min_next && !self.chunks.is_empty() {
            self.chunks.pop_front();
            self.base += 1;
        }
    }
}

/// Buffering tee between one byte-stream producer and its readers.
pub struct StreamCapacitor {
    shared: Arc<Mutex<State>>,
}

impl StreamCapacitor {
    pub fn new() -> Self {
        StreamCapacitor {
            shared: Arc::new(Mutex::new(State {
                chunks: VecDeque::new(),
                base: 0,
                readers: HashMap::new(),
                next_reader_id: 0,
                finished: false,
                error: None,
                wakers: Vec::new(),
                last_reader_gone: Arc::new(Notify::new()),
            })),
        }
    }

    /// Forks a new reader starting at the earliest retained chunk.
    pub fn reader(&self) -> CapacitorReader {
        let mut state = self
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let id = state.next_reader_id;
        state.next_reader_id += 1;
        let start = state.base;
        state.readers.insert(id, start);
        CapacitorReader {
            shared: self.shared.clone(),
            id,
            failed: false,
        }
    }

    fn push(&self, chunk: Bytes) {
        let mut state = self
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        trace!(target: LOG_TARGET, "Buffering chunk of {} bytes", chunk.len());
        state.chunks.push_back(chunk);
        state.wake_all();
    }

    fn close(&self) {
        let mut state = self
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.finished = true;
        state.wake_all();
    }

    fn fail(&self, message: String) {
        let mut state = self
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.error = Some(message);
        state.finished = true;
        state.wake_all();
    }

    fn has_readers(&self) -> bool {
        let state = self
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        !state.readers.is_empty()
    }

    /// Spawns the producer task draining `input` into the capacitor. Stops
    /// as soon as every reader has been dropped, even while a read from the
    /// source is pending.
    pub fn spawn_pump(self, mut input: ByteStream) -> JoinHandle<()> {
        tokio::spawn(async move {
            let reader_gone = {
                let state = self
                    .shared
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                state.last_reader_gone.clone()
            };
            loop {
                if !self.has_readers() {
                    debug!(target: LOG_TARGET, "All readers gone; stopping pump");
                    self.close();
                    break;
                }
                tokio::select! {
                    item = input.next() => match item {
                        Some(Ok(chunk)) => self.push(chunk),
                        Some(Err(e)) => {
                            warn!(target: LOG_TARGET, "Producer stream failed: {}", e);
                            self.fail(e.to_string());
                            break;
                        }
                        None => {
                            debug!(target: LOG_TARGET, "Producer stream finished");
                            self.close();
                            break;
                        }
                    },
                    _ = reader_gone.notified() => {
                        // Loop around to the reader-set check
                    }
                }
            }
        })
    }
}

impl Default for StreamCapacitor {
    fn default() -> Self {
        Self::new()
    }
}

/// One consumer of a capacitor. Yields the producer's chunks in order, then
/// ends (or yields the producer's failure once, then ends).
pub struct CapacitorReader {
    shared: Arc<Mutex<State>>,
    id: u64,
    failed: bool,
}

impl Stream for CapacitorReader {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.failed {
            return Poll::Ready(None);
        }

        let mut state = this
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let next = match state.readers.get(&this.id) {
            Some(next) => *next,
            None => return Poll::Ready(None),
        };

        let available = state.base + state.chunks.len() as u64;
        if next < available {
            let chunk = state.chunks[(next - state.base) as usize].clone();
            state.readers.insert(this.id, next + 1);
            state.trim();
            return Poll::Ready(Some(Ok(chunk)));
        }

        if let Some(message) = state.error.clone() {
            this.failed = true;
            return Poll::Ready(Some(Err(io::Error::new(io::ErrorKind::Other, message))));
        }

        if state.finished {
            return Poll::Ready(None);
        }

        state.wakers.push(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for CapacitorReader {
    fn drop(&mut self) {
        let mut state = self
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.readers.remove(&self.id);
        state.trim();
        if state.readers.is_empty() {
            // notify_one stores a permit, so the pump sees this even when it
            // is not yet parked on the notification
            state.last_reader_gone.notify_one();
        }
    }
}
