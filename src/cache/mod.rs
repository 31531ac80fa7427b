//! Content-addressed cache for completed track artifacts
//!
//! Entries are keyed by the SHA-256 of the track identifier, so the same
//! identifier always maps to the same artifact across runs. A write happens
//! in two steps: bytes land in a `<hash>.part` temp file, and only a fully
//! successful write is renamed into place. Readers therefore never observe a
//! partially written artifact, and a failed or aborted write leaves no
//! Complete entry behind. Entries are never deleted here.

use futures_util::{Stream, StreamExt};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Notify;
use tracing::{debug, instrument, trace, warn};


const LOG_TARGET: &str = "resono::cache";

/// Error types for cache operations
#[derive(Debug)]
pub enum CacheError {
    IoError(io::Error),
    /// The entry did not become available within the bounded wait
    Timeout { identifier: String, attempts: u32 },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::IoError(e) => write!(f, "I/O error: {}", e),
            CacheError::Timeout {
                identifier,
                attempts,
            } => write!(
                f,
                "Entry for '{}' not available after {} attempts",
                identifier, attempts
            ),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CacheError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CacheError {
    fn from(err: io::Error) -> Self {
        CacheError::IoError(err)
    }
}

/// Whether a published stream may be persisted.
///
/// Live/non-seekable input is excluded from the cache: a partial recording of
/// an unbounded stream is useless for replay and would grow without bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CachePolicy {
    Persist,
    Bypass,
}

/// Content-addressed store of completed track artifacts.
pub struct ContentCache {
    root: PathBuf,
    /// Entry names currently being written; first writer wins
    inflight: Mutex<HashSet<String>>,
    /// Per-entry wakeups so a publish can cut an availability wait short
    watchers: Mutex<HashMap<String, Arc<Notify>>>,
}

impl ContentCache {
    /// Opens (and creates, if needed) a cache rooted at the given directory.
    pub async fn open(root: PathBuf) -> Result<Self, CacheError> {
        tokio::fs::create_dir_all(&root).await?;
        debug!(target: LOG_TARGET, "Cache opened at {}", root.display());
        Ok(ContentCache {
            root,
            inflight: Mutex::new(HashSet::new()),
            watchers: Mutex::new(HashMap::new()),
        })
    }

    /// Stable on-disk name for an identifier.
    fn entry_name(identifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(identifier.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Deterministic path of the Complete artifact for an identifier.
    pub fn entry_path(&self, identifier: &str) -> PathBuf {
        self.root.join(Self::entry_name(identifier))
    }

    fn temp_path(&self, identifier: &str) -> PathBuf {
        self.root
            .join(format!("{}.part", Self::entry_name(identifier)))
    }

    /// True iff the Complete artifact is present. Filesystem errors read as
    /// absent; this never fails.
    pub async fn exists(&self, identifier: &str) -> bool {
        match tokio::fs::metadata(self.entry_path(identifier)).await {
            Ok(meta) => meta.is_file(),
            Err(_) => false,
        }
    }

    fn watcher(&self, identifier: &str) -> Arc<Notify> {
        let mut watchers = self
            .watchers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        watchers
            .entry(Self::entry_name(identifier))
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    fn notify_available(&self, identifier: &str) {
        let mut watchers = self
            .watchers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // The entry has become available; nobody will wait on it again, so
        // the registry entry goes too. Waiters keep their own Arc clones.
        if let Some(notify) = watchers.remove(&Self::entry_name(identifier)) {
            notify.notify_waiters();
        }
    }

    /// Drops the watcher entry once only the registry and `ours` hold it.
    fn release_watcher(&self, identifier: &str, ours: &Arc<Notify>) {
        let mut watchers = self
            .watchers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let name = Self::entry_name(identifier);
        if let Some(notify) = watchers.get(&name) {
            if Arc::ptr_eq(notify, ours) && Arc::strong_count(notify) <= 2 {
                watchers.remove(&name);
            }
        }
    }

    #[cfg(test)]
    fn watcher_count(&self) -> usize {
        self.watchers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Waits until the entry for `identifier` becomes available, polling at
    /// `interval` for at most `max_attempts` polls. An in-process publish
    /// wakes waiters early; the poll remains the fallback for entries written
    /// by another process. This coordinates with an expected in-flight
    /// acquisition, it is not a lock.
    #[instrument(skip(self), fields(identifier = %identifier))]
    pub async fn await_available(
        &self,
        identifier: &str,
        max_attempts: u32,
        interval: Duration,
    ) -> Result<PathBuf, CacheError> {
        let notify = self.watcher(identifier);

        let result = async {
            for attempt in 0..max_attempts {
                if self.exists(identifier).await {
                    trace!(target: LOG_TARGET, "Entry available after {} attempts", attempt);
                    return Ok(self.entry_path(identifier));
                }
                tokio::select! {
                    _ = notify.notified() => {
                        trace!(target: LOG_TARGET, "Woken by publish notification");
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }

            if self.exists(identifier).await {
                return Ok(self.entry_path(identifier));
            }

            debug!(
                target: LOG_TARGET,
                "Entry for {} still absent after {} attempts", identifier, max_attempts
            );
            Err(CacheError::Timeout {
                identifier: identifier.to_string(),
                attempts: max_attempts,
            })
        }
        .await;

        self.release_watcher(identifier, &notify);
        result
    }

    /// Writes a byte stream into the cache and atomically promotes it to the
    /// Complete artifact. Returns the final path, or `None` when the policy
    /// bypasses persistence or another writer already holds the entry.
    ///
    /// Any stream or I/O failure removes the temp file and leaves the entry
    /// absent.
    #[instrument(skip(self, stream), fields(identifier = %identifier))]
    pub async fn publish<S>(
        &self,
        identifier: &str,
        mut stream: S,
        policy: CachePolicy,
    ) -> Result<Option<PathBuf>, CacheError>
    where
        S: Stream<Item = Result<bytes::Bytes, io::Error>> + Unpin + Send,
    {
        if policy == CachePolicy::Bypass {
            debug!(target: LOG_TARGET, "Publish bypassed for live/non-seekable source");
            return Ok(None);
        }

        let name = Self::entry_name(identifier);
        let _guard = match InflightGuard::try_acquire(&self.inflight, name) {
            Some(guard) => guard,
            None => {
                debug!(
                    target: LOG_TARGET,
                    "Another writer already owns the entry for {}; skipping", identifier
                );
                return Ok(None);
            }
        };

        let temp = self.temp_path(identifier);
        let final_path = self.entry_path(identifier);

        let mut file = tokio::fs::File::create(&temp).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(target: LOG_TARGET, "Source stream failed after {} bytes: {}", written, e);
                    drop(file);
                    let _ = tokio::fs::remove_file(&temp).await;
                    return Err(CacheError::IoError(e));
                }
            };
            if let Err(e) = file.write_all(&chunk).await {
                warn!(target: LOG_TARGET, "Cache write failed after {} bytes: {}", written, e);
                drop(file);
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(CacheError::IoError(e));
            }
            written += chunk.len() as u64;
        }

        file.flush().await?;
        drop(file);
        tokio::fs::rename(&temp, &final_path).await?;

        debug!(
            target: LOG_TARGET,
            "Published {} bytes for {} at {}",
            written,
            identifier,
            final_path.display()
        );
        self.notify_available(identifier);
        Ok(Some(final_path))
    }
}

/// Removes the in-flight marker when the write finishes, however it finishes.
struct InflightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    name: String,
}

impl<'a> InflightGuard<'a> {
    fn try_acquire(set: &'a Mutex<HashSet<String>>, name: String) -> Option<Self> {
        let mut inflight = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !inflight.insert(name.clone()) {
            return None;
        }
        Some(InflightGuard { set, name })
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        let mut inflight = self
            .set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inflight.remove(&self.name);
    }
}
