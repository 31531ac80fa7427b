//! Turns identifiers into playable sources, consulting the cache first

use crate::cache::{CachePolicy, ContentCache};
use crate::remote::RemoteSource;
use crate::source::capacitor::{CapacitorReader, StreamCapacitor};
use crate::source::encodings;
use crate::source::resume::{resumable_stream, ReconnectBudget};
use crate::source::transcode::{TranscodeProfile, Transcoder};
use crate::source::{ByteStream, SourceError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const LOG_TARGET: &str = "resono::source::acquirer";

/// A source the transport can play.
pub enum PlayableSource {
    /// Complete artifact on disk
    CachedFile(PathBuf),
    /// Bytes arriving from the remote source as they are consumed
    LiveStream {
        reader: CapacitorReader,
        /// Whether a cache writer is running alongside playback
        caching: bool,
    },
}

impl std::fmt::Debug for PlayableSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayableSource::CachedFile(path) => {
                f.debug_tuple("CachedFile").field(path).finish()
            }
            PlayableSource::LiveStream { caching, .. } => f
                .debug_struct("LiveStream")
                .field("caching", caching)
                .finish(),
        }
    }
}

/// Resolves identifiers to playable sources.
pub struct SourceAcquirer {
    cache: Arc<ContentCache>,
    remote: Arc<dyn RemoteSource>,
    transcoder: Arc<dyn Transcoder>,
    reconnect: ReconnectBudget,
}

impl SourceAcquirer {
    pub fn new(
        cache: Arc<ContentCache>,
        remote: Arc<dyn RemoteSource>,
        transcoder: Arc<dyn Transcoder>,
        reconnect: ReconnectBudget,
    ) -> Self {
        SourceAcquirer {
            cache,
            remote,
            transcoder,
            reconnect,
        }
    }

    /// Acquires a playable source for `identifier`.
    ///
    /// Cache hits return the artifact path. Otherwise the remote source is
    /// resolved and streamed (directly if an encoding is transport-native,
    /// through the transcoding stage otherwise) and, unless the source is
    /// live, teed into the cache as playback consumes it. Cache-write
    /// failures never surface here; only format resolution and remote
    /// resolution abort the acquisition.
    #[instrument(skip(self), fields(identifier = %identifier))]
    pub async fn acquire(&self, identifier: &str) -> Result<PlayableSource, SourceError> {
        if self.cache.exists(identifier).await {
            let path = self.cache.entry_path(identifier);
            info!(target: LOG_TARGET, "Cache hit: {}", path.display());
            return Ok(PlayableSource::CachedFile(path));
        }

        let info = self.remote.resolve(identifier).await?;

        let raw: ByteStream = if let Some(native) = encodings::select_native(&info.encodings) {
            info!(
                target: LOG_TARGET,
                "Direct play: native encoding {}/{} at {:?} Hz",
                native.codec,
                native.container,
                native.sample_rate
            );
            self.remote.fetch(native, 0).await?
        } else if let Some(fallback) = encodings::select_fallback(&info).cloned() {
            info!(
                target: LOG_TARGET,
                "Transcoding from {}/{} (is_live={})",
                fallback.codec,
                fallback.container,
                info.is_live
            );
            let input = resumable_stream(self.remote.clone(), fallback, self.reconnect);
            self.transcoder
                .transcode(&TranscodeProfile::transport_native(), input)
                .await?
        } else {
            return Err(SourceError::NoSuitableFormat(identifier.to_string()));
        };

        let capacitor = StreamCapacitor::new();
        let transport_reader = capacitor.reader();
        let caching = !info.is_live;

        if caching {
            let cache_reader = capacitor.reader();
            let cache = self.cache.clone();
            let id = identifier.to_string();
            // Fire-and-forget: a failed cache write must never affect playback
            tokio::spawn(async move {
                match cache.publish(&id, cache_reader, CachePolicy::Persist).await {
                    Ok(Some(path)) => {
                        debug!(target: LOG_TARGET, "Cached {} at {}", id, path.display());
                    }
                    Ok(None) => {
                        debug!(target: LOG_TARGET, "Cache write for {} skipped", id);
                    }
                    Err(e) => {
                        warn!(target: LOG_TARGET, "Cache write for {} failed: {}", id, e);
                    }
                }
            });
        } else {
            debug!(target: LOG_TARGET, "Live source; cache writer not started");
        }

        capacitor.spawn_pump(raw);

        Ok(PlayableSource::LiveStream {
            reader: transport_reader,
            caching,
        })
    }
}
