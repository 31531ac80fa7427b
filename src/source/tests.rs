//! Tests for encoding selection, the capacitor, stream resumption, and acquisition

use super::acquirer::{PlayableSource, SourceAcquirer};
use super::capacitor::StreamCapacitor;
use super::encodings::{select_fallback, select_native};
use super::resume::{resumable_stream, ReconnectBudget};
use super::transcode::{TranscodeProfile, Transcoder};
use super::{ByteStream, SourceError};
use crate::cache::{CachePolicy, ContentCache};
use crate::remote::models::{Encoding, RemoteTrackInfo};
use crate::remote::RemoteSource;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn enc(codec: &str, container: &str, rate: Option<u32>) -> Encoding {
    Encoding {
        tag: None,
        codec: codec.to_string(),
        container: container.to_string(),
        sample_rate: rate,
        bitrate: None,
        average_bitrate: None,
        url: format!("https://media.example/{}/{}", codec, container),
    }
}

fn track_info(is_live: bool, encodings: Vec<Encoding>) -> RemoteTrackInfo {
    RemoteTrackInfo {
        identifier: "test-track".to_string(),
        title: Some("Test Track".to_string()),
        is_live,
        encodings,
    }
}

// --- Encoding selection ---

#[test]
fn native_selection_requires_codec_container_and_rate() {
    let encodings = vec![
        enc("opus", "webm", Some(44_100)),
        enc("opus", "ogg", Some(48_000)),
        enc("aac", "webm", Some(48_000)),
        enc("opus", "webm", Some(48_000)),
    ];
    let native = select_native(&encodings).expect("Expected a native match");
    assert_eq!(native.sample_rate, Some(48_000));
    assert_eq!(native.container, "webm");
    assert_eq!(native.codec, "opus");
}

#[test]
fn native_selection_picks_first_match() {
    let mut first = enc("opus", "webm", Some(48_000));
    first.url = "https://media.example/first".to_string();
    let mut second = enc("opus", "webm", Some(48_000));
    second.url = "https://media.example/second".to_string();
    let encodings = vec![first, second];
    assert_eq!(
        select_native(&encodings).map(|e| e.url.as_str()),
        Some("https://media.example/first")
    );
}

#[test]
fn live_fallback_respects_tag_whitelist_and_bitrate() {
    let mut in_list_low = enc("aac", "ts", Some(44_100));
    in_list_low.tag = Some(92);
    in_list_low.bitrate = Some(48_000);
    let mut in_list_high = enc("aac", "ts", Some(44_100));
    in_list_high.tag = Some(95);
    in_list_high.bitrate = Some(256_000);
    let mut off_list = enc("aac", "ts", Some(44_100));
    off_list.tag = Some(22);
    off_list.bitrate = Some(512_000);

    let info = track_info(true, vec![in_list_low, off_list, in_list_high]);
    let chosen = select_fallback(&info).expect("Expected a live fallback");
    assert_eq!(chosen.tag, Some(95));
}

#[test]
fn finite_fallback_prefers_variable_bitrate_rendition() {
    let mut fixed_high = enc("aac", "m4a", Some(44_100));
    fixed_high.bitrate = Some(256_000);
    fixed_high.average_bitrate = Some(250_000);
    let mut variable = enc("vorbis", "webm", Some(44_100));
    variable.average_bitrate = Some(160_000);
    let mut unrated = enc("mp3", "mp3", Some(44_100));
    unrated.bitrate = Some(320_000);

    let info = track_info(false, vec![fixed_high.clone(), variable, unrated]);
    let chosen = select_fallback(&info).expect("Expected a finite fallback");
    assert_eq!(chosen.codec, "vorbis");

    // Without a variable rendition the highest average wins
    let mut fixed_low = enc("aac", "m4a", Some(44_100));
    fixed_low.bitrate = Some(96_000);
    fixed_low.average_bitrate = Some(94_000);
    let info = track_info(false, vec![fixed_low, fixed_high]);
    let chosen = select_fallback(&info).expect("Expected a finite fallback");
    assert_eq!(chosen.average_bitrate, Some(250_000));
}

#[test]
fn fallback_yields_nothing_without_candidates() {
    // Finite source where nothing reports an average bitrate
    let mut raw = enc("mp3", "mp3", Some(44_100));
    raw.bitrate = Some(128_000);
    let info = track_info(false, vec![raw]);
    assert!(select_fallback(&info).is_none());

    // Live source with no whitelisted tags
    let mut off_list = enc("aac", "ts", None);
    off_list.tag = Some(22);
    off_list.bitrate = Some(512_000);
    let info = track_info(true, vec![off_list]);
    assert!(select_fallback(&info).is_none());
}

// --- Capacitor ---

fn byte_stream(chunks: Vec<&'static [u8]>) -> ByteStream {
    Box::pin(stream::iter(
        chunks
            .into_iter()
            .map(|c| Ok(Bytes::from_static(c)))
            .collect::<Vec<Result<Bytes, io::Error>>>(),
    ))
}

async fn drain(reader: &mut super::capacitor::CapacitorReader) -> Result<Vec<u8>, io::Error> {
    let mut out = Vec::new();
    while let Some(chunk) = reader.next().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}

#[tokio::test]
async fn capacitor_serves_identical_bytes_to_both_readers() {
    let capacitor = StreamCapacitor::new();
    let mut fast = capacitor.reader();
    let mut slow = capacitor.reader();
    capacitor.spawn_pump(byte_stream(vec![b"abc", b"def", b"ghi"]));

    // The fast reader drains everything before the slow one even starts;
    // the slow reader must still see every chunk.
    let fast_bytes = drain(&mut fast).await.expect("Fast reader failed");
    let slow_bytes = drain(&mut slow).await.expect("Slow reader failed");
    assert_eq!(fast_bytes, b"abcdefghi");
    assert_eq!(slow_bytes, fast_bytes);
}

#[tokio::test]
async fn capacitor_surfaces_producer_failure_once() {
    let capacitor = StreamCapacitor::new();
    let mut reader = capacitor.reader();
    let failing: ByteStream = Box::pin(stream::iter(vec![
        Ok(Bytes::from_static(b"good")),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "lost upstream")),
    ]));
    capacitor.spawn_pump(failing);

    let first = reader.next().await.expect("Expected a chunk");
    assert_eq!(first.expect("First chunk should be data"), Bytes::from_static(b"good"));

    let second = reader.next().await.expect("Expected the failure");
    assert!(second.is_err());

    assert!(reader.next().await.is_none(), "Reader must end after the failure");
}

#[tokio::test]
async fn capacitor_stops_pumping_without_readers() {
    let capacitor = StreamCapacitor::new();
    let reader = capacitor.reader();
    drop(reader);

    let endless: ByteStream = Box::pin(stream::unfold(0u64, |n| async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        Some((Ok::<_, io::Error>(Bytes::from_static(b"x")), n + 1))
    }));
    let pump = capacitor.spawn_pump(endless);

    tokio::time::timeout(Duration::from_secs(1), pump)
        .await
        .expect("Pump should stop once all readers are gone")
        .expect("Pump task panicked");
}

#[tokio::test]
async fn capacitor_stops_a_pending_read_when_the_last_reader_drops() {
    let capacitor = StreamCapacitor::new();
    let reader = capacitor.reader();

    // A source that never yields: the pump parks on the read
    let silent: ByteStream = Box::pin(stream::pending());
    let pump = capacitor.spawn_pump(silent);

    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(reader);

    tokio::time::timeout(Duration::from_secs(1), pump)
        .await
        .expect("Pump must release a silent source once readers are gone")
        .expect("Pump task panicked");
}

// --- Resumable stream ---

/// Remote whose first fetch breaks mid-stream and whose second fetch serves
/// the remainder from the requested offset.
struct FlakyRemote {
    fetch_offsets: Mutex<Vec<u64>>,
}

#[async_trait]
impl RemoteSource for FlakyRemote {
    async fn resolve(&self, identifier: &str) -> Result<RemoteTrackInfo, SourceError> {
        Err(SourceError::Remote(format!("unexpected resolve of {}", identifier)))
    }

    async fn fetch(&self, _encoding: &Encoding, offset: u64) -> Result<ByteStream, SourceError> {
        self.fetch_offsets
            .lock()
            .expect("Mutex poisoned")
            .push(offset);
        if offset == 0 {
            Ok(Box::pin(stream::iter(vec![
                Ok(Bytes::from_static(b"aaaa")),
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "blip")),
            ])))
        } else {
            Ok(byte_stream(vec![b"bbbb"]))
        }
    }
}

#[tokio::test]
async fn resumable_stream_reconnects_from_consumed_offset() {
    let remote = Arc::new(FlakyRemote {
        fetch_offsets: Mutex::new(Vec::new()),
    });
    let budget = ReconnectBudget {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        delay_cap: Duration::from_millis(4),
    };

    let mut stream = resumable_stream(remote.clone(), enc("aac", "m4a", None), budget);
    let mut collected = Vec::new();
    while let Some(chunk) = stream.next().await {
        collected.extend_from_slice(&chunk.expect("Reconnect should hide the blip"));
    }

    assert_eq!(collected, b"aaaabbbb");
    let offsets = remote.fetch_offsets.lock().expect("Mutex poisoned").clone();
    assert_eq!(offsets, vec![0, 4]);
}

struct DeadRemote {
    fetch_calls: AtomicU32,
}

#[async_trait]
impl RemoteSource for DeadRemote {
    async fn resolve(&self, identifier: &str) -> Result<RemoteTrackInfo, SourceError> {
        Err(SourceError::Remote(format!("unexpected resolve of {}", identifier)))
    }

    async fn fetch(&self, _encoding: &Encoding, _offset: u64) -> Result<ByteStream, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Err(SourceError::Remote("host unreachable".to_string()))
    }
}

#[tokio::test]
async fn resumable_stream_exhausts_its_budget_as_a_stream_error() {
    let remote = Arc::new(DeadRemote {
        fetch_calls: AtomicU32::new(0),
    });
    let budget = ReconnectBudget {
        max_attempts: 2,
        base_delay: Duration::from_millis(1),
        delay_cap: Duration::from_millis(2),
    };

    let mut stream = resumable_stream(remote.clone(), enc("aac", "m4a", None), budget);
    let item = stream.next().await.expect("Expected the exhaustion error");
    assert!(item.is_err());
    assert!(stream.next().await.is_none(), "Stream must end after exhaustion");
    // Initial try plus the budgeted retries
    assert_eq!(remote.fetch_calls.load(Ordering::SeqCst), 3);
}

// --- Acquirer ---

struct ScriptedRemote {
    info: RemoteTrackInfo,
    content: &'static [u8],
    resolve_calls: AtomicU32,
}

#[async_trait]
impl RemoteSource for ScriptedRemote {
    async fn resolve(&self, _identifier: &str) -> Result<RemoteTrackInfo, SourceError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.info.clone())
    }

    async fn fetch(&self, _encoding: &Encoding, offset: u64) -> Result<ByteStream, SourceError> {
        let rest = Bytes::from_static(&self.content[offset as usize..]);
        Ok(Box::pin(stream::iter(vec![Ok::<_, io::Error>(rest)])))
    }
}

/// Passthrough transcoder that records whether it ran.
struct RecordingTranscoder {
    calls: AtomicU32,
}

#[async_trait]
impl Transcoder for RecordingTranscoder {
    async fn transcode(
        &self,
        profile: &TranscodeProfile,
        input: ByteStream,
    ) -> Result<ByteStream, SourceError> {
        assert!(profile.drop_video);
        assert_eq!(profile.sample_rate_hz, 48_000);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(input)
    }
}

async fn acquirer_fixture(
    info: RemoteTrackInfo,
    content: &'static [u8],
) -> (
    tempfile::TempDir,
    Arc<ContentCache>,
    Arc<RecordingTranscoder>,
    SourceAcquirer,
) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let cache = Arc::new(
        ContentCache::open(dir.path().to_path_buf())
            .await
            .expect("Failed to open cache"),
    );
    let remote = Arc::new(ScriptedRemote {
        info,
        content,
        resolve_calls: AtomicU32::new(0),
    });
    let transcoder = Arc::new(RecordingTranscoder {
        calls: AtomicU32::new(0),
    });
    let acquirer = SourceAcquirer::new(
        cache.clone(),
        remote,
        transcoder.clone(),
        ReconnectBudget::default(),
    );
    (dir, cache, transcoder, acquirer)
}

#[tokio::test]
async fn cached_identifier_short_circuits_to_the_artifact() {
    let info = track_info(false, vec![enc("opus", "webm", Some(48_000))]);
    let (_dir, cache, transcoder, acquirer) = acquirer_fixture(info, b"cached-bytes").await;

    let id = "already-cached";
    cache
        .publish(
            id,
            stream::iter(vec![Ok::<_, io::Error>(Bytes::from_static(b"cached-bytes"))]),
            CachePolicy::Persist,
        )
        .await
        .expect("Publish failed");

    match acquirer.acquire(id).await.expect("Acquire failed") {
        PlayableSource::CachedFile(path) => assert_eq!(path, cache.entry_path(id)),
        other => panic!("Expected CachedFile, got {:?}", other),
    }
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn native_encoding_plays_direct_and_populates_the_cache() {
    let info = track_info(
        false,
        vec![enc("aac", "m4a", Some(44_100)), enc("opus", "webm", Some(48_000))],
    );
    let (_dir, cache, transcoder, acquirer) = acquirer_fixture(info, b"opus-webm-bytes").await;

    let id = "native-track";
    let source = acquirer.acquire(id).await.expect("Acquire failed");
    let (mut reader, caching) = match source {
        PlayableSource::LiveStream { reader, caching } => (reader, caching),
        other => panic!("Expected LiveStream, got {:?}", other),
    };
    assert!(caching);
    assert_eq!(
        transcoder.calls.load(Ordering::SeqCst),
        0,
        "Direct play must not invoke the transcoding stage"
    );

    let played = drain(&mut reader).await.expect("Playback stream failed");
    assert_eq!(played, b"opus-webm-bytes");

    // The fire-and-forget cache writer finishes on its own
    cache
        .await_available(id, 50, Duration::from_millis(10))
        .await
        .expect("Cache entry should appear");
    let cached = tokio::fs::read(cache.entry_path(id)).await.expect("Read failed");
    assert_eq!(cached, b"opus-webm-bytes");
}

#[tokio::test]
async fn non_native_encoding_routes_through_the_transcoder() {
    let mut fallback = enc("aac", "m4a", Some(44_100));
    fallback.average_bitrate = Some(256_000);
    let info = track_info(false, vec![fallback]);
    let (_dir, _cache, transcoder, acquirer) = acquirer_fixture(info, b"aac-bytes").await;

    let source = acquirer.acquire("transcoded-track").await.expect("Acquire failed");
    let mut reader = match source {
        PlayableSource::LiveStream { reader, .. } => reader,
        other => panic!("Expected LiveStream, got {:?}", other),
    };
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 1);

    let played = drain(&mut reader).await.expect("Playback stream failed");
    assert_eq!(played, b"aac-bytes");
}

#[tokio::test]
async fn live_sources_are_not_cached() {
    let mut live_enc = enc("aac", "ts", Some(44_100));
    live_enc.tag = Some(94);
    live_enc.bitrate = Some(128_000);
    let info = track_info(true, vec![live_enc]);
    let (_dir, cache, _transcoder, acquirer) = acquirer_fixture(info, b"live-bytes").await;

    let id = "live-track";
    let source = acquirer.acquire(id).await.expect("Acquire failed");
    let (mut reader, caching) = match source {
        PlayableSource::LiveStream { reader, caching } => (reader, caching),
        other => panic!("Expected LiveStream, got {:?}", other),
    };
    assert!(!caching);

    drain(&mut reader).await.expect("Playback stream failed");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!cache.exists(id).await, "Live content must never land in the cache");
}

#[tokio::test]
async fn unusable_encodings_fail_acquisition() {
    let mut raw = enc("mp3", "mp3", Some(44_100));
    raw.bitrate = Some(128_000); // no average bitrate, not native
    let info = track_info(false, vec![raw]);
    let (_dir, _cache, _transcoder, acquirer) = acquirer_fixture(info, b"").await;

    match acquirer.acquire("unplayable").await {
        Err(SourceError::NoSuitableFormat(id)) => assert_eq!(id, "unplayable"),
        other => panic!("Expected NoSuitableFormat, got {:?}", other),
    }
}
