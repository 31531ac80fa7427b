//! Encoding selection: transport-native direct play vs. transcode fallback

use crate::remote::models::{Encoding, RemoteTrackInfo};
use tracing::debug;

const LOG_TARGET: &str = "resono::source::encodings";

/// Codec the transport consumes without re-encoding.
pub const TARGET_CODEC: &str = "opus";
/// Container the transport consumes without re-encoding.
pub const TARGET_CONTAINER: &str = "webm";
/// Sample rate the transport runs at.
pub const TARGET_SAMPLE_RATE_HZ: u32 = 48_000;

/// Live rendition tags the transport can keep up with in real time.
const LIVE_COMPATIBLE_TAGS: &[u32] = &[91, 92, 93, 94, 95, 96];

/// First encoding that the transport can play unmodified: target codec,
/// target container, and the fixed 48 kHz sample rate.
pub fn select_native(encodings: &[Encoding]) -> Option<&Encoding> {
    encodings.iter().find(|e| {
        e.codec == TARGET_CODEC
            && e.container == TARGET_CONTAINER
            && e.sample_rate == Some(TARGET_SAMPLE_RATE_HZ)
    })
}

/// Fallback rendition for the transcode path.
///
/// Live sources pick the highest-bitrate rendition from the fixed whitelist
/// of tags. Finite sources pick among renditions reporting an average
/// bitrate, sorted highest first, preferring a variable-bitrate rendition
/// (one with no fixed bitrate) when present.
pub fn select_fallback(info: &RemoteTrackInfo) -> Option<&Encoding> {
    if info.is_live {
        let chosen = info
            .encodings
            .iter()
            .filter(|e| e.tag.map_or(false, |t| LIVE_COMPATIBLE_TAGS.contains(&t)))
            .max_by_key(|e| e.bitrate.unwrap_or(0));
        if let Some(enc) = chosen {
            debug!(
                target: LOG_TARGET,
                "Selected live fallback tag {:?} at {:?} bps", enc.tag, enc.bitrate
            );
        }
        return chosen;
    }

    let mut rated: Vec<&Encoding> = info
        .encodings
        .iter()
        .filter(|e| e.average_bitrate.is_some())
        .collect();
    if rated.is_empty() {
        return None;
    }
    rated.sort_by(|a, b| b.average_bitrate.cmp(&a.average_bitrate));

    let chosen = rated
        .iter()
        .find(|e| e.bitrate.is_none())
        .copied()
        .or_else(|| rated.first().copied());
    if let Some(enc) = chosen {
        debug!(
            target: LOG_TARGET,
            "Selected finite fallback: codec={}, avg={:?} bps, fixed={:?} bps",
            enc.codec,
            enc.average_bitrate,
            enc.bitrate
        );
    }
    chosen
}
