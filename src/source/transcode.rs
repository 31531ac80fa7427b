//! Transcoding stage collaborator
//!
//! Tool invocation lives outside this crate; the engine only fixes the output
//! profile and hands the stage its (already reconnect-hardened) input.

use crate::source::encodings::{TARGET_CODEC, TARGET_CONTAINER, TARGET_SAMPLE_RATE_HZ};
use crate::source::{ByteStream, SourceError};
use async_trait::async_trait;

/// Output configuration for the transcoding stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeProfile {
    /// Discard any video track in the input
    pub drop_video: bool,
    pub audio_codec: String,
    pub container: String,
    pub sample_rate_hz: u32,
}

impl TranscodeProfile {
    /// Profile matching what the transport consumes natively.
    pub fn transport_native() -> Self {
        TranscodeProfile {
            drop_video: true,
            audio_codec: TARGET_CODEC.to_string(),
            container: TARGET_CONTAINER.to_string(),
            sample_rate_hz: TARGET_SAMPLE_RATE_HZ,
        }
    }
}

/// Contract for the external transcoding tool.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Starts a transcode of `input` into the given profile, returning the
    /// transcoded byte stream. Input-side failures flow through the returned
    /// stream as item errors.
    async fn transcode(
        &self,
        profile: &TranscodeProfile,
        input: ByteStream,
    ) -> Result<ByteStream, SourceError>;
}
