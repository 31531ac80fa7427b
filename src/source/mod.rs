//! Source acquisition: turning a track identifier into something playable
//!
//! A cached identifier resolves straight to its artifact. Anything else is
//! resolved against the remote source, streamed (directly when an encoding is
//! already transport-native, through the transcoder otherwise), and teed into
//! the cache while the transport consumes it.

pub mod acquirer;
pub mod capacitor;
pub mod encodings;
pub mod error;
pub mod resume;
pub mod transcode;

#[cfg(test)]
mod tests;

pub use acquirer::{PlayableSource, SourceAcquirer};
pub use capacitor::{CapacitorReader, StreamCapacitor};
pub use error::SourceError;
pub use transcode::{TranscodeProfile, Transcoder};

use bytes::Bytes;
use futures::Stream;
use std::io;
use std::pin::Pin;

/// A chunked byte stream, as produced by remote fetches and the transcoder.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;
