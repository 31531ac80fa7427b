//! Voice transport collaborator
//!
//! Connection establishment and audio frame delivery are external. The engine
//! drives the transport through these traits and reacts to the events the
//! transport pushes back over the channel handed out at connect time.

use crate::source::PlayableSource;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use tokio::sync::mpsc;

/// Reference to the channel/room the transport should join.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRef(pub String);

/// Options for starting playback of a source.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayOptions {
    /// Start playback this many seconds into the source
    pub seek_seconds: Option<u64>,
}

/// Events pushed by the transport to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The transport started (true) or stopped (false) emitting audio.
    /// A true-to-false edge during playback marks the natural end of a track.
    Speaking(bool),
    /// The underlying connection dropped.
    Disconnected,
}

/// Error types for transport operations
#[derive(Debug)]
pub enum TransportError {
    Connection(String),
    Playback(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connection(msg) => write!(f, "Transport connection error: {}", msg),
            TransportError::Playback(msg) => write!(f, "Transport playback error: {}", msg),
        }
    }
}

impl Error for TransportError {}

/// Entry point for establishing transport connections.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Connects to the given channel. Returns the live connection handle and
    /// the event stream the transport will push state changes over.
    async fn connect(
        &self,
        channel: &ChannelRef,
    ) -> Result<(Box<dyn TransportConnection>, mpsc::Receiver<TransportEvent>), TransportError>;
}

/// A live transport connection.
#[async_trait]
pub trait TransportConnection: Send + Sync {
    /// Starts playing the given source, replacing whatever was playing.
    async fn play(
        &mut self,
        source: PlayableSource,
        options: PlayOptions,
    ) -> Result<Box<dyn StreamDispatcher>, TransportError>;

    /// Tears the connection down.
    async fn disconnect(&mut self) -> Result<(), TransportError>;
}

/// Handle to an in-flight stream on a connection.
#[async_trait]
pub trait StreamDispatcher: Send + Sync {
    async fn pause(&mut self) -> Result<(), TransportError>;
    async fn resume(&mut self) -> Result<(), TransportError>;
}
