use crate::cache::CacheError;
use crate::source::SourceError;
use crate::transport::TransportError;
use std::error::Error;
use std::fmt;

/// Error types for playback engine operations.
#[derive(Debug)]
pub enum PlayerError {
    /// No transport connection is attached
    NotConnected,
    /// The operation requires an active `Playing` status
    NotPlaying,
    /// The queue has no head to play
    EmptyQueue,
    /// A seek was requested with nothing queued
    NoCurrentSong,
    /// Cache coordination failed (including the bounded availability wait)
    Cache(CacheError),
    Source(SourceError),
    Transport(TransportError),
}

impl fmt::Display for PlayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerError::NotConnected => write!(f, "Not connected to a transport channel"),
            PlayerError::NotPlaying => write!(f, "Not currently playing"),
            PlayerError::EmptyQueue => write!(f, "The queue is empty"),
            PlayerError::NoCurrentSong => write!(f, "No current song to seek within"),
            PlayerError::Cache(e) => write!(f, "Cache error: {}", e),
            PlayerError::Source(e) => write!(f, "Source error: {}", e),
            PlayerError::Transport(e) => write!(f, "Transport error: {}", e),
        }
    }
}

impl Error for PlayerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PlayerError::Cache(e) => Some(e),
            PlayerError::Source(e) => Some(e),
            PlayerError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CacheError> for PlayerError {
    fn from(err: CacheError) -> Self {
        PlayerError::Cache(err)
    }
}

impl From<SourceError> for PlayerError {
    fn from(err: SourceError) -> Self {
        PlayerError::Source(err)
    }
}

impl From<TransportError> for PlayerError {
    fn from(err: TransportError) -> Self {
        PlayerError::Transport(err)
    }
}
