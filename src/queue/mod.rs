//! External playback queue collaborator
//!
//! The engine never owns the queue. It only reads the head (the item that is
//! or should be playing) and asks the queue to advance past it; enumeration,
//! reordering, and removal live with the collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A playable item. Identity is the identifier: two tracks with the same
/// identifier are cache-equivalent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Opaque stable locator for the item (e.g. a remote URL)
    pub identifier: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<u64>,
}

impl Track {
    pub fn new(identifier: impl Into<String>) -> Self {
        Track {
            identifier: identifier.into(),
            title: None,
            duration_seconds: None,
        }
    }
}

/// Ordered queue of pending tracks, head = currently playing.
#[async_trait]
pub trait TrackQueue: Send + Sync {
    /// Returns the current head of the queue, if any.
    async fn head(&self) -> Option<Track>;

    /// Drops the head and advances to the next track.
    async fn forward(&self);
}
