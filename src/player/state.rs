use crate::player::position::PositionTracker;
use crate::transport::{StreamDispatcher, TransportConnection};
use uuid::Uuid;

/// Connection-level playback status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Disconnected,
    Playing,
    Paused,
}

/// The single mutable playback session: status, live transport handles, and
/// the position tracker. Owned exclusively by the engine; a fresh session is
/// built for each connection lifecycle.
pub struct PlaybackSession {
    pub id: Uuid,
    pub status: PlaybackStatus,
    pub(super) connection: Option<Box<dyn TransportConnection>>,
    pub(super) dispatcher: Option<Box<dyn StreamDispatcher>>,
    pub(super) tracker: PositionTracker,
}

impl PlaybackSession {
    pub(super) fn new() -> Self {
        PlaybackSession {
            id: Uuid::new_v4(),
            status: PlaybackStatus::Disconnected,
            connection: None,
            dispatcher: None,
            tracker: PositionTracker::new(),
        }
    }
}
