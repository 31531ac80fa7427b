//! Playback engine: connection lifecycle, state machine, and track advance
//!
//! The engine owns exactly one `PlaybackSession` and drives it through
//! `connect`/`play`/`pause`/`seek`/`disconnect`. End-of-track is not a nested
//! callback: the transport pushes `TransportEvent`s over the channel handed
//! out at connect time, and the engine reacts in `handle_event` as an
//! explicit state transition (including the re-entrant advance-and-play).

use crate::cache::ContentCache;
use crate::config::Settings;
use crate::queue::TrackQueue;
use crate::source::SourceAcquirer;
use crate::transport::{ChannelRef, TransportEvent, VoiceTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, instrument};
use uuid::Uuid;

mod controls;
mod error;
mod position;
mod run_loop;
mod starter;
mod state;


pub use error::PlayerError;
pub use position::PositionTracker;
pub use state::{PlaybackSession, PlaybackStatus};

const PLAYER_LOG_TARGET: &str = "resono::player";

/// Manages the playback session, source acquisition, and transport handles.
pub struct PlaybackEngine {
    // --- Collaborators ---
    queue: Arc<dyn TrackQueue>,
    transport: Arc<dyn VoiceTransport>,
    acquirer: SourceAcquirer,
    cache: Arc<ContentCache>,

    // --- Cache wait budget ---
    await_max_attempts: u32,
    await_interval: Duration,

    // --- State ---
    session: PlaybackSession,
    events_rx: Option<mpsc::Receiver<TransportEvent>>,
    /// Last speaking flag reported by the transport; a true-to-false edge
    /// while `Playing` marks the natural end of a track
    last_speaking: bool,
}

impl PlaybackEngine {
    pub fn new(
        queue: Arc<dyn TrackQueue>,
        transport: Arc<dyn VoiceTransport>,
        acquirer: SourceAcquirer,
        cache: Arc<ContentCache>,
        settings: &Settings,
    ) -> Self {
        PlaybackEngine {
            queue,
            transport,
            acquirer,
            cache,
            await_max_attempts: settings.await_max_attempts,
            await_interval: Duration::from_millis(settings.await_interval_ms),
            session: PlaybackSession::new(),
            events_rx: None,
            last_speaking: false,
        }
    }

    /// Current session status.
    pub fn status(&self) -> PlaybackStatus {
        self.session.status
    }

    /// Elapsed playback position in seconds.
    pub fn position(&self) -> u64 {
        self.session.tracker.get()
    }

    pub fn session_id(&self) -> Uuid {
        self.session.id
    }

    /// Establishes the transport connection. Does not change the playback
    /// status; a later `play` resumes from whatever state the session kept.
    #[instrument(skip(self), fields(session_id = %self.session.id))]
    pub async fn connect(&mut self, channel: &ChannelRef) -> Result<(), PlayerError> {
        let (connection, events) = self.transport.connect(channel).await?;
        self.session.id = Uuid::new_v4();
        self.session.connection = Some(connection);
        self.events_rx = Some(events);
        self.last_speaking = false;
        info!(
            target: PLAYER_LOG_TARGET,
            session_id = %self.session.id,
            "Connected to channel {:?}", channel
        );
        Ok(())
    }

    /// Starts or resumes playback of the queue head.
    #[instrument(skip(self), fields(session_id = %self.session.id))]
    pub async fn play(&mut self) -> Result<(), PlayerError> {
        controls::handle_play(self).await
    }

    /// Pauses active playback. Fails with `NotPlaying` in any other status.
    #[instrument(skip(self), fields(session_id = %self.session.id))]
    pub async fn pause(&mut self) -> Result<(), PlayerError> {
        controls::handle_pause(self).await
    }

    /// Restarts the current track at `position` seconds. Waits (bounded) for
    /// the track's cache entry, so seeking requires cacheable content.
    #[instrument(skip(self), fields(session_id = %self.session.id))]
    pub async fn seek(&mut self, position: u64) -> Result<(), PlayerError> {
        controls::handle_seek(self, position).await
    }

    /// Seeks relative to the current position. A rewind past the start
    /// clamps to zero.
    #[instrument(skip(self), fields(session_id = %self.session.id))]
    pub async fn forward_seek(&mut self, delta: i64) -> Result<(), PlayerError> {
        controls::handle_forward_seek(self, delta).await
    }

    /// Pauses (when playing) and tears down the transport connection. The
    /// session status ends up `Disconnected`.
    #[instrument(skip(self), fields(session_id = %self.session.id))]
    pub async fn disconnect(&mut self) -> Result<(), PlayerError> {
        controls::handle_disconnect(self).await
    }

    /// Applies one transport event to the state machine.
    pub async fn handle_event(&mut self, event: TransportEvent) -> Result<(), PlayerError> {
        run_loop::handle_transport_event(self, event).await
    }

    /// Drains transport events until the connection's channel closes.
    /// Intended to be driven as a task alongside the control surface.
    pub async fn run(&mut self) {
        run_loop::run_engine_loop(self).await;
    }
}
