//! Source acquisition and transport dispatch for the current track

use super::{PlaybackEngine, PlayerError, PLAYER_LOG_TARGET};
use crate::player::state::PlaybackStatus;
use crate::queue::Track;
use crate::source::PlayableSource;
use crate::transport::PlayOptions;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Acquires a source for `track` and starts it on the transport, beginning at
/// `seek_seconds` (or the top of the track).
#[instrument(skip(engine, track), fields(identifier = %track.identifier))]
pub(super) async fn start_current_item(
    engine: &mut PlaybackEngine,
    track: &Track,
    seek_seconds: Option<u64>,
) -> Result<(), PlayerError> {
    let source = engine.acquirer.acquire(&track.identifier).await?;
    info!(
        target: PLAYER_LOG_TARGET,
        "Starting {:?} for {}", source, track.identifier
    );
    dispatch(engine, source, seek_seconds).await
}

/// Starts playback of an already-cached artifact at `position` seconds.
pub(super) async fn dispatch_artifact(
    engine: &mut PlaybackEngine,
    artifact: PathBuf,
    position: u64,
) -> Result<(), PlayerError> {
    dispatch(engine, PlayableSource::CachedFile(artifact), Some(position)).await
}

async fn dispatch(
    engine: &mut PlaybackEngine,
    source: PlayableSource,
    seek_seconds: Option<u64>,
) -> Result<(), PlayerError> {
    if engine.session.connection.is_none() {
        return Err(PlayerError::NotConnected);
    }

    // The tracker transitions before the transport ever sees the new source
    let prior = engine.session.tracker.get();
    engine
        .session
        .tracker
        .start(Some(seek_seconds.unwrap_or(0)));

    let connection = engine
        .session
        .connection
        .as_mut()
        .ok_or(PlayerError::NotConnected)?;

    match connection.play(source, PlayOptions { seek_seconds }).await {
        Ok(dispatcher) => {
            engine.session.dispatcher = Some(dispatcher);
            engine.session.status = PlaybackStatus::Playing;
            Ok(())
        }
        Err(e) => {
            // The transport never took the new source; the session still
            // reflects whatever was playing before
            engine.session.tracker.stop();
            engine.session.tracker.set(prior);
            Err(e.into())
        }
    }
}
