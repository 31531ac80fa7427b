//! Handlers for the engine's control operations

use super::{starter, PlaybackEngine, PlayerError, PLAYER_LOG_TARGET};
use crate::player::state::PlaybackStatus;
use tracing::{debug, info};

pub(super) async fn handle_play(engine: &mut PlaybackEngine) -> Result<(), PlayerError> {
    match engine.session.status {
        PlaybackStatus::Paused if engine.session.dispatcher.is_some() => {
            // Resume on the live dispatcher: no re-acquisition, and the
            // tracker continues from the value pause retained.
            info!(target: PLAYER_LOG_TARGET, "Resuming paused playback at {}s", engine.session.tracker.get());
            if let Some(dispatcher) = engine.session.dispatcher.as_mut() {
                dispatcher.resume().await?;
            }
            engine.session.tracker.start(None);
            engine.session.status = PlaybackStatus::Playing;
            Ok(())
        }
        PlaybackStatus::Paused => {
            // Paused but the handle is gone (e.g. the connection dropped and
            // was re-established): restart the track at the kept position.
            let position = engine.session.tracker.get();
            debug!(
                target: PLAYER_LOG_TARGET,
                "No live dispatcher; re-seeking to {}s", position
            );
            handle_seek(engine, position).await
        }
        _ => {
            let track = engine
                .queue
                .head()
                .await
                .ok_or(PlayerError::EmptyQueue)?;
            if engine.session.connection.is_none() {
                return Err(PlayerError::NotConnected);
            }
            starter::start_current_item(engine, &track, None).await
        }
    }
}

pub(super) async fn handle_pause(engine: &mut PlaybackEngine) -> Result<(), PlayerError> {
    if engine.session.status != PlaybackStatus::Playing {
        return Err(PlayerError::NotPlaying);
    }
    info!(target: PLAYER_LOG_TARGET, "Pausing playback at {}s", engine.session.tracker.get());
    if let Some(dispatcher) = engine.session.dispatcher.as_mut() {
        dispatcher.pause().await?;
    }
    engine.session.tracker.stop();
    engine.session.status = PlaybackStatus::Paused;
    Ok(())
}

pub(super) async fn handle_seek(
    engine: &mut PlaybackEngine,
    position: u64,
) -> Result<(), PlayerError> {
    if engine.session.connection.is_none() {
        return Err(PlayerError::NotConnected);
    }
    let track = engine
        .queue
        .head()
        .await
        .ok_or(PlayerError::NoCurrentSong)?;

    // Seeking replays from the cached artifact; wait (bounded) for any
    // in-flight acquisition of the same track to publish it.
    let artifact = engine
        .cache
        .await_available(
            &track.identifier,
            engine.await_max_attempts,
            engine.await_interval,
        )
        .await?;

    info!(
        target: PLAYER_LOG_TARGET,
        "Seeking to {}s in {}", position, track.identifier
    );
    starter::dispatch_artifact(engine, artifact, position).await
}

pub(super) async fn handle_forward_seek(
    engine: &mut PlaybackEngine,
    delta: i64,
) -> Result<(), PlayerError> {
    let current = engine.session.tracker.get() as i64;
    // Rewinding past the start clamps to zero; the transport never sees a
    // negative offset.
    let target = (current + delta).max(0) as u64;
    debug!(
        target: PLAYER_LOG_TARGET,
        "Relative seek by {}s from {}s to {}s", delta, current, target
    );
    handle_seek(engine, target).await
}

pub(super) async fn handle_disconnect(engine: &mut PlaybackEngine) -> Result<(), PlayerError> {
    // Teardown always runs to completion; errors along the way are surfaced
    // only after the session has actually been dismantled.
    let pause_result = if engine.session.status == PlaybackStatus::Playing {
        handle_pause(engine).await
    } else {
        Ok(())
    };

    let disconnect_result = match engine.session.connection.take() {
        Some(mut connection) => connection.disconnect().await,
        None => Ok(()),
    };

    engine.session.dispatcher = None;
    engine.events_rx = None;
    engine.session.tracker.stop();
    engine.session.status = PlaybackStatus::Disconnected;
    info!(target: PLAYER_LOG_TARGET, "Disconnected; session torn down");

    pause_result?;
    disconnect_result?;
    Ok(())
}
