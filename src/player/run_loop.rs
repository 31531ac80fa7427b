//! Transport event handling and the engine's run loop

use super::{controls, PlaybackEngine, PlayerError, PLAYER_LOG_TARGET};
use crate::player::state::PlaybackStatus;
use crate::transport::TransportEvent;
use tracing::{error, info, trace, warn};

/// Drains transport events until the channel closes.
pub(super) async fn run_engine_loop(engine: &mut PlaybackEngine) {
    info!(target: PLAYER_LOG_TARGET, "Engine run loop started.");
    loop {
        let event = match engine.events_rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        };
        match event {
            Some(event) => {
                trace!(target: PLAYER_LOG_TARGET, "Received transport event: {:?}", event);
                if let Err(e) = handle_transport_event(engine, event).await {
                    // Keep draining: a failed advance must not wedge the loop
                    error!(target: PLAYER_LOG_TARGET, "Failed to handle transport event: {}", e);
                }
            }
            None => {
                info!(target: PLAYER_LOG_TARGET, "Transport event channel closed. Exiting run loop.");
                break;
            }
        }
    }
}

/// Applies a transport event as a state-machine transition.
pub(super) async fn handle_transport_event(
    engine: &mut PlaybackEngine,
    event: TransportEvent,
) -> Result<(), PlayerError> {
    match event {
        TransportEvent::Speaking(true) => {
            engine.last_speaking = true;
            Ok(())
        }
        TransportEvent::Speaking(false) => {
            let was_speaking = engine.last_speaking;
            engine.last_speaking = false;
            if was_speaking && engine.session.status == PlaybackStatus::Playing {
                handle_track_end(engine).await
            } else {
                Ok(())
            }
        }
        TransportEvent::Disconnected => {
            warn!(target: PLAYER_LOG_TARGET, "Transport connection dropped.");
            engine.session.connection = None;
            engine.session.dispatcher = None;
            engine.session.tracker.stop();
            if engine.session.status == PlaybackStatus::Playing {
                // A later play() re-seeks to the retained position
                engine.session.status = PlaybackStatus::Paused;
            }
            Ok(())
        }
    }
}

/// Natural end of the current track: advance the queue and keep playing.
async fn handle_track_end(engine: &mut PlaybackEngine) -> Result<(), PlayerError> {
    info!(target: PLAYER_LOG_TARGET, "Track finished; advancing queue.");
    engine.queue.forward().await;

    if engine.queue.head().await.is_some() {
        controls::handle_play(engine).await
    } else {
        info!(target: PLAYER_LOG_TARGET, "Queue drained; transport going idle.");
        // No dangling timers or stale handles, but the status is left as the
        // transport-goes-idle model keeps it
        engine.session.tracker.stop();
        engine.session.dispatcher = None;
        Ok(())
    }
}
