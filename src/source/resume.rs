//! Reconnecting wrapper for remote byte streams
//!
//! Feeds the transcoding stage. A transient mid-stream failure re-opens the
//! remote stream at the byte offset already consumed, waiting an
//! exponentially growing (capped) delay between attempts. The attempt budget
//! refills after successful progress, so only a sustained outage exhausts it;
//! exhaustion is reported as a stream item error, reaching whoever is
//! consuming the audio rather than the original `acquire` call.

use crate::remote::models::Encoding;
use crate::remote::RemoteSource;
use crate::source::ByteStream;
use futures_util::{stream, StreamExt};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const LOG_TARGET: &str = "resono::source::resume";

/// Reconnect limits for an interrupted remote stream.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectBudget {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub delay_cap: Duration,
}

impl Default for ReconnectBudget {
    fn default() -> Self {
        ReconnectBudget {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
            delay_cap: Duration::from_secs(5),
        }
    }
}

impl ReconnectBudget {
    /// Budget taken from the configured reconnect limits.
    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        ReconnectBudget {
            max_attempts: settings.reconnect_max_attempts,
            base_delay: Duration::from_millis(settings.reconnect_base_delay_ms),
            delay_cap: Duration::from_millis(settings.reconnect_delay_cap_ms),
        }
    }

    fn delay_for(&self, used_attempts: u32) -> Duration {
        let factor = 1u32 << used_attempts.min(16);
        self.base_delay.saturating_mul(factor).min(self.delay_cap)
    }
}

struct ResumeState {
    remote: Arc<dyn RemoteSource>,
    encoding: Encoding,
    budget: ReconnectBudget,
    offset: u64,
    used_attempts: u32,
    current: Option<ByteStream>,
    exhausted: bool,
}

/// Wraps `RemoteSource::fetch` into a stream that survives transient
/// interruptions by refetching from the consumed byte offset.
pub fn resumable_stream(
    remote: Arc<dyn RemoteSource>,
    encoding: Encoding,
    budget: ReconnectBudget,
) -> ByteStream {
    let state = ResumeState {
        remote,
        encoding,
        budget,
        offset: 0,
        used_attempts: 0,
        current: None,
        exhausted: false,
    };

    Box::pin(stream::unfold(state, |mut st| async move {
        if st.exhausted {
            return None;
        }
        loop {
            if st.current.is_none() {
                match st.remote.fetch(&st.encoding, st.offset).await {
                    Ok(stream) => {
                        st.current = Some(stream);
                    }
                    Err(e) => {
                        if st.used_attempts >= st.budget.max_attempts {
                            warn!(
                                target: LOG_TARGET,
                                "Reconnect budget exhausted after {} attempts at offset {}",
                                st.used_attempts,
                                st.offset
                            );
                            st.exhausted = true;
                            let err = io::Error::new(
                                io::ErrorKind::BrokenPipe,
                                format!("reconnect budget exhausted: {}", e),
                            );
                            return Some((Err(err), st));
                        }
                        let delay = st.budget.delay_for(st.used_attempts);
                        st.used_attempts += 1;
                        debug!(
                            target: LOG_TARGET,
                            "Reconnect attempt {} failed ({}); retrying in {:?}",
                            st.used_attempts,
                            e,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                }
            }

            let next = match st.current.as_mut() {
                Some(stream) => stream.next().await,
                None => continue,
            };
            match next {
                Some(Ok(chunk)) => {
                    st.offset += chunk.len() as u64;
                    // Progress made; refill the budget for the next gap
                    st.used_attempts = 0;
                    return Some((Ok(chunk), st));
                }
                Some(Err(e)) => {
                    warn!(
                        target: LOG_TARGET,
                        "Stream interrupted at offset {}: {}", st.offset, e
                    );
                    st.current = None;
                    if st.used_attempts >= st.budget.max_attempts {
                        st.exhausted = true;
                        let err = io::Error::new(
                            io::ErrorKind::BrokenPipe,
                            format!("reconnect budget exhausted: {}", e),
                        );
                        return Some((Err(err), st));
                    }
                    let delay = st.budget.delay_for(st.used_attempts);
                    st.used_attempts += 1;
                    tokio::time::sleep(delay).await;
                    continue;
                }
                None => {
                    debug!(target: LOG_TARGET, "Remote stream complete at offset {}", st.offset);
                    return None;
                }
            }
        }
    }))
}
