//! Interval polling with liveness guarding.
//!
//! Each poller is a task that fetches immediately, then once per interval,
//! and publishes the result on a [`watch`] channel. Cancelling its token
//! (or dropping the [`PollHandle`]) stops the loop, and a response that
//! lands after cancellation is discarded instead of published.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use skilltrade_api::ApiResult;

use crate::session::Session;

/// Trade status and chat both refresh on this cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Owns a running poller. Dropping it stops the poller.
pub struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Starts a poller.
///
/// * `cancel` - usually a child of the owning view's token, so closing the
///   view stops every poller it started.
/// * `on_update` - runs for each published value, before it is published.
pub(crate) fn spawn_poll<T, F, Fut, U>(
    session: Arc<Session>,
    label: String,
    interval: Duration,
    cancel: CancellationToken,
    sink: Arc<watch::Sender<Option<T>>>,
    mut fetch: F,
    on_update: U,
) -> PollHandle
where
    T: Send + Sync + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ApiResult<T>> + Send,
    U: Fn(&T) + Send + 'static,
{
    let token = cancel.clone();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                _ = token.cancelled() => break,
                result = fetch() => result,
            };

            // The owner may have gone away while the request was in flight
            if token.is_cancelled() {
                debug!("{}: dropping response that arrived after stop", label);
                break;
            }

            match result {
                Ok(value) => {
                    on_update(&value);
                    sink.send_replace(Some(value));
                }
                Err(e) if e.is_unauthorized() => {
                    session.set_unauthenticated().await;
                    break;
                }
                Err(e) => {
                    warn!("{}: poll failed: {}", label, e);
                }
            }
        }

        debug!("{}: poller stopped", label);
    });

    PollHandle { cancel, task }
}
