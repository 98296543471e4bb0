use std::sync::Arc;
use std::time::Duration;

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    core::ports::{SessionHandler, UnreadCountSource},
    domain::ApiError,
};

/// Why the poller stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerExit {
    Cancelled,
    SessionInvalid,
}

/// Periodically refreshes the unread notification count
pub struct UnreadPoller {
    source: Arc<dyn UnreadCountSource>,
    session: Arc<dyn SessionHandler>,
    interval: Duration,
    count_tx: watch::Sender<Option<u64>>,
    cancel_token: CancellationToken,
}

pub type NewUnreadPoller = (
    watch::Receiver<Option<u64>>, // latest count, None until the first success
    CancellationToken,            // shutdown signal
    UnreadPoller,
);

impl UnreadPoller {
    pub fn new(
        source: Arc<dyn UnreadCountSource>,
        session: Arc<dyn SessionHandler>,
        interval: Duration,
    ) -> NewUnreadPoller {
        let (count_tx, count_rx) = watch::channel(None);
        let cancel_token = CancellationToken::new();

        (
            count_rx,
            cancel_token.clone(),
            Self {
                source,
                session,
                interval,
                count_tx,
                cancel_token,
            },
        )
    }

    /// Run the poller in a background task
    pub fn run(self) -> JoinHandle<PollerExit> {
        tokio::spawn(async move { self.poll_loop().await })
    }

    async fn poll_loop(&self) -> PollerExit {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    log::info!("UnreadPoller received cancellation signal");
                    return PollerExit::Cancelled;
                }

                _ = ticker.tick() => {
                    match self.source.unread_count().await {
                        Ok(count) => {
                            self.count_tx.send_replace(Some(count));
                        }
                        Err(ApiError::Auth(reason)) => {
                            log::warn!("Unread count refused ({reason}), stopping poller");
                            self.session.on_session_invalid();
                            return PollerExit::SessionInvalid;
                        }
                        Err(e) => {
                            log::warn!("Failed to refresh unread count: {e}");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::infrastructure::session::{SessionStatus, SessionStore};

    struct ScriptedCounts(Mutex<VecDeque<Result<u64, ApiError>>>);

    #[async_trait]
    impl UnreadCountSource for ScriptedCounts {
        async fn unread_count(&self) -> Result<u64, ApiError> {
            self.0
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Auth("script finished".into())))
        }
    }

    fn source(results: Vec<Result<u64, ApiError>>) -> Arc<ScriptedCounts> {
        Arc::new(ScriptedCounts(Mutex::new(results.into())))
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_counts_and_skips_network_errors() {
        let session = Arc::new(SessionStore::new(Some("t".into())));
        let (mut rx, _cancel, poller) = UnreadPoller::new(
            source(vec![Ok(1), Ok(2), Err(ApiError::Network("down".into())), Ok(5)]),
            Arc::clone(&session) as Arc<dyn SessionHandler>,
            Duration::from_secs(30),
        );
        let handle = poller.run();

        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            if let Some(count) = *rx.borrow_and_update() {
                seen.push(count);
            }
        }

        assert_eq!(seen, vec![1, 2, 5]);
        assert_eq!(handle.await.ok(), Some(PollerExit::SessionInvalid));
        assert_eq!(session.status(), SessionStatus::Invalidated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_poller() {
        let session = Arc::new(SessionStore::anonymous());
        let (rx, cancel, poller) = UnreadPoller::new(
            source(vec![Ok(3); 100]),
            session,
            Duration::from_secs(10),
        );
        let handle = poller.run();

        time::sleep(Duration::from_secs(25)).await;
        cancel.cancel();

        assert_eq!(handle.await.ok(), Some(PollerExit::Cancelled));
        assert_eq!(*rx.borrow(), Some(3));
    }
}
