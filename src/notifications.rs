use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::api::DashboardApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A previous fetch is still outstanding.
    Skipped,
    Updated(u64),
    Failed,
}

#[derive(Debug, Default)]
pub struct NotificationPoller {
    unread: AtomicU64,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl NotificationPoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unread(&self) -> u64 {
        self.unread.load(Ordering::Acquire)
    }

    /// Fetches the unread count unless a fetch is already outstanding.
    /// A failed fetch keeps the last known count.
    pub async fn poll_once(&self, api: &dyn DashboardApi) -> PollOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("unread count fetch still in flight, skipping tick");
            return PollOutcome::Skipped;
        }
        let _guard = InFlight(&self.in_flight);

        match api.unread_notifications().await {
            Ok(count) => {
                self.unread.store(count, Ordering::Release);
                PollOutcome::Updated(count)
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch unread notifications");
                PollOutcome::Failed
            }
        }
    }

    pub async fn run(self: Arc<Self>, api: Arc<dyn DashboardApi>, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.poll_once(api.as_ref()).await;
        }
    }

    /// Starts polling on the current runtime; abort the handle to stop.
    pub fn spawn(self: &Arc<Self>, api: Arc<dyn DashboardApi>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run(api, period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, Failure};

    #[tokio::test(start_paused = true)]
    async fn overlapping_polls_are_skipped() {
        let api = FakeApi::new();
        api.set_unread(4, Duration::from_millis(100));
        let poller = NotificationPoller::new();

        let second = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            poller.poll_once(&api).await
        };
        let (first, second) = tokio::join!(poller.poll_once(&api), second);
        assert_eq!(first, PollOutcome::Updated(4));
        assert_eq!(second, PollOutcome::Skipped);
        assert_eq!(api.unread_calls(), 1);

        // the flag is released once the fetch settles
        assert_eq!(poller.poll_once(&api).await, PollOutcome::Updated(4));
    }

    #[tokio::test]
    async fn failure_keeps_last_count() {
        let api = FakeApi::new();
        api.set_unread(7, Duration::ZERO);
        let poller = NotificationPoller::new();
        poller.poll_once(&api).await;
        api.fail_unread(Some(Failure::Status(503)));
        assert_eq!(poller.poll_once(&api).await, PollOutcome::Failed);
        assert_eq!(poller.unread(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_loop_polls_each_period() {
        let api = Arc::new(FakeApi::new());
        api.set_unread(2, Duration::ZERO);
        let poller = Arc::new(NotificationPoller::new());
        let handle = poller.spawn(api.clone(), Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(65)).await;
        handle.abort();
        assert_eq!(api.unread_calls(), 3);
        assert_eq!(poller.unread(), 2);
    }
}
