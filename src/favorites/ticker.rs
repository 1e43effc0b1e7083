//! Background label recompute loop.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::Snapshot;
use super::entry::relabel_all;
use crate::clock::Clock;

/// Default period between label recomputes.
pub const DEFAULT_LABEL_TICK: Duration = Duration::from_secs(1);

/// Handle to a running label recompute loop.
///
/// The loop stops on [`RecomputeTicker::cancel`], when the handle is dropped,
/// or when the owning cache goes away.
#[derive(Debug)]
pub struct RecomputeTicker {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RecomputeTicker {
    /// Spawns the loop on the current tokio runtime.
    pub(crate) fn spawn(
        state: Weak<watch::Sender<Snapshot>>,
        clock: Arc<dyn Clock>,
        period: Duration,
    ) -> Self {
        let period = period.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(state) = state.upgrade() else {
                    break;
                };
                recompute(&state, clock.now());
            }
            debug!("Favorites cache dropped; label loop exiting");
        });
        debug!(period_ms = period.as_millis(), "Label recompute loop started");
        Self {
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Stops the loop. Returns `true` if this call stopped it; later calls
    /// are no-ops returning `false`.
    pub fn cancel(&self) -> bool {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(handle) => {
                handle.abort();
                debug!("Label recompute loop cancelled");
                true
            }
            None => false,
        }
    }

    /// Returns `true` while the loop task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for RecomputeTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Relabels the published snapshot in place; readers see either the old or
/// the new sequence, never a mix.
pub(crate) fn recompute(state: &watch::Sender<Snapshot>, now: chrono::DateTime<chrono::Utc>) {
    state.send_if_modified(|entries| match relabel_all(entries, now) {
        Some(relabeled) => {
            *entries = relabeled;
            true
        }
        None => false,
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, TimeDelta, Utc};

    use super::*;
    use crate::api::FavoriteRecord;
    use crate::clock::ManualClock;
    use crate::favorites::FavoriteEntry;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn state_with_one_entry() -> Arc<watch::Sender<Snapshot>> {
        let record = FavoriteRecord {
            artist_id: "a".to_string(),
            title: "Picasso".to_string(),
            thumbnail: None,
            nationality: None,
            birth: None,
            added_at: Some("2024-05-01T11:59:30Z".to_string()),
        };
        let entries: Snapshot = vec![FavoriteEntry::from_record(record, start())].into();
        let (sender, _) = watch::channel(entries);
        Arc::new(sender)
    }

    #[tokio::test]
    async fn test_ticker_relabels_without_refetch() {
        let state = state_with_one_entry();
        let mut receiver = state.subscribe();
        let clock = ManualClock::new(start());
        let ticker = RecomputeTicker::spawn(
            Arc::downgrade(&state),
            Arc::new(clock.clone()),
            Duration::from_millis(10),
        );
        assert_eq!(
            receiver.borrow_and_update()[0].time_ago_label.as_deref(),
            Some("30 seconds ago")
        );

        clock.advance(TimeDelta::seconds(30));
        tokio::time::timeout(Duration::from_secs(5), receiver.changed())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            receiver.borrow()[0].time_ago_label.as_deref(),
            Some("1 minutes ago")
        );
        assert!(ticker.is_running());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let state = state_with_one_entry();
        let ticker = RecomputeTicker::spawn(
            Arc::downgrade(&state),
            Arc::new(ManualClock::new(start())),
            Duration::from_millis(10),
        );

        assert!(ticker.cancel());
        assert!(!ticker.cancel());
        assert!(!ticker.is_running());
    }

    #[tokio::test]
    async fn test_loop_exits_when_state_dropped() {
        let state = state_with_one_entry();
        let ticker = RecomputeTicker::spawn(
            Arc::downgrade(&state),
            Arc::new(ManualClock::new(start())),
            Duration::from_millis(5),
        );
        drop(state);

        tokio::time::timeout(Duration::from_secs(5), async {
            while ticker.is_running() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn test_recompute_skips_notification_when_unchanged() {
        let state = state_with_one_entry();
        let mut receiver = state.subscribe();
        receiver.borrow_and_update();

        recompute(&state, start() + TimeDelta::seconds(0));

        assert!(!receiver.has_changed().unwrap());
    }
}
