use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::Scheduler;

fn ticker(start: Instant, period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Per-unit timer: submits a tick every cadence until the unit is cancelled.
///
/// The first tick fires immediately. A cadence change restarts the period
/// from the moment it is observed.
pub(super) fn spawn_timer(
    scheduler: Scheduler,
    id: String,
    cancel: CancellationToken,
    mut cadence: watch::Receiver<Duration>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = *cadence.borrow_and_update();
        let mut interval = ticker(Instant::now(), period);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                changed = cadence.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let period = *cadence.borrow_and_update();
                    log::debug!("cadence_changed id={} interval_secs={}", id, period.as_secs());
                    let now = Instant::now();
                    interval = ticker(now.checked_add(period).unwrap_or(now), period);
                }
                _ = interval.tick() => {
                    if let Err(error) = scheduler.submit(&id).await {
                        log::warn!("tick_rejected id={} error={}", id, error);
                    }
                }
            }
        }

        log::debug!("timer_stopped id={}", id);
    })
}
