//! Benchmark pacing: emit request tickets at a fixed per-second rate.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

/// Emits `rps` request-execution tickets on every 1-second tick until the
/// configured number of seconds has elapsed.
///
/// Each tick releases its whole batch at once, so emission is bursty at the
/// second boundary rather than spread across the window. In-flight requests
/// may outlive the final tick; the caller decides when the workload is done
/// by counting collected stats, not by watching this dispatcher.
pub(crate) struct Dispatcher {
    rps: u64,
    seconds: u64,
}

impl Dispatcher {
    pub(crate) fn new(rps: u64, seconds: u64) -> Self {
        Self { rps, seconds }
    }

    /// Fire tickets until the duration is exhausted. `fire` runs once per
    /// ticket and must not block the dispatch loop.
    pub(crate) async fn run<F: FnMut()>(self, mut fire: F) {
        let mut ticker = time::interval(Duration::from_secs(1));
        // A delayed tick still fires its batch so the total ticket count is
        // exact.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        let mut seconds_left = self.seconds;
        while seconds_left > 0 {
            ticker.tick().await;
            seconds_left -= 1;
            for _ in 0..self.rps {
                fire();
            }
        }
    }
}
