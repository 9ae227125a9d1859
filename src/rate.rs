use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Pacing window applied when the remaining allowance runs low.
const PACING_WINDOW: Duration = Duration::from_millis(1000);

/// Calls are paced once the reported allowance drops to this level.
const LOW_ALLOWANCE_THRESHOLD: u32 = 2;

/// Soft admission control for one governed upstream API.
///
/// Tracks the remaining call allowance reported by the upstream and the time
/// of the last call. This is not a token bucket: it only engages near
/// exhaustion, delaying the single in-flight caller for the unused portion
/// of a one-second window. Callers against one governed API are strictly
/// sequential, so no synchronization is needed; every client owns its own
/// governor instance.
#[derive(Debug, Default)]
pub struct RateGovernor {
    remaining_allowance: Option<u32>,
    last_call: Option<Instant>,
}

impl RateGovernor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend the caller if the upstream allowance is nearly exhausted and
    /// the previous call was less than one pacing window ago.
    pub async fn before_call(&self) {
        let Some(remaining) = self.remaining_allowance else {
            return;
        };
        if remaining > LOW_ALLOWANCE_THRESHOLD {
            return;
        }
        let Some(last_call) = self.last_call else {
            return;
        };

        let elapsed = last_call.elapsed();
        if elapsed < PACING_WINDOW {
            let delay = PACING_WINDOW - elapsed;
            debug!(
                "Rate allowance low ({} remaining), pacing for {:?}",
                remaining, delay
            );
            sleep(delay).await;
        }
    }

    /// Record a completed call. The allowance is only updated when the
    /// response actually carried rate-limit metadata; absence leaves the
    /// prior state unchanged.
    pub fn after_call(&mut self, remaining: Option<u32>) {
        self.last_call = Some(Instant::now());
        if remaining.is_some() {
            self.remaining_allowance = remaining;
        }
    }

    pub fn remaining_allowance(&self) -> Option<u32> {
        self.remaining_allowance
    }
}
