//! Inter-upload pacing
//!
//! The destination throttles rapid writes, so the engine pauses between
//! groups according to a [`PacingPolicy`].

use crate::config::PacingPolicy;
use std::time::Duration;
use tokio::time::Instant;

/// Applies a pacing policy between uploads
#[derive(Debug)]
pub struct Pacer {
    policy: PacingPolicy,
    tokens: f64,
    last_refill: Option<Instant>,
}

impl Pacer {
    pub fn new(policy: PacingPolicy) -> Self {
        let tokens = match &policy {
            PacingPolicy::TokenBucket { capacity, .. } => f64::from(*capacity),
            _ => 0.0,
        };

        Self {
            policy,
            tokens,
            last_refill: None,
        }
    }

    /// Waits as long as the policy requires before the next upload
    pub async fn pause(&mut self) {
        let delay = self.next_delay(Instant::now());
        if !delay.is_zero() {
            tracing::trace!(delay_ms = delay.as_millis() as u64, "Pacing before next group");
            tokio::time::sleep(delay).await;
        }
    }

    /// Delay owed at `now`, consuming one slot
    fn next_delay(&mut self, now: Instant) -> Duration {
        match self.policy {
            PacingPolicy::None => Duration::ZERO,
            PacingPolicy::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            PacingPolicy::TokenBucket {
                capacity,
                refill_per_second,
            } => {
                if let Some(last) = self.last_refill {
                    let elapsed = now.saturating_duration_since(last).as_secs_f64();
                    self.tokens = (self.tokens + elapsed * refill_per_second).min(f64::from(capacity));
                }

                if self.tokens >= 1.0 {
                    self.tokens -= 1.0;
                    self.last_refill = Some(now);
                    Duration::ZERO
                } else {
                    let wait = (1.0 - self.tokens) / refill_per_second;
                    self.tokens = 0.0;
                    let wait = Duration::from_secs_f64(wait);
                    // The slot is consumed at the end of the wait
                    self.last_refill = Some(now + wait);
                    wait
                }
            }
        }
    }
}
