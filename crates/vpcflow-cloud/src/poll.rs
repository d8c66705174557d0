//! Bounded fixed-interval polling
//!
//! Used for the two resources whose readiness is driven by the provider:
//! the network interface and the instance.

use crate::error::Result;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;
use vpcflow_config::PollSettings;

/// Polling bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between checks (no backoff, no jitter)
    pub interval: Duration,
    /// Maximum number of checks
    pub max_attempts: u32,
    /// Optional wall-clock deadline measured from the first check
    pub deadline: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig::from(&PollSettings::default())
    }
}

impl From<&PollSettings> for PollConfig {
    fn from(settings: &PollSettings) -> Self {
        Self {
            interval: settings.interval(),
            max_attempts: settings.max_attempts,
            deadline: settings.timeout(),
        }
    }
}

/// How a poll ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready { attempts: u32 },
    TimedOut { attempts: u32, elapsed: Duration },
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }
}

/// Run `check` until it returns `Ok(true)` or the bounds are exhausted
///
/// An `Err` from `check` ends the poll immediately and is returned as is;
/// errors are never counted as "not ready".
pub async fn poll_until<F, Fut>(config: &PollConfig, resource: &str, mut check: F) -> Result<PollOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        if check().await? {
            debug!(resource = %resource, attempts, "Resource ready");
            return Ok(PollOutcome::Ready { attempts });
        }

        let elapsed = start.elapsed();
        let out_of_time = config
            .deadline
            .is_some_and(|deadline| elapsed + config.interval > deadline);
        if attempts >= config.max_attempts || out_of_time {
            debug!(resource = %resource, attempts, elapsed_ms = elapsed.as_millis(), "Gave up waiting");
            return Ok(PollOutcome::TimedOut { attempts, elapsed });
        }

        debug!(
            resource = %resource,
            attempt = attempts,
            delay_ms = config.interval.as_millis(),
            "Resource not ready, retrying"
        );
        sleep(config.interval).await;
    }
}
