//! Bounded polling for slow resource creation.
//!
//! Environment and database creation can take many minutes. The reconcilers
//! wait with a fixed interval against a wall-clock budget; exceeding the
//! budget is *not* a failure, because the underlying resource may still
//! complete after the process exits. The caller receives [`PollStatus::Timeout`]
//! and decides how loudly to warn.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Interval and wall-clock budget for one polling wait.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Time between probes.
    pub interval: Duration,
    /// Maximum total time to wait before giving up.
    pub budget: Duration,
}

impl PollConfig {
    /// Create a polling configuration.
    pub const fn new(interval: Duration, budget: Duration) -> Self {
        Self { interval, budget }
    }

    /// Budget for Elastic Beanstalk environment creation.
    pub const fn environment() -> Self {
        Self::new(Duration::from_secs(20), Duration::from_secs(900))
    }

    /// Budget for RDS instance and replica creation.
    pub const fn database() -> Self {
        Self::new(Duration::from_secs(20), Duration::from_secs(1800))
    }
}

/// Outcome of a bounded wait.
#[derive(Debug)]
pub enum PollStatus<T> {
    /// The probe reported the resource ready.
    Ready(T),
    /// The budget elapsed before the resource was ready.
    Timeout,
    /// The probe itself failed; the error is fatal to the run.
    Failed(Error),
}

impl<T> PollStatus<T> {
    /// Whether the resource became ready within the budget.
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Probe repeatedly until ready, failed, or out of budget.
///
/// The probe returns `Ok(Some(value))` when the resource is ready,
/// `Ok(None)` to keep waiting, and `Err` on a fatal API failure.
pub async fn poll_until<T, F, Fut>(config: PollConfig, what: &str, mut probe: F) -> PollStatus<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let started = Instant::now();
    loop {
        match probe().await {
            Ok(Some(value)) => {
                debug!(what, elapsed = ?started.elapsed(), "resource ready");
                return PollStatus::Ready(value);
            }
            Ok(None) => {}
            Err(err) => return PollStatus::Failed(err),
        }

        if started.elapsed() + config.interval > config.budget {
            warn!(
                what,
                budget = ?config.budget,
                "wait budget exhausted; resource may still complete asynchronously"
            );
            return PollStatus::Timeout;
        }

        tokio::time::sleep(config.interval).await;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn small_config() -> PollConfig {
        PollConfig::new(Duration::from_millis(10), Duration::from_millis(100))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe_calls = calls.clone();

        let status = poll_until(small_config(), "instance", move || {
            let calls = probe_calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n >= 3 { Ok(Some(n)) } else { Ok(None) }
            }
        })
        .await;

        assert!(status.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_not_an_error() {
        let status: PollStatus<()> =
            poll_until(small_config(), "instance", || async { Ok(None) }).await;
        assert!(matches!(status, PollStatus::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_propagates() {
        let status: PollStatus<()> = poll_until(small_config(), "instance", || async {
            Err(Error::api("describe_db_instance", "boom"))
        })
        .await;
        assert!(matches!(status, PollStatus::Failed(_)));
    }
}
