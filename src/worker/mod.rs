//! Background work - a periodic job with a connectivity constraint and retries.
//!
//! [`Scheduler`] owns at most one running job. Scheduling again aborts the previous
//! task and starts the new one. Each tick first asks [`Connectivity`] whether the
//! network is usable; when it is not, the tick is skipped. A failing run is retried
//! with exponential backoff and then abandoned until the next tick.

pub mod checks;

use crate::config::WorkerConfig;
use crate::errors::Result;
use crate::remote::MemoryRemoteStore;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Network constraint checked before each run
#[async_trait]
pub trait Connectivity: Send + Sync {
    /// Whether the remote store can be reached right now
    async fn is_online(&self) -> bool;
}

/// Connectivity that never blocks a run
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnline;

#[async_trait]
impl Connectivity for AlwaysOnline {
    async fn is_online(&self) -> bool {
        true
    }
}

#[async_trait]
impl Connectivity for MemoryRemoteStore {
    async fn is_online(&self) -> bool {
        !self.is_offline()
    }
}

/// Exponential backoff settings for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any delay
    pub max_backoff: Duration,
    /// Retries after the first attempt before giving up
    pub max_retries: u32,
}

impl From<&WorkerConfig> for RetryPolicy {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
            max_retries: config.max_retries,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): doubles each time, capped.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

/// Runs `job` until it succeeds or `policy.max_retries` retries have failed.
pub async fn run_with_retry<F, Fut, T>(name: &str, policy: RetryPolicy, mut job: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match job().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries => {
                let delay = policy.backoff_delay(attempt);
                warn!(job = name, attempt, ?delay, error = %e, "Job failed, retrying");
                time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(job = name, attempts = attempt + 1, error = %e, "Job failed, giving up until next run");
                return Err(e);
            }
        }
    }
}

/// Holds the single periodic task of one named job
#[derive(Debug)]
pub struct Scheduler {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Scheduler with nothing running
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: None,
        }
    }

    /// Starts `job` every `interval`, first run immediately.
    ///
    /// A job already scheduled here is aborted and replaced.
    pub fn schedule_periodic<F, Fut>(
        &mut self,
        interval: Duration,
        policy: RetryPolicy,
        connectivity: Arc<dyn Connectivity>,
        mut job: F,
    ) where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if self.cancel() {
            info!(job = %self.name, "Replacing scheduled job");
        }

        let name = self.name.clone();
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = time::interval(interval.max(Duration::from_secs(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !connectivity.is_online().await {
                    debug!(job = %name, "Offline, skipping run");
                    continue;
                }
                // Errors are already logged; the next tick tries again
                let _ = run_with_retry(&name, policy, &mut job).await;
            }
        }));
        info!(job = %self.name, ?interval, "Job scheduled");
    }

    /// Aborts the running task; returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a task is scheduled and still alive
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(4),
            max_retries: 3,
        }
    }

    fn counting_job(counter: &Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<Result<()>> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(()))
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = WorkerConfig::default();
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.backoff_delay(0), Duration::from_secs(30));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(60));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(240));
        assert_eq!(policy.backoff_delay(10), Duration::from_secs(3600));
        assert_eq!(policy.backoff_delay(u32::MAX), Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_retry_recovers() {
        let calls = AtomicUsize::new(0);
        let result = run_with_retry("flaky", policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::Remote {
                        message: "timeout".to_string(),
                    })
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.ok(), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_retry_gives_up() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = run_with_retry("broken", policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(Error::Remote {
                    message: "down".to_string(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_job_runs_each_interval() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new("checks");
        scheduler.schedule_periodic(
            Duration::from_secs(60),
            policy(),
            Arc::new(AlwaysOnline),
            counting_job(&runs),
        );
        assert!(scheduler.is_scheduled());

        time::sleep(Duration::from_secs(150)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        assert!(scheduler.cancel());
        assert!(!scheduler.is_scheduled());
        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_previous_job() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new("checks");

        scheduler.schedule_periodic(
            Duration::from_secs(60),
            policy(),
            Arc::new(AlwaysOnline),
            counting_job(&first),
        );
        time::sleep(Duration::from_secs(10)).await;
        let first_runs = first.load(Ordering::SeqCst);

        scheduler.schedule_periodic(
            Duration::from_secs(60),
            policy(),
            Arc::new(AlwaysOnline),
            counting_job(&second),
        );
        time::sleep(Duration::from_secs(200)).await;

        assert_eq!(first.load(Ordering::SeqCst), first_runs);
        assert!(second.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_ticks_are_skipped() {
        let runs = Arc::new(AtomicUsize::new(0));
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.set_offline(true);

        let mut scheduler = Scheduler::new("checks");
        scheduler.schedule_periodic(
            Duration::from_secs(60),
            policy(),
            remote.clone(),
            counting_job(&runs),
        );
        time::sleep(Duration::from_secs(130)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        remote.set_offline(false);
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
