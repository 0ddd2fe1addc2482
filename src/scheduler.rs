//! Fixed-period job loop with an injectable clock.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

/// Source of time for the scheduler.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by tokio's timer.
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Work run on every scheduler cycle.
#[async_trait]
pub trait Job: Send {
    async fn run(&mut self);
}

/// Runs a job once immediately and then every `period`.
///
/// The loop wakes every `tick` to check whether the next run is due. The
/// next run is measured from the end of the previous one, so a slow job
/// delays the schedule instead of triggering catch-up runs.
#[derive(Debug, Clone)]
pub struct Scheduler {
    period: Duration,
    tick: Duration,
    max_runs: Option<usize>,
}

impl Scheduler {
    pub fn every(period: Duration) -> Self {
        Self {
            period,
            tick: Duration::from_secs(1),
            max_runs: None,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Stop after `max_runs` runs. `None` runs until the future is dropped.
    pub fn with_max_runs(mut self, max_runs: Option<usize>) -> Self {
        self.max_runs = max_runs;
        self
    }

    /// Returns the number of completed runs.
    pub async fn run<C, J>(&self, clock: &C, job: &mut J) -> usize
    where
        C: Clock + ?Sized,
        J: Job + ?Sized,
    {
        let mut runs = 0;
        if self.max_runs == Some(0) {
            return runs;
        }

        job.run().await;
        runs += 1;
        let mut next_run = clock.now() + self.period;

        loop {
            if self.max_runs.is_some_and(|max| runs >= max) {
                return runs;
            }

            clock.sleep(self.tick).await;

            if clock.now() >= next_run {
                debug!(run = runs + 1, "Scheduled run due");
                job.run().await;
                runs += 1;
                next_run = clock.now() + self.period;
            }
        }
    }
}
