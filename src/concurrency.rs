//! Bounded-concurrency task execution
//!
//! Runs an ordered list of task factories with at most N futures in flight
//! and returns their outcomes in input order, regardless of which task
//! finished first. Everything is polled cooperatively from the caller's task;
//! nothing is spawned.
//!
//! Each factory receives a [`CancellationToken`]. In fail-fast mode the token
//! is cancelled when the first task fails, so in-flight siblings can stop
//! early; they are still awaited before returning, so no work is left
//! running untracked.

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt::Display;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Executes task factories with a fixed concurrency bound.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyLimiter {
    limit: usize,
}

impl ConcurrencyLimiter {
    /// Create a limiter allowing `limit` tasks in flight. `limit` must be at least 1.
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            anyhow::bail!("Concurrency limit must be greater than 0");
        }
        Ok(Self { limit })
    }

    /// Maximum number of tasks in flight.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run every factory and collect every outcome, in input order.
    ///
    /// A failed task does not stop the batch; its error is logged and stored
    /// in its slot, and the next factory starts in its place.
    pub async fn run<T, E, F, Fut>(&self, factories: Vec<F>) -> Vec<Result<T, E>>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let cancel = CancellationToken::new();
        let (slots, _) = self.execute(factories, &cancel, false).await;
        // Collect-all mode starts every factory, so every slot is filled.
        slots.into_iter().flatten().collect()
    }

    /// Run factories until the first failure.
    ///
    /// On the first error the token handed to the tasks is cancelled, no
    /// further factories are started, in-flight tasks are drained, and the
    /// first error is returned. `parent` lets the caller cancel the whole
    /// batch from outside; cancelling the batch never cancels `parent`.
    pub async fn try_run<T, E, F, Fut>(
        &self,
        factories: Vec<F>,
        parent: &CancellationToken,
    ) -> Result<Vec<T>, E>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let cancel = parent.child_token();
        let (slots, first_error) = self.execute(factories, &cancel, true).await;
        if let Some(err) = first_error {
            return Err(err);
        }

        let mut results = Vec::with_capacity(slots.len());
        for slot in slots.into_iter().flatten() {
            results.push(slot?);
        }
        Ok(results)
    }

    /// Core scheduling loop shared by both modes.
    ///
    /// Returns one slot per factory (`None` for factories never started) and,
    /// when running fail-fast, the first error taken out of its slot.
    async fn execute<T, E, F, Fut>(
        &self,
        factories: Vec<F>,
        cancel: &CancellationToken,
        fail_fast: bool,
    ) -> (Vec<Option<Result<T, E>>>, Option<E>)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let total = factories.len();
        let mut slots: Vec<Option<Result<T, E>>> = (0..total).map(|_| None).collect();
        let mut first_error = None;

        let launch = |index: usize, factory: F| {
            let token = cancel.clone();
            async move { (index, factory(token).await) }
        };

        let mut pending = factories.into_iter().enumerate();
        let mut in_flight = FuturesUnordered::new();
        for (index, factory) in pending.by_ref().take(self.limit) {
            in_flight.push(launch(index, factory));
        }
        debug!(total, limit = self.limit, started = in_flight.len(), "Running task batch");

        while let Some((index, outcome)) = in_flight.next().await {
            match outcome {
                Err(err) if fail_fast && first_error.is_none() => {
                    error!(task = index, total, "Task {} failed, cancelling batch: {}", index, err);
                    cancel.cancel();
                    first_error = Some(err);
                }
                outcome => {
                    if let Err(err) = &outcome {
                        error!(task = index, total, "Task {} failed: {}", index, err);
                    }
                    slots[index] = Some(outcome);
                }
            }

            if first_error.is_none() {
                if let Some((next, factory)) = pending.next() {
                    in_flight.push(launch(next, factory));
                }
            }
        }

        (slots, first_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    /// Tracks how many tasks are running and the highest value seen.
    #[derive(Default)]
    struct InFlight {
        current: AtomicUsize,
        peak: AtomicUsize,
        started: AtomicUsize,
    }

    impl InFlight {
        fn enter(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(ConcurrencyLimiter::new(0).is_err());
        assert_eq!(ConcurrencyLimiter::new(3).unwrap().limit(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_keep_input_order() {
        let limiter = ConcurrencyLimiter::new(3).unwrap();
        let tracker = Arc::new(InFlight::default());

        let factories: Vec<_> = (0..10u64)
            .map(|i| {
                let tracker = tracker.clone();
                move |_token: CancellationToken| async move {
                    tracker.enter();
                    // Earlier tasks take longer, so completion order is reversed.
                    sleep(Duration::from_millis(10 - i)).await;
                    tracker.exit();
                    Ok::<u64, anyhow::Error>(i * 100)
                }
            })
            .collect();

        let results = limiter.run(factories).await;
        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, (0..10u64).map(|i| i * 100).collect::<Vec<_>>());
        assert_eq!(tracker.peak.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.started.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_above_len_starts_everything() {
        let limiter = ConcurrencyLimiter::new(16).unwrap();
        let start = Instant::now();

        let factories: Vec<_> = (0..5u64)
            .map(|i| {
                move |_token: CancellationToken| async move {
                    let started_at = start.elapsed();
                    sleep(Duration::from_millis(50)).await;
                    Ok::<_, anyhow::Error>((i, started_at))
                }
            })
            .collect();

        let results = limiter.try_run(factories, &CancellationToken::new()).await.unwrap();
        for (position, (i, started_at)) in results.into_iter().enumerate() {
            assert_eq!(position as u64, i);
            assert_eq!(started_at, Duration::ZERO);
        }
        // All five ran side by side.
        assert_eq!(start.elapsed(), Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_all_keeps_failures_in_place() {
        let limiter = ConcurrencyLimiter::new(2).unwrap();
        let factories: Vec<_> = (0..4u32)
            .map(|i| {
                move |_token: CancellationToken| async move {
                    if i == 1 {
                        Err(format!("task {} broke", i))
                    } else {
                        Ok(i)
                    }
                }
            })
            .collect();

        let results = limiter.run(factories).await;
        assert_eq!(results.len(), 4);
        assert_eq!(results[0], Ok(0));
        assert_eq!(results[1], Err("task 1 broke".to_string()));
        assert_eq!(results[2], Ok(2));
        assert_eq!(results[3], Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fast_cancels_siblings() {
        let limiter = ConcurrencyLimiter::new(3).unwrap();
        let tracker = Arc::new(InFlight::default());
        let start = Instant::now();

        let factories: Vec<_> = (0..8u32)
            .map(|i| {
                let tracker = tracker.clone();
                move |token: CancellationToken| async move {
                    tracker.enter();
                    let outcome = if i == 1 {
                        sleep(Duration::from_millis(5)).await;
                        Err(anyhow::anyhow!("task {} failed", i))
                    } else {
                        tokio::select! {
                            _ = token.cancelled() => Err(anyhow::anyhow!("task {} cancelled", i)),
                            _ = sleep(Duration::from_secs(60)) => Ok(i),
                        }
                    };
                    tracker.exit();
                    outcome
                }
            })
            .collect();

        let parent = CancellationToken::new();
        let err = limiter.try_run(factories, &parent).await.unwrap_err();
        assert_eq!(err.to_string(), "task 1 failed");
        // Siblings stopped at cancellation instead of running for a minute.
        assert_eq!(start.elapsed(), Duration::from_millis(5));
        // Nothing beyond the first window was launched, and nothing is left running.
        assert_eq!(tracker.started.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.current.load(Ordering::SeqCst), 0);
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let limiter = ConcurrencyLimiter::new(4).unwrap();
        let factories: Vec<fn(CancellationToken) -> futures::future::Ready<Result<u8, String>>> =
            Vec::new();
        assert!(limiter.run(factories).await.is_empty());
    }
}
