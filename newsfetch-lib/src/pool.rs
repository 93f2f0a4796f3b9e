//! Bounded, throttled fetch pool.
//!
//! A batch is processed by a fixed set of worker tasks that pull task indices
//! from a shared cursor. Each worker resolves the task's domain, waits on the
//! [`DomainThrottle`], calls the [`PageFetcher`] and sends the outcome down a
//! single result channel. Individual failures never end the batch; only an
//! invalid configuration does, and it does so before any request is made.

use crate::domain::DomainKey;
use crate::error::FetchError;
use crate::fetcher::PageFetcher;
use crate::throttle::DomainThrottle;
use crate::types::{FetchConfig, FetchResult, FetchTask};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Slack added on top of the collaborator's own timeout before the pool gives up on a call.
const TIMEOUT_GRACE: Duration = Duration::from_secs(2);

/// Runs fetch batches with a worker cap and per-domain spacing.
///
/// # Example
///
/// ```rust,no_run
/// use newsfetch_lib::{FetchConfig, FetchPool, FetchTask, HttpPageFetcher};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = FetchConfig::default()
///         .with_max_workers(4)
///         .with_min_interval(Duration::from_millis(750));
///     let pool = FetchPool::with_config(HttpPageFetcher::with_config(&config)?, config);
///
///     let tasks = vec![
///         FetchTask::new("https://example.com/a"),
///         FetchTask::new("https://example.com/b"),
///     ];
///     for result in pool.run(tasks).await? {
///         println!("{} -> {} chars", result.task.url, result.content.len());
///     }
///     Ok(())
/// }
/// ```
pub struct FetchPool<F> {
    fetcher: Arc<F>,
    config: FetchConfig,
}

impl<F: PageFetcher + 'static> FetchPool<F> {
    /// Create a pool with default configuration.
    pub fn new(fetcher: F) -> Self {
        Self::with_config(fetcher, FetchConfig::default())
    }

    /// Create a pool with custom configuration.
    pub fn with_config(fetcher: F, config: FetchConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            config,
        }
    }

    /// Get the configuration for this pool.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Number of workers a batch of `task_count` tasks would actually get.
    pub fn effective_workers(&self, requested: usize, task_count: usize) -> usize {
        requested.min(self.config.max_workers).min(task_count)
    }

    /// Fetch every task using the configured worker cap.
    ///
    /// See [`FetchPool::run_with_workers`].
    pub async fn run(&self, tasks: Vec<FetchTask>) -> Result<Vec<FetchResult>, FetchError> {
        self.run_with_workers(tasks, self.config.max_workers).await
    }

    /// Fetch every task with at most `max_workers` requests in flight.
    ///
    /// The worker count is clamped to the configured cap and to the number of
    /// tasks. Exactly one result comes back per task, in input order; failed
    /// fetches carry an error and empty content.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::ConfigError` if `max_workers` is zero or the pool
    /// configuration is invalid. No request is made in that case.
    pub async fn run_with_workers(
        &self,
        tasks: Vec<FetchTask>,
        max_workers: usize,
    ) -> Result<Vec<FetchResult>, FetchError> {
        self.config.validate()?;
        if max_workers == 0 {
            return Err(FetchError::config("max_workers must be at least 1"));
        }
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let total = tasks.len();
        let workers = self.effective_workers(max_workers, total);
        let tasks: Arc<[FetchTask]> = tasks.into();
        let throttle = Arc::new(DomainThrottle::new(self.config.min_interval));
        let cursor = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        tracing::info!(
            tasks = total,
            workers,
            min_interval_ms = self.config.min_interval.as_millis() as u64,
            "starting fetch batch"
        );
        let batch_start = Instant::now();

        let mut worker_set = JoinSet::new();
        for id in 0..workers {
            let worker = Worker {
                id,
                tasks: tasks.clone(),
                cursor: cursor.clone(),
                throttle: throttle.clone(),
                fetcher: self.fetcher.clone(),
                timeout: self.config.timeout,
                results: tx.clone(),
            };
            worker_set.spawn(worker.run());
        }
        // Only workers hold senders now, so the channel closes when the last one exits.
        drop(tx);

        let mut slots: Vec<Option<FetchResult>> = (0..total).map(|_| None).collect();
        while let Some((idx, result)) = rx.recv().await {
            slots[idx] = Some(result);
        }

        while let Some(joined) = worker_set.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "fetch worker terminated abnormally");
            }
        }

        let results: Vec<FetchResult> = slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.unwrap_or_else(|| {
                    let task = tasks[idx].clone();
                    let domain = DomainKey::from_url(&task.url);
                    FetchResult::failure(
                        task,
                        domain,
                        FetchError::internal("worker exited before fetching this task"),
                        Instant::now(),
                        None,
                    )
                })
            })
            .collect();

        let failed = results.iter().filter(|r| !r.is_success()).count();
        tracing::info!(
            tasks = total,
            failed,
            domains = throttle.tracked_domains(),
            elapsed_ms = batch_start.elapsed().as_millis() as u64,
            "fetch batch finished"
        );

        Ok(results)
    }
}

/// Fetch `tasks` with default settings and at most `max_workers` in flight.
///
/// Shorthand for `FetchPool::new(fetcher).run_with_workers(tasks, max_workers)`.
pub async fn run_batch<F: PageFetcher + 'static>(
    tasks: Vec<FetchTask>,
    max_workers: usize,
    fetcher: F,
) -> Result<Vec<FetchResult>, FetchError> {
    FetchPool::new(fetcher)
        .run_with_workers(tasks, max_workers)
        .await
}

struct Worker<F> {
    id: usize,
    tasks: Arc<[FetchTask]>,
    cursor: Arc<AtomicUsize>,
    throttle: Arc<DomainThrottle>,
    fetcher: Arc<F>,
    timeout: Duration,
    results: mpsc::UnboundedSender<(usize, FetchResult)>,
}

impl<F: PageFetcher + 'static> Worker<F> {
    async fn run(self) {
        loop {
            let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
            let Some(task) = self.tasks.get(idx) else {
                break;
            };

            let result = self.process(task).await;
            if self.results.send((idx, result)).is_err() {
                // collector is gone, nobody is waiting for more results
                break;
            }
        }
        tracing::trace!(worker = self.id, "worker done");
    }

    async fn process(&self, task: &FetchTask) -> FetchResult {
        let domain = DomainKey::from_url(&task.url);
        let dispatched_at = self.throttle.acquire(&domain).await;
        tracing::debug!(worker = self.id, url = %task.url, domain = %domain, "dispatching");

        let call = tokio::time::timeout(
            self.timeout.saturating_add(TIMEOUT_GRACE),
            self.fetcher.fetch(&task.url, self.timeout),
        );
        let started = Instant::now();
        let outcome = AssertUnwindSafe(call).catch_unwind().await;
        let fetch_duration = started.elapsed();

        let error = match outcome {
            Ok(Ok(Ok(content))) => {
                return FetchResult::success(
                    task.clone(),
                    domain,
                    content,
                    dispatched_at,
                    fetch_duration,
                );
            }
            Ok(Ok(Err(e))) => e,
            Ok(Err(_)) => FetchError::timeout(&task.url, self.timeout),
            Err(panic) => FetchError::internal(format!(
                "page fetcher panicked: {}",
                panic_message(panic.as_ref())
            )),
        };

        tracing::warn!(url = %task.url, error = %error, "fetch failed");
        FetchResult::failure(
            task.clone(),
            domain,
            error,
            dispatched_at,
            Some(fetch_duration),
        )
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::fetch_fn;
    use std::collections::HashMap;

    fn tasks_for(urls: &[&str]) -> Vec<FetchTask> {
        urls.iter().map(|u| FetchTask::new(*u)).collect()
    }

    fn echo_pool(config: FetchConfig) -> FetchPool<impl PageFetcher> {
        let fetcher = fetch_fn(|url: String, _| async move { Ok::<_, FetchError>(format!("<{}>", url)) });
        FetchPool::with_config(fetcher, config)
    }

    #[tokio::test]
    async fn test_empty_batch_returns_immediately() {
        let pool = echo_pool(FetchConfig::default());
        let results = pool.run(Vec::new()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_zero_workers_is_rejected() {
        let pool = echo_pool(FetchConfig::default());
        let err = pool
            .run_with_workers(tasks_for(&["https://a.com"]), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ConfigError { .. }));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_work() {
        let config = FetchConfig {
            max_workers: 0,
            ..Default::default()
        };
        let pool = echo_pool(config);
        assert!(pool.run(tasks_for(&["https://a.com"])).await.is_err());
    }

    #[tokio::test]
    async fn test_huge_timeout_still_fetches() {
        let pool = echo_pool(FetchConfig::default().with_timeout(Duration::MAX));
        let results = pool
            .run(tasks_for(&["https://a.com/1", "https://b.com/2"]))
            .await
            .unwrap();

        assert!(results.iter().all(|r| r.is_success()), "{:?}", results);
        assert_eq!(results[0].content, "<https://a.com/1>");
    }

    #[test]
    fn test_effective_workers() {
        let pool = echo_pool(FetchConfig::default());
        assert_eq!(pool.effective_workers(10, 3), 3);
        assert_eq!(pool.effective_workers(50, 40), 10);
        assert_eq!(pool.effective_workers(4, 40), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_keep_input_order() {
        let pool = echo_pool(FetchConfig::default());
        let urls = ["https://a.com/1", "https://b.com/2", "https://a.com/3", "https://c.com/4"];
        let results = pool.run(tasks_for(&urls)).await.unwrap();

        let got: Vec<&str> = results.iter().map(|r| r.task.url.as_str()).collect();
        assert_eq!(got, urls);
        assert!(results.iter().all(|r| r.content == format!("<{}>", r.task.url)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_contained() {
        let fetcher = fetch_fn(|url: String, _| async move {
            if url.contains("broken") {
                Err(FetchError::network(url, "connection reset"))
            } else {
                Ok(format!("ok {}", url))
            }
        });
        let pool = FetchPool::new(fetcher);
        let results = pool
            .run(tasks_for(&["https://a.com", "https://broken.com", "https://c.com"]))
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        let broken = &results[1];
        assert!(broken.content.is_empty());
        assert!(matches!(broken.error, Some(FetchError::NetworkError { .. })));
        assert!(results[0].is_success() && results[2].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_fetcher_becomes_error_result() {
        let fetcher = fetch_fn(|url: String, _| async move {
            if url.ends_with("/boom") {
                panic!("parser exploded");
            }
            Ok::<_, FetchError>("fine".to_string())
        });
        let pool = FetchPool::new(fetcher);
        let results = pool
            .run(tasks_for(&["https://a.com/boom", "https://b.com/ok"]))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        match &results[0].error {
            Some(FetchError::Internal { message }) => assert!(message.contains("parser exploded")),
            other => panic!("expected internal error, got {:?}", other),
        }
        assert_eq!(results[1].content, "fine");
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_timeout_for_stuck_fetcher() {
        let fetcher = fetch_fn(|_url: String, _timeout| async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, FetchError>(String::new())
        });
        let config = FetchConfig::default().with_timeout(Duration::from_secs(1));
        let pool = FetchPool::with_config(fetcher, config);

        let results = pool.run(tasks_for(&["https://slow.com"])).await.unwrap();
        assert!(matches!(results[0].error, Some(FetchError::Timeout { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparsable_urls_share_fallback_domain() {
        let pool = echo_pool(FetchConfig::default());
        let results = pool
            .run(tasks_for(&["not a url", "also not a url"]))
            .await
            .unwrap();

        assert!(results.iter().all(|r| r.domain.is_unknown()));
        let gap = results[1].dispatched_at.max(results[0].dispatched_at)
            - results[1].dispatched_at.min(results[0].dispatched_at);
        assert!(gap >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatches_per_domain_are_spaced() {
        let pool = echo_pool(FetchConfig::default());
        let urls = [
            "https://a.com/1",
            "https://b.com/1",
            "https://a.com/2",
            "https://b.com/2",
            "https://a.com/3",
            "https://c.com/1",
        ];
        let results = pool.run(tasks_for(&urls)).await.unwrap();

        let mut by_domain: HashMap<String, Vec<Instant>> = HashMap::new();
        for r in &results {
            by_domain
                .entry(r.domain.to_string())
                .or_default()
                .push(r.dispatched_at);
        }
        for stamps in by_domain.values_mut() {
            stamps.sort();
            for pair in stamps.windows(2) {
                assert!(pair[1] - pair[0] >= Duration::from_millis(500));
            }
        }
        assert_eq!(by_domain.len(), 3);
    }
}
