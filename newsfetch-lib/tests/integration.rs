// newsfetch-lib/tests/integration.rs

//! Integration tests for newsfetch-lib exports and batch behavior

use async_trait::async_trait;
use newsfetch_lib::{
    fetch_fn, run_batch, DomainKey, FetchConfig, FetchError, FetchPool, FetchTask, PageFetcher,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

const INTERVAL: Duration = Duration::from_millis(500);

/// Fetcher that records concurrency and fails any URL containing "fail".
#[derive(Default)]
struct RecordingFetcher {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<String>>,
    latency: Duration,
}

impl RecordingFetcher {
    fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }
}

#[async_trait]
impl PageFetcher for RecordingFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(url.to_string());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if url.contains("fail") {
            Err(FetchError::network(url, "connection refused"))
        } else {
            Ok(format!("article body of {}", url))
        }
    }
}

fn tasks(urls: &[String]) -> Vec<FetchTask> {
    urls.iter().map(FetchTask::new).collect()
}

#[tokio::test(start_paused = true)]
async fn test_single_domain_batch_is_spaced() {
    let urls: Vec<String> = (0..12).map(|i| format!("https://news.example.com/{}", i)).collect();
    let pool = FetchPool::new(RecordingFetcher::default());

    let start = Instant::now();
    let results = assert_ok!(pool.run(tasks(&urls)).await);

    assert_eq!(results.len(), 12);
    assert!(start.elapsed() >= INTERVAL * 11);

    let mut stamps: Vec<Instant> = results.iter().map(|r| r.dispatched_at).collect();
    stamps.sort();
    for pair in stamps.windows(2) {
        assert!(pair[1] - pair[0] >= INTERVAL);
    }
}

#[tokio::test(start_paused = true)]
async fn test_distinct_domains_do_not_wait() {
    let urls: Vec<String> = ["a", "b", "c"]
        .iter()
        .map(|host| format!("https://{}.example/story", host))
        .collect();
    let pool = FetchPool::new(RecordingFetcher::default());

    let start = Instant::now();
    let results = assert_ok!(pool.run(tasks(&urls)).await);

    assert_eq!(results.len(), 3);
    assert!(start.elapsed() < INTERVAL);
    assert!(results.iter().all(|r| r.is_success()));
}

#[tokio::test(start_paused = true)]
async fn test_one_transport_failure_among_many() {
    let urls: Vec<String> = vec![
        "https://a.example/1".into(),
        "https://fail.example/2".into(),
        "https://b.example/3".into(),
        "https://a.example/4".into(),
    ];
    let pool = FetchPool::new(RecordingFetcher::default());
    let results = assert_ok!(pool.run(tasks(&urls)).await);

    assert_eq!(results.len(), urls.len());
    let failures: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].task.url, "https://fail.example/2");
    assert!(failures[0].content.is_empty());
    assert!(results
        .iter()
        .filter(|r| r.is_success())
        .all(|r| r.content.starts_with("article body")));
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_never_exceeds_worker_count() {
    let urls: Vec<String> = (0..20).map(|i| format!("https://host{}.example/", i)).collect();
    let fetcher = Arc::new(RecordingFetcher::with_latency(Duration::from_millis(100)));

    let shared = fetcher.clone();
    let pool = FetchPool::new(fetch_fn(move |url: String, timeout| {
        let inner = shared.clone();
        async move { inner.fetch(&url, timeout).await }
    }));

    let results = assert_ok!(pool.run_with_workers(tasks(&urls), 4).await);

    assert_eq!(results.len(), 20);
    assert!(fetcher.peak.load(Ordering::SeqCst) <= 4);
    assert!(fetcher.peak.load(Ordering::SeqCst) >= 2);
    assert_eq!(fetcher.calls.lock().unwrap().len(), 20);
}

#[tokio::test(start_paused = true)]
async fn test_worker_cap_is_clamped_to_ten() {
    let urls: Vec<String> = (0..30).map(|i| format!("https://h{}.example/", i)).collect();
    let fetcher = Arc::new(RecordingFetcher::with_latency(Duration::from_millis(50)));

    let shared = fetcher.clone();
    let pool = FetchPool::new(fetch_fn(move |url: String, timeout| {
        let inner = shared.clone();
        async move { inner.fetch(&url, timeout).await }
    }));

    assert_ok!(pool.run_with_workers(tasks(&urls), 50).await);
    assert!(fetcher.peak.load(Ordering::SeqCst) <= 10);
}

#[tokio::test(start_paused = true)]
async fn test_repeat_runs_are_idempotent() {
    let urls: Vec<String> = vec![
        "https://a.example/1".into(),
        "https://fail.example/x".into(),
        "https://a.example/2".into(),
        "not even a url".into(),
    ];

    let summarize = |results: Vec<newsfetch_lib::FetchResult>| -> Vec<(String, String, bool)> {
        results
            .into_iter()
            .map(|r| (r.task.url.clone(), r.content.clone(), r.is_success()))
            .collect()
    };

    let first = summarize(assert_ok!(run_batch(tasks(&urls), 3, RecordingFetcher::default()).await));
    let second = summarize(assert_ok!(run_batch(tasks(&urls), 3, RecordingFetcher::default()).await));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_zero_workers_is_a_config_error() {
    let urls: Vec<String> = vec!["https://a.example/".into()];
    let fetcher = RecordingFetcher::default();
    let err = assert_err!(run_batch(tasks(&urls), 0, fetcher).await);
    assert!(matches!(err, FetchError::ConfigError { .. }));
}

#[tokio::test]
async fn test_empty_batch_makes_no_calls() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let shared = fetcher.clone();
    let pool = FetchPool::new(fetch_fn(move |url: String, timeout| {
        let inner = shared.clone();
        async move { inner.fetch(&url, timeout).await }
    }));

    let results = assert_ok!(pool.run(Vec::new()).await);
    assert!(results.is_empty());
    assert!(fetcher.calls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_custom_interval_and_domain_keys() {
    let config = FetchConfig::default()
        .with_min_interval(Duration::from_secs(2))
        .with_max_workers(5);
    let pool = FetchPool::with_config(RecordingFetcher::default(), config);

    let urls: Vec<String> = vec![
        "https://Example.COM/a".into(),
        "https://example.com/b".into(),
        "mailto:someone@example.com".into(),
    ];
    let results = assert_ok!(pool.run(tasks(&urls)).await);

    let mut by_domain: HashMap<DomainKey, Vec<Instant>> = HashMap::new();
    for r in &results {
        by_domain.entry(r.domain.clone()).or_default().push(r.dispatched_at);
    }

    let example = &by_domain[&DomainKey::new("example.com")];
    assert_eq!(example.len(), 2);
    let gap = example.iter().max().unwrap().duration_since(*example.iter().min().unwrap());
    assert!(gap >= Duration::from_secs(2));
    assert!(by_domain.contains_key(&DomainKey::unknown()));
}
