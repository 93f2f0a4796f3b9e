//! Per-domain request spacing.
//!
//! The throttle keeps one [`DomainState`] per host. Looking up a state only
//! takes the map shard lock for the duration of the lookup; the wait itself
//! happens under the per-domain lock, so workers on other hosts never queue
//! behind it.

use crate::domain::DomainKey;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Dispatch bookkeeping for a single domain.
#[derive(Debug, Default)]
struct DomainState {
    /// `None` until the first request to this domain is released
    last_dispatch: Option<Instant>,
}

/// Enforces a minimum interval between dispatches to the same domain.
///
/// One throttle belongs to one batch run; its map is dropped with it.
#[derive(Debug)]
pub struct DomainThrottle {
    states: DashMap<DomainKey, Arc<Mutex<DomainState>>>,
    min_interval: Duration,
}

impl DomainThrottle {
    /// Create a throttle with the given per-domain spacing.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            states: DashMap::new(),
            min_interval,
        }
    }

    /// Wait until `domain` may be hit again, then stamp and return the dispatch time.
    ///
    /// The returned instant is taken after any wait, so consecutive stamps for a
    /// domain are always at least `min_interval` apart.
    pub async fn acquire(&self, domain: &DomainKey) -> Instant {
        // The shard guard must be gone before we await on the domain lock.
        let state = self
            .states
            .entry(domain.clone())
            .or_insert_with(|| Arc::new(Mutex::new(DomainState::default())))
            .clone();

        let mut state = state.lock().await;

        if let Some(last) = state.last_dispatch {
            let elapsed = Instant::now().saturating_duration_since(last);
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!(domain = %domain, wait_ms = wait.as_millis() as u64, "throttling");
                tokio::time::sleep(wait).await;
            }
        }

        let now = Instant::now();
        state.last_dispatch = Some(now);
        now
    }

    /// Configured spacing between requests to one domain.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Number of domains seen so far.
    pub fn tracked_domains(&self) -> usize {
        self.states.len()
    }

    /// Last dispatch time for `domain`, if it has been dispatched and is not
    /// currently locked by a worker.
    pub fn last_dispatch(&self, domain: &DomainKey) -> Option<Instant> {
        let state = self.states.get(domain)?.clone();
        let guard = state.try_lock().ok()?;
        guard.last_dispatch
    }
}
