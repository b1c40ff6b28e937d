//! Fetches rate tables and turns each attempt into a state [`Event`].

use crate::core::{Event, RateProvider};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error};

/// Upper bound on a single fetch, so a stuck connection cannot hold the
/// in-flight flag forever.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct RateStore {
    provider: Arc<dyn RateProvider>,
    base_currency: String,
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
}

/// Exclusive right to run one refresh. Dropping it, including when the
/// refresh is cancelled, lets the next refresh start.
pub struct RefreshPermit {
    in_flight: Arc<AtomicBool>,
}

impl Drop for RefreshPermit {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

impl RateStore {
    pub fn new(provider: Arc<dyn RateProvider>, base_currency: &str) -> Self {
        Self {
            provider,
            base_currency: base_currency.to_uppercase(),
            timeout: DEFAULT_REFRESH_TIMEOUT,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claims the in-flight flag, or returns `None` while another refresh is
    /// still outstanding.
    pub fn try_acquire(&self) -> Option<RefreshPermit> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshPermit {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    /// Fetches the latest table for the base currency.
    ///
    /// Returns `None` without contacting the provider when another refresh is
    /// still outstanding.
    pub async fn refresh(&self) -> Option<Event> {
        let Some(permit) = self.try_acquire() else {
            debug!("Refresh already in flight, skipping");
            return None;
        };
        Some(self.refresh_with(permit).await)
    }

    /// Runs a refresh under an already acquired permit. Failures and fetches
    /// that exceed the timeout are logged and reported as
    /// [`Event::RatesFailed`]; they never propagate further.
    pub async fn refresh_with(&self, _permit: RefreshPermit) -> Event {
        let fetch = self.provider.fetch_rates(&self.base_currency);
        match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(snapshot)) => {
                debug!(
                    base = %self.base_currency,
                    currencies = snapshot.table.len(),
                    "Exchange rates refreshed"
                );
                Event::RatesLoaded(snapshot)
            }
            Ok(Err(e)) => {
                error!(error = ?e, base = %self.base_currency, "Failed to fetch exchange rates");
                Event::RatesFailed
            }
            Err(_) => {
                error!(
                    base = %self.base_currency,
                    timeout = ?self.timeout,
                    "Timed out fetching exchange rates"
                );
                Event::RatesFailed
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::{RateSnapshot, RateTable};
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    pub(crate) fn sample_snapshot() -> RateSnapshot {
        let rates: BTreeMap<String, f64> = [("USD", 1.0), ("EUR", 0.9), ("JPY", 150.0)]
            .iter()
            .map(|(c, r)| (c.to_string(), *r))
            .collect();
        RateSnapshot {
            table: RateTable::new("USD", rates).unwrap(),
            last_updated: None,
        }
    }

    /// Provider returning a fixed snapshot, or failing when `fail` is set.
    pub(crate) struct MockRateProvider {
        pub(crate) call_count: AtomicUsize,
        pub(crate) fail: AtomicBool,
        pub(crate) gate: Option<Arc<Notify>>,
    }

    impl MockRateProvider {
        pub(crate) fn new() -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                gate: None,
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateProvider for MockRateProvider {
        async fn fetch_rates(&self, base: &str) -> Result<RateSnapshot> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(anyhow!("Provider unavailable for {}", base));
            }
            Ok(sample_snapshot())
        }
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let provider = Arc::new(MockRateProvider::new());
        let store = RateStore::new(provider.clone(), "usd");
        assert_eq!(store.base_currency, "USD");

        let event = store.refresh().await;
        assert_eq!(event, Some(Event::RatesLoaded(sample_snapshot())));
        assert_eq!(provider.calls(), 1);
        assert!(!store.is_refreshing());
    }

    #[tokio::test]
    async fn test_refresh_failure() {
        let provider = Arc::new(MockRateProvider::new());
        provider.fail.store(true, Ordering::SeqCst);
        let store = RateStore::new(provider.clone(), "USD");

        assert_eq!(store.refresh().await, Some(Event::RatesFailed));
        assert!(!store.is_refreshing());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_skipped() {
        let gate = Arc::new(Notify::new());
        let provider = Arc::new(MockRateProvider {
            gate: Some(gate.clone()),
            ..MockRateProvider::new()
        });
        let store = Arc::new(RateStore::new(provider.clone(), "USD"));

        let first = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.refresh().await }
        });
        while !store.is_refreshing() {
            tokio::task::yield_now().await;
        }

        assert_eq!(store.refresh().await, None);
        assert_eq!(provider.calls(), 1);

        gate.notify_one();
        let event = first.await.unwrap();
        assert!(matches!(event, Some(Event::RatesLoaded(_))));
        assert!(!store.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_fetch_times_out() {
        let provider = Arc::new(MockRateProvider {
            gate: Some(Arc::new(Notify::new())),
            ..MockRateProvider::new()
        });
        let store = RateStore::new(provider.clone(), "USD").with_timeout(Duration::from_secs(30));

        let start = tokio::time::Instant::now();
        assert_eq!(store.refresh().await, Some(Event::RatesFailed));
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert!(!store.is_refreshing());

        assert_eq!(store.refresh().await, Some(Event::RatesFailed));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_permit_blocks_refresh_until_dropped() {
        let provider = Arc::new(MockRateProvider::new());
        let store = RateStore::new(provider.clone(), "USD");

        let permit = store.try_acquire().unwrap();
        assert!(store.is_refreshing());
        assert!(store.try_acquire().is_none());
        assert_eq!(store.refresh().await, None);

        drop(permit);
        assert!(!store.is_refreshing());
        assert!(matches!(store.refresh().await, Some(Event::RatesLoaded(_))));
        assert_eq!(provider.calls(), 1);
    }
}
