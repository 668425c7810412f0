//! Per-key single-flight execution
//!
//! At most one generation runs per key. Callers arriving while it is in
//! flight join it and receive a clone of the same outcome, success or
//! failure. The pending record is removed before the outcome is released,
//! so the next caller after completion always starts a fresh attempt.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::DomainError;
use crate::infrastructure::observability::{
    record_coalesced_wait, record_generation, FlightSource, GenerationOutcome,
};

type Outcome<V> = Option<Result<V, DomainError>>;

/// A generation in progress; waiters subscribe to `rx`
struct Flight<V> {
    id: u64,
    rx: watch::Receiver<Outcome<V>>,
}

type FlightTable<K, V> = Arc<Mutex<HashMap<K, Flight<V>>>>;

/// Coalesces concurrent work for the same key into a single execution
///
/// The generator runs on its own task. A caller that stops waiting does not
/// cancel it, and the optional timeout is enforced inside that task so it
/// fails every waiter at once.
pub struct SingleFlight<K, V> {
    flights: FlightTable<K, V>,
    next_id: AtomicU64,
    timeout: Option<Duration>,
    source: FlightSource,
}

impl<K, V> fmt::Debug for SingleFlight<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let in_flight = self
            .flights
            .lock()
            .map(|flights| flights.len())
            .unwrap_or_default();

        f.debug_struct("SingleFlight")
            .field("in_flight", &in_flight)
            .field("timeout", &self.timeout)
            .field("source", &self.source)
            .finish()
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a coalescer with no generation timeout
    pub fn new() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            timeout: None,
            source: FlightSource::Generation,
        }
    }

    /// Creates a coalescer whose generations fail with `Timeout` after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::new()
        }
    }

    /// Records this coalescer's runs under `source` instead of `Generation`
    pub fn with_source(mut self, source: FlightSource) -> Self {
        self.source = source;
        self
    }

    /// Returns the outcome of the generation for `key`, starting one if none
    /// is in flight
    ///
    /// `generate` is only invoked when this caller becomes the leader.
    pub async fn resolve<F, Fut>(&self, key: K, generate: F) -> Result<V, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, DomainError>> + Send + 'static,
    {
        let rx = self.join_or_start(key, generate)?;
        Self::wait(rx).await
    }

    /// Whether a generation for `key` is currently pending
    pub fn in_flight(&self, key: &K) -> bool {
        self.flights
            .lock()
            .map(|flights| flights.contains_key(key))
            .unwrap_or(false)
    }

    /// Number of pending generations
    pub fn len(&self) -> usize {
        self.flights
            .lock()
            .map(|flights| flights.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Joins the pending generation for `key` or installs a new one
    ///
    /// Lookup and insert happen under one lock acquisition, and nothing
    /// awaits while it is held.
    fn join_or_start<F, Fut>(
        &self,
        key: K,
        generate: F,
    ) -> Result<watch::Receiver<Outcome<V>>, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, DomainError>> + Send + 'static,
    {
        let (tx, rx, guard) = {
            let mut flights = self
                .flights
                .lock()
                .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

            if let Some(flight) = flights.get(&key) {
                debug!(key = %key, "Joining in-flight generation");
                record_coalesced_wait();
                return Ok(flight.rx.clone());
            }

            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let (tx, rx) = watch::channel(None);
            flights.insert(
                key.clone(),
                Flight {
                    id,
                    rx: rx.clone(),
                },
            );

            let guard = FlightGuard {
                flights: Arc::clone(&self.flights),
                key,
                id,
            };

            (tx, rx, guard)
        };

        let generation = generate();
        let timeout = self.timeout;
        let source = self.source;

        tokio::spawn(async move {
            let started = Instant::now();

            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, generation).await {
                    Ok(result) => result,
                    Err(_) => Err(DomainError::timeout(
                        format!("generation of '{}'", guard.key),
                        limit,
                    )),
                },
                None => generation.await,
            };

            let elapsed = started.elapsed();
            let label = source.label();
            match &outcome {
                Ok(_) => {
                    info!(key = %guard.key, elapsed_ms = elapsed.as_millis() as u64, "{} completed", label);
                    record_generation(source, GenerationOutcome::Success, elapsed);
                }
                Err(e) if e.is_timeout() => {
                    warn!(key = %guard.key, error = %e, "{} timed out", label);
                    record_generation(source, GenerationOutcome::Timeout, elapsed);
                }
                Err(e) => {
                    warn!(key = %guard.key, error = %e, "{} failed", label);
                    record_generation(source, GenerationOutcome::Failure, elapsed);
                }
            }

            // Clear the pending record first so no caller can join a finished flight
            drop(guard);
            tx.send_replace(Some(outcome));
        });

        Ok(rx)
    }

    async fn wait(mut rx: watch::Receiver<Outcome<V>>) -> Result<V, DomainError> {
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };

        // The sender only goes away without a value if the generation panicked
        outcome.unwrap_or_else(|| {
            Err(DomainError::internal(
                "Generation ended without producing a result",
            ))
        })
    }
}

/// Removes a flight's pending record when its generation task ends, even by panic
struct FlightGuard<K, V>
where
    K: Eq + Hash,
{
    flights: FlightTable<K, V>,
    key: K,
    id: u64,
}

impl<K, V> Drop for FlightGuard<K, V>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);

        if flights.get(&self.key).is_some_and(|flight| flight.id == self.id) {
            flights.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    use futures::future::join_all;
    use tokio::sync::Barrier;

    fn counting_generator(
        calls: Arc<AtomicUsize>,
        delay: Duration,
        result: Result<String, DomainError>,
    ) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = Result<String, DomainError>> + Send>>
    {
        move || {
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                result
            })
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_generation() {
        let flight: SingleFlight<String, String> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let callers = (0..50).map(|_| {
            flight.resolve(
                "productlist".to_string(),
                counting_generator(
                    calls.clone(),
                    Duration::from_millis(20),
                    Ok("payload".to_string()),
                ),
            )
        });

        let results = join_all(callers).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(results.len(), 50);
        assert!(results.iter().all(|r| r.as_deref() == Ok("payload")));
        assert!(flight.is_empty());
    }

    #[tokio::test]
    async fn test_sequential_calls_generate_again() {
        let flight: SingleFlight<String, String> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let result = flight
                .resolve(
                    "productlist".to_string(),
                    counting_generator(calls.clone(), Duration::ZERO, Ok("v".to_string())),
                )
                .await;
            assert_eq!(result.unwrap(), "v");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter_and_allows_retry() {
        let flight: SingleFlight<String, String> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let failure = DomainError::upstream("catalog unavailable");

        let callers = (0..10).map(|_| {
            flight.resolve(
                "productlist".to_string(),
                counting_generator(calls.clone(), Duration::from_millis(10), Err(failure.clone())),
            )
        });

        let results = join_all(callers).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.as_ref() == Err(&failure)));
        assert!(!flight.in_flight(&"productlist".to_string()));

        let retry = flight
            .resolve(
                "productlist".to_string(),
                counting_generator(calls.clone(), Duration::ZERO, Ok("recovered".to_string())),
            )
            .await;

        assert_eq!(retry.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_all_waiters_and_clears_pending() {
        let flight: SingleFlight<String, String> =
            SingleFlight::with_timeout(Duration::from_millis(100));
        let calls = Arc::new(AtomicUsize::new(0));

        let callers = (0..5).map(|_| {
            flight.resolve(
                "productlist".to_string(),
                counting_generator(calls.clone(), Duration::from_secs(60), Ok("late".to_string())),
            )
        });

        let results = join_all(callers).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| matches!(r, Err(e) if e.is_timeout())));
        assert!(flight.is_empty());

        let retry = flight
            .resolve(
                "productlist".to_string(),
                counting_generator(calls.clone(), Duration::from_millis(10), Ok("fresh".to_string())),
            )
            .await;

        assert_eq!(retry.unwrap(), "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_abandoned_caller_does_not_cancel_generation() {
        let flight: Arc<SingleFlight<String, String>> = Arc::new(SingleFlight::new());
        let finished = Arc::new(AtomicBool::new(false));

        let done = finished.clone();
        let waiting = tokio::time::timeout(
            Duration::from_millis(10),
            flight.resolve("productlist".to_string(), move || async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                done.store(true, Ordering::SeqCst);
                Ok("payload".to_string())
            }),
        )
        .await;

        assert!(waiting.is_err());
        assert!(flight.in_flight(&"productlist".to_string()));

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(finished.load(Ordering::SeqCst));
        assert!(!flight.in_flight(&"productlist".to_string()));
    }

    #[tokio::test]
    async fn test_late_joiner_gets_leader_result() {
        let flight: Arc<SingleFlight<String, String>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let leader = {
            let flight = flight.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                flight
                    .resolve(
                        "productlist".to_string(),
                        counting_generator(calls, Duration::from_millis(50), Ok("first".to_string())),
                    )
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(flight.in_flight(&"productlist".to_string()));

        let joiner = flight
            .resolve(
                "productlist".to_string(),
                counting_generator(calls.clone(), Duration::ZERO, Ok("second".to_string())),
            )
            .await;

        assert_eq!(joiner.unwrap(), "first");
        assert_eq!(leader.await.unwrap().unwrap(), "first");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_keys_run_in_parallel() {
        let flight: SingleFlight<String, String> = SingleFlight::new();
        let barrier = Arc::new(Barrier::new(2));

        let flight = &flight;
        let resolve = move |key: &'static str| {
            let barrier = barrier.clone();
            flight.resolve(key.to_string(), move || async move {
                // Both generations must be running at once to pass the barrier
                barrier.wait().await;
                Ok(key.to_string())
            })
        };

        let (a, b) = tokio::time::timeout(
            Duration::from_secs(5),
            futures::future::join(resolve("products"), resolve("categories")),
        )
        .await
        .expect("generations for different keys were serialized");

        assert_eq!(a.unwrap(), "products");
        assert_eq!(b.unwrap(), "categories");
    }

    #[test]
    fn test_source_defaults_to_generation() {
        let server: SingleFlight<String, String> = SingleFlight::new();
        let client: SingleFlight<String, String> =
            SingleFlight::with_timeout(Duration::from_secs(1)).with_source(FlightSource::ClientLoad);

        assert!(format!("{:?}", server).contains("source: Generation"));
        let client = format!("{:?}", client);
        assert!(client.contains("source: ClientLoad"));
        assert!(client.contains("timeout: Some(1s)"));
    }

    #[tokio::test]
    async fn test_panicking_generation_is_cleared() {
        let flight: SingleFlight<String, String> = SingleFlight::new();

        let result = flight
            .resolve("productlist".to_string(), || async {
                if true {
                    panic!("generator blew up");
                }
                Ok("unreachable".to_string())
            })
            .await;

        assert!(matches!(result, Err(DomainError::Internal { .. })));
        assert!(flight.is_empty());

        let retry = flight
            .resolve("productlist".to_string(), || async { Ok("ok".to_string()) })
            .await;
        assert_eq!(retry.unwrap(), "ok");
    }
}
