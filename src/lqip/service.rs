//! LQIP service: memoized, single-flight reductions.
//!
//! The service is the entry point for every reduction. It:
//! - Checks the memo cache
//! - Coalesces concurrent requests for the same uncached key so that only one
//!   reduction runs (singleflight)
//! - Runs the CPU-bound reduction on Tokio's blocking pool
//! - Stores successful results; failures are not cached
//!
//! # Example
//!
//! ```ignore
//! use lqip_server::lqip::LqipService;
//!
//! let service = LqipService::new();
//! let data_uri = service.lqip_modern("hero.jpg", bytes).await?;
//! ```

use std::collections::HashMap;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::sync::Notify;
use tracing::debug;

use crate::error::LqipError;

use super::cache::LqipCache;
use super::options::{LqipOptions, OutputFormat};
use super::reducer::{compute_lqip_image, LqipImage};

type SharedResult = Result<Arc<LqipImage>, LqipError>;

// =============================================================================
// Reduction Response
// =============================================================================

/// Result of [`LqipService::reduce`].
#[derive(Debug, Clone)]
pub struct Reduction {
    /// The reduced image
    pub image: Arc<LqipImage>,

    /// Whether this call was served without running a reduction of its own
    /// (memo cache hit, or joined another caller's in-flight reduction)
    pub cache_hit: bool,
}

// =============================================================================
// In-flight State
// =============================================================================

/// State for an in-flight reduction.
struct InFlightState {
    /// Notification for waiters
    notify: Notify,
    /// Result of the reduction (set when complete)
    result: Mutex<Option<SharedResult>>,
    /// Set once the leader is gone, with or without a result
    closed: AtomicBool,
}

impl InFlightState {
    fn new() -> Self {
        Self {
            notify: Notify::new(),
            result: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn result(&self) -> Option<SharedResult> {
        lock(&self.result).clone()
    }

    fn set_result(&self, result: SharedResult) {
        *lock(&self.result) = Some(result);
    }
}

/// Removes the in-flight entry and wakes waiters when the leader finishes,
/// including when the leader's future is dropped mid-reduction.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashMap<String, Arc<InFlightState>>>,
    key: &'a str,
    state: Arc<InFlightState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = lock(self.in_flight);
        if in_flight
            .get(self.key)
            .is_some_and(|s| Arc::ptr_eq(s, &self.state))
        {
            in_flight.remove(self.key);
        }
        drop(in_flight);
        self.state.closed.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }
}

/// Critical sections never panic while holding the lock, so a poisoned
/// mutex still holds consistent data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// LQIP Service
// =============================================================================

/// Memoizing front for [`compute_lqip_image`].
pub struct LqipService {
    /// Completed reductions
    cache: LqipCache,

    /// In-flight reductions for singleflight
    in_flight: Mutex<HashMap<String, Arc<InFlightState>>>,

    /// Number of reductions actually executed
    computations: AtomicU64,
}

impl LqipService {
    /// Create a service with the default cache size.
    pub fn new() -> Self {
        Self::with_cache(LqipCache::new())
    }

    /// Create a service holding at most `max_entries` memoized results.
    pub fn with_cache_capacity(max_entries: usize) -> Self {
        Self::with_cache(LqipCache::with_capacity(max_entries))
    }

    pub fn with_cache(cache: LqipCache) -> Self {
        Self {
            cache,
            in_flight: Mutex::new(HashMap::new()),
            computations: AtomicU64::new(0),
        }
    }

    /// Get the placeholder for `key`, reducing `input` if it is not cached.
    ///
    /// Concurrent calls with the same uncached key share one reduction. The
    /// key must identify both the input and the options; the service does
    /// not check that a cached entry was built from the same bytes.
    pub async fn reduce(
        &self,
        key: &str,
        input: Bytes,
        options: LqipOptions,
    ) -> Result<Reduction, LqipError> {
        // Fast path: check cache
        if let Some(image) = self.cache.get(key).await {
            debug!(key, "LQIP cache hit");
            return Ok(Reduction {
                image,
                cache_hit: true,
            });
        }

        // Slow path: join an in-flight reduction or become the leader
        loop {
            let (state, leader) = {
                let mut in_flight = lock(&self.in_flight);
                match in_flight.get(key) {
                    Some(state) => (state.clone(), false),
                    None => {
                        let state = Arc::new(InFlightState::new());
                        in_flight.insert(key.to_string(), state.clone());
                        (state, true)
                    }
                }
            };

            if leader {
                let _guard = InFlightGuard {
                    in_flight: &self.in_flight,
                    key,
                    state: state.clone(),
                };

                // A previous leader may have finished between our cache check
                // and taking the lead
                if let Some(image) = self.cache.get(key).await {
                    state.set_result(Ok(image.clone()));
                    return Ok(Reduction {
                        image,
                        cache_hit: true,
                    });
                }

                let result = self.compute(input.clone(), options).await;
                if let Ok(ref image) = result {
                    self.cache.put(key, image.clone()).await;
                }
                state.set_result(result.clone());

                return result.map(|image| Reduction {
                    image,
                    cache_hit: false,
                });
            }

            // Register for the wakeup before checking the result so a
            // completion in between is not missed
            let mut notified = pin!(state.notify.notified());
            notified.as_mut().enable();

            if state.result().is_none() && !state.is_closed() {
                notified.await;
            }

            if let Some(result) = state.result() {
                debug!(key, "Joined in-flight LQIP reduction");
                return result.map(|image| Reduction {
                    image,
                    cache_hit: true,
                });
            }

            // The leader was cancelled before finishing; try again
        }
    }

    /// Get the data URI for `key`, reducing `input` with default options on
    /// a cache miss.
    pub async fn lqip_modern(&self, key: &str, input: Bytes) -> Result<String, LqipError> {
        let reduction = self.reduce(key, input, LqipOptions::default()).await?;
        Ok(reduction.image.metadata.data_uri_base64.clone())
    }

    /// Run one reduction on the blocking pool.
    async fn compute(&self, input: Bytes, options: LqipOptions) -> SharedResult {
        self.computations.fetch_add(1, Ordering::Relaxed);

        let image = tokio::task::spawn_blocking(move || compute_lqip_image(&input, &options))
            .await
            .map_err(|e| LqipError::Task(e.to_string()))??;

        Ok(Arc::new(image))
    }

    /// The memo cache.
    pub fn cache(&self) -> &LqipCache {
        &self.cache
    }

    /// Number of reductions executed since the service was created.
    pub fn computations(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }
}

impl Default for LqipService {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache key for an uploaded body: `hex(sha256(bytes)):<format>`.
pub fn content_key(input: &[u8], format: OutputFormat) -> String {
    let digest = Sha256::digest(input);
    format!("{}:{}", hex::encode(digest), format.as_str())
}

// =============================================================================
// Tests
// =============================================================================
