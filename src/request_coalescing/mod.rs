// Request Coalescing Module
//
// Deduplicates concurrent work for the same cache key.
// When multiple clients request the same variant simultaneously:
// - First request (leader): does the work, then publishes the result
// - Subsequent requests (followers): wait for the leader and receive the same result
// - If the leader goes away without publishing, waiting followers retry and
//   one of them becomes the new leader
//
// Results are handed to followers directly rather than re-read from the cache,
// so coalescing also works with the no-op cache and when the cache write fails.

use crate::cache::CacheKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

struct InFlight<T> {
    generation: u64,
    sender: watch::Sender<Option<T>>,
}

/// Request coalescing manager.
///
/// The map lock is only held for check-and-insert and removal, never across
/// an await, so the work itself runs with no lock held.
pub struct RequestCoalescer<T> {
    in_flight: Arc<Mutex<HashMap<String, InFlight<T>>>>,
    next_generation: Arc<AtomicU64>,
}

impl<T: Clone + Send + Sync> RequestCoalescer<T> {
    /// Create a new request coalescer
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Acquire a coalescing slot for a request
    ///
    /// Returns `CoalescingSlot::Leader` if no request for the key is in flight.
    /// The leader does the work and hands the result to `LeaderGuard::complete`.
    ///
    /// Returns `CoalescingSlot::Follower` with the leader's result otherwise.
    pub async fn acquire(&self, key: &CacheKey) -> CoalescingSlot<T> {
        loop {
            let mut receiver = {
                let mut in_flight = self.in_flight.lock();
                match in_flight.get(key.as_str()) {
                    Some(entry) => entry.sender.subscribe(),
                    None => {
                        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                        let (sender, _rx) = watch::channel(None);
                        in_flight.insert(
                            key.as_str().to_string(),
                            InFlight {
                                generation,
                                sender: sender.clone(),
                            },
                        );
                        return CoalescingSlot::Leader(LeaderGuard {
                            key: key.as_str().to_string(),
                            generation,
                            coalescer: self.clone(),
                            sender,
                        });
                    }
                }
            };

            // Err means the leader was dropped without publishing
            if let Ok(value) = receiver.wait_for(|value| value.is_some()).await {
                if let Some(result) = value.clone() {
                    return CoalescingSlot::Follower(result);
                }
            }
            tracing::debug!(key = %key, "Coalesced leader abandoned, retrying");
        }
    }

    /// Get current number of in-flight requests
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Remove a key from the in-flight map if it still belongs to `generation`
    fn remove_in_flight(&self, key: &str, generation: u64) {
        let mut in_flight = self.in_flight.lock();
        if in_flight
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
        {
            in_flight.remove(key);
        }
    }
}

impl<T> Clone for RequestCoalescer<T> {
    fn clone(&self) -> Self {
        Self {
            in_flight: Arc::clone(&self.in_flight),
            next_generation: Arc::clone(&self.next_generation),
        }
    }
}

impl<T: Clone + Send + Sync> Default for RequestCoalescer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for RequestCoalescer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}

/// Result of acquiring a coalescing slot
pub enum CoalescingSlot<T: Clone + Send + Sync> {
    /// No request was in flight: do the work, then call `complete`.
    /// Dropping the guard without completing lets a follower take over.
    Leader(LeaderGuard<T>),

    /// Another request for the same key finished; this is its result.
    Follower(T),
}

impl<T: Clone + Send + Sync> CoalescingSlot<T> {
    /// Check if this is the leader
    pub fn is_leader(&self) -> bool {
        matches!(self, CoalescingSlot::Leader(_))
    }

    /// Check if this is a follower
    pub fn is_follower(&self) -> bool {
        matches!(self, CoalescingSlot::Follower(_))
    }
}

/// Guard held by the leader request.
/// When dropped, the key is released from the in-flight map.
pub struct LeaderGuard<T: Clone + Send + Sync> {
    key: String,
    generation: u64,
    coalescer: RequestCoalescer<T>,
    sender: watch::Sender<Option<T>>,
}

impl<T: Clone + Send + Sync> LeaderGuard<T> {
    /// Publish the result to every waiting follower and release the key
    pub fn complete(self, result: T) {
        self.sender.send_replace(Some(result));
        // Drop releases the key
    }
}

impl<T: Clone + Send + Sync> Drop for LeaderGuard<T> {
    fn drop(&mut self) {
        self.coalescer.remove_in_flight(&self.key, self.generation);
    }
}
