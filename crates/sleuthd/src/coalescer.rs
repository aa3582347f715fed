//! Query coalescer.
//!
//! Identical queries that arrive while one is already being computed wait for
//! that computation instead of starting their own. The first caller computes
//! and publishes the result (success or failure) on a watch channel; the slot
//! stays visible for a short grace period so near-simultaneous late arrivals
//! still see it, then it is removed.
//!
//! If the computing caller is dropped before publishing, its sender goes away
//! and every waiter receives `ComputeError::Abandoned`. The stale slot is
//! removed after the same grace period, or replaced earlier by the next caller
//! for that query.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::debug;

use crate::cache::query_hash;
use crate::config::CoalescerConfig;
use crate::error::ComputeError;

pub type SharedResult = Result<String, ComputeError>;

struct Slot {
    generation: u64,
    rx: watch::Receiver<Option<SharedResult>>,
}

impl Slot {
    /// Published, or still owned by a live computing caller
    fn is_live(&self) -> bool {
        self.rx.borrow().is_some() || self.rx.has_changed().is_ok()
    }
}

enum Role {
    Leader(watch::Sender<Option<SharedResult>>, u64),
    Waiter(watch::Receiver<Option<SharedResult>>),
}

/// Removes a slot `grace` after the computing caller finishes or is dropped,
/// unless a newer computation owns the key by then
struct CleanupGuard {
    pending: Arc<Mutex<HashMap<String, Slot>>>,
    key: String,
    generation: u64,
    grace: Duration,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let pending = Arc::clone(&self.pending);
        let key = std::mem::take(&mut self.key);
        let generation = self.generation;
        let grace = self.grace;
        handle.spawn(async move {
            tokio::time::sleep(grace).await;
            let mut pending = pending.lock().await;
            if pending.get(&key).is_some_and(|s| s.generation == generation) {
                pending.remove(&key);
                debug!(key = %key, "coalescer slot cleared");
            }
        });
    }
}

/// Deduplicates concurrent identical queries
pub struct QueryCoalescer {
    pending: Arc<Mutex<HashMap<String, Slot>>>,
    grace: Duration,
    next_generation: AtomicU64,
}

impl QueryCoalescer {
    pub fn new(grace: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            grace,
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CoalescerConfig) -> Self {
        Self::new(config.grace())
    }

    /// Run `compute` for `query` unless an identical query is already in
    /// flight, in which case wait for and return its result.
    pub async fn execute<F, Fut>(&self, query: &str, compute: F) -> SharedResult
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
    {
        let key = query_hash(query);

        let role = {
            let mut pending = self.pending.lock().await;
            match pending.get(&key) {
                Some(slot) if slot.is_live() => Role::Waiter(slot.rx.clone()),
                _ => {
                    let (tx, rx) = watch::channel(None);
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    pending.insert(key.clone(), Slot { generation, rx });
                    Role::Leader(tx, generation)
                }
            }
        };

        match role {
            Role::Waiter(rx) => {
                debug!(key = %key, "coalesced onto in-flight query");
                wait_for(rx, &key).await
            }
            Role::Leader(tx, generation) => {
                // runs on completion and when this future is dropped mid-compute
                let _cleanup = CleanupGuard {
                    pending: Arc::clone(&self.pending),
                    key,
                    generation,
                    grace: self.grace,
                };
                let result = compute(query.to_string()).await.map_err(ComputeError::from);
                tx.send_replace(Some(result.clone()));
                result
            }
        }
    }

    /// Queries still being computed
    pub async fn in_flight(&self) -> usize {
        let pending = self.pending.lock().await;
        pending
            .values()
            .filter(|s| s.rx.borrow().is_none() && s.rx.has_changed().is_ok())
            .count()
    }

    /// Slots held, including published results inside their grace period
    pub async fn slots(&self) -> usize {
        self.pending.lock().await.len()
    }
}

impl Default for QueryCoalescer {
    fn default() -> Self {
        Self::from_config(&CoalescerConfig::default())
    }
}

async fn wait_for(mut rx: watch::Receiver<Option<SharedResult>>, key: &str) -> SharedResult {
    loop {
        if let Some(result) = rx.borrow_and_update().clone() {
            return result;
        }
        if rx.changed().await.is_err() {
            // the sender may have published right before going away
            return rx
                .borrow()
                .clone()
                .unwrap_or_else(|| Err(ComputeError::Abandoned(key.to_string())));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_identical_queries_compute_once() {
        let coalescer = QueryCoalescer::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let make = |calls: Arc<AtomicUsize>| {
            move |q: String| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, anyhow::Error>(format!("result for {q}"))
            }
        };

        let (a, b) = tokio::join!(
            coalescer.execute("Why is my eventhub failing", make(calls.clone())),
            coalescer.execute("why is my eventhub failing ", make(calls.clone())),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), "result for Why is my eventhub failing");
        assert_eq!(b.unwrap(), "result for Why is my eventhub failing");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reaches_all_waiters() {
        let coalescer = QueryCoalescer::default();

        let (a, b) = tokio::join!(
            coalescer.execute("q", |_| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                anyhow::bail!("transport error")
            }),
            coalescer.execute("q", |_| async { Ok("never".to_string()) }),
        );

        for result in [a, b] {
            match result {
                Err(ComputeError::Failed(e)) => assert_eq!(e.to_string(), "transport error"),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_cleared_after_grace() {
        let coalescer = QueryCoalescer::new(Duration::from_millis(100));
        coalescer.execute("q", |_| async { Ok("r".to_string()) }).await.unwrap();
        assert_eq!(coalescer.slots().await, 1);
        assert_eq!(coalescer.in_flight().await, 0);

        // late arrival inside the grace period sees the published result
        let late = coalescer
            .execute("q", |_| async { Ok("recomputed".to_string()) })
            .await
            .unwrap();
        assert_eq!(late, "r");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(coalescer.slots().await, 0);

        let fresh = coalescer
            .execute("q", |_| async { Ok("recomputed".to_string()) })
            .await
            .unwrap();
        assert_eq!(fresh, "recomputed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_leader_releases_waiters() {
        let coalescer = Arc::new(QueryCoalescer::default());

        let leader = {
            let c = coalescer.clone();
            tokio::spawn(async move {
                c.execute("q", |_| std::future::pending::<anyhow::Result<String>>())
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(coalescer.in_flight().await, 1);

        let waiter = {
            let c = coalescer.clone();
            tokio::spawn(async move { c.execute("q", |_| async { Ok("x".to_string()) }).await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        leader.abort();
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(ComputeError::Abandoned(_))));

        // the stale slot is replaced by the next caller
        let next = coalescer.execute("q", |_| async { Ok("fresh".to_string()) }).await;
        assert_eq!(next.unwrap(), "fresh");
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_slot_is_cleared_after_grace() {
        let coalescer = Arc::new(QueryCoalescer::new(Duration::from_millis(100)));

        let leader = {
            let c = coalescer.clone();
            tokio::spawn(async move {
                c.execute("q", |_| std::future::pending::<anyhow::Result<String>>())
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;
        let waiter = {
            let c = coalescer.clone();
            tokio::spawn(async move { c.execute("q", |_| async { Ok("x".to_string()) }).await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        leader.abort();
        assert!(matches!(waiter.await.unwrap(), Err(ComputeError::Abandoned(_))));
        assert_eq!(coalescer.slots().await, 1);
        assert_eq!(coalescer.in_flight().await, 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(coalescer.slots().await, 0);
    }

    #[tokio::test]
    async fn test_different_queries_do_not_coalesce() {
        let coalescer = QueryCoalescer::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let c1 = calls.clone();
        let c2 = calls.clone();
        let (a, b) = tokio::join!(
            coalescer.execute("a", move |_| async move {
                c1.fetch_add(1, Ordering::SeqCst);
                Ok("A".to_string())
            }),
            coalescer.execute("b", move |_| async move {
                c2.fetch_add(1, Ordering::SeqCst);
                Ok("B".to_string())
            }),
        );
        assert_eq!((a.unwrap(), b.unwrap()), ("A".to_string(), "B".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
