//! Concurrency gate bounding in-flight extraction jobs
//!
//! A counting permit pool of capacity N. Permits are owned and released on
//! drop, so a job gives its slot back however it ends.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Held by one in-flight job; dropping it frees the slot
pub type GatePermit = OwnedSemaphorePermit;

#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `capacity` jobs (at least one)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.capacity - self.available().min(self.capacity)
    }

    /// Wait for a free slot
    ///
    /// Waiters are served in FIFO order. Returns `None` once the gate is closed.
    pub async fn acquire(&self) -> Option<GatePermit> {
        self.semaphore.clone().acquire_owned().await.ok()
    }

    /// Refuse all further acquisitions; waiting callers get `None`
    pub fn close(&self) {
        self.semaphore.close();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permits_return_on_drop() {
        let gate = ConcurrencyGate::new(2);
        let a = gate.acquire().await.unwrap();
        let _b = gate.acquire().await.unwrap();
        assert_eq!(gate.in_flight(), 2);
        assert_eq!(gate.available(), 0);

        drop(a);
        assert_eq!(gate.in_flight(), 1);
    }

    #[tokio::test]
    async fn closed_gate_refuses() {
        let gate = ConcurrencyGate::new(1);
        gate.close();
        assert!(gate.acquire().await.is_none());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(ConcurrencyGate::new(0).capacity(), 1);
    }
}
