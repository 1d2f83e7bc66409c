use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

/// Suspension point used for every settle and panel wait.
#[async_trait]
pub trait Waiter: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Real-time waiter backed by the tokio timer.
#[derive(Clone, Debug, Default)]
pub struct TokioWaiter;

#[async_trait]
impl Waiter for TokioWaiter {
    async fn wait(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Deterministic waiter for tests and dry runs: returns immediately and
/// records every requested duration on a virtual clock.
#[derive(Clone, Debug, Default)]
pub struct VirtualWaiter {
    inner: Arc<Mutex<Vec<Duration>>>,
}

impl VirtualWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total virtual time elapsed.
    pub fn elapsed(&self) -> Duration {
        self.inner.lock().iter().sum()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.inner.lock().clone()
    }

    pub fn count(&self, duration: Duration) -> usize {
        self.inner.lock().iter().filter(|d| **d == duration).count()
    }
}

#[async_trait]
impl Waiter for VirtualWaiter {
    async fn wait(&self, duration: Duration) {
        self.inner.lock().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn virtual_waiter_accumulates() {
        let waiter = VirtualWaiter::new();
        waiter.wait(Duration::from_millis(250)).await;
        waiter.wait(Duration::from_millis(1800)).await;
        waiter.wait(Duration::from_millis(250)).await;
        assert_eq!(waiter.elapsed(), Duration::from_millis(2300));
        assert_eq!(waiter.count(Duration::from_millis(250)), 2);
    }
}
