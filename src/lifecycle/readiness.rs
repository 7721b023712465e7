//! Host readiness coordination.

use async_trait::async_trait;
use tokio::sync::watch;

/// Awaited before any call result is delivered to the caller.
///
/// Implementations must always eventually complete.
#[async_trait]
pub trait Readiness: Send + Sync {
    async fn ready(&self);
}

/// Host that is always ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

#[async_trait]
impl Readiness for AlwaysReady {
    async fn ready(&self) {}
}

/// Latch the host opens once it can accept results.
///
/// Cloned handles share the latch.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    tx: watch::Sender<bool>,
}

impl ReadinessGate {
    /// Create a closed gate.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Open the gate and release every pending delivery.
    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Readiness for ReadinessGate {
    async fn ready(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so wait_for only errs if it is dropped mid-wait.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}
