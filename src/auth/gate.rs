//! Auth gate: single-flight coordination of re-authentication.
//!
//! # States
//! - Open: calls are admitted immediately
//! - Handshaking: one re-authentication is running; new and failed calls queue
//!
//! # State Transitions
//! ```text
//! Open → Handshaking: first unauthorized report while open (handler invoked once)
//! Handshaking → Open: handler settles
//!     same identity      → every waiter resumed
//!     different identity → initiator rejected, other waiters stay queued
//!     handler error      → initiator rejected, other waiters stay queued
//! ```
//!
//! Queued waiters left behind by a failed handshake are resumed by the next
//! handshake that completes with the same identity. Every waiter is resumed at
//! most once, because resumption drains the queue.
//!
//! All state changes happen under one lock that is never held across an await.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::Instrument;

use crate::auth::handler::{HandshakeError, IdentityCheck, ReauthHandler};
use crate::observability::metrics;

/// Why a call that reported unauthorized must fail.
#[derive(Debug, Error)]
pub enum GateRejection {
    /// The call opted out of auth handling.
    #[error("auth handling skipped for this call")]
    Skipped,

    /// No re-authentication handler is registered.
    #[error("no re-authentication handler registered")]
    NoHandler,

    /// The handshake completed for a different identity.
    #[error("re-authentication switched identity")]
    IdentityChanged,

    /// The handler failed.
    #[error("re-authentication failed: {0}")]
    Handshake(#[source] HandshakeError),
}

struct Waiter {
    id: u64,
    resume: oneshot::Sender<()>,
}

#[derive(Default)]
struct GateState {
    handshake_in_progress: bool,
    waiters: Vec<Waiter>,
    next_waiter_id: u64,
}

impl GateState {
    fn enqueue(&mut self) -> (u64, oneshot::Receiver<()>) {
        let (resume, rx) = oneshot::channel();
        let id = self.next_waiter_id;
        self.next_waiter_id += 1;
        // Callers dropped while queued leave a closed sender behind.
        self.waiters.retain(|w| !w.resume.is_closed());
        self.waiters.push(Waiter { id, resume });
        metrics::record_gate_waiters(self.waiters.len());
        (id, rx)
    }

    fn remove(&mut self, id: u64) {
        self.waiters.retain(|w| w.id != id);
        metrics::record_gate_waiters(self.waiters.len());
    }
}

enum Role {
    Initiator(u64, oneshot::Receiver<()>),
    Waiter(oneshot::Receiver<()>),
}

/// Process-wide (or client-wide) re-authentication coordinator.
pub struct AuthGate {
    state: Arc<Mutex<GateState>>,
    handler: Option<Arc<dyn ReauthHandler>>,
    handshakes: AtomicU64,
}

impl AuthGate {
    /// A gate without a handler: unauthorized responses fail their call.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState::default())),
            handler: None,
            handshakes: AtomicU64::new(0),
        }
    }

    pub fn with_handler(handler: Arc<dyn ReauthHandler>) -> Self {
        Self {
            handler: Some(handler),
            ..Self::new()
        }
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub fn is_handshake_in_progress(&self) -> bool {
        lock(&self.state).handshake_in_progress
    }

    /// Calls currently suspended behind the gate.
    pub fn waiter_count(&self) -> usize {
        lock(&self.state).waiters.len()
    }

    /// Number of times the handler has been invoked.
    pub fn handshake_count(&self) -> u64 {
        self.handshakes.load(Ordering::SeqCst)
    }

    /// Wait until it is safe to dispatch.
    ///
    /// Returns immediately when `skip_gate` is set or no handshake is running.
    pub async fn admit(&self, skip_gate: bool) {
        let rx = {
            let mut state = lock(&self.state);
            if skip_gate || !state.handshake_in_progress {
                return;
            }
            state.enqueue().1
        };

        tracing::debug!("Waiting for re-authentication before dispatch");
        let _ = rx.await;
    }

    /// Declare that a call observed an unauthorized response.
    ///
    /// `Ok(())` means the call may redispatch: a handshake it started or
    /// waited on completed with the same identity.
    pub async fn report_unauthorized(&self, skip_handling: bool) -> Result<(), GateRejection> {
        if skip_handling {
            return Err(GateRejection::Skipped);
        }
        let handler = match &self.handler {
            Some(handler) => Arc::clone(handler),
            None => return Err(GateRejection::NoHandler),
        };

        let role = {
            let mut state = lock(&self.state);
            if state.handshake_in_progress {
                Role::Waiter(state.enqueue().1)
            } else {
                state.handshake_in_progress = true;
                let (id, rx) = state.enqueue();
                Role::Initiator(id, rx)
            }
        };

        match role {
            Role::Waiter(rx) => {
                tracing::debug!("Re-authentication already running, queued");
                let _ = rx.await;
                Ok(())
            }
            Role::Initiator(id, rx) => {
                self.handshakes.fetch_add(1, Ordering::SeqCst);
                tracing::info!("Unauthorized response, starting re-authentication");

                // The handshake runs detached so that dropping the initiating
                // call cannot leave the gate closed.
                let state = Arc::clone(&self.state);
                let task = tokio::spawn(
                    async move {
                        let result = handler.reauthenticate().await;
                        finish_handshake(&state, id, result)
                    }
                    .in_current_span(),
                );

                let outcome = match task.await {
                    Ok(outcome) => outcome,
                    Err(join_err) => {
                        tracing::error!(error = %join_err, "Re-authentication handler aborted");
                        finish_handshake(&self.state, id, Err(Box::new(join_err)))
                    }
                };

                if outcome.is_ok() {
                    let _ = rx.await;
                }
                outcome
            }
        }
    }
}

impl Default for AuthGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("AuthGate")
            .field("handshake_in_progress", &state.handshake_in_progress)
            .field("waiters", &state.waiters.len())
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

fn lock(state: &Mutex<GateState>) -> MutexGuard<'_, GateState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn finish_handshake(
    state: &Mutex<GateState>,
    initiator: u64,
    result: Result<IdentityCheck, HandshakeError>,
) -> Result<(), GateRejection> {
    let mut guard = lock(state);
    if !guard.handshake_in_progress {
        // Already settled (handler task panicked after finishing).
        return Err(GateRejection::Handshake("handshake already settled".into()));
    }
    guard.handshake_in_progress = false;

    match result {
        Ok(IdentityCheck::Same) => {
            let waiters = std::mem::take(&mut guard.waiters);
            metrics::record_gate_waiters(0);
            drop(guard);

            tracing::info!(released = waiters.len(), "Re-authentication succeeded");
            metrics::record_handshake("same_identity");
            for waiter in waiters {
                let _ = waiter.resume.send(());
            }
            Ok(())
        }
        Ok(IdentityCheck::Different) => {
            guard.remove(initiator);
            tracing::warn!(
                queued = guard.waiters.len(),
                "Re-authentication returned a different identity"
            );
            metrics::record_handshake("different_identity");
            Err(GateRejection::IdentityChanged)
        }
        Err(e) => {
            guard.remove(initiator);
            tracing::warn!(error = %e, queued = guard.waiters.len(), "Re-authentication failed");
            metrics::record_handshake("failed");
            Err(GateRejection::Handshake(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting_handler(
        calls: Arc<AtomicUsize>,
        check: IdentityCheck,
    ) -> Arc<dyn ReauthHandler> {
        Arc::new(move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, HandshakeError>(check)
            }
        })
    }

    #[tokio::test]
    async fn test_admit_when_open() {
        let gate = AuthGate::new();
        gate.admit(false).await;
        assert_eq!(gate.waiter_count(), 0);
    }

    #[tokio::test]
    async fn test_skip_and_missing_handler() {
        let gate = AuthGate::new();
        assert!(matches!(gate.report_unauthorized(true).await, Err(GateRejection::Skipped)));
        assert!(matches!(gate.report_unauthorized(false).await, Err(GateRejection::NoHandler)));
        assert!(!gate.is_handshake_in_progress());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(AuthGate::with_handler(counting_handler(
            calls.clone(),
            IdentityCheck::Same,
        )));

        let reports: Vec<_> = (0..5)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.report_unauthorized(false).await })
            })
            .collect();

        for report in reports {
            assert!(report.await.unwrap().is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.handshake_count(), 1);
        assert!(!gate.is_handshake_in_progress());
        assert_eq!(gate.waiter_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admission_waits_for_handshake() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(AuthGate::with_handler(counting_handler(
            calls.clone(),
            IdentityCheck::Same,
        )));

        let initiator = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.report_unauthorized(false).await })
        };
        tokio::task::yield_now().await;
        assert!(gate.is_handshake_in_progress());

        let admitted = {
            let gate = gate.clone();
            tokio::spawn(async move {
                gate.admit(false).await;
                tokio::time::Instant::now()
            })
        };
        // Opting out of the gate is never delayed.
        let start = tokio::time::Instant::now();
        gate.admit(true).await;
        assert_eq!(tokio::time::Instant::now(), start);

        assert!(initiator.await.unwrap().is_ok());
        let admitted_at = admitted.await.unwrap();
        assert!(admitted_at >= start + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_identity_rejects_initiator_only() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(AuthGate::with_handler(counting_handler(
            calls.clone(),
            IdentityCheck::Different,
        )));

        let initiator = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.report_unauthorized(false).await })
        };
        tokio::task::yield_now().await;

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.admit(false).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(gate.waiter_count(), 2);

        assert!(matches!(
            initiator.await.unwrap(),
            Err(GateRejection::IdentityChanged)
        ));
        assert!(!gate.is_handshake_in_progress());
        assert_eq!(gate.waiter_count(), 1);
        assert!(!waiter.is_finished());
        waiter.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_waiters_pruned() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(AuthGate::with_handler(counting_handler(
            calls.clone(),
            IdentityCheck::Different,
        )));

        let initiator = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.report_unauthorized(false).await })
        };
        tokio::task::yield_now().await;

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.admit(false).await })
            })
            .collect();
        tokio::task::yield_now().await;
        assert_eq!(gate.waiter_count(), 4);

        for waiter in waiters {
            waiter.abort();
            assert!(waiter.await.unwrap_err().is_cancelled());
        }
        assert!(initiator.await.unwrap().is_err());

        // The next handshake's enqueue drops the abandoned entries.
        let next = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.report_unauthorized(false).await })
        };
        tokio::task::yield_now().await;
        assert!(gate.is_handshake_in_progress());
        assert_eq!(gate.waiter_count(), 1);

        assert!(next.await.unwrap().is_err());
        assert_eq!(gate.waiter_count(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_handshake_runs_in_caller_span() {
        let _subscriber = tracing::subscriber::set_default(tracing_subscriber::registry());

        let seen = Arc::new(std::sync::Mutex::new(None));
        let handler: Arc<dyn ReauthHandler> = {
            let seen = seen.clone();
            Arc::new(move || {
                let seen = seen.clone();
                async move {
                    let span = tracing::Span::current();
                    *seen.lock().unwrap() = span.metadata().map(|m| m.name());
                    Ok::<_, HandshakeError>(IdentityCheck::Same)
                }
            })
        };
        let gate = AuthGate::with_handler(handler);

        gate.report_unauthorized(false)
            .instrument(tracing::info_span!("catalog_call"))
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), Some("catalog_call"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_handshake_leaves_waiters_for_next_attempt() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let handler: Arc<dyn ReauthHandler> = {
            let attempts = attempts.clone();
            Arc::new(move || {
                let attempts = attempts.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    if n == 0 {
                        Err::<IdentityCheck, HandshakeError>("login window closed".into())
                    } else {
                        Ok(IdentityCheck::Same)
                    }
                }
            })
        };
        let gate = Arc::new(AuthGate::with_handler(handler));

        let first = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.report_unauthorized(false).await })
        };
        tokio::task::yield_now().await;
        let queued = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.report_unauthorized(false).await })
        };
        tokio::task::yield_now().await;

        match first.await.unwrap() {
            Err(GateRejection::Handshake(e)) => assert_eq!(e.to_string(), "login window closed"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(gate.waiter_count(), 1);

        // The next unauthorized report starts a new handshake that releases everyone.
        assert!(gate.report_unauthorized(false).await.is_ok());
        assert!(queued.await.unwrap().is_ok());
        assert_eq!(gate.handshake_count(), 2);
        assert_eq!(gate.waiter_count(), 0);
    }
}
