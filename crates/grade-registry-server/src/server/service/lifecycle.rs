//! Serving state and graceful shutdown.
//!
//! [`Lifecycle`] tracks whether the service still accepts calls and how many
//! `ListGrades` streams are in flight. Shutdown runs in phases:
//!
//! 1. Refuse new calls (`UNAVAILABLE`).
//! 2. Let in-flight streams drain for up to `shutdown_timeout`.
//! 3. Cancel whatever is still streaming through the shared
//!    [`CancellationToken`].

use crate::server::telemetry::{decrement_streams_inflight, increment_streams_inflight};
use core::time::Duration;
use grade_registry_core::{Error, Result};
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct Lifecycle {
    shutting_down: AtomicBool,
    streams_inflight: AtomicUsize,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
}

impl Lifecycle {
    pub fn new(shutdown_timeout: Duration) -> Self {
        Self {
            shutting_down: AtomicBool::new(false),
            streams_inflight: AtomicUsize::new(0),
            shutdown_token: CancellationToken::new(),
            shutdown_timeout,
        }
    }

    /// # Errors
    ///
    /// [`Error::ServiceShutdown`] once shutdown has begun.
    pub fn ensure_serving(&self) -> Result<()> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(Error::ServiceShutdown);
        }
        Ok(())
    }

    pub fn streams_inflight(&self) -> usize {
        self.streams_inflight.load(Ordering::Acquire)
    }

    /// Token cancelled when the drain window expires.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Registers an in-flight stream until the returned guard is dropped.
    pub fn track_stream(self: &Arc<Self>) -> StreamGuard {
        self.streams_inflight.fetch_add(1, Ordering::AcqRel);
        increment_streams_inflight();
        StreamGuard {
            lifecycle: Arc::clone(self),
        }
    }

    pub async fn shutdown(&self) {
        // === Phase 0: Stop accepting new calls ===
        #[cfg(feature = "tracing")]
        tracing::info!("Refusing new requests");
        self.shutting_down.store(true, Ordering::Release);

        // === Phase 1: Wait for in-flight streams to drain ===
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Draining in-flight streams ({} active)",
            self.streams_inflight()
        );
        let drain_result = timeout(self.shutdown_timeout, async {
            while self.streams_inflight() > 0 {
                sleep(Duration::from_millis(50)).await;
            }
        })
        .await;

        match drain_result {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("All in-flight streams drained successfully");
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Graceful drain timed out ({} streams still active)",
                    self.streams_inflight()
                );
            }
        }

        // === Phase 2: Cancel anything still streaming ===
        #[cfg(feature = "tracing")]
        tracing::debug!("Cancelling remaining streams via shutdown token");
        self.shutdown_token.cancel();
    }
}

/// Decrements the in-flight stream count on drop.
#[derive(Debug)]
pub struct StreamGuard {
    lifecycle: Arc<Lifecycle>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.lifecycle
            .streams_inflight
            .fetch_sub(1, Ordering::AcqRel);
        decrement_streams_inflight();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_tracks_inflight_streams() {
        let lifecycle = Arc::new(Lifecycle::new(Duration::from_secs(1)));
        let a = lifecycle.track_stream();
        let b = lifecycle.track_stream();
        assert_eq!(lifecycle.streams_inflight(), 2);
        drop(a);
        assert_eq!(lifecycle.streams_inflight(), 1);
        drop(b);
        assert_eq!(lifecycle.streams_inflight(), 0);
    }

    #[tokio::test]
    async fn shutdown_refuses_calls_and_cancels_token() {
        let lifecycle = Arc::new(Lifecycle::new(Duration::from_millis(10)));
        assert!(lifecycle.ensure_serving().is_ok());

        let token = lifecycle.shutdown_token();
        lifecycle.shutdown().await;

        assert_eq!(lifecycle.ensure_serving(), Err(Error::ServiceShutdown));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn shutdown_waits_for_streams_to_drain() {
        let lifecycle = Arc::new(Lifecycle::new(Duration::from_secs(5)));
        let guard = lifecycle.track_stream();
        let token = lifecycle.shutdown_token();

        let finisher = tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            drop(guard);
        });

        lifecycle.shutdown().await;
        finisher.await.unwrap();
        assert_eq!(lifecycle.streams_inflight(), 0);
        assert!(token.is_cancelled());
    }
}
