//! # Shared Observer
//!
//! The `Observer` collaborator: structured events plus metrics. Every
//! consensus/driver/sharding crate depends on the [`Observer`] trait,
//! never on `tracing`/`prometheus` directly, so they stay testable with
//! [`NullObserver`].

pub mod events;
pub mod metrics;

pub use events::ObserverEvent;
pub use metrics::Metrics;

use std::sync::Arc;

/// Structured events + metrics sink.
///
/// Implementations must not panic or block significantly — this is called
/// from the hot path of every consensus round.
pub trait Observer: Send + Sync {
    /// Record a structured event.
    fn record(&self, event: ObserverEvent);

    /// Access the metrics registry backing this observer.
    fn metrics(&self) -> &Metrics;
}

/// An [`Observer`] that logs via `tracing` and records into a
/// `prometheus::Registry`-backed [`Metrics`].
pub struct TracingObserver {
    metrics: Metrics,
}

impl TracingObserver {
    /// Build a new observer with a fresh metrics registry.
    pub fn new() -> Self {
        Self { metrics: Metrics::new() }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for TracingObserver {
    fn record(&self, event: ObserverEvent) {
        event.emit_tracing();
        event.update_metrics(&self.metrics);
    }

    fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// An [`Observer`] that discards everything; used in unit tests that don't
/// care about telemetry.
#[derive(Default)]
pub struct NullObserver {
    metrics: Metrics,
}

impl NullObserver {
    /// Build a new no-op observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in an `Arc` for the common constructor-injection case.
    pub fn shared() -> Arc<dyn Observer> {
        Arc::new(Self::new())
    }
}

impl Observer for NullObserver {
    fn record(&self, _event: ObserverEvent) {}

    fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
