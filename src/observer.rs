//! Diagnostic observers for resolution events.
//!
//! Observers are registered on the [`ServiceCollection`](crate::ServiceCollection)
//! and notified synchronously around every top-level resolution, plus once
//! whenever a service's compiled accessor is published.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::request::ResolveRequest;

/// Observer trait for resolution events.
///
/// Calls are made on the resolving thread (or, for
/// [`compiled`](Self::compiled), on a rayon worker). Keep implementations
/// lightweight.
///
/// # Examples
///
/// ```
/// use callsite_di::{DiObserver, ResolveRequest, Resolver, ServiceCollection};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Misses(AtomicUsize);
///
/// impl DiObserver for Misses {
///     fn resolving(&self, _request: &ResolveRequest) {}
///
///     fn resolved(&self, _request: &ResolveRequest, _duration: Duration, found: bool) {
///         if !found {
///             self.0.fetch_add(1, Ordering::Relaxed);
///         }
///     }
/// }
///
/// let misses = Arc::new(Misses::default());
/// let mut services = ServiceCollection::new();
/// services.add_observer(misses.clone());
///
/// let provider = services.build();
/// assert!(provider.try_get::<String>().unwrap().is_none());
/// assert_eq!(misses.0.load(Ordering::Relaxed), 1);
/// ```
pub trait DiObserver: Send + Sync {
    /// Called before a request is resolved.
    fn resolving(&self, request: &ResolveRequest);

    /// Called after a request resolved without error; `found` is false for a
    /// lookup miss.
    fn resolved(&self, request: &ResolveRequest, duration: Duration, found: bool);

    /// Called once when a service's compiled accessor is published.
    fn compiled(&self, _service: &str) {}
}

#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, request: &ResolveRequest) {
        for observer in &self.observers {
            observer.resolving(request);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, request: &ResolveRequest, duration: Duration, found: bool) {
        for observer in &self.observers {
            observer.resolved(request, duration, found);
        }
    }

    pub(crate) fn compiled(&self, service: &str) {
        for observer in &self.observers {
            observer.compiled(service);
        }
    }
}

/// Observer that forwards events to `tracing`.
///
/// Installed automatically when
/// [`ProviderSettings::enable_debug`](crate::ProviderSettings) is set.
///
/// ```
/// use callsite_di::{ServiceCollection, TracingObserver};
/// use std::sync::Arc;
///
/// let mut services = ServiceCollection::new();
/// services.add_observer(Arc::new(TracingObserver::new()));
/// let provider = services.build();
/// ```
#[derive(Debug, Default)]
pub struct TracingObserver {
    _private: (),
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiObserver for TracingObserver {
    fn resolving(&self, request: &ResolveRequest) {
        trace!(request = %request, "resolving");
    }

    fn resolved(&self, request: &ResolveRequest, duration: Duration, found: bool) {
        debug!(request = %request, ?duration, found, "resolved");
    }

    fn compiled(&self, service: &str) {
        debug!(service, "compiled");
    }
}

/// Counts resolutions, misses and compilations.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    resolutions: AtomicU64,
    misses: AtomicU64,
    compilations: AtomicU64,
    total_nanos: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolution_count(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// Resolutions that found no service.
    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn compilation_count(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }

    pub fn total_resolution_time(&self) -> Duration {
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed))
    }

    pub fn average_resolution_time(&self) -> Option<Duration> {
        match self.resolution_count() {
            0 => None,
            count => Some(Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed) / count)),
        }
    }

    pub fn reset(&self) {
        self.resolutions.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.compilations.store(0, Ordering::Relaxed);
        self.total_nanos.store(0, Ordering::Relaxed);
    }
}

impl DiObserver for MetricsObserver {
    fn resolving(&self, _request: &ResolveRequest) {}

    fn resolved(&self, _request: &ResolveRequest, duration: Duration, found: bool) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        if !found {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        self.total_nanos.fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    fn compiled(&self, _service: &str) {
        self.compilations.fetch_add(1, Ordering::Relaxed);
    }
}
