//! Disposal trait for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this for services that need structured teardown (flushing
/// caches, closing connections). Attach it to a registration with
/// [`ServiceCollection::dispose_last_with`](crate::ServiceCollection::dispose_last_with),
/// or register an instance from a factory with
/// [`Resolver::register_disposer`](crate::Resolver::register_disposer).
/// Hooks run in reverse creation order when the owning scope or provider is
/// disposed.
///
/// # Examples
///
/// ```
/// use callsite_di::{Dispose, Resolver, ServiceCollection};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct Cache {
///     flushed: Arc<AtomicBool>,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         self.flushed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let flushed = Arc::new(AtomicBool::new(false));
/// let flag = flushed.clone();
///
/// let mut services = ServiceCollection::new();
/// services
///     .add_scoped_factory::<Cache, _>(move |_| Cache { flushed: flag.clone() })
///     .dispose_last_with::<Cache>();
///
/// let provider = services.build();
/// let scope = provider.create_scope();
/// scope.get_required::<Cache>();
/// scope.dispose();
/// assert!(flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
