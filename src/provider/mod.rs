//! Service provider module.
//!
//! This module contains the root [`ServiceProvider`], the per-request
//! [`Scope`] and the [`ResolverContext`] handed to factory delegates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

use crate::descriptors::{AnyArc, ServiceDescriptor};
use crate::error::{DiError, DiResult};
use crate::key::ServiceType;
use crate::observer::Observers;
use crate::request::{ResolveLevel, ResolveRequest, ResolveResult};
use crate::resolver::{resolve_with_mode, ServiceResolver};
use crate::service::ServiceState;
use crate::settings::ProviderSettings;
use crate::store::ScopeStore;
use crate::traits::{Resolver, ResolverCore};

pub mod context;
pub mod scope;

pub use context::ResolverContext;
pub use scope::Scope;

/// What a service needs from the provider or scope it is resolved against.
pub(crate) trait ProviderCore: Send + Sync {
    /// The root provider; singletons always resolve against it.
    fn root(&self) -> &ServiceProvider;

    /// Store holding scoped values for this provider or scope.
    fn store(&self) -> &ScopeStore;

    fn as_resolver(&self) -> &dyn ResolverCore;
}

/// Root service provider.
///
/// Owns the resolver (and through it every service and singleton value), the
/// provider settings, and a root scope store: scoped services resolved
/// directly from the root are cached once in the root. The provider is cheap
/// to clone; clones share the same state.
///
/// # Examples
///
/// ```
/// use callsite_di::{Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(Database { url: "postgres://localhost".to_string() });
/// collection.add_transient_factory::<UserService, _>(|resolver| {
///     UserService { db: resolver.get_required::<Database>() }
/// });
///
/// let provider = collection.build();
/// let user_service = provider.get_required::<UserService>();
/// assert_eq!(user_service.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    resolver: Box<dyn ServiceResolver>,
    settings: ProviderSettings,
    store: ScopeStore,
    observers: Observers,
    disposed: AtomicBool,
}

impl ProviderInner {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("disposing service provider");
        self.resolver.dispose();
        self.store.dispose();
    }
}

impl Drop for ProviderInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl ServiceProvider {
    pub(crate) fn new(resolver: Box<dyn ServiceResolver>, settings: ProviderSettings, observers: Observers) -> Self {
        debug!(
            services = resolver.services().len(),
            compile_after = ?settings.compile_after_call_count,
            "service provider built"
        );
        Self {
            inner: Arc::new(ProviderInner {
                resolver,
                settings,
                store: ScopeStore::new(),
                observers,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.inner.settings
    }

    #[inline]
    pub(crate) fn resolver(&self) -> &dyn ServiceResolver {
        &*self.inner.resolver
    }

    #[inline]
    pub(crate) fn observers(&self) -> &Observers {
        &self.inner.observers
    }

    /// Creates a new scope for resolving scoped services.
    ///
    /// Scoped services are cached per scope; singletons still come from the
    /// root provider.
    ///
    /// ```
    /// use callsite_di::{Resolver, ServiceCollection};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// struct RequestId(usize);
    ///
    /// let counter = Arc::new(AtomicUsize::new(0));
    /// let next = counter.clone();
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_scoped_factory::<RequestId, _>(move |_| {
    ///     RequestId(next.fetch_add(1, Ordering::SeqCst))
    /// });
    ///
    /// let provider = collection.build();
    /// let scope1 = provider.create_scope();
    /// let scope2 = provider.create_scope();
    ///
    /// let req1a = scope1.get_required::<RequestId>();
    /// let req1b = scope1.get_required::<RequestId>();
    /// let req2 = scope2.get_required::<RequestId>();
    ///
    /// assert!(Arc::ptr_eq(&req1a, &req1b));
    /// assert!(!Arc::ptr_eq(&req1a, &req2));
    /// ```
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone())
    }

    /// Registers a service after build.
    ///
    /// Only providers built with
    /// [`build_concurrent`](crate::ServiceCollection::build_concurrent) accept
    /// additions; a static provider returns [`DiError::RegistrySealed`].
    pub fn add(&self, descriptor: ServiceDescriptor) -> DiResult<()> {
        self.check_live()?;
        self.inner.resolver.add(descriptor)
    }

    /// Lifecycle snapshot of the service answering `request`, looked up
    /// across the resolve mode without producing a value.
    ///
    /// `Ok(None)` when nothing is registered for `request`; fails with
    /// [`DiError::Disposed`] once the provider is disposed.
    pub fn service_state(&self, request: &ResolveRequest) -> DiResult<Option<ServiceState>> {
        self.state_for(self, request)
    }

    pub(crate) fn state_for(
        &self,
        acting: &dyn ProviderCore,
        request: &ResolveRequest,
    ) -> DiResult<Option<ServiceState>> {
        self.check_live()?;
        for level in &self.inner.settings.resolve_mode {
            if let Some(service) = self.inner.resolver.resolve_service(request, *level)? {
                return Ok(Some(service.state(acting)));
            }
        }
        Ok(None)
    }

    /// Disposes every service (singleton values newest first), then the root
    /// scope store. Idempotent; later resolutions fail with
    /// [`DiError::Disposed`].
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    fn check_live(&self) -> DiResult<()> {
        if self.is_disposed() {
            Err(DiError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Resolution entry point shared by the root and its scopes.
    pub(crate) fn resolve_for(
        &self,
        acting: &dyn ProviderCore,
        request: &ResolveRequest,
        level: Option<ResolveLevel>,
    ) -> DiResult<ResolveResult> {
        self.check_live()?;
        let inner = &self.inner;
        let run = || match level {
            Some(level) => inner.resolver.resolve_value(acting, level, request),
            None => resolve_with_mode(&*inner.resolver, acting, &inner.settings.resolve_mode, request),
        };

        if !inner.observers.has_observers() {
            trace!(request = %request, "resolving");
            return run();
        }

        inner.observers.resolving(request);
        let start = Instant::now();
        let result = run();
        let found = matches!(&result, Ok(r) if r.has_value());
        inner.observers.resolved(request, start.elapsed(), found);
        result
    }

    pub(crate) fn resolve_all_for(&self, acting: &dyn ProviderCore, service_type: ServiceType) -> DiResult<Vec<AnyArc>> {
        self.check_live()?;
        self.inner
            .resolver
            .services_of(service_type)?
            .iter()
            .map(|service| service.resolve_dependency(acting))
            .collect()
    }
}

impl ProviderCore for ServiceProvider {
    fn root(&self) -> &ServiceProvider {
        self
    }

    fn store(&self) -> &ScopeStore {
        &self.inner.store
    }

    fn as_resolver(&self) -> &dyn ResolverCore {
        self
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve(&self, request: &ResolveRequest) -> DiResult<ResolveResult> {
        self.resolve_for(self, request, None)
    }

    fn resolve_at(&self, level: ResolveLevel, request: &ResolveRequest) -> DiResult<ResolveResult> {
        self.resolve_for(self, request, Some(level))
    }

    fn resolve_all(&self, service_type: ServiceType) -> DiResult<Vec<AnyArc>> {
        self.resolve_all_for(self, service_type)
    }

    fn push_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.inner.store.push_disposer(f);
    }
}

impl Resolver for ServiceProvider {}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("services", &self.inner.resolver.services().len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
