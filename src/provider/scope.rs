//! Scoped service resolution and lifecycle management.

use tracing::debug;

use super::{ProviderCore, ServiceProvider};
use crate::descriptors::AnyArc;
use crate::error::{DiError, DiResult};
use crate::key::ServiceType;
use crate::request::{ResolveLevel, ResolveRequest, ResolveResult};
use crate::service::ServiceState;
use crate::store::ScopeStore;
use crate::traits::{Resolver, ResolverCore};

/// Scoped service container for request-scoped dependency resolution.
///
/// - **Singleton**: resolved and cached in the root provider
/// - **Scoped**: resolved and cached within this scope
/// - **Transient**: created fresh on every resolution
///
/// Disposing the scope (explicitly or by dropping it) runs the disposers of
/// its scoped values in reverse creation order.
///
/// # Examples
///
/// ```
/// use callsite_di::{Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct DatabaseConnection(String);
///
/// struct UserService {
///     db: Arc<DatabaseConnection>,
/// }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_scoped_factory::<DatabaseConnection, _>(|_| {
///     DatabaseConnection("connection-123".to_string())
/// });
/// collection.add_transient_factory::<UserService, _>(|resolver| UserService {
///     db: resolver.get_required::<DatabaseConnection>(),
/// });
///
/// let provider = collection.build();
/// let scope = provider.create_scope();
///
/// let user1 = scope.get_required::<UserService>();
/// let user2 = scope.get_required::<UserService>();
/// assert!(Arc::ptr_eq(&user1.db, &user2.db));
/// ```
pub struct Scope {
    root: ServiceProvider,
    store: ScopeStore,
}

impl Scope {
    pub(crate) fn new(root: ServiceProvider) -> Self {
        Self {
            root,
            store: ScopeStore::new(),
        }
    }

    /// The root provider this scope belongs to.
    pub fn provider(&self) -> &ServiceProvider {
        &self.root
    }

    /// Lifecycle snapshot of the service answering `request`, with the cached
    /// value flag reported for this scope.
    pub fn service_state(&self, request: &ResolveRequest) -> DiResult<Option<ServiceState>> {
        self.check_live()?;
        self.root.state_for(self, request)
    }

    /// Disposes scoped values in reverse creation order. Idempotent.
    pub fn dispose(&self) {
        if !self.store.is_disposed() {
            debug!(values = self.store.len(), "disposing scope");
        }
        self.store.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.store.is_disposed()
    }

    fn check_live(&self) -> DiResult<()> {
        if self.store.is_disposed() {
            Err(DiError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl ProviderCore for Scope {
    fn root(&self) -> &ServiceProvider {
        &self.root
    }

    fn store(&self) -> &ScopeStore {
        &self.store
    }

    fn as_resolver(&self) -> &dyn ResolverCore {
        self
    }
}

impl ResolverCore for Scope {
    fn resolve(&self, request: &ResolveRequest) -> DiResult<ResolveResult> {
        self.check_live()?;
        self.root.resolve_for(self, request, None)
    }

    fn resolve_at(&self, level: ResolveLevel, request: &ResolveRequest) -> DiResult<ResolveResult> {
        self.check_live()?;
        self.root.resolve_for(self, request, Some(level))
    }

    fn resolve_all(&self, service_type: ServiceType) -> DiResult<Vec<AnyArc>> {
        self.check_live()?;
        self.root.resolve_all_for(self, service_type)
    }

    fn push_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.store.push_disposer(f);
    }
}

impl Resolver for Scope {}
