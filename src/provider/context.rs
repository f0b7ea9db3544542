//! Resolver context for factory delegates.

use crate::descriptors::AnyArc;
use crate::error::DiResult;
use crate::key::ServiceType;
use crate::request::{ResolveLevel, ResolveRequest, ResolveResult};
use crate::traits::{Resolver, ResolverCore};

/// Context passed to factory functions for resolving dependencies.
///
/// Wraps the acting resolver (the root provider or a scope), so services a
/// factory resolves keep the lifetime semantics of the scope it runs in.
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
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database {
///     url: "postgres://localhost".to_string()
/// });
/// services.add_transient_factory::<UserService, _>(|resolver| {
///     UserService {
///         db: resolver.get_required::<Database>(),
///     }
/// });
///
/// let provider = services.build();
/// assert_eq!(provider.get_required::<UserService>().db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    resolver: &'a dyn ResolverCore,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(resolver: &'a dyn ResolverCore) -> Self {
        Self { resolver }
    }
}

impl<'a> ResolverCore for ResolverContext<'a> {
    fn resolve(&self, request: &ResolveRequest) -> DiResult<ResolveResult> {
        self.resolver.resolve(request)
    }

    fn resolve_at(&self, level: ResolveLevel, request: &ResolveRequest) -> DiResult<ResolveResult> {
        self.resolver.resolve_at(level, request)
    }

    fn resolve_all(&self, service_type: ServiceType) -> DiResult<Vec<AnyArc>> {
        self.resolver.resolve_all(service_type)
    }

    fn push_disposer(&self, f: Box<dyn FnOnce() + Send>) {
        self.resolver.push_disposer(f);
    }
}

impl<'a> Resolver for ResolverContext<'a> {}
