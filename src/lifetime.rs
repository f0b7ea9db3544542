//! Service lifetime definitions.

/// Service lifetimes controlling instance caching behavior
///
/// The lifetime selects the value store a service produces into: the service
/// itself for singletons, the acting provider or scope for scoped services,
/// nothing at all for transients.
///
/// # Examples
///
/// ```rust
/// use callsite_di::{Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct Repository { id: u32 }
/// struct RequestModel { id: u32 }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services.add_scoped_factory::<Repository, _>(|_| Repository { id: 1 });
/// services.add_transient_factory::<RequestModel, _>(|_| RequestModel { id: 2 });
///
/// let provider = services.build();
///
/// // Singleton: same instance across scopes
/// let scope1 = provider.create_scope();
/// let db1 = provider.get_required::<Database>();
/// let db2 = scope1.get_required::<Database>();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// // Scoped: same within scope, different across scopes
/// let repo1a = scope1.get_required::<Repository>();
/// let repo1b = scope1.get_required::<Repository>();
/// assert!(Arc::ptr_eq(&repo1a, &repo1b));
/// let scope2 = provider.create_scope();
/// assert!(!Arc::ptr_eq(&repo1a, &scope2.get_required::<Repository>()));
///
/// // Transient: always different instances
/// let m1 = scope1.get_required::<RequestModel>();
/// let m2 = scope1.get_required::<RequestModel>();
/// assert!(!Arc::ptr_eq(&m1, &m2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum Lifetime {
    /// Single instance per root provider, cached in the service itself
    ///
    /// Resolution is always redirected to the root provider, so a singleton
    /// and its dependencies are never duplicated per scope.
    Singleton,
    /// Single instance per scope, cached in the acting provider or scope
    ///
    /// The root provider acts as its own scope for scoped services resolved
    /// directly from it.
    Scoped,
    /// New instance per resolution, never cached
    Transient,
}

impl Lifetime {
    /// Whether values of this lifetime are cached anywhere.
    #[inline]
    pub fn is_cached(self) -> bool {
        !matches!(self, Lifetime::Transient)
    }
}
