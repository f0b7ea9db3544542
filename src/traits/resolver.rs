//! Resolver traits for service resolution.

use std::sync::Arc;

use crate::descriptors::AnyArc;
use crate::error::{DiError, DiResult};
use crate::invoke::{invoke_constructor, Constructor, OverrideArguments};
use crate::key::ServiceType;
use crate::request::{ResolveLevel, ResolveRequest, ResolveResult};
use crate::traits::Dispose;

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by [`ServiceProvider`](crate::ServiceProvider),
/// [`Scope`](crate::Scope) and [`ResolverContext`](crate::ResolverContext).
/// Most users should use the [`Resolver`] trait instead, which provides
/// typed generic methods on top of this one.
pub trait ResolverCore: Send + Sync {
    /// Resolves `request` across the provider's resolve mode.
    ///
    /// A lookup miss is an empty result, not an error.
    fn resolve(&self, request: &ResolveRequest) -> DiResult<ResolveResult>;

    /// Resolves `request` at a single level.
    fn resolve_at(&self, level: ResolveLevel, request: &ResolveRequest) -> DiResult<ResolveResult>;

    /// Every service registered for `service_type`, in registration order.
    fn resolve_all(&self, service_type: ServiceType) -> DiResult<Vec<AnyArc>>;

    /// Registers a disposal hook with the acting scope or provider.
    fn push_disposer(&self, f: Box<dyn FnOnce() + Send>);
}

/// High-level resolver interface with generic methods for type-safe service
/// resolution.
///
/// # Examples
///
/// ```
/// use callsite_di::{Resolver, ServiceCollection};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {}", msg)
///     }
/// }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(42usize);
/// collection.add_named_singleton("retries", 3usize);
/// collection.add_singleton_trait(Arc::new(ConsoleLogger) as Arc<dyn Logger>);
///
/// let provider = collection.build();
///
/// assert_eq!(*provider.get_required::<usize>(), 3);
/// assert_eq!(*provider.get_named_required::<usize>("retries"), 3);
/// assert!(provider.try_get::<String>().unwrap().is_none());
///
/// let logger = provider.get_trait::<dyn Logger>().unwrap();
/// assert_eq!(logger.log("ready"), "LOG: ready");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves `T`; absence is `Ok(None)`.
    fn try_get<T: Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        self.resolve(&ResolveRequest::of::<T>())?.downcast::<T>()
    }

    /// Resolves `T`; absence is [`DiError::NotFound`].
    ///
    /// ```
    /// use callsite_di::{Resolver, ServiceCollection};
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_singleton("configuration".to_string());
    ///
    /// let provider = collection.build();
    /// let config = provider.get::<String>().unwrap();
    /// assert_eq!(&*config, "configuration");
    /// ```
    fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.try_get::<T>()?.ok_or_else(|| DiError::NotFound {
            service: std::any::type_name::<T>(),
            name: String::new(),
        })
    }

    /// Resolves `T`, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if the service is missing or its resolution fails.
    fn get_required<T: Send + Sync + 'static>(&self) -> Arc<T> {
        self.get::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<T>(), e))
    }

    /// Resolves `T` registered under `name`; absence is `Ok(None)`.
    fn try_get_named<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Option<Arc<T>>> {
        self.resolve(&ResolveRequest::named::<T>(name))?.downcast::<T>()
    }

    fn get_named<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        self.try_get_named::<T>(name)?.ok_or_else(|| DiError::NotFound {
            service: std::any::type_name::<T>(),
            name: name.to_string(),
        })
    }

    /// Resolves a named `T`, panicking on failure.
    fn get_named_required<T: Send + Sync + 'static>(&self, name: &str) -> Arc<T> {
        self.get_named::<T>(name).unwrap_or_else(|e| {
            panic!("Failed to resolve named {} ({}): {}", std::any::type_name::<T>(), name, e)
        })
    }

    /// Resolves a trait object registered as `Arc<dyn Trait>`; absence is `Ok(None)`.
    fn try_get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        Ok(self.try_get::<Arc<T>>()?.map(|boxed| (*boxed).clone()))
    }

    /// Resolves a trait object registered as `Arc<dyn Trait>`.
    fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.try_get_trait::<T>()?.ok_or_else(|| DiError::NotFound {
            service: std::any::type_name::<T>(),
            name: String::new(),
        })
    }

    /// Every registered `T` in registration order, each through its own
    /// lifetime.
    fn get_all<T: Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.resolve_all(ServiceType::of::<T>())?
            .into_iter()
            .map(|any| {
                any.downcast::<T>()
                    .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
            })
            .collect()
    }

    /// Every registered implementation of a trait registered as `Arc<dyn Trait>`.
    fn get_all_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        Ok(self
            .get_all::<Arc<T>>()?
            .into_iter()
            .map(|boxed| (*boxed).clone())
            .collect())
    }

    /// Invokes `constructor` with `overrides` winning over the registry.
    fn invoke_constructor(&self, constructor: &Constructor, overrides: &OverrideArguments) -> DiResult<AnyArc>
    where
        Self: Sized,
    {
        invoke_constructor(self, constructor, overrides)
    }

    /// Typed [`invoke_constructor`](Self::invoke_constructor).
    fn construct<T: Send + Sync + 'static>(
        &self,
        constructor: &Constructor,
        overrides: &OverrideArguments,
    ) -> DiResult<Arc<T>>
    where
        Self: Sized,
    {
        self.invoke_constructor(constructor, overrides)?
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Registers `service` for disposal with the acting scope or provider.
    ///
    /// Hooks run in LIFO order when the scope or provider is disposed.
    fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.push_disposer(Box::new(move || service.dispose()));
    }
}
