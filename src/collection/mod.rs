//! Service collection module.
//!
//! [`ServiceCollection`] gathers descriptors in registration order and builds
//! a [`ServiceProvider`] over them. Registration order matters: the last
//! registration for a type (or name) is the default resolution.

use std::sync::Arc;

use crate::descriptors::{All, AnyArc, Enumerable, Recipe, ServiceDescriptor};
use crate::error::{BoxError, DiResult};
use crate::invoke::{Arguments, Constructor, Factory, Parameter};
use crate::key::ServiceType;
use crate::lifetime::Lifetime;
use crate::observer::{DiObserver, Observers, TracingObserver};
use crate::provider::{ResolverContext, ServiceProvider};
use crate::resolver::{ConcurrentServiceResolver, ServiceResolver, StaticServiceResolver};
use crate::settings::ProviderSettings;
use crate::traits::Dispose;

/// Ordered list of service descriptors plus the observers to install.
#[derive(Default)]
pub struct ServiceCollection {
    descriptors: Vec<ServiceDescriptor>,
    observers: Observers,
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a descriptor.
    pub fn add(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    // ----- Instances -----

    /// Registers a singleton instance shared across the whole provider.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use callsite_di::{Resolver, ServiceCollection};
    /// struct Config {
    ///     database_url: String
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Config {
    ///     database_url: "postgres://localhost".to_string()
    /// });
    /// let provider = services.build();
    /// assert_eq!(provider.get_required::<Config>().database_url, "postgres://localhost");
    /// ```
    pub fn add_singleton<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.add(ServiceDescriptor::value(Lifetime::Singleton, value))
    }

    /// Registers a singleton instance under `name`.
    pub fn add_named_singleton<T: Send + Sync + 'static>(&mut self, name: &str, value: T) -> &mut Self {
        self.add(ServiceDescriptor::value(Lifetime::Singleton, value).with_name(name))
    }

    /// Registers a trait object, resolved with
    /// [`get_trait`](crate::Resolver::get_trait).
    ///
    /// ```rust
    /// # use callsite_di::{Resolver, ServiceCollection};
    /// # use std::sync::Arc;
    /// trait Clock: Send + Sync {
    ///     fn now(&self) -> u64;
    /// }
    ///
    /// struct Fixed;
    /// impl Clock for Fixed {
    ///     fn now(&self) -> u64 { 1_700_000_000 }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_trait::<dyn Clock>(Arc::new(Fixed));
    /// let provider = services.build();
    /// assert_eq!(provider.get_trait::<dyn Clock>().unwrap().now(), 1_700_000_000);
    /// ```
    pub fn add_singleton_trait<T>(&mut self, value: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let boxed: AnyArc = Arc::new(value);
        self.add(ServiceDescriptor::new(
            ServiceType::of::<Arc<T>>(),
            Lifetime::Singleton,
            Recipe::Value(boxed),
        ))
    }

    // ----- Factories -----

    /// Registers a singleton factory, run once on first request.
    ///
    /// ```rust
    /// # use callsite_di::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// struct Database { url: String }
    /// struct UserService { db: Arc<Database> }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Database { url: "postgres://localhost".to_string() });
    /// services.add_singleton_factory::<UserService, _>(|resolver| {
    ///     UserService {
    ///         db: resolver.get_required::<Database>()
    ///     }
    /// });
    ///
    /// let provider = services.build();
    /// let a = provider.get_required::<UserService>();
    /// let b = provider.create_scope().get_required::<UserService>();
    /// assert!(Arc::ptr_eq(&a, &b));
    /// ```
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, factory)
    }

    /// Registers a scoped factory: one instance per scope.
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Scoped, factory)
    }

    /// Registers a transient factory, run on every request.
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Transient, factory)
    }

    pub fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add_try_factory(lifetime, move |ctx: &ResolverContext<'_>| Ok(factory(ctx)))
    }

    /// Registers a fallible factory.
    ///
    /// A [`DiError`](crate::DiError) returned by the factory (typically from a
    /// nested resolution) propagates unchanged; any other error surfaces as
    /// [`DiError::Recipe`](crate::DiError::Recipe) carrying the original.
    ///
    /// ```rust
    /// # use callsite_di::{DiError, Lifetime, Resolver, ServiceCollection};
    /// #[derive(Debug)]
    /// struct Offline;
    /// impl std::fmt::Display for Offline {
    ///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    ///         f.write_str("offline")
    ///     }
    /// }
    /// impl std::error::Error for Offline {}
    ///
    /// #[derive(Debug)]
    /// struct Connection;
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_try_factory::<Connection, _>(Lifetime::Transient, |_| Err(Box::new(Offline)));
    ///
    /// let err = services.build().get::<Connection>().unwrap_err();
    /// assert_eq!(err.to_string(), "offline");
    /// assert!(err.downcast_recipe::<Offline>().is_some());
    /// ```
    pub fn add_try_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add_factory_with(lifetime, Vec::new(), move |ctx: &ResolverContext<'_>, _: &Arguments<'_>| {
            factory(ctx)
        })
    }

    /// Registers a factory with declared parameters; each parameter is
    /// resolved by type and parameter name before the factory runs.
    pub fn add_factory_with<T, F>(&mut self, lifetime: Lifetime, parameters: Vec<Parameter>, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>, &Arguments<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let factory = Factory::new::<T, _>(parameters, factory);
        self.add(ServiceDescriptor::new(
            ServiceType::of::<T>(),
            lifetime,
            Recipe::Factory(factory),
        ))
    }

    /// Registers a factory producing a trait object.
    pub fn add_trait_factory<Trait, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_factory::<Arc<Trait>, _>(lifetime, factory)
    }

    pub fn add_singleton_trait_factory<Trait, F>(&mut self, factory: F) -> &mut Self
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Singleton, factory)
    }

    pub fn add_scoped_trait_factory<Trait, F>(&mut self, factory: F) -> &mut Self
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Scoped, factory)
    }

    pub fn add_transient_trait_factory<Trait, F>(&mut self, factory: F) -> &mut Self
    where
        Trait: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<Trait> + Send + Sync + 'static,
    {
        self.add_trait_factory(Lifetime::Transient, factory)
    }

    // ----- Constructors -----

    /// Registers a constructor recipe.
    ///
    /// Unlike a factory, a constructor only sees its declared arguments, so
    /// its dependency graph is fully known and can be compiled.
    ///
    /// ```rust
    /// # use callsite_di::{Lifetime, Parameter, Resolver, ServiceCollection};
    /// # use std::sync::Arc;
    /// struct Pool { size: u32 }
    /// struct Repo { pool: Arc<Pool>, table: Arc<String> }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Pool { size: 8 });
    /// services.add_named_singleton("table", "users".to_string());
    /// services.add_constructor::<Repo, _>(
    ///     Lifetime::Scoped,
    ///     vec![Parameter::new::<Pool>("pool"), Parameter::new::<String>("table")],
    ///     |args| Ok(Repo { pool: args.get(0)?, table: args.get(1)? }),
    /// );
    ///
    /// let provider = services.build();
    /// let repo = provider.create_scope().get_required::<Repo>();
    /// assert_eq!(repo.pool.size, 8);
    /// assert_eq!(repo.table.as_str(), "users");
    /// ```
    pub fn add_constructor<T, F>(&mut self, lifetime: Lifetime, parameters: Vec<Parameter>, constructor: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let constructor = Constructor::new::<T, _>(parameters, constructor);
        self.add(ServiceDescriptor::new(
            ServiceType::of::<T>(),
            lifetime,
            Recipe::Constructor(constructor),
        ))
    }

    pub fn add_singleton_constructor<T, F>(&mut self, parameters: Vec<Parameter>, constructor: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add_constructor(Lifetime::Singleton, parameters, constructor)
    }

    pub fn add_scoped_constructor<T, F>(&mut self, parameters: Vec<Parameter>, constructor: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add_constructor(Lifetime::Scoped, parameters, constructor)
    }

    pub fn add_transient_constructor<T, F>(&mut self, parameters: Vec<Parameter>, constructor: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add_constructor(Lifetime::Transient, parameters, constructor)
    }

    /// Registers [`All<T>`]: every service registered for `T`, in
    /// registration order, each produced through its own lifetime.
    pub fn add_enumerable<T: Send + Sync + 'static>(&mut self, lifetime: Lifetime) -> &mut Self {
        self.add(ServiceDescriptor::new(
            ServiceType::of::<All<T>>(),
            lifetime,
            Recipe::Enumerable(Enumerable::of::<T>()),
        ))
    }

    // ----- Adjusting the last registration -----

    /// Gives the most recent registration a service name. An empty name
    /// clears it. No-op on an empty collection.
    ///
    /// ```rust
    /// # use callsite_di::{Resolver, ServiceCollection};
    /// let mut services = ServiceCollection::new();
    /// services.add_transient_factory::<String, _>(|_| "replica".to_string());
    /// services.assign_name_to_last("replica");
    ///
    /// let provider = services.build();
    /// assert_eq!(provider.get_named_required::<String>("replica").as_str(), "replica");
    /// ```
    pub fn assign_name_to_last(&mut self, name: &str) -> &mut Self {
        if let Some(last) = self.descriptors.last_mut() {
            last.set_name(name);
        }
        self
    }

    /// Disposes values of the most recent registration through [`Dispose`]
    /// when their owning scope or provider is disposed.
    pub fn dispose_last_with<T: Dispose>(&mut self) -> &mut Self {
        if let Some(last) = self.descriptors.last_mut() {
            last.set_disposer(Arc::new(|value: &AnyArc| {
                if let Some(service) = value.downcast_ref::<T>() {
                    service.dispose();
                }
            }));
        }
        self
    }

    // ----- Inspection -----

    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Adds an observer notified around every resolution.
    ///
    /// ```
    /// use callsite_di::{MetricsObserver, Resolver, ServiceCollection};
    /// use std::sync::Arc;
    ///
    /// let metrics = Arc::new(MetricsObserver::new());
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(1u8);
    /// services.add_observer(metrics.clone());
    ///
    /// let provider = services.build();
    /// provider.get_required::<u8>();
    /// assert_eq!(metrics.resolution_count(), 1);
    /// ```
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    // ----- Building -----

    /// Builds a provider over a sealed registry with default settings.
    ///
    /// # Examples
    ///
    /// ```
    /// use callsite_di::{ServiceCollection, Resolver};
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_singleton(42usize);
    /// collection.add_transient_factory::<String, _>(|_| "Hello".to_string());
    ///
    /// let provider = collection.build();
    /// assert_eq!(*provider.get_required::<usize>(), 42);
    /// assert_eq!(&*provider.get_required::<String>(), "Hello");
    /// ```
    pub fn build(self) -> ServiceProvider {
        self.into_provider(ProviderSettings::default(), false)
    }

    /// Builds a provider over a sealed registry.
    pub fn build_with(self, settings: ProviderSettings) -> DiResult<ServiceProvider> {
        settings.validate()?;
        Ok(self.into_provider(settings, false))
    }

    /// Builds a provider over concurrent indexes that also accepts
    /// [`ServiceProvider::add`] after build.
    pub fn build_concurrent(self) -> ServiceProvider {
        self.into_provider(ProviderSettings::default(), true)
    }

    pub fn build_concurrent_with(self, settings: ProviderSettings) -> DiResult<ServiceProvider> {
        settings.validate()?;
        Ok(self.into_provider(settings, true))
    }

    fn into_provider(self, settings: ProviderSettings, concurrent: bool) -> ServiceProvider {
        let Self { descriptors, mut observers } = self;
        if settings.enable_debug {
            observers.add(Arc::new(TracingObserver::new()));
        }
        let resolver: Box<dyn ServiceResolver> = if concurrent {
            Box::new(ConcurrentServiceResolver::new(descriptors, settings.name_comparison))
        } else {
            Box::new(StaticServiceResolver::new(descriptors, settings.name_comparison))
        };
        ServiceProvider::new(resolver, settings, observers)
    }
}

impl std::fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("descriptors", &self.descriptors)
            .field("observers", &self.observers.has_observers())
            .finish()
    }
}
