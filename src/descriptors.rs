//! Service descriptors and construction recipes.

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::invoke::{Constructor, Factory};
use crate::key::ServiceType;
use crate::lifetime::Lifetime;

/// Type-erased produced value.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Disposal hook invoked with a cached value when its owner is disposed.
pub type Disposer = Arc<dyn Fn(&AnyArc) + Send + Sync>;

type CollectFn = dyn Fn(Vec<AnyArc>) -> DiResult<AnyArc> + Send + Sync;

/// How a service produces its value.
///
/// Each variant is turned into a call site when the service is first
/// resolved; see [`Recipe::is_directly_resolvable`].
#[derive(Clone)]
pub enum Recipe {
    /// A constant registered instance
    Value(AnyArc),
    /// A constructor with declared parameters resolved from the provider
    Constructor(Constructor),
    /// A factory delegate; receives a resolver context besides its parameters
    Factory(Factory),
    /// Every service registered for an element type, in registration order
    Enumerable(Enumerable),
}

impl Recipe {
    /// Whether the recipe already is its value and needs no dependency graph.
    pub fn is_directly_resolvable(&self) -> bool {
        matches!(self, Recipe::Value(_))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Recipe::Value(_) => "value",
            Recipe::Constructor(_) => "constructor",
            Recipe::Factory(_) => "factory",
            Recipe::Enumerable(_) => "enumerable",
        }
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipe::Value(_) => f.write_str("Value"),
            Recipe::Constructor(c) => f.debug_tuple("Constructor").field(&c.target().name()).finish(),
            Recipe::Factory(c) => f.debug_tuple("Factory").field(&c.target().name()).finish(),
            Recipe::Enumerable(e) => f.debug_tuple("Enumerable").field(&e.element().name()).finish(),
        }
    }
}

/// Collects the values of every service registered for an element type.
#[derive(Clone)]
pub struct Enumerable {
    element: ServiceType,
    collect: Arc<CollectFn>,
}

impl Enumerable {
    /// Enumerable over `T`, producing an [`All<T>`].
    pub fn of<T: Send + Sync + 'static>() -> Self {
        Self {
            element: ServiceType::of::<T>(),
            collect: Arc::new(|values: Vec<AnyArc>| {
                let items = values
                    .into_iter()
                    .map(|value| {
                        value
                            .downcast::<T>()
                            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
                    })
                    .collect::<DiResult<Vec<_>>>()?;
                Ok(Arc::new(All(items)) as AnyArc)
            }),
        }
    }

    pub fn element(&self) -> ServiceType {
        self.element
    }

    pub(crate) fn collect(&self, values: Vec<AnyArc>) -> DiResult<AnyArc> {
        (self.collect)(values)
    }
}

/// Every registered `T`, in registration order.
///
/// ```rust
/// use callsite_di::{All, Lifetime, Resolver, ServiceCollection};
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(1u8);
/// services.add_singleton(2u8);
/// services.add_enumerable::<u8>(Lifetime::Transient);
///
/// let provider = services.build();
/// let all = provider.get_required::<All<u8>>();
/// assert_eq!(all.iter().map(|v| **v).collect::<Vec<_>>(), vec![1, 2]);
/// ```
pub struct All<T>(pub Vec<Arc<T>>);

impl<T> All<T> {
    pub fn into_inner(self) -> Vec<Arc<T>> {
        self.0
    }
}

impl<T> Deref for All<T> {
    type Target = [Arc<T>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> fmt::Debug for All<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "All<{}>({})", std::any::type_name::<T>(), self.0.len())
    }
}

/// Immutable registration record.
///
/// A descriptor names the service type, an optional service name, the
/// lifetime and the recipe that produces the value. Descriptors are owned by
/// the registry for the lifetime of the root provider.
///
/// # Examples
///
/// ```rust
/// use callsite_di::{Lifetime, Recipe, ServiceCollection, ServiceDescriptor, ServiceType};
/// use std::sync::Arc;
///
/// let descriptor = ServiceDescriptor::new(
///     ServiceType::of::<u16>(),
///     Lifetime::Singleton,
///     Recipe::Value(Arc::new(5432u16)),
/// )
/// .with_name("port");
///
/// assert_eq!(descriptor.service_name(), Some("port"));
/// assert!(descriptor.is_directly_resolvable());
///
/// let mut services = ServiceCollection::new();
/// services.add(descriptor);
/// services.add_singleton(42u32);
///
/// let unnamed = services.descriptors().iter().find(|d| !d.is_named()).unwrap();
/// assert_eq!(unnamed.type_name(), "u32");
/// assert_eq!(unnamed.lifetime(), Lifetime::Singleton);
/// ```
#[derive(Clone)]
pub struct ServiceDescriptor {
    service_type: ServiceType,
    service_name: Option<Arc<str>>,
    lifetime: Lifetime,
    recipe: Recipe,
    disposer: Option<Disposer>,
}

impl ServiceDescriptor {
    pub fn new(service_type: ServiceType, lifetime: Lifetime, recipe: Recipe) -> Self {
        Self {
            service_type,
            service_name: None,
            lifetime,
            recipe,
            disposer: None,
        }
    }

    /// Constant instance of `T`.
    pub fn value<T: Send + Sync + 'static>(lifetime: Lifetime, value: T) -> Self {
        Self::new(ServiceType::of::<T>(), lifetime, Recipe::Value(Arc::new(value)))
    }

    /// Registers the service under `name`; the empty name means unnamed.
    pub fn with_name(mut self, name: &str) -> Self {
        self.set_name(name);
        self
    }

    /// Hook run on the cached value when its store is disposed.
    pub fn with_disposer(mut self, disposer: Disposer) -> Self {
        self.disposer = Some(disposer);
        self
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.service_name = if name.is_empty() { None } else { Some(Arc::from(name)) };
    }

    pub(crate) fn set_disposer(&mut self, disposer: Disposer) {
        self.disposer = Some(disposer);
    }

    #[inline]
    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    pub fn is_named(&self) -> bool {
        self.service_name.is_some()
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn disposer(&self) -> Option<&Disposer> {
        self.disposer.as_ref()
    }

    pub fn type_name(&self) -> &'static str {
        self.service_type.name()
    }

    pub fn is_directly_resolvable(&self) -> bool {
        self.recipe.is_directly_resolvable()
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("service_type", &self.service_type.name())
            .field("service_name", &self.service_name())
            .field("lifetime", &self.lifetime)
            .field("recipe", &self.recipe)
            .field("disposable", &self.disposer.is_some())
            .finish()
    }
}
