//! Recipe invocation: declared parameters, resolved arguments and explicit
//! override arguments.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::descriptors::AnyArc;
use crate::error::{BoxError, DiError, DiResult};
use crate::key::ServiceType;
use crate::provider::ResolverContext;
use crate::request::ResolveRequest;
use crate::traits::ResolverCore;

pub(crate) type ArgumentValues = SmallVec<[Option<AnyArc>; 4]>;

type InvokeFn = dyn Fn(&Arguments<'_>) -> Result<AnyArc, BoxError> + Send + Sync;
type FactoryFn = dyn Fn(&ResolverContext<'_>, &Arguments<'_>) -> Result<AnyArc, BoxError> + Send + Sync;

/// A declared recipe parameter.
///
/// Each parameter is resolved as the request `(service_type, name)` across the
/// provider's resolve mode, so with the default mode an unnamed registration
/// of the parameter type satisfies it as well.
#[derive(Clone)]
pub struct Parameter {
    name: Arc<str>,
    service_type: ServiceType,
    required: bool,
}

impl Parameter {
    /// Required parameter of type `T`.
    pub fn new<T: ?Sized + 'static>(name: &str) -> Self {
        Self::of_type(ServiceType::of::<T>(), name, true)
    }

    /// Parameter of type `T` that may stay empty.
    pub fn optional<T: ?Sized + 'static>(name: &str) -> Self {
        Self::of_type(ServiceType::of::<T>(), name, false)
    }

    pub fn of_type(service_type: ServiceType, name: &str, required: bool) -> Self {
        Self {
            name: Arc::from(name),
            service_type,
            required,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn request(&self) -> ResolveRequest {
        ResolveRequest::new(self.service_type, Some(&self.name))
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &&*self.name)
            .field("service_type", &self.service_type.name())
            .field("required", &self.required)
            .finish()
    }
}

/// Argument values handed to a recipe, in parameter order.
pub struct Arguments<'a> {
    target: &'static str,
    parameters: &'a [Parameter],
    values: &'a [Option<AnyArc>],
}

impl<'a> Arguments<'a> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The raw value at `index`, `None` for an empty optional argument.
    pub fn raw(&self, index: usize) -> Option<&AnyArc> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// The argument at `index`; empty or out of range is `MissingParameter`.
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<T>> {
        self.optional::<T>(index)?.ok_or_else(|| self.missing(index))
    }

    /// The argument at `index`, or `None` when the optional slot is empty.
    pub fn optional<T: Send + Sync + 'static>(&self, index: usize) -> DiResult<Option<Arc<T>>> {
        match self.raw(index) {
            None => Ok(None),
            Some(value) => value
                .clone()
                .downcast::<T>()
                .map(Some)
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>())),
        }
    }

    /// Trait-object argument registered as `Arc<dyn Trait>`.
    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<T>> {
        self.get::<Arc<T>>(index).map(|boxed| (*boxed).clone())
    }

    /// The argument declared under `name`.
    pub fn get_by_name<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        let index = self
            .parameters
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| DiError::MissingParameter {
                target: self.target,
                parameter: name.to_string(),
            })?;
        self.get(index)
    }

    fn missing(&self, index: usize) -> DiError {
        let parameter = match self.parameters.get(index) {
            Some(p) => p.name().to_string(),
            None => format!("#{}", index),
        };
        DiError::MissingParameter {
            target: self.target,
            parameter,
        }
    }
}

/// Constructor recipe: declared parameters plus a function building `T` from
/// the resolved arguments.
///
/// # Examples
///
/// ```rust
/// use callsite_di::{Constructor, Parameter, Resolver, ServiceCollection, Lifetime};
/// use std::sync::Arc;
///
/// struct Greeting(String);
///
/// let mut services = ServiceCollection::new();
/// services.add_named_singleton("greeting", "hello".to_string());
/// services.add_transient_constructor::<Greeting, _>(
///     vec![Parameter::new::<String>("greeting")],
///     |args| Ok(Greeting(args.get::<String>(0)?.to_uppercase())),
/// );
///
/// let provider = services.build();
/// assert_eq!(provider.get_required::<Greeting>().0, "HELLO");
/// ```
#[derive(Clone)]
pub struct Constructor {
    target: ServiceType,
    parameters: Arc<[Parameter]>,
    invoke: Arc<InvokeFn>,
}

impl Constructor {
    pub fn new<T, F>(parameters: Vec<Parameter>, invoke: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            target: ServiceType::of::<T>(),
            parameters: parameters.into(),
            invoke: Arc::new(move |args: &Arguments<'_>| invoke(args).map(|value| Arc::new(value) as AnyArc)),
        }
    }

    /// The type the constructor produces.
    pub fn target(&self) -> ServiceType {
        self.target
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Runs the recipe; a failure is returned as the recipe's own error.
    pub(crate) fn call(&self, values: &[Option<AnyArc>]) -> DiResult<AnyArc> {
        let args = Arguments {
            target: self.target.name(),
            parameters: &self.parameters,
            values,
        };
        (self.invoke)(&args).map_err(DiError::from_recipe)
    }
}

/// Factory recipe: like a [`Constructor`], but the delegate also receives a
/// [`ResolverContext`] onto the acting provider or scope.
#[derive(Clone)]
pub struct Factory {
    target: ServiceType,
    parameters: Arc<[Parameter]>,
    invoke: Arc<FactoryFn>,
}

impl Factory {
    pub fn new<T, F>(parameters: Vec<Parameter>, invoke: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>, &Arguments<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            target: ServiceType::of::<T>(),
            parameters: parameters.into(),
            invoke: Arc::new(move |ctx: &ResolverContext<'_>, args: &Arguments<'_>| {
                invoke(ctx, args).map(|value| Arc::new(value) as AnyArc)
            }),
        }
    }

    pub fn target(&self) -> ServiceType {
        self.target
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub(crate) fn call(&self, ctx: &ResolverContext<'_>, values: &[Option<AnyArc>]) -> DiResult<AnyArc> {
        let args = Arguments {
            target: self.target.name(),
            parameters: &self.parameters,
            values,
        };
        (self.invoke)(ctx, &args).map_err(DiError::from_recipe)
    }
}

/// Explicit arguments that win over the registry, matched by parameter name.
///
/// ```rust
/// use callsite_di::{Constructor, OverrideArguments, Parameter, Resolver, ServiceCollection};
///
/// struct Client { key: String }
///
/// let ctor = Constructor::new::<Client, _>(vec![Parameter::new::<String>("key")], |args| {
///     Ok(Client { key: args.get::<String>(0)?.to_string() })
/// });
///
/// let provider = ServiceCollection::new().build();
/// let overrides = OverrideArguments::new().with("key", "24".to_string());
/// let client = provider.construct::<Client>(&ctor, &overrides).unwrap();
/// assert_eq!(client.key, "24");
/// ```
#[derive(Clone, Default)]
pub struct OverrideArguments {
    values: HashMap<String, AnyArc>,
}

impl OverrideArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_argument<T: Send + Sync + 'static>(&mut self, name: &str, value: T) -> &mut Self {
        self.add_raw(name, Arc::new(value))
    }

    pub fn add_raw(&mut self, name: &str, value: AnyArc) -> &mut Self {
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn with<T: Send + Sync + 'static>(mut self, name: &str, value: T) -> Self {
        self.add_argument(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&AnyArc> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for OverrideArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

fn bind_arguments(
    resolver: &dyn ResolverCore,
    target: &'static str,
    parameters: &[Parameter],
    overrides: &OverrideArguments,
) -> DiResult<ArgumentValues> {
    let mut values = ArgumentValues::with_capacity(parameters.len());
    for parameter in parameters {
        if let Some(value) = overrides.get(parameter.name()) {
            if Any::type_id(&**value) != parameter.service_type().id() {
                return Err(DiError::TypeMismatch(parameter.service_type().name()));
            }
            values.push(Some(value.clone()));
            continue;
        }
        let value = resolver.resolve(&parameter.request())?.into_value();
        if value.is_none() && parameter.is_required() {
            return Err(DiError::MissingParameter {
                target,
                parameter: parameter.name().to_string(),
            });
        }
        values.push(value);
    }
    Ok(values)
}

/// Invokes `constructor` outside the registry.
///
/// An override argument with a parameter's name is used as-is and the
/// registry is not consulted for that parameter; every other parameter is
/// resolved through `resolver`.
pub fn invoke_constructor(
    resolver: &dyn ResolverCore,
    constructor: &Constructor,
    overrides: &OverrideArguments,
) -> DiResult<AnyArc> {
    let values = bind_arguments(resolver, constructor.target().name(), constructor.parameters(), overrides)?;
    constructor.call(&values)
}

/// Factory counterpart of [`invoke_constructor`].
pub fn invoke_factory(
    resolver: &dyn ResolverCore,
    factory: &Factory,
    overrides: &OverrideArguments,
) -> DiResult<AnyArc> {
    let values = bind_arguments(resolver, factory.target().name(), factory.parameters(), overrides)?;
    factory.call(&ResolverContext::new(resolver), &values)
}
