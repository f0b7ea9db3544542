//! Call-site graph: how a service produces its value.
//!
//! A call site is built once per service by walking the recipe's declared
//! parameters through the resolver. Parameters that resolve to another
//! service become [`CallSite::Service`] edges, so each dependency keeps its
//! own lifetime store when the graph is evaluated.

pub(crate) mod compile;

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::descriptors::{AnyArc, Enumerable, Recipe};
use crate::error::{DiError, DiResult};
use crate::invoke::{ArgumentValues, Constructor, Factory, Parameter};
use crate::provider::{ProviderCore, ResolverContext};
use crate::service::Service;

pub(crate) enum CallSite {
    Value(AnyArc),
    Constructor {
        constructor: Constructor,
        arguments: Vec<Option<CallSite>>,
    },
    Factory {
        factory: Factory,
        arguments: Vec<Option<CallSite>>,
    },
    Enumerable {
        enumerable: Enumerable,
        elements: Vec<CallSite>,
    },
    Service(Arc<Service>),
}

impl CallSite {
    /// The value never depends on provider state.
    pub(crate) fn is_immutable(&self) -> bool {
        matches!(self, CallSite::Value(_))
    }

    /// Interprets the graph: arguments depth-first in parameter order, then
    /// the recipe.
    pub(crate) fn resolve_value(&self, provider: &dyn ProviderCore) -> DiResult<AnyArc> {
        match self {
            CallSite::Value(value) => Ok(value.clone()),
            CallSite::Constructor { constructor, arguments } => {
                let values = resolve_arguments(arguments, provider)?;
                constructor.call(&values)
            }
            CallSite::Factory { factory, arguments } => {
                let values = resolve_arguments(arguments, provider)?;
                factory.call(&ResolverContext::new(provider.as_resolver()), &values)
            }
            CallSite::Enumerable { enumerable, elements } => {
                let values = elements
                    .iter()
                    .map(|element| element.resolve_value(provider))
                    .collect::<DiResult<Vec<_>>>()?;
                enumerable.collect(values)
            }
            CallSite::Service(service) => service.resolve_dependency(provider),
        }
    }
}

fn resolve_arguments(
    arguments: &[Option<CallSite>],
    provider: &dyn ProviderCore,
) -> DiResult<ArgumentValues> {
    arguments
        .iter()
        .map(|argument| argument.as_ref().map(|site| site.resolve_value(provider)).transpose())
        .collect()
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSite::Value(_) => f.write_str("Value"),
            CallSite::Constructor { constructor, arguments } => f
                .debug_struct("Constructor")
                .field("target", &constructor.target().name())
                .field("arguments", arguments)
                .finish(),
            CallSite::Factory { factory, arguments } => f
                .debug_struct("Factory")
                .field("target", &factory.target().name())
                .field("arguments", arguments)
                .finish(),
            CallSite::Enumerable { enumerable, elements } => f
                .debug_struct("Enumerable")
                .field("element", &enumerable.element().name())
                .field("elements", elements)
                .finish(),
            CallSite::Service(service) => f.debug_tuple("Service").field(&service.display()).finish(),
        }
    }
}

/// Services whose call site is being built on the current path.
///
/// One chain lives for one top-level accessor build; it is never shared
/// between unrelated resolutions.
#[derive(Default)]
pub(crate) struct ResolutionChain {
    entries: SmallVec<[(usize, Arc<str>); 8]>,
}

impl ResolutionChain {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn enter(&mut self, service: &Service) -> DiResult<()> {
        if self.entries.iter().any(|(id, _)| *id == service.id()) {
            let mut path: Vec<String> = self.entries.iter().map(|(_, name)| name.to_string()).collect();
            path.push(service.display().to_string());
            return Err(DiError::Circular(path));
        }
        self.entries.push((service.id(), service.display().clone()));
        Ok(())
    }

    fn exit(&mut self, service: &Service) {
        if let Some(pos) = self.entries.iter().rposition(|(id, _)| *id == service.id()) {
            self.entries.remove(pos);
        }
    }

    /// Runs `f` with `service` entered; it leaves the chain on success and
    /// on failure alike.
    pub(crate) fn scoped<T, F>(&mut self, service: &Service, f: F) -> DiResult<T>
    where
        F: FnOnce(&mut Self) -> DiResult<T>,
    {
        self.enter(service)?;
        let result = f(self);
        self.exit(service);
        result
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Recipe {
    /// Builds the call site for this recipe, resolving declared parameters
    /// through the provider's resolve mode.
    pub(crate) fn produce_call_site(
        &self,
        provider: &dyn ProviderCore,
        chain: &mut ResolutionChain,
    ) -> DiResult<CallSite> {
        match self {
            Recipe::Value(value) => Ok(CallSite::Value(value.clone())),
            Recipe::Constructor(constructor) => Ok(CallSite::Constructor {
                arguments: parameter_call_sites(
                    constructor.target().name(),
                    constructor.parameters(),
                    provider,
                    chain,
                )?,
                constructor: constructor.clone(),
            }),
            Recipe::Factory(factory) => Ok(CallSite::Factory {
                arguments: parameter_call_sites(factory.target().name(), factory.parameters(), provider, chain)?,
                factory: factory.clone(),
            }),
            Recipe::Enumerable(enumerable) => {
                let services = provider.root().resolver().services_of(enumerable.element())?;
                let mut elements = Vec::with_capacity(services.len());
                for service in services {
                    service.get_call_site(provider, chain)?;
                    elements.push(CallSite::Service(service));
                }
                Ok(CallSite::Enumerable {
                    enumerable: enumerable.clone(),
                    elements,
                })
            }
        }
    }
}

fn parameter_call_sites(
    target: &'static str,
    parameters: &[Parameter],
    provider: &dyn ProviderCore,
    chain: &mut ResolutionChain,
) -> DiResult<Vec<Option<CallSite>>> {
    let root = provider.root();
    let mut arguments = Vec::with_capacity(parameters.len());
    for parameter in parameters {
        let request = parameter.request();
        let mut found = None;
        for level in root.settings().resolve_mode.iter().copied() {
            if let Some(site) = root.resolver().resolve_call_site(provider, level, &request, chain)? {
                found = Some(site);
                break;
            }
        }
        if found.is_none() && parameter.is_required() {
            return Err(DiError::MissingParameter {
                target,
                parameter: parameter.name().to_string(),
            });
        }
        arguments.push(found);
    }
    Ok(arguments)
}
