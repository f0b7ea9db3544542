//! Registry ownership and lookup policy.
//!
//! A resolver indexes services by type and, independently, by name. Two
//! strategies share the same semantics: [`StaticServiceResolver`] is built
//! once and sealed, [`ConcurrentServiceResolver`] sits on concurrent maps and
//! accepts additive registration after build.

mod concurrent;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::callsite::{CallSite, ResolutionChain};
use crate::descriptors::ServiceDescriptor;
use crate::entry::ServiceEntry;
use crate::error::{DiError, DiResult};
use crate::key::ServiceType;
use crate::lifetime::Lifetime;
use crate::provider::ProviderCore;
use crate::request::{NameComparison, ResolveLevel, ResolveRequest, ResolveResult};
use crate::service::Service;

pub(crate) use concurrent::ConcurrentServiceResolver;

#[cfg(feature = "ahash")]
pub(crate) type FastMap<K, V> = ahash::AHashMap<K, V>;
#[cfg(not(feature = "ahash"))]
pub(crate) type FastMap<K, V> = std::collections::HashMap<K, V>;

pub(crate) trait ServiceResolver: Send + Sync {
    /// The entry indexing `request` at `level`: by type for `Type` and
    /// `TypeAndName`, by non-empty name for `NameAndType`.
    fn resolve_entry(&self, request: &ResolveRequest, level: ResolveLevel) -> DiResult<Option<Arc<ServiceEntry>>>;

    /// Every service registered for `service_type`, in registration order.
    fn services_of(&self, service_type: ServiceType) -> DiResult<Vec<Arc<Service>>>;

    /// Every service, in registration order.
    fn services(&self) -> Vec<Arc<Service>>;

    fn add(&self, descriptor: ServiceDescriptor) -> DiResult<()>;

    /// Disposes every owned service, newest first, and clears the indexes.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;

    fn resolve_service(&self, request: &ResolveRequest, level: ResolveLevel) -> DiResult<Option<Arc<Service>>> {
        Ok(self
            .resolve_entry(request, level)?
            .and_then(|entry| entry.resolve(request, level)))
    }

    /// Resolves `request` at one level. Singletons are always materialized
    /// against the root provider.
    fn resolve_value(
        &self,
        provider: &dyn ProviderCore,
        level: ResolveLevel,
        request: &ResolveRequest,
    ) -> DiResult<ResolveResult> {
        match self.resolve_service(request, level)? {
            None => Ok(ResolveResult::none()),
            Some(service) => {
                let value = match service.lifetime() {
                    Lifetime::Singleton => service.get_value(provider.root())?,
                    _ => service.get_value(provider)?,
                };
                Ok(ResolveResult::some(value))
            }
        }
    }

    /// Dependency edge for `request` at one level, checking the chain.
    fn resolve_call_site(
        &self,
        provider: &dyn ProviderCore,
        level: ResolveLevel,
        request: &ResolveRequest,
        chain: &mut ResolutionChain,
    ) -> DiResult<Option<CallSite>> {
        let Some(service) = self.resolve_service(request, level)? else {
            return Ok(None);
        };
        service.get_call_site(provider, chain)?;
        Ok(Some(match service.constant_value() {
            Some(value) => CallSite::Value(value),
            None => CallSite::Service(service),
        }))
    }
}

/// Tries each level of `mode` in order until one yields a value.
pub(crate) fn resolve_with_mode(
    resolver: &dyn ServiceResolver,
    provider: &dyn ProviderCore,
    mode: &[ResolveLevel],
    request: &ResolveRequest,
) -> DiResult<ResolveResult> {
    for level in mode.iter().copied() {
        let result = resolver.resolve_value(provider, level, request)?;
        if result.has_value() {
            return Ok(result);
        }
    }
    Ok(ResolveResult::none())
}

/// Type and name indexes built from a flat descriptor list.
#[derive(Default)]
struct Registry {
    typed: FastMap<ServiceType, Arc<ServiceEntry>>,
    named: FastMap<String, Arc<ServiceEntry>>,
    services: Vec<Arc<Service>>,
}

impl Registry {
    fn build(descriptors: Vec<ServiceDescriptor>, comparison: NameComparison) -> Self {
        let mut registry = Registry::default();
        for (id, descriptor) in descriptors.into_iter().enumerate() {
            let service = Service::new(id, descriptor);
            let service_type = service.descriptor().service_type();
            registry
                .typed
                .entry(service_type)
                .or_insert_with(|| Arc::new(ServiceEntry::typed(service_type, comparison)))
                .add(service.clone());
            if let Some(name) = service.descriptor().service_name() {
                registry
                    .named
                    .entry(comparison.normalize(name).into_owned())
                    .or_insert_with(|| Arc::new(ServiceEntry::named()))
                    .add(service.clone());
            }
            registry.services.push(service);
        }
        registry
    }
}

/// Resolver over indexes built once; registration is sealed after build.
pub(crate) struct StaticServiceResolver {
    registry: RwLock<Registry>,
    comparison: NameComparison,
    disposed: AtomicBool,
}

impl StaticServiceResolver {
    pub(crate) fn new(descriptors: Vec<ServiceDescriptor>, comparison: NameComparison) -> Self {
        Self {
            registry: RwLock::new(Registry::build(descriptors, comparison)),
            comparison,
            disposed: AtomicBool::new(false),
        }
    }

    fn check_live(&self) -> DiResult<()> {
        if self.is_disposed() {
            Err(DiError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl ServiceResolver for StaticServiceResolver {
    fn resolve_entry(&self, request: &ResolveRequest, level: ResolveLevel) -> DiResult<Option<Arc<ServiceEntry>>> {
        self.check_live()?;
        let registry = self.registry.read();
        Ok(match level {
            ResolveLevel::Type | ResolveLevel::TypeAndName => registry.typed.get(&request.service_type()).cloned(),
            ResolveLevel::NameAndType if request.is_named() => registry
                .named
                .get(self.comparison.normalize(request.service_name()).as_ref())
                .cloned(),
            ResolveLevel::NameAndType => None,
        })
    }

    fn services_of(&self, service_type: ServiceType) -> DiResult<Vec<Arc<Service>>> {
        self.check_live()?;
        Ok(self
            .registry
            .read()
            .typed
            .get(&service_type)
            .map(|entry| entry.services())
            .unwrap_or_default())
    }

    fn services(&self) -> Vec<Arc<Service>> {
        self.registry.read().services.clone()
    }

    fn add(&self, _descriptor: ServiceDescriptor) -> DiResult<()> {
        self.check_live()?;
        Err(DiError::RegistrySealed)
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let registry = std::mem::take(&mut *self.registry.write());
        debug!(services = registry.services.len(), "disposing resolver");
        for service in registry.services.iter().rev() {
            service.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
