//! Live wrapper around one registered descriptor.
//!
//! A service owns its call site, its accessor and (for singletons) its value.
//! The accessor is built on first use. Services with an immutable call site
//! get a direct accessor; every other service gets a counting accessor that
//! interprets the call-site graph and, on the call that reaches the compile
//! threshold, schedules compilation on the rayon pool. The compiled accessor
//! is published once and preferred from then on.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::callsite::compile::{compile, Accessor};
use crate::callsite::{CallSite, ResolutionChain};
use crate::descriptors::{AnyArc, ServiceDescriptor};
use crate::error::DiResult;
use crate::internal::with_resolution_guard;
use crate::lifetime::Lifetime;
use crate::observer::Observers;
use crate::provider::ProviderCore;
use crate::store::{ValueCell, ValueStore};

/// Snapshot of a service's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceState {
    pub lifetime: Lifetime,
    /// Calls made through the counting accessor
    pub call_count: usize,
    /// Whether the compiled accessor has been published
    pub compiled: bool,
    /// Whether a value is cached for the inspected provider
    pub has_cached_value: bool,
}

pub(crate) struct Service {
    id: usize,
    descriptor: ServiceDescriptor,
    display: Arc<str>,
    call_site: OnceCell<Arc<CallSite>>,
    accessor: OnceCell<Accessor>,
    compiled: OnceCell<Accessor>,
    call_count: AtomicUsize,
    value: ValueCell,
}

impl Service {
    pub(crate) fn new(id: usize, descriptor: ServiceDescriptor) -> Arc<Self> {
        let display: Arc<str> = match descriptor.service_name() {
            Some(name) => Arc::from(format!("{} ({})", descriptor.type_name(), name)),
            None => Arc::from(descriptor.type_name()),
        };
        Arc::new(Self {
            id,
            descriptor,
            display,
            call_site: OnceCell::new(),
            accessor: OnceCell::new(),
            compiled: OnceCell::new(),
            call_count: AtomicUsize::new(0),
            value: ValueCell::default(),
        })
    }

    /// Index of the service within its resolver.
    #[inline]
    pub(crate) fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub(crate) fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    #[inline]
    pub(crate) fn lifetime(&self) -> Lifetime {
        self.descriptor.lifetime()
    }

    pub(crate) fn display(&self) -> &Arc<str> {
        &self.display
    }

    // Unique across providers while the service is alive.
    fn guard_id(&self) -> usize {
        self as *const Self as usize
    }

    /// The call-site graph, built on first use with `self` entered in `chain`.
    ///
    /// The graph is built outside any lock; concurrent builders race and the
    /// first one to publish wins.
    pub(crate) fn get_call_site(
        self: &Arc<Self>,
        provider: &dyn ProviderCore,
        chain: &mut ResolutionChain,
    ) -> DiResult<Arc<CallSite>> {
        chain.scoped(self, |chain| {
            if let Some(call_site) = self.call_site.get() {
                return Ok(call_site.clone());
            }
            let call_site = self.descriptor.recipe().produce_call_site(provider, chain)?;
            Ok(self.call_site.get_or_init(|| Arc::new(call_site)).clone())
        })
    }

    fn accessor(self: &Arc<Self>, provider: &dyn ProviderCore) -> DiResult<Accessor> {
        if let Some(compiled) = self.compiled.get() {
            return Ok(compiled.clone());
        }
        if let Some(accessor) = self.accessor.get() {
            return Ok(accessor.clone());
        }

        let mut chain = ResolutionChain::new();
        let call_site = self.get_call_site(provider, &mut chain)?;
        let accessor = self.create_accessor(call_site);
        Ok(self.accessor.get_or_init(|| accessor).clone())
    }

    fn create_accessor(self: &Arc<Self>, call_site: Arc<CallSite>) -> Accessor {
        if call_site.is_immutable() {
            debug!(service = %self.display, "direct accessor");
            return compile(&call_site);
        }

        debug!(service = %self.display, kind = self.descriptor.recipe().kind(), "counting accessor");
        let service: Weak<Service> = Arc::downgrade(self);
        Arc::new(move |provider: &dyn ProviderCore| {
            if let Some(service) = service.upgrade() {
                service.record_call(provider, &call_site);
            }
            call_site.resolve_value(provider)
        })
    }

    fn record_call(self: &Arc<Self>, provider: &dyn ProviderCore, call_site: &Arc<CallSite>) {
        let count = self.call_count.fetch_add(1, Ordering::AcqRel) + 1;
        if Some(count) == provider.root().settings().compile_threshold() {
            self.schedule_compile(call_site.clone(), provider.root().observers().clone());
        }
    }

    fn schedule_compile(self: &Arc<Self>, call_site: Arc<CallSite>, observers: Observers) {
        debug!(service = %self.display, "scheduling compilation");
        let service = Arc::downgrade(self);
        rayon::spawn(move || {
            let Some(service) = service.upgrade() else {
                return;
            };
            if service.compiled.set(compile(&call_site)).is_ok() {
                debug!(service = %service.display, "compiled accessor published");
                observers.compiled(&service.display);
            }
        });
    }

    /// Materializes the value through the store matching the lifetime.
    pub(crate) fn get_value(self: &Arc<Self>, provider: &dyn ProviderCore) -> DiResult<AnyArc> {
        with_resolution_guard(self.guard_id(), &self.display, || {
            let accessor = self.accessor(provider)?;
            match ValueStore::for_lifetime(self.lifetime()) {
                ValueStore::Service => self.value.get_or_create(|| accessor(provider)).map(|(value, _)| value),
                ValueStore::Scope => {
                    provider
                        .store()
                        .get_or_create(self.id, self.descriptor.disposer(), || accessor(provider))
                }
                ValueStore::None => accessor(provider),
            }
        })
    }

    /// Evaluates this service as a dependency: singletons against the root.
    pub(crate) fn resolve_dependency(self: &Arc<Self>, provider: &dyn ProviderCore) -> DiResult<AnyArc> {
        match self.lifetime() {
            Lifetime::Singleton => self.get_value(provider.root()),
            _ => self.get_value(provider),
        }
    }

    /// Value to inline into a dependent's call site, if the dependency is a
    /// plain constant with nothing to dispose.
    pub(crate) fn constant_value(&self) -> Option<AnyArc> {
        match self.call_site.get().map(|site| &**site) {
            Some(CallSite::Value(value)) if self.descriptor.disposer().is_none() => Some(value.clone()),
            _ => None,
        }
    }

    pub(crate) fn state(&self, provider: &dyn ProviderCore) -> ServiceState {
        let has_cached_value = match ValueStore::for_lifetime(self.lifetime()) {
            ValueStore::Service => self.value.peek().is_some(),
            ValueStore::Scope => provider.store().has_value(self.id),
            ValueStore::None => false,
        };
        ServiceState {
            lifetime: self.lifetime(),
            call_count: self.call_count.load(Ordering::Acquire),
            compiled: self.compiled.get().is_some(),
            has_cached_value,
        }
    }

    /// Drops the cached singleton value, running its disposer.
    pub(crate) fn dispose(&self) {
        if let Some(value) = self.value.take() {
            debug!(service = %self.display, "disposing singleton");
            if let Some(disposer) = self.descriptor.disposer() {
                disposer(&value);
            }
        }
    }
}
