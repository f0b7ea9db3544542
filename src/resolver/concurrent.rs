//! Resolver backed by concurrent maps, open for additive registration.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::descriptors::ServiceDescriptor;
use crate::entry::ServiceEntry;
use crate::error::{DiError, DiResult};
use crate::key::ServiceType;
use crate::request::{NameComparison, ResolveLevel, ResolveRequest};
use crate::service::Service;

use super::ServiceResolver;

/// Same lookup semantics as the static resolver, without a global lock.
///
/// Services added after build are visible to later lookups. Call sites that
/// were already built keep the dependencies they bound.
pub(crate) struct ConcurrentServiceResolver {
    typed: DashMap<ServiceType, Arc<ServiceEntry>>,
    named: DashMap<String, Arc<ServiceEntry>>,
    services: Mutex<Vec<Arc<Service>>>,
    next_id: AtomicUsize,
    comparison: NameComparison,
    disposed: AtomicBool,
}

impl ConcurrentServiceResolver {
    pub(crate) fn new(descriptors: Vec<ServiceDescriptor>, comparison: NameComparison) -> Self {
        let resolver = Self {
            typed: DashMap::new(),
            named: DashMap::new(),
            services: Mutex::new(Vec::with_capacity(descriptors.len())),
            next_id: AtomicUsize::new(0),
            comparison,
            disposed: AtomicBool::new(false),
        };
        for descriptor in descriptors {
            resolver.insert(descriptor);
        }
        resolver
    }

    fn insert(&self, descriptor: ServiceDescriptor) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let service = Service::new(id, descriptor);
        let service_type = service.descriptor().service_type();

        self.services.lock().push(service.clone());

        // Shard lock released before the entry lock.
        let typed = self
            .typed
            .entry(service_type)
            .or_insert_with(|| Arc::new(ServiceEntry::typed(service_type, self.comparison)))
            .clone();
        typed.add(service.clone());

        if let Some(name) = service.descriptor().service_name() {
            let named = self
                .named
                .entry(self.comparison.normalize(name).into_owned())
                .or_insert_with(|| Arc::new(ServiceEntry::named()))
                .clone();
            named.add(service);
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

impl ServiceResolver for ConcurrentServiceResolver {
    fn resolve_entry(&self, request: &ResolveRequest, level: ResolveLevel) -> DiResult<Option<Arc<ServiceEntry>>> {
        self.check_live()?;
        Ok(match level {
            ResolveLevel::Type | ResolveLevel::TypeAndName => {
                self.typed.get(&request.service_type()).map(|entry| entry.value().clone())
            }
            ResolveLevel::NameAndType if request.is_named() => self
                .named
                .get(self.comparison.normalize(request.service_name()).as_ref())
                .map(|entry| entry.value().clone()),
            ResolveLevel::NameAndType => None,
        })
    }

    fn services_of(&self, service_type: ServiceType) -> DiResult<Vec<Arc<Service>>> {
        self.check_live()?;
        let entry = self.typed.get(&service_type).map(|entry| entry.value().clone());
        Ok(entry.map(|entry| entry.services()).unwrap_or_default())
    }

    fn services(&self) -> Vec<Arc<Service>> {
        self.services.lock().clone()
    }

    fn add(&self, descriptor: ServiceDescriptor) -> DiResult<()> {
        self.check_live()?;
        debug!(service = descriptor.type_name(), name = ?descriptor.service_name(), "adding service");
        self.insert(descriptor);
        Ok(())
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let services = std::mem::take(&mut *self.services.lock());
        self.typed.clear();
        self.named.clear();
        debug!(services = services.len(), "disposing concurrent resolver");
        for service in services.iter().rev() {
            service.dispose();
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
