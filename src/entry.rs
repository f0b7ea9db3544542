//! Per-key indexes over registered services and their tie-break rules.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::key::ServiceType;
use crate::request::{NameComparison, ResolveLevel, ResolveRequest};
use crate::service::Service;

/// Services registered under one type, or under one name.
///
/// Registration order is preserved and the most recent registration is the
/// default ("last write wins").
pub(crate) enum ServiceEntry {
    Typed(TypedServiceEntry),
    Named(NamedServiceEntry),
}

pub(crate) struct TypedServiceEntry {
    service_type: ServiceType,
    comparison: NameComparison,
    state: RwLock<TypedState>,
}

#[derive(Default)]
struct TypedState {
    all: Vec<Arc<Service>>,
    by_name: HashMap<String, Vec<Arc<Service>>>,
}

pub(crate) struct NamedServiceEntry {
    services: RwLock<Vec<Arc<Service>>>,
}

impl ServiceEntry {
    pub(crate) fn typed(service_type: ServiceType, comparison: NameComparison) -> Self {
        ServiceEntry::Typed(TypedServiceEntry {
            service_type,
            comparison,
            state: RwLock::new(TypedState::default()),
        })
    }

    pub(crate) fn named() -> Self {
        ServiceEntry::Named(NamedServiceEntry {
            services: RwLock::new(Vec::new()),
        })
    }

    pub(crate) fn add(&self, service: Arc<Service>) {
        match self {
            ServiceEntry::Typed(entry) => {
                debug_assert_eq!(entry.service_type, service.descriptor().service_type());
                let mut state = entry.state.write();
                if let Some(name) = service.descriptor().service_name() {
                    let key = entry.comparison.normalize(name).into_owned();
                    state.by_name.entry(key).or_default().push(service.clone());
                }
                state.all.push(service);
            }
            ServiceEntry::Named(entry) => entry.services.write().push(service),
        }
    }

    /// Picks the service answering `request` at `level`.
    ///
    /// * `TypeAndName`: an empty name takes the last registration of the type;
    ///   otherwise the last registration under exactly that name.
    /// * `Type`: the last registration of the type, name ignored.
    /// * `NameAndType`: the last registration under the name, any type.
    ///
    /// A level that does not apply to the entry kind yields nothing.
    pub(crate) fn resolve(&self, request: &ResolveRequest, level: ResolveLevel) -> Option<Arc<Service>> {
        match (self, level) {
            (ServiceEntry::Typed(entry), ResolveLevel::TypeAndName) => {
                let state = entry.state.read();
                if request.is_named() {
                    let key = entry.comparison.normalize(request.service_name());
                    state.by_name.get(key.as_ref()).and_then(|list| list.last()).cloned()
                } else {
                    state.all.last().cloned()
                }
            }
            (ServiceEntry::Typed(entry), ResolveLevel::Type) => entry.state.read().all.last().cloned(),
            (ServiceEntry::Named(entry), ResolveLevel::NameAndType) => entry.services.read().last().cloned(),
            _ => None,
        }
    }

    /// Every service of the entry in registration order.
    pub(crate) fn services(&self) -> Vec<Arc<Service>> {
        match self {
            ServiceEntry::Typed(entry) => entry.state.read().all.clone(),
            ServiceEntry::Named(entry) => entry.services.read().clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        match self {
            ServiceEntry::Typed(entry) => entry.state.read().all.len(),
            ServiceEntry::Named(entry) => entry.services.read().len(),
        }
    }
}
