//! Value stores backing each lifetime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::descriptors::{AnyArc, Disposer};
use crate::error::{DiError, DiResult};
use crate::internal::DisposeBag;
use crate::lifetime::Lifetime;

/// Where a service keeps its produced value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueStore {
    /// In the service itself, shared by every scope
    Service,
    /// In the acting provider or scope
    Scope,
    /// Nowhere; every resolution produces a fresh value
    None,
}

impl ValueStore {
    pub(crate) fn for_lifetime(lifetime: Lifetime) -> Self {
        match lifetime {
            Lifetime::Singleton => ValueStore::Service,
            Lifetime::Scoped => ValueStore::Scope,
            Lifetime::Transient => ValueStore::None,
        }
    }
}

/// Create-once slot.
///
/// The lock is held while the value is produced, so concurrent first callers
/// construct it once and late arrivals wait for the result.
#[derive(Default)]
pub(crate) struct ValueCell {
    slot: Mutex<Option<AnyArc>>,
}

impl ValueCell {
    /// Returns the cached value, producing it first if needed; the flag tells
    /// whether this call created it.
    pub(crate) fn get_or_create<F>(&self, create: F) -> DiResult<(AnyArc, bool)>
    where
        F: FnOnce() -> DiResult<AnyArc>,
    {
        let mut slot = self.slot.lock();
        if let Some(value) = slot.as_ref() {
            return Ok((value.clone(), false));
        }
        let value = create()?;
        *slot = Some(value.clone());
        Ok((value, true))
    }

    pub(crate) fn peek(&self) -> Option<AnyArc> {
        self.slot.lock().clone()
    }

    pub(crate) fn take(&self) -> Option<AnyArc> {
        self.slot.lock().take()
    }
}

/// Per-scope storage for scoped values and their disposal hooks.
///
/// The root provider owns one of these too, acting as its own scope.
#[derive(Default)]
pub(crate) struct ScopeStore {
    cells: Mutex<HashMap<usize, Arc<ValueCell>>>,
    disposers: Mutex<DisposeBag>,
    disposed: AtomicBool,
}

impl ScopeStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The value cached for `service_id`, produced through `create` on first
    /// access. A created value with a disposer is queued for disposal.
    pub(crate) fn get_or_create<F>(
        &self,
        service_id: usize,
        disposer: Option<&Disposer>,
        create: F,
    ) -> DiResult<AnyArc>
    where
        F: FnOnce() -> DiResult<AnyArc>,
    {
        let cell = {
            let mut cells = self.cells.lock();
            if self.is_disposed() {
                return Err(DiError::Disposed);
            }
            cells.entry(service_id).or_default().clone()
        };

        let (value, created) = cell.get_or_create(create)?;
        if created {
            if let Some(disposer) = disposer {
                let disposer = disposer.clone();
                let disposed = value.clone();
                self.push_disposer(Box::new(move || disposer(&disposed)));
            }
        }
        Ok(value)
    }

    /// Queues a hook; runs it right away if the store is already disposed.
    pub(crate) fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>) {
        {
            let mut bag = self.disposers.lock();
            if !self.is_disposed() {
                bag.push(hook);
                return;
            }
        }
        hook();
    }

    pub(crate) fn has_value(&self, service_id: usize) -> bool {
        let cell = self.cells.lock().get(&service_id).cloned();
        cell.map_or(false, |cell| cell.peek().is_some())
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.lock().len()
    }

    /// Runs queued hooks in reverse creation order and drops every cached
    /// value. Idempotent.
    pub(crate) fn dispose(&self) {
        let hooks = {
            let mut bag = self.disposers.lock();
            if self.disposed.swap(true, Ordering::AcqRel) {
                return;
            }
            bag.drain_reverse()
        };
        for hook in hooks {
            hook();
        }
        self.cells.lock().clear();
    }

    #[inline]
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
