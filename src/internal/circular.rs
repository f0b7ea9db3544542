//! Runtime re-entry detection for value production.
//!
//! The call-site chain catches cycles between declared parameters while the
//! graph is built. Factory delegates resolve through the provider at run time,
//! so a cycle closed by a delegate only shows up here, on the thread-local
//! stack of services currently producing a value.

use std::cell::RefCell;
use std::sync::Arc;

use crate::error::{DiError, DiResult};

pub(crate) const MAX_DEPTH: usize = 1024;

// Thread-local resolution state for circular dependency detection
thread_local! {
    static RESOLUTION_TLS: RefCell<ResolutionTls> = RefCell::new(ResolutionTls::default());
}

#[derive(Default)]
struct ResolutionTls {
    stack: Vec<(usize, Arc<str>)>,
}

/// Pops its frame on drop, including on unwind.
struct StackGuard {
    id: usize,
}

impl StackGuard {
    fn enter(id: usize, name: &Arc<str>) -> DiResult<Self> {
        RESOLUTION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();

            if tls.stack.iter().any(|(entered, _)| *entered == id) {
                let mut path: Vec<String> = tls.stack.iter().map(|(_, n)| n.to_string()).collect();
                path.push(name.to_string());
                return Err(DiError::Circular(path));
            }

            if tls.stack.len() >= MAX_DEPTH {
                return Err(DiError::DepthExceeded(MAX_DEPTH));
            }

            tls.stack.push((id, name.clone()));
            Ok(Self { id })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();
            if let Some((last, _)) = tls.stack.pop() {
                debug_assert_eq!(last, self.id);
            }
        });
    }
}

/// Runs `f` with `id` pushed on the current thread's resolution stack.
///
/// `id` must be unique among live services of every provider, since a factory
/// may resolve from an unrelated provider on the same thread.
pub(crate) fn with_resolution_guard<T, F>(id: usize, name: &Arc<str>, f: F) -> DiResult<T>
where
    F: FnOnce() -> DiResult<T>,
{
    let _guard = StackGuard::enter(id, name)?;
    f()
}
