//! Internal disposal bag for managing cleanup hooks.

/// Disposal hooks executed in LIFO order.
#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<Box<dyn FnOnce() + Send>>,
}

impl DisposeBag {
    pub(crate) fn push(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.hooks.push(f);
    }

    /// Takes every hook out, most recent first.
    pub(crate) fn drain_reverse(&mut self) -> Vec<Box<dyn FnOnce() + Send>> {
        let mut hooks = std::mem::take(&mut self.hooks);
        hooks.reverse();
        hooks
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }
}
