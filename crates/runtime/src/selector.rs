use compute::BackendKind;

/// Current backend plus a pending switch request.
///
/// Cycling only visits kinds that were loaded at startup.
#[derive(Debug, Clone)]
pub struct BackendSelector {
    current: BackendKind,
    available: Vec<BackendKind>,
    pending: bool,
}

impl BackendSelector {
    #[must_use]
    pub fn new(current: BackendKind, available: Vec<BackendKind>) -> Self {
        Self {
            current,
            available,
            pending: false,
        }
    }

    #[must_use]
    pub fn current(&self) -> BackendKind {
        self.current
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Advances to the next available kind in round-robin order and requests
    /// a reset. Returns the new kind.
    pub fn cycle(&mut self) -> BackendKind {
        let mut next = self.current.next();
        while next != self.current && !self.available.contains(&next) {
            next = next.next();
        }
        self.current = next;
        self.pending = true;
        next
    }

    /// Consumes the pending request, returning the kind to switch to.
    pub fn take_pending(&mut self) -> Option<BackendKind> {
        std::mem::take(&mut self.pending).then_some(self.current)
    }
}
