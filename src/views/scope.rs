use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

/// Identity of one view instance. Results of requests started under a
/// ticket are only accepted while the view is open and no newer load has
/// been started.
#[derive(Debug, Clone)]
pub struct ViewScope {
    inner: Arc<ScopeState>,
}

#[derive(Debug)]
struct ScopeState {
    id: Uuid,
    generation: AtomicU64,
    closed: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    view: Uuid,
    generation: u64,
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewScope {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ScopeState {
                id: Uuid::new_v4(),
                generation: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Start a load. Tickets issued earlier become stale.
    pub fn ticket(&self) -> Ticket {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket { view: self.inner.id, generation }
    }

    pub fn is_open(&self) -> bool {
        !self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    /// `Some(value)` if `ticket` is still current for this open view.
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        let current = ticket.view == self.inner.id
            && ticket.generation == self.inner.generation.load(Ordering::SeqCst)
            && self.is_open();
        if current {
            Some(value)
        } else {
            debug!(view = %self.inner.id, generation = ticket.generation, "discarding stale result");
            None
        }
    }

    /// Run `fut` under a fresh ticket.
    pub async fn load<F, T>(&self, fut: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let ticket = self.ticket();
        let value = fut.await;
        self.accept(ticket, value)
    }

    /// Closes the scope when dropped.
    pub fn guard(&self) -> ScopeGuard {
        ScopeGuard(self.clone())
    }
}

pub struct ScopeGuard(ViewScope);

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}
