//! Persistence notifier
//!
//! Fan-out hook invoked by the store after every successful domain write.
//! Listeners are best-effort: an error or panic in one listener is logged and
//! dropped, never reported to the writer, and never stops the other listeners.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::error::ListenerError;
use crate::registry::DomainKey;

/// Handle returned by [`PersistenceNotifier::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lst-{}", &self.0.to_string()[..8])
    }
}

/// Callback invoked with the domain that was just written
pub type Listener = Arc<dyn Fn(DomainKey) -> Result<(), ListenerError> + Send + Sync>;

#[derive(Default)]
pub struct PersistenceNotifier {
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
}

impl PersistenceNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; every later notification reaches it
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(DomainKey) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let id = ListenerId::new();
        let mut listeners = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener, returning whether it was registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        match self.listeners.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Deliver a write notification to every listener
    ///
    /// The listener list is copied before dispatch so listeners may add or
    /// remove listeners without deadlocking.
    pub fn notify(&self, domain: DomainKey) {
        let snapshot: Vec<(ListenerId, Listener)> = match self.listeners.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        for (id, listener) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(domain))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(listener = %id, %domain, "persistence listener failed: {}", err);
                }
                Err(_) => {
                    tracing::warn!(listener = %id, %domain, "persistence listener panicked");
                }
            }
        }
    }
}

impl fmt::Debug for PersistenceNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
