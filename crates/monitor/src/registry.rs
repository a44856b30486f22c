use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use metrics::counter;
use tracing::warn;
use transfer_watch_domain::model::WatchedAddress;

/// Tracks which recipients currently have a monitor session running.
///
/// Overlapping sessions for one recipient are allowed; each polls the chain
/// independently. The registry only makes the overlap visible.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<String, usize>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session; the returned ticket deregisters it on drop.
    pub fn enter(&self, recipient: &WatchedAddress) -> SessionTicket {
        let key = recipient.as_str().to_owned();
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let active = guard.entry(key.clone()).or_insert(0);
        *active = active.saturating_add(1);
        let concurrent = *active;
        drop(guard);

        if concurrent > 1 {
            counter!("monitor_overlapping_sessions_total").increment(1);
            warn!(
                recipient = %key,
                concurrent, "overlapping monitor sessions for recipient; polling is duplicated"
            );
        }

        SessionTicket {
            registry: self.clone(),
            key,
            concurrent,
        }
    }

    pub fn active(&self, recipient: &WatchedAddress) -> usize {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.get(recipient.as_str()).copied().unwrap_or(0)
    }

    fn leave(&self, key: &str) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(active) = guard.get_mut(key) {
            *active = active.saturating_sub(1);
            if *active == 0 {
                guard.remove(key);
            }
        }
    }
}

pub struct SessionTicket {
    registry: SessionRegistry,
    key: String,
    concurrent: usize,
}

impl SessionTicket {
    /// Sessions for the same recipient running when this one started,
    /// including itself.
    pub fn concurrent(&self) -> usize {
        self.concurrent
    }
}

impl Drop for SessionTicket {
    fn drop(&mut self) {
        self.registry.leave(&self.key);
    }
}
