//! Listener storage and registration tokens.

use super::multiplexer::Registry;
use kin_types::{Address, Balance, PaymentInfo};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Listener category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Payment,
    Balance,
    AccountCreation,
}

/// A registered callback.
///
/// `active` is shared with the [`ListenerRegistration`] and checked right
/// before every invocation.
pub(crate) struct Listener<T> {
    pub(crate) id: u64,
    active: Arc<AtomicBool>,
    callback: Arc<dyn Fn(&T) + Send + Sync>,
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            active: self.active.clone(),
            callback: self.callback.clone(),
        }
    }
}

impl<T> Listener<T> {
    pub(crate) fn new<F>(id: u64, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self {
            id,
            active: Arc::new(AtomicBool::new(true)),
            callback: Arc::new(callback),
        }
    }

    pub(crate) fn active_flag(&self) -> Arc<AtomicBool> {
        self.active.clone()
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Invoke unless removed. Returns whether the callback ran.
    pub(crate) fn deliver(&self, event: &T) -> bool {
        if !self.active.load(Ordering::Acquire) {
            return false;
        }
        (self.callback)(event);
        true
    }
}

/// Every listener of one account, by category.
#[derive(Default)]
pub(crate) struct ListenerSet {
    pub(crate) payments: RwLock<Vec<Listener<PaymentInfo>>>,
    pub(crate) balances: RwLock<Vec<Listener<Balance>>>,
    pub(crate) creations: RwLock<Vec<Listener<Address>>>,
}

impl ListenerSet {
    /// `true` when a transaction stream is needed.
    pub(crate) fn wants_stream(&self) -> bool {
        !self.payments.read().is_empty() || !self.balances.read().is_empty()
    }

    pub(crate) fn has_balance_listeners(&self) -> bool {
        !self.balances.read().is_empty()
    }

    pub(crate) fn has_creation_listeners(&self) -> bool {
        !self.creations.read().is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.payments.read().len() + self.balances.read().len() + self.creations.read().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        !self.wants_stream() && !self.has_creation_listeners()
    }

    /// Remove one listener. Returns `false` if it was not present.
    pub(crate) fn remove(&self, kind: ListenerKind, id: u64) -> bool {
        match kind {
            ListenerKind::Payment => remove_by_id(&self.payments, id),
            ListenerKind::Balance => remove_by_id(&self.balances, id),
            ListenerKind::AccountCreation => remove_by_id(&self.creations, id),
        }
    }
}

fn remove_by_id<T>(listeners: &RwLock<Vec<Listener<T>>>, id: u64) -> bool {
    let mut listeners = listeners.write();
    let before = listeners.len();
    listeners.retain(|listener| listener.id != id);
    listeners.len() != before
}

/// Handle to one registered listener.
///
/// Removal is idempotent. Dropping the handle removes the listener, so keep
/// it for as long as events are wanted.
#[must_use = "dropping a ListenerRegistration removes the listener"]
pub struct ListenerRegistration {
    registry: Weak<Registry>,
    address: Address,
    kind: ListenerKind,
    id: u64,
    active: Arc<AtomicBool>,
}

impl ListenerRegistration {
    pub(crate) fn new(
        registry: Weak<Registry>,
        address: Address,
        kind: ListenerKind,
        id: u64,
        active: Arc<AtomicBool>,
    ) -> Self {
        Self {
            registry,
            address,
            kind,
            id,
            active,
        }
    }

    /// Stop delivery to this listener.
    ///
    /// No delivery starts after this returns. A callback already running on
    /// another thread may still complete.
    pub fn remove(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_listener(&self.address, self.kind, self.id);
        }
    }

    /// `false` once removed, or once a one-shot listener has fired.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn kind(&self) -> ListenerKind {
        self.kind
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.remove();
    }
}

impl std::fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("address", &self.address)
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
