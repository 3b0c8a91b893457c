//! Listener registration for one account.

use super::listeners::ListenerRegistration;
use super::multiplexer::EventMultiplexer;
use kin_types::{Address, Balance, PaymentInfo};

/// Ledger events of one account.
#[derive(Clone)]
pub struct BlockchainEvents {
    multiplexer: EventMultiplexer,
    address: Address,
}

impl BlockchainEvents {
    pub fn new(multiplexer: EventMultiplexer, address: Address) -> Self {
        Self {
            multiplexer,
            address,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Called once per payment of the tracked asset to or from the account.
    pub fn add_payment_listener<F>(&self, callback: F) -> ListenerRegistration
    where
        F: Fn(&PaymentInfo) + Send + Sync + 'static,
    {
        self.multiplexer.add_payment_listener(self.address, callback)
    }

    /// Called with the fresh balance after each change involving the account.
    pub fn add_balance_listener<F>(&self, callback: F) -> ListenerRegistration
    where
        F: Fn(&Balance) + Send + Sync + 'static,
    {
        self.multiplexer.add_balance_listener(self.address, callback)
    }

    /// Called once when the account first appears on the ledger.
    pub fn add_account_creation_listener<F>(&self, callback: F) -> ListenerRegistration
    where
        F: Fn(&Address) + Send + Sync + 'static,
    {
        self.multiplexer
            .add_account_creation_listener(self.address, callback)
    }

    /// `true` while a transaction stream is open for the account.
    pub fn is_streaming(&self) -> bool {
        self.multiplexer.is_streaming(&self.address)
    }

    pub fn listener_count(&self) -> usize {
        self.multiplexer.listener_count(&self.address)
    }
}
