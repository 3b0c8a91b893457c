//! Events delivered to listeners.

use kin_types::{Address, Balance, PaymentInfo};

/// Event routed to the listener category of the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainEvent {
    /// A payment of the tracked asset to or from the account.
    Payment(PaymentInfo),
    /// The account's balance after a ledger change.
    Balance(Balance),
    /// The account now exists on the ledger.
    AccountCreated(Address),
}

impl BlockchainEvent {
    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Payment(_) => "payment",
            Self::Balance(_) => "balance",
            Self::AccountCreated(_) => "account_created",
        }
    }
}
