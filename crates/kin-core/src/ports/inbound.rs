//! # Inbound Ports
//!
//! Operations the host application drives on one account.

use crate::domain::KinError;
use async_trait::async_trait;
use kin_types::{AccountStatus, Address, Balance, TransactionId};
use rust_decimal::Decimal;

/// Account operations (driving port).
///
/// Every call reads fresh ledger state; nothing is cached between calls.
#[async_trait]
pub trait KinAccountApi: Send + Sync {
    /// Public address of the account.
    fn address(&self) -> Address;

    /// Lifecycle state with respect to the tracked asset.
    async fn status(&self) -> Result<AccountStatus, KinError>;

    /// Balance of the tracked asset.
    ///
    /// # Errors
    /// - `AccountNotFound` if the account has no ledger record
    /// - `AccountNotActivated` if it has no trustline
    async fn balance(&self) -> Result<Balance, KinError>;

    /// Establish the trustline to the tracked asset.
    ///
    /// A no-op when already activated; `AccountNotFound` if not created.
    async fn activate(&self) -> Result<(), KinError>;

    /// Pay `amount` of the tracked asset to `destination`.
    ///
    /// Returns the id of the submitted transaction. Never retried
    /// internally; on a sequence race, call again.
    async fn send_transaction(
        &self,
        destination: &Address,
        amount: Decimal,
        memo: Option<&str>,
    ) -> Result<TransactionId, KinError>;
}
