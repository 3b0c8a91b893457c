//! # Kin Account
//!
//! One keypair bound to a client. Async operations implement
//! [`KinAccountApi`]; `*_sync` variants block the calling thread and must not
//! be used from inside the async runtime.

use super::resolver::AccountStateResolver;
use super::submitter::TransactionSubmitter;
use crate::domain::KinError;
use crate::events::{BlockchainEvents, ListenerRegistration};
use crate::ports::KinAccountApi;
use async_trait::async_trait;
use kin_crypto::KeyPair;
use kin_types::{AccountStatus, Address, Balance, PaymentInfo, TransactionId};
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;

#[derive(Clone)]
pub struct KinAccount {
    keypair: Arc<KeyPair>,
    address: Address,
    resolver: Arc<AccountStateResolver>,
    submitter: Arc<TransactionSubmitter>,
    events: BlockchainEvents,
    runtime: Handle,
}

impl KinAccount {
    pub(crate) fn new(
        keypair: KeyPair,
        resolver: Arc<AccountStateResolver>,
        submitter: Arc<TransactionSubmitter>,
        events: BlockchainEvents,
        runtime: Handle,
    ) -> Self {
        let address = Address::from(keypair.public_key());
        Self {
            keypair: Arc::new(keypair),
            address,
            resolver,
            submitter,
            events,
            runtime,
        }
    }

    /// Ledger event registration for this account.
    pub fn blockchain_events(&self) -> &BlockchainEvents {
        &self.events
    }

    pub fn add_payment_listener<F>(&self, callback: F) -> ListenerRegistration
    where
        F: Fn(&PaymentInfo) + Send + Sync + 'static,
    {
        self.events.add_payment_listener(callback)
    }

    pub fn add_balance_listener<F>(&self, callback: F) -> ListenerRegistration
    where
        F: Fn(&Balance) + Send + Sync + 'static,
    {
        self.events.add_balance_listener(callback)
    }

    /// Secret seed as StrKey (`S…`), for backup.
    pub fn export_seed(&self) -> String {
        self.keypair.secret_seed()
    }

    pub fn status_sync(&self) -> Result<AccountStatus, KinError> {
        self.block_on(self.status())?
    }

    pub fn balance_sync(&self) -> Result<Balance, KinError> {
        self.block_on(self.balance())?
    }

    pub fn activate_sync(&self) -> Result<(), KinError> {
        self.block_on(self.activate())?
    }

    pub fn send_transaction_sync(
        &self,
        destination: &Address,
        amount: Decimal,
        memo: Option<&str>,
    ) -> Result<TransactionId, KinError> {
        self.block_on(self.send_transaction(destination, amount, memo))?
    }

    /// Drive `future` on the client runtime from a plain thread.
    ///
    /// Needs a multi-threaded runtime: a current-thread runtime only makes
    /// progress inside its own `block_on`.
    fn block_on<F: Future>(&self, future: F) -> Result<F::Output, KinError> {
        if Handle::try_current().is_ok() {
            return Err(KinError::BlockingInAsyncContext);
        }
        Ok(self.runtime.block_on(future))
    }
}

#[async_trait]
impl KinAccountApi for KinAccount {
    fn address(&self) -> Address {
        self.address
    }

    async fn status(&self) -> Result<AccountStatus, KinError> {
        self.resolver.status(&self.address).await
    }

    async fn balance(&self) -> Result<Balance, KinError> {
        self.resolver.balance(&self.address).await
    }

    async fn activate(&self) -> Result<(), KinError> {
        self.submitter.activate(&self.keypair).await
    }

    async fn send_transaction(
        &self,
        destination: &Address,
        amount: Decimal,
        memo: Option<&str>,
    ) -> Result<TransactionId, KinError> {
        self.submitter
            .send(&self.keypair, destination, amount, memo)
            .await
    }
}

impl std::fmt::Debug for KinAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KinAccount")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
