//! # Account State Resolver
//!
//! Fetches the ledger record of an account and classifies it against the
//! tracked asset. Every call reads fresh state.

use crate::domain::{AccountState, KinError};
use crate::ports::LedgerGateway;
use kin_types::{AccountStatus, Address, Asset, Balance};
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct AccountStateResolver {
    gateway: Arc<dyn LedgerGateway>,
    asset: Asset,
}

impl AccountStateResolver {
    pub fn new(gateway: Arc<dyn LedgerGateway>, asset: Asset) -> Self {
        Self { gateway, asset }
    }

    /// The asset accounts are classified against.
    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    /// Fetch and classify the account.
    ///
    /// # Errors
    /// `NetworkError` if the ledger cannot be reached. A missing account is
    /// not an error here.
    #[instrument(skip_all, fields(address = %address))]
    pub async fn resolve(&self, address: &Address) -> Result<AccountState, KinError> {
        let record = self.gateway.fetch_account(address).await?;
        let state = AccountState::classify(*address, record, &self.asset);
        debug!(status = %state.status(), "Account resolved");
        Ok(state)
    }

    pub async fn status(&self, address: &Address) -> Result<AccountStatus, KinError> {
        Ok(self.resolve(address).await?.status())
    }

    /// # Errors
    /// - `AccountNotFound` if the account has no ledger record
    /// - `AccountNotActivated` if it has no trustline
    /// - `NetworkError` on transport failure
    pub async fn balance(&self, address: &Address) -> Result<Balance, KinError> {
        self.resolve(address).await?.balance()
    }
}
