//! Account classification.

use crate::domain::errors::KinError;
use kin_types::{AccountRecord, AccountStatus, Address, Asset, Balance};

/// A ledger account record (or its absence) classified against one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    address: Address,
    record: Option<AccountRecord>,
    balance: Option<Balance>,
}

/// Data needed to build a transaction from an activated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivatedAccount {
    /// Last sequence number used by the account.
    pub sequence: i64,
    pub balance: Balance,
}

impl AccountState {
    /// Classify a fetched record.
    pub fn classify(address: Address, record: Option<AccountRecord>, asset: &Asset) -> Self {
        let balance = record.as_ref().and_then(|r| r.balance_of(asset));
        Self {
            address,
            record,
            balance,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn status(&self) -> AccountStatus {
        match (&self.record, &self.balance) {
            (None, _) => AccountStatus::NotCreated,
            (Some(_), None) => AccountStatus::NotActivated,
            (Some(_), Some(_)) => AccountStatus::Activated,
        }
    }

    /// Balance of the asset; fails unless the account is activated.
    pub fn balance(&self) -> Result<Balance, KinError> {
        self.require_activated().map(|account| account.balance)
    }

    /// Ledger record; fails with `AccountNotFound` when absent.
    pub fn require_created(&self) -> Result<&AccountRecord, KinError> {
        self.record.as_ref().ok_or(KinError::AccountNotFound {
            address: self.address,
        })
    }

    /// Sequence and balance; fails unless the account is activated.
    pub fn require_activated(&self) -> Result<ActivatedAccount, KinError> {
        let record = self.require_created()?;
        let balance = self.balance.ok_or(KinError::AccountNotActivated {
            address: self.address,
        })?;
        Ok(ActivatedAccount {
            sequence: record.sequence,
            balance,
        })
    }
}
