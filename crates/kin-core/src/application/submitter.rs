//! # Transaction Submitter
//!
//! Builds, signs and submits payments and trustline changes. Submission
//! happens exactly once per call; a rejected or failed transaction is
//! reported, never retried.

use super::resolver::AccountStateResolver;
use crate::domain::{KinError, SubmitError, TransactionBuilder};
use crate::ports::LedgerGateway;
use kin_crypto::KeyPair;
use kin_telemetry::metric_inc;
use kin_telemetry::metrics::{TRANSACTIONS_REJECTED, TRANSACTIONS_SUBMITTED};
use kin_types::{Address, Amount, AmountError, Memo, Network, Transaction, TransactionId};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct TransactionSubmitter {
    gateway: Arc<dyn LedgerGateway>,
    resolver: Arc<AccountStateResolver>,
    network: Network,
    base_fee: u32,
}

impl TransactionSubmitter {
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        resolver: Arc<AccountStateResolver>,
        network: Network,
        base_fee: u32,
    ) -> Self {
        Self {
            gateway,
            resolver,
            network,
            base_fee,
        }
    }

    /// Pay `amount` of the tracked asset from `keypair`'s account.
    ///
    /// Preconditions are checked in order and the first failure is returned:
    /// source activated, destination activated, amount positive with at most
    /// 7 fractional digits. The sequence number comes from the same fetch
    /// that checked the source.
    #[instrument(skip_all, fields(destination = %destination, amount = %amount))]
    pub async fn send(
        &self,
        keypair: &KeyPair,
        destination: &Address,
        amount: Decimal,
        memo: Option<&str>,
    ) -> Result<TransactionId, KinError> {
        let source = Address::from(keypair.public_key());
        let account = self.resolver.resolve(&source).await?.require_activated()?;
        self.resolver
            .resolve(destination)
            .await?
            .require_activated()?;

        let amount = Amount::from_decimal(amount)?;
        if amount.is_zero() {
            return Err(AmountError::NotPositive.into());
        }
        let memo = Memo::from_option(memo)?;

        let transaction = TransactionBuilder::new(source, account.sequence, self.base_fee)
            .memo(memo)
            .payment(*destination, self.resolver.asset().clone(), amount)
            .build()?;
        self.submit(keypair, transaction).await
    }

    /// Add a trustline to the tracked asset.
    ///
    /// A no-op for an account that already trusts it.
    #[instrument(skip_all, fields(address = %keypair.public_key().to_account_id()))]
    pub async fn activate(&self, keypair: &KeyPair) -> Result<(), KinError> {
        let source = Address::from(keypair.public_key());
        let state = self.resolver.resolve(&source).await?;
        if state.balance().is_ok() {
            debug!("Account already activated");
            return Ok(());
        }
        let record = state.require_created()?;

        let transaction = TransactionBuilder::new(source, record.sequence, self.base_fee)
            .change_trust(self.resolver.asset().clone(), Amount::MAX)
            .build()?;
        self.submit(keypair, transaction).await?;
        Ok(())
    }

    async fn submit(
        &self,
        keypair: &KeyPair,
        transaction: Transaction,
    ) -> Result<TransactionId, KinError> {
        let envelope = transaction.sign(keypair, &self.network)?;
        let local_id = envelope.transaction_id(&self.network)?;

        metric_inc!(TRANSACTIONS_SUBMITTED);
        match self.gateway.submit(&envelope).await {
            Ok(ledger_id) => {
                if ledger_id != local_id {
                    warn!(
                        local = %local_id,
                        ledger = %ledger_id,
                        "Ledger reported a different transaction id"
                    );
                }
                info!(id = %local_id, "Transaction included");
                Ok(local_id)
            }
            Err(SubmitError::Rejected(code)) => {
                metric_inc!(TRANSACTIONS_REJECTED, &[code.primary()]);
                warn!(id = %local_id, reason = %code, "Transaction rejected");
                Err(KinError::from_rejection(code))
            }
            Err(SubmitError::Transport(err)) => {
                warn!(id = %local_id, error = %err, "Transaction submission failed");
                Err(KinError::NetworkError(err))
            }
        }
    }
}
