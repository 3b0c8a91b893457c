//! Transaction assembly.

use kin_types::{Address, Amount, Asset, EnvelopeError, Memo, Operation, Transaction};

/// Builds a [`Transaction`] for one source account.
///
/// The fee is `base_fee` times the number of operations; the sequence is the
/// account's current sequence plus one.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    source: Address,
    sequence: i64,
    base_fee: u32,
    memo: Memo,
    operations: Vec<Operation>,
}

impl TransactionBuilder {
    /// Start a transaction from `source`, whose last used sequence is `current_sequence`.
    pub fn new(source: Address, current_sequence: i64, base_fee: u32) -> Self {
        Self {
            source,
            sequence: current_sequence.saturating_add(1),
            base_fee,
            memo: Memo::None,
            operations: Vec::new(),
        }
    }

    pub fn memo(mut self, memo: Memo) -> Self {
        self.memo = memo;
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Append a payment of `asset`.
    pub fn payment(self, destination: Address, asset: Asset, amount: Amount) -> Self {
        self.operation(Operation::Payment {
            destination,
            asset,
            amount,
        })
    }

    /// Append a trustline change.
    pub fn change_trust(self, asset: Asset, limit: Amount) -> Self {
        self.operation(Operation::ChangeTrust { asset, limit })
    }

    pub fn build(self) -> Result<Transaction, EnvelopeError> {
        if self.operations.is_empty() {
            return Err(EnvelopeError::NoOperations);
        }
        let fee = u32::try_from(self.operations.len())
            .ok()
            .and_then(|count| self.base_fee.checked_mul(count))
            .ok_or(EnvelopeError::FeeOverflow {
                base_fee: self.base_fee,
                operations: self.operations.len(),
            })?;

        Ok(Transaction {
            source: self.source,
            fee,
            sequence: self.sequence,
            memo: self.memo,
            operations: self.operations,
        })
    }
}
