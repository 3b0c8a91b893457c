//! # Error Types
//!
//! Validation errors for the shared value types.

use kin_crypto::CryptoError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Invalid account address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid address {input:?}: {source}")]
pub struct AddressError {
    /// Text that failed to parse.
    pub input: String,
    /// Underlying decoding failure.
    #[source]
    pub source: CryptoError,
}

/// Invalid asset quantity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Quantity below zero.
    #[error("Amount {0} is negative")]
    Negative(Decimal),

    /// Quantity must be strictly positive here.
    #[error("Amount must be greater than zero")]
    NotPositive,

    /// More fractional digits than the ledger stores.
    #[error("Amount {value} has more than {max_places} decimal places")]
    TooPrecise { value: Decimal, max_places: u32 },

    /// Quantity does not fit the ledger's 64-bit stroop counter.
    #[error("Amount {0} is out of range")]
    Overflow(Decimal),

    /// Text is not a decimal number.
    #[error("Invalid amount text: {0}")]
    Parse(String),
}

/// Invalid memo.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoError {
    /// Text memo longer than the ledger allows.
    #[error("Memo text is {len} bytes, maximum is {max}")]
    TooLong { len: usize, max: usize },
}

/// Invalid asset description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// Code must be 1-12 ASCII alphanumerics.
    #[error("Invalid asset code: {0:?}")]
    InvalidCode(String),
}

/// Envelope encoding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Binary encoding failed.
    #[error("Envelope encoding failed: {0}")]
    Encoding(String),

    /// Binary or base64 decoding failed.
    #[error("Envelope decoding failed: {0}")]
    Decoding(String),

    /// A transaction needs at least one operation.
    #[error("Transaction has no operations")]
    NoOperations,

    /// Base fee times operation count does not fit the fee field.
    #[error("Fee overflows for {operations} operations at base fee {base_fee}")]
    FeeOverflow { base_fee: u32, operations: usize },

    /// Transaction id text is not a 32-byte hex digest.
    #[error("Invalid transaction id: {0:?}")]
    InvalidTransactionId(String),
}
