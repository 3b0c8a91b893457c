//! Error taxonomy.
//!
//! Ledger rejections ([`SubmitError::Rejected`]) and transport failures
//! ([`GatewayError`]) stay distinct all the way up to [`KinError`], so a
//! caller can tell "the ledger said no" from "the ledger was unreachable".

use crate::config::ConfigError;
use kin_types::{Address, AmountError, EnvelopeError, MemoError};
use std::fmt;
use thiserror::Error;

/// Operation result code the ledger uses for insufficient balance.
pub const OP_UNDERFUNDED: &str = "op_underfunded";

/// Transport-level gateway failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The request did not complete in time.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection refused, reset or closed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Unexpected HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body could not be decoded.
    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Raw result codes of a rejected transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RejectionCode {
    /// Transaction-level code, e.g. `tx_failed` or `tx_bad_seq`.
    pub transaction: String,
    /// Per-operation codes, e.g. `["op_underfunded"]`.
    pub operations: Vec<String>,
}

impl RejectionCode {
    /// Rejection at transaction level with no operation results.
    pub fn transaction(code: impl Into<String>) -> Self {
        Self {
            transaction: code.into(),
            operations: Vec::new(),
        }
    }

    /// `tx_failed` with the given operation codes.
    pub fn operations(codes: Vec<String>) -> Self {
        Self {
            transaction: "tx_failed".to_string(),
            operations: codes,
        }
    }

    /// `true` when any operation failed for lack of funds.
    pub fn is_underfunded(&self) -> bool {
        self.operations.iter().any(|code| code == OP_UNDERFUNDED)
    }

    /// Most specific code: the first failing operation, else the transaction code.
    pub fn primary(&self) -> &str {
        self.operations
            .iter()
            .find(|code| code.as_str() != "op_success")
            .map(String::as_str)
            .unwrap_or(&self.transaction)
    }
}

impl fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operations.is_empty() {
            f.write_str(&self.transaction)
        } else {
            write!(f, "{} [{}]", self.transaction, self.operations.join(", "))
        }
    }
}

/// Outcome of a failed submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The ledger refused the transaction.
    #[error("Transaction rejected: {0}")]
    Rejected(RejectionCode),

    /// The ledger could not be reached.
    #[error(transparent)]
    Transport(#[from] GatewayError),
}

/// Errors surfaced by the public client API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KinError {
    /// No ledger record exists for the address.
    #[error("Account {address} was not found")]
    AccountNotFound { address: Address },

    /// The account exists but has no trustline to the asset.
    #[error("Account {address} is not activated")]
    AccountNotActivated { address: Address },

    /// Rejected for insufficient balance.
    #[error("Insufficient Kin balance")]
    InsufficientKin,

    /// Any other ledger rejection.
    #[error("Transaction failed: {reason_code}")]
    TransactionFailed { reason_code: RejectionCode },

    /// Transport failure; the caller decides whether to retry.
    #[error("Network error: {0}")]
    NetworkError(#[from] GatewayError),

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("Invalid memo: {0}")]
    InvalidMemo(#[from] MemoError),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(#[from] EnvelopeError),

    /// A blocking `*_sync` call was made from inside the async runtime.
    #[error("Blocking call made from inside an async runtime; use the async variant")]
    BlockingInAsyncContext,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl KinError {
    /// Map ledger result codes to the public taxonomy.
    pub fn from_rejection(code: RejectionCode) -> Self {
        if code.is_underfunded() {
            Self::InsufficientKin
        } else {
            Self::TransactionFailed { reason_code: code }
        }
    }

    /// `true` for failures worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError(_))
    }
}

impl From<SubmitError> for KinError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Rejected(code) => Self::from_rejection(code),
            SubmitError::Transport(err) => Self::NetworkError(err),
        }
    }
}
