//! Records read back from the ledger.

use crate::address::Address;
use crate::amount::{Amount, Balance};
use crate::transaction::{Asset, Operation, TransactionEnvelope, TransactionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle position of an account with respect to the client's asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    /// No account exists at the address.
    NotCreated,
    /// The account exists but holds no trustline to the asset.
    NotActivated,
    /// The account holds a trustline to the asset.
    Activated,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotCreated => "NOT_CREATED",
            Self::NotActivated => "NOT_ACTIVATED",
            Self::Activated => "ACTIVATED",
        };
        f.write_str(text)
    }
}

/// One balance line of an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLine {
    pub asset: Asset,
    pub amount: Amount,
}

/// Snapshot of an account as the ledger reports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub address: Address,
    /// Last sequence number used by the account.
    pub sequence: i64,
    pub balances: Vec<BalanceLine>,
}

impl AccountRecord {
    /// Balance line for `asset`, if the account holds one.
    pub fn balance_of(&self, asset: &Asset) -> Option<Balance> {
        self.balances
            .iter()
            .find(|line| &line.asset == asset)
            .map(|line| Balance::from(line.amount))
    }

    /// `true` when the account holds a line for `asset`.
    pub fn trusts(&self, asset: &Asset) -> bool {
        self.balances.iter().any(|line| &line.asset == asset)
    }
}

/// Transaction included in a ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    /// Ledger number the transaction closed in.
    pub ledger: u32,
    /// Opaque cursor; streams resume strictly after it.
    pub paging_token: String,
    pub created_at: DateTime<Utc>,
    /// `false` when the transaction was included but its operations failed.
    pub successful: bool,
    pub envelope: TransactionEnvelope,
}

impl TransactionRecord {
    /// Source account of the transaction.
    pub fn source(&self) -> &Address {
        &self.envelope.tx.source
    }

    /// Text memo, if any.
    pub fn memo_text(&self) -> Option<&str> {
        self.envelope.tx.memo.as_text()
    }

    /// `true` when `address` is the source or a counterparty of any operation.
    pub fn involves(&self, address: &Address) -> bool {
        self.source() == address
            || self
                .envelope
                .tx
                .operations
                .iter()
                .any(|op| op.counterparty() == Some(address))
    }

    /// Operations of the enclosed transaction.
    pub fn operations(&self) -> &[Operation] {
        &self.envelope.tx.operations
    }
}

/// Decoded payment of the client's asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub created_at: DateTime<Utc>,
    pub source: Address,
    pub destination: Address,
    pub amount: Amount,
    pub memo: Option<String>,
    pub transaction_id: TransactionId,
}

/// Where a stream starts reading.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StreamCursor {
    /// Only transactions included after the stream opens.
    #[default]
    Now,
    /// Transactions strictly after the given paging token.
    After(String),
    /// Transactions that closed at or after the given instant.
    ///
    /// Lets a caller fix the start position before the connection exists.
    Since(DateTime<Utc>),
}

impl StreamCursor {
    /// Text form used in query strings; `None` when the gateway has to
    /// resolve the position itself.
    pub fn as_query_value(&self) -> Option<&str> {
        match self {
            Self::Now => Some("now"),
            Self::After(token) => Some(token),
            Self::Since(_) => None,
        }
    }
}

impl fmt::Display for StreamCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Now => f.write_str("now"),
            Self::After(token) => write!(f, "after {token}"),
            Self::Since(at) => write!(f, "since {}", at.to_rfc3339()),
        }
    }
}
