//! # Outbound Ports
//!
//! The ledger network as seen by the client.

use crate::domain::{GatewayError, SubmitError};
use async_trait::async_trait;
use futures::stream::BoxStream;
use kin_types::{
    AccountRecord, Address, StreamCursor, TransactionEnvelope, TransactionId, TransactionRecord,
};

/// Transactions involving one account, in ledger order.
///
/// An `Err` item means the underlying connection failed; the stream should
/// be dropped and reopened from the last paging token.
pub type TransactionStream = BoxStream<'static, Result<TransactionRecord, GatewayError>>;

/// Ledger network client (driven port).
///
/// Errors are transport-level only, except for [`SubmitError::Rejected`]
/// which carries the ledger's result codes.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Current account record, `None` if the account does not exist.
    async fn fetch_account(&self, address: &Address)
        -> Result<Option<AccountRecord>, GatewayError>;

    /// Submit a signed envelope and wait for inclusion.
    async fn submit(&self, envelope: &TransactionEnvelope) -> Result<TransactionId, SubmitError>;

    /// Included transaction by id, `None` if unknown.
    async fn fetch_transaction(
        &self,
        id: &TransactionId,
    ) -> Result<Option<TransactionRecord>, GatewayError>;

    /// Open a stream of transactions that involve `address`, starting after `cursor`.
    async fn open_stream(
        &self,
        address: &Address,
        cursor: StreamCursor,
    ) -> Result<TransactionStream, GatewayError>;
}
