//! Ports.

pub mod inbound;
pub mod outbound;

pub use inbound::KinAccountApi;
pub use outbound::{LedgerGateway, TransactionStream};
