//! # Application Services
//!
//! Orchestration over the [`LedgerGateway`](crate::ports::LedgerGateway) port.

mod account;
mod client;
mod resolver;
mod submitter;

pub use account::KinAccount;
pub use client::KinClient;
pub use resolver::AccountStateResolver;
pub use submitter::TransactionSubmitter;
