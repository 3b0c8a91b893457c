//! Ledger gateway adapters.

pub mod horizon;
pub mod memory_ledger;

pub use horizon::HorizonGateway;
pub use memory_ledger::InMemoryLedger;
