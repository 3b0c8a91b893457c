//! Cross-crate integration flows.

pub mod harness;

mod account_lifecycle;
mod blockchain_events;
mod transactions;
