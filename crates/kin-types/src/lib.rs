//! # Kin Types Crate
//!
//! Value types shared by every crate of the ledger client.
//!
//! ## Design Principles
//!
//! - **Exact amounts**: quantities are integer stroops (10^-7 units), the
//!   ledger's own precision. Decimal input with more fractional digits is
//!   rejected, never truncated.
//! - **Validated identity**: an `Address` always holds a valid Ed25519 point.
//! - **Local transaction ids**: a `TransactionId` is computable from the
//!   envelope before it is submitted.

pub mod address;
pub mod amount;
pub mod errors;
pub mod ledger;
pub mod transaction;

pub use address::Address;
pub use amount::{Amount, Balance, DECIMAL_PLACES, STROOPS_PER_UNIT};
pub use errors::*;
pub use ledger::*;
pub use transaction::*;
