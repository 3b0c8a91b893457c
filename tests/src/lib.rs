//! # Kin Client Test Suite
//!
//! End-to-end flows driving [`kin_core::KinClient`] against
//! [`kin_core::InMemoryLedger`].
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs            # Ledger + client fixture, event helpers
//!     ├── account_lifecycle.rs  # NotCreated → NotActivated → Activated, balances
//!     ├── transactions.rs       # send preconditions, rejections, memo round-trip
//!     └── blockchain_events.rs  # listeners, removal, resubscription, dispatchers
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p kin-tests
//! cargo test -p kin-tests integration::blockchain_events
//! ```

pub mod integration;
