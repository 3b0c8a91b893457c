//! # Kin Core
//!
//! Client-side engine for a Stellar-style ledger: account lifecycle queries,
//! payment submission and near-real-time event streaming.
//!
//! ## Components
//!
//! | Component | Location | Role |
//! |-----------|----------|------|
//! | Account State Resolver | `application/resolver.rs` | Ledger record → `NotCreated`/`NotActivated`/`Activated`, balances |
//! | Transaction Submitter | `application/submitter.rs` | Build, sign, submit; map rejections to typed errors |
//! | Ledger Gateway | `ports/outbound.rs`, `adapters/` | Fetch, submit, stream |
//! | Event Multiplexer | `events/` | One stream per account, fan-out to listeners |
//!
//! ## Send Preconditions
//!
//! Checked in order, first failure wins:
//!
//! 1. Source account exists and trusts the asset
//! 2. Destination account exists and trusts the asset
//! 3. Amount is positive with at most 7 fractional digits
//!
//! Then the payment is built with the sequence fetched in step 1, signed and
//! submitted exactly once. `op_underfunded` maps to `InsufficientKin`, any
//! other ledger code to `TransactionFailed`, transport failures to
//! `NetworkError`. There is no internal retry.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/  - HorizonGateway (reqwest + SSE), InMemoryLedger    │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - KinAccountApi                              │
//! │  ports/outbound.rs - LedgerGateway                              │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/  - AccountState, TransactionBuilder, payment decoding  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod events;
pub mod ports;

pub use adapters::{HorizonGateway, InMemoryLedger};
pub use application::{AccountStateResolver, KinAccount, KinClient, TransactionSubmitter};
pub use config::{ClientConfig, ConfigError, StreamConfig};
pub use domain::{AccountState, GatewayError, KinError, RejectionCode, SubmitError};
pub use events::{
    BlockchainEvent, BlockchainEvents, ChannelDispatcher, DeliveryQueue, EventDispatcher,
    EventMultiplexer, InlineDispatcher, ListenerRegistration,
};
pub use ports::{KinAccountApi, LedgerGateway, TransactionStream};
