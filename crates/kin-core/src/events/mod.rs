//! # Event Stream Multiplexer
//!
//! One ledger stream per account, shared by every listener on that account.
//!
//! ```text
//!            first payment/balance listener
//!   [Idle] ─────────────────────────────────→ [Streaming]
//!      ↑                                          │
//!      └──────────── last listener removed ───────┘
//! ```
//!
//! Each successful record on the stream yields at most one
//! [`BlockchainEvent::Payment`] and, when balance listeners exist, one
//! [`BlockchainEvent::Balance`] read fresh from the ledger. Within a category
//! events reach listeners in ledger order.

mod account_events;
mod dispatcher;
mod event;
mod listeners;
mod multiplexer;

pub use account_events::BlockchainEvents;
pub use dispatcher::{ChannelDispatcher, DeliveryJob, DeliveryQueue, EventDispatcher, InlineDispatcher};
pub use event::BlockchainEvent;
pub use listeners::{ListenerKind, ListenerRegistration};
pub use multiplexer::EventMultiplexer;
