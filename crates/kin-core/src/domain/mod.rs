//! Pure account and transaction logic.

pub mod account;
pub mod builder;
pub mod errors;
pub mod payment;

pub use account::{AccountState, ActivatedAccount};
pub use builder::TransactionBuilder;
pub use errors::{GatewayError, KinError, RejectionCode, SubmitError};
pub use payment::decode_payment;
