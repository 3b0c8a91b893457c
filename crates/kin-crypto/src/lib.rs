//! # Kin Crypto
//!
//! Cryptographic primitives used by the Kin ledger client.
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `keys` | Ed25519 | Account keypairs, transaction signing |
//! | `hashing` | SHA-256 | Network ids, transaction hashes |
//! | `strkey` | base32 + CRC16-XModem | `G…` account ids, `S…` secret seeds |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod keys;
pub mod strkey;

pub use errors::CryptoError;
pub use hashing::{sha256, sha256_many, Hash};
pub use keys::{KeyPair, PublicKey, Signature};
