//! # Transactions and Envelopes
//!
//! A [`Transaction`] is the unsigned body; a [`TransactionEnvelope`] adds
//! the signatures and is what the ledger accepts. The transaction hash is
//! bound to a [`Network`] so a signature for one network cannot be replayed
//! on another.

use crate::address::Address;
use crate::amount::Amount;
use crate::errors::{AssetError, EnvelopeError, MemoError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use kin_crypto::{sha256, sha256_many, Hash, KeyPair, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain tag mixed into every transaction hash.
pub const TRANSACTION_HASH_TAG: &[u8] = b"KIN_TX_V1";

/// Longest text memo the ledger preserves, in bytes.
pub const MAX_MEMO_TEXT_BYTES: usize = 28;

/// Longest credit asset code.
pub const MAX_ASSET_CODE_LEN: usize = 12;

/// Ledger network, identified by its passphrase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    passphrase: String,
}

impl Network {
    /// Create a network from its passphrase.
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }

    /// Passphrase text.
    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// Network id: SHA-256 of the passphrase.
    pub fn id(&self) -> Hash {
        sha256(self.passphrase.as_bytes())
    }
}

/// Asset held in a balance line.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    /// The ledger's native currency (pays fees and reserves).
    Native,
    /// Issued asset, held through a trustline.
    Credit { code: String, issuer: Address },
}

impl Asset {
    /// Issued asset with a validated code.
    pub fn credit(code: impl Into<String>, issuer: Address) -> Result<Self, AssetError> {
        let code = code.into();
        let valid = !code.is_empty()
            && code.len() <= MAX_ASSET_CODE_LEN
            && code.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid {
            return Err(AssetError::InvalidCode(code));
        }
        Ok(Self::Credit { code, issuer })
    }

    /// Issuer of a credit asset.
    pub fn issuer(&self) -> Option<&Address> {
        match self {
            Self::Native => None,
            Self::Credit { issuer, .. } => Some(issuer),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Credit { code, issuer } => write!(f, "{code}:{issuer}"),
        }
    }
}

/// Optional note attached to a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Memo {
    /// No memo.
    #[default]
    None,
    /// UTF-8 text, at most [`MAX_MEMO_TEXT_BYTES`] bytes.
    Text(String),
}

impl Memo {
    /// Text memo, validated against the ledger's size limit.
    pub fn text(text: impl Into<String>) -> Result<Self, MemoError> {
        let text = text.into();
        if text.len() > MAX_MEMO_TEXT_BYTES {
            return Err(MemoError::TooLong {
                len: text.len(),
                max: MAX_MEMO_TEXT_BYTES,
            });
        }
        Ok(Self::Text(text))
    }

    /// `Memo::None` for `None`, a validated text memo otherwise.
    pub fn from_option(text: Option<&str>) -> Result<Self, MemoError> {
        text.map_or(Ok(Self::None), Self::text)
    }

    /// Text content, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Text(text) => Some(text),
        }
    }
}

/// Single ledger operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create and fund a new account with native currency.
    CreateAccount {
        destination: Address,
        starting_balance: Amount,
    },
    /// Move an asset between two existing accounts.
    Payment {
        destination: Address,
        asset: Asset,
        amount: Amount,
    },
    /// Create or update a trustline (activation).
    ChangeTrust { asset: Asset, limit: Amount },
}

impl Operation {
    /// Accounts other than the transaction source touched by this operation.
    pub fn counterparty(&self) -> Option<&Address> {
        match self {
            Self::CreateAccount { destination, .. } | Self::Payment { destination, .. } => {
                Some(destination)
            }
            Self::ChangeTrust { .. } => None,
        }
    }
}

/// Unsigned transaction body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Paying and sequencing account.
    pub source: Address,
    /// Total fee in stroops of native currency.
    pub fee: u32,
    /// Must be exactly the source account's current sequence plus one.
    pub sequence: i64,
    /// Attached memo.
    pub memo: Memo,
    /// Operations, applied atomically.
    pub operations: Vec<Operation>,
}

impl Transaction {
    /// Canonical binary encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        bincode::serialize(self).map_err(|e| EnvelopeError::Encoding(e.to_string()))
    }

    /// Network-bound hash; this is both the signed payload and the id.
    pub fn hash(&self, network: &Network) -> Result<Hash, EnvelopeError> {
        let body = self.to_bytes()?;
        Ok(sha256_many(&[network.id().as_slice(), TRANSACTION_HASH_TAG, body.as_slice()]))
    }

    /// Sign with `keypair`, producing a submittable envelope.
    pub fn sign(
        self,
        keypair: &KeyPair,
        network: &Network,
    ) -> Result<TransactionEnvelope, EnvelopeError> {
        let mut envelope = TransactionEnvelope {
            tx: self,
            signatures: Vec::new(),
        };
        envelope.add_signature(keypair, network)?;
        Ok(envelope)
    }
}

/// Signature with a 4-byte hint naming the signing key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratedSignature {
    /// Last four bytes of the signer's public key.
    pub hint: [u8; 4],
    /// 64-byte Ed25519 signature.
    pub signature: Vec<u8>,
}

/// Signed, submittable transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    /// Transaction body.
    pub tx: Transaction,
    /// Signatures over the network-bound hash.
    pub signatures: Vec<DecoratedSignature>,
}

impl TransactionEnvelope {
    /// Append a signature by `keypair`.
    pub fn add_signature(
        &mut self,
        keypair: &KeyPair,
        network: &Network,
    ) -> Result<(), EnvelopeError> {
        let hash = self.tx.hash(network)?;
        let public_key = keypair.public_key();
        self.signatures.push(DecoratedSignature {
            hint: public_key.hint(),
            signature: keypair.sign(&hash).as_bytes().to_vec(),
        });
        Ok(())
    }

    /// Hash of the enclosed transaction.
    pub fn hash(&self, network: &Network) -> Result<Hash, EnvelopeError> {
        self.tx.hash(network)
    }

    /// Id the ledger will assign to this envelope.
    pub fn transaction_id(&self, network: &Network) -> Result<TransactionId, EnvelopeError> {
        self.hash(network).map(TransactionId::from_hash)
    }

    /// `true` when some signature by `signer` verifies.
    pub fn is_signed_by(&self, signer: &PublicKey, network: &Network) -> bool {
        let Ok(hash) = self.hash(network) else {
            return false;
        };
        self.signatures
            .iter()
            .filter(|decorated| decorated.hint == signer.hint())
            .filter_map(|decorated| Signature::from_slice(&decorated.signature).ok())
            .any(|signature| signer.verify(&hash, &signature).is_ok())
    }

    /// Base64 of the binary encoding (the wire form for submission).
    pub fn to_base64(&self) -> Result<String, EnvelopeError> {
        let bytes = bincode::serialize(self).map_err(|e| EnvelopeError::Encoding(e.to_string()))?;
        Ok(BASE64.encode(bytes))
    }

    /// Parse the wire form.
    pub fn from_base64(encoded: &str) -> Result<Self, EnvelopeError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| EnvelopeError::Decoding(e.to_string()))?;
        bincode::deserialize(&bytes).map_err(|e| EnvelopeError::Decoding(e.to_string()))
    }
}

/// Ledger transaction hash, lowercase hex.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// From a raw hash.
    pub fn from_hash(hash: Hash) -> Self {
        Self(hex::encode(hash))
    }

    /// Parse hex text (case-insensitive).
    pub fn from_hex(text: &str) -> Result<Self, EnvelopeError> {
        let bytes = hex::decode(text)
            .map_err(|_| EnvelopeError::InvalidTransactionId(text.to_string()))?;
        let hash: Hash = bytes
            .try_into()
            .map_err(|_| EnvelopeError::InvalidTransactionId(text.to_string()))?;
        Ok(Self::from_hash(hash))
    }

    /// Hex text.
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
