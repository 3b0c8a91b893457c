//! # StrKey
//!
//! Human-readable key encoding used by Stellar-family ledgers:
//!
//! ```text
//! base32( version_byte ‖ 32 key bytes ‖ crc16_xmodem_le )
//! ```
//!
//! Account ids start with `G`, secret seeds with `S`.

use crate::CryptoError;
use crc::{Crc, CRC_16_XMODEM};
use data_encoding::BASE32_NOPAD;

const ACCOUNT_ID_VERSION: u8 = 6 << 3;
const SEED_VERSION: u8 = 18 << 3;
const PAYLOAD_LEN: usize = 1 + 32 + 2;
const CHECKSUM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Encode a public key as an account id.
pub fn encode_account_id(key: &[u8; 32]) -> String {
    encode_check(ACCOUNT_ID_VERSION, key)
}

/// Decode an account id into raw public key bytes.
pub fn decode_account_id(encoded: &str) -> Result<[u8; 32], CryptoError> {
    decode_check(ACCOUNT_ID_VERSION, encoded)
}

/// Encode a secret seed.
pub fn encode_seed(seed: &[u8; 32]) -> String {
    encode_check(SEED_VERSION, seed)
}

/// Decode a secret seed.
pub fn decode_seed(encoded: &str) -> Result<[u8; 32], CryptoError> {
    decode_check(SEED_VERSION, encoded)
}

fn encode_check(version: u8, key: &[u8; 32]) -> String {
    let mut data = Vec::with_capacity(PAYLOAD_LEN);
    data.push(version);
    data.extend_from_slice(key);
    let checksum = CHECKSUM.checksum(&data);
    data.extend_from_slice(&checksum.to_le_bytes());
    BASE32_NOPAD.encode(&data)
}

fn decode_check(version: u8, encoded: &str) -> Result<[u8; 32], CryptoError> {
    let data = BASE32_NOPAD
        .decode(encoded.as_bytes())
        .map_err(|e| CryptoError::InvalidStrKey(e.to_string()))?;
    if data.len() != PAYLOAD_LEN {
        return Err(CryptoError::InvalidStrKey(format!(
            "expected {PAYLOAD_LEN} bytes, got {}",
            data.len()
        )));
    }
    if data[0] != version {
        return Err(CryptoError::InvalidStrKey(format!(
            "unexpected version byte {}",
            data[0]
        )));
    }

    let (body, checksum) = data.split_at(PAYLOAD_LEN - 2);
    if CHECKSUM.checksum(body).to_le_bytes() != checksum {
        return Err(CryptoError::InvalidStrKey("checksum mismatch".to_string()));
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&body[1..]);
    Ok(key)
}
