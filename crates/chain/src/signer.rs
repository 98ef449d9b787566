//! Liquidator signing key loading.

use solana_sdk::signature::Keypair;
use thiserror::Error;

/// Length of an ed25519 secret key followed by its public key.
const KEYPAIR_LENGTH: usize = 64;

#[derive(Debug, Error)]
pub enum KeypairError {
    #[error("private key is not valid base58: {0}")]
    Encoding(#[from] bs58::decode::Error),

    #[error("private key must decode to 64 bytes, got {0}")]
    Length(usize),

    #[error("private key bytes are not a valid keypair: {0}")]
    Invalid(String),
}

/// Decode a base58 secret key (the 64-byte `secret || public` form).
pub fn load_keypair(secret: &str) -> Result<Keypair, KeypairError> {
    let bytes = bs58::decode(secret.trim()).into_vec()?;
    if bytes.len() != KEYPAIR_LENGTH {
        return Err(KeypairError::Length(bytes.len()));
    }

    Keypair::from_bytes(&bytes).map_err(|e| KeypairError::Invalid(e.to_string()))
}
