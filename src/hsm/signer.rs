//! Payload signing.
//!
//! The signed digest is `keccak256(abi.encode(address to, uint256 value))`,
//! signed as an EIP-191 personal message. Signing is a pure function of the
//! payload and the credential: secp256k1 nonces are derived per RFC 6979, so
//! identical inputs always yield identical signature bytes.
//!
//! Confirmations sent to the coordination service are a separate signature
//! over the proposal's Safe transaction hash, in the `eth_sign` form the Safe
//! contract expects (`v + 4`).

use ethers::abi::{encode, Token};
use ethers::types::{Address, Signature, H256};
use ethers::utils::hash_message;
use serde_json::Value;
use sha3::{Digest, Keccak256};

use super::Credential;
use crate::error::SigningError;
use crate::types::TxPayload;

/// Safe marks `eth_sign` signatures by raising `v` from 27/28 to 31/32.
const SAFE_ETH_SIGN_V_OFFSET: u64 = 4;

fn parse_safe_tx_hash(raw: &str) -> Result<H256, SigningError> {
    let digits = raw.trim().trim_start_matches("0x");
    let bytes = hex::decode(digits).map_err(|e| SigningError::InvalidField {
        field: "safeTxHash",
        reason: e.to_string(),
    })?;
    if bytes.len() != 32 {
        return Err(SigningError::InvalidField {
            field: "safeTxHash",
            reason: format!("expected 32 bytes, got {}", bytes.len()),
        });
    }
    Ok(H256::from_slice(&bytes))
}

/// Canonical digest of a payload's destination and value (in that order).
pub fn payload_digest(payload: &TxPayload) -> [u8; 32] {
    let encoded = encode(&[Token::Address(payload.to), Token::Uint(payload.value)]);
    let mut hasher = Keccak256::new();
    hasher.update(&encoded);
    hasher.finalize().into()
}

/// Stateless signer over transaction payloads.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignatureProvider;

impl SignatureProvider {
    pub fn new() -> Self {
        Self
    }

    /// Sign `payload` with `credential`, returning 65 bytes `r || s || v`.
    pub fn sign(&self, payload: &Value, credential: &Credential) -> Result<Vec<u8>, SigningError> {
        let tx = TxPayload::from_value(payload)?;
        self.sign_payload(&tx, credential)
    }

    pub fn sign_payload(
        &self,
        payload: &TxPayload,
        credential: &Credential,
    ) -> Result<Vec<u8>, SigningError> {
        let digest = payload_digest(payload);
        let message_hash: H256 = hash_message(digest);
        let signature = credential
            .wallet()?
            .sign_hash(message_hash)
            .map_err(|e| SigningError::Signer(e.to_string()))?;
        Ok(signature.to_vec())
    }

    /// Approve the Safe proposal identified by `safe_tx_hash`.
    ///
    /// Returns 65 bytes `r || s || v` with `v` in `{31, 32}`.
    pub fn sign_safe_tx_hash(
        &self,
        safe_tx_hash: &str,
        credential: &Credential,
    ) -> Result<Vec<u8>, SigningError> {
        let hash = parse_safe_tx_hash(safe_tx_hash)?;
        let mut signature = credential
            .wallet()?
            .sign_hash(hash_message(hash))
            .map_err(|e| SigningError::Signer(e.to_string()))?;
        signature.v += SAFE_ETH_SIGN_V_OFFSET;
        Ok(signature.to_vec())
    }

    /// Recover the owner behind a [`sign_safe_tx_hash`](Self::sign_safe_tx_hash) signature.
    pub fn recover_safe_tx_hash(
        &self,
        safe_tx_hash: &str,
        signature: &[u8],
    ) -> Result<Address, SigningError> {
        let hash = parse_safe_tx_hash(safe_tx_hash)?;
        let mut signature =
            Signature::try_from(signature).map_err(|e| SigningError::Signer(e.to_string()))?;
        if signature.v > 30 {
            signature.v -= SAFE_ETH_SIGN_V_OFFSET;
        }
        signature
            .recover(hash.as_bytes().to_vec())
            .map_err(|e| SigningError::Signer(e.to_string()))
    }

    /// Recover the address that produced `signature` over `payload`.
    pub fn recover(&self, payload: &Value, signature: &[u8]) -> Result<Address, SigningError> {
        let tx = TxPayload::from_value(payload)?;
        let signature =
            Signature::try_from(signature).map_err(|e| SigningError::Signer(e.to_string()))?;
        let digest = payload_digest(&tx);
        // A byte-slice message is re-hashed with the EIP-191 prefix on recovery.
        signature
            .recover(digest.to_vec())
            .map_err(|e| SigningError::Signer(e.to_string()))
    }
}
