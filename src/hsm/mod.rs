//! Credential handling and the signature provider.
//!
//! The co-signer holds exactly one secp256k1 credential, supplied at
//! construction. Raw key bytes live in a zeroizing buffer and never appear in
//! `Debug` output or logs; only the derived address is exposed.

pub mod signer;

pub use signer::{payload_digest, SignatureProvider};

use core::fmt;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use zeroize::Zeroizing;

use crate::error::SigningError;

/// A private signing credential (secp256k1 secret key).
#[derive(Clone)]
pub struct Credential {
    secret: Zeroizing<[u8; 32]>,
}

impl Credential {
    /// Parse a hex-encoded 32-byte key, with or without `0x`.
    pub fn from_hex(input: &str) -> Result<Self, SigningError> {
        let trimmed = input.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = Zeroizing::new(
            hex::decode(digits).map_err(|e| SigningError::MalformedCredential(e.to_string()))?,
        );
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SigningError> {
        if bytes.len() != 32 {
            return Err(SigningError::MalformedCredential(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(bytes);
        let credential = Self { secret };
        // Reject scalars outside the curve order up front.
        credential.wallet()?;
        Ok(credential)
    }

    /// Address controlled by this credential.
    pub fn address(&self) -> Result<Address, SigningError> {
        Ok(self.wallet()?.address())
    }

    pub(crate) fn wallet(&self) -> Result<LocalWallet, SigningError> {
        LocalWallet::from_bytes(self.secret.as_ref())
            .map_err(|e| SigningError::MalformedCredential(e.to_string()))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address() {
            Ok(addr) => write!(f, "Credential({:?})", addr),
            Err(_) => f.write_str("Credential(<invalid>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_credential_parses_with_and_without_prefix() {
        let a = Credential::from_hex(KEY).unwrap();
        let b = Credential::from_hex(KEY.trim_start_matches("0x")).unwrap();
        assert_eq!(a.address().unwrap(), b.address().unwrap());
    }

    #[test]
    fn test_malformed_credentials() {
        assert!(matches!(Credential::from_hex("0xzz"), Err(SigningError::MalformedCredential(_))));
        assert!(matches!(
            Credential::from_hex("0x0102"),
            Err(SigningError::MalformedCredential(_))
        ));
        assert!(matches!(
            Credential::from_bytes(&[0u8; 32]),
            Err(SigningError::MalformedCredential(_))
        ));
    }

    #[test]
    fn test_debug_never_prints_secret() {
        let credential = Credential::from_hex(KEY).unwrap();
        let shown = format!("{:?}", credential);
        assert!(!shown.contains(KEY.trim_start_matches("0x")));
        assert!(shown.starts_with("Credential(0x"));
    }
}
