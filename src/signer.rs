//! Signing capabilities.
//!
//! The signing engine never touches private key material directly. It hands
//! the to-be-signed bytes to a [`SignerPredicate`], which is either a
//! [`LocalSigner`] holding an in-memory key or a caller supplied closure that
//! talks to a hardware token.

use ed25519_dalek::{Signature as Ed25519Signature, Signer, SigningKey as Ed25519SigningKey};
use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature as P256Signature, SigningKey as P256SigningKey};
use sha2::{Digest, Sha256};

use crate::curve::{Curve, ED25519_PRIVATE_KEY_LEN, P256_PRIVATE_KEY_LEN};
use crate::error::{CertError, Result};

/// Error type returned by signing capabilities. It is carried unchanged
/// inside [`CertError::Signer`].
pub type SignerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Turns to-be-signed bytes into a signature.
///
/// Implementations are called exactly once per signing attempt and are never
/// retried. Any closure of the shape `Fn(&[u8]) -> Result<Vec<u8>, SignerError>`
/// is a `SignerPredicate`.
pub trait SignerPredicate {
    fn sign(&self, message: &[u8]) -> std::result::Result<Vec<u8>, SignerError>;
}

impl<F> SignerPredicate for F
where
    F: Fn(&[u8]) -> std::result::Result<Vec<u8>, SignerError>,
{
    fn sign(&self, message: &[u8]) -> std::result::Result<Vec<u8>, SignerError> {
        self(message)
    }
}

/// A signing key held in memory.
pub enum LocalSigner {
    Ed25519(Ed25519SigningKey),
    P256(P256SigningKey),
}

impl LocalSigner {
    /// Parses raw private key bytes for `curve`.
    ///
    /// Ed25519 keys are the 64 byte seed and public key concatenation, P-256
    /// keys are the 32 byte scalar.
    pub fn from_private_key(curve: Curve, private_key: &[u8]) -> Result<Self> {
        match curve {
            Curve::Curve25519 => {
                let bytes = <&[u8; ED25519_PRIVATE_KEY_LEN]>::try_from(private_key).map_err(
                    |_| CertError::InvalidPrivateKey {
                        curve,
                        reason: format!(
                            "key was not {ED25519_PRIVATE_KEY_LEN} bytes, is {}",
                            private_key.len()
                        ),
                    },
                )?;
                let key = Ed25519SigningKey::from_keypair_bytes(bytes).map_err(|e| {
                    CertError::InvalidPrivateKey {
                        curve,
                        reason: e.to_string(),
                    }
                })?;
                Ok(LocalSigner::Ed25519(key))
            }
            Curve::P256 => {
                if private_key.len() != P256_PRIVATE_KEY_LEN {
                    return Err(CertError::InvalidPrivateKey {
                        curve,
                        reason: format!(
                            "key was not {P256_PRIVATE_KEY_LEN} bytes, is {}",
                            private_key.len()
                        ),
                    });
                }
                let key = P256SigningKey::from_slice(private_key).map_err(|e| {
                    CertError::InvalidPrivateKey {
                        curve,
                        reason: e.to_string(),
                    }
                })?;
                Ok(LocalSigner::P256(key))
            }
        }
    }

    pub fn curve(&self) -> Curve {
        match self {
            LocalSigner::Ed25519(_) => Curve::Curve25519,
            LocalSigner::P256(_) => Curve::P256,
        }
    }
}

impl SignerPredicate for LocalSigner {
    fn sign(&self, message: &[u8]) -> std::result::Result<Vec<u8>, SignerError> {
        match self {
            LocalSigner::Ed25519(signing_key) => {
                let signature: Ed25519Signature = signing_key.try_sign(message)?;
                Ok(signature.to_bytes().to_vec())
            }
            LocalSigner::P256(signing_key) => {
                // ECDSA signs the digest, not the message
                let signature: P256Signature = signing_key.sign_prehash(&Sha256::digest(message))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
        }
    }
}
