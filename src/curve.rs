use std::fmt;

use ed25519_dalek::{Signature as Ed25519Signature, Verifier, VerifyingKey as Ed25519VerifyingKey};
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature as P256Signature, VerifyingKey as P256VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::{Digest, Sha256};

use crate::error::{CertError, Result};

/// Length of an Ed25519 private key: the 32 byte seed followed by the public key.
pub const ED25519_PRIVATE_KEY_LEN: usize = 64;
/// Length of Ed25519 and X25519 public keys and of X25519 private keys.
pub const CURVE25519_KEY_LEN: usize = 32;
/// Length of a raw P-256 scalar.
pub const P256_PRIVATE_KEY_LEN: usize = 32;
/// Length of an uncompressed SEC1 encoded P-256 point.
pub const P256_PUBLIC_KEY_LEN: usize = 65;

/// Elliptic curve a certificate and its keys belong to.
///
/// The discriminants are the tags used on the wire and must never change.
/// `Curve25519` covers Ed25519 signing keys (CA certificates) and X25519
/// key-exchange keys (host certificates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum Curve {
    #[default]
    Curve25519 = 0,
    P256 = 1,
}

impl Curve {
    /// The wire tag for this curve.
    pub fn tag(self) -> i32 {
        self as i32
    }

    /// Expected length of a public key on this curve.
    pub fn public_key_len(self) -> usize {
        match self {
            Curve::Curve25519 => CURVE25519_KEY_LEN,
            Curve::P256 => P256_PUBLIC_KEY_LEN,
        }
    }

    /// Verifies `signature` over `message` with a raw public key.
    ///
    /// P-256 signatures are ASN.1 DER over the SHA-256 digest of the message,
    /// Ed25519 signatures cover the message directly. Malformed keys or
    /// signatures verify as `false`.
    pub fn verify(self, message: &[u8], public_key: &[u8], signature: &[u8]) -> bool {
        match self {
            Curve::Curve25519 => {
                let Ok(key) = <[u8; CURVE25519_KEY_LEN]>::try_from(public_key) else {
                    return false;
                };
                let Ok(key) = Ed25519VerifyingKey::from_bytes(&key) else {
                    return false;
                };
                let Ok(signature) = Ed25519Signature::from_slice(signature) else {
                    return false;
                };
                key.verify(message, &signature).is_ok()
            }
            Curve::P256 => {
                // only uncompressed points are valid certificate keys
                if public_key.len() != P256_PUBLIC_KEY_LEN || public_key[0] != 0x04 {
                    return false;
                }
                let Ok(key) = P256VerifyingKey::from_sec1_bytes(public_key) else {
                    return false;
                };
                let Ok(signature) = P256Signature::from_der(signature) else {
                    return false;
                };
                key.verify_prehash(&Sha256::digest(message), &signature)
                    .is_ok()
            }
        }
    }

    /// Derives the signing public key a CA certificate would carry for
    /// `private_key`.
    pub fn signing_public_key(self, private_key: &[u8]) -> Result<Vec<u8>> {
        match self {
            Curve::Curve25519 => {
                if private_key.len() != ED25519_PRIVATE_KEY_LEN {
                    return Err(CertError::InvalidPrivateKey {
                        curve: self,
                        reason: format!(
                            "key was not {ED25519_PRIVATE_KEY_LEN} bytes, is {}",
                            private_key.len()
                        ),
                    });
                }
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&private_key[..32]);
                let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
                Ok(signing_key.verifying_key().to_bytes().to_vec())
            }
            Curve::P256 => p256_public_key(private_key),
        }
    }

    /// Derives the key-exchange public value a host certificate would carry
    /// for `private_key`.
    pub fn exchange_public_key(self, private_key: &[u8]) -> Result<Vec<u8>> {
        match self {
            Curve::Curve25519 => {
                let scalar = <[u8; CURVE25519_KEY_LEN]>::try_from(private_key).map_err(|_| {
                    CertError::InvalidPrivateKey {
                        curve: self,
                        reason: format!(
                            "key was not {CURVE25519_KEY_LEN} bytes, is {}",
                            private_key.len()
                        ),
                    }
                })?;
                Ok(x25519_dalek::x25519(scalar, x25519_dalek::X25519_BASEPOINT_BYTES).to_vec())
            }
            Curve::P256 => p256_public_key(private_key),
        }
    }
}

fn p256_public_key(private_key: &[u8]) -> Result<Vec<u8>> {
    if private_key.len() != P256_PRIVATE_KEY_LEN {
        return Err(CertError::InvalidPrivateKey {
            curve: Curve::P256,
            reason: format!(
                "key was not {P256_PRIVATE_KEY_LEN} bytes, is {}",
                private_key.len()
            ),
        });
    }
    let secret = p256::SecretKey::from_slice(private_key).map_err(|e| {
        CertError::InvalidPrivateKey {
            curve: Curve::P256,
            reason: e.to_string(),
        }
    })?;
    Ok(secret
        .public_key()
        .to_encoded_point(false)
        .as_bytes()
        .to_vec())
}

impl TryFrom<i32> for Curve {
    type Error = CertError;

    fn try_from(tag: i32) -> Result<Self> {
        match tag {
            0 => Ok(Curve::Curve25519),
            1 => Ok(Curve::P256),
            other => Err(CertError::UnknownCurve(other)),
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Curve::Curve25519 => f.write_str("CURVE25519"),
            Curve::P256 => f.write_str("P256"),
        }
    }
}
