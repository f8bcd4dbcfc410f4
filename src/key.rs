use ed25519_dalek::SigningKey as Ed25519SigningKey;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::{OsRng, RngCore};

use crate::curve::{CURVE25519_KEY_LEN, Curve, ED25519_PRIVATE_KEY_LEN, P256_PRIVATE_KEY_LEN};
use crate::error::{CertError, Result};
use crate::pem_utils;

pub const X25519_PRIVATE_KEY_BANNER: &str = "NEBULA X25519 PRIVATE KEY";
pub const X25519_PUBLIC_KEY_BANNER: &str = "NEBULA X25519 PUBLIC KEY";
pub const P256_PRIVATE_KEY_BANNER: &str = "NEBULA P256 PRIVATE KEY";
pub const P256_PUBLIC_KEY_BANNER: &str = "NEBULA P256 PUBLIC KEY";
pub const ED25519_PRIVATE_KEY_BANNER: &str = "NEBULA ED25519 PRIVATE KEY";
pub const ED25519_PUBLIC_KEY_BANNER: &str = "NEBULA ED25519 PUBLIC KEY";
pub const ECDSA_P256_PRIVATE_KEY_BANNER: &str = "NEBULA ECDSA P256 PRIVATE KEY";
pub const ECDSA_P256_PUBLIC_KEY_BANNER: &str = "NEBULA ECDSA P256 PUBLIC KEY";

/// Supported key types for certificate operations.
///
/// CA certificates hold signing keys (Ed25519 or P-256), host certificates
/// hold key-exchange keys (X25519 or P-256).
pub enum KeyPair {
    Ed25519 { signing_key: Ed25519SigningKey },
    X25519 { secret: [u8; CURVE25519_KEY_LEN] },
    P256 { secret_key: p256::SecretKey },
}

/// What a key is used for, which decides its encoding and PEM banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    /// Signs certificates, held by CAs.
    Signing,
    /// Agrees on session keys, held by hosts.
    Exchange,
}

impl KeyPair {
    /// Generate an Ed25519 signing key pair.
    pub fn generate_ed25519() -> Self {
        let signing_key = Ed25519SigningKey::generate(&mut OsRng);
        KeyPair::Ed25519 { signing_key }
    }

    /// Generate an X25519 key-exchange key pair.
    pub fn generate_x25519() -> Self {
        let mut secret = [0u8; CURVE25519_KEY_LEN];
        OsRng.fill_bytes(&mut secret);
        KeyPair::X25519 { secret }
    }

    /// Generate a P-256 key pair, usable for both signing and key exchange.
    pub fn generate_p256() -> Self {
        KeyPair::P256 {
            secret_key: p256::SecretKey::random(&mut OsRng),
        }
    }

    /// Generate a key pair suitable for a CA on `curve`.
    pub fn generate_signing(curve: Curve) -> Self {
        match curve {
            Curve::Curve25519 => Self::generate_ed25519(),
            Curve::P256 => Self::generate_p256(),
        }
    }

    /// Generate a key pair suitable for a host on `curve`.
    pub fn generate_exchange(curve: Curve) -> Self {
        match curve {
            Curve::Curve25519 => Self::generate_x25519(),
            Curve::P256 => Self::generate_p256(),
        }
    }

    pub fn curve(&self) -> Curve {
        match self {
            KeyPair::Ed25519 { .. } | KeyPair::X25519 { .. } => Curve::Curve25519,
            KeyPair::P256 { .. } => Curve::P256,
        }
    }

    /// Raw public key bytes, as embedded in a certificate.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match self {
            KeyPair::Ed25519 { signing_key } => signing_key.verifying_key().to_bytes().to_vec(),
            KeyPair::X25519 { secret } => {
                x25519_dalek::x25519(*secret, x25519_dalek::X25519_BASEPOINT_BYTES).to_vec()
            }
            KeyPair::P256 { secret_key } => secret_key
                .public_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
        }
    }

    /// Raw private key bytes, in the form accepted by signing and
    /// verification.
    pub fn private_key_bytes(&self) -> Vec<u8> {
        match self {
            KeyPair::Ed25519 { signing_key } => signing_key.to_keypair_bytes().to_vec(),
            KeyPair::X25519 { secret } => secret.to_vec(),
            KeyPair::P256 { secret_key } => secret_key.to_bytes().to_vec(),
        }
    }
}

/// A raw key recovered from PEM together with what its banner said about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemKey {
    pub key: Vec<u8>,
    pub curve: Curve,
    pub role: KeyRole,
}

fn private_key_banner(curve: Curve, role: KeyRole) -> &'static str {
    match (role, curve) {
        (KeyRole::Exchange, Curve::Curve25519) => X25519_PRIVATE_KEY_BANNER,
        (KeyRole::Exchange, Curve::P256) => P256_PRIVATE_KEY_BANNER,
        (KeyRole::Signing, Curve::Curve25519) => ED25519_PRIVATE_KEY_BANNER,
        (KeyRole::Signing, Curve::P256) => ECDSA_P256_PRIVATE_KEY_BANNER,
    }
}

fn public_key_banner(curve: Curve, role: KeyRole) -> &'static str {
    match (role, curve) {
        (KeyRole::Exchange, Curve::Curve25519) => X25519_PUBLIC_KEY_BANNER,
        (KeyRole::Exchange, Curve::P256) => P256_PUBLIC_KEY_BANNER,
        (KeyRole::Signing, Curve::Curve25519) => ED25519_PUBLIC_KEY_BANNER,
        (KeyRole::Signing, Curve::P256) => ECDSA_P256_PUBLIC_KEY_BANNER,
    }
}

fn private_key_len(curve: Curve, role: KeyRole) -> usize {
    match (role, curve) {
        (KeyRole::Signing, Curve::Curve25519) => ED25519_PRIVATE_KEY_LEN,
        (KeyRole::Exchange, Curve::Curve25519) => CURVE25519_KEY_LEN,
        (_, Curve::P256) => P256_PRIVATE_KEY_LEN,
    }
}

/// Armor a raw private key with the banner for its curve and role.
pub fn marshal_private_key_to_pem(curve: Curve, role: KeyRole, key: &[u8]) -> String {
    pem_utils::to_pem(private_key_banner(curve, role), key)
}

/// Armor a raw public key with the banner for its curve and role.
pub fn marshal_public_key_to_pem(curve: Curve, role: KeyRole, key: &[u8]) -> String {
    pem_utils::to_pem(public_key_banner(curve, role), key)
}

/// Decode the first PEM block as a private key, checking its length.
pub fn unmarshal_private_key_from_pem(pem: &str) -> Result<PemKey> {
    let (banner, key) = pem_utils::from_pem(pem)?;
    let (curve, role) = match banner.as_str() {
        X25519_PRIVATE_KEY_BANNER => (Curve::Curve25519, KeyRole::Exchange),
        P256_PRIVATE_KEY_BANNER => (Curve::P256, KeyRole::Exchange),
        ED25519_PRIVATE_KEY_BANNER => (Curve::Curve25519, KeyRole::Signing),
        ECDSA_P256_PRIVATE_KEY_BANNER => (Curve::P256, KeyRole::Signing),
        other => return Err(CertError::UnexpectedPemBanner(other.to_string())),
    };

    let expected = private_key_len(curve, role);
    if key.len() != expected {
        return Err(CertError::InvalidPrivateKey {
            curve,
            reason: format!("key was not {expected} bytes, is {}", key.len()),
        });
    }
    Ok(PemKey { key, curve, role })
}

/// Decode the first PEM block as a public key, checking its length.
pub fn unmarshal_public_key_from_pem(pem: &str) -> Result<PemKey> {
    let (banner, key) = pem_utils::from_pem(pem)?;
    let (curve, role) = match banner.as_str() {
        X25519_PUBLIC_KEY_BANNER => (Curve::Curve25519, KeyRole::Exchange),
        P256_PUBLIC_KEY_BANNER => (Curve::P256, KeyRole::Exchange),
        ED25519_PUBLIC_KEY_BANNER => (Curve::Curve25519, KeyRole::Signing),
        ECDSA_P256_PUBLIC_KEY_BANNER => (Curve::P256, KeyRole::Signing),
        other => return Err(CertError::UnexpectedPemBanner(other.to_string())),
    };

    let expected = curve.public_key_len();
    if key.len() != expected {
        return Err(CertError::InvalidPublicKey {
            curve,
            reason: format!("key was not {expected} bytes, is {}", key.len()),
        });
    }
    Ok(PemKey { key, curve, role })
}
