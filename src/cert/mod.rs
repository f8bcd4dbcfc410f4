pub mod constraints;
pub mod v1;

use std::fmt;
use std::net::IpAddr;

use serde::{Serialize, Serializer};
use time::OffsetDateTime;
use tracing::trace;

use crate::curve::Curve;
use crate::error::{CertError, Result};
use crate::network::Network;
use crate::pem_utils;
use crate::tbs_certificate::TbsCertificate;
pub use v1::CertificateV1;

/// PEM banner of a version 1 certificate.
pub const CERTIFICATE_BANNER: &str = "NEBULA CERTIFICATE";
/// PEM banner of a version 2 certificate.
pub const CERTIFICATE_V2_BANNER: &str = "NEBULA CERTIFICATE V2";

/// Certificate format version. The discriminants are the values used on the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Version {
    #[default]
    V1 = 1,
    V2 = 2,
}

impl Version {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Version {
    type Error = CertError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Version::V1),
            2 => Ok(Version::V2),
            other => Err(CertError::UnknownVersion(other)),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// The per-version half of the signing pipeline.
///
/// A version codec builds its unsigned representation from a
/// [`TbsCertificate`], produces the canonical bytes to sign, and finally
/// seals itself into a [`Certificate`] once the signature is known.
pub(crate) trait BeingSignedCertificate: Sized {
    fn from_tbs(tbs: TbsCertificate) -> Self;

    fn marshal_for_signing(&self) -> Result<Vec<u8>>;

    fn seal(self, signature: Vec<u8>) -> Certificate;
}

/// A signed, immutable certificate.
///
/// Values are produced either by signing a [`TbsCertificate`] or by decoding
/// bytes received from elsewhere, and expose no way to modify their contents.
/// `clone` produces a fully independent copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Certificate {
    V1(CertificateV1),
}

impl Certificate {
    /// Decodes a certificate from its binary encoding.
    pub fn unmarshal(bytes: &[u8]) -> Result<Self> {
        Ok(Certificate::V1(CertificateV1::unmarshal(bytes, None)?))
    }

    /// Decodes a certificate received during a handshake.
    ///
    /// Handshakes may omit the public key from the certificate bytes, in which
    /// case `public_key` supplies it. The decoded certificate must be on
    /// `curve`.
    pub fn unmarshal_from_handshake(
        version: Version,
        bytes: &[u8],
        public_key: &[u8],
        curve: Curve,
    ) -> Result<Self> {
        let cert = match version {
            Version::V1 => Certificate::V1(CertificateV1::unmarshal(bytes, Some(public_key))?),
            Version::V2 => return Err(CertError::UnsupportedVersion(version)),
        };

        if cert.curve() != curve {
            return Err(CertError::CurveMismatch {
                expected: curve,
                actual: cert.curve(),
            });
        }
        Ok(cert)
    }

    /// Decodes the first PEM block of `pem`.
    pub fn unmarshal_from_pem(pem: &str) -> Result<Self> {
        let (banner, contents) = pem_utils::from_pem(pem)?;
        Self::from_pem_block(&banner, &contents)
    }

    /// Decodes every certificate of a PEM bundle, in order.
    pub fn unmarshal_many_from_pem(pem: &str) -> Result<Vec<Self>> {
        pem_utils::from_pem_many(pem)?
            .iter()
            .map(|(banner, contents)| Self::from_pem_block(banner, contents))
            .collect()
    }

    fn from_pem_block(banner: &str, contents: &[u8]) -> Result<Self> {
        trace!(banner, len = contents.len(), "decoding certificate PEM block");
        match banner {
            CERTIFICATE_BANNER => Self::unmarshal(contents),
            CERTIFICATE_V2_BANNER => Err(CertError::UnsupportedVersion(Version::V2)),
            other => Err(CertError::UnexpectedPemBanner(other.to_string())),
        }
    }

    pub fn version(&self) -> Version {
        match self {
            Certificate::V1(_) => Version::V1,
        }
    }

    pub fn curve(&self) -> Curve {
        match self {
            Certificate::V1(c) => c.curve(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Certificate::V1(c) => c.name(),
        }
    }

    pub fn networks(&self) -> &[Network] {
        match self {
            Certificate::V1(c) => c.networks(),
        }
    }

    pub fn unsafe_networks(&self) -> &[Network] {
        match self {
            Certificate::V1(c) => c.unsafe_networks(),
        }
    }

    pub fn groups(&self) -> &[String] {
        match self {
            Certificate::V1(c) => c.groups(),
        }
    }

    pub fn is_ca(&self) -> bool {
        match self {
            Certificate::V1(c) => c.is_ca(),
        }
    }

    /// Hex fingerprint of the signing certificate, empty when self-signed.
    pub fn issuer(&self) -> &str {
        match self {
            Certificate::V1(c) => c.issuer(),
        }
    }

    pub fn not_before(&self) -> OffsetDateTime {
        match self {
            Certificate::V1(c) => c.not_before(),
        }
    }

    pub fn not_after(&self) -> OffsetDateTime {
        match self {
            Certificate::V1(c) => c.not_after(),
        }
    }

    pub fn public_key(&self) -> &[u8] {
        match self {
            Certificate::V1(c) => c.public_key(),
        }
    }

    pub fn signature(&self) -> &[u8] {
        match self {
            Certificate::V1(c) => c.signature(),
        }
    }

    /// Reports whether `addr` falls inside any of the certificate's networks.
    pub fn has_address(&self, addr: &IpAddr) -> bool {
        self.networks().iter().any(|n| n.contains(addr))
    }

    /// Lowercase hex SHA-256 of the binary encoding.
    pub fn fingerprint(&self) -> Result<String> {
        match self {
            Certificate::V1(c) => c.fingerprint(),
        }
    }

    /// Verifies the certificate signature with `public_key`.
    ///
    /// Every failure, including malformed keys, is reported as `false`.
    pub fn check_signature(&self, public_key: &[u8]) -> bool {
        match self {
            Certificate::V1(c) => c.check_signature(public_key),
        }
    }

    /// Reports whether `at` falls outside the validity window. Both bounds
    /// are inclusive.
    pub fn expired(&self, at: OffsetDateTime) -> bool {
        match self {
            Certificate::V1(c) => c.expired(at),
        }
    }

    /// Confirms that `private_key` belongs to the public key in this
    /// certificate.
    pub fn verify_private_key(&self, curve: Curve, private_key: &[u8]) -> Result<()> {
        match self {
            Certificate::V1(c) => c.verify_private_key(curve, private_key),
        }
    }

    pub fn marshal(&self) -> Result<Vec<u8>> {
        match self {
            Certificate::V1(c) => c.marshal(),
        }
    }

    /// Encodes the certificate without its public key, for handshakes where
    /// the key travels separately.
    pub fn marshal_for_handshakes(&self) -> Result<Vec<u8>> {
        match self {
            Certificate::V1(c) => c.marshal_for_handshakes(),
        }
    }

    pub fn marshal_pem(&self) -> Result<String> {
        match self {
            Certificate::V1(c) => c.marshal_pem(),
        }
    }

    /// A human readable JSON rendering, for inspection only.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for Certificate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Certificate::V1(c) => c.serialize(serializer),
        }
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Certificate::V1(c) => fmt::Display::fmt(c, f),
        }
    }
}
