//! Error types returned by certificate construction, encoding, signing and verification.

use thiserror::Error;

use crate::cert::Version;
use crate::curve::Curve;
use crate::network::Network;
use crate::signer::SignerError;

pub type Result<T> = std::result::Result<T, CertError>;

/// Represents errors that can occur while building, encoding, signing or
/// verifying certificates.
#[derive(Debug, Error)]
pub enum CertError {
    /// A curve tag that no supported algorithm maps to.
    #[error("invalid curve: {0}")]
    UnknownCurve(i32),

    /// A version number that is not part of the wire format.
    #[error("unknown certificate version: {0}")]
    UnknownVersion(u8),

    /// A known version for which no codec is available.
    #[error("certificate version {0} is not supported")]
    UnsupportedVersion(Version),

    /// The curve of the certificate and the supplied key or algorithm differ.
    #[error("curve in cert ({expected}) and key supplied ({actual}) don't match")]
    CurveMismatch { expected: Curve, actual: Curve },

    #[error("can not sign a CA certificate with another")]
    CaSignedByIssuer,

    #[error("self signed certificates must have is_ca set to true")]
    SelfSignedNotCa,

    /// The candidate certificate violates a constraint of its issuer.
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    #[error("nil byte array")]
    EmptyInput,

    #[error("encoded details were missing")]
    MissingDetails,

    /// A flattened address/mask list had an odd number of entries.
    #[error("encoded {0} should be in pairs, an odd number was found")]
    OddNetworkPairs(&'static str),

    #[error("failed to decode protobuf: {0}")]
    Protobuf(#[from] prost::DecodeError),

    /// Error during certificate encoding.
    #[error("failed to encode certificate: {0}")]
    Encoding(String),

    #[error("failed to decode PEM: {0}")]
    Pem(#[from] pem::PemError),

    #[error("unexpected PEM banner: {0}")]
    UnexpectedPemBanner(String),

    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    #[error("invalid {curve} private key: {reason}")]
    InvalidPrivateKey { curve: Curve, reason: String },

    #[error("invalid {curve} public key: {reason}")]
    InvalidPublicKey { curve: Curve, reason: String },

    #[error("public key in cert and private key supplied don't match")]
    PublicKeyMismatch,

    /// The signature primitive or an external signer failed.
    #[error("signing failed: {0}")]
    Signer(#[source] SignerError),

    #[error("an external signer must be supplied")]
    MissingSigner,

    #[error("only P256 is supported by hardware tokens, got {0}")]
    UnsupportedHardwareCurve(Curve),
}

/// Violations of the limits an issuing CA places on the certificates it signs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("certificate expires after signing certificate")]
    ExpiresAfterSigner,

    #[error("certificate is valid before the signing certificate")]
    ValidBeforeSigner,

    #[error("certificate contained a group not present on the signing ca: {0}")]
    GroupNotPermitted(String),

    #[error(
        "certificate contained a network assignment outside the limitations of the signing ca: {0}"
    )]
    NetworkNotPermitted(Network),

    #[error(
        "certificate contained an unsafe network assignment outside the limitations of the signing ca: {0}"
    )]
    UnsafeNetworkNotPermitted(Network),

    #[error("certificate contained a duplicate network: {0}")]
    DuplicateNetwork(Network),

    #[error("certificate contained a duplicate unsafe network: {0}")]
    DuplicateUnsafeNetwork(Network),
}
