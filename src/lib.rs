//! # meshcert - Peer Certificates for Mesh Overlay Networks
//!
//! meshcert implements the certificates peers of an encrypted mesh overlay
//! present to each other during handshakes. A certificate binds a name, the
//! overlay addresses a host owns, the networks it may route for others and a
//! set of groups to a public key, and is signed by a CA that the rest of the
//! network trusts.
//!
//! ## Supported Curves
//!
//! - **Curve25519**: Ed25519 signatures for CAs, X25519 keys for hosts
//! - **P-256**: ECDSA over SHA-256 for CAs, ECDH keys for hosts
//!
//! ## Supported Formats
//!
//! - **Binary**: the protobuf encoding exchanged during handshakes
//! - **PEM**: the binary encoding armored as `NEBULA CERTIFICATE`
//! - **JSON**: a read-only rendering for inspection
//!
//! ## Quick Start
//!
//! ### Creating a CA and Issuing a Host Certificate
//!
//! ```rust
//! use meshcert::{
//!     cert::Certificate,
//!     curve::Curve,
//!     key::KeyPair,
//!     network::Network,
//!     tbs_certificate::TbsCertificate,
//! };
//! use time::{Duration, OffsetDateTime};
//!
//! # fn main() -> Result<(), meshcert::error::CertError> {
//! let now = OffsetDateTime::now_utc();
//!
//! // CAs sign with Ed25519 on Curve25519
//! let ca_key = KeyPair::generate_signing(Curve::Curve25519);
//! let ca = TbsCertificate::builder()
//!     .name("example ca")
//!     .is_ca(true)
//!     .groups(vec!["servers".to_string()])
//!     .not_before(now)
//!     .not_after(now + Duration::days(365))
//!     .public_key(ca_key.public_key_bytes())
//!     .build()
//!     .sign(None, Curve::Curve25519, &ca_key.private_key_bytes())?;
//!
//! // Hosts carry an X25519 key-exchange key
//! let host_key = KeyPair::generate_exchange(Curve::Curve25519);
//! let host = TbsCertificate::builder()
//!     .name("web-1")
//!     .networks(vec!["10.1.0.5/16".parse::<Network>()?])
//!     .groups(vec!["servers".to_string()])
//!     .not_before(now)
//!     .not_after(now + Duration::days(30))
//!     .public_key(host_key.public_key_bytes())
//!     .build()
//!     .sign(Some(&ca), Curve::Curve25519, &ca_key.private_key_bytes())?;
//!
//! assert!(host.check_signature(ca.public_key()));
//! assert_eq!(host.issuer(), ca.fingerprint()?);
//!
//! // Ship it as PEM and read it back
//! let pem = host.marshal_pem()?;
//! assert_eq!(Certificate::unmarshal_from_pem(&pem)?, host);
//! # Ok(())
//! # }
//! ```
//!
//! ### Signing with a Hardware Token
//!
//! Anything that turns bytes into a signature can sign, as long as it is a
//! [`signer::SignerPredicate`]. Hardware tokens are supported on P-256 only.
//!
//! ```rust
//! use meshcert::{curve::Curve, key::KeyPair, signer::{LocalSigner, SignerError, SignerPredicate},
//!     tbs_certificate::TbsCertificate};
//! use time::{Duration, OffsetDateTime};
//!
//! # fn main() -> Result<(), meshcert::error::CertError> {
//! let token_key = KeyPair::generate_p256();
//! let token = LocalSigner::from_private_key(Curve::P256, &token_key.private_key_bytes())?;
//! let hsm = |message: &[u8]| -> Result<Vec<u8>, SignerError> { token.sign(message) };
//!
//! let now = OffsetDateTime::now_utc();
//! let ca = TbsCertificate::builder()
//!     .name("token ca")
//!     .is_ca(true)
//!     .curve(Curve::P256)
//!     .not_before(now)
//!     .not_after(now + Duration::days(365))
//!     .public_key(token_key.public_key_bytes())
//!     .build()
//!     .sign_with_hardware_token(None, Curve::P256, Some(&hsm))?;
//!
//! assert!(ca.check_signature(&token_key.public_key_bytes()));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`error::CertError`]. Signature checks are
//! the exception: [`cert::Certificate::check_signature`] answers `false` for
//! any failure.
//!
//! ```rust
//! use meshcert::{cert::Certificate, error::CertError};
//!
//! match Certificate::unmarshal(&[]) {
//!     Ok(_) => unreachable!(),
//!     Err(CertError::EmptyInput) => println!("nothing to decode"),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`cert`]: Sealed certificates, the version 1 codec and CA constraints
//! - [`tbs_certificate`]: Building and signing certificates
//! - [`signer`]: Signing capabilities, local keys and external signers
//! - [`curve`]: Curve identifiers and signature verification
//! - [`key`]: Key generation and key PEM armor
//! - [`network`]: Address and prefix values
//! - [`error`]: Error types

pub mod cert;
pub mod curve;
pub mod error;
pub mod key;
pub mod network;
pub mod pem_utils;
pub mod signer;
pub mod tbs_certificate;
