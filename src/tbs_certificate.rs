use bon::Builder;
use time::OffsetDateTime;
use tracing::debug;

use crate::cert::constraints::check_ca_constraints;
use crate::cert::{BeingSignedCertificate, Certificate, CertificateV1, Version};
use crate::curve::Curve;
use crate::error::{CertError, Result};
use crate::network::Network;
use crate::signer::{LocalSigner, SignerPredicate};

/// Represents a certificate intended to be signed.
///
/// A `TbsCertificate` carries no signature and has not been checked against
/// any issuer, so it must never be used as a [`Certificate`]. Signing consumes
/// it and either returns a sealed certificate or an error.
///
/// # Fields
/// * `version` - Wire format to produce, defaults to [`Version::V1`].
/// * `name` - Identity of the certificate holder.
/// * `networks` - Addresses the holder is authoritative for.
/// * `unsafe_networks` - Networks the holder may route for others.
/// * `groups` - Role tags.
/// * `is_ca` - Whether the certificate may issue others.
/// * `not_before` / `not_after` - Validity window, kept at second resolution.
/// * `public_key` - Raw public key bytes for `curve`.
/// * `curve` - Defaults to [`Curve::Curve25519`].
#[derive(Debug, Clone, Builder)]
pub struct TbsCertificate {
    #[builder(default)]
    pub version: Version,
    #[builder(into)]
    pub name: String,
    #[builder(default)]
    pub networks: Vec<Network>,
    #[builder(default)]
    pub unsafe_networks: Vec<Network>,
    #[builder(default)]
    pub groups: Vec<String>,
    #[builder(default)]
    pub is_ca: bool,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub public_key: Vec<u8>,
    #[builder(default)]
    pub curve: Curve,
    /// Fingerprint of the issuer, filled in while signing.
    #[builder(skip)]
    pub(crate) issuer: String,
}

impl TbsCertificate {
    /// Signs with an in-memory private key.
    ///
    /// Pass `None` as `issuer` to self-sign a CA. `private_key` is the 64 byte
    /// Ed25519 key for [`Curve::Curve25519`] or the 32 byte scalar for
    /// [`Curve::P256`].
    pub fn sign(
        self,
        issuer: Option<&Certificate>,
        curve: Curve,
        private_key: &[u8],
    ) -> Result<Certificate> {
        if curve != self.curve {
            return Err(CertError::CurveMismatch {
                expected: self.curve,
                actual: curve,
            });
        }
        let signer = LocalSigner::from_private_key(self.curve, private_key)?;
        self.sign_with_predicate(issuer, curve, &signer)
    }

    /// Signs through an external signer such as a hardware token.
    ///
    /// Only P-256 is supported on this path. The signer is never invoked for
    /// any other curve.
    pub fn sign_with_hardware_token(
        self,
        issuer: Option<&Certificate>,
        curve: Curve,
        signer: Option<&dyn SignerPredicate>,
    ) -> Result<Certificate> {
        let signer = signer.ok_or(CertError::MissingSigner)?;
        match self.curve {
            Curve::Curve25519 => Err(CertError::UnsupportedHardwareCurve(self.curve)),
            Curve::P256 => self.sign_with_predicate(issuer, curve, signer),
        }
    }

    /// Creates a sealed certificate as long as its details do not violate the
    /// constraints of `issuer`. A CA must be self-signed, so `issuer` must be
    /// `None` exactly when `is_ca` is set.
    pub fn sign_with_predicate(
        mut self,
        issuer: Option<&Certificate>,
        curve: Curve,
        signer: &dyn SignerPredicate,
    ) -> Result<Certificate> {
        if curve != self.curve {
            return Err(CertError::CurveMismatch {
                expected: self.curve,
                actual: curve,
            });
        }

        // the wire format only carries whole seconds
        self.not_before = whole_seconds(self.not_before);
        self.not_after = whole_seconds(self.not_after);

        match issuer {
            Some(issuer) => {
                if self.is_ca {
                    return Err(CertError::CaSignedByIssuer);
                }

                check_ca_constraints(
                    issuer,
                    self.not_before,
                    self.not_after,
                    &self.groups,
                    &self.networks,
                    &self.unsafe_networks,
                )?;

                self.issuer = issuer.fingerprint()?;
            }
            None => {
                if !self.is_ca {
                    return Err(CertError::SelfSignedNotCa);
                }
            }
        }

        self.networks.sort();
        self.unsafe_networks.sort();

        debug!(
            name = %self.name,
            version = %self.version,
            %curve,
            is_ca = self.is_ca,
            issuer = %self.issuer,
            "signing certificate"
        );

        match self.version {
            Version::V1 => seal::<CertificateV1>(self, signer),
            Version::V2 => Err(CertError::UnsupportedVersion(self.version)),
        }
    }
}

fn whole_seconds(at: OffsetDateTime) -> OffsetDateTime {
    at.replace_nanosecond(0).unwrap_or(at)
}

fn seal<C: BeingSignedCertificate>(
    tbs: TbsCertificate,
    signer: &dyn SignerPredicate,
) -> Result<Certificate> {
    let unsigned = C::from_tbs(tbs);
    let tbs_bytes = unsigned.marshal_for_signing()?;
    let signature = signer.sign(&tbs_bytes).map_err(CertError::Signer)?;
    Ok(unsigned.seal(signature))
}
