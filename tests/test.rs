mod util;

use std::cell::Cell;

use meshcert::cert::v1::RawCertificate;
use meshcert::cert::{Certificate, Version};
use meshcert::curve::Curve;
use meshcert::error::{CertError, ConstraintError};
use meshcert::key::KeyPair;
use meshcert::signer::{LocalSigner, SignerError, SignerPredicate};
use prost::Message;
use time::Duration;
use util::{groups, net, nets};

pub type Result<T> = std::result::Result<T, CertError>;

const CURVES: [Curve; 2] = [Curve::Curve25519, Curve::P256];

/// A CA signs itself and declares no issuer.
#[test]
fn generate_ca_cert() -> Result<()> {
    for curve in CURVES {
        let ca = util::generate_ca_cert(curve);

        assert!(ca.cert.is_ca());
        assert_eq!(ca.cert.curve(), curve);
        assert_eq!(ca.cert.version(), Version::V1);
        assert_eq!(ca.cert.issuer(), "");
        assert!(ca.cert.check_signature(ca.cert.public_key()));
        ca.cert.verify_private_key(curve, &ca.key.private_key_bytes())?;
    }
    Ok(())
}

/// A host certificate names its CA by fingerprint.
#[test]
fn generate_server_cert() -> Result<()> {
    for curve in CURVES {
        let ca = util::generate_ca_cert(curve);
        let (server, server_key) = util::generate_host_cert(&ca);

        assert!(!server.is_ca());
        assert_eq!(server.name(), "server.myca.local");
        assert_eq!(server.issuer(), ca.cert.fingerprint()?);
        assert_eq!(server.public_key(), server_key.public_key_bytes());
        assert!(server.check_signature(ca.cert.public_key()));
        assert!(!server.check_signature(server.public_key()));
    }
    Ok(())
}

#[test]
fn self_signed_host_is_rejected() {
    let key = KeyPair::generate_ed25519();
    let mut tbs = util::ca_tbs(Curve::Curve25519, &key);
    tbs.is_ca = false;

    let err = tbs
        .sign(None, Curve::Curve25519, &key.private_key_bytes())
        .unwrap_err();
    assert!(matches!(err, CertError::SelfSignedNotCa));
}

#[test]
fn ca_signed_by_another_is_rejected() {
    let ca = util::generate_ca_cert(Curve::Curve25519);
    let other = KeyPair::generate_ed25519();

    let err = util::issue(&ca, util::ca_tbs(Curve::Curve25519, &other)).unwrap_err();
    assert!(matches!(err, CertError::CaSignedByIssuer));
}

#[test]
fn curve_mismatch_is_rejected() {
    let key = KeyPair::generate_p256();
    let tbs = util::ca_tbs(Curve::P256, &key);

    let err = tbs
        .sign(None, Curve::Curve25519, &key.private_key_bytes())
        .unwrap_err();
    assert!(matches!(
        err,
        CertError::CurveMismatch {
            expected: Curve::P256,
            actual: Curve::Curve25519
        }
    ));
}

#[test]
fn malformed_private_key_is_rejected() {
    let key = KeyPair::generate_ed25519();
    let tbs = util::ca_tbs(Curve::Curve25519, &key);

    let err = tbs.sign(None, Curve::Curve25519, &[0u8; 32]).unwrap_err();
    assert!(matches!(
        err,
        CertError::InvalidPrivateKey {
            curve: Curve::Curve25519,
            ..
        }
    ));
}

#[test]
fn version_two_is_not_signed() {
    let key = KeyPair::generate_ed25519();
    let mut tbs = util::ca_tbs(Curve::Curve25519, &key);
    tbs.version = Version::V2;

    let err = tbs
        .sign(None, Curve::Curve25519, &key.private_key_bytes())
        .unwrap_err();
    assert!(matches!(err, CertError::UnsupportedVersion(Version::V2)));
}

/// The details that were signed, without the signature.
fn signed_details(cert: &Certificate) -> Result<Vec<u8>> {
    let raw = RawCertificate::decode(cert.marshal()?.as_slice())?;
    Ok(raw.details.unwrap_or_default().encode_to_vec())
}

#[test]
fn networks_are_signed_in_canonical_order() -> Result<()> {
    for curve in CURVES {
        let ca = util::generate_ca_cert(curve);
        let host_key = KeyPair::generate_exchange(curve);

        let mut forward = util::host_tbs(curve, &host_key);
        forward.networks = nets(&["10.0.0.1/24", "10.0.0.1/8", "192.168.1.1/24"]);
        forward.unsafe_networks = nets(&["172.16.0.0/12", "10.200.0.0/16"]);

        let mut reversed = forward.clone();
        reversed.networks.reverse();
        reversed.unsafe_networks.reverse();

        let forward = util::issue(&ca, forward)?;
        let reversed = util::issue(&ca, reversed)?;

        assert_eq!(
            forward.networks(),
            nets(&["10.0.0.1/8", "10.0.0.1/24", "192.168.1.1/24"])
        );
        assert_eq!(
            forward.unsafe_networks(),
            nets(&["10.200.0.0/16", "172.16.0.0/12"])
        );
        // ECDSA signatures are randomized, so compare what was signed
        assert_eq!(signed_details(&forward)?, signed_details(&reversed)?);
        assert!(reversed.check_signature(ca.cert.public_key()));
    }

    // Ed25519 is deterministic, so identical payloads give identical bytes
    let ca = util::generate_ca_cert(Curve::Curve25519);
    let host_key = KeyPair::generate_x25519();
    let mut forward = util::host_tbs(Curve::Curve25519, &host_key);
    forward.networks = nets(&["10.0.0.1/24", "10.0.0.1/8"]);
    let mut reversed = forward.clone();
    reversed.networks.reverse();
    assert_eq!(
        util::issue(&ca, forward)?.marshal()?,
        util::issue(&ca, reversed)?.marshal()?
    );
    Ok(())
}

#[test]
fn sub_second_validity_is_truncated_before_constraints() -> Result<()> {
    let half_second = Duration::milliseconds(500);
    let ca_key = KeyPair::generate_ed25519();
    let mut ca_tbs = util::ca_tbs(Curve::Curve25519, &ca_key);
    ca_tbs.not_after = util::CA_NOT_AFTER + half_second;
    let ca = util::CertificateWithPrivateKey {
        cert: ca_tbs.sign(None, Curve::Curve25519, &ca_key.private_key_bytes())?,
        key: ca_key,
    };
    assert_eq!(ca.cert.not_after(), util::CA_NOT_AFTER);

    // same instant as the CA, which only keeps whole seconds
    let host_key = KeyPair::generate_x25519();
    let mut tbs = util::host_tbs(Curve::Curve25519, &host_key);
    tbs.not_before = util::HOST_NOT_BEFORE + half_second;
    tbs.not_after = util::CA_NOT_AFTER + half_second;
    let host = util::issue(&ca, tbs)?;

    assert_eq!(host.not_before(), util::HOST_NOT_BEFORE);
    assert_eq!(host.not_after(), util::CA_NOT_AFTER);
    Ok(())
}

#[test]
fn host_may_not_outlive_ca() {
    let ca = util::generate_ca_cert(Curve::Curve25519);
    let key = KeyPair::generate_x25519();

    let mut tbs = util::host_tbs(Curve::Curve25519, &key);
    tbs.not_after = util::CA_NOT_AFTER + Duration::seconds(1);
    let err = util::issue(&ca, tbs).unwrap_err();
    assert!(matches!(
        err,
        CertError::Constraint(ConstraintError::ExpiresAfterSigner)
    ));

    let mut tbs = util::host_tbs(Curve::Curve25519, &key);
    tbs.not_before = util::CA_NOT_BEFORE - Duration::seconds(1);
    let err = util::issue(&ca, tbs).unwrap_err();
    assert!(matches!(
        err,
        CertError::Constraint(ConstraintError::ValidBeforeSigner)
    ));

    let mut tbs = util::host_tbs(Curve::Curve25519, &key);
    tbs.not_before = util::CA_NOT_BEFORE;
    tbs.not_after = util::CA_NOT_AFTER;
    assert!(util::issue(&ca, tbs).is_ok());
}

#[test]
fn groups_are_limited_by_ca() {
    let key = KeyPair::generate_x25519();

    let restricted =
        util::generate_restricted_ca_cert(Curve::Curve25519, groups(&["servers", "db"]), vec![], vec![]);
    let mut tbs = util::host_tbs(Curve::Curve25519, &key);
    tbs.groups = groups(&["servers", "admins"]);
    let err = util::issue(&restricted, tbs).unwrap_err();
    assert!(matches!(
        err,
        CertError::Constraint(ConstraintError::GroupNotPermitted(ref g)) if g == "admins"
    ));

    let mut tbs = util::host_tbs(Curve::Curve25519, &key);
    tbs.groups = groups(&["db"]);
    assert!(util::issue(&restricted, tbs).is_ok());

    let unrestricted = util::generate_ca_cert(Curve::Curve25519);
    let mut tbs = util::host_tbs(Curve::Curve25519, &key);
    tbs.groups = groups(&["anything"]);
    assert!(util::issue(&unrestricted, tbs).is_ok());
}

#[test]
fn networks_are_limited_by_ca() {
    let key = KeyPair::generate_x25519();
    let ca = util::generate_restricted_ca_cert(
        Curve::Curve25519,
        vec![],
        nets(&["10.1.0.0/16"]),
        nets(&["192.168.0.0/16"]),
    );

    let mut tbs = util::host_tbs(Curve::Curve25519, &key);
    tbs.networks = nets(&["10.1.2.3/24"]);
    tbs.unsafe_networks = nets(&["192.168.10.0/24"]);
    assert!(util::issue(&ca, tbs).is_ok());

    let mut tbs = util::host_tbs(Curve::Curve25519, &key);
    tbs.networks = nets(&["10.2.0.1/16"]);
    let err = util::issue(&ca, tbs).unwrap_err();
    assert!(matches!(
        err,
        CertError::Constraint(ConstraintError::NetworkNotPermitted(n)) if n == net("10.2.0.1/16")
    ));

    // same address but a wider prefix than the CA allows
    let mut tbs = util::host_tbs(Curve::Curve25519, &key);
    tbs.networks = nets(&["10.1.0.1/8"]);
    let err = util::issue(&ca, tbs).unwrap_err();
    assert!(matches!(
        err,
        CertError::Constraint(ConstraintError::NetworkNotPermitted(_))
    ));

    let mut tbs = util::host_tbs(Curve::Curve25519, &key);
    tbs.networks = nets(&["10.1.0.1/16"]);
    tbs.unsafe_networks = nets(&["172.16.0.0/24"]);
    let err = util::issue(&ca, tbs).unwrap_err();
    assert!(matches!(
        err,
        CertError::Constraint(ConstraintError::UnsafeNetworkNotPermitted(_))
    ));
}

#[test]
fn duplicate_networks_are_rejected() {
    let ca = util::generate_ca_cert(Curve::Curve25519);
    let key = KeyPair::generate_x25519();

    let mut tbs = util::host_tbs(Curve::Curve25519, &key);
    tbs.networks = nets(&["10.1.0.5/16", "10.1.0.5/16"]);
    let err = util::issue(&ca, tbs).unwrap_err();
    assert!(matches!(
        err,
        CertError::Constraint(ConstraintError::DuplicateNetwork(_))
    ));

    let mut tbs = util::host_tbs(Curve::Curve25519, &key);
    tbs.unsafe_networks = nets(&["192.168.0.0/24", "192.168.0.0/24"]);
    let err = util::issue(&ca, tbs).unwrap_err();
    assert!(matches!(
        err,
        CertError::Constraint(ConstraintError::DuplicateUnsafeNetwork(_))
    ));
}

#[test]
fn hardware_token_signs_p256() -> Result<()> {
    let token_key = KeyPair::generate_p256();
    let token = LocalSigner::from_private_key(Curve::P256, &token_key.private_key_bytes())?;
    let calls = Cell::new(0);
    let hsm = |message: &[u8]| -> std::result::Result<Vec<u8>, SignerError> {
        calls.set(calls.get() + 1);
        token.sign(message)
    };

    let ca = util::ca_tbs(Curve::P256, &token_key).sign_with_hardware_token(
        None,
        Curve::P256,
        Some(&hsm),
    )?;

    assert_eq!(calls.get(), 1);
    assert!(ca.check_signature(&token_key.public_key_bytes()));
    Ok(())
}

#[test]
fn hardware_token_refuses_curve25519_without_calling_signer() {
    let key = KeyPair::generate_ed25519();
    let calls = Cell::new(0);
    let hsm = |_: &[u8]| -> std::result::Result<Vec<u8>, SignerError> {
        calls.set(calls.get() + 1);
        Ok(vec![0; 64])
    };

    let err = util::ca_tbs(Curve::Curve25519, &key)
        .sign_with_hardware_token(None, Curve::Curve25519, Some(&hsm))
        .unwrap_err();

    assert!(matches!(
        err,
        CertError::UnsupportedHardwareCurve(Curve::Curve25519)
    ));
    assert_eq!(calls.get(), 0);
}

#[test]
fn hardware_token_must_be_supplied() {
    let key = KeyPair::generate_p256();
    let err = util::ca_tbs(Curve::P256, &key)
        .sign_with_hardware_token(None, Curve::P256, None)
        .unwrap_err();
    assert!(matches!(err, CertError::MissingSigner));
}

#[test]
fn hardware_token_failure_is_propagated() {
    let key = KeyPair::generate_p256();
    let calls = Cell::new(0);
    let hsm = |_: &[u8]| -> std::result::Result<Vec<u8>, SignerError> {
        calls.set(calls.get() + 1);
        Err("token unplugged".into())
    };

    let err = util::ca_tbs(Curve::P256, &key)
        .sign_with_hardware_token(None, Curve::P256, Some(&hsm))
        .unwrap_err();

    match err {
        CertError::Signer(source) => assert_eq!(source.to_string(), "token unplugged"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(calls.get(), 1);
}

#[test]
fn issued_certificate_round_trips() -> Result<()> {
    let ca = util::generate_ca_cert(Curve::P256);
    let (server, _) = util::generate_host_cert(&ca);

    let decoded = Certificate::unmarshal(&server.marshal()?)?;
    assert_eq!(decoded, server);
    assert!(decoded.check_signature(ca.cert.public_key()));
    Ok(())
}
