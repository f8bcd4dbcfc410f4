#![allow(dead_code)]

use meshcert::cert::Certificate;
use meshcert::curve::Curve;
use meshcert::key::KeyPair;
use meshcert::network::Network;
use meshcert::tbs_certificate::TbsCertificate;
use time::OffsetDateTime;
use time::macros::datetime;

pub const CA_NOT_BEFORE: OffsetDateTime = datetime!(2024-01-01 00:00 UTC);
pub const CA_NOT_AFTER: OffsetDateTime = datetime!(2034-01-01 00:00 UTC);
pub const HOST_NOT_BEFORE: OffsetDateTime = datetime!(2024-06-01 00:00 UTC);
pub const HOST_NOT_AFTER: OffsetDateTime = datetime!(2025-06-01 00:00 UTC);

pub struct CertificateWithPrivateKey {
    pub cert: Certificate,
    pub key: KeyPair,
}

pub fn net(s: &str) -> Network {
    s.parse().expect("valid network")
}

pub fn nets(list: &[&str]) -> Vec<Network> {
    list.iter().map(|s| net(s)).collect()
}

pub fn groups(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn ca_tbs(curve: Curve, key: &KeyPair) -> TbsCertificate {
    TbsCertificate::builder()
        .name("myca.local")
        .is_ca(true)
        .curve(curve)
        .not_before(CA_NOT_BEFORE)
        .not_after(CA_NOT_AFTER)
        .public_key(key.public_key_bytes())
        .build()
}

pub fn generate_ca_cert(curve: Curve) -> CertificateWithPrivateKey {
    generate_restricted_ca_cert(curve, vec![], vec![], vec![])
}

pub fn generate_restricted_ca_cert(
    curve: Curve,
    groups: Vec<String>,
    networks: Vec<Network>,
    unsafe_networks: Vec<Network>,
) -> CertificateWithPrivateKey {
    let key = KeyPair::generate_signing(curve);
    let mut tbs = ca_tbs(curve, &key);
    tbs.groups = groups;
    tbs.networks = networks;
    tbs.unsafe_networks = unsafe_networks;

    let cert = tbs
        .sign(None, curve, &key.private_key_bytes())
        .expect("CA should self-sign");
    CertificateWithPrivateKey { cert, key }
}

pub fn host_tbs(curve: Curve, key: &KeyPair) -> TbsCertificate {
    TbsCertificate::builder()
        .name("server.myca.local")
        .networks(nets(&["10.1.0.5/16"]))
        .groups(groups(&["servers"]))
        .curve(curve)
        .not_before(HOST_NOT_BEFORE)
        .not_after(HOST_NOT_AFTER)
        .public_key(key.public_key_bytes())
        .build()
}

pub fn issue(ca: &CertificateWithPrivateKey, tbs: TbsCertificate) -> meshcert::error::Result<Certificate> {
    let curve = ca.cert.curve();
    tbs.sign(Some(&ca.cert), curve, &ca.key.private_key_bytes())
}

pub fn generate_host_cert(ca: &CertificateWithPrivateKey) -> (Certificate, KeyPair) {
    let key = KeyPair::generate_exchange(ca.cert.curve());
    let cert = issue(ca, host_tbs(ca.cert.curve(), &key)).expect("host should be issued");
    (cert, key)
}
