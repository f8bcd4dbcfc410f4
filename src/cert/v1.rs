//! Version 1 certificates.
//!
//! The wire format is a protobuf message. Networks are flattened into pairs of
//! big-endian IPv4 address and netmask integers, timestamps are Unix seconds
//! and the issuer fingerprint is carried as raw bytes.

use std::fmt;
use std::net::IpAddr;

use prost::Message;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::{trace, warn};

use super::{BeingSignedCertificate, CERTIFICATE_BANNER, Certificate, Version};
use crate::curve::Curve;
use crate::error::{CertError, Result};
use crate::network::{Network, mask_to_prefix_u32, prefix_to_mask_u32};
use crate::pem_utils;
use crate::tbs_certificate::TbsCertificate;

/// Outer envelope of a version 1 certificate.
#[derive(Clone, PartialEq, Message)]
pub struct RawCertificate {
    #[prost(message, optional, tag = "1")]
    pub details: Option<RawCertificateDetails>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

/// The signed section of a version 1 certificate.
#[derive(Clone, PartialEq, Message)]
pub struct RawCertificateDetails {
    #[prost(string, tag = "1")]
    pub name: String,
    /// Network address and netmask pairs.
    #[prost(uint32, repeated, tag = "2")]
    pub ips: Vec<u32>,
    /// Unsafe network address and netmask pairs.
    #[prost(uint32, repeated, tag = "3")]
    pub subnets: Vec<u32>,
    #[prost(string, repeated, tag = "4")]
    pub groups: Vec<String>,
    #[prost(int64, tag = "5")]
    pub not_before: i64,
    #[prost(int64, tag = "6")]
    pub not_after: i64,
    #[prost(bytes = "vec", tag = "7")]
    pub public_key: Vec<u8>,
    #[prost(bool, tag = "8")]
    pub is_ca: bool,
    /// SHA-256 of the issuing certificate.
    #[prost(bytes = "vec", tag = "9")]
    pub issuer: Vec<u8>,
    #[prost(int32, tag = "100")]
    pub curve: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DetailsV1 {
    name: String,
    networks: Vec<Network>,
    unsafe_networks: Vec<Network>,
    groups: Vec<String>,
    /// Unix seconds as encoded, so any value on the wire re-encodes as is.
    not_before: i64,
    not_after: i64,
    public_key: Vec<u8>,
    is_ca: bool,
    issuer: String,
    curve: Curve,
}

/// A version 1 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateV1 {
    details: DetailsV1,
    signature: Vec<u8>,
}

impl CertificateV1 {
    pub fn curve(&self) -> Curve {
        self.details.curve
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn networks(&self) -> &[Network] {
        &self.details.networks
    }

    pub fn unsafe_networks(&self) -> &[Network] {
        &self.details.unsafe_networks
    }

    pub fn groups(&self) -> &[String] {
        &self.details.groups
    }

    pub fn is_ca(&self) -> bool {
        self.details.is_ca
    }

    pub fn issuer(&self) -> &str {
        &self.details.issuer
    }

    pub fn not_before(&self) -> OffsetDateTime {
        from_unix(self.details.not_before)
    }

    pub fn not_after(&self) -> OffsetDateTime {
        from_unix(self.details.not_after)
    }

    pub fn public_key(&self) -> &[u8] {
        &self.details.public_key
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn fingerprint(&self) -> Result<String> {
        let bytes = self.marshal()?;
        Ok(hex::encode(Sha256::digest(bytes)))
    }

    pub fn check_signature(&self, public_key: &[u8]) -> bool {
        match self.marshal_for_signing() {
            Ok(bytes) => self.details.curve.verify(&bytes, public_key, &self.signature),
            Err(_) => false,
        }
    }

    pub fn expired(&self, at: OffsetDateTime) -> bool {
        self.not_before() > at || self.not_after() < at
    }

    /// CA certificates carry a signing key, everything else carries a
    /// key-exchange key, so the public value is derived accordingly.
    pub fn verify_private_key(&self, curve: Curve, private_key: &[u8]) -> Result<()> {
        if curve != self.details.curve {
            return Err(CertError::CurveMismatch {
                expected: self.details.curve,
                actual: curve,
            });
        }

        let public_key = if self.details.is_ca {
            curve.signing_public_key(private_key)?
        } else {
            curve.exchange_public_key(private_key)?
        };

        if public_key != self.details.public_key {
            return Err(CertError::PublicKeyMismatch);
        }
        Ok(())
    }

    pub fn marshal(&self) -> Result<Vec<u8>> {
        self.marshal_with(true)
    }

    pub fn marshal_for_handshakes(&self) -> Result<Vec<u8>> {
        self.marshal_with(false)
    }

    pub fn marshal_pem(&self) -> Result<String> {
        Ok(pem_utils::to_pem(CERTIFICATE_BANNER, &self.marshal()?))
    }

    fn marshal_with(&self, include_public_key: bool) -> Result<Vec<u8>> {
        let raw = RawCertificate {
            details: Some(self.raw_details(include_public_key)?),
            signature: self.signature.clone(),
        };
        Ok(raw.encode_to_vec())
    }

    fn raw_details(&self, include_public_key: bool) -> Result<RawCertificateDetails> {
        let issuer = hex::decode(&self.details.issuer)
            .map_err(|e| CertError::Encoding(format!("issuer is not a hex fingerprint: {e}")))?;

        Ok(RawCertificateDetails {
            name: self.details.name.clone(),
            ips: flatten_networks(&self.details.networks)?,
            subnets: flatten_networks(&self.details.unsafe_networks)?,
            groups: self.details.groups.clone(),
            not_before: self.details.not_before,
            not_after: self.details.not_after,
            public_key: if include_public_key {
                self.details.public_key.clone()
            } else {
                Vec::new()
            },
            is_ca: self.details.is_ca,
            issuer,
            curve: self.details.curve.tag(),
        })
    }

    /// Decodes a version 1 certificate.
    ///
    /// A non-empty `public_key` replaces whatever key the encoding carries,
    /// which is how certificates sent without their key are restored.
    /// Unsafe networks keep their encoded order.
    pub fn unmarshal(bytes: &[u8], public_key: Option<&[u8]>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(CertError::EmptyInput);
        }

        let raw = RawCertificate::decode(bytes)?;
        let details = raw.details.ok_or(CertError::MissingDetails)?;

        if details.ips.len() % 2 != 0 {
            return Err(CertError::OddNetworkPairs("ips"));
        }
        if details.subnets.len() % 2 != 0 {
            return Err(CertError::OddNetworkPairs("subnets"));
        }

        let curve = Curve::try_from(details.curve)?;
        let public_key = match public_key {
            Some(key) if !key.is_empty() => key.to_vec(),
            _ => details.public_key,
        };

        trace!(
            name = %details.name,
            %curve,
            networks = details.ips.len() / 2,
            unsafe_networks = details.subnets.len() / 2,
            "decoded v1 certificate"
        );

        Ok(CertificateV1 {
            details: DetailsV1 {
                name: details.name,
                networks: unflatten_networks(&details.ips)?,
                unsafe_networks: unflatten_networks(&details.subnets)?,
                groups: details.groups,
                not_before: details.not_before,
                not_after: details.not_after,
                public_key,
                is_ca: details.is_ca,
                issuer: hex::encode(details.issuer),
                curve,
            },
            signature: raw.signature,
        })
    }
}

impl BeingSignedCertificate for CertificateV1 {
    fn from_tbs(tbs: TbsCertificate) -> Self {
        CertificateV1 {
            details: DetailsV1 {
                name: tbs.name,
                networks: tbs.networks,
                unsafe_networks: tbs.unsafe_networks,
                groups: tbs.groups,
                not_before: tbs.not_before.unix_timestamp(),
                not_after: tbs.not_after.unix_timestamp(),
                public_key: tbs.public_key,
                is_ca: tbs.is_ca,
                issuer: tbs.issuer,
                curve: tbs.curve,
            },
            signature: Vec::new(),
        }
    }

    fn marshal_for_signing(&self) -> Result<Vec<u8>> {
        Ok(self.raw_details(true)?.encode_to_vec())
    }

    fn seal(mut self, signature: Vec<u8>) -> Certificate {
        self.signature = signature;
        Certificate::V1(self)
    }
}

fn flatten_networks(networks: &[Network]) -> Result<Vec<u32>> {
    let mut flat = Vec::with_capacity(networks.len() * 2);
    for network in networks {
        let (addr, prefix_len) = match network.addr() {
            IpAddr::V4(addr) => (addr, network.prefix_len()),
            IpAddr::V6(addr) => match addr.to_ipv4_mapped() {
                Some(addr) => (addr, network.prefix_len().saturating_sub(96)),
                None => {
                    return Err(CertError::Encoding(format!(
                        "v1 certificates only support IPv4 networks, found {network}"
                    )));
                }
            },
        };
        flat.push(u32::from(addr));
        flat.push(prefix_to_mask_u32(prefix_len));
    }
    Ok(flat)
}

fn unflatten_networks(flat: &[u32]) -> Result<Vec<Network>> {
    flat.chunks_exact(2)
        .map(|pair| {
            let prefix_len = mask_to_prefix_u32(pair[1]).unwrap_or_else(|| {
                warn!(mask = pair[1], "non-contiguous netmask, using prefix length 0");
                0
            });
            Network::new(IpAddr::from(std::net::Ipv4Addr::from(pair[0])), prefix_len)
        })
        .collect()
}

/// Converts encoded Unix seconds, clamping values `OffsetDateTime` cannot
/// represent to its range.
fn from_unix(seconds: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(seconds).unwrap_or_else(|_| {
        warn!(seconds, "timestamp out of range, clamping");
        if seconds < 0 {
            PrimitiveDateTime::MIN.assume_utc()
        } else {
            PrimitiveDateTime::MAX.assume_utc()
        }
    })
}

#[derive(Serialize)]
struct CertificateJson<'a> {
    version: u8,
    details: DetailsJson<'a>,
    fingerprint: String,
    signature: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailsJson<'a> {
    name: &'a str,
    networks: &'a [Network],
    unsafe_networks: &'a [Network],
    groups: &'a [String],
    #[serde(serialize_with = "rfc3339")]
    not_before: OffsetDateTime,
    #[serde(serialize_with = "rfc3339")]
    not_after: OffsetDateTime,
    public_key: String,
    is_ca: bool,
    issuer: &'a str,
    curve: String,
}

/// RFC 3339 where the year fits, Unix seconds otherwise.
fn rfc3339<S: Serializer>(
    at: &OffsetDateTime,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match at.format(&Rfc3339) {
        Ok(formatted) => serializer.serialize_str(&formatted),
        Err(_) => serializer.collect_str(&at.unix_timestamp()),
    }
}

impl Serialize for CertificateV1 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        CertificateJson {
            version: Version::V1.as_u8(),
            details: DetailsJson {
                name: &self.details.name,
                networks: &self.details.networks,
                unsafe_networks: &self.details.unsafe_networks,
                groups: &self.details.groups,
                not_before: self.not_before(),
                not_after: self.not_after(),
                public_key: hex::encode(&self.details.public_key),
                is_ca: self.details.is_ca,
                issuer: &self.details.issuer,
                curve: self.details.curve.to_string(),
            },
            fingerprint: self.fingerprint().unwrap_or_default(),
            signature: hex::encode(&self.signature),
        }
        .serialize(serializer)
    }
}

impl fmt::Display for CertificateV1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        if self.serialize(&mut serializer).is_err() {
            return f.write_str("<error marshalling certificate>");
        }
        f.write_str(&String::from_utf8_lossy(&out))
    }
}
