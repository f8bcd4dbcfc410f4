use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{CertError, Result};

/// An IP address together with a prefix length, e.g. `10.1.2.3/24`.
///
/// Host bits are kept as given. The derived ordering sorts by address (all
/// IPv4 before IPv6) and then by prefix length, which is the canonical order
/// networks are signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Network {
    addr: IpAddr,
    prefix_len: u8,
}

impl Network {
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self> {
        if prefix_len > max_prefix_len(&addr) {
            return Err(CertError::InvalidNetwork(format!(
                "prefix length {prefix_len} is too long for {addr}"
            )));
        }
        Ok(Self { addr, prefix_len })
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Reports whether `addr` lies inside this network.
    pub fn contains(&self, addr: &IpAddr) -> bool {
        match (self.addr, addr) {
            (IpAddr::V4(net), IpAddr::V4(other)) => {
                let mask = prefix_to_mask_u32(self.prefix_len);
                u32::from(net) & mask == u32::from(*other) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(other)) => {
                let mask = if self.prefix_len == 0 {
                    0
                } else {
                    u128::MAX << (128 - u32::from(self.prefix_len))
                };
                u128::from(net) & mask == u128::from(*other) & mask
            }
            _ => false,
        }
    }

    /// Reports whether every address of `other` is also inside this network.
    pub fn covers(&self, other: &Network) -> bool {
        self.prefix_len <= other.prefix_len && self.contains(&other.addr)
    }
}

fn max_prefix_len(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Builds the IPv4 netmask with `prefix_len` leading ones.
pub(crate) fn prefix_to_mask_u32(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len.min(32)))
    }
}

/// Counts the leading ones of a netmask, or returns `None` when the ones are
/// not contiguous.
pub(crate) fn mask_to_prefix_u32(mask: u32) -> Option<u8> {
    let ones = mask.leading_ones();
    if mask.checked_shl(ones).unwrap_or(0) == 0 {
        Some(ones as u8)
    } else {
        None
    }
}

impl FromStr for Network {
    type Err = CertError;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, prefix_len) = s
            .split_once('/')
            .ok_or_else(|| CertError::InvalidNetwork(format!("missing prefix length in {s}")))?;
        let addr = addr
            .parse::<IpAddr>()
            .map_err(|e| CertError::InvalidNetwork(format!("{s}: {e}")))?;
        let prefix_len = prefix_len
            .parse::<u8>()
            .map_err(|e| CertError::InvalidNetwork(format!("{s}: {e}")))?;
        Network::new(addr, prefix_len)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl Serialize for Network {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
