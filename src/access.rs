//! Per-credential source network restrictions.
//!
//! Each registered credential carries an [`AllowList`] of CIDR networks that updates for it may
//! originate from. An empty list means the credential is unrestricted.
use crate::error::Error;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::str::FromStr;

/// An ordered list of networks permitted to update a credential's TXT records.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct AllowList(Vec<IpNetwork>);

impl AllowList {
    /// Parse a list of CIDR strings, failing on the first invalid entry.
    ///
    /// IPv6 networks may be written with brackets (`[::1]/64`). Each network is canonicalized to
    /// its network address, so `10.0.0.1/24` becomes `10.0.0.0/24`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCidr`] naming the first entry that isn't `<address>/<prefix>`.
    pub fn parse<S: AsRef<str>>(cidrs: &[S]) -> Result<Self, Error> {
        cidrs
            .iter()
            .map(|cidr| parse_cidr(cidr.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// True when no network restriction applies.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }

    /// True if the list is empty, or `ip` is inside one of its networks.
    #[must_use]
    pub fn permits(&self, ip: IpAddr) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        let ip = canonical_ip(ip);
        self.0.iter().any(|network| network.contains(ip))
    }

    /// Check a set of candidate addresses, e.g. every hop listed in a forwarding header.
    ///
    /// With no candidates this only succeeds for an unrestricted list: a missing or empty header
    /// never bypasses a configured restriction. Otherwise any permitted candidate suffices.
    ///
    /// The addresses are trusted as given; only a proxy that overwrites the header should be
    /// allowed to reach the API when this mode is enabled.
    #[must_use]
    pub fn permits_any(&self, ips: &[IpAddr]) -> bool {
        if ips.is_empty() {
            return self.is_unrestricted();
        }
        ips.iter().any(|ip| self.permits(*ip))
    }
}

impl TryFrom<Vec<String>> for AllowList {
    type Error = Error;

    fn try_from(cidrs: Vec<String>) -> Result<Self, Self::Error> {
        Self::parse(&cidrs)
    }
}

impl From<AllowList> for Vec<String> {
    fn from(list: AllowList) -> Self {
        list.0.iter().map(ToString::to_string).collect()
    }
}

/// Parse the comma separated address list of a forwarding header such as `X-Forwarded-For`.
///
/// Entries are trimmed and empty entries dropped. Entries that aren't IP addresses are skipped.
#[must_use]
pub fn forwarded_addresses(header: &str) -> Vec<IpAddr> {
    header
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match IpAddr::from_str(&strip_brackets(entry)) {
            Ok(ip) => Some(ip),
            Err(_) => {
                tracing::debug!("ignoring unparseable forwarded address \"{entry}\"");
                None
            }
        })
        .collect()
}

fn parse_cidr(cidr: &str) -> Result<IpNetwork, Error> {
    let invalid = || Error::InvalidCidr(cidr.to_string());
    let stripped = strip_brackets(cidr);
    let (addr, prefix) = stripped.split_once('/').ok_or_else(invalid)?;
    let addr = IpAddr::from_str(addr).map_err(|_| invalid())?;
    let prefix = u8::from_str(prefix).map_err(|_| invalid())?;
    let network = IpNetwork::new(addr, prefix).map_err(|_| invalid())?;
    IpNetwork::new(network.network(), network.prefix()).map_err(|_| invalid())
}

fn strip_brackets(s: &str) -> String {
    s.replace(['[', ']'], "")
}

// Dual-stack listeners report IPv4 peers as IPv4-mapped IPv6 addresses.
fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        IpAddr::V4(_) => ip,
    }
}
