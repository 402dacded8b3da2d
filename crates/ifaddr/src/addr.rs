//! Address and interface types.

use common::{Error, Result};
use netlink_packet_route::AddressFamily;
use netlink_packet_route::address::{AddressAttribute, AddressMessage};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A virtual IP address in CIDR form.
///
/// Only the parsed form exists; whether the address is bound to an
/// interface is a kernel fact queried through [`crate::VipManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    addr: IpAddr,
    prefix_len: u8,
}

impl VirtualAddress {
    /// Parse an address in CIDR notation, e.g. `192.168.0.254/32`.
    pub fn parse(s: &str) -> Result<Self> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| Error::config(format!("invalid CIDR {s:?}: missing prefix length")))?;

        let addr: IpAddr = addr
            .parse()
            .map_err(|_| Error::config(format!("invalid CIDR {s:?}: bad address")))?;

        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| Error::config(format!("invalid CIDR {s:?}: bad prefix length")))?;

        let max_prefix = if addr.is_ipv4() { 32 } else { 128 };
        if prefix_len > max_prefix {
            return Err(Error::config(format!(
                "invalid CIDR {s:?}: prefix length {prefix_len} exceeds {max_prefix}"
            )));
        }

        Ok(Self { addr, prefix_len })
    }

    /// The bare IP address.
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// The prefix length.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// The rtnetlink address family for this address.
    pub fn family(&self) -> AddressFamily {
        match self.addr {
            IpAddr::V4(_) => AddressFamily::Inet,
            IpAddr::V6(_) => AddressFamily::Inet6,
        }
    }

    /// Build the RTM_NEWADDR/RTM_DELADDR payload for this address on the
    /// given interface.
    pub(crate) fn to_address_message(&self, index: u32) -> AddressMessage {
        let mut message = AddressMessage::default();
        message.header.family = self.family();
        message.header.prefix_len = self.prefix_len;
        message.header.index = index;
        message.attributes.push(AddressAttribute::Local(self.addr));
        message.attributes.push(AddressAttribute::Address(self.addr));
        message
    }
}

impl FromStr for VirtualAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

/// A resolved network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkHandle {
    /// Interface name as configured.
    pub name: String,
    /// Kernel interface index.
    pub index: u32,
    /// Hardware address, when the link reports one.
    pub mac: Option<[u8; 6]>,
}

/// Outcome of reconciling toward "address present".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensure {
    /// The address was absent and has been added.
    Added,
    /// The address was already bound; nothing was done.
    AlreadyPresent,
}

/// Outcome of reconciling toward "address absent".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// The address was bound and has been removed.
    Released,
    /// The address was not bound; nothing was done.
    NotHeld,
}
