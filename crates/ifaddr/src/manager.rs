//! VIP reconciliation against the kernel address table.

use crate::addr::{Ensure, LinkHandle, Release, VirtualAddress};
use crate::netlink::RouteSocket;
use common::{Error, Result};
use netlink_packet_core::{NLM_F_CREATE, NLM_F_EXCL};
use netlink_packet_route::RouteNetlinkMessage;
use netlink_packet_route::address::{AddressAttribute, AddressMessage};
use netlink_packet_route::link::{LinkAttribute, LinkMessage};
use tracing::{debug, info};

/// A point-in-time view of the VIP's presence on its interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Whether the VIP is currently bound to the interface.
    pub present: bool,
    /// The resolved interface.
    pub link: LinkHandle,
}

/// Manages the presence of one VIP on one interface.
///
/// All operations re-derive presence from a fresh kernel dump; no state
/// is cached across calls.
pub struct VipManager {
    vip: VirtualAddress,
    interface: String,
    socket: RouteSocket,
}

impl VipManager {
    /// Create a manager for the given CIDR address and interface name.
    ///
    /// The CIDR is parsed eagerly so a malformed address fails before any
    /// other subsystem is touched.
    pub fn new(vip: &str, interface: &str) -> Result<Self> {
        let vip = VirtualAddress::parse(vip)?;
        let socket = RouteSocket::new()
            .map_err(|e| Error::network(format!("failed to open rtnetlink socket: {e}")))?;

        Ok(Self {
            vip,
            interface: interface.to_string(),
            socket,
        })
    }

    /// The managed address.
    pub fn vip(&self) -> &VirtualAddress {
        &self.vip
    }

    /// Resolve the interface and report whether the VIP is bound to it.
    pub fn observe(&mut self) -> Result<Observation> {
        let link = self.resolve_link()?;
        let present = self.address_present(&link)?;
        Ok(Observation { present, link })
    }

    /// Add the VIP to the interface if it is absent.
    pub fn ensure(&mut self) -> Result<Ensure> {
        debug!("Ensuring IP address");
        let observation = self.observe()?;
        if observation.present {
            debug!("IP address already set");
            return Ok(Ensure::AlreadyPresent);
        }

        let message = self.vip.to_address_message(observation.link.index);
        self.socket
            .acked(
                RouteNetlinkMessage::NewAddress(message),
                NLM_F_CREATE | NLM_F_EXCL,
            )
            .map_err(|e| {
                Error::network(format!(
                    "failed to add {} to {}: {e}",
                    self.vip, self.interface
                ))
            })?;

        info!(vip = %self.vip, interface = %self.interface, "IP address set");
        Ok(Ensure::Added)
    }

    /// Remove the VIP from the interface if it is present.
    pub fn release(&mut self) -> Result<Release> {
        debug!("Releasing IP address");
        let observation = self.observe()?;
        if !observation.present {
            debug!("IP address not found");
            return Ok(Release::NotHeld);
        }

        let message = self.vip.to_address_message(observation.link.index);
        self.socket
            .acked(RouteNetlinkMessage::DelAddress(message), 0)
            .map_err(|e| {
                Error::network(format!(
                    "failed to remove {} from {}: {e}",
                    self.vip, self.interface
                ))
            })?;

        info!(vip = %self.vip, interface = %self.interface, "IP address released");
        Ok(Release::Released)
    }

    fn resolve_link(&mut self) -> Result<LinkHandle> {
        let links = self
            .socket
            .dump(RouteNetlinkMessage::GetLink(LinkMessage::default()))
            .map_err(|e| Error::config(format!("failed to enumerate links: {e}")))?;

        for message in links {
            let RouteNetlinkMessage::NewLink(link) = message else {
                continue;
            };

            let mut name = None;
            let mut mac = None;
            for attribute in &link.attributes {
                match attribute {
                    LinkAttribute::IfName(n) => name = Some(n.as_str()),
                    LinkAttribute::Address(bytes) if bytes.len() == 6 => {
                        let mut hw = [0u8; 6];
                        hw.copy_from_slice(bytes);
                        mac = Some(hw);
                    }
                    _ => {}
                }
            }

            if name == Some(self.interface.as_str()) {
                return Ok(LinkHandle {
                    name: self.interface.clone(),
                    index: link.header.index,
                    mac,
                });
            }
        }

        Err(Error::config(format!(
            "interface {} not found",
            self.interface
        )))
    }

    fn address_present(&mut self, link: &LinkHandle) -> Result<bool> {
        let addresses = self
            .socket
            .dump(RouteNetlinkMessage::GetAddress(AddressMessage::default()))
            .map_err(|e| Error::config(format!("failed to enumerate addresses: {e}")))?;

        for message in addresses {
            let RouteNetlinkMessage::NewAddress(address) = message else {
                continue;
            };

            if address.header.index != link.index
                || address.header.prefix_len != self.vip.prefix_len()
            {
                continue;
            }

            let matches_vip = address.attributes.iter().any(|attribute| {
                matches!(
                    attribute,
                    AddressAttribute::Local(ip) | AddressAttribute::Address(ip)
                        if *ip == self.vip.addr()
                )
            });
            if matches_vip {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
