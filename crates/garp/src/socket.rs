//! Raw packet socket for ARP transmission.
//!
//! Sends pre-assembled Ethernet frames out of a specific interface via an
//! AF_PACKET socket. Requires CAP_NET_RAW.

use crate::packet::BROADCAST;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::os::fd::AsRawFd;

/// Packet socket bound to one interface for ARP sends.
pub struct ArpSocket {
    socket: Socket,
    ifindex: u32,
}

impl ArpSocket {
    /// Create a packet socket for the given interface index.
    pub fn new(ifindex: u32) -> io::Result<Self> {
        // The AF_PACKET protocol field is in network byte order.
        let protocol = (libc::ETH_P_ARP as u16).to_be() as i32;
        let socket = Socket::new(Domain::PACKET, Type::RAW, Some(Protocol::from(protocol)))?;

        Ok(Self { socket, ifindex })
    }

    /// Broadcast a raw Ethernet frame out of the bound interface.
    pub fn send(&self, frame: &[u8]) -> io::Result<usize> {
        let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        addr.sll_family = libc::AF_PACKET as libc::c_ushort;
        addr.sll_protocol = (libc::ETH_P_ARP as u16).to_be();
        addr.sll_ifindex = self.ifindex as libc::c_int;
        addr.sll_halen = 6;
        addr.sll_addr[..6].copy_from_slice(&BROADCAST);

        let sent = unsafe {
            libc::sendto(
                self.socket.as_raw_fd(),
                frame.as_ptr() as *const libc::c_void,
                frame.len(),
                0,
                &addr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };

        if sent < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(sent as usize)
    }
}
