//! Netlink communication layer for address-table operations.
//!
//! Provides a blocking NETLINK_ROUTE socket with request sequencing, ack
//! handling for mutations, and multi-part collection for dumps.

use netlink_packet_core::{
    NLM_F_ACK, NLM_F_DUMP, NLM_F_REQUEST, NetlinkHeader, NetlinkMessage, NetlinkPayload,
};
use netlink_packet_route::RouteNetlinkMessage;
use netlink_sys::{Socket, SocketAddr, protocols::NETLINK_ROUTE};
use std::io::{self, ErrorKind};
use tracing::{debug, trace};

/// Large enough for a full kernel dump datagram.
const RECV_BUFFER_LEN: usize = 65536;

/// Netlink socket wrapper for rtnetlink operations.
pub struct RouteSocket {
    socket: Socket,
    sequence: u32,
}

impl RouteSocket {
    /// Create a route netlink socket connected to the kernel.
    pub fn new() -> io::Result<Self> {
        debug!("Creating rtnetlink socket");

        let mut socket = Socket::new(NETLINK_ROUTE)?;
        socket.bind(&SocketAddr::new(0, 0))?;
        socket.connect(&SocketAddr::new(0, 0))?;

        Ok(Self {
            socket,
            sequence: 0,
        })
    }

    /// Get the next sequence number.
    fn next_sequence(&mut self) -> u32 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }

    /// Send a request carrying the given payload and header flags.
    fn send_request(&mut self, payload: RouteNetlinkMessage, flags: u16) -> io::Result<()> {
        let mut header = NetlinkHeader::default();
        header.flags = flags;
        header.sequence_number = self.next_sequence();

        let mut message = NetlinkMessage::new(header, NetlinkPayload::from(payload));
        message.finalize();

        let mut buf = vec![0u8; message.buffer_len()];
        message.serialize(&mut buf);

        trace!("Sending netlink message: {:?}", message);
        self.socket.send(&buf, 0)?;
        Ok(())
    }

    /// Issue a dump request and collect every inner message until the
    /// kernel signals completion.
    pub fn dump(&mut self, payload: RouteNetlinkMessage) -> io::Result<Vec<RouteNetlinkMessage>> {
        self.send_request(payload, NLM_F_REQUEST | NLM_F_DUMP)?;

        let mut entries = Vec::new();
        loop {
            for message in self.receive()? {
                match message.payload {
                    NetlinkPayload::InnerMessage(inner) => entries.push(inner),
                    NetlinkPayload::Done(_) => return Ok(entries),
                    NetlinkPayload::Error(err) => return Err(error_to_io(err)),
                    _ => {}
                }
            }
        }
    }

    /// Issue an acked mutation request with additional header flags and
    /// wait for the kernel's acknowledgment.
    pub fn acked(&mut self, payload: RouteNetlinkMessage, flags: u16) -> io::Result<()> {
        self.send_request(payload, NLM_F_REQUEST | NLM_F_ACK | flags)?;

        loop {
            for message in self.receive()? {
                if let NetlinkPayload::Error(err) = message.payload {
                    // An error message with code zero is the ack.
                    return match err.code {
                        None => Ok(()),
                        Some(_) => Err(error_to_io(err)),
                    };
                }
            }
        }
    }

    /// Receive one datagram and split it into its netlink messages.
    fn receive(&mut self) -> io::Result<Vec<NetlinkMessage<RouteNetlinkMessage>>> {
        let mut buf = Vec::<u8>::with_capacity(RECV_BUFFER_LEN);
        let len = self.socket.recv(&mut buf, 0)?;

        let mut messages = Vec::new();
        let mut offset = 0;
        while offset < len {
            let message = NetlinkMessage::<RouteNetlinkMessage>::deserialize(&buf[offset..len])
                .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
            let length = message.header.length as usize;
            if length == 0 {
                break;
            }
            messages.push(message);
            offset += length;
        }

        trace!("Received {} netlink message(s)", messages.len());
        Ok(messages)
    }
}

/// Map a kernel error message to an io::Error carrying the errno.
fn error_to_io(err: netlink_packet_core::ErrorMessage) -> io::Error {
    match err.code {
        Some(code) => io::Error::from_raw_os_error(-code.get()),
        None => io::Error::other("netlink error without code"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netlink_packet_route::link::LinkMessage;

    #[test]
    fn test_socket_creation() {
        // NETLINK_ROUTE sockets need no privileges to open.
        let socket = RouteSocket::new();
        assert!(socket.is_ok());
    }

    #[test]
    fn test_link_dump_contains_loopback() {
        let mut socket = RouteSocket::new().unwrap();
        let links = socket
            .dump(RouteNetlinkMessage::GetLink(LinkMessage::default()))
            .unwrap();
        assert!(!links.is_empty());
    }

    #[test]
    fn test_sequence_numbers_advance() {
        let mut socket = RouteSocket::new().unwrap();
        let first = socket.next_sequence();
        let second = socket.next_sequence();
        assert_eq!(second, first.wrapping_add(1));
    }
}
