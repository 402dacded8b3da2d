//! ARP frame format and parsing.
//!
//! RFC 826 packet format, carried in an Ethernet II frame:
//!
//! ```text
//!  0                   1
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |         Hardware Type         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |         Protocol Type         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    HW Len     |   Proto Len   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           Operation           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Sender Hardware Address    |
//! +          (6 octets)           +
//! |                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Sender Protocol Address    |
//! +          (4 octets)           +
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Target Hardware Address    |
//! +          (6 octets)           +
//! |                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    Target Protocol Address    |
//! +          (4 octets)           +
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The gratuitous form is a broadcast request announcing the sender's own
//! binding: sender and target protocol address are both the VIP.

use bytes::{BufMut, Bytes, BytesMut};
use std::net::Ipv4Addr;

/// EtherType for ARP
pub const ETHERTYPE_ARP: u16 = 0x0806;

/// Ethernet broadcast address
pub const BROADCAST: [u8; 6] = [0xff; 6];

/// Hardware type for Ethernet
const HTYPE_ETHERNET: u16 = 1;

/// Protocol type for IPv4
const PTYPE_IPV4: u16 = 0x0800;

/// ARP request operation
const OP_REQUEST: u16 = 1;

/// Total frame length: 14-byte Ethernet header + 28-byte ARP payload
pub const FRAME_LEN: usize = 42;

/// An ARP request frame, including its Ethernet header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpFrame {
    /// Sender hardware address (also the Ethernet source)
    pub sender_mac: [u8; 6],

    /// Sender protocol address
    pub sender_ip: Ipv4Addr,

    /// Target hardware address (ignored by receivers of a request)
    pub target_mac: [u8; 6],

    /// Target protocol address
    pub target_ip: Ipv4Addr,
}

impl ArpFrame {
    /// Create a gratuitous ARP request announcing `ip` as bound to `mac`.
    pub fn gratuitous(mac: [u8; 6], ip: Ipv4Addr) -> Self {
        Self {
            sender_mac: mac,
            sender_ip: ip,
            target_mac: BROADCAST,
            target_ip: ip,
        }
    }

    /// Serialize the frame to wire format.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_LEN);

        // Ethernet header
        buf.put_slice(&BROADCAST);
        buf.put_slice(&self.sender_mac);
        buf.put_u16(ETHERTYPE_ARP);

        // ARP payload
        buf.put_u16(HTYPE_ETHERNET);
        buf.put_u16(PTYPE_IPV4);
        buf.put_u8(6);
        buf.put_u8(4);
        buf.put_u16(OP_REQUEST);
        buf.put_slice(&self.sender_mac);
        buf.put_slice(&self.sender_ip.octets());
        buf.put_slice(&self.target_mac);
        buf.put_slice(&self.target_ip.octets());

        buf.freeze()
    }

    /// Parse an ARP request frame from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self, &'static str> {
        if data.len() < FRAME_LEN {
            return Err("Frame too short");
        }

        if u16::from_be_bytes([data[12], data[13]]) != ETHERTYPE_ARP {
            return Err("Not an ARP frame");
        }

        if u16::from_be_bytes([data[14], data[15]]) != HTYPE_ETHERNET
            || u16::from_be_bytes([data[16], data[17]]) != PTYPE_IPV4
        {
            return Err("Unsupported hardware or protocol type");
        }

        if data[18] != 6 || data[19] != 4 {
            return Err("Unexpected address lengths");
        }

        if u16::from_be_bytes([data[20], data[21]]) != OP_REQUEST {
            return Err("Not an ARP request");
        }

        let mut sender_mac = [0u8; 6];
        sender_mac.copy_from_slice(&data[22..28]);
        let sender_ip = Ipv4Addr::new(data[28], data[29], data[30], data[31]);

        let mut target_mac = [0u8; 6];
        target_mac.copy_from_slice(&data[32..38]);
        let target_ip = Ipv4Addr::new(data[38], data[39], data[40], data[41]);

        Ok(Self {
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
        })
    }
}
