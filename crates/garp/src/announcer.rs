//! Reachability announcement bursts.

use crate::packet::ArpFrame;
use crate::socket::ArpSocket;
use std::io;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Number of gratuitous ARPs sent per burst
pub const ANNOUNCE_COUNT: u32 = 5;

/// Spacing between transmissions within a burst
pub const ANNOUNCE_SPACING: Duration = Duration::from_secs(1);

/// Emits gratuitous ARP bursts binding a VIP to an interface's hardware
/// address.
///
/// The packet socket is opened per burst, so a missing CAP_NET_RAW (or
/// any other transmission failure) degrades to log noise instead of
/// failing the reconciliation that triggered the announcement.
pub struct Announcer {
    interface: String,
    ifindex: u32,
    mac: [u8; 6],
}

impl Announcer {
    /// Create an announcer for the given resolved interface.
    pub fn new(interface: &str, ifindex: u32, mac: [u8; 6]) -> Self {
        Self {
            interface: interface.to_string(),
            ifindex,
            mac,
        }
    }

    /// Send one announcement burst for `ip`. Best-effort.
    pub async fn announce(&self, ip: IpAddr) {
        let IpAddr::V4(ip) = ip else {
            debug!(interface = %self.interface, "Gratuitous ARP is IPv4 only, skipping announcements");
            return;
        };

        let socket = match ArpSocket::new(self.ifindex) {
            Ok(socket) => socket,
            Err(e) => {
                warn!(interface = %self.interface, error = %e, "Failed to open ARP socket");
                return;
            }
        };

        let frame = ArpFrame::gratuitous(self.mac, ip).to_bytes();
        transmit_burst(ANNOUNCE_COUNT, ANNOUNCE_SPACING, || socket.send(&frame)).await;
    }
}

/// Run `transmit` `count` times, `spacing` apart, swallowing failures.
async fn transmit_burst<F>(count: u32, spacing: Duration, mut transmit: F)
where
    F: FnMut() -> io::Result<usize>,
{
    for attempt in 1..=count {
        if let Err(e) = transmit() {
            warn!(attempt, error = %e, "Failed to send gratuitous ARP");
        }
        sleep(spacing).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_burst_count_and_spacing() {
        let start = Instant::now();
        let mut sent = 0;

        transmit_burst(ANNOUNCE_COUNT, ANNOUNCE_SPACING, || {
            sent += 1;
            Ok(42)
        })
        .await;

        assert_eq!(sent, 5);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_continues_past_failures() {
        let mut attempts = 0;

        transmit_burst(ANNOUNCE_COUNT, ANNOUNCE_SPACING, || {
            attempts += 1;
            Err(io::Error::other("no cable"))
        })
        .await;

        assert_eq!(attempts, 5, "Failures must not cut the burst short");
    }
}
