//! Gratuitous ARP announcements for a virtual IP address.
//!
//! After a VIP is bound to an interface, neighboring devices may still
//! hold stale address-resolution entries for the previous owner. A short
//! burst of gratuitous ARP requests forces them to refresh immediately
//! instead of waiting for their own cache timeout.
//!
//! Everything in this crate is best-effort: transmission failures are
//! logged and swallowed, never escalated to the caller.

pub mod announcer;
pub mod packet;
pub mod socket;

pub use announcer::{ANNOUNCE_COUNT, ANNOUNCE_SPACING, Announcer};
pub use packet::ArpFrame;
pub use socket::ArpSocket;
