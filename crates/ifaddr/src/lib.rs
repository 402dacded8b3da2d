//! Kernel address-table state for a virtual IP address.
//!
//! Observes whether a configured VIP/interface pair currently holds the
//! address, adds it, and removes it, all over rtnetlink. Presence is an
//! observable kernel fact re-derived on every call; nothing is cached.

pub mod addr;
pub mod manager;
pub mod netlink;

pub use addr::{Ensure, LinkHandle, Release, VirtualAddress};
pub use manager::{Observation, VipManager};
