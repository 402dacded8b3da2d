//! Exclusive ownership of a virtual IP address across a fleet of peers.
//!
//! Each instance campaigns in an etcd election; the winner binds the VIP
//! to its interface and announces it, and releases it again on loss of
//! leadership or shutdown. At most one instance owns the address at any
//! time; that guarantee comes from etcd, this crate only respects it.

pub mod config;
pub mod controller;
pub mod coordination;
pub mod shutdown;

pub use config::Config;
pub use controller::{Controller, LeadershipState};
pub use coordination::Session;
pub use shutdown::ShutdownCoordinator;
