//! The leadership-driven VIP lifecycle controller.
//!
//! Repeatedly campaigns for leadership on a fixed cadence and reconciles
//! the interface's address state with the outcome. Acquiring the address
//! records a release obligation that is discharged exactly once, on the
//! cancellation exit path. Any error is fatal and propagates to the
//! binary's single abort point; errors do not discharge the obligation
//! (a supervisor restart plus the startup release covers that case).

use common::Result;
use ifaddr::{Ensure, Release};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Interval between leadership campaigns.
///
/// This cadence doubles as the reconciliation interval: every successful
/// confirmation re-runs ensure-present, which also repairs an address
/// that was removed externally while this instance still leads.
pub const CAMPAIGN_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of one campaign for leadership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Campaign {
    /// This instance is confirmed leader for the current term.
    Elected,
    /// A cancellation request arrived while waiting. Not an error.
    Cancelled,
}

/// Leadership lifecycle of this instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadershipState {
    /// Campaigning, not currently leader.
    Contending,
    /// Confirmed leader; the VIP should be bound.
    Leading,
    /// Shut down after releasing an address this instance had bound.
    Released,
    /// Shut down without an address to release.
    Cancelled,
}

impl fmt::Display for LeadershipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadershipState::Contending => write!(f, "CONTENDING"),
            LeadershipState::Leading => write!(f, "LEADING"),
            LeadershipState::Released => write!(f, "RELEASED"),
            LeadershipState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Campaigns for leadership of the shared election.
#[async_trait::async_trait]
pub trait Campaigner: Send {
    /// Block until this candidate is elected, a cancellation request
    /// arrives, or the coordination service fails.
    async fn campaign(&mut self, member: &str) -> Result<Campaign>;
}

/// Reconciles the VIP's presence on the interface.
pub trait AddressOps: Send {
    fn ensure(&mut self) -> Result<Ensure>;
    fn release(&mut self) -> Result<Release>;
}

/// Emits reachability announcements after the VIP is bound.
#[async_trait::async_trait]
pub trait Announce: Send {
    async fn announce(&self);
}

/// Drives campaigns, reconciliation, and announcements in one task.
pub struct Controller<C, A, N> {
    election: C,
    addresses: A,
    announcer: N,
    member: String,
    stop: CancellationToken,
    state: LeadershipState,
    release_pending: bool,
}

impl<C, A, N> Controller<C, A, N>
where
    C: Campaigner,
    A: AddressOps,
    N: Announce,
{
    pub fn new(
        election: C,
        addresses: A,
        announcer: N,
        member: impl Into<String>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            election,
            addresses,
            announcer,
            member: member.into(),
            stop,
            state: LeadershipState::Contending,
            release_pending: false,
        }
    }

    /// Run the leadership loop until cancelled or a fatal error.
    ///
    /// Returns the terminal state: `Released` when the exit path removed
    /// an address this instance added, `Cancelled` otherwise.
    pub async fn run(mut self) -> Result<LeadershipState> {
        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                _ = sleep(CAMPAIGN_INTERVAL) => {
                    debug!(member = %self.member, "Waiting to become the leader");
                    match self.election.campaign(&self.member).await? {
                        Campaign::Cancelled => break,
                        Campaign::Elected => self.confirmed().await?,
                    }
                }
            }
        }

        self.state = LeadershipState::Cancelled;
        if self.release_pending {
            if self.addresses.release()? == Release::Released {
                self.state = LeadershipState::Released;
            }
            self.release_pending = false;
        }
        info!(state = %self.state, "Leadership controller stopped");
        Ok(self.state)
    }

    /// Handle one leadership confirmation.
    async fn confirmed(&mut self) -> Result<()> {
        debug!(member = %self.member, "I am the leader");
        self.state = LeadershipState::Leading;

        if self.addresses.ensure()? == Ensure::Added {
            // A single obligation per task lifetime, however often the
            // address gets re-added.
            self.release_pending = true;
            self.announcer.announce().await;
        }
        Ok(())
    }
}

// Adapters binding the production components to the controller's seams.

impl AddressOps for ifaddr::VipManager {
    fn ensure(&mut self) -> Result<Ensure> {
        ifaddr::VipManager::ensure(self)
    }

    fn release(&mut self) -> Result<Release> {
        ifaddr::VipManager::release(self)
    }
}

/// Announces the configured VIP through the gratuitous ARP emitter.
pub struct VipAnnouncer {
    announcer: garp::Announcer,
    vip: IpAddr,
}

impl VipAnnouncer {
    pub fn new(announcer: garp::Announcer, vip: IpAddr) -> Self {
        Self { announcer, vip }
    }
}

#[async_trait::async_trait]
impl Announce for VipAnnouncer {
    async fn announce(&self) {
        self.announcer.announce(self.vip).await;
    }
}
