//! Integration tests for the leadership controller.
//!
//! Drives the controller against an in-memory election hub (at most one
//! leader at a time, like the real coordination service) plus fake
//! address and announcement components, under paused tokio time.

use async_trait::async_trait;
use common::{Error, Result};
use ifaddr::{Ensure, Release};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vipd::controller::{
    AddressOps, Announce, Campaign, Campaigner, Controller, LeadershipState,
};

/// How often a parked fake campaign re-checks the hub.
const HUB_POLL: Duration = Duration::from_millis(100);

/// In-memory election: grants leadership to one member at a time.
#[derive(Clone, Default)]
struct ElectionHub {
    leader: Arc<Mutex<Option<String>>>,
}

impl ElectionHub {
    fn candidate(&self, cancel: CancellationToken) -> FakeElection {
        FakeElection {
            hub: self.clone(),
            cancel,
            fail: Arc::new(Mutex::new(false)),
        }
    }

    fn leader(&self) -> Option<String> {
        self.leader.lock().unwrap().clone()
    }

    /// Hand leadership to a member directly (an external contender).
    fn seize(&self, member: &str) {
        *self.leader.lock().unwrap() = Some(member.to_string());
    }

    /// Drop the named member's leadership (its session died).
    fn resign(&self, member: &str) {
        let mut leader = self.leader.lock().unwrap();
        if leader.as_deref() == Some(member) {
            *leader = None;
        }
    }
}

struct FakeElection {
    hub: ElectionHub,
    cancel: CancellationToken,
    fail: Arc<Mutex<bool>>,
}

impl FakeElection {
    /// Make every subsequent campaign fail with a coordination error.
    fn failure_switch(&self) -> Arc<Mutex<bool>> {
        self.fail.clone()
    }
}

#[async_trait]
impl Campaigner for FakeElection {
    async fn campaign(&mut self, member: &str) -> Result<Campaign> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(Campaign::Cancelled);
            }
            if *self.fail.lock().unwrap() {
                return Err(Error::coordination("campaign failed: lease not found"));
            }

            {
                let mut leader = self.hub.leader.lock().unwrap();
                match leader.as_deref() {
                    None => {
                        *leader = Some(member.to_string());
                        return Ok(Campaign::Elected);
                    }
                    Some(current) if current == member => return Ok(Campaign::Elected),
                    Some(_) => {}
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(Campaign::Cancelled),
                _ = tokio::time::sleep(HUB_POLL) => {}
            }
        }
    }
}

/// In-memory stand-in for the kernel address table.
#[derive(Clone, Default)]
struct FakeAddresses {
    inner: Arc<Mutex<AddressState>>,
}

#[derive(Default)]
struct AddressState {
    present: bool,
    adds: usize,
    release_calls: usize,
    fail_ensure: bool,
}

impl FakeAddresses {
    fn with_address_present() -> Self {
        let fake = Self::default();
        fake.inner.lock().unwrap().present = true;
        fake
    }

    fn present(&self) -> bool {
        self.inner.lock().unwrap().present
    }

    /// Simulate the address being removed behind our back.
    fn remove_externally(&self) {
        self.inner.lock().unwrap().present = false;
    }

    fn fail_next_ensure(&self) {
        self.inner.lock().unwrap().fail_ensure = true;
    }

    fn adds(&self) -> usize {
        self.inner.lock().unwrap().adds
    }

    fn release_calls(&self) -> usize {
        self.inner.lock().unwrap().release_calls
    }
}

impl AddressOps for FakeAddresses {
    fn ensure(&mut self) -> Result<Ensure> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_ensure {
            return Err(Error::network("failed to add address"));
        }
        if state.present {
            Ok(Ensure::AlreadyPresent)
        } else {
            state.present = true;
            state.adds += 1;
            Ok(Ensure::Added)
        }
    }

    fn release(&mut self) -> Result<Release> {
        let mut state = self.inner.lock().unwrap();
        state.release_calls += 1;
        if state.present {
            state.present = false;
            Ok(Release::Released)
        } else {
            Ok(Release::NotHeld)
        }
    }
}

/// Counts announcement bursts.
#[derive(Clone, Default)]
struct FakeAnnouncer {
    bursts: Arc<Mutex<usize>>,
}

impl FakeAnnouncer {
    fn bursts(&self) -> usize {
        *self.bursts.lock().unwrap()
    }
}

#[async_trait]
impl Announce for FakeAnnouncer {
    async fn announce(&self) {
        *self.bursts.lock().unwrap() += 1;
    }
}

struct Instance {
    addresses: FakeAddresses,
    announcer: FakeAnnouncer,
    cancel: CancellationToken,
    stop: CancellationToken,
    handle: tokio::task::JoinHandle<Result<LeadershipState>>,
}

impl Instance {
    fn spawn(hub: &ElectionHub, member: &str) -> Self {
        Self::spawn_with_addresses(hub, member, FakeAddresses::default())
    }

    fn spawn_with_addresses(hub: &ElectionHub, member: &str, addresses: FakeAddresses) -> Self {
        let announcer = FakeAnnouncer::default();
        let cancel = CancellationToken::new();
        let stop = CancellationToken::new();
        let controller = Controller::new(
            hub.candidate(cancel.clone()),
            addresses.clone(),
            announcer.clone(),
            member,
            stop.clone(),
        );
        let handle = tokio::spawn(controller.run());
        Self {
            addresses,
            announcer,
            cancel,
            stop,
            handle,
        }
    }

    /// Deliver a termination request the way the shutdown coordinator
    /// does: both tokens, once.
    fn terminate(&self) {
        self.cancel.cancel();
        self.stop.cancel();
    }

    async fn join(&mut self) -> Result<LeadershipState> {
        (&mut self.handle).await.expect("controller task panicked")
    }
}

#[tokio::test(start_paused = true)]
async fn test_single_instance_acquires_and_announces() {
    let hub = ElectionHub::default();
    let mut instance = Instance::spawn(&hub, "a");

    // First campaign happens one full cadence period after start.
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert_eq!(hub.leader().as_deref(), Some("a"));
    assert!(instance.addresses.present());
    assert_eq!(instance.addresses.adds(), 1);
    assert_eq!(instance.announcer.bursts(), 1);

    instance.terminate();
    let state = instance.join().await.unwrap();
    assert_eq!(state, LeadershipState::Released);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_confirmations_are_noops() {
    let hub = ElectionHub::default();
    let mut instance = Instance::spawn(&hub, "a");

    // Several cadence periods of uninterrupted leadership.
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(instance.addresses.adds(), 1, "ensure must be idempotent");
    assert_eq!(instance.announcer.bursts(), 1, "no announcements on no-op");

    instance.terminate();
    let state = instance.join().await.unwrap();
    assert_eq!(state, LeadershipState::Released);
    assert_eq!(
        instance.addresses.release_calls(),
        1,
        "obligations must not stack"
    );
    assert!(!instance.addresses.present());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_without_leadership_releases_nothing() {
    let hub = ElectionHub::default();
    hub.seize("other");
    let mut instance = Instance::spawn(&hub, "b");

    // Long enough to be parked inside a campaign.
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(hub.leader().as_deref(), Some("other"));
    assert!(!instance.addresses.present());

    instance.terminate();
    let state = instance.join().await.unwrap();
    assert_eq!(state, LeadershipState::Cancelled);
    assert_eq!(instance.addresses.release_calls(), 0);
    assert_eq!(instance.announcer.bursts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_unblocks_cadence_wait() {
    let hub = ElectionHub::default();
    let mut instance = Instance::spawn(&hub, "a");

    // Still inside the first cadence period; no campaign yet.
    tokio::time::sleep(Duration::from_secs(1)).await;
    instance.terminate();

    let state = instance.join().await.unwrap();
    assert_eq!(state, LeadershipState::Cancelled);
    assert_eq!(hub.leader(), None, "no campaign should have been issued");
    assert_eq!(instance.addresses.release_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_already_present_address_takes_no_obligation() {
    let hub = ElectionHub::default();
    let mut instance =
        Instance::spawn_with_addresses(&hub, "a", FakeAddresses::with_address_present());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(hub.leader().as_deref(), Some("a"));
    assert_eq!(instance.addresses.adds(), 0);
    assert_eq!(instance.announcer.bursts(), 0);

    instance.terminate();
    let state = instance.join().await.unwrap();
    // The address was not added by this instance, so it is not released.
    assert_eq!(state, LeadershipState::Cancelled);
    assert_eq!(instance.addresses.release_calls(), 0);
    assert!(instance.addresses.present());
}

#[tokio::test(start_paused = true)]
async fn test_external_removal_is_repaired_on_next_confirmation() {
    let hub = ElectionHub::default();
    let mut instance = Instance::spawn(&hub, "a");

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(instance.addresses.adds(), 1);

    instance.addresses.remove_externally();
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert!(instance.addresses.present(), "cadence must repair removal");
    assert_eq!(instance.addresses.adds(), 2);
    assert_eq!(instance.announcer.bursts(), 2, "fresh add re-announces");

    instance.terminate();
    let state = instance.join().await.unwrap();
    assert_eq!(state, LeadershipState::Released);
    assert_eq!(
        instance.addresses.release_calls(),
        1,
        "repair must not stack a second obligation"
    );
}

#[tokio::test(start_paused = true)]
async fn test_campaign_error_is_fatal_and_skips_release() {
    let hub = ElectionHub::default();
    let announcer = FakeAnnouncer::default();
    let addresses = FakeAddresses::default();
    let cancel = CancellationToken::new();
    let stop = CancellationToken::new();
    let election = hub.candidate(cancel.clone());
    let failure = election.failure_switch();

    let controller = Controller::new(
        election,
        addresses.clone(),
        announcer.clone(),
        "a",
        stop.clone(),
    );
    let handle = tokio::spawn(controller.run());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(addresses.present());

    *failure.lock().unwrap() = true;
    tokio::time::sleep(Duration::from_secs(6)).await;

    let result = handle.await.unwrap();
    assert!(result.is_err(), "campaign failure must be fatal");
    assert_eq!(
        addresses.release_calls(),
        0,
        "the fatal path does not run the release obligation"
    );
    assert!(addresses.present());
}

#[tokio::test(start_paused = true)]
async fn test_ensure_error_is_fatal() {
    let hub = ElectionHub::default();
    let instance = Instance::spawn(&hub, "a");
    instance.addresses.fail_next_ensure();

    tokio::time::sleep(Duration::from_secs(6)).await;

    let result = instance.handle.await.unwrap();
    assert!(result.is_err(), "reconciliation failure must be fatal");
}

#[tokio::test(start_paused = true)]
async fn test_exclusive_leadership_and_handoff() {
    let hub = ElectionHub::default();
    let mut a = Instance::spawn(&hub, "a");
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(hub.leader().as_deref(), Some("a"));

    let mut b = Instance::spawn(&hub, "b");
    tokio::time::sleep(Duration::from_secs(30)).await;

    // B campaigns but never wins while A leads.
    assert_eq!(hub.leader().as_deref(), Some("a"));
    assert!(a.addresses.present());
    assert!(!b.addresses.present());
    assert_eq!(b.announcer.bursts(), 0);

    // A is terminated; it releases the address, and once its leadership
    // lapses B's pending campaign resolves.
    a.terminate();
    let state = a.join().await.unwrap();
    assert_eq!(state, LeadershipState::Released);
    assert!(!a.addresses.present());
    hub.resign("a");

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(hub.leader().as_deref(), Some("b"));
    assert!(b.addresses.present());
    assert_eq!(b.announcer.bursts(), 1);

    b.terminate();
    let state = b.join().await.unwrap();
    assert_eq!(state, LeadershipState::Released);
}
