//! vipd binary

use clap::Parser;
use common::{Error, Result};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use vipd::config::Config;
use vipd::controller::{Controller, VipAnnouncer};
use vipd::coordination::Session;
use vipd::shutdown::ShutdownCoordinator;

#[tokio::main]
async fn main() {
    let config = Config::parse();
    common::logging::init();

    // The single abort point: every component below returns typed errors
    // and never terminates the process itself.
    if let Err(e) = run(config).await {
        error!(error = %e, "Fatal error");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let mut addresses = ifaddr::VipManager::new(&config.vip, &config.vif)?;

    // Resolve the interface before touching the coordination service, so
    // a bad --vif fails here rather than after a won campaign.
    let link = addresses.observe()?.link;

    // A previous instance on this host may have left the address behind.
    // Clearing it is fire-and-forget.
    if let Err(e) = addresses.release() {
        debug!(error = %e, "Startup release failed");
    }

    let announcer = VipAnnouncer::new(
        garp::Announcer::new(&link.name, link.index, link.mac.unwrap_or([0u8; 6])),
        addresses.vip().addr(),
    );

    let session = Session::connect(&config).await?;

    let cancel = CancellationToken::new();
    let stop = CancellationToken::new();

    let election = session.election(&config.prefix, cancel.clone());
    let controller = Controller::new(election, addresses, announcer, &config.member, stop.clone());

    let (done_tx, done_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = done_tx.send(controller.run().await);
    });

    let coordinator = ShutdownCoordinator::new(cancel, stop);
    tokio::spawn(async move {
        if let Err(e) = coordinator.run().await {
            error!(error = %e, "Failed to install signal handlers");
        }
    });

    let result = done_rx
        .await
        .map_err(|_| Error::coordination("leadership controller task aborted"))?;

    session.close().await;

    let state = result?;
    info!(state = %state, "Exiting");
    Ok(())
}
