//! Coordination-service session and election.
//!
//! Wraps the etcd client in a liveness-bound session (lease plus
//! keep-alive task) and a named election scoped by the configured key
//! prefix. If the lease stops renewing, etcd revokes any leadership held
//! through it; this process only discovers that when its next campaign
//! fails.

use crate::config::Config;
use crate::controller::{Campaign, Campaigner};
use common::{Error, Result};
use etcd_client::{Certificate, Client, ConnectOptions, ElectionClient, Identity, TlsOptions};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Timeout for establishing the initial etcd connection.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Liveness lease TTL in seconds. Renewal runs at a third of this.
const SESSION_TTL: i64 = 60;

/// A liveness-bound session against the coordination service.
pub struct Session {
    client: Client,
    lease_id: i64,
    keepalive: JoinHandle<()>,
}

impl Session {
    /// Connect to etcd and establish the liveness lease.
    ///
    /// Credential files are read eagerly; an unreadable file is a
    /// configuration error, anything after that a coordination error.
    pub async fn connect(config: &Config) -> Result<Self> {
        let tls = tls_options(config)?;
        let options = ConnectOptions::new()
            .with_tls(tls)
            .with_connect_timeout(DIAL_TIMEOUT);

        let mut client = Client::connect(config.endpoints(), Some(options))
            .await
            .map_err(|e| {
                Error::coordination(format!(
                    "failed to connect to etcd at {}: {e}",
                    config.etcd_endpoints
                ))
            })?;

        let lease = client
            .lease_grant(SESSION_TTL, None)
            .await
            .map_err(|e| Error::coordination(format!("failed to grant session lease: {e}")))?;
        let lease_id = lease.id();
        debug!(lease_id, "Session lease granted");

        let (mut keeper, mut responses) = client
            .lease_keep_alive(lease_id)
            .await
            .map_err(|e| Error::coordination(format!("failed to start lease keepalive: {e}")))?;

        // Renewal failure is terminal for the task, not the process: the
        // next campaign against the dead session fails fatally instead.
        let keepalive = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(SESSION_TTL as u64 / 3));
            loop {
                tick.tick().await;
                if let Err(e) = keeper.keep_alive().await {
                    warn!(error = %e, "Lease keepalive failed");
                    return;
                }
                match responses.message().await {
                    Ok(Some(response)) if response.ttl() > 0 => {}
                    Ok(_) => {
                        warn!("Session lease expired");
                        return;
                    }
                    Err(e) => {
                        warn!(error = %e, "Lease keepalive stream failed");
                        return;
                    }
                }
            }
        });

        Ok(Self {
            client,
            lease_id,
            keepalive,
        })
    }

    /// Open the election under `prefix`; campaigns race against `cancel`.
    pub fn election(&self, prefix: &str, cancel: CancellationToken) -> Election {
        Election {
            client: self.client.election_client(),
            prefix: prefix.to_string(),
            lease_id: self.lease_id,
            cancel,
        }
    }

    /// Stop renewal and revoke the lease. Best-effort shutdown path.
    pub async fn close(mut self) {
        self.keepalive.abort();
        if let Err(e) = self.client.lease_revoke(self.lease_id).await {
            debug!(error = %e, "Failed to revoke session lease");
        }
    }
}

/// This instance's candidacy in the named election.
pub struct Election {
    client: ElectionClient,
    prefix: String,
    lease_id: i64,
    cancel: CancellationToken,
}

#[async_trait::async_trait]
impl Campaigner for Election {
    async fn campaign(&mut self, member: &str) -> Result<Campaign> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Ok(Campaign::Cancelled),
            response = self.client.campaign(self.prefix.as_str(), member, self.lease_id) => {
                response
                    .map(|_| Campaign::Elected)
                    .map_err(|e| Error::coordination(format!("campaign failed: {e}")))
            }
        }
    }
}

fn tls_options(config: &Config) -> Result<TlsOptions> {
    let cacert = read_credential(&config.cacert)?;
    let cert = read_credential(&config.cert)?;
    let key = read_credential(&config.key)?;

    Ok(TlsOptions::new()
        .ca_certificate(Certificate::from_pem(cacert))
        .identity(Identity::from_pem(cert, key)))
}

fn read_credential(path: &str) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::config(format!("failed to read {path}: {e}")))
}
