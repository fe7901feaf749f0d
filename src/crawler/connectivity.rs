//! Network reachability gate
//!
//! Workers consult the gate before each iteration and idle while it reports
//! the network as down, without sampling seeds or taking fetch slots.

use crate::config::ConnectivityConfig;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// Liveness check gating all network work
#[async_trait]
pub trait ConnectivityGate: Send + Sync {
    /// Returns true if network work should be attempted
    ///
    /// Must resolve within a short bounded time (at most a few seconds).
    async fn is_reachable(&self) -> bool;
}

/// Gate that opens a TCP connection to a well-known address
///
/// Defaults to Cloudflare's resolver on port 53, which answers quickly from
/// almost any network.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ConnectivityConfig) -> Self {
        Self::new(config.probe_address.clone(), config.timeout())
    }
}

#[async_trait]
impl ConnectivityGate for TcpProbe {
    async fn is_reachable(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!("Connectivity probe to {} failed: {}", self.address, e);
                false
            }
            Err(_) => {
                tracing::debug!(
                    "Connectivity probe to {} timed out after {:?}",
                    self.address,
                    self.timeout
                );
                false
            }
        }
    }
}
