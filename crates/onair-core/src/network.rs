//! Network bring-up.

use std::net::ToSocketAddrs;

use tracing::info;

use crate::config::NetworkConfig;
use crate::error::ConnectivityError;

/// Joins the network the schedule is fetched over.
pub trait Connectivity {
    fn connect(&mut self, network: &NetworkConfig) -> Result<(), ConnectivityError>;
}

/// The host's network stack owns association with `ssid`; connecting here
/// means confirming the schedule host resolves.
#[derive(Debug, Clone)]
pub struct HostConnectivity {
    host: String,
    port: u16,
}

impl HostConnectivity {
    /// Probe the host named in `url_prefix`.
    pub fn for_url(url_prefix: &str) -> Result<Self, ConnectivityError> {
        let invalid = || ConnectivityError::InvalidUrl(url_prefix.to_string());
        let url = url::Url::parse(url_prefix).map_err(|_| invalid())?;
        let host = url.host_str().ok_or_else(invalid)?.to_string();
        let port = url.port_or_known_default().ok_or_else(invalid)?;
        Ok(Self { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Connectivity for HostConnectivity {
    fn connect(&mut self, network: &NetworkConfig) -> Result<(), ConnectivityError> {
        info!(ssid = %network.ssid, host = %self.host, "checking network");
        let mut addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| ConnectivityError::Unreachable {
                host: self.host.clone(),
                source,
            })?;
        let addr = addrs.next().ok_or_else(|| ConnectivityError::NoAddress {
            host: self.host.clone(),
        })?;
        info!(%addr, "network up");
        Ok(())
    }
}
