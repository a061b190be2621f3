//! HTTP probe of a single candidate address

use super::status::{self, NetworkStatus};
use super::DeviceRecord;
use crate::error::ProbeError;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// What to do when a host answers `STATUS` but not `STATUS 5`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialPolicy {
    /// Report the device with `Unknown` MAC and hostname.
    #[default]
    Keep,
    /// Drop the device entirely.
    Drop,
}

impl std::str::FromStr for PartialPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(PartialPolicy::Keep),
            "drop" => Ok(PartialPolicy::Drop),
            other => Err(format!("unknown partial record policy '{}'", other)),
        }
    }
}

impl std::fmt::Display for PartialPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartialPolicy::Keep => write!(f, "keep"),
            PartialPolicy::Drop => write!(f, "drop"),
        }
    }
}

/// Probes candidate hosts over HTTP.
///
/// Holds one `reqwest::Client`; it is cheap to clone and safe to share
/// between concurrent probes, each request getting its own connection.
/// Proxies are bypassed since every target is on the local subnet.
#[derive(Debug, Clone)]
pub struct Prober {
    client: reqwest::Client,
    port: u16,
    partial: PartialPolicy,
}

impl Prober {
    pub fn new(timeout: Duration, port: u16, partial: PartialPolicy) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .no_proxy()
            .build()?;

        Ok(Self::with_client(client, port, partial))
    }

    /// Use a preconfigured client, e.g. one carrying credentials for
    /// password-protected devices.
    pub fn with_client(client: reqwest::Client, port: u16, partial: PartialPolicy) -> Self {
        Self {
            client,
            port,
            partial,
        }
    }

    /// Probe one address. Every failure is logged and reported as `None`.
    pub async fn probe(&self, ip: Ipv4Addr) -> Option<DeviceRecord> {
        match self.try_probe(ip).await {
            Ok(record) => {
                tracing::info!(
                    "Found Tasmota device at {} ({}, {})",
                    record.ip,
                    record.device_name,
                    record.mac
                );
                Some(record)
            }
            Err(ProbeError::ShapeMismatch) => {
                tracing::debug!("{}: responded, but not a Tasmota device", ip);
                None
            }
            Err(e) => {
                tracing::debug!("{}: {}", ip, e);
                None
            }
        }
    }

    async fn try_probe(&self, ip: Ipv4Addr) -> Result<DeviceRecord, ProbeError> {
        let body = self.command(ip, "STATUS").await?;
        let device = status::parse_status(&body)?;

        let network = match self.network_status(ip).await {
            Ok(network) => network,
            Err(e) if self.partial == PartialPolicy::Keep => {
                tracing::warn!("{}: network status unavailable, reporting partial record ({})", ip, e);
                NetworkStatus::unknown()
            }
            Err(e) => return Err(e),
        };

        Ok(DeviceRecord {
            ip,
            mac: network.mac,
            hostname: network.hostname,
            device_name: device.device_name,
            friendly_name: device.friendly_name,
            topic: device.topic,
        })
    }

    async fn network_status(&self, ip: Ipv4Addr) -> Result<NetworkStatus, ProbeError> {
        let body = self.command(ip, "STATUS%205").await?;
        status::parse_network_status(&body)
    }

    /// Send a Tasmota web command; `cmnd` must already be percent-encoded.
    async fn command(&self, ip: Ipv4Addr, cmnd: &str) -> Result<String, ProbeError> {
        let url = command_url(ip, self.port, cmnd);
        let body = self.client.get(&url).send().await?.text().await?;
        Ok(body)
    }
}

fn command_url(ip: Ipv4Addr, port: u16, cmnd: &str) -> String {
    if port == 80 {
        format!("http://{}/cm?cmnd={}", ip, cmnd)
    } else {
        format!("http://{}:{}/cm?cmnd={}", ip, port, cmnd)
    }
}
