//! Tasmota device discovery.
//!
//! A scan has three steps:
//! - resolve the local /24 prefix through a [`PrefixSource`]
//! - probe all 255 host addresses concurrently over HTTP
//! - collect the hosts that answered like a Tasmota device

mod gateway;
mod prefix;
mod probe;
pub mod status;

pub use gateway::{FixedPrefix, PrefixSource, SystemGateway};
pub use prefix::{CANDIDATE_COUNT, NetworkPrefix};
pub use probe::{PartialPolicy, Prober};

use crate::error::PrefixError;
use futures::stream::{FuturesUnordered, StreamExt};
use std::net::Ipv4Addr;
use std::time::Instant;

/// A discovered Tasmota device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub ip: Ipv4Addr,
    pub mac: String,
    pub hostname: String,
    pub device_name: String,
    pub friendly_name: String,
    pub topic: Vec<String>,
}

/// Devices found in one scan, in the order their probes finished.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub prefix: NetworkPrefix,
    pub devices: Vec<DeviceRecord>,
    pub elapsed_secs: f64,
}

/// Progress updates during a scan
#[derive(Debug, Clone)]
pub struct ScanProgress {
    pub stage: ScanStage,
    pub message: String,
    pub probed: usize,
    pub total: usize,
    pub devices_found: usize,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    DetectingNetwork,
    Probing,
    Complete,
}

/// Callback type for scan progress updates
pub type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;

/// Detect the local prefix and scan it.
pub async fn scan_network(
    source: &dyn PrefixSource,
    prober: &Prober,
    on_progress: Option<ProgressCallback>,
) -> Result<ScanResult, PrefixError> {
    let start = Instant::now();

    if let Some(ref callback) = on_progress {
        callback(ScanProgress {
            stage: ScanStage::DetectingNetwork,
            message: "Detecting network prefix...".to_string(),
            probed: 0,
            total: CANDIDATE_COUNT,
            devices_found: 0,
            elapsed_secs: 0.0,
        });
    }

    let prefix = source.network_prefix()?;
    tracing::info!("Scanning {}.1-255 for Tasmota devices", prefix);

    let mut result = scan_prefix(prefix, prober, on_progress.as_ref()).await;
    result.elapsed_secs = start.elapsed().as_secs_f64();
    Ok(result)
}

/// Probe every candidate of `prefix` at once and wait for all of them.
pub async fn scan_prefix(
    prefix: NetworkPrefix,
    prober: &Prober,
    on_progress: Option<&ProgressCallback>,
) -> ScanResult {
    let start = Instant::now();

    let mut pending: FuturesUnordered<_> = prefix
        .candidates()
        .map(|ip| prober.probe(ip))
        .collect();

    let mut devices = Vec::new();
    let mut probed = 0;

    while let Some(outcome) = pending.next().await {
        probed += 1;
        if let Some(device) = outcome {
            devices.push(device);
        }

        if let Some(callback) = on_progress {
            callback(ScanProgress {
                stage: ScanStage::Probing,
                message: format!("Probed {}/{} hosts", probed, CANDIDATE_COUNT),
                probed,
                total: CANDIDATE_COUNT,
                devices_found: devices.len(),
                elapsed_secs: start.elapsed().as_secs_f64(),
            });
        }
    }

    let elapsed_secs = start.elapsed().as_secs_f64();
    tracing::info!(
        "Scan complete: {} Tasmota devices found in {:.1}s",
        devices.len(),
        elapsed_secs
    );

    if let Some(callback) = on_progress {
        callback(ScanProgress {
            stage: ScanStage::Complete,
            message: format!("Scan complete: {} devices found", devices.len()),
            probed,
            total: CANDIDATE_COUNT,
            devices_found: devices.len(),
            elapsed_secs,
        });
    }

    ScanResult {
        prefix,
        devices,
        elapsed_secs,
    }
}
