//! Error types for probing, prefix detection and reporting.

use std::path::PathBuf;

/// Why a single candidate did not produce a device record.
///
/// These never leave the scanner: every variant is logged at debug level and
/// the candidate is treated as "no device".
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response does not look like a Tasmota status reply")]
    ShapeMismatch,

    #[error("network status section missing from STATUS 5 reply")]
    MissingNetworkStatus,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to determine the subnet to scan. Fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum PrefixError {
    #[error("no default IPv4 gateway configured")]
    NoDefaultGateway,

    #[error("invalid network prefix '{0}', expected three octets like 192.168.1")]
    InvalidPrefix(String),

    #[error("failed to query routing table: {0}")]
    Command(#[from] std::io::Error),

    #[error("default gateway lookup is not supported on this platform")]
    UnsupportedPlatform,
}

/// Failure to produce the JSON report. Fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
