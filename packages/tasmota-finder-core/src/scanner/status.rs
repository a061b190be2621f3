//! Parsing of the Tasmota `STATUS` and `STATUS 5` command replies.

use crate::error::ProbeError;
use serde_json::Value;

/// Placeholder used for every attribute the device did not report.
pub const UNKNOWN: &str = "Unknown";

/// Every Tasmota `STATUS` reply starts with exactly these bytes.
pub const STATUS_MARKER: &str = r#"{"Status":{"Module""#;

/// Present in a `STATUS 5` reply that carries network details.
pub const STATUS_NET_MARKER: &str = r#""StatusNET":{"Hostname""#;

/// Fields taken from the `STATUS` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub device_name: String,
    pub friendly_name: String,
    pub topic: Vec<String>,
}

/// Fields taken from the `STATUS 5` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkStatus {
    pub mac: String,
    pub hostname: String,
}

impl NetworkStatus {
    pub fn unknown() -> Self {
        Self {
            mac: UNKNOWN.to_string(),
            hostname: UNKNOWN.to_string(),
        }
    }
}

/// Parse a `STATUS` body.
///
/// The prefix check runs before any JSON decoding, so a body that is valid
/// JSON but shaped differently is rejected as [`ProbeError::ShapeMismatch`].
pub fn parse_status(body: &str) -> Result<DeviceStatus, ProbeError> {
    if !body.starts_with(STATUS_MARKER) {
        return Err(ProbeError::ShapeMismatch);
    }

    let data: Value = serde_json::from_str(body)?;
    let status = &data["Status"];

    Ok(DeviceStatus {
        device_name: string_or_unknown(&status["DeviceName"]),
        friendly_name: string_or_unknown(&status["FriendlyName"][0]),
        topic: topic_list(&status["Topic"]),
    })
}

/// Parse a `STATUS 5` body.
pub fn parse_network_status(body: &str) -> Result<NetworkStatus, ProbeError> {
    if !body.contains(STATUS_NET_MARKER) {
        return Err(ProbeError::MissingNetworkStatus);
    }

    let data: Value = serde_json::from_str(body)?;
    let net = &data["StatusNET"];

    Ok(NetworkStatus {
        mac: string_or_unknown(&net["Mac"]),
        hostname: string_or_unknown(&net["Hostname"]),
    })
}

fn string_or_unknown(value: &Value) -> String {
    value.as_str().unwrap_or(UNKNOWN).to_string()
}

// Older firmware reports a single topic string, newer builds an array.
fn topic_list(value: &Value) -> Vec<String> {
    let topics: Vec<String> = match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    if topics.is_empty() {
        vec![UNKNOWN.to_string()]
    } else {
        topics
    }
}
