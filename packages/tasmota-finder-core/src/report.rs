//! Rendering of scan results as a console table or a MAC-keyed JSON file.

use crate::error::ReportError;
use crate::scanner::DeviceRecord;
use crate::scanner::status::UNKNOWN;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Heading printed above the device table.
pub const TABLE_HEADING: &str = "Tasmota devices found:";

/// Printed instead of a table when nothing answered.
pub const NO_DEVICES: &str = "No Tasmota devices found.";

/// One entry of the JSON report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportEntry {
    pub ip: String,
    pub hostname: String,
    pub device_name: String,
    pub friendly_name: String,
    pub topic: Vec<String>,
}

impl From<&DeviceRecord> for ReportEntry {
    fn from(device: &DeviceRecord) -> Self {
        Self {
            ip: device.ip.to_string(),
            hostname: device.hostname.clone(),
            device_name: device.device_name.clone(),
            friendly_name: device.friendly_name.clone(),
            topic: device.topic.clone(),
        }
    }
}

/// Key a device is filed under: its MAC, or its IP when the MAC is unknown.
pub fn report_key(device: &DeviceRecord) -> String {
    if device.mac == UNKNOWN {
        device.ip.to_string()
    } else {
        device.mac.clone()
    }
}

/// Build the MAC-keyed report map.
///
/// Two devices sharing a key cannot both be filed; the later one wins and the
/// replaced one is logged.
pub fn build_report(devices: &[DeviceRecord]) -> BTreeMap<String, ReportEntry> {
    let mut report = BTreeMap::new();
    for device in devices {
        let key = report_key(device);
        if let Some(replaced) = report.insert(key.clone(), ReportEntry::from(device)) {
            tracing::warn!(
                "Duplicate report key {}: {} replaces {}",
                key,
                device.ip,
                replaced.ip
            );
        }
    }
    report
}

/// Serialize the report with four-space indentation.
pub fn to_json(devices: &[DeviceRecord]) -> Result<String, ReportError> {
    let report = build_report(devices);

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    report.serialize(&mut ser)?;

    // serde_json only ever emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write the JSON report to `path`, replacing any previous file.
pub fn write_json_report(path: &Path, devices: &[DeviceRecord]) -> Result<String, ReportError> {
    let json = to_json(devices)?;
    fs::write(path, &json).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!("Wrote {} devices to {}", devices.len(), path.display());
    Ok(json)
}

/// Render the device table, one aligned row per device.
pub fn render_table(devices: &[DeviceRecord]) -> String {
    let mut out = String::new();
    out.push_str(TABLE_HEADING);
    out.push('\n');

    if devices.is_empty() {
        out.push_str(NO_DEVICES);
        out.push('\n');
        return out;
    }

    let rows: Vec<[String; 6]> = devices
        .iter()
        .map(|d| {
            [
                d.mac.clone(),
                d.ip.to_string(),
                d.hostname.clone(),
                d.device_name.clone(),
                d.friendly_name.clone(),
                d.topic.join(", "),
            ]
        })
        .collect();

    let mut widths = [0usize; 6];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    for (i, [mac, ip, hostname, device_name, friendly_name, topic]) in rows.iter().enumerate() {
        out.push_str(&format!(
            "{:2} | MAC: {:w0$} | IP: {:w1$} | Host Name: {:w2$} | Device Name: {:w3$} | Friendly Name: {:w4$} | Topic: {:w5$}",
            i + 1,
            mac,
            ip,
            hostname,
            device_name,
            friendly_name,
            topic,
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3],
            w4 = widths[4],
            w5 = widths[5],
        ));
        out.push('\n');
    }

    out
}
