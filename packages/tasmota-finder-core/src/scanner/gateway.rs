//! Default gateway lookup using system commands

use super::prefix::NetworkPrefix;
use crate::error::PrefixError;
use std::net::Ipv4Addr;
use std::process::Command;

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Source of the subnet to scan.
///
/// The scanner only ever needs the first three octets of the local network,
/// so tests and callers with their own routing knowledge can plug in a
/// [`FixedPrefix`] instead of touching the OS.
pub trait PrefixSource: Send + Sync {
    fn network_prefix(&self) -> Result<NetworkPrefix, PrefixError>;
}

/// A prefix known up front.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrefix(pub NetworkPrefix);

impl PrefixSource for FixedPrefix {
    fn network_prefix(&self) -> Result<NetworkPrefix, PrefixError> {
        Ok(self.0)
    }
}

/// Reads the default IPv4 route from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGateway;

impl PrefixSource for SystemGateway {
    fn network_prefix(&self) -> Result<NetworkPrefix, PrefixError> {
        let gateway = default_gateway()?;
        tracing::debug!("Default gateway: {}", gateway);
        Ok(NetworkPrefix::from_gateway(gateway))
    }
}

/// Create a Command that hides the console window on Windows.
fn hidden_command(program: &str) -> Command {
    #[allow(unused_mut)]
    let mut cmd = Command::new(program);
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    cmd
}

#[cfg(target_os = "linux")]
fn default_gateway() -> Result<Ipv4Addr, PrefixError> {
    let output = hidden_command("ip")
        .args(["-4", "route", "show", "default"])
        .output()?;

    parse_linux_route(&String::from_utf8_lossy(&output.stdout))
        .ok_or(PrefixError::NoDefaultGateway)
}

#[cfg(target_os = "macos")]
fn default_gateway() -> Result<Ipv4Addr, PrefixError> {
    let output = hidden_command("route")
        .args(["-n", "get", "default"])
        .output()?;

    parse_macos_route(&String::from_utf8_lossy(&output.stdout))
        .ok_or(PrefixError::NoDefaultGateway)
}

#[cfg(target_os = "windows")]
fn default_gateway() -> Result<Ipv4Addr, PrefixError> {
    let output = hidden_command("powershell")
        .args([
            "-NoProfile",
            "-ExecutionPolicy",
            "Bypass",
            "-Command",
            "Get-NetRoute -DestinationPrefix '0.0.0.0/0' -ErrorAction SilentlyContinue | \
             Where-Object { $_.NextHop -ne '0.0.0.0' } | \
             Sort-Object RouteMetric | Select-Object -First 1 -ExpandProperty NextHop",
        ])
        .output()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if let Ok(gateway) = stdout.trim().parse::<Ipv4Addr>() {
        return Ok(gateway);
    }

    tracing::debug!("Get-NetRoute gave no gateway, falling back to ipconfig");
    let output = hidden_command("ipconfig").output()?;
    parse_ipconfig(&String::from_utf8_lossy(&output.stdout)).ok_or(PrefixError::NoDefaultGateway)
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn default_gateway() -> Result<Ipv4Addr, PrefixError> {
    Err(PrefixError::UnsupportedPlatform)
}

/// Parse `ip route show default`, e.g. `default via 192.168.1.1 dev eth0 proto dhcp`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_linux_route(output: &str) -> Option<Ipv4Addr> {
    output.lines().find_map(|line| {
        line.split_whitespace()
            .skip_while(|&s| s != "via")
            .nth(1)
            .and_then(|s| s.parse().ok())
    })
}

/// Parse `route -n get default`, looking for the `gateway:` line.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn parse_macos_route(output: &str) -> Option<Ipv4Addr> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("gateway:"))
        .and_then(|line| line.split(':').nth(1))
        .and_then(|s| s.trim().parse().ok())
}

/// Parse `ipconfig` output, returning the first IPv4 default gateway.
///
/// The gateway value may sit on the `Default Gateway` line itself or, when
/// an IPv6 gateway is listed first, on the following continuation line.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn parse_ipconfig(output: &str) -> Option<Ipv4Addr> {
    let mut in_gateway = false;

    for line in output.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("Default Gateway") {
            in_gateway = true;
            let value = trimmed.split_once(':').map(|(_, v)| v.trim().trim_start_matches(". "));
            if let Some(gw) = value.and_then(|v| v.parse::<Ipv4Addr>().ok()) {
                return Some(gw);
            }
            continue;
        }

        if in_gateway {
            if let Ok(gw) = trimmed.parse::<Ipv4Addr>() {
                return Some(gw);
            }
            if trimmed.contains(':') && !trimmed.contains("::") && !trimmed.contains('%') {
                in_gateway = false;
            }
        }
    }

    None
}
