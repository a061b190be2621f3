use crate::scanner::PartialPolicy;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default HTTP port of the Tasmota web server
pub const DEFAULT_PORT: u16 = 80;

/// Default JSON report location
pub const DEFAULT_OUTPUT_FILE: &str = "devices.json";

const ENV_TIMEOUT: &str = "TASMOTA_FINDER_TIMEOUT_SECS";
const ENV_PORT: &str = "TASMOTA_FINDER_PORT";
const ENV_OUTPUT: &str = "TASMOTA_FINDER_OUTPUT";
const ENV_PARTIAL: &str = "TASMOTA_FINDER_PARTIAL";

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    scan: Option<ScanSection>,
}

#[derive(Debug, Deserialize, Default)]
struct ScanSection {
    /// Per-request timeout in seconds
    timeout_secs: Option<u64>,
    /// HTTP port to probe
    port: Option<u16>,
    /// Where `--json` writes the report
    output_file: Option<String>,
    /// "keep" or "drop"
    partial_records: Option<PartialPolicy>,
}

/// Where a setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Default,
    ConfigFile,
    Environment,
    CommandLine,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::ConfigFile => write!(f, "config file"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::CommandLine => write!(f, "command line"),
        }
    }
}

/// A setting together with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> Setting<T> {
    fn fallback(value: T) -> Self {
        Self {
            value,
            source: ConfigSource::Default,
        }
    }

    fn set(&mut self, value: T, source: ConfigSource) {
        self.value = value;
        self.source = source;
    }
}

/// Effective scan configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub timeout_secs: Setting<u64>,
    pub port: Setting<u16>,
    pub output_file: Setting<PathBuf>,
    pub partial_records: Setting<PartialPolicy>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Setting::fallback(DEFAULT_TIMEOUT_SECS),
            port: Setting::fallback(DEFAULT_PORT),
            output_file: Setting::fallback(PathBuf::from(DEFAULT_OUTPUT_FILE)),
            partial_records: Setting::fallback(PartialPolicy::Keep),
        }
    }
}

impl ScanConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.value)
    }

    /// Override the timeout from the command line.
    pub fn with_timeout_secs(mut self, secs: Option<u64>) -> Self {
        if let Some(secs) = secs {
            self.timeout_secs.set(secs, ConfigSource::CommandLine);
        }
        self
    }

    /// Override the report path from the command line.
    pub fn with_output_file(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.output_file.set(path, ConfigSource::CommandLine);
        }
        self
    }

    /// Layer config file contents and environment values over the defaults.
    ///
    /// Environment wins over the file. Unparseable values are logged and skipped.
    pub fn from_sources<F>(file_contents: Option<&str>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(contents) = file_contents {
            match toml::from_str::<ConfigFile>(contents) {
                Ok(file) => config.apply_file(file.scan.unwrap_or_default()),
                Err(e) => tracing::warn!("Failed to parse config file: {}", e),
            }
        }

        config.apply_env(env);
        config
    }

    fn apply_file(&mut self, scan: ScanSection) {
        let source = ConfigSource::ConfigFile;
        match scan.timeout_secs {
            Some(0) => tracing::warn!("Ignoring timeout_secs = 0 in config file"),
            Some(secs) => self.timeout_secs.set(secs, source),
            None => {}
        }
        if let Some(port) = scan.port {
            self.port.set(port, source);
        }
        if let Some(path) = scan.output_file.filter(|p| !p.trim().is_empty()) {
            self.output_file.set(PathBuf::from(path), source);
        }
        if let Some(policy) = scan.partial_records {
            self.partial_records.set(policy, source);
        }
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = ConfigSource::Environment;

        if let Some(raw) = env(ENV_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(0) => tracing::warn!("Ignoring {}=0: timeout must be at least 1s", ENV_TIMEOUT),
                Ok(secs) => self.timeout_secs.set(secs, source),
                Err(_) => tracing::warn!("Ignoring {}={:?}: not a number", ENV_TIMEOUT, raw),
            }
        }
        if let Some(raw) = env(ENV_PORT) {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.port.set(port, source),
                Err(_) => tracing::warn!("Ignoring {}={:?}: not a port", ENV_PORT, raw),
            }
        }
        if let Some(raw) = env(ENV_OUTPUT) {
            let raw = raw.trim();
            if !raw.is_empty() {
                self.output_file.set(PathBuf::from(raw), source);
            }
        }
        if let Some(raw) = env(ENV_PARTIAL) {
            match raw.parse::<PartialPolicy>() {
                Ok(policy) => self.partial_records.set(policy, source),
                Err(e) => tracing::warn!("Ignoring {}: {}", ENV_PARTIAL, e),
            }
        }
    }
}

/// Get the path to the configuration file
pub fn get_config_file_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("tasmota-finder").join("config.toml"))
}

/// Get the path to the config file for documentation purposes
pub fn get_config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/tasmota-finder/config.toml".to_string())
}

fn read_config_file() -> Option<String> {
    let path = get_config_file_path()?;

    if !path.exists() {
        return None;
    }

    match fs::read_to_string(&path) {
        Ok(content) => {
            tracing::debug!("Loaded config from {:?}", path);
            Some(content)
        }
        Err(e) => {
            tracing::warn!("Failed to read config file {:?}: {}", path, e);
            None
        }
    }
}

/// Load scan configuration with priority:
/// 1. Environment variables (TASMOTA_FINDER_*)
/// 2. Config file (~/.config/tasmota-finder/config.toml)
/// 3. Default values
///
/// Command line overrides are applied by the caller on top.
pub fn load_scan_config() -> ScanConfig {
    let contents = read_config_file();
    ScanConfig::from_sources(contents.as_deref(), |key| std::env::var(key).ok())
}

/// Generate example config file content
pub fn generate_example_config() -> String {
    format!(
        r#"# Tasmota Finder Configuration
# Place this file at: ~/.config/tasmota-finder/config.toml

[scan]
# Seconds to wait for each HTTP request
# timeout_secs = {}

# Port of the Tasmota web server
# port = {}

# File written in --json mode
# output_file = "{}"

# Devices that answer STATUS but not STATUS 5: "keep" or "drop"
# partial_records = "keep"
"#,
        DEFAULT_TIMEOUT_SECS, DEFAULT_PORT, DEFAULT_OUTPUT_FILE
    )
}
