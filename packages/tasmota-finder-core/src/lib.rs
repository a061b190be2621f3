//! Tasmota Finder Core Library
//!
//! This crate provides the core functionality for finding Tasmota devices:
//! - Default gateway detection (the local /24 prefix)
//! - Concurrent HTTP probing of all 255 host addresses
//! - Console table and MAC-keyed JSON reports
//! - Layered configuration (defaults, config file, environment)
//!
//! # Example
//!
//! ```no_run
//! use tasmota_finder_core::{config, report, scanner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = config::load_scan_config();
//!     let prober = scanner::Prober::new(
//!         config.timeout(),
//!         config.port.value,
//!         config.partial_records.value,
//!     )?;
//!
//!     let result = scanner::scan_network(&scanner::SystemGateway, &prober, None).await?;
//!     print!("{}", report::render_table(&result.devices));
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod report;
pub mod scanner;

// Re-export commonly used types
pub use config::{ConfigSource, ScanConfig};
pub use error::{PrefixError, ProbeError, ReportError};
pub use scanner::{
    DeviceRecord, FixedPrefix, NetworkPrefix, PartialPolicy, PrefixSource, Prober, ScanProgress,
    ScanResult, ScanStage, SystemGateway,
};
