//! Service configuration.
//!
//! Every knob lives in [`ServiceConfig`], built through its
//! [`ServiceConfigBuilder`]. A single struct keeps the constants that gate
//! the dialogue (delivery ceiling, download ceiling, confirmation
//! threshold) next to the network timeouts that protect it, so two
//! deployments can be diffed at a glance.

use crate::error::SnipError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum size the chat transport can deliver inline (50 MiB).
pub const DELIVERY_CEILING: u64 = 50 * 1024 * 1024;

/// Maximum size this service will fetch from a remote URL (2 GiB).
pub const DOWNLOAD_CEILING: u64 = 2 * 1024 * 1024 * 1024;

/// Page-range length above which the controller demands an explicit "yes"
/// before extracting. A friction point against accidental huge jobs, not a
/// hard cap.
pub const LARGE_RANGE_THRESHOLD: usize = 100;

/// Configuration for the page-extraction service.
///
/// Built via [`ServiceConfig::builder()`] or [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use pagesnip::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .storage_dir("stored_pdfs")
///     .probe_timeout_secs(10)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Shared directory where source PDFs are persisted for reuse.
    pub storage_dir: PathBuf,

    /// Inline delivery ceiling in bytes. Default: [`DELIVERY_CEILING`].
    ///
    /// Inbound uploads over this size are rejected before any transfer,
    /// using transport-reported metadata only. Extraction outputs over it
    /// are routed through the file server collaborator when one is
    /// configured, otherwise refused.
    pub delivery_limit_bytes: u64,

    /// Remote download ceiling in bytes. Default: [`DOWNLOAD_CEILING`].
    ///
    /// Enforced twice: against the advertised Content-Length before the
    /// download starts, and against actually-written bytes while it runs,
    /// so a lying or absent header cannot smuggle an oversized file in.
    pub download_limit_bytes: u64,

    /// Page count above which a range needs explicit confirmation.
    /// Default: [`LARGE_RANGE_THRESHOLD`].
    pub large_range_threshold: usize,

    /// Timeout for the metadata-only URL probe, in seconds. Default: 10.
    pub probe_timeout_secs: u64,

    /// TCP connect timeout for downloads, in seconds. Default: 30.
    pub connect_timeout_secs: u64,

    /// Per-read idle timeout during a streamed download, in seconds.
    /// Default: 300. Bounds how long one unresponsive remote server can
    /// stall a session; there is deliberately no whole-transfer timeout,
    /// large files legitimately take minutes.
    pub read_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("stored_pdfs"),
            delivery_limit_bytes: DELIVERY_CEILING,
            download_limit_bytes: DOWNLOAD_CEILING,
            large_range_threshold: LARGE_RANGE_THRESHOLD,
            probe_timeout_secs: 10,
            connect_timeout_secs: 30,
            read_timeout_secs: 300,
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = dir.into();
        self
    }

    pub fn delivery_limit_bytes(mut self, bytes: u64) -> Self {
        self.config.delivery_limit_bytes = bytes;
        self
    }

    pub fn download_limit_bytes(mut self, bytes: u64) -> Self {
        self.config.download_limit_bytes = bytes;
        self
    }

    pub fn large_range_threshold(mut self, pages: usize) -> Self {
        self.config.large_range_threshold = pages.max(1);
        self
    }

    pub fn probe_timeout_secs(mut self, secs: u64) -> Self {
        self.config.probe_timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn read_timeout_secs(mut self, secs: u64) -> Self {
        self.config.read_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, SnipError> {
        let c = &self.config;
        if c.delivery_limit_bytes == 0 {
            return Err(SnipError::InvalidConfig(
                "delivery_limit_bytes must be > 0".into(),
            ));
        }
        if c.download_limit_bytes < c.delivery_limit_bytes {
            return Err(SnipError::InvalidConfig(format!(
                "download limit ({}) must not be below the delivery limit ({})",
                c.download_limit_bytes, c.delivery_limit_bytes
            )));
        }
        if c.probe_timeout_secs == 0 || c.connect_timeout_secs == 0 || c.read_timeout_secs == 0 {
            return Err(SnipError::InvalidConfig("timeouts must be > 0".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design_constants() {
        let c = ServiceConfig::default();
        assert_eq!(c.delivery_limit_bytes, 50 * 1024 * 1024);
        assert_eq!(c.download_limit_bytes, 2 * 1024 * 1024 * 1024);
        assert_eq!(c.large_range_threshold, 100);
    }

    #[test]
    fn builder_rejects_inverted_limits() {
        let err = ServiceConfig::builder()
            .delivery_limit_bytes(100)
            .download_limit_bytes(50)
            .build();
        assert!(matches!(err, Err(SnipError::InvalidConfig(_))));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let err = ServiceConfig::builder().probe_timeout_secs(0).build();
        assert!(matches!(err, Err(SnipError::InvalidConfig(_))));
    }

    #[test]
    fn deserialises_from_service_config_file() {
        let c: ServiceConfig = serde_json::from_str(
            r#"{
                "storage_dir": "/var/lib/pagesnip/pdfs",
                "delivery_limit_bytes": 1048576,
                "download_limit_bytes": 2097152,
                "large_range_threshold": 20,
                "probe_timeout_secs": 5,
                "connect_timeout_secs": 10,
                "read_timeout_secs": 60
            }"#,
        )
        .unwrap();
        assert_eq!(c.storage_dir, PathBuf::from("/var/lib/pagesnip/pdfs"));
        assert_eq!(c.delivery_limit_bytes, 1048576);
        assert_eq!(c.large_range_threshold, 20);
    }

    #[test]
    fn threshold_floor_is_one() {
        let c = ServiceConfig::builder()
            .large_range_threshold(0)
            .build()
            .unwrap();
        assert_eq!(c.large_range_threshold, 1);
    }
}
