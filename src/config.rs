//! Run configuration
//!
//! Values come from an optional JSON file and are then overridden by CLI
//! flags. Nothing here is process-global: the decoder settings travel with
//! the [`RecordFileOpener`](crate::storage::RecordFileOpener) into every
//! source it opens.

use crate::error::{Error, Result};
use crate::storage::Encoding;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default extension of record files
pub const DEFAULT_EXTENSION: &str = "lsr";

/// Settings handed to each record file reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Force a block encoding; files written with another one are rejected.
    /// `None` accepts whatever the header declares.
    pub encoding: Option<Encoding>,
    /// Verify the header checksum and record count at end of file
    pub verify_checksum: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            encoding: None,
            verify_checksum: true,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decoder: DecoderConfig,
    /// Accepted input file extensions, without the leading dot
    pub extensions: Vec<String>,
    /// Record types to keep; `None` keeps everything
    pub types: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            types: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|e| {
            Error::Configuration(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.extensions.iter().any(|ext| ext.trim_start_matches('.').is_empty()) {
            return Err(Error::Configuration(
                "extensions must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply CLI overrides; empty lists leave the loaded values alone
    pub fn with_overrides(mut self, extensions: &[String], types: &[String], no_verify: bool) -> Self {
        if !extensions.is_empty() {
            self.extensions = extensions.to_vec();
        }
        if !types.is_empty() {
            self.types = Some(types.to_vec());
        }
        if no_verify {
            self.decoder.verify_checksum = false;
        }
        self
    }
}
