//! Service settings
//!
//! Layered as: built-in defaults, then an optional YAML file. `XLFILL_*`
//! environment variables and command-line flags are read by clap and
//! applied last by the binaries (see `cli::ServerArgs`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{XlFillError, XlFillResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    /// Include internal error details in API responses
    pub debug: bool,
    pub host: String,
    pub port: u16,
    pub templates_dir: PathBuf,
    pub log_level: String,
    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
    /// Request body limit in bytes
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "xlfill".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            debug: false,
            host: "127.0.0.1".to_string(),
            port: 8000,
            templates_dir: PathBuf::from("./templates"),
            log_level: "info".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8080".to_string(),
            ],
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Settings {
    /// Read settings from a YAML file; missing keys keep their defaults
    pub fn from_yaml_file(path: &Path) -> XlFillResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            XlFillError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> XlFillResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Defaults, overlaid with the YAML file at `path` when one is given
    pub fn load(path: Option<&Path>) -> XlFillResult<Self> {
        match path {
            Some(path) => Self::from_yaml_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn bind_address(&self) -> XlFillResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| XlFillError::Config(format!("Invalid bind address: {}", e)))
    }

    /// Default `tracing` filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> String {
        format!("xlfill={0},xlfill_server={0},tower_http={0}", self.log_level)
    }
}
