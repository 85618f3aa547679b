//! Server flags shared by `xlfill serve` and `xlfill-server`

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::Args;

use crate::config::Settings;
use crate::error::XlFillResult;

/// Every flag can also be set through its `XLFILL_*` environment variable.
/// Both override the settings file.
#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    /// YAML settings file
    #[arg(short, long, env = "XLFILL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Service name reported by the info endpoints
    #[arg(long, env = "XLFILL_APP_NAME")]
    pub app_name: Option<String>,

    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, env = "XLFILL_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "XLFILL_PORT")]
    pub port: Option<u16>,

    /// Directory holding the .xlsx templates
    #[arg(short, long, env = "XLFILL_TEMPLATES_DIR")]
    pub templates_dir: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, env = "XLFILL_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Include internal error details in responses
    #[arg(
        long,
        env = "XLFILL_DEBUG",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub debug: Option<bool>,

    /// Allowed CORS origins, comma separated (`*` allows any)
    #[arg(long, env = "XLFILL_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Request body limit in bytes
    #[arg(long, env = "XLFILL_MAX_BODY_BYTES")]
    pub max_body_bytes: Option<usize>,
}

impl ServerArgs {
    /// Defaults, settings file, then these flags and variables
    pub fn settings(&self) -> XlFillResult<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        self.apply(&mut settings);
        Ok(settings)
    }

    pub fn apply(&self, settings: &mut Settings) {
        if let Some(name) = &self.app_name {
            settings.app_name = name.clone();
        }
        if let Some(host) = &self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(dir) = &self.templates_dir {
            settings.templates_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
        }
        if let Some(debug) = self.debug {
            settings.debug = debug;
        }
        if let Some(origins) = &self.cors_origins {
            settings.cors_origins = origins
                .iter()
                .map(|o| o.trim())
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(limit) = self.max_body_bytes {
            settings.max_body_bytes = limit;
        }
    }
}
