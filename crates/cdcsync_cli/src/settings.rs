//! JSON settings file.

use crate::error::{CliError, CliResult};
use cdcsync_engine::{Allowlist, ConstantsConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Overrides read from `--settings`.
///
/// ```json
/// {
///   "allowlist": ["WP_DEBUG", "PHP_VERSION"],
///   "wait_time_secs": 60,
///   "env_prefix": "SITE_",
///   "typed": true
/// }
/// ```
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Constants to monitor instead of the default list.
    #[serde(default)]
    pub allowlist: Option<Vec<String>>,
    /// Debounce window in seconds.
    #[serde(default)]
    pub wait_time_secs: Option<u64>,
    /// Prefix of the environment variables constants are read from.
    #[serde(default)]
    pub env_prefix: String,
    /// Parse `true`/`false` and integers instead of keeping strings.
    #[serde(default = "default_typed")]
    pub typed: bool,
}

fn default_typed() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            allowlist: None,
            wait_time_secs: None,
            env_prefix: String::new(),
            typed: default_typed(),
        }
    }
}

impl Settings {
    /// Reads settings from a JSON file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::SettingsIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| CliError::SettingsFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Builds the constants module configuration.
    pub fn constants_config(&self) -> ConstantsConfig {
        let mut config = match &self.allowlist {
            Some(names) => ConstantsConfig::new(names.iter().cloned().collect::<Allowlist>()),
            None => ConstantsConfig::default(),
        };
        if let Some(secs) = self.wait_time_secs {
            config = config.with_wait_time(Duration::from_secs(secs));
        }
        config
    }
}
