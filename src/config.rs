//! Shell configuration, read from `<config dir>/greetdesk/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::views::remote::DEFAULT_ENDPOINT;

const APP_DIR: &str = "greetdesk";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// JSON endpoint polled by the `fetchApi` view model.
    pub remote_endpoint: String,
    /// Command server port; `0` picks a free one.
    pub server_port: u16,
    pub localhost_only: bool,
    /// API sidecar executable (path or name on PATH). No sidecar when unset.
    pub sidecar_program: Option<String>,
    pub sidecar_args: Vec<String>,
    /// Default log filter, overridden by `RUST_LOG`.
    pub log_level: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            remote_endpoint: DEFAULT_ENDPOINT.to_string(),
            server_port: 0,
            localhost_only: true,
            sidecar_program: None,
            sidecar_args: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

impl ShellConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::trace!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
