use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "sockline.toml";

/// Optional on-disk defaults for the binary. Every field may be omitted;
/// command-line flags override whatever the file supplies.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub retries: Option<u32>,
    pub connect_timeout_ms: Option<u64>,
    pub retry_backoff_ms: Option<u64>,
    pub chunk_size: Option<usize>,
}

impl FileConfig {
    /// Load from the explicit path if given, otherwise the first candidate
    /// that exists. Returns the config together with the path it came from
    /// (`None` when no file was found and defaults apply).
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::read(path)?, Some(path.to_owned())));
        }
        for candidate in Self::candidates() {
            if candidate.exists() {
                debug!(path = %candidate.display(), "loading config file");
                return Ok((Self::read(&candidate)?, Some(candidate)));
            }
        }
        Ok((Self::default(), None))
    }

    /// Search order: working directory first, then the platform config dir.
    pub fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dirs) = ProjectDirs::from("", "", "sockline") {
            paths.push(dirs.config_dir().join(CONFIG_FILE_NAME));
        }
        paths
    }

    fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }
}
