use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration, loaded from a YAML file with every field optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Configuration {
    /// HTTP bind address for the kiosk and admin surfaces.
    #[serde(default = "default_listen_address")]
    pub listen_address: SocketAddr,

    /// Flat directory holding the uploaded photos. Created on startup.
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    /// How long each photo stays on screen before the slideshow advances.
    #[serde(default = "default_slideshow_interval", with = "humantime_serde")]
    pub slideshow_interval: Duration,

    /// Accepted upload extensions, lowercase, without the leading dot.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Configuration {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let cfg: Configuration = serde_yaml::from_slice(&data)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.slideshow_interval.is_zero() {
            bail!("slideshow-interval must be greater than zero");
        }
        if self.allowed_extensions.is_empty() {
            bail!("allowed-extensions must not be empty");
        }
        if let Some(ext) = self
            .allowed_extensions
            .iter()
            .find(|e| e.is_empty() || e.contains('.'))
        {
            bail!("allowed-extensions entries must be bare suffixes, got \"{ext}\"");
        }
        Ok(())
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            storage_path: default_storage_path(),
            slideshow_interval: default_slideshow_interval(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("photos")
}

fn default_slideshow_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_allowed_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "webp"]
        .into_iter()
        .map(str::to_string)
        .collect()
}
