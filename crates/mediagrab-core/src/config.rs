use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::archive::CompressionKind;
use crate::pipeline::PlaceholderMode;
use crate::progress::FractionFormula;
use crate::strategy::StrategyKind;

/// Referer sent by the direct strategy unless the config says otherwise.
pub const DEFAULT_REFERER: &str = "instagram.com";

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_referer() -> Option<String> {
    Some(DEFAULT_REFERER.to_string())
}

/// Global configuration loaded from `~/.config/mediagrab/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediagrabConfig {
    /// Directory finished files are saved into (None = current directory).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Connect timeout for each transfer, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Hard timeout for each transfer, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Optional `User-Agent` for every request.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// `Referer` attached by the direct strategy. Set to an empty string to omit it.
    #[serde(default = "default_referer")]
    pub referer: Option<String>,
    /// Primary strategy for single downloads; the other one is used for the retry.
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Download-phase progress formula: "corrected" (default) or "legacy".
    #[serde(default)]
    pub progress_fraction: FractionFormula,
    /// What a failed bulk item leaves in the archive: "collapsed" or "disabled".
    #[serde(default)]
    pub placeholder: PlaceholderMode,
    /// ZIP compression method: "deflated" (default) or "stored".
    #[serde(default)]
    pub compression: CompressionKind,
}

impl Default for MediagrabConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            user_agent: None,
            referer: default_referer(),
            strategy: StrategyKind::default(),
            progress_fraction: FractionFormula::default(),
            placeholder: PlaceholderMode::default(),
            compression: CompressionKind::default(),
        }
    }
}

impl MediagrabConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Referer header value, if one should be sent.
    pub fn referer(&self) -> Option<&str> {
        self.referer.as_deref().filter(|r| !r.is_empty())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mediagrab")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MediagrabConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MediagrabConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<MediagrabConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: MediagrabConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
