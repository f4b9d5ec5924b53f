//! CLI command handlers, one file per command.

mod bulk;
mod single;

pub use bulk::{run_bulk, BulkArgs};
pub use single::{run_single, SingleArgs};

use anyhow::Result;
use mediagrab_core::config::MediagrabConfig;
use std::path::{Path, PathBuf};

/// `--out`, else `download_dir` from config, else the current directory.
pub(crate) fn output_dir(cfg: &MediagrabConfig, out: Option<&Path>) -> Result<PathBuf> {
    match out.or(cfg.download_dir.as_deref()) {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(std::env::current_dir()?),
    }
}
