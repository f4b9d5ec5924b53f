//! CLI for mediagrab.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use mediagrab_core::config;
use mediagrab_core::strategy::StrategyKind;
use std::path::PathBuf;

use commands::{run_bulk, run_single, BulkArgs, SingleArgs};

/// Top-level CLI for mediagrab.
#[derive(Debug, Parser)]
#[command(name = "mediagrab")]
#[command(about = "mediagrab: download media in bulk as a ZIP, or one file at a time", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every URL and save them together as one ZIP archive.
    Bulk {
        /// Resource URLs, in archive order.
        urls: Vec<String>,

        /// Read additional URLs from a file, one per line (blank lines and `#` comments skipped).
        #[arg(long, value_name = "PATH")]
        urls_file: Option<PathBuf>,

        /// Account label; the archive is saved as `<account>.zip`.
        #[arg(long)]
        account: Option<String>,

        /// Directory to save into (overrides `download_dir` from config).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Print progress as JSON lines instead of a status line.
        #[arg(long)]
        json_progress: bool,
    },

    /// Download one URL, saved as `<account>_<file name>`.
    Single {
        /// Resource URL.
        url: String,

        /// Account label used as the file name prefix.
        #[arg(long)]
        account: String,

        /// Directory to save into (overrides `download_dir` from config).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// First strategy to try (the other one is used for the retry).
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },

    /// Print the config file path.
    ConfigPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Direct,
    Fetch,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Direct => StrategyKind::Direct,
            StrategyArg::Fetch => StrategyKind::Fetch,
        }
    }
}

impl Cli {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        if let CliCommand::ConfigPath = cli.command {
            println!("{}", config::config_path()?.display());
            return Ok(());
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Bulk {
                urls,
                urls_file,
                account,
                out,
                json_progress,
            } => {
                let args = BulkArgs {
                    urls,
                    urls_file,
                    account,
                    out,
                    json_progress,
                };
                run_bulk(&cfg, args).await?;
            }
            CliCommand::Single {
                url,
                account,
                out,
                strategy,
            } => {
                let args = SingleArgs {
                    url,
                    account,
                    out,
                    strategy: strategy.map(StrategyKind::from),
                };
                run_single(&cfg, args).await?;
            }
            CliCommand::ConfigPath => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
