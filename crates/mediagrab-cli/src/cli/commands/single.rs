//! `mediagrab single <url> --account <name>` – save one resource.

use anyhow::{bail, Result};
use mediagrab_core::config::MediagrabConfig;
use mediagrab_core::fetch::{CurlFetcher, CurlOptions, Fetcher};
use mediagrab_core::persist::{DirectorySink, PersistStatus, PersistenceSink};
use mediagrab_core::pipeline::{RetryOutcome, SinglePipeline, SingleRequest};
use mediagrab_core::strategy::StrategyKind;
use mediagrab_core::url_model::validate_url;
use std::path::PathBuf;
use std::sync::Arc;

use super::output_dir;

#[derive(Debug)]
pub struct SingleArgs {
    pub url: String,
    pub account: String,
    pub out: Option<PathBuf>,
    /// Overrides `strategy` from config.
    pub strategy: Option<StrategyKind>,
}

pub async fn run_single(cfg: &MediagrabConfig, args: SingleArgs) -> Result<()> {
    validate_url(&args.url)?;
    let dir = output_dir(cfg, args.out.as_deref())?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(CurlFetcher::new(CurlOptions::from_config(cfg)));
    let sink = Arc::new(DirectorySink::new(&dir, Arc::clone(&fetcher)));
    let kind = args.strategy.unwrap_or(cfg.strategy);
    let pipeline = SinglePipeline::for_kind(
        kind,
        fetcher,
        sink.clone(),
        cfg.referer().map(str::to_string),
    );

    let outcome = pipeline
        .download_single(SingleRequest::new(args.url, args.account))
        .await;
    let path = dir.join(&outcome.file_name);

    let Some(retry) = outcome.retry else {
        println!("Saved {}", path.display());
        return Ok(());
    };

    // The process would exit under a pending retry, so wait for it here and
    // report what the sink ended up with.
    println!("First attempt failed; retrying with {} strategy", kind.alternate());
    match retry.join().await {
        RetryOutcome::Attempted(Some(handle)) => match sink.poll(handle) {
            PersistStatus::Complete => {
                println!("Saved {}", path.display());
                Ok(())
            }
            PersistStatus::Failed(reason) => bail!("retry failed: {}", reason),
            other => bail!("retry ended in state {:?}", other),
        },
        RetryOutcome::Attempted(None) => bail!("retry was refused; see log for details"),
        RetryOutcome::Cancelled => bail!("retry cancelled"),
    }
}
