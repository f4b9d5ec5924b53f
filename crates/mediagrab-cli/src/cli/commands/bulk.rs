//! `mediagrab bulk <urls>...` – download many URLs into one ZIP archive.

use anyhow::{bail, Context, Result};
use mediagrab_core::config::MediagrabConfig;
use mediagrab_core::fetch::{CurlFetcher, CurlOptions, Fetcher};
use mediagrab_core::persist::DirectorySink;
use mediagrab_core::pipeline::{BulkOptions, BulkPipeline, BulkRequest};
use mediagrab_core::progress::{Phase, ProgressEvent, ProgressMessage};
use mediagrab_core::url_model::validate_url;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::output_dir;

#[derive(Debug)]
pub struct BulkArgs {
    pub urls: Vec<String>,
    pub urls_file: Option<PathBuf>,
    pub account: Option<String>,
    pub out: Option<PathBuf>,
    pub json_progress: bool,
}

pub async fn run_bulk(cfg: &MediagrabConfig, args: BulkArgs) -> Result<()> {
    let mut urls = args.urls;
    if let Some(path) = &args.urls_file {
        urls.extend(read_urls_file(path)?);
    }
    if urls.is_empty() {
        bail!("no URLs given (pass them as arguments or with --urls-file)");
    }
    for url in &urls {
        validate_url(url)?;
    }

    let dir = output_dir(cfg, args.out.as_deref())?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(CurlFetcher::new(CurlOptions::from_config(cfg)));
    let sink = Arc::new(DirectorySink::new(&dir, Arc::clone(&fetcher)));
    let pipeline = BulkPipeline::new(fetcher, sink, BulkOptions::from_config(cfg));

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel::<ProgressEvent>();
    let json = args.json_progress;
    let progress_handle = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            if json {
                if let Ok(line) = serde_json::to_string(&ProgressMessage::from(event)) {
                    println!("{}", line);
                }
            } else {
                print_status(&event);
            }
        }
    });

    let request = BulkRequest::new(urls, args.account.filter(|a| !a.is_empty()));
    let result = pipeline.run(request, Arc::new(progress_tx)).await;
    // The pipeline owned the last sender; the printer drains and exits.
    let _ = progress_handle.await;
    let result = result?;

    for failure in &result.failures {
        eprintln!("failed: {} ({})", failure.url, failure.error);
    }
    println!(
        "Saved {} ({} entries, {} bytes) to {}",
        result.archive_name,
        result.entries.len(),
        result.archive_size,
        dir.display()
    );
    Ok(())
}

fn print_status(event: &ProgressEvent) {
    let label = match event.phase {
        Phase::Download => "downloading",
        Phase::Compression => "compressing",
    };
    let msg = ProgressMessage::from(*event);
    let mut out = std::io::stdout().lock();
    let _ = write!(out, "{}", status_line(label, msg.percent));
    if event.is_last {
        let _ = writeln!(out);
    }
    // No newline until the phase ends, so flush to show the update.
    let _ = out.flush();
}

fn status_line(label: &str, percent: f64) -> String {
    format!("\r  {:<12} {:>6.2}%  ", label, percent)
}

/// One URL per line; blank lines and lines starting with `#` are skipped.
fn read_urls_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read URL list {}", path.display()))?;
    Ok(parse_url_list(&text))
}

fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}
