//! Integration tests: both pipelines against a local HTTP server, saving
//! through a real directory sink with the curl fetcher.

mod common;

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;

use mediagrab_core::config::MediagrabConfig;
use mediagrab_core::fetch::{CurlFetcher, CurlOptions, Fetcher};
use mediagrab_core::persist::{DirectorySink, PersistStatus, PersistenceSink};
use mediagrab_core::pipeline::{BulkOptions, BulkPipeline, BulkRequest, SinglePipeline, SingleRequest};
use mediagrab_core::progress::{Phase, ProgressLog};
use mediagrab_core::strategy::StrategyKind;
use tempfile::tempdir;

fn fetcher() -> Arc<dyn Fetcher> {
    Arc::new(CurlFetcher::new(CurlOptions::from_config(
        &MediagrabConfig::default(),
    )))
}

fn read_zip(path: &std::path::Path) -> Vec<(String, Vec<u8>)> {
    let bytes = std::fs::read(path).unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..zip.len())
        .map(|i| {
            let mut f = zip.by_index(i).unwrap();
            let mut buf = Vec::new();
            f.read_to_end(&mut buf).unwrap();
            (f.name().to_string(), buf)
        })
        .collect()
}

/// Runs a real transfer and returns every `(loaded, total)` the callback saw.
fn progress_calls(url: &str) -> (Vec<u8>, Vec<(u64, Option<u64>)>) {
    let mut calls = Vec::new();
    let body = fetcher()
        .fetch_with_progress(url, &HashMap::new(), &mut |loaded, total| {
            calls.push((loaded, total))
        })
        .expect("fetch");
    (body, calls)
}

#[test]
fn curl_progress_reports_loaded_and_advertised_total() {
    let body: Vec<u8> = (0u8..=250).cycle().take(200_000).collect();
    let server = common::media_server::start(&[("/v/clip.mp4", &body[..])]);

    let (fetched, calls) = progress_calls(&server.url("/v/clip.mp4"));

    assert_eq!(fetched, body);
    let len = body.len() as u64;
    assert!(!calls.is_empty());
    assert_eq!(*calls.last().unwrap(), (len, Some(len)));
    assert!(calls.windows(2).all(|w| w[0].0 <= w[1].0), "{calls:?}");
}

#[test]
fn curl_progress_total_is_none_without_size_header() {
    let body: Vec<u8> = (0u8..=250).cycle().take(200_000).collect();
    let server = common::media_server::start_close_delimited(&[("/v/live.mp4", &body[..])]);

    let (fetched, calls) = progress_calls(&server.url("/v/live.mp4"));

    assert_eq!(fetched, body);
    assert!(!calls.is_empty());
    assert!(calls.iter().all(|(_, total)| total.is_none()), "{calls:?}");
    assert_eq!(calls.last().unwrap().0, body.len() as u64);
    assert!(calls.windows(2).all(|w| w[0].0 <= w[1].0), "{calls:?}");
}

#[tokio::test]
async fn bulk_job_saves_zip_with_placeholder_for_missing_item() {
    let photo: Vec<u8> = (0u8..=255).cycle().take(32 * 1024).collect();
    let server = common::media_server::start(&[
        ("/m/a1.jpg", &photo[..]),
        ("/m/clip.mp4", b"not really a video"),
    ]);
    let out = tempdir().unwrap();
    let fetcher = fetcher();
    let sink = Arc::new(DirectorySink::new(out.path(), fetcher.clone()));
    let pipeline = BulkPipeline::new(fetcher, sink.clone(), BulkOptions::default());

    let urls = vec![
        server.url("/m/a1.jpg?oh=token"),
        server.url("/m/missing.jpg"),
        server.url("/m/clip.mp4"),
    ];
    let log = Arc::new(ProgressLog::new());
    let result = pipeline
        .run(BulkRequest::new(urls, Some("acct".to_string())), log.clone())
        .await
        .expect("bulk job");

    assert_eq!(result.archive_name, "acct.zip");
    assert_eq!(result.failures.len(), 1);
    assert!(result.failures[0].error.contains("404"), "{}", result.failures[0].error);
    assert_eq!(sink.poll(result.handle), PersistStatus::Complete);

    let entries = read_zip(&out.path().join("acct.zip"));
    let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["a1.jpg", "error_read_me.txt", "clip.mp4"]);
    assert_eq!(entries[0].1, photo);
    assert!(String::from_utf8_lossy(&entries[1].1).contains("404"));
    assert_eq!(entries[2].1, b"not really a video");

    assert_eq!(log.phase(Phase::Download).len(), 3);
    let compression = log.phase(Phase::Compression);
    assert!(compression.first().unwrap().is_first);
    assert!(compression.last().unwrap().is_last);
}

#[tokio::test]
async fn single_direct_download_sends_referer() {
    let server = common::media_server::start(&[("/p/a1.jpg", b"jpeg bytes")]);
    let out = tempdir().unwrap();
    let fetcher = fetcher();
    let sink = Arc::new(DirectorySink::new(out.path(), fetcher.clone()));
    let pipeline = SinglePipeline::for_kind(
        StrategyKind::Direct,
        fetcher,
        sink.clone(),
        Some("instagram.com".to_string()),
    );

    let outcome = pipeline
        .download_single(SingleRequest::new(server.url("/p/a1.jpg?x=1"), "acct"))
        .await;

    assert_eq!(outcome.file_name, "acct_a1.jpg");
    assert!(!outcome.retried());
    assert_eq!(
        std::fs::read(out.path().join("acct_a1.jpg")).unwrap(),
        b"jpeg bytes"
    );
    assert_eq!(server.referers(), [Some("instagram.com".to_string())]);
}

#[tokio::test]
async fn single_failed_save_is_retried_with_fetch_strategy() {
    let server = common::media_server::start(&[]);
    let out = tempdir().unwrap();
    let fetcher = fetcher();
    let sink = Arc::new(DirectorySink::new(out.path(), fetcher.clone()));
    let pipeline = SinglePipeline::for_kind(StrategyKind::Direct, fetcher, sink.clone(), None);

    let outcome = pipeline
        .download_single(SingleRequest::new(server.url("/p/gone.jpg"), "acct"))
        .await;

    let first = outcome.handle.expect("sink accepted the first attempt");
    assert!(sink.poll(first).is_failed());
    let retry = outcome.retry.expect("retry scheduled");
    retry.join().await;

    // Direct streamed once, then the fetch strategy requested the URL again.
    assert_eq!(server.referers().len(), 2);
    assert!(!out.path().join("acct_gone.jpg").exists());
}
