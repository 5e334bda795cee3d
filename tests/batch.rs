//! End-to-end integration tests for the batch pipeline.
//!
//! These tests run the whole extract → select → convert → package chain
//! against a mock model client, so they need no network and no API key.
//!
//! Run with:
//!   cargo test --test batch -- --nocapture

use async_trait::async_trait;
use futures::StreamExt;
use langconvert::{
    convert_bundle, progress_stream, submit, Bundle, BundleFile, ConversionConfig, ConvertError,
    JobRegistry, JobState, ModelClient, ModelError, ProgressSnapshot,
};
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Marker that makes [`MockModel`] fail the call carrying it.
const POISON: &str = "UNTRANSLATABLE";

/// Deterministic mock: echoes a fenced conversion, or fails on the marker.
struct MockModel;

#[async_trait]
impl ModelClient for MockModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        if prompt.contains(POISON) {
            return Err(ModelError::Api("simulated model failure".into()));
        }
        Ok("```js\nconsole.log('converted');\n```".to_string())
    }
}

/// Config wired to the mock, with timings short enough for tests.
fn mock_config() -> ConversionConfig {
    ConversionConfig::builder()
        .client(Arc::new(MockModel))
        .max_retries(0)
        .retry_backoff_ms(1)
        .poll_interval_ms(10)
        .grace_delay_ms(10)
        .build()
        .unwrap()
}

fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }
    buf.into_inner()
}

fn archive_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn archive_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut content = String::new();
    archive
        .by_name(name)
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    content
}

fn state_rank(state: JobState) -> u8 {
    match state {
        JobState::Preparing => 0,
        JobState::Converting => 1,
        JobState::Completed | JobState::Error => 2,
    }
}

// ── Success path ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn folder_batch_converts_every_file() {
    let bundle = Bundle::Files(vec![
        BundleFile::new("a.py", "print(1)"),
        BundleFile::new("b.py", "print(2)"),
        BundleFile::new("sub/c.py", "print(3)"),
    ]);

    let output = convert_bundle(bundle, "python", "js", &mock_config())
        .await
        .expect("batch should succeed");

    assert_eq!(output.files, vec!["a.js", "b.js", "sub/c.js"]);

    let mut names = archive_names(&output.archive);
    names.sort();
    assert_eq!(names, vec!["a.js", "b.js", "sub/c.js"]);
    assert_eq!(
        archive_entry(&output.archive, "a.js"),
        "console.log('converted');"
    );
}

#[tokio::test]
async fn zip_bundle_round_trips() {
    let bytes = zip_bytes(&[("main.py", "print('hi')"), ("pkg/util.py", "pass")]);
    let bundle = Bundle::Archives(vec![BundleFile::new("project.zip", bytes)]);

    let output = convert_bundle(bundle, "python", "js", &mock_config())
        .await
        .expect("zip batch should succeed");

    assert_eq!(output.files.len(), 2);
    let mut names = archive_names(&output.archive);
    names.sort();
    assert_eq!(names, vec!["main.js", "pkg/util.js"]);
}

#[tokio::test]
async fn non_matching_files_pass_through_unconverted() {
    let bundle = Bundle::Files(vec![
        BundleFile::new("a.py", "print(1)"),
        BundleFile::new("README.md", "# docs"),
    ]);

    let output = convert_bundle(bundle, "python", "js", &mock_config())
        .await
        .unwrap();

    // Only the .py file converts; the .md file ships in the archive as-is.
    assert_eq!(output.files, vec!["a.js"]);
    let mut names = archive_names(&output.archive);
    names.sort();
    assert_eq!(names, vec!["README.md", "a.js"]);
    assert_eq!(archive_entry(&output.archive, "README.md"), "# docs");
}

#[tokio::test]
async fn unknown_language_yields_empty_batch() {
    let bundle = Bundle::Files(vec![BundleFile::new("a.py", "print(1)")]);

    let output = convert_bundle(bundle, "cobol", "js", &mock_config())
        .await
        .expect("zero convertible files is a valid, empty batch");

    assert!(output.files.is_empty());
    // The untouched source still ships in the archive.
    assert_eq!(archive_names(&output.archive), vec!["a.py"]);
}

// ── Failure path: all-or-nothing ─────────────────────────────────────────────

#[tokio::test]
async fn failed_file_aborts_batch_and_reclaims_storage() {
    // Discovery order is sorted, so a.py succeeds before b.py poisons the run.
    let bundle = Bundle::Files(vec![
        BundleFile::new("a.py", "print(1)"),
        BundleFile::new("b.py", POISON),
        BundleFile::new("c.py", "print(3)"),
    ]);
    let config = mock_config();
    let registry = JobRegistry::new();

    let id = submit(bundle, "python", "js", &config, &registry).unwrap();
    let workdir = registry.workdir_path(&id).unwrap();

    let snapshots: Vec<ProgressSnapshot> = progress_stream(&registry, &id, &config)
        .unwrap()
        .collect()
        .await;

    let last = snapshots.last().unwrap();
    assert_eq!(last.state, JobState::Error);
    assert_eq!(last.processed, 1, "only a.py converts before the abort");
    assert!(
        last.error.as_deref().unwrap().contains("b.py"),
        "error should name the failing file: {:?}",
        last.error
    );

    // No partial result: working storage (and any partial output) is gone.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!workdir.exists(), "failed job must not leak storage");
    assert!(matches!(
        registry.retrieve_archive(&id).await,
        Err(ConvertError::JobNotFound { .. } | ConvertError::ArchiveNotReady { .. })
    ));
}

#[tokio::test]
async fn corrupt_archive_fails_the_job_before_any_file() {
    let bundle = Bundle::Archives(vec![BundleFile::new("bad.zip", b"not a zip".to_vec())]);
    let config = mock_config();
    let registry = JobRegistry::new();

    let id = submit(bundle, "python", "js", &config, &registry).unwrap();
    let workdir = registry.workdir_path(&id).unwrap();

    let snapshots: Vec<ProgressSnapshot> = progress_stream(&registry, &id, &config)
        .unwrap()
        .collect()
        .await;

    // Extraction fails during `preparing`: no file is ever attempted.
    let last = snapshots.last().unwrap();
    assert_eq!(last.state, JobState::Error);
    assert_eq!(last.processed, 0);
    assert_eq!(last.total, 0);
    assert!(
        last.error.as_deref().unwrap().contains("bad.zip"),
        "error should name the unreadable archive: {:?}",
        last.error
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!workdir.exists(), "failed job must not leak storage");
    assert!(matches!(
        registry.retrieve_archive(&id).await,
        Err(ConvertError::JobNotFound { .. } | ConvertError::ArchiveNotReady { .. })
    ));
}

#[tokio::test]
async fn eager_api_surfaces_the_failure() {
    let bundle = Bundle::Files(vec![BundleFile::new("a.py", POISON)]);

    let err = convert_bundle(bundle, "python", "js", &mock_config())
        .await
        .unwrap_err();

    assert!(matches!(err, ConvertError::ConversionFailed { .. }));
    assert!(err.to_string().contains("a.py"));
}

// ── Progress observation ─────────────────────────────────────────────────────

#[tokio::test]
async fn progress_snapshots_are_monotonic_and_complete() {
    let bundle = Bundle::Files(vec![
        BundleFile::new("a.py", "print(1)"),
        BundleFile::new("b.py", "print(2)"),
    ]);
    let config = mock_config();
    let registry = JobRegistry::new();

    let id = submit(bundle, "python", "js", &config, &registry).unwrap();
    let snapshots: Vec<ProgressSnapshot> = progress_stream(&registry, &id, &config)
        .unwrap()
        .collect()
        .await;

    let last = snapshots.last().unwrap();
    assert_eq!(last.state, JobState::Completed);
    assert_eq!(last.processed, 2);
    assert_eq!(last.total, 2);
    assert_eq!(last.converted_files, vec!["a.js", "b.js"]);

    for pair in snapshots.windows(2) {
        assert!(pair[1].processed >= pair[0].processed, "count regressed");
        assert!(
            state_rank(pair[1].state) >= state_rank(pair[0].state),
            "state regressed: {:?} after {:?}",
            pair[1].state,
            pair[0].state
        );
    }

    // Completed job: archive still retrievable, exactly once.
    let archive = registry.retrieve_archive(&id).await.unwrap();
    assert_eq!(archive_names(&archive).len(), 2);
    assert!(matches!(
        registry.retrieve_archive(&id).await,
        Err(ConvertError::JobNotFound { .. })
    ));
}

#[tokio::test]
async fn submit_rejects_empty_languages() {
    let registry = JobRegistry::new();
    let err = submit(
        Bundle::Files(vec![]),
        "",
        "js",
        &mock_config(),
        &registry,
    )
    .unwrap_err();
    assert!(matches!(err, ConvertError::InvalidInput { .. }));
}
