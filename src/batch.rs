//! The batch conversion pipeline: one job, many files, strict sequence.
//!
//! ## State machine
//!
//! ```text
//! preparing ──▶ converting ──▶ completed
//!     │             │
//!     └─────────────┴────────▶ error
//! ```
//!
//! * `preparing` — bundle extraction and file selection
//! * `converting` — the per-file loop
//! * `completed` — all files converted and the result archive written
//! * `error` — extraction failed, or any single file failed
//!
//! The per-file loop is strictly sequential: the model call is the
//! bottleneck, and "current file" progress reporting must stay
//! deterministic and monotonic. The batch is all-or-nothing — one failed
//! file aborts the job, discards working storage, and no partial archive
//! is ever produced, even though earlier files were already rewritten on
//! disk.
//!
//! Cancellation mid-batch is not supported: observers can stop polling,
//! but the spawned task runs to completion or failure regardless, and
//! failure always cleans up storage with no observer present.

use crate::client::{resolve_client, ModelClient};
use crate::config::ConversionConfig;
use crate::converter::Converter;
use crate::error::ConvertError;
use crate::job::{FileStatus, JobRegistry, JobState, ProgressWriter};
use crate::languages;
use crate::pipeline::extract::{self, Bundle};
use crate::pipeline::package::{self, ARCHIVE_NAME};
use crate::pipeline::select;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result of an eager batch conversion.
#[derive(Debug)]
pub struct BatchOutput {
    /// Relative paths of the converted files, in processing order.
    pub files: Vec<String>,
    /// The packaged result archive (zip, deflate).
    pub archive: Vec<u8>,
}

/// Submit a batch conversion job.
///
/// Registers the job, spawns its pipeline task, and returns the job id
/// immediately. Observe progress via [`crate::stream::progress_stream`]
/// or [`JobRegistry::snapshot`], and fetch the result with
/// [`JobRegistry::retrieve_archive`].
pub fn submit(
    bundle: Bundle,
    source_lang: &str,
    target_lang: &str,
    config: &ConversionConfig,
    registry: &JobRegistry,
) -> Result<String, ConvertError> {
    let (id, _handle) = submit_with_handle(bundle, source_lang, target_lang, config, registry)?;
    Ok(id)
}

/// Convert a bundle eagerly: run the whole job and return the archive.
///
/// Convenience wrapper over [`submit`] for callers that don't need
/// progress reporting. Uses a private registry, so the job is invisible
/// to any shared one.
pub async fn convert_bundle(
    bundle: Bundle,
    source_lang: &str,
    target_lang: &str,
    config: &ConversionConfig,
) -> Result<BatchOutput, ConvertError> {
    let registry = JobRegistry::new();
    let (id, handle) = submit_with_handle(bundle, source_lang, target_lang, config, &registry)?;

    let files = handle.await.map_err(|e| ConvertError::ConversionFailed {
        file: None,
        detail: format!("pipeline task failed: {e}"),
    })??;

    let archive = registry.retrieve_archive(&id).await?;
    Ok(BatchOutput { files, archive })
}

fn submit_with_handle(
    bundle: Bundle,
    source_lang: &str,
    target_lang: &str,
    config: &ConversionConfig,
    registry: &JobRegistry,
) -> Result<(String, JoinHandle<Result<Vec<String>, ConvertError>>), ConvertError> {
    if source_lang.is_empty() || target_lang.is_empty() {
        return Err(ConvertError::InvalidInput {
            detail: "source and target language must be non-empty".into(),
        });
    }

    // Resolve the client up front so configuration problems surface at
    // submit time, before any storage is touched.
    let client = resolve_client(config)?;

    let workdir = tempfile::Builder::new()
        .prefix("convert_job_")
        .tempdir()
        .map_err(|e| ConvertError::io(std::env::temp_dir(), e))?;
    let workdir_path = workdir.path().to_path_buf();
    let id = workdir_path
        .file_name()
        .expect("tempdir has a basename")
        .to_string_lossy()
        .to_string();

    let writer = registry.register(&id, workdir);
    info!("job {id}: submitted ({source_lang} → {target_lang})");

    let handle = tokio::spawn(run_job(
        id.clone(),
        registry.clone(),
        writer,
        workdir_path,
        bundle,
        source_lang.to_string(),
        target_lang.to_string(),
        config.clone(),
        client,
    ));

    Ok((id, handle))
}

/// Drive one job through the state machine to a terminal state.
#[allow(clippy::too_many_arguments)]
async fn run_job(
    id: String,
    registry: JobRegistry,
    writer: ProgressWriter,
    workdir: PathBuf,
    bundle: Bundle,
    source_lang: String,
    target_lang: String,
    config: ConversionConfig,
    client: Arc<dyn ModelClient>,
) -> Result<Vec<String>, ConvertError> {
    let result = drive(
        &id,
        &registry,
        &writer,
        &workdir,
        bundle,
        &source_lang,
        &target_lang,
        &config,
        &client,
    )
    .await;

    match &result {
        Ok(files) => {
            writer.update(|s| s.state = JobState::Completed);
            info!("job {id}: completed ({} files)", files.len());
        }
        Err(e) => {
            warn!("job {id}: failed — {e}");
            writer.fail(e.to_string());
            // Failure cleanup runs whether or not anyone is watching.
            registry.discard_storage(&id);
        }
    }

    // Bounded idle timeout: an unclaimed job (result never downloaded, or
    // failed with no observer) must not leak storage or registry entries.
    let ttl = std::time::Duration::from_secs(config.job_ttl_secs);
    let expire_registry = registry.clone();
    let expire_id = id.clone();
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        expire_registry.expire(&expire_id);
    });

    result
}

#[allow(clippy::too_many_arguments)]
async fn drive(
    id: &str,
    registry: &JobRegistry,
    writer: &ProgressWriter,
    workdir: &Path,
    bundle: Bundle,
    source_lang: &str,
    target_lang: &str,
    config: &ConversionConfig,
    client: &Arc<dyn ModelClient>,
) -> Result<Vec<String>, ConvertError> {
    // ── Extract ──────────────────────────────────────────────────────────
    let extract_dir = workdir.join("extracted");
    extract::materialize(&bundle, &extract_dir)?;

    // ── Select ───────────────────────────────────────────────────────────
    let files = select::select_files(&extract_dir, source_lang)?;
    info!("job {id}: {} convertible files", files.len());
    writer.update(|s| {
        s.total = files.len();
        s.state = JobState::Converting;
    });

    let converter = Converter::for_language(source_lang);
    let target_ext = languages::canonical_extension(target_lang).unwrap_or("");
    let mut converted: Vec<String> = Vec::with_capacity(files.len());

    // ── Convert, strictly sequential, in discovery order ────────────────
    for path in &files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        writer.update(|s| {
            s.current_file = Some(file_name.clone());
            s.current_file_status = Some(FileStatus::Converting);
        });
        debug!("job {id}: converting {file_name}");

        let code = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;

        let converted_code = converter
            .convert(client, source_lang, target_lang, &code, config)
            .await
            .map_err(|e| match e {
                ConvertError::ConversionFailed { detail, .. } => ConvertError::ConversionFailed {
                    file: Some(file_name.clone()),
                    detail,
                },
                other => other,
            })?;

        // Swap the extension to the target language's canonical one.
        let target_path = path.with_file_name(format!(
            "{}{target_ext}",
            path.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| file_name.clone())
        ));
        std::fs::write(&target_path, &converted_code)
            .map_err(|e| ConvertError::io(&target_path, e))?;

        let source_ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        if source_ext != target_ext {
            std::fs::remove_file(path).map_err(|e| ConvertError::io(path, e))?;
        }

        let rel = target_path
            .strip_prefix(&extract_dir)
            .unwrap_or(&target_path)
            .to_string_lossy()
            .to_string();

        writer.update(|s| {
            s.current_file_status = Some(FileStatus::Completed);
            s.processed += 1;
            s.converted_files.push(rel.clone());
        });
        converted.push(rel);
    }

    // ── Package ──────────────────────────────────────────────────────────
    let archive_path = package::write_archive(&extract_dir, &workdir.join(ARCHIVE_NAME))?;
    registry.set_archive(id, archive_path);

    Ok(converted)
}
