//! Job data model and the job registry.
//!
//! A conversion job is one batch request spanning possibly many files,
//! tracked by a single identifier. Its progress record lives behind a
//! `tokio::sync::watch` channel: the pipeline task driving the job is the
//! **single writer** (it owns the [`ProgressWriter`]), and any number of
//! observers clone the receiver and read atomic snapshots — an observer can
//! never see a torn mix of, say, an incremented count paired with the old
//! file name, because every update replaces the whole snapshot.
//!
//! The registry is an explicit owned mapping from job id to job handle,
//! passed by reference to whichever component needs it. No global mutable
//! state.
//!
//! ## Storage lifecycle
//!
//! Each job exclusively owns one temporary working directory. The registry
//! holds the [`TempDir`] guard, so storage is reclaimed exactly when the
//! registry entry (or its storage slot) is dropped:
//!
//! * per-file failure → the pipeline discards storage immediately, with or
//!   without observers; the progress record survives until the final
//!   snapshot has been delivered plus a grace delay;
//! * success → storage survives until the archive is retrieved once, or
//!   until the bounded idle TTL expires, whichever comes first.

use crate::error::ConvertError;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::watch;
use tracing::{debug, info};

/// Lifecycle state of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Preparing,
    Converting,
    Completed,
    Error,
}

impl JobState {
    /// Whether the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Error)
    }

    /// Monotonic rank; a job's state never moves to a lower rank.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            JobState::Preparing => 0,
            JobState::Converting => 1,
            JobState::Completed => 2,
            JobState::Error => 2,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Preparing => "preparing",
            JobState::Converting => "converting",
            JobState::Completed => "completed",
            JobState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Per-file status within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Converting,
    Completed,
    Failed,
}

/// A read-only snapshot of a job's progress.
///
/// This is the structured data exposed by the progress surface. Observers
/// always receive a complete, consistent snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    /// Job lifecycle state.
    pub state: JobState,
    /// Files successfully converted so far.
    pub processed: usize,
    /// Total convertible files discovered.
    pub total: usize,
    /// Name of the file currently being processed.
    pub current_file: Option<String>,
    /// Status of the current file.
    pub current_file_status: Option<FileStatus>,
    /// Error message when `state == Error`.
    pub error: Option<String>,
    /// Relative paths of converted output files, in processing order.
    pub converted_files: Vec<String>,
}

impl ProgressSnapshot {
    fn new() -> Self {
        Self {
            state: JobState::Preparing,
            processed: 0,
            total: 0,
            current_file: None,
            current_file_status: None,
            error: None,
            converted_files: Vec::new(),
        }
    }
}

/// Single-writer handle to a job's progress record.
///
/// Owned exclusively by the pipeline task driving the job; updates are
/// applied to the whole snapshot atomically.
pub(crate) struct ProgressWriter {
    tx: watch::Sender<ProgressSnapshot>,
}

impl ProgressWriter {
    pub(crate) fn update(&self, f: impl FnOnce(&mut ProgressSnapshot)) {
        self.tx.send_modify(f);
    }

    pub(crate) fn fail(&self, message: String) {
        self.tx.send_modify(|s| {
            s.state = JobState::Error;
            s.current_file_status = Some(FileStatus::Failed);
            s.error = Some(message);
        });
    }
}

struct JobEntry {
    rx: watch::Receiver<ProgressSnapshot>,
    /// The job's working storage; `None` once discarded.
    workdir: Option<TempDir>,
    workdir_path: PathBuf,
    archive_path: Option<PathBuf>,
}

/// Explicit owned mapping from job identifier to job record.
///
/// Cheap to clone; all clones share the same map.
#[derive(Clone, Default)]
pub struct JobRegistry {
    inner: Arc<Mutex<HashMap<String, JobEntry>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job backed by `workdir`. Returns the writer half of
    /// its progress record; the id is the workdir's unique basename.
    pub(crate) fn register(&self, id: &str, workdir: TempDir) -> ProgressWriter {
        let (tx, rx) = watch::channel(ProgressSnapshot::new());
        let workdir_path = workdir.path().to_path_buf();
        let entry = JobEntry {
            rx,
            workdir: Some(workdir),
            workdir_path,
            archive_path: None,
        };
        self.inner
            .lock()
            .expect("job registry lock poisoned")
            .insert(id.to_string(), entry);
        debug!("registered job {id}");
        ProgressWriter { tx }
    }

    /// Subscribe to a job's progress record.
    pub fn subscribe(&self, id: &str) -> Result<watch::Receiver<ProgressSnapshot>, ConvertError> {
        self.inner
            .lock()
            .expect("job registry lock poisoned")
            .get(id)
            .map(|e| e.rx.clone())
            .ok_or_else(|| ConvertError::JobNotFound { id: id.to_string() })
    }

    /// Current progress snapshot for a job.
    pub fn snapshot(&self, id: &str) -> Result<ProgressSnapshot, ConvertError> {
        Ok(self.subscribe(id)?.borrow().clone())
    }

    /// Path of the job's working directory.
    pub fn workdir_path(&self, id: &str) -> Result<PathBuf, ConvertError> {
        self.inner
            .lock()
            .expect("job registry lock poisoned")
            .get(id)
            .map(|e| e.workdir_path.clone())
            .ok_or_else(|| ConvertError::JobNotFound { id: id.to_string() })
    }

    /// Record where the finished archive was written.
    pub(crate) fn set_archive(&self, id: &str, path: PathBuf) {
        if let Some(entry) = self
            .inner
            .lock()
            .expect("job registry lock poisoned")
            .get_mut(id)
        {
            entry.archive_path = Some(path);
        }
    }

    /// Discard a job's working storage, keeping its progress record.
    ///
    /// Called by the pipeline on failure; runs whether or not anyone is
    /// observing the job.
    pub(crate) fn discard_storage(&self, id: &str) {
        let workdir = self
            .inner
            .lock()
            .expect("job registry lock poisoned")
            .get_mut(id)
            .and_then(|e| e.workdir.take());
        if let Some(dir) = workdir {
            info!("discarding working storage for job {id}");
            // Drop deletes the directory tree; an OS-level failure here
            // leaves it to the tempdir reaper.
            drop(dir);
        }
    }

    /// Retrieve the finished archive exactly once.
    ///
    /// Returns the archive bytes and removes the job — its working storage
    /// (including the archive) is deleted before this returns.
    pub async fn retrieve_archive(&self, id: &str) -> Result<Vec<u8>, ConvertError> {
        let entry = {
            let mut map = self.inner.lock().expect("job registry lock poisoned");
            let Some(entry) = map.get(id) else {
                return Err(ConvertError::JobNotFound { id: id.to_string() });
            };
            let state = entry.rx.borrow().state;
            if state != JobState::Completed || entry.archive_path.is_none() {
                return Err(ConvertError::ArchiveNotReady {
                    id: id.to_string(),
                    state: state.to_string(),
                });
            }
            map.remove(id).expect("entry checked above")
        };

        let path = entry.archive_path.as_ref().expect("checked above");
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ConvertError::io(path.clone(), e))?;
        info!("job {id}: archive retrieved ({} bytes), storage reclaimed", bytes.len());
        // `entry` drops here, deleting the working directory.
        Ok(bytes)
    }

    /// Reclaim the progress record of a job that ended in error.
    ///
    /// Completed jobs keep their record until archive retrieval or TTL so
    /// the download surface still resolves the id.
    pub(crate) fn reclaim_if_failed(&self, id: &str) {
        let mut map = self.inner.lock().expect("job registry lock poisoned");
        let failed = map
            .get(id)
            .map(|e| e.rx.borrow().state == JobState::Error)
            .unwrap_or(false);
        if failed {
            map.remove(id);
            debug!("reclaimed failed job {id}");
        }
    }

    /// Remove a job outright (TTL expiry), reclaiming any storage.
    pub(crate) fn expire(&self, id: &str) {
        if self
            .inner
            .lock()
            .expect("job registry lock poisoned")
            .remove(id)
            .is_some()
        {
            info!("job {id} expired unclaimed; storage reclaimed");
        }
    }

    /// Whether the registry still knows this job id.
    pub fn contains(&self, id: &str) -> bool {
        self.inner
            .lock()
            .expect("job registry lock poisoned")
            .contains_key(id)
    }
}
