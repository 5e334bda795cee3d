//! Error types for the langconvert library.
//!
//! Two distinct error types reflect the two layers of the system:
//!
//! * [`ConvertError`] — failures visible to callers of the library: bad
//!   arguments, unreadable archives, a file that could not be converted,
//!   filesystem trouble. Returned as `Err(ConvertError)` from the top-level
//!   conversion functions and recorded on the owning job's status.
//!
//! * [`ModelError`] — failures at the model-adapter boundary (transport,
//!   authentication, rate limits, timeouts). The converter treats these as
//!   opaque and wraps them into [`ConvertError::ConversionFailed`]; they are
//!   never surfaced raw to batch callers.
//!
//! Retries, when they happen, are confined to the single external-call
//! boundary inside the converter. Nothing at the job level retries: a
//! per-file failure aborts the whole batch.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the langconvert library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A required argument (source language, target language, or code) was
    /// empty. Rejected immediately, before any storage is touched.
    #[error("invalid input: {detail}")]
    InvalidInput { detail: String },

    // ── Archive errors ────────────────────────────────────────────────────
    /// An uploaded archive was corrupt or an entry could not be read.
    /// Aborts the job before any conversion starts.
    #[error("failed to read archive '{name}': {detail}")]
    ArchiveError { name: String, detail: String },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The external model call failed or exhausted its retries while
    /// converting `file`. For single-snippet conversion `file` is `None`.
    #[error("conversion failed{}: {detail}", .file.as_deref().map(|f| format!(" for '{f}'")).unwrap_or_default())]
    ConversionFailed {
        file: Option<String>,
        detail: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Filesystem read/write failure during file processing or packaging.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No model client is configured and none could be resolved from the
    /// environment.
    #[error("no model client configured.\n{hint}")]
    ClientNotConfigured { hint: String },

    // ── Job registry errors ───────────────────────────────────────────────
    /// The progress or download surface was queried with an unknown job id
    /// (never created, or already reclaimed).
    #[error("unknown job id '{id}'")]
    JobNotFound { id: String },

    /// The job has not produced an archive (still running, or ended in
    /// error).
    #[error("job '{id}' has no result archive (state: {state})")]
    ArchiveNotReady { id: String, state: String },
}

impl ConvertError {
    /// Wrap an I/O error together with the path it occurred on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures at the model-adapter boundary.
///
/// Implementations of [`crate::client::ModelClient`] classify transport
/// failures into these variants so the converter's retry loop can log
/// something meaningful, but the converter never branches on the variant —
/// every exhausted failure becomes [`ConvertError::ConversionFailed`].
#[derive(Debug, Error)]
pub enum ModelError {
    /// Network-level failure (connection refused, DNS, TLS, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint rejected the API key (HTTP 401/403).
    #[error("authentication error: {0}")]
    Auth(String),

    /// The endpoint rate-limited the request (HTTP 429).
    #[error("rate limit exceeded{}", .retry_after_secs.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    /// The call exceeded the configured per-call timeout.
    #[error("model call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The endpoint returned an error payload or an unusable response.
    #[error("API error: {0}")]
    Api(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_failed_display_with_file() {
        let e = ConvertError::ConversionFailed {
            file: Some("main.c".into()),
            detail: "rate limit exceeded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("main.c"), "got: {msg}");
        assert!(msg.contains("rate limit"), "got: {msg}");
    }

    #[test]
    fn conversion_failed_display_without_file() {
        let e = ConvertError::ConversionFailed {
            file: None,
            detail: "boom".into(),
        };
        assert!(!e.to_string().contains("for '"));
    }

    #[test]
    fn rate_limited_display() {
        let e = ModelError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert!(e.to_string().contains("30s"));
        let e = ModelError::RateLimited {
            retry_after_secs: None,
        };
        assert!(e.to_string().contains("rate limit"));
    }

    #[test]
    fn io_helper_keeps_path() {
        let e = ConvertError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(e.to_string().contains("/tmp/x"));
    }
}
