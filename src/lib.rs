//! # langconvert
//!
//! Translate source code between programming languages by delegating to an
//! LLM completion endpoint — one snippet at a time, or whole project trees
//! as progress-tracked batch jobs.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Bundle (files / zip)
//!  │
//!  ├─ 1. Extract   materialise uploads into a per-job working directory
//!  ├─ 2. Select    walk the tree, keep files matching the source language
//!  ├─ 3. Convert   sequential per-file LLM calls with retry/backoff
//!  ├─ 4. Normalise strip fence wrapping from each model response
//!  └─ 5. Package   re-zip the converted tree for one-shot download
//! ```
//!
//! Progress for each job is a single-writer record observed through atomic
//! snapshots; [`progress_stream`] turns it into a bounded stream that ends
//! when the job completes or fails. The batch is all-or-nothing: one failed
//! file aborts the job and no partial archive is produced.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use langconvert::{convert_bundle, Bundle, BundleFile, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Client resolved from LANGCONVERT_API_KEY / _API_BASE / _MODEL
//!     let config = ConversionConfig::default();
//!     let bundle = Bundle::Files(vec![
//!         BundleFile::new("main.c", std::fs::read("main.c")?),
//!     ]);
//!     let output = convert_bundle(bundle, "c", "python", &config).await?;
//!     std::fs::write("converted_project.zip", &output.archive)?;
//!     println!("converted: {:?}", output.files);
//!     Ok(())
//! }
//! ```
//!
//! For progress reporting, use [`submit`] with a shared [`JobRegistry`] and
//! consume [`progress_stream`] until it ends, then call
//! [`JobRegistry::retrieve_archive`] — retrieval is one-shot and reclaims
//! the job's working storage.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod client;
pub mod config;
pub mod converter;
pub mod error;
pub mod job;
pub mod languages;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod snippet;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{convert_bundle, submit, BatchOutput};
pub use client::{ModelClient, OpenAiCompatClient};
pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use error::{ConvertError, ModelError};
pub use job::{FileStatus, JobRegistry, JobState, ProgressSnapshot};
pub use pipeline::extract::{Bundle, BundleFile};
pub use snippet::convert_snippet;
pub use stream::progress_stream;
