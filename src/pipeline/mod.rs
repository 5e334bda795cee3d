//! Pipeline stages for batch code conversion.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap an
//! implementation without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ select ──▶ convert loop ──▶ package
//! (bundle)   (walk+match) (per file, LLM)  (zip)
//! ```
//!
//! 1. [`extract`] — materialise the uploaded bundle (named files or zip
//!    archives) into the job's working directory
//! 2. [`select`]  — walk the tree and collect files whose extension matches
//!    the source language
//! 3. the per-file loop lives in [`crate::batch`] because it owns the job's
//!    progress record
//! 4. [`package`] — re-archive the converted tree for download

pub mod extract;
pub mod package;
pub mod select;
