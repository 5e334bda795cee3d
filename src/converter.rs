//! The converter family: per-language-family conversion policy.
//!
//! Each variant builds a conversion prompt its own way, drives the model
//! call, and normalises the response. Specialized variants exist because
//! some language families need extra instruction to translate well:
//! C-family code lives and dies by pointer and macro handling, Python-family
//! code by indentation and decorator/exception semantics. Everything else
//! goes through the general variant.
//!
//! A tagged enum rather than trait objects: the set of families is closed
//! and small, selection is a plain match, and adding a family is one new
//! variant plus one arm in each method.
//!
//! ## Retry Strategy
//!
//! Transient endpoint failures (429/503/timeouts) are frequent. The single
//! external-call boundary here retries with exponential backoff
//! (`retry_backoff_ms * 2^attempt`): with the 500 ms default and 3 retries
//! the wait sequence is 500 ms → 1 s → 2 s. Exhausted retries become a hard
//! [`ConvertError::ConversionFailed`] — nothing above this layer retries.

use crate::client::ModelClient;
use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::normalize::clean_code;
use crate::prompts::{base_prompt, C_FAMILY_SUFFIX, PYTHON_FAMILY_SUFFIX};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// A conversion policy for one language family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    /// Default policy: the base prompt, nothing appended.
    General,
    /// C-family policy: emphasises pointers, memory, and macros.
    CFamily,
    /// Python-family policy: emphasises indentation, decorators, exceptions.
    PythonFamily,
}

impl Converter {
    /// Select the converter for a source language, defaulting to
    /// [`Converter::General`] when no specialized one is registered.
    pub fn for_language(source_lang: &str) -> Self {
        match source_lang.to_ascii_lowercase().as_str() {
            "c" | "cpp" => Converter::CFamily,
            "python" => Converter::PythonFamily,
            _ => Converter::General,
        }
    }

    /// Build the full instruction string for a conversion request.
    fn build_prompt(&self, source_lang: &str, target_lang: &str, code: &str) -> String {
        let base = base_prompt(source_lang, target_lang, code);
        match self {
            Converter::General => base,
            Converter::CFamily => format!("{base}\n{C_FAMILY_SUFFIX}"),
            Converter::PythonFamily => format!("{base}\n{PYTHON_FAMILY_SUFFIX}"),
        }
    }

    /// Convert `code` from `source_lang` to `target_lang`.
    ///
    /// Fails with [`ConvertError::InvalidInput`] when any argument is empty.
    /// On success the returned text has been normalised — it never contains
    /// fence markers. Model failures are wrapped as
    /// [`ConvertError::ConversionFailed`] after retries are exhausted.
    pub async fn convert(
        &self,
        client: &Arc<dyn ModelClient>,
        source_lang: &str,
        target_lang: &str,
        code: &str,
        config: &ConversionConfig,
    ) -> Result<String, ConvertError> {
        if source_lang.is_empty() || target_lang.is_empty() || code.is_empty() {
            return Err(ConvertError::InvalidInput {
                detail: "source language, target language, and code must be non-empty".into(),
            });
        }

        let prompt = self.build_prompt(source_lang, target_lang, code);
        let mut last_err: Option<String> = None;

        for attempt in 0..=config.max_retries {
            if attempt > 0 {
                let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "{source_lang}→{target_lang}: retry {attempt}/{} after {backoff}ms",
                    config.max_retries
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match client.generate(&prompt).await {
                Ok(raw) => {
                    debug!(
                        "{source_lang}→{target_lang}: {} raw bytes on attempt {}",
                        raw.len(),
                        attempt + 1
                    );
                    return Ok(clean_code(&raw, target_lang));
                }
                Err(e) => {
                    warn!("{source_lang}→{target_lang}: attempt {} failed — {e}", attempt + 1);
                    last_err = Some(e.to_string());
                }
            }
        }

        Err(ConvertError::ConversionFailed {
            file: None,
            detail: last_err.unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    /// Shallow code validation.
    ///
    /// False only for empty/whitespace-only code. Specialized variants look
    /// for language-indicative substrings, but any non-empty code passes
    /// regardless of that check's outcome — this is a deliberately
    /// permissive pass-through, not a real validator.
    pub fn validate(&self, lang: &str, code: &str) -> bool {
        if code.trim().is_empty() {
            return false;
        }

        match self {
            Converter::General => true,
            Converter::CFamily => {
                if lang.eq_ignore_ascii_case("c")
                    && (code.contains('#') || code.contains("int ") || code.contains("void "))
                {
                    return true;
                }
                true
            }
            Converter::PythonFamily => {
                if lang.eq_ignore_ascii_case("python")
                    && (code.contains("def ")
                        || code.contains("class ")
                        || code.contains("import ")
                        || code.contains("if "))
                {
                    return true;
                }
                true
            }
        }
    }
}
