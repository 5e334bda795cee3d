//! Configuration types for code conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across tasks and to understand why two runs
//! behaved differently.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::client::ModelClient;
use crate::error::ConvertError;
use std::fmt;
use std::sync::Arc;

/// Configuration for snippet and batch conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use langconvert::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .model("deepseek-coder-v2")
///     .max_retries(3)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Model identifier sent to the completion endpoint, e.g.
    /// "deepseek-coder-v2". If None, resolved from `LANGCONVERT_MODEL` or
    /// the client's default.
    pub model: Option<String>,

    /// Pre-constructed model client. Takes precedence over environment
    /// resolution. Useful in tests or when the caller needs custom
    /// middleware (caching, rate limiting).
    pub client: Option<Arc<dyn ModelClient>>,

    /// API key for the built-in OpenAI-compatible client. If None, read
    /// from `LANGCONVERT_API_KEY`.
    pub api_key: Option<String>,

    /// Base URL for the built-in client, e.g. "https://api.deepseek.com".
    /// If None, read from `LANGCONVERT_API_BASE`.
    pub api_base: Option<String>,

    /// Sampling temperature for the completion. Default: 0.1.
    ///
    /// Low temperature keeps the model faithful to the input code — exactly
    /// what you want for translation. Higher values introduce creativity
    /// that worsens fidelity.
    pub temperature: f32,

    /// Maximum tokens the model may generate per file. Default: 4096.
    ///
    /// Setting this too low silently truncates the converted code
    /// mid-function. 4096 covers typical single-file modules while keeping
    /// per-file cost predictable.
    pub max_tokens: usize,

    /// Maximum retry attempts on a transient model failure. Default: 3.
    ///
    /// Most 5xx and timeout errors are transient. Retrying 3 times catches
    /// the vast majority without blocking the batch for long. When retries
    /// are exhausted the file fails hard and the whole batch aborts.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Per-model-call timeout in seconds. Default: 30.
    pub api_timeout_secs: u64,

    /// Custom system prompt for the completion. If None, uses the built-in
    /// default from [`crate::prompts`].
    pub system_prompt: Option<String>,

    /// Bounded inter-poll delay for progress observers, in milliseconds.
    /// Default: 500.
    pub poll_interval_ms: u64,

    /// Grace delay before a finished job's progress record is reclaimed,
    /// in milliseconds. Default: 1000.
    ///
    /// Gives a streaming observer time to receive the final snapshot
    /// before the registry entry disappears.
    pub grace_delay_ms: u64,

    /// Idle timeout after which an unclaimed result archive and its working
    /// storage are deleted, in seconds. Default: 600.
    pub job_ttl_secs: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            model: None,
            client: None,
            api_key: None,
            api_base: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 30,
            system_prompt: None,
            poll_interval_ms: 500,
            grace_delay_ms: 1000,
            job_ttl_secs: 600,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("model", &self.model)
            .field("client", &self.client.as_ref().map(|_| "<dyn ModelClient>"))
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("grace_delay_ms", &self.grace_delay_ms)
            .field("job_ttl_secs", &self.job_ttl_secs)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = Some(base.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms.max(10);
        self
    }

    pub fn grace_delay_ms(mut self, ms: u64) -> Self {
        self.config.grace_delay_ms = ms;
        self
    }

    pub fn job_ttl_secs(mut self, secs: u64) -> Self {
        self.config.job_ttl_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ConvertError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
