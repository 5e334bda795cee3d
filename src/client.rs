//! Model adapter: the narrow contract to the external completion endpoint.
//!
//! The pipeline only ever sees [`ModelClient`] — a single `generate` call
//! that takes a fully-constructed instruction string and returns generated
//! text. Everything else about the endpoint (auth, wire format, provider
//! quirks) is this module's problem. Failures are classified into
//! [`ModelError`] variants so the converter's retry loop can log them, but
//! the converter treats them as opaque.
//!
//! [`OpenAiCompatClient`] is the built-in implementation: a reqwest POST to
//! an OpenAI-compatible `/chat/completions` endpoint (DeepSeek, OpenAI,
//! and most self-hosted gateways speak this shape).

use crate::config::ConversionConfig;
use crate::error::{ConvertError, ModelError};
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// A completion endpoint the converter can delegate to.
///
/// Implementations must be `Send + Sync`; a single client is shared across
/// all files of a batch (and across batches).
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send one instruction string and return the generated text.
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Client for OpenAI-compatible chat-completion endpoints.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    system_prompt: String,
    temperature: f32,
    max_tokens: usize,
    timeout_secs: u64,
}

impl OpenAiCompatClient {
    /// Build a client from explicit parameters and the knobs in `config`.
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        config: &ConversionConfig,
    ) -> Result<Self, ConvertError> {
        let timeout_secs = config.api_timeout_secs;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ConvertError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs,
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl ModelClient for OpenAiCompatClient {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": prompt },
            ],
            "stream": false,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    ModelError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ModelError::Auth(format!("HTTP {status}")));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ModelError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("HTTP {status}: {detail}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Api(format!("malformed response body: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ModelError::Api("response contained no choices".into()))?;

        debug!("model returned {} bytes", content.len());
        Ok(content.trim().to_string())
    }
}

/// Resolve the model client, from most-specific to least-specific.
///
/// 1. **Pre-built client** (`config.client`) — the caller constructed the
///    client entirely; we use it as-is. Useful in tests or when the caller
///    needs custom middleware.
/// 2. **Explicit fields** (`config.api_key` / `api_base` / `model`) — the
///    built-in OpenAI-compatible client with those parameters.
/// 3. **Environment** — `LANGCONVERT_API_KEY`, with optional
///    `LANGCONVERT_API_BASE` and `LANGCONVERT_MODEL` (defaults:
///    `https://api.deepseek.com`, `deepseek-coder-v2`).
pub fn resolve_client(config: &ConversionConfig) -> Result<Arc<dyn ModelClient>, ConvertError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }

    let api_key = config
        .api_key
        .clone()
        .or_else(|| std::env::var("LANGCONVERT_API_KEY").ok().filter(|k| !k.is_empty()))
        .ok_or_else(|| ConvertError::ClientNotConfigured {
            hint: "Set LANGCONVERT_API_KEY, or provide api_key / a custom client in the config."
                .to_string(),
        })?;

    let api_base = config
        .api_base
        .clone()
        .or_else(|| std::env::var("LANGCONVERT_API_BASE").ok().filter(|b| !b.is_empty()))
        .unwrap_or_else(|| "https://api.deepseek.com".to_string());

    let model = config
        .model
        .clone()
        .or_else(|| std::env::var("LANGCONVERT_MODEL").ok().filter(|m| !m.is_empty()))
        .unwrap_or_else(|| "deepseek-coder-v2".to_string());

    Ok(Arc::new(OpenAiCompatClient::new(
        api_base, api_key, model, config,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prebuilt_client_takes_priority() {
        struct Canned;

        #[async_trait]
        impl ModelClient for Canned {
            async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
                Ok("ok".into())
            }
        }

        let config = ConversionConfig::builder()
            .client(Arc::new(Canned))
            .build()
            .unwrap();
        assert!(resolve_client(&config).is_ok());
    }

    #[test]
    fn explicit_key_builds_compat_client() {
        let config = ConversionConfig::builder()
            .api_key("sk-test")
            .api_base("https://api.deepseek.com/")
            .model("deepseek-coder-v2")
            .build()
            .unwrap();
        assert!(resolve_client(&config).is_ok());
    }

    #[test]
    fn trailing_slash_is_stripped_from_base() {
        let config = ConversionConfig::default();
        let client =
            OpenAiCompatClient::new("https://api.example.com/", "k", "m", &config).unwrap();
        assert_eq!(client.api_base, "https://api.example.com");
    }
}
