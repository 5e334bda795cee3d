//! Single-snippet conversion: one piece of code, no job machinery.

use crate::client::resolve_client;
use crate::config::ConversionConfig;
use crate::converter::Converter;
use crate::error::ConvertError;

/// Convert a single code snippet between languages.
///
/// Picks the converter for the source language (general fallback) and
/// returns normalised, fence-free text. Fails with
/// [`ConvertError::InvalidInput`] when any argument is empty and
/// [`ConvertError::ConversionFailed`] when the model call exhausts its
/// retries.
pub async fn convert_snippet(
    source_lang: &str,
    target_lang: &str,
    code: &str,
    config: &ConversionConfig,
) -> Result<String, ConvertError> {
    let client = resolve_client(config)?;
    Converter::for_language(source_lang)
        .convert(&client, source_lang, target_lang, code, config)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ModelClient;
    use crate::error::ModelError;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Canned;

    #[async_trait]
    impl ModelClient for Canned {
        async fn generate(&self, _prompt: &str) -> Result<String, ModelError> {
            Ok("```python\nprint(42)\n```".into())
        }
    }

    #[tokio::test]
    async fn snippet_round_trip() {
        let config = ConversionConfig::builder()
            .client(Arc::new(Canned))
            .build()
            .unwrap();
        let out = convert_snippet("c", "python", "int x = 42;", &config)
            .await
            .unwrap();
        assert_eq!(out, "print(42)");
    }

    #[tokio::test]
    async fn empty_code_is_invalid_input() {
        let config = ConversionConfig::builder()
            .client(Arc::new(Canned))
            .build()
            .unwrap();
        let err = convert_snippet("c", "python", "", &config).await.unwrap_err();
        assert!(matches!(err, ConvertError::InvalidInput { .. }));
    }
}
