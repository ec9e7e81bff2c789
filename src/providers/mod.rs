// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Model backend access.
//!
//! Tool handlers only see the [`ModelClient`] trait. The production
//! implementation is [`gemini::GeminiClient`]; tests substitute a mock.
//!
//! The client is not built at startup. The server holds a [`ClientFactory`]
//! and calls it on the first `tools/call`, which is when `GEMINI_API_KEY` is
//! read:
//!
//! ```rust,ignore
//! use gemini_mcp::providers::env_client_factory;
//!
//! let factory = env_client_factory(config);
//! let client = factory()?; // fails if GEMINI_API_KEY is unset
//! let text = client.generate("Hello", &GenerateOptions::default()).await?;
//! ```

pub mod gemini;
pub mod images;
pub mod models;

pub use gemini::GeminiClient;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ResolvedConfig;
use crate::error::ProviderError;
use crate::types::{GenerateOptions, SearchResponse};

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Text and multimodal completion backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generate text from a prompt.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, ProviderError>;

    /// Generate text from a prompt plus images. Each image is a `data:` URI
    /// or a local file path.
    async fn generate_multimodal(
        &self,
        prompt: &str,
        images: &[String],
        options: &GenerateOptions,
    ) -> Result<String, ProviderError>;

    /// Generate with Google Search grounding enabled.
    async fn search(&self, prompt: &str, options: &GenerateOptions) -> Result<SearchResponse, ProviderError>;

    /// Current model id.
    fn model(&self) -> String;

    /// Switch the model used by subsequent calls.
    fn set_model(&self, model: &str);
}

/// Shared handle to a model client.
pub type SharedClient = Arc<dyn ModelClient>;

/// Builds the model client on first use.
pub type ClientFactory = Box<dyn Fn() -> Result<SharedClient, ProviderError> + Send + Sync>;

/// Build a Gemini client. `api_key` must be present and non-blank.
pub fn create_client(config: &ResolvedConfig, api_key: Option<String>) -> Result<SharedClient, ProviderError> {
    let api_key = api_key
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ProviderError::NotConfigured(format!("{API_KEY_ENV} environment variable is not set")))?;

    Ok(Arc::new(GeminiClient::new(config, api_key)?))
}

/// Factory that reads the API key from the environment when invoked.
pub fn env_client_factory(config: ResolvedConfig) -> ClientFactory {
    Box::new(move || create_client(&config, std::env::var(API_KEY_ENV).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_requires_key() {
        let config = ResolvedConfig::default();

        let err = create_client(&config, None).err().unwrap();
        assert_eq!(err.to_string(), "GEMINI_API_KEY environment variable is not set");

        assert!(create_client(&config, Some("   ".to_string())).is_err());
    }

    #[test]
    fn test_create_client_uses_configured_model() {
        let config = ResolvedConfig {
            model: "gemini-2.5-flash".to_string(),
            ..ResolvedConfig::default()
        };
        let client = create_client(&config, Some("key".to_string())).unwrap();
        assert_eq!(client.model(), "gemini-2.5-flash");
    }
}
