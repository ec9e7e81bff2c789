// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Gemini REST client.
//!
//! Talks to `POST {base}/models/{model}:generateContent`. The API key is sent
//! in the `x-goog-api-key` header. Every call is bounded by the configured
//! timeout, and retryable failures are retried with linear back-off.

use std::path::PathBuf;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

#[cfg(feature = "telemetry")]
use tracing::debug;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use crate::config::ResolvedConfig;
use crate::error::ProviderError;
use crate::types::{GenerateOptions, GroundingMetadata, SearchResponse, ThinkingLevel, WebSource};

use super::images::{load_inline_image, InlineData};
use super::ModelClient;

/// Gemini API client.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: RwLock<String>,
    base_url: String,
    timeout_ms: u64,
    max_retries: u32,
    retry_delay: Duration,
    max_image_bytes: u64,
    root: PathBuf,
}

impl GeminiClient {
    /// Build a client from resolved configuration.
    ///
    /// A proxy URL that reqwest rejects is logged and ignored.
    pub fn new(config: &ResolvedConfig, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let mut builder = Client::builder().timeout(timeout);

        if let Some(ref proxy_url) = config.proxy {
            match reqwest::Proxy::all(proxy_url.as_str()) {
                Ok(proxy) => {
                    tracing::info!(proxy = %proxy_url, "Using HTTP proxy");
                    builder = builder.proxy(proxy);
                }
                Err(e) => warn!(proxy = %proxy_url, error = %e, "Invalid proxy URL, connecting directly"),
            }
        }

        let client = builder
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: RwLock::new(config.model.clone()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            max_image_bytes: config.max_image_bytes,
            root: config.root.clone(),
        })
    }

    fn current_model(&self) -> String {
        self.model
            .read()
            .map(|m| m.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Send a request, retrying retryable failures.
    async fn send(&self, request: &GenerateRequest<'_>) -> Result<GenerateResponse, ProviderError> {
        let mut attempt: u32 = 0;
        loop {
            match self.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.retry_delay * attempt;
                    warn!(attempt, max = self.max_retries, ?delay, error = %e, "Retrying Gemini request");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, request: &GenerateRequest<'_>) -> Result<GenerateResponse, ProviderError> {
        let model = self.current_model();

        #[cfg(feature = "telemetry")]
        debug!(model = %model, "Sending generateContent request");

        let response = self
            .client
            .post(self.endpoint(&model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error_body(status.as_u16(), &body));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout_ms)
            } else {
                ProviderError::Parse(e.to_string())
            }
        })?;

        if let Some(ref usage) = parsed.usage_metadata {
            #[cfg(feature = "telemetry")]
            GLOBAL_METRICS.record_tokens(usage.prompt_token_count, usage.candidates_token_count);
            #[cfg(not(feature = "telemetry"))]
            let _ = usage;
        }

        Ok(parsed)
    }

    fn classify_transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout_ms)
        } else {
            ProviderError::Network(e.without_url().to_string())
        }
    }
}

/// Map a non-2xx response body to a typed error.
fn classify_error_body(status_code: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => ProviderError::from_status(
            status_code,
            parsed.error.status.as_deref(),
            parsed.error.message,
        ),
        Err(_) => {
            let message = if body.trim().is_empty() {
                format!("HTTP {status_code}")
            } else {
                body.trim().to_string()
            };
            ProviderError::from_status(status_code, None, message)
        }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    #[instrument(skip_all, fields(prompt_len = prompt.len(), max_tokens = options.max_tokens))]
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, ProviderError> {
        let start = Instant::now();
        let request = GenerateRequest::new(prompt, Vec::new(), options, false);
        let result = self.send(&request).await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("gemini.generate", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        result.map(|r| r.text())
    }

    #[instrument(skip_all, fields(prompt_len = prompt.len(), images = images.len()))]
    async fn generate_multimodal(
        &self,
        prompt: &str,
        images: &[String],
        options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        let mut inline = Vec::with_capacity(images.len());
        for image in images {
            inline.push(load_inline_image(image, &self.root, self.max_image_bytes).await?);
        }

        let start = Instant::now();
        let request = GenerateRequest::new(prompt, inline, options, false);
        let result = self.send(&request).await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("gemini.generate_multimodal", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        result.map(|r| r.text())
    }

    #[instrument(skip_all, fields(prompt_len = prompt.len()))]
    async fn search(&self, prompt: &str, options: &GenerateOptions) -> Result<SearchResponse, ProviderError> {
        let start = Instant::now();
        let request = GenerateRequest::new(prompt, Vec::new(), options, true);
        let result = self.send(&request).await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("gemini.search", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        let response = result?;
        Ok(SearchResponse {
            text: response.text(),
            grounding: response.grounding(),
        })
    }

    fn model(&self) -> String {
        self.current_model()
    }

    fn set_model(&self, model: &str) {
        let mut guard = self
            .model
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = model.to_string();
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolSpec>>,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str, images: Vec<InlineData>, options: &'a GenerateOptions, search: bool) -> Self {
        let mut parts = vec![Part::text(prompt)];
        parts.extend(images.into_iter().map(Part::inline));

        Self {
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
            system_instruction: options.system_instruction.as_deref().map(|text| Content {
                role: None,
                parts: vec![Part::text(text)],
            }),
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                top_p: options.top_p,
                top_k: options.top_k,
                thinking_config: options
                    .thinking_level
                    .filter(ThinkingLevel::is_enabled)
                    .map(|thinking_level| ThinkingConfig { thinking_level }),
            },
            tools: search.then(|| vec![ToolSpec { google_search: GoogleSearch {} }]),
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl<'a> Part<'a> {
    fn text(text: &'a str) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }

    fn inline(data: InlineData) -> Self {
        Self {
            text: None,
            inline_data: Some(data),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_level: ThinkingLevel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolSpec {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, skipping thought parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn grounding(&self) -> Option<GroundingMetadata> {
        let metadata = self.candidates.first()?.grounding_metadata.as_ref()?;
        let chunks = metadata.grounding_chunks.as_deref().unwrap_or(&[]);

        let sources = metadata.grounding_supports.as_ref().map(|supports| {
            supports
                .iter()
                .map(|support| WebSource {
                    title: support.segment.as_ref().and_then(|s| s.text.clone()),
                    uri: support
                        .grounding_chunk_indices
                        .first()
                        .and_then(|&i| chunks.get(i))
                        .and_then(|chunk| chunk.web.as_ref())
                        .and_then(|web| web.uri.clone()),
                })
                .collect()
        });

        Some(GroundingMetadata {
            search_queries: metadata.web_search_queries.clone(),
            web_search_sources: sources,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<ApiGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiGroundingMetadata {
    web_search_queries: Option<Vec<String>>,
    grounding_supports: Option<Vec<GroundingSupport>>,
    grounding_chunks: Option<Vec<GroundingChunk>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingSupport {
    segment: Option<Segment>,
    #[serde(default)]
    grounding_chunk_indices: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    status: Option<String>,
}
