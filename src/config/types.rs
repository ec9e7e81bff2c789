// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! [`FileConfig`] is what a JSON or YAML config file may contain; every field
//! is optional. [`ResolvedConfig`] is the fully merged result the server runs with.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";

/// Default REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Largest local image that will be inlined into a request.
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Configuration as written in `~/.gemini-mcp/config.json` or `.gemini-mcp.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    /// Model id, e.g. `gemini-2.5-flash`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Per-request HTTP timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Extra attempts for retryable backend failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Base delay between retries; attempt `n` waits `n * retryDelayMs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_image_bytes: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Directory tools may read files from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Outbound HTTP(S) proxy URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

/// Final configuration after all layers are merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub model: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_image_bytes: u64,
    pub base_url: String,
    pub root: PathBuf,
    pub proxy: Option<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            base_url: DEFAULT_BASE_URL.to_string(),
            root: PathBuf::from("."),
            proxy: None,
        }
    }
}
