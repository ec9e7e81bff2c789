// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool system for the Gemini MCP server.
//!
//! Every tool runs the same pipeline: validate the arguments, gather any
//! files or images, render a prompt, call the model once, and turn the reply
//! into a bounded JSON result.
//!
//! # Architecture
//!
//! - [`ToolHandler`] trait - Core abstraction for tool implementations
//! - [`ToolRegistry`] - Ordered catalog, dispatches calls by name
//! - [`validation`] - Argument guards with caller-facing messages
//! - [`extract`] - Fence-tolerant JSON extraction and field normalizers
//! - [`files`] - Workspace-confined file and directory reads
//! - Individual handlers in the [`handlers`] module
//!
//! # Example
//!
//! ```rust,ignore
//! use gemini_mcp::tools::{ToolContext, ToolRegistry};
//!
//! let registry = ToolRegistry::with_defaults();
//! let ctx = ToolContext::new(client, FileReader::new(".")?);
//! let result = registry.dispatch("list_models", json!({}), &ctx).await?;
//! println!("{}", result.text());
//! ```

pub mod extract;
pub mod files;
pub mod handlers;
pub mod registry;
pub mod validation;

pub use files::{detect_language, FileContent, FileReader};
pub use handlers::*;
pub use registry::{DispatchResult, ToolContext, ToolHandler, ToolRegistry, ToolRegistryBuilder};

/// Telemetry preview limit for log output.
pub const TELEMETRY_PREVIEW_MAX_BYTES: usize = 2 * 1024; // 2 KiB

/// Truncate text to a maximum byte length, respecting UTF-8 boundaries.
pub fn truncate_text(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }

    // Find the last valid char boundary within max_bytes
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }

    if end == 0 {
        return String::new();
    }

    format!("{}... [truncated]", &text[..end])
}

/// Serialize a handler result.
pub fn to_output<T: serde::Serialize>(result: &T) -> Result<serde_json::Value, crate::error::ToolError> {
    serde_json::to_value(result)
        .map_err(|e| crate::error::ToolError::execution(format!("Failed to serialize result: {e}")))
}

/// Code fence tag for a detected language: first word, lowercased.
pub fn fence_tag(language: &str) -> String {
    match language {
        "Unknown" => String::new(),
        other => other
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_lowercase(),
    }
}

/// Render a file as a titled, fenced prompt section.
pub fn file_section(title: &str, file: &FileContent) -> String {
    format!(
        "## {title}: {}\n```{}\n{}\n```\n\n",
        file.path,
        fence_tag(file.language),
        file.content
    )
}
