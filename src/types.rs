// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core type definitions shared across the server.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Tool Types
// ============================================================================

/// JSON Schema for tool input parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String, // Always "object"
    pub properties: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl InputSchema {
    /// Create a new input schema with object type.
    pub fn new() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: HashMap::new(),
            required: None,
        }
    }

    /// Add a property to the schema.
    pub fn with_property(mut self, name: impl Into<String>, schema: serde_json::Value) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Mark properties as required.
    pub fn with_required(mut self, required: &[&str]) -> Self {
        self.required = Some(required.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Names listed as required, empty when none.
    pub fn required_fields(&self) -> &[String] {
        self.required.as_deref().unwrap_or(&[])
    }
}

impl Default for InputSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptor of a tool as returned by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: InputSchema::new(),
        }
    }

    /// Set the input schema for this tool.
    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }
}

// ============================================================================
// Generation Types
// ============================================================================

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default output token budget.
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Default nucleus sampling threshold.
pub const DEFAULT_TOP_P: f32 = 0.95;

/// Default top-k sampling size.
pub const DEFAULT_TOP_K: u32 = 40;

/// Backend reasoning depth knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThinkingLevel {
    None,
    Low,
    Medium,
    #[default]
    High,
}

impl ThinkingLevel {
    pub const VALUES: [&'static str; 4] = ["NONE", "LOW", "MEDIUM", "HIGH"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Whether a thinking config should be sent at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl FromStr for ThinkingLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(Self::None),
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            other => Err(format!("Unknown thinking level: {other}")),
        }
    }
}

impl fmt::Display for ThinkingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call model options. Built once by a handler and passed by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub system_instruction: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
    /// Only sent when enabled.
    pub thinking_level: Option<ThinkingLevel>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            system_instruction: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: DEFAULT_TOP_P,
            top_k: DEFAULT_TOP_K,
            thinking_level: None,
        }
    }
}

impl GenerateOptions {
    /// Options with a system instruction, temperature and token budget.
    pub fn new(system_instruction: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            system_instruction: Some(system_instruction.into()),
            temperature,
            max_tokens,
            ..Default::default()
        }
    }

    pub fn with_thinking(mut self, level: ThinkingLevel) -> Self {
        self.thinking_level = level.is_enabled().then_some(level);
        self
    }
}

// ============================================================================
// Search Types
// ============================================================================

/// A web source backing part of a grounded answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Citations attached to a search-grounded answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_queries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_search_sources: Option<Vec<WebSource>>,
}

/// Text plus optional grounding returned by a search call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub text: String,
    pub grounding: Option<GroundingMetadata>,
}
