// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `gemini_multimodal_query` tool: questions about one or more images.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::error::ToolError;
use crate::tools::registry::{ToolContext, ToolHandler};
use crate::tools::to_output;
use crate::tools::validation::{array, enum_or, optional_string, required, required_string, string};
use crate::types::{GenerateOptions, InputSchema, ToolDefinition};

const MULTIMODAL_QUERY_SYSTEM_PROMPT: &str = "You are a visual understanding expert with deep knowledge of:
- UI/UX design patterns and principles
- Frontend development (HTML/CSS/JavaScript)
- Architecture diagrams and technical documentation
- Design systems and component libraries

When analyzing images:
1. Identify all key elements and their purposes
2. Understand spatial relationships and layouts
3. Recognize design patterns and conventions
4. Detect colors, typography, spacing with precision
5. Infer interactive states (hover, active, disabled)

When asked to convert designs to code:
- Provide complete, production-ready implementation
- Match the design pixel-perfectly
- Include all visible and implied interactions

When asked questions about designs:
- Be specific and detailed
- Reference exact colors (hex codes)
- Mention spacing values when relevant
- Suggest improvements if asked

Output format:
- Adapt to the requested format (text/code/json)
- Be concise but comprehensive
- Use professional terminology";

const OUTPUT_FORMATS: &[&str] = &["text", "code", "json"];

/// Handler for the `gemini_multimodal_query` tool.
pub struct MultimodalQueryHandler;

#[derive(Debug, Serialize)]
struct QueryResult {
    response: String,
    format: String,
    metadata: QueryMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryMetadata {
    image_count: usize,
    model_used: String,
}

fn build_prompt(prompt: &str, context: Option<&str>, output_format: &str) -> String {
    let mut full = match context {
        Some(context) => format!("Context: {context}\n\nQuestion: {prompt}"),
        None => prompt.to_string(),
    };

    match output_format {
        "json" => full.push_str("\n\nPlease provide your response in valid JSON format."),
        "code" => full.push_str("\n\nPlease provide your response as code only, no explanations."),
        _ => {}
    }

    full
}

/// Every item of the `images` array as a string.
fn image_list(input: &Value) -> Result<Vec<String>, ToolError> {
    array(required(input, "images")?, "images", 1)?
        .iter()
        .enumerate()
        .map(|(i, image)| string(image, &format!("images[{i}]"), 1).map(str::to_string))
        .collect()
}

#[async_trait]
impl ToolHandler for MultimodalQueryHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "gemini_multimodal_query",
            "Query using images + text for multimodal understanding. Analyze designs, diagrams, screenshots, or any visual content with natural language questions.",
        )
        .with_schema(
            InputSchema::new()
                .with_property("prompt", json!({
                    "type": "string",
                    "description": "Question or instruction about the images"
                }))
                .with_property("images", json!({
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Images as file paths (e.g., ./images/screenshot.png) or Base64 data URIs. File paths will be automatically converted to Base64."
                }))
                .with_property("outputFormat", json!({
                    "type": "string",
                    "enum": OUTPUT_FORMATS,
                    "description": "Desired output format (default: text)",
                    "default": "text"
                }))
                .with_property("context", json!({
                    "type": "string",
                    "description": "Optional: Additional context for better understanding"
                }))
                .with_required(&["prompt", "images"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, fields(images)))]
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let prompt = required_string(&input, "prompt", 5)?;
        let images = image_list(&input)?;
        let output_format = enum_or(&input, "outputFormat", OUTPUT_FORMATS, "text")?;
        let context = optional_string(&input, "context", 1)?;

        #[cfg(feature = "telemetry")]
        tracing::Span::current().record("images", images.len());

        let full_prompt = build_prompt(&prompt, context.as_deref(), output_format);
        let options = GenerateOptions::new(MULTIMODAL_QUERY_SYSTEM_PROMPT, 0.7, 4096);
        let response = ctx
            .client
            .generate_multimodal(&full_prompt, &images, &options)
            .await?;

        to_output(&QueryResult {
            response,
            format: output_format.to_string(),
            metadata: QueryMetadata {
                image_count: images.len(),
                model_used: ctx.model(),
            },
        })
    }
}
