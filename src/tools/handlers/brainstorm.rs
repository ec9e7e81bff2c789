// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `gemini_brainstorm` tool: structured idea generation.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};
use tracing::warn;

use crate::error::ToolError;
use crate::tools::extract::{choice, opt_text, parse_json, preview};
use crate::tools::registry::{ToolContext, ToolHandler};
use crate::tools::to_output;
use crate::tools::validation::{enums, number_or, optional_string, required_string, string_list};
use crate::tools::FileContent;
use crate::types::{GenerateOptions, InputSchema, ToolDefinition};

const BRAINSTORM_SYSTEM_PROMPT: &str = "You are a creative innovation consultant with expertise in:
- Product ideation and design thinking
- Problem-solving and lateral thinking
- Technology trends and market analysis
- Business strategy and innovation

Brainstorming approach:
1. Understand the topic and context deeply
2. Generate diverse ideas across different dimensions
3. Evaluate each idea objectively
4. Provide actionable details

Idea generation styles:
- Innovative: Push boundaries, explore emerging technologies
- Practical: Focus on feasibility and immediate implementation
- Radical: Challenge assumptions, think unconventionally

For each idea, provide:
- Clear, descriptive title
- Detailed description of the concept
- Pros: Benefits and advantages
- Cons: Challenges and limitations
- Feasibility: Realistic assessment (low/medium/high)

Quality requirements:
- Each idea should be distinct and valuable
- Balance creativity with practicality
- Consider technical, business, and user perspectives
- Provide specific, actionable suggestions";

/// Handler for the `gemini_brainstorm` tool.
pub struct BrainstormHandler;

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Idea {
    title: String,
    description: String,
    pros: Vec<Value>,
    cons: Vec<Value>,
    feasibility: String,
}

impl Idea {
    fn from_value(item: &Value, index: usize) -> Self {
        let points = |key: &str| match item.get(key) {
            Some(Value::Array(items)) => items.clone(),
            _ => vec![json!("Not specified")],
        };
        Self {
            title: opt_text(item, "title").unwrap_or_else(|| format!("Idea {}", index + 1)),
            description: opt_text(item, "description").unwrap_or_else(|| "No description provided".to_string()),
            pros: points("pros"),
            cons: points("cons"),
            feasibility: choice(item, "feasibility", enums::FEASIBILITY_LEVELS, "medium"),
        }
    }

    fn unparsed(raw: &str) -> Self {
        Self {
            title: "Brainstorm Results".to_string(),
            description: preview(raw, 500),
            pros: vec![json!("See full response for details")],
            cons: vec![json!("Response could not be parsed as structured data")],
            feasibility: "medium".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BrainstormResult {
    topic: String,
    style: String,
    ideas: Vec<Idea>,
    metadata: BrainstormMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrainstormMetadata {
    total_ideas: usize,
    model_used: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context_files_read: Option<Vec<String>>,
}

/// Ideas from `{"ideas": [...]}` or a bare array, else a single summary idea.
fn parse_ideas(raw: &str) -> Vec<Idea> {
    let items = match parse_json(raw) {
        Some(Value::Object(mut obj)) => match obj.remove("ideas") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        Some(Value::Array(items)) => Some(items),
        _ => None,
    };

    match items {
        Some(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| Idea::from_value(item, i))
            .collect(),
        None => vec![Idea::unparsed(raw)],
    }
}

fn temperature(style: &str) -> f32 {
    match style {
        "radical" => 0.9,
        "innovative" => 0.8,
        _ => 0.6,
    }
}

fn style_guidelines(style: &str) -> &'static str {
    match style {
        "practical" => "Focus on practicality:
- Prioritize quick implementation
- Use proven technologies
- Consider resource constraints
- Focus on immediate impact",
        "radical" => "Focus on radical thinking:
- Challenge all assumptions
- Explore completely new approaches
- Don't be limited by current constraints
- Think 10x, not 10%",
        _ => "Focus on innovation:
- Leverage emerging technologies (AI, blockchain, IoT, etc.)
- Explore new business models
- Consider future trends
- Push beyond conventional solutions",
    }
}

fn build_prompt(
    topic: &str,
    context: Option<&str>,
    project_files: &[FileContent],
    count: u32,
    style: &str,
) -> String {
    let mut prompt = String::from("# Brainstorming Session\n\n");
    prompt.push_str(&format!("## Topic\n{topic}\n\n"));

    if let Some(context) = context {
        prompt.push_str(&format!("## Context\n{context}\n\n"));
    }

    if !project_files.is_empty() {
        prompt.push_str("## Project Context\n");
        for file in project_files {
            prompt.push_str(&format!("### File: {}\n{}\n\n", file.path, file.content));
        }
    }

    prompt.push_str("## Requirements\n");
    prompt.push_str(&format!("- Generate exactly {count} distinct ideas\n"));
    prompt.push_str(&format!("- Style: {style}\n\n"));
    prompt.push_str(&format!("## Style Guidelines\n{}\n\n", style_guidelines(style)));

    prompt.push_str(
        "## Output Format
Provide your response as valid JSON with this exact structure:
{
  \"ideas\": [
    {
      \"title\": \"Clear, descriptive title\",
      \"description\": \"Detailed description of the idea (2-3 sentences)\",
      \"pros\": [\"benefit 1\", \"benefit 2\", \"benefit 3\"],
      \"cons\": [\"challenge 1\", \"challenge 2\"],
      \"feasibility\": \"low\" | \"medium\" | \"high\"
    }
  ]
}

Important:
- Return ONLY valid JSON, no additional text
- Each idea must have all required fields
- Pros and cons should be specific and meaningful
- Feasibility should reflect realistic assessment",
    );
    prompt
}

/// Read `contextFilePath` and `contextFiles`. Unreadable files are skipped.
async fn read_project_files(
    ctx: &ToolContext,
    single: Option<&str>,
    many: &[String],
) -> Result<Vec<FileContent>, ToolError> {
    let mut files = Vec::new();
    if let Some(path) = single {
        match ctx.files.read_file(path).await {
            Ok(file) => files.push(file),
            Err(e @ ToolError::SecurityViolation(_)) => return Err(e),
            Err(e) => warn!(path = %path, error = %e, "Could not read contextFilePath, continuing"),
        }
    }
    files.extend(ctx.files.read_files(many).await?);
    Ok(files)
}

#[async_trait]
impl ToolHandler for BrainstormHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "gemini_brainstorm",
            "Generate creative ideas and solutions. Provides multiple ideas with pros/cons and feasibility assessment. Supports reading project context files to generate ideas that fit your project.",
        )
        .with_schema(
            InputSchema::new()
                .with_property("topic", json!({
                    "type": "string",
                    "description": "Topic for brainstorming"
                }))
                .with_property("context", json!({
                    "type": "string",
                    "description": "Optional: Additional context or constraints"
                }))
                .with_property("contextFilePath", json!({
                    "type": "string",
                    "description": "Optional: Path to a project file (e.g., README.md) that describes the project"
                }))
                .with_property("contextFiles", json!({
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Optional: Paths of additional project files to read as context"
                }))
                .with_property("count", json!({
                    "type": "number",
                    "minimum": 1,
                    "maximum": 20,
                    "description": "Number of ideas to generate (default: 5)",
                    "default": 5
                }))
                .with_property("style", json!({
                    "type": "string",
                    "enum": enums::BRAINSTORM_STYLES,
                    "description": "Brainstorming style (default: innovative)",
                    "default": "innovative"
                }))
                .with_required(&["topic"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, fields(style, count)))]
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let topic = required_string(&input, "topic", 5)?;
        let context = optional_string(&input, "context", 5)?;
        let style = match input.get("style").and_then(Value::as_str).filter(|s| !s.is_empty()) {
            None => "innovative",
            Some(s) => enums::BRAINSTORM_STYLES
                .iter()
                .copied()
                .find(|allowed| *allowed == s)
                .ok_or_else(|| {
                    ToolError::validation(format!(
                        "Invalid style: {s}. Must be one of: {}",
                        enums::BRAINSTORM_STYLES.join(", ")
                    ))
                })?,
        };
        let count = number_or(&input, "count", Some(1.0), Some(20.0), 5.0)? as u32;
        let context_file = optional_string(&input, "contextFilePath", 1)?;
        let context_files = string_list(&input, "contextFiles", 0)?.unwrap_or_default();

        #[cfg(feature = "telemetry")]
        {
            let span = tracing::Span::current();
            span.record("style", style);
            span.record("count", count);
        }

        let project_files = read_project_files(ctx, context_file.as_deref(), &context_files).await?;
        let prompt = build_prompt(&topic, context.as_deref(), &project_files, count, style);
        let options = GenerateOptions::new(BRAINSTORM_SYSTEM_PROMPT, temperature(style), 8192);
        let raw = ctx.client.generate(&prompt, &options).await?;

        let ideas = parse_ideas(&raw);

        #[cfg(feature = "telemetry")]
        debug!(requested = count, parsed = ideas.len(), "Brainstorm complete");

        let files_read: Vec<String> = project_files.into_iter().map(|f| f.path).collect();
        to_output(&BrainstormResult {
            topic,
            style: style.to_string(),
            metadata: BrainstormMetadata {
                total_ideas: ideas.len(),
                model_used: ctx.model(),
                context_files_read: (!files_read.is_empty()).then_some(files_read),
            },
            ideas,
        })
    }
}
