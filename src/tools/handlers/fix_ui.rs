// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `gemini_fix_ui_from_screenshot` tool: diagnose UI problems from a screenshot
//! and optionally the source that renders it.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};
use tracing::warn;

use crate::error::ToolError;
use crate::tools::extract::{code_blocks_or_text, parse_object};
use crate::tools::registry::{ToolContext, ToolHandler};
use crate::tools::validation::{enum_or, optional_string, required_string, string_list};
use crate::tools::file_section;
use crate::types::{GenerateOptions, InputSchema, ThinkingLevel, ToolDefinition};

const UI_FIX_SYSTEM_PROMPT: &str = "You are a UI debugging expert specializing in visual problem diagnosis.

Your expertise:
- Identifying layout issues (alignment, spacing, overflow)
- Detecting styling problems (colors, fonts, borders)
- Spotting responsive design failures
- Finding accessibility issues
- Recognizing browser compatibility problems

Analysis process:
1. Examine the screenshot carefully
2. Identify all visual problems
3. Determine root causes (CSS, HTML structure, JavaScript)
4. Provide targeted fixes

Output requirements:
1. Diagnosis:
   - List all identified issues
   - Explain why each issue occurs
   - Prioritize by severity
2. Fixes:
   - Provide complete code fixes
   - Show before/after comparisons
   - Explain what each fix does
3. Prevention:
   - Suggest best practices to avoid similar issues
   - Recommend tools or techniques

Code quality:
- Minimal changes (fix only what's broken)
- Maintain existing code style
- Add comments explaining fixes
- Ensure backward compatibility";

static IMAGE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(png|jpg|jpeg|gif|webp|bmp|svg|ico)$").expect("static regex"));

/// Handler for the `gemini_fix_ui_from_screenshot` tool.
pub struct FixUiHandler;

/// `targetState` names a reference image rather than a description.
fn is_image_reference(target: &str) -> bool {
    target.starts_with("data:image") || IMAGE_PATH.is_match(target)
}

/// Source context collected from disk, plus the paths that made it in.
#[derive(Debug, Default)]
struct CodeContext {
    text: String,
    analyzed_files: Vec<String>,
}

async fn collect_code_context(
    ctx: &ToolContext,
    source_path: Option<&str>,
    related: &[String],
    current_code: Option<&str>,
) -> Result<CodeContext, ToolError> {
    let mut code = CodeContext::default();

    if let Some(path) = source_path {
        match ctx.files.read_file(path).await {
            Ok(file) => {
                code.text.push_str(&file_section("Main source code file", &file));
                code.analyzed_files.push(file.path);
            }
            Err(e @ ToolError::SecurityViolation(_)) => return Err(e),
            Err(e) => warn!(path = %path, error = %e, "Could not read sourceCodePath, continuing"),
        }
    }

    for file in ctx.files.read_files(related).await? {
        code.text.push_str(&file_section("Related file", &file));
        code.analyzed_files.push(file.path);
    }

    if let (Some(current), None) = (current_code, source_path) {
        code.text.push_str(&format!("## Current code\n```\n{current}\n```\n\n"));
    }

    Ok(code)
}

fn build_prompt(issue: Option<&str>, code: &CodeContext, target_state: Option<&str>) -> String {
    let mut prompt = String::from("Analyze this screenshot and identify all UI problems.\n\n");

    if let Some(issue) = issue {
        prompt.push_str(&format!("Known Issue: {issue}\n\n"));
    }
    if !code.text.is_empty() {
        prompt.push_str(&format!("# Source Code Context\n{}\n", code.text));
    }
    if let Some(target) = target_state.filter(|t| !is_image_reference(t)) {
        prompt.push_str(&format!("Expected State: {target}\n\n"));
    }

    let has_sources = !code.analyzed_files.is_empty();
    prompt.push_str(&format!(
        "Please provide:
1. Diagnosis: What's wrong and why (analyze both the screenshot and source code)
2. Fixes: Complete code fixes for each issue{}
3. Prevention: How to avoid similar issues

Format your response as JSON with this structure:
{{
  \"diagnosis\": \"detailed analysis\",
  \"fixes\": [
    {{
      \"description\": \"what this fix does\",
      \"code\": \"complete fixed code\",
      \"changes\": [\"list of changes made\"]{}
    }}
  ],
  \"preventionTips\": [\"tip 1\", \"tip 2\"]
}}",
        if has_sources { " (include file path for each fix)" } else { "" },
        if has_sources { ",\n      \"filePath\": \"path/to/file.tsx\"" } else { "" },
    ));
    prompt
}

fn shape_result(raw: &str, analyzed_files: Vec<String>) -> Value {
    let mut result = parse_object(raw).unwrap_or_else(|| {
        let mut fallback = serde_json::Map::new();
        fallback.insert("diagnosis".to_string(), json!(raw));
        fallback.insert(
            "fixes".to_string(),
            json!([{
                "description": "General fix",
                "code": code_blocks_or_text(raw),
                "changes": ["See diagnosis for details"]
            }]),
        );
        fallback
    });
    if !analyzed_files.is_empty() {
        result.insert("analyzedFiles".to_string(), json!(analyzed_files));
    }
    Value::Object(result)
}

#[async_trait]
impl ToolHandler for FixUiHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "gemini_fix_ui_from_screenshot",
            "Identify and fix UI issues from screenshots. Diagnoses layout problems, styling issues, responsive failures, and provides targeted code fixes. Can read the source files behind the screenshot for file-specific fixes.",
        )
        .with_schema(
            InputSchema::new()
                .with_property("screenshot", json!({
                    "type": "string",
                    "description": "Screenshot of the UI problem as file path (e.g., ./screenshots/bug.png) or Base64 data URI. File paths will be automatically converted to Base64."
                }))
                .with_property("sourceCodePath", json!({
                    "type": "string",
                    "description": "Optional: Path to the main source file of the component being fixed"
                }))
                .with_property("relatedFiles", json!({
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Optional: Paths of related files (styles, child components)"
                }))
                .with_property("currentCode", json!({
                    "type": "string",
                    "description": "Optional: Current code causing the issue (ignored when sourceCodePath is given)"
                }))
                .with_property("issueDescription", json!({
                    "type": "string",
                    "description": "Optional: Description of the problem"
                }))
                .with_property("targetState", json!({
                    "type": "string",
                    "description": "Optional: Expected state description or reference image"
                }))
                .with_property("thinkingLevel", json!({
                    "type": "string",
                    "enum": ThinkingLevel::VALUES,
                    "description": "Thinking depth for diagnosis (default: HIGH)",
                    "default": "HIGH"
                }))
                .with_required(&["screenshot"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, fields(images, analyzed_files)))]
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let screenshot = required_string(&input, "screenshot", 5)?;
        let source_path = optional_string(&input, "sourceCodePath", 1)?;
        let related = string_list(&input, "relatedFiles", 0)?.unwrap_or_default();
        let current_code = optional_string(&input, "currentCode", 1)?;
        let issue = optional_string(&input, "issueDescription", 1)?;
        let target_state = optional_string(&input, "targetState", 1)?;
        let thinking_level: ThinkingLevel = enum_or(&input, "thinkingLevel", &ThinkingLevel::VALUES, "HIGH")?
            .parse()
            .map_err(ToolError::validation)?;

        let code = collect_code_context(ctx, source_path.as_deref(), &related, current_code.as_deref()).await?;
        let prompt = build_prompt(issue.as_deref(), &code, target_state.as_deref());

        let mut images = vec![screenshot];
        if let Some(target) = target_state.filter(|t| is_image_reference(t)) {
            images.push(target);
        }

        #[cfg(feature = "telemetry")]
        {
            let span = tracing::Span::current();
            span.record("images", images.len());
            span.record("analyzed_files", code.analyzed_files.len());
        }

        let options = GenerateOptions::new(UI_FIX_SYSTEM_PROMPT, 0.5, 6144).with_thinking(thinking_level);
        let raw = ctx.client.generate_multimodal(&prompt, &images, &options).await?;

        #[cfg(feature = "telemetry")]
        debug!(chars = raw.len(), "Fix suggestions received");

        Ok(shape_result(&raw, code.analyzed_files))
    }
}
