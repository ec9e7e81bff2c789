// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `gemini_analyze_content` tool: summarize, review, explain, optimize or
//! debug a piece of code, prose or data.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};
use serde::Serialize;
use serde_json::{json, Value};

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::error::ToolError;
use crate::tools::extract::parse_object;
use crate::tools::registry::{ToolContext, ToolHandler};
use crate::tools::to_output;
use crate::tools::validation::{enums, optional_string, string_list};
use crate::types::{GenerateOptions, InputSchema, ToolDefinition};

const ANALYZE_CONTENT_SYSTEM_PROMPT: &str = "You are a versatile code and document analyst with expertise in:
- Code quality analysis (any programming language)
- Document summarization and understanding
- Data structure analysis and optimization
- Technical writing review

Analysis approach:
1. Auto-detect content type (code, document, data)
2. Understand the context and purpose
3. Perform requested task:
   - Summarize: Create concise summary with key points
   - Review: Analyze quality, find issues, suggest improvements
   - Explain: Break down complex content into understandable parts
   - Optimize: Suggest performance and efficiency improvements
   - Debug: Identify potential bugs and logic errors

Output requirements:
- Be clear and actionable
- Prioritize findings by importance
- Provide specific examples
- Use appropriate technical terminology
- Format output for readability

When analyzing code:
- Identify the language automatically
- Check for common patterns and anti-patterns
- Suggest best practices
- Highlight security concerns

When analyzing documents:
- Extract main themes and ideas
- Identify structure and organization
- Suggest improvements for clarity
- Highlight important points

When analyzing data:
- Understand the structure
- Identify patterns and anomalies
- Suggest optimizations
- Explain relationships";

const OUTPUT_FORMATS: &[&str] = &["text", "json", "markdown"];

static CODE_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"function\s+\w+\s*\(",
        r"const\s+\w+\s*=",
        r"let\s+\w+\s*=",
        r"var\s+\w+\s*=",
        r"class\s+\w+",
        r#"import\s+.*from\s+['"`]"#,
        r"export\s+",
        r"def\s+\w+\s*\(",
        r"public\s+(static\s+)?class",
        r"private\s+\w+",
        r"<\?php",
        r"package\s+\w+",
        r"func\s+\w+\s*\(",
        r"fn\s+\w+\s*\(",
        r"#include\s*<\w+>",
        r"using\s+namespace",
        r"impl\s+\w+",
        r"struct\s+\w+\s*\{",
        r"interface\s+\w+\s*\{",
        r"=>\s*\{",
        r"async\s+function",
        r"await\s+\w+",
    ])
    .expect("static regex set")
});

static LEADING_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<\w+[^>]*>").expect("static regex"));

/// Handler for the `gemini_analyze_content` tool.
pub struct AnalyzeContentHandler;

/// Classify `content` as `code`, `data` or `document`.
///
/// A known language always means code. Valid JSON and XML-ish markup are
/// data, except full HTML pages. Otherwise code-looking syntax or a high
/// density of brackets and operators means code.
pub fn detect_content_type(content: &str, language: Option<&str>) -> &'static str {
    if language.is_some() {
        return "code";
    }

    let trimmed = content.trim();

    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<Value>(trimmed).is_ok()
    {
        return "data";
    }

    if trimmed.starts_with("<?xml") || LEADING_TAG.is_match(trimmed) {
        if trimmed.contains("<!DOCTYPE html>") || trimmed.contains("<script") {
            return "code";
        }
        return "data";
    }

    if CODE_PATTERNS.is_match(content) {
        return "code";
    }

    let total = content.chars().count();
    let symbols = content
        .chars()
        .filter(|c| matches!(c, '{' | '}' | '[' | ']' | '(' | ')' | ';' | '=' | '>' | '<'))
        .count();
    if total > 0 && symbols as f64 / total as f64 > 0.05 {
        return "code";
    }

    "document"
}

/// `Invalid <field>: <v>. Must be one of: ...` for a bad enumeration value.
fn enum_arg<'a>(input: &Value, field: &str, allowed: &[&'a str], default: &'a str) -> Result<&'a str, ToolError> {
    match input.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(s)) if s.is_empty() => Ok(default),
        Some(value) => {
            let shown = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            allowed
                .iter()
                .find(|a| **a == shown)
                .copied()
                .ok_or_else(|| {
                    ToolError::validation(format!(
                        "Invalid {field}: {shown}. Must be one of: {}",
                        allowed.join(", ")
                    ))
                })
        }
    }
}

fn task_instruction(task: &str) -> &'static str {
    match task {
        "review" => "Perform a thorough review. Identify issues, suggest improvements, and evaluate quality.",
        "explain" => "Explain the content in detail. Break down complex parts into understandable segments.",
        "optimize" => "Analyze for optimization opportunities. Focus on performance, efficiency, and best practices.",
        "debug" => "Identify potential bugs, logic errors, and issues. Suggest fixes for each problem found.",
        _ => "Create a concise summary of the content, highlighting key points and main ideas.",
    }
}

fn format_instruction(output_format: &str) -> &'static str {
    match output_format {
        "json" => "Provide your response as valid JSON with the following structure:
{
  \"summary\": \"Brief summary\",
  \"analysis\": \"Detailed analysis\",
  \"issues\": [{\"severity\": \"high|medium|low\", \"description\": \"...\", \"location\": \"...\"}],
  \"suggestions\": [\"suggestion1\", \"suggestion2\"]
}",
        "markdown" => "Use Markdown formatting for better readability. Include headers, lists, and code blocks where appropriate.",
        _ => "Provide plain text output.",
    }
}

struct PromptArgs<'a> {
    content: &'a str,
    content_type: &'a str,
    language: Option<&'a str>,
    task: &'a str,
    focus: &'a [String],
    output_format: &'a str,
}

fn build_prompt(args: &PromptArgs<'_>) -> String {
    let mut prompt = String::from("# Content Analysis Task\n\n");
    prompt.push_str(&format!("## Content Type\n{}\n\n", args.content_type));

    if let Some(language) = args.language {
        prompt.push_str(&format!("## Programming Language\n{language}\n\n"));
    }

    prompt.push_str(&format!("## Analysis Task\n{}\n\n", task_instruction(args.task)));

    if !args.focus.is_empty() {
        prompt.push_str("## Focus Areas\n");
        for area in args.focus {
            prompt.push_str(&format!("- {area}\n"));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("## Output Format\n{}\n\n", format_instruction(args.output_format)));
    prompt.push_str(&format!("## Content to Analyze\n```\n{}\n```", args.content));
    prompt
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeContentResult {
    analysis: String,
    content_type: String,
    task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestions: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<String>,
}

/// Non-empty field of a parsed JSON reply.
fn present(obj: &serde_json::Map<String, Value>, key: &str) -> Option<Value> {
    obj.get(key)
        .filter(|v| !matches!(v, Value::Null | Value::Bool(false)))
        .filter(|v| v.as_str().map_or(true, |s| !s.is_empty()))
        .cloned()
}

#[async_trait]
impl ToolHandler for AnalyzeContentHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "gemini_analyze_content",
            "Analyze code, documents, or data. Supports summarization, code review, explanation, optimization suggestions, and debugging. Auto-detects content type. Accepts either inline content or a file path.",
        )
        .with_schema(
            InputSchema::new()
                .with_property("content", json!({
                    "type": "string",
                    "description": "The content to analyze (code, document, or data). Required unless filePath is given."
                }))
                .with_property("filePath", json!({
                    "type": "string",
                    "description": "Optional: Path to a file to analyze instead of inline content"
                }))
                .with_property("type", json!({
                    "type": "string",
                    "enum": enums::CONTENT_TYPES,
                    "description": "Content type (default: auto)",
                    "default": "auto"
                }))
                .with_property("task", json!({
                    "type": "string",
                    "enum": enums::ANALYSIS_TASKS,
                    "description": "Analysis task to perform (default: summarize)",
                    "default": "summarize"
                }))
                .with_property("language", json!({
                    "type": "string",
                    "description": "Optional: Programming language (for code content)"
                }))
                .with_property("focus", json!({
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Optional: Specific areas to focus on (e.g., security, performance)"
                }))
                .with_property("outputFormat", json!({
                    "type": "string",
                    "enum": OUTPUT_FORMATS,
                    "description": "Output format (default: markdown)",
                    "default": "markdown"
                })),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, fields(content_type, task, chars)))]
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let inline = optional_string(&input, "content", 10)?;
        let file_path = optional_string(&input, "filePath", 1)?;
        let content_type = enum_arg(&input, "type", enums::CONTENT_TYPES, "auto")?;
        let task = enum_arg(&input, "task", enums::ANALYSIS_TASKS, "summarize")?;
        let output_format = enum_arg(&input, "outputFormat", OUTPUT_FORMATS, "markdown")?;
        let focus = string_list(&input, "focus", 1)?.unwrap_or_default();
        let mut language = optional_string(&input, "language", 1)?;

        let (content, read_from) = match (inline, file_path) {
            (Some(content), _) => (content, None),
            (None, Some(path)) => {
                let file = ctx.files.read_file(&path).await?;
                if language.is_none() && file.language != "Unknown" {
                    language = Some(file.language.to_string());
                }
                (file.content, Some(file.path))
            }
            (None, None) => return Err(ToolError::validation("content is required")),
        };

        let detected = match content_type {
            "auto" => detect_content_type(&content, language.as_deref()),
            explicit => explicit,
        };

        #[cfg(feature = "telemetry")]
        {
            let span = tracing::Span::current();
            span.record("content_type", detected);
            span.record("task", task);
            span.record("chars", content.len());
        }

        let prompt = build_prompt(&PromptArgs {
            content: &content,
            content_type: detected,
            language: language.as_deref(),
            task,
            focus: &focus,
            output_format,
        });
        let options = GenerateOptions::new(ANALYZE_CONTENT_SYSTEM_PROMPT, 0.5, 8192);
        let analysis = ctx.client.generate(&prompt, &options).await?;

        let parsed = (output_format == "json")
            .then(|| parse_object(&analysis))
            .flatten();

        #[cfg(feature = "telemetry")]
        debug!(structured = parsed.is_some(), "Analysis complete");

        let mut result = AnalyzeContentResult {
            analysis,
            content_type: detected.to_string(),
            task: task.to_string(),
            summary: None,
            suggestions: None,
            issues: None,
            file_path: read_from,
        };
        if let Some(obj) = parsed {
            result.summary = present(&obj, "summary");
            result.suggestions = present(&obj, "suggestions");
            result.issues = present(&obj, "issues");
        }

        to_output(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockModelClient;
    use crate::tools::test_support::{context, context_with_files, replying, untouched};

    #[test]
    fn test_detect_content_type() {
        assert_eq!(detect_content_type("anything at all", Some("Rust")), "code");
        assert_eq!(detect_content_type(r#"{"a": [1, 2, 3]}"#, None), "data");
        assert_eq!(detect_content_type("<catalog><book/></catalog>", None), "data");
        assert_eq!(
            detect_content_type("<!DOCTYPE html>\n<html><script>x()</script></html>", None),
            "code"
        );
        assert_eq!(detect_content_type("<html><script src=a.js></script></html>", None), "code");
        assert_eq!(detect_content_type("fn main() { println!(\"hi\"); }", None), "code");
        assert_eq!(detect_content_type("def handler(event):\n    return 1", None), "code");
        assert_eq!(
            detect_content_type("The quarterly report shows steady growth in every region.", None),
            "document"
        );
    }

    #[test]
    fn test_broken_json_is_not_data() {
        assert_ne!(detect_content_type("{ this is not json at all", None), "data");
    }

    #[test]
    fn test_prompt_sections() {
        let focus = vec!["security".to_string(), "performance".to_string()];
        let prompt = build_prompt(&PromptArgs {
            content: "let x = 1;",
            content_type: "code",
            language: Some("JavaScript"),
            task: "debug",
            focus: &focus,
            output_format: "text",
        });
        assert!(prompt.starts_with("# Content Analysis Task\n\n## Content Type\ncode\n\n"));
        assert!(prompt.contains("## Programming Language\nJavaScript\n\n"));
        assert!(prompt.contains("## Analysis Task\nIdentify potential bugs"));
        assert!(prompt.contains("## Focus Areas\n- security\n- performance\n\n"));
        assert!(prompt.contains("## Output Format\nProvide plain text output.\n\n"));
        assert!(prompt.ends_with("## Content to Analyze\n```\nlet x = 1;\n```"));
    }

    #[tokio::test]
    async fn test_enum_errors() {
        let (_temp, ctx) = context(untouched());

        let err = AnalyzeContentHandler
            .execute(json!({"content": "some content here", "type": "video"}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid type: video. Must be one of: code, document, data, auto");
        assert!(matches!(err, ToolError::Validation(_)));

        let err = AnalyzeContentHandler
            .execute(json!({"content": "some content here", "task": "translate"}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid task: translate. Must be one of: summarize, review, explain, optimize, debug"
        );

        let err = AnalyzeContentHandler
            .execute(json!({"content": "some content here", "outputFormat": "html"}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid outputFormat: html. Must be one of: text, json, markdown");
    }

    #[tokio::test]
    async fn test_content_required() {
        let (_temp, ctx) = context(untouched());
        let err = AnalyzeContentHandler.execute(json!({}), &ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "content is required");

        let err = AnalyzeContentHandler
            .execute(json!({"content": "short"}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "content must be at least 10 characters long");
    }

    #[tokio::test]
    async fn test_json_output_is_lifted() {
        let reply = "```json\n{\"summary\": \"Adds numbers\", \"analysis\": \"...\", \"issues\": [{\"severity\": \"low\", \"description\": \"no tests\"}], \"suggestions\": [\"add tests\"]}\n```";
        let (_temp, ctx) = context(replying(reply));

        let result = AnalyzeContentHandler
            .execute(
                json!({"content": "function add(a, b) { return a + b; }", "outputFormat": "json"}),
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(result["analysis"], reply);
        assert_eq!(result["contentType"], "code");
        assert_eq!(result["task"], "summarize");
        assert_eq!(result["summary"], "Adds numbers");
        assert_eq!(result["issues"][0]["severity"], "low");
        assert_eq!(result["suggestions"][0], "add tests");
    }

    #[tokio::test]
    async fn test_markdown_output_is_not_parsed() {
        let (_temp, ctx) = context(replying(r#"{"summary": "ignored"}"#));
        let result = AnalyzeContentHandler
            .execute(json!({"content": "Meeting notes from Monday's planning session."}), &ctx)
            .await
            .unwrap();
        assert_eq!(result["contentType"], "document");
        assert!(result.get("summary").is_none());
    }

    #[tokio::test]
    async fn test_file_path_supplies_content_and_language() {
        let mut mock = MockModelClient::new();
        mock.expect_generate()
            .withf(|prompt, _| {
                prompt.contains("## Programming Language\nPython\n\n") && prompt.contains("def run():")
            })
            .times(1)
            .returning(|_, _| Ok("Runs things.".to_string()));
        let (_temp, ctx) = context_with_files(mock, &[("jobs/run.py", "def run():\n    pass\n")]);

        let result = AnalyzeContentHandler
            .execute(json!({"filePath": "jobs/run.py"}), &ctx)
            .await
            .unwrap();
        assert_eq!(result["filePath"], "jobs/run.py");
        assert_eq!(result["contentType"], "code");
    }
}
