// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `gemini_analyze_codebase` tool: whole-codebase review in one prompt.
//!
//! Files come from, in priority order, a `directory` walk, a `filePaths`
//! list, or inline `files` objects.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};
use tracing::info;

use crate::error::ToolError;
use crate::tools::extract::parse_object;
use crate::tools::files::detect_language;
use crate::tools::registry::{ToolContext, ToolHandler};
use crate::tools::validation::{array, bool_or, enums, optional_string, string_list};
use crate::tools::{fence_tag, to_output};
use crate::types::{GenerateOptions, InputSchema, ThinkingLevel, ToolDefinition};

const CODEBASE_ANALYSIS_SYSTEM_PROMPT: &str = "You are a senior software architect with expertise in:
- System architecture and design patterns
- Code quality and best practices
- Security vulnerabilities and threats
- Performance optimization
- Dependency management

Analysis approach:
1. Overview:
   - Understand the overall structure
   - Identify main components and their relationships
   - Recognize architectural patterns

2. Deep dive (based on focus):
   - Architecture: Layers, modules, data flow
   - Security: Vulnerabilities, exposure points
   - Performance: Bottlenecks, inefficiencies
   - Dependencies: Version conflicts, outdated packages
   - Patterns: Design patterns, anti-patterns

3. Recommendations:
   - Prioritize by impact and effort
   - Provide actionable suggestions
   - Include code examples when helpful

Output quality:
- Be thorough but concise
- Use clear, professional language
- Include file paths and line numbers
- Visualize architecture with Mermaid diagrams
- Focus on high-impact findings";

const OUTPUT_FORMATS: &[&str] = &["markdown", "json"];

static MERMAID_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```mermaid\s*([\s\S]*?)```").expect("static regex"));

/// Handler for the `gemini_analyze_codebase` tool.
pub struct AnalyzeCodebaseHandler;

#[derive(Debug, Clone)]
struct SourceFile {
    path: String,
    content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct CodebaseMetrics {
    total_files: usize,
    total_lines: usize,
    languages: Vec<String>,
}

impl CodebaseMetrics {
    fn measure(files: &[SourceFile]) -> Self {
        let mut languages: Vec<String> = Vec::new();
        for file in files {
            let language = detect_language(&file.path);
            if language != "Unknown" && !languages.iter().any(|l| l == language) {
                languages.push(language.to_string());
            }
        }
        Self {
            total_files: files.len(),
            total_lines: files.iter().map(|f| f.content.split('\n').count()).sum(),
            languages,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CodebaseResult {
    summary: String,
    findings: Value,
    metrics: CodebaseMetrics,
    analysis_depth: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    visualization: Option<String>,
}

/// `Invalid <field>: <v>. Must be one of: ...`
fn enum_arg<'a>(input: &Value, field: &str, allowed: &[&'a str]) -> Result<Option<&'a str>, ToolError> {
    match input.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(value) => {
            let shown = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            match allowed.iter().find(|a| **a == shown) {
                Some(found) => Ok(Some(*found)),
                None => Err(ToolError::validation(format!(
                    "Invalid {field}: {shown}. Must be one of: {}",
                    allowed.join(", ")
                ))),
            }
        }
    }
}

const NO_SOURCE: &str = "One of directory, filePaths, or files parameter is required. Use directory to pass a directory path, filePaths to pass a file path list, or files to pass a file content array.";

fn inline_files(input: &Value) -> Result<Vec<SourceFile>, ToolError> {
    let items = match input.get("files") {
        None | Some(Value::Null) => return Err(ToolError::validation(NO_SOURCE)),
        Some(Value::Array(items)) if items.is_empty() => return Err(ToolError::validation(NO_SOURCE)),
        Some(value) => array(value, "files", 1)?,
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let field = |key: &str| {
                item.get(key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        ToolError::validation(format!("File at index {i} is missing required '{key}' property"))
                    })
            };
            Ok(SourceFile {
                path: field("path")?,
                content: field("content")?,
            })
        })
        .collect()
}

/// Gather the files to analyze: directory > filePaths > files.
async fn gather_files(input: &Value, ctx: &ToolContext) -> Result<Vec<SourceFile>, ToolError> {
    let directory = optional_string(input, "directory", 1)?;
    let file_paths = string_list(input, "filePaths", 0)?.filter(|p| !p.is_empty());

    if let Some(dir) = directory {
        let include = string_list(input, "include", 0)?;
        let exclude = string_list(input, "exclude", 0)?;
        info!(directory = %dir, "Reading directory");

        let files = ctx
            .files
            .read_directory(&dir, include.as_deref(), exclude.as_deref())
            .await?;
        if files.is_empty() {
            let mut message = format!("No matching files found in directory \"{dir}\".");
            if let Some(include) = include {
                message.push_str(&format!(" Include patterns: {}", include.join(", ")));
            }
            if let Some(exclude) = exclude {
                message.push_str(&format!(" Exclude patterns: {}", exclude.join(", ")));
            }
            return Err(ToolError::execution(message));
        }
        info!(count = files.len(), "Read directory files");
        return Ok(files
            .into_iter()
            .map(|f| SourceFile { path: f.path, content: f.content })
            .collect());
    }

    if let Some(paths) = file_paths {
        info!(count = paths.len(), "Reading file list");
        let files = ctx.files.read_files(&paths).await?;
        if files.is_empty() {
            return Err(ToolError::execution(
                "All specified files could not be read. Please check if file paths are correct.",
            ));
        }
        return Ok(files
            .into_iter()
            .map(|f| SourceFile { path: f.path, content: f.content })
            .collect());
    }

    inline_files(input)
}

fn focus_instruction(focus: Option<&str>) -> &'static str {
    match focus {
        Some("architecture") => "Focus on system architecture:
- Identify architectural patterns (MVC, MVVM, Clean Architecture, etc.)
- Analyze module/component structure
- Map data flow and dependencies
- Identify layers and boundaries
- Create architecture diagram using Mermaid",
        Some("security") => "Focus on security analysis:
- Identify potential vulnerabilities (OWASP Top 10)
- Check for hardcoded secrets/credentials
- Analyze authentication/authorization patterns
- Review input validation and sanitization
- Check for SQL injection, XSS, CSRF vulnerabilities",
        Some("performance") => "Focus on performance analysis:
- Identify potential bottlenecks
- Check for N+1 queries, memory leaks
- Analyze async/await patterns
- Review caching strategies
- Check for inefficient algorithms",
        Some("dependencies") => "Focus on dependency analysis:
- Check for outdated dependencies
- Identify unused dependencies
- Look for version conflicts
- Review dependency tree
- Check for known vulnerabilities in dependencies",
        Some("patterns") => "Focus on design patterns:
- Identify design patterns used
- Look for anti-patterns
- Check for code smells
- Review naming conventions
- Analyze code organization",
        _ => "Perform a comprehensive analysis covering architecture, security, performance, and code quality.",
    }
}

fn build_prompt(
    files: &[SourceFile],
    metrics: &CodebaseMetrics,
    focus: Option<&str>,
    deep_think: bool,
    output_format: &str,
) -> String {
    let mut prompt = String::from("# Codebase Analysis Request\n\n");

    prompt.push_str("## Codebase Overview\n");
    prompt.push_str(&format!("- Total Files: {}\n", metrics.total_files));
    prompt.push_str(&format!("- Total Lines: {}\n", metrics.total_lines));
    prompt.push_str(&format!("- Languages: {}\n\n", metrics.languages.join(", ")));

    prompt.push_str(&format!("## Analysis Focus\n{}\n\n", focus_instruction(focus)));

    if deep_think {
        prompt.push_str("## Deep Think Mode\nPerform an extra thorough analysis. Take your time to reason through complex issues. Consider edge cases and subtle problems.\n\n");
    }

    prompt.push_str("## Output Format\n");
    if output_format == "json" {
        prompt.push_str(
            "Provide your response as valid JSON with the following structure:
{
  \"summary\": \"Overall summary of the codebase\",
  \"findings\": [
    {
      \"category\": \"security|performance|architecture|patterns|dependencies\",
      \"severity\": \"high|medium|low\",
      \"description\": \"Description of the finding\",
      \"location\": \"file path and line numbers if applicable\",
      \"suggestion\": \"Recommended fix or improvement\"
    }
  ],
  \"visualization\": \"Mermaid diagram code for architecture visualization\"
}\n\n",
        );
    } else {
        prompt.push_str(
            "Use Markdown formatting:
- Start with an executive summary
- Group findings by category
- Use severity badges: 🔴 High, 🟡 Medium, 🟢 Low
- Include code snippets for examples
- Add a Mermaid diagram for architecture visualization\n\n",
        );
    }

    prompt.push_str("## Files to Analyze\n\n");
    for file in files {
        let language = detect_language(&file.path);
        prompt.push_str(&format!(
            "### {} ({language})\n```{}\n{}\n```\n\n",
            file.path,
            fence_tag(language),
            file.content
        ));
    }

    prompt
}

fn shape_result(raw: String, output_format: &str, metrics: CodebaseMetrics, deep_think: bool) -> CodebaseResult {
    let mut result = CodebaseResult {
        summary: String::new(),
        findings: json!([]),
        metrics,
        analysis_depth: if deep_think { "deep" } else { "standard" },
        visualization: None,
    };

    if output_format == "json" {
        match parse_object(&raw) {
            Some(parsed) => {
                result.summary = parsed
                    .get("summary")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| raw.clone());
                if let Some(findings) = parsed.get("findings").filter(|f| f.is_array()) {
                    result.findings = findings.clone();
                }
                result.visualization = parsed
                    .get("visualization")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
            }
            None => result.summary = raw,
        }
    } else {
        result.visualization = MERMAID_BLOCK
            .captures(&raw)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string());
        result.summary = raw;
    }

    result
}

#[async_trait]
impl ToolHandler for AnalyzeCodebaseHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "gemini_analyze_codebase",
            "Analyze entire codebase using 1M token context. Supports directory path, file paths, or file contents. Provides architecture overview, identifies patterns, security issues, performance bottlenecks, and dependency problems.",
        )
        .with_schema(
            InputSchema::new()
                .with_property("directory", json!({
                    "type": "string",
                    "description": "Directory path to analyze (e.g., \"./src\"). The tool will automatically read files from this directory."
                }))
                .with_property("include", json!({
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Glob patterns to include files (e.g., [\"**/*.ts\", \"**/*.tsx\"]). Only used with directory parameter."
                }))
                .with_property("exclude", json!({
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Glob patterns to exclude files (e.g., [\"node_modules/**\", \"**/*.test.ts\"]). Only used with directory parameter."
                }))
                .with_property("filePaths", json!({
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "List of file paths to analyze (e.g., [\"./src/index.ts\", \"./src/utils/helper.ts\"]). The tool will automatically read these files."
                }))
                .with_property("files", json!({
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "path": {"type": "string"},
                            "content": {"type": "string"}
                        },
                        "required": ["path", "content"]
                    },
                    "description": "List of files with their content. Use directory or filePaths for easier usage."
                }))
                .with_property("focus", json!({
                    "type": "string",
                    "enum": enums::CODEBASE_FOCUS,
                    "description": "Optional: Analysis focus area"
                }))
                .with_property("deepThink", json!({
                    "type": "boolean",
                    "description": "Enable Deep Think mode for complex analysis (default: false)",
                    "default": false
                }))
                .with_property("thinkingLevel", json!({
                    "type": "string",
                    "enum": ThinkingLevel::VALUES,
                    "description": "Thinking depth for the analysis (default: HIGH)",
                    "default": "HIGH"
                }))
                .with_property("outputFormat", json!({
                    "type": "string",
                    "enum": OUTPUT_FORMATS,
                    "description": "Output format (default: markdown)",
                    "default": "markdown"
                })),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, fields(files, lines, deep_think)))]
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let focus = enum_arg(&input, "focus", enums::CODEBASE_FOCUS)?;
        let output_format = enum_arg(&input, "outputFormat", OUTPUT_FORMATS)?.unwrap_or("markdown");
        let deep_think = bool_or(&input, "deepThink", false)?;
        let thinking_level: ThinkingLevel = enum_arg(&input, "thinkingLevel", &ThinkingLevel::VALUES)?
            .unwrap_or("HIGH")
            .parse()
            .map_err(ToolError::validation)?;

        let files = gather_files(&input, ctx).await?;
        let metrics = CodebaseMetrics::measure(&files);

        #[cfg(feature = "telemetry")]
        {
            let span = tracing::Span::current();
            span.record("files", metrics.total_files);
            span.record("lines", metrics.total_lines);
            span.record("deep_think", deep_think);
        }

        let prompt = build_prompt(&files, &metrics, focus, deep_think, output_format);
        let options = GenerateOptions::new(
            CODEBASE_ANALYSIS_SYSTEM_PROMPT,
            if deep_think { 0.7 } else { 0.5 },
            16384,
        )
        .with_thinking(thinking_level);
        let raw = ctx.client.generate(&prompt, &options).await?;

        #[cfg(feature = "telemetry")]
        debug!(chars = raw.len(), prompt_chars = prompt.len(), "Codebase analysis received");

        to_output(&shape_result(raw, output_format, metrics, deep_think))
    }
}
