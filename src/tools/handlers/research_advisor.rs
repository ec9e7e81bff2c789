// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `gemini_research_advisor` tool: neutral, capped research notes on a question.
//!
//! The system instruction forbids prescriptive recommendations. Nothing
//! checks the reply for that; only the list caps are enforced here.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::error::ToolError;
use crate::tools::extract::{list, opt_text, parse_object, string_list as reply_strings, text};
use crate::tools::registry::{ToolContext, ToolHandler};
use crate::tools::to_output;
use crate::tools::validation::{number_or, optional_string, required_string, string_list};
use crate::types::{GenerateOptions, InputSchema, ToolDefinition};

const RESEARCH_ADVISOR_SYSTEM_PROMPT: &str = "You are a **Research Advisor Power** - a specialized assistant focused ONLY on:
- Reading and understanding documentation, code, and materials
- Extracting key concepts and patterns
- Providing reference suggestions and directions
- Identifying relevant best practices

## CRITICAL CONSTRAINTS (MUST FOLLOW):
❌ You MUST NOT provide final solutions or decisions
❌ You MUST NOT judge whether something is right or wrong
❌ You MUST NOT recommend specific trade-offs
❌ You MUST NOT make architectural decisions
❌ You MUST NOT say \"you should do X\" - only \"consider X\" or \"X is a common approach\"

✅ You MUST only provide:
- Key concepts extracted from materials
- Reference directions for further exploration
- Relevant keywords and search terms
- Common approaches (without recommending one)
- Best practices from the materials (as information, not prescription)

## OUTPUT RULES:
- Keep each item concise (1-2 sentences max)
- Maximum 8 items per category
- Use neutral, informative language
- Always cite sources when available
- Format as structured JSON for machine consumption";

const MAX_KEY_CONCEPTS: usize = 8;
const MAX_DIRECTIONS: usize = 5;
const MAX_OPEN_QUESTIONS: usize = 5;
const MAX_BEST_PRACTICES: usize = 8;
const MAX_CITATIONS: usize = 10;

/// Handler for the `gemini_research_advisor` tool.
pub struct ResearchAdvisorHandler;

#[derive(Debug, Clone, PartialEq, Serialize)]
struct KeyConcept {
    concept: String,
    explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Direction {
    direction: String,
    rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct BestPractice {
    practice: String,
    context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

#[derive(Debug, Default, PartialEq, Serialize)]
struct ResearchNotes {
    key_concepts: Vec<KeyConcept>,
    recommended_directions: Vec<Direction>,
    open_questions: Vec<String>,
    best_practices: Vec<BestPractice>,
    citations_or_keywords: Vec<String>,
}

impl ResearchNotes {
    fn parse(raw: &str) -> Self {
        let Some(obj) = parse_object(raw) else {
            return Self {
                key_concepts: vec![KeyConcept {
                    concept: "Parse Error".to_string(),
                    explanation: "Could not parse structured response".to_string(),
                    source: None,
                }],
                open_questions: vec!["Review raw response for details".to_string()],
                ..Self::default()
            };
        };

        Self {
            key_concepts: list(&obj, "key_concepts", MAX_KEY_CONCEPTS, |c| KeyConcept {
                concept: opt_text(c, "concept").unwrap_or_else(|| "Unknown".to_string()),
                explanation: text(c, "explanation"),
                source: opt_text(c, "source"),
            }),
            recommended_directions: list(&obj, "recommended_directions", MAX_DIRECTIONS, |d| Direction {
                direction: text(d, "direction"),
                rationale: text(d, "rationale"),
            }),
            open_questions: reply_strings(&obj, "open_questions", MAX_OPEN_QUESTIONS),
            best_practices: list(&obj, "best_practices", MAX_BEST_PRACTICES, |p| BestPractice {
                practice: text(p, "practice"),
                context: text(p, "context"),
                source: opt_text(p, "source"),
            }),
            citations_or_keywords: reply_strings(&obj, "citations_or_keywords", MAX_CITATIONS),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResearchResult {
    question: String,
    #[serde(flatten)]
    notes: ResearchNotes,
    metadata: ResearchMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResearchMetadata {
    materials_analyzed: usize,
    model_used: String,
    token_budget: u32,
}

fn build_prompt(question: &str, context: Option<&str>, materials: &str) -> String {
    let mut prompt = String::from("# Research Advisory Request\n\n");
    prompt.push_str(&format!("## Question to Research\n{question}\n\n"));

    if let Some(context) = context {
        prompt.push_str(&format!("## Additional Context\n{context}\n\n"));
    }
    if !materials.is_empty() {
        prompt.push_str(&format!("## Materials to Analyze\n{materials}\n\n"));
    }

    prompt.push_str(&format!(
        "## Output Requirements
Provide your analysis as valid JSON with this EXACT structure:
{{
  \"key_concepts\": [
    {{\"concept\": \"name\", \"explanation\": \"1-2 sentences\", \"source\": \"optional source\"}}
  ],
  \"recommended_directions\": [
    {{\"direction\": \"what to explore\", \"rationale\": \"why it's relevant\"}}
  ],
  \"open_questions\": [\"question that needs answering\"],
  \"best_practices\": [
    {{\"practice\": \"the practice\", \"context\": \"when/why it applies\", \"source\": \"optional\"}}
  ],
  \"citations_or_keywords\": [\"keyword1\", \"search term\", \"doc section name\"]
}}

CONSTRAINTS:
- key_concepts: max {MAX_KEY_CONCEPTS} items
- recommended_directions: max {MAX_DIRECTIONS} items
- open_questions: max {MAX_OPEN_QUESTIONS} items
- best_practices: max {MAX_BEST_PRACTICES} items
- citations_or_keywords: max {MAX_CITATIONS} items
- Each explanation/rationale: max 2 sentences
- Return ONLY valid JSON, no additional text"
    ));
    prompt
}

#[async_trait]
impl ToolHandler for ResearchAdvisorHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "gemini_research_advisor",
            "Research advisor: reads documentation, code and materials, then extracts key concepts, exploration directions, open questions and best practices. Gives neutral reference information only, never final decisions.",
        )
        .with_schema(
            InputSchema::new()
                .with_property("question", json!({
                    "type": "string",
                    "description": "The question to research"
                }))
                .with_property("materials", json!({
                    "type": "string",
                    "description": "Optional: Material content to analyze (docs, notes, code)"
                }))
                .with_property("materialPaths", json!({
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Optional: Paths of files to read as materials"
                }))
                .with_property("context", json!({
                    "type": "string",
                    "description": "Optional: Additional context for the question"
                }))
                .with_property("maxOutputTokens", json!({
                    "type": "number",
                    "minimum": 200,
                    "maximum": 2000,
                    "description": "Output token budget (default: 800)",
                    "default": 800
                }))
                .with_required(&["question"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, fields(materials, budget)))]
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let question = required_string(&input, "question", 10)?;
        let max_tokens = number_or(&input, "maxOutputTokens", Some(200.0), Some(2000.0), 800.0)? as u32;
        let inline = optional_string(&input, "materials", 1)?;
        let paths = string_list(&input, "materialPaths", 0)?.unwrap_or_default();
        let context = optional_string(&input, "context", 1)?;

        let mut materials = String::new();
        let mut count = 0;
        if let Some(inline) = inline {
            materials.push_str(&inline);
            materials.push_str("\n\n");
            count += 1;
        }
        for file in ctx.files.read_files(&paths).await? {
            materials.push_str(&format!("### File: {}\n{}\n\n", file.path, file.content));
            count += 1;
        }

        #[cfg(feature = "telemetry")]
        {
            let span = tracing::Span::current();
            span.record("materials", count);
            span.record("budget", max_tokens);
        }

        let prompt = build_prompt(&question, context.as_deref(), &materials);
        let options = GenerateOptions::new(RESEARCH_ADVISOR_SYSTEM_PROMPT, 0.3, max_tokens);
        let raw = ctx.client.generate(&prompt, &options).await?;
        let notes = ResearchNotes::parse(&raw);

        #[cfg(feature = "telemetry")]
        debug!(concepts = notes.key_concepts.len(), "Research notes parsed");

        to_output(&ResearchResult {
            question,
            notes,
            metadata: ResearchMetadata {
                materials_analyzed: count,
                model_used: ctx.model(),
                token_budget: max_tokens,
            },
        })
    }
}
