// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `gemini_devils_advocate` tool: critique-only review of a proposal.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::error::ToolError;
use crate::tools::extract::{choice, list, parse_object, preview, string_list as reply_strings, text};
use crate::tools::registry::{ToolContext, ToolHandler};
use crate::tools::to_output;
use crate::tools::validation::{enums, number_or, optional_string, required_string, string_list};
use crate::types::{GenerateOptions, InputSchema, ToolDefinition};

const DEVILS_ADVOCATE_SYSTEM_PROMPT: &str = "You are a **Devil's Advocate Power** - a specialized critic focused ONLY on:
- Finding problems, risks, and gaps in proposals
- Identifying hidden assumptions
- Questioning logic and completeness
- Highlighting potential failure modes

## CRITICAL CONSTRAINTS (MUST FOLLOW):
❌ You MUST NOT propose new solutions or alternatives
❌ You MUST NOT modify or improve the original proposal
❌ You MUST NOT recommend trade-offs or decisions
❌ You MUST NOT say \"instead, you should...\" or \"a better approach would be...\"
❌ You MUST NOT be constructive - your job is to find problems, not solve them

✅ You MUST only:
- List problems and risks
- Identify hidden assumptions
- Point out missing considerations
- Ask challenging questions
- Each criticism must be specific and actionable

## TONE:
- Be direct and critical
- No sugar-coating
- Focus on what could go wrong
- Assume Murphy's Law applies

## OUTPUT RULES:
- Each item: 1-2 sentences max
- Be specific, not vague
- Prioritize by severity
- Format as structured JSON";

const MAX_RISKS: usize = 10;
const MAX_ASSUMPTIONS: usize = 8;
const MAX_CONSIDERATIONS: usize = 8;
const MAX_QUESTIONS: usize = 8;

/// Handler for the `gemini_devils_advocate` tool.
pub struct DevilsAdvocateHandler;

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Risk {
    risk: String,
    severity: String,
    impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Assumption {
    assumption: String,
    why_problematic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Consideration {
    consideration: String,
    why_important: String,
}

#[derive(Debug, Default, PartialEq, Serialize)]
struct Critique {
    critical_risks: Vec<Risk>,
    hidden_assumptions: Vec<Assumption>,
    missing_considerations: Vec<Consideration>,
    questions_to_answer: Vec<String>,
}

impl Critique {
    fn parse(raw: &str) -> Self {
        let Some(obj) = parse_object(raw) else {
            return Self {
                critical_risks: vec![Risk {
                    risk: "Parse Error".to_string(),
                    severity: "high".to_string(),
                    impact: "Could not parse response".to_string(),
                }],
                questions_to_answer: vec!["Review raw response".to_string()],
                ..Self::default()
            };
        };

        Self {
            critical_risks: list(&obj, "critical_risks", MAX_RISKS, |r| Risk {
                risk: text(r, "risk"),
                severity: choice(r, "severity", enums::SEVERITY_LEVELS, "medium"),
                impact: text(r, "impact"),
            }),
            hidden_assumptions: list(&obj, "hidden_assumptions", MAX_ASSUMPTIONS, |a| Assumption {
                assumption: text(a, "assumption"),
                why_problematic: text(a, "why_problematic"),
            }),
            missing_considerations: list(&obj, "missing_considerations", MAX_CONSIDERATIONS, |c| {
                Consideration {
                    consideration: text(c, "consideration"),
                    why_important: text(c, "why_important"),
                }
            }),
            questions_to_answer: reply_strings(&obj, "questions_to_answer", MAX_QUESTIONS),
        }
    }

    fn total_issues(&self) -> usize {
        self.critical_risks.len()
            + self.hidden_assumptions.len()
            + self.missing_considerations.len()
            + self.questions_to_answer.len()
    }
}

#[derive(Debug, Serialize)]
struct CritiqueResult {
    proposal_summary: String,
    #[serde(flatten)]
    critique: Critique,
    metadata: CritiqueMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CritiqueMetadata {
    model_used: String,
    token_budget: u32,
    total_issues_found: usize,
}

fn build_prompt(proposal: &str, goal: Option<&str>, constraints: Option<&str>) -> String {
    let mut prompt = String::from("# Devil's Advocate Review\n\n");
    prompt.push_str(&format!("## Proposal to Critique\n{proposal}\n\n"));

    if let Some(goal) = goal {
        prompt.push_str(&format!("## Stated Goal\n{goal}\n\n"));
    }
    if let Some(constraints) = constraints {
        prompt.push_str(&format!("## Known Constraints\n{constraints}\n\n"));
    }

    prompt.push_str(&format!(
        "## Your Task
Ruthlessly critique this proposal. Find every problem, risk, and gap.
Remember: You are NOT here to help improve it. You are here to break it.

## Output Requirements
Provide your critique as valid JSON with this EXACT structure:
{{
  \"critical_risks\": [
    {{\"risk\": \"what could go wrong\", \"severity\": \"high|medium|low\", \"impact\": \"consequence\"}}
  ],
  \"hidden_assumptions\": [
    {{\"assumption\": \"unstated assumption\", \"why_problematic\": \"why this is dangerous\"}}
  ],
  \"missing_considerations\": [
    {{\"consideration\": \"what was not considered\", \"why_important\": \"why it matters\"}}
  ],
  \"questions_to_answer\": [\"hard question that needs answering\"]
}}

CONSTRAINTS:
- critical_risks: max {MAX_RISKS} items, sorted by severity
- hidden_assumptions: max {MAX_ASSUMPTIONS} items
- missing_considerations: max {MAX_CONSIDERATIONS} items
- questions_to_answer: max {MAX_QUESTIONS} items
- Each explanation: max 2 sentences
- Be specific, not generic
- Return ONLY valid JSON"
    ));
    prompt
}

#[async_trait]
impl ToolHandler for DevilsAdvocateHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "gemini_devils_advocate",
            "Devil's advocate: critiques a proposal by listing critical risks, hidden assumptions, missing considerations and hard questions. Never proposes solutions or alternatives.",
        )
        .with_schema(
            InputSchema::new()
                .with_property("proposal", json!({
                    "type": "string",
                    "description": "The proposal, plan or design to critique"
                }))
                .with_property("proposalPaths", json!({
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Optional: Paths of files to append to the proposal"
                }))
                .with_property("goal", json!({
                    "type": "string",
                    "description": "Optional: The goal the proposal is meant to achieve"
                }))
                .with_property("constraints", json!({
                    "type": "string",
                    "description": "Optional: Known constraints"
                }))
                .with_property("maxOutputTokens", json!({
                    "type": "number",
                    "minimum": 200,
                    "maximum": 1500,
                    "description": "Output token budget (default: 600)",
                    "default": 600
                }))
                .with_required(&["proposal"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, fields(budget, proposal_files)))]
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let proposal = required_string(&input, "proposal", 20)?;
        let max_tokens = number_or(&input, "maxOutputTokens", Some(200.0), Some(1500.0), 600.0)? as u32;
        let paths = string_list(&input, "proposalPaths", 0)?.unwrap_or_default();
        let goal = optional_string(&input, "goal", 1)?;
        let constraints = optional_string(&input, "constraints", 1)?;

        let files = ctx.files.read_files(&paths).await?;
        let mut full_proposal = proposal.clone();
        for file in &files {
            full_proposal.push_str(&format!("\n\n### File: {}\n{}", file.path, file.content));
        }

        #[cfg(feature = "telemetry")]
        {
            let span = tracing::Span::current();
            span.record("budget", max_tokens);
            span.record("proposal_files", files.len());
        }

        let prompt = build_prompt(&full_proposal, goal.as_deref(), constraints.as_deref());
        let options = GenerateOptions::new(DEVILS_ADVOCATE_SYSTEM_PROMPT, 0.4, max_tokens);
        let raw = ctx.client.generate(&prompt, &options).await?;
        let critique = Critique::parse(&raw);
        let total_issues = critique.total_issues();

        #[cfg(feature = "telemetry")]
        debug!(total_issues, "Critique parsed");

        to_output(&CritiqueResult {
            proposal_summary: preview(&proposal, 200),
            critique,
            metadata: CritiqueMetadata {
                model_used: ctx.model(),
                token_budget: max_tokens,
                total_issues_found: total_issues,
            },
        })
    }
}
