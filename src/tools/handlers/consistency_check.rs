// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `gemini_consistency_check` tool: compare a proposal against its goal,
//! constraints and acceptance criteria. Reports conflicts without fixes.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::error::ToolError;
use crate::tools::extract::{choice, list, parse_object, text};
use crate::tools::registry::{ToolContext, ToolHandler};
use crate::tools::to_output;
use crate::tools::validation::{number_or, optional_string, required_string, string_list};
use crate::types::{GenerateOptions, InputSchema, ToolDefinition};

const CONSISTENCY_CHECK_SYSTEM_PROMPT: &str = "You are a **Consistency Check Power** - a specialized validator focused ONLY on:
- Comparing goals, constraints, and current proposals
- Identifying conflicts and inconsistencies
- Finding requirements that are not covered
- Detecting validation gaps

## CRITICAL CONSTRAINTS (MUST FOLLOW):
❌ You MUST NOT suggest how to resolve conflicts
❌ You MUST NOT recommend changes to the proposal
❌ You MUST NOT prioritize or make trade-off decisions
❌ You MUST NOT say \"you should fix this by...\"
❌ You MUST NOT be creative - only analytical

✅ You MUST only:
- Report whether conflicts exist (yes/no)
- List specific conflict points with both sides
- Identify uncovered requirements
- Point out validation gaps
- Be objective and factual

## OUTPUT RULES:
- Binary answer first: conflicts_found = true/false
- Each conflict must specify BOTH conflicting elements
- Be precise about what conflicts with what
- Format as structured JSON";

const MAX_ITEMS: usize = 10;

const CONFLICT_TYPES: &[&str] = &[
    "goal_vs_proposal",
    "constraint_vs_proposal",
    "internal_contradiction",
    "criteria_vs_proposal",
];

const REQUIREMENT_SOURCES: &[&str] = &["goal", "constraint", "acceptance_criteria"];

/// Handler for the `gemini_consistency_check` tool.
pub struct ConsistencyCheckHandler;

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Conflict {
    element_a: String,
    element_b: String,
    conflict_type: String,
    description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Requirement {
    requirement: String,
    source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ValidationGap {
    gap: String,
    what_cannot_be_verified: String,
}

#[derive(Debug, Default, PartialEq, Serialize)]
struct Findings {
    conflicts_found: bool,
    conflicts: Vec<Conflict>,
    requirements_not_covered: Vec<Requirement>,
    validation_gaps: Vec<ValidationGap>,
}

impl Findings {
    fn parse(raw: &str) -> Self {
        let Some(obj) = parse_object(raw) else {
            return Self {
                validation_gaps: vec![ValidationGap {
                    gap: "Parse Error".to_string(),
                    what_cannot_be_verified: "Response parsing failed".to_string(),
                }],
                ..Self::default()
            };
        };

        let conflicts = list(&obj, "conflicts", MAX_ITEMS, |c| Conflict {
            element_a: text(c, "element_a"),
            element_b: text(c, "element_b"),
            conflict_type: choice(c, "conflict_type", CONFLICT_TYPES, "internal_contradiction"),
            description: text(c, "description"),
        });

        Self {
            conflicts_found: obj.get("conflicts_found") == Some(&Value::Bool(true)) || !conflicts.is_empty(),
            conflicts,
            requirements_not_covered: list(&obj, "requirements_not_covered", MAX_ITEMS, |r| Requirement {
                requirement: text(r, "requirement"),
                source: choice(r, "source", REQUIREMENT_SOURCES, "goal"),
            }),
            validation_gaps: list(&obj, "validation_gaps", MAX_ITEMS, |g| ValidationGap {
                gap: text(g, "gap"),
                what_cannot_be_verified: text(g, "what_cannot_be_verified"),
            }),
        }
    }
}

/// Overall rating from the three finding counts.
fn overall_consistency(conflicts: usize, uncovered: usize, gaps: usize) -> &'static str {
    let total = conflicts + uncovered + gaps;
    if total == 0 {
        "consistent"
    } else if conflicts == 0 && total <= 3 {
        "minor_issues"
    } else if conflicts <= 2 && total <= 6 {
        "major_issues"
    } else {
        "inconsistent"
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    total_conflicts: usize,
    total_uncovered: usize,
    total_gaps: usize,
    overall_consistency: &'static str,
}

#[derive(Debug, Serialize)]
struct ConsistencyResult {
    #[serde(flatten)]
    findings: Findings,
    summary: Summary,
    metadata: ConsistencyMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConsistencyMetadata {
    model_used: String,
    token_budget: u32,
}

fn build_prompt(goal: &str, constraints: Option<&str>, proposal: &str, criteria: Option<&str>) -> String {
    let mut prompt = String::from("# Consistency Check Request\n\n");
    prompt.push_str(&format!("## Goal\n{goal}\n\n"));

    if let Some(constraints) = constraints {
        prompt.push_str(&format!("## Constraints\n{constraints}\n\n"));
    }
    prompt.push_str(&format!("## Current Proposal\n{proposal}\n\n"));
    if let Some(criteria) = criteria {
        prompt.push_str(&format!("## Acceptance Criteria\n{criteria}\n\n"));
    }

    prompt.push_str(&format!(
        "## Your Task
Check if the proposal is CONSISTENT with the goal, constraints, and acceptance criteria.
Find any conflicts, uncovered requirements, or validation gaps.
DO NOT suggest fixes - only report issues.

## Output Requirements
Provide your analysis as valid JSON with this EXACT structure:
{{
  \"conflicts_found\": true|false,
  \"conflicts\": [
    {{
      \"element_a\": \"the first conflicting element (quote from goal/constraint)\",
      \"element_b\": \"the second conflicting element (quote from proposal)\",
      \"conflict_type\": \"goal_vs_proposal|constraint_vs_proposal|internal_contradiction|criteria_vs_proposal\",
      \"description\": \"brief explanation of the conflict\"
    }}
  ],
  \"requirements_not_covered\": [
    {{\"requirement\": \"what is required\", \"source\": \"goal|constraint|acceptance_criteria\"}}
  ],
  \"validation_gaps\": [
    {{\"gap\": \"what is missing\", \"what_cannot_be_verified\": \"what we cannot check\"}}
  ]
}}

CONSTRAINTS:
- conflicts: max {MAX_ITEMS} items
- requirements_not_covered: max {MAX_ITEMS} items
- validation_gaps: max {MAX_ITEMS} items
- Each description: max 2 sentences
- Be specific - quote actual text when possible
- Return ONLY valid JSON"
    ));
    prompt
}

#[async_trait]
impl ToolHandler for ConsistencyCheckHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "gemini_consistency_check",
            "Consistency check: compares a proposal against its goal, constraints and acceptance criteria. Reports conflicts, uncovered requirements and validation gaps without suggesting fixes.",
        )
        .with_schema(
            InputSchema::new()
                .with_property("goal", json!({
                    "type": "string",
                    "description": "The goal the proposal must satisfy"
                }))
                .with_property("proposal", json!({
                    "type": "string",
                    "description": "The current proposal or plan"
                }))
                .with_property("constraints", json!({
                    "type": "string",
                    "description": "Optional: Constraints the proposal must respect"
                }))
                .with_property("acceptanceCriteria", json!({
                    "type": "string",
                    "description": "Optional: Acceptance criteria to check against"
                }))
                .with_property("proposalPaths", json!({
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Optional: Paths of files to append to the proposal"
                }))
                .with_property("maxOutputTokens", json!({
                    "type": "number",
                    "minimum": 200,
                    "maximum": 1200,
                    "description": "Output token budget (default: 500)",
                    "default": 500
                }))
                .with_required(&["goal", "proposal"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, fields(budget, proposal_files)))]
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let goal = required_string(&input, "goal", 10)?;
        let proposal = required_string(&input, "proposal", 20)?;
        let max_tokens = number_or(&input, "maxOutputTokens", Some(200.0), Some(1200.0), 500.0)? as u32;
        let constraints = optional_string(&input, "constraints", 1)?;
        let criteria = optional_string(&input, "acceptanceCriteria", 1)?;
        let paths = string_list(&input, "proposalPaths", 0)?.unwrap_or_default();

        let files = ctx.files.read_files(&paths).await?;
        let mut full_proposal = proposal;
        for file in &files {
            full_proposal.push_str(&format!("\n\n### File: {}\n{}", file.path, file.content));
        }

        #[cfg(feature = "telemetry")]
        {
            let span = tracing::Span::current();
            span.record("budget", max_tokens);
            span.record("proposal_files", files.len());
        }

        let prompt = build_prompt(&goal, constraints.as_deref(), &full_proposal, criteria.as_deref());
        let options = GenerateOptions::new(CONSISTENCY_CHECK_SYSTEM_PROMPT, 0.2, max_tokens);
        let raw = ctx.client.generate(&prompt, &options).await?;
        let findings = Findings::parse(&raw);

        let summary = Summary {
            total_conflicts: findings.conflicts.len(),
            total_uncovered: findings.requirements_not_covered.len(),
            total_gaps: findings.validation_gaps.len(),
            overall_consistency: overall_consistency(
                findings.conflicts.len(),
                findings.requirements_not_covered.len(),
                findings.validation_gaps.len(),
            ),
        };

        #[cfg(feature = "telemetry")]
        debug!(rating = summary.overall_consistency, "Consistency check complete");

        to_output(&ConsistencyResult {
            findings,
            summary,
            metadata: ConsistencyMetadata {
                model_used: ctx.model(),
                token_budget: max_tokens,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockModelClient;
    use crate::tools::test_support::{context, replying, untouched, TEST_MODEL};

    const GOAL: &str = "Ship offline mode for the mobile app";
    const PROPOSAL: &str = "Cache API responses in memory for five minutes.";

    #[test]
    fn test_overall_consistency() {
        assert_eq!(overall_consistency(0, 0, 0), "consistent");
        assert_eq!(overall_consistency(0, 2, 1), "minor_issues");
        assert_eq!(overall_consistency(0, 3, 1), "major_issues");
        assert_eq!(overall_consistency(1, 0, 0), "major_issues");
        assert_eq!(overall_consistency(2, 2, 2), "major_issues");
        assert_eq!(overall_consistency(3, 0, 0), "inconsistent");
        assert_eq!(overall_consistency(1, 3, 3), "inconsistent");
    }

    #[test]
    fn test_conflicts_imply_found() {
        let findings = Findings::parse(
            r#"{"conflicts_found": false, "conflicts": [{"element_a": "offline", "element_b": "in memory", "conflict_type": "bogus"}]}"#,
        );
        assert!(findings.conflicts_found);
        assert_eq!(findings.conflicts[0].conflict_type, "internal_contradiction");
        assert_eq!(findings.conflicts[0].description, "");
    }

    #[test]
    fn test_source_coerced() {
        let findings = Findings::parse(
            r#"{"requirements_not_covered": [{"requirement": "sync", "source": "stakeholder"}, {"requirement": "ui", "source": "constraint"}]}"#,
        );
        assert_eq!(findings.requirements_not_covered[0].source, "goal");
        assert_eq!(findings.requirements_not_covered[1].source, "constraint");
        assert!(!findings.conflicts_found);
    }

    #[test]
    fn test_unparseable_reply() {
        let findings = Findings::parse("Looks consistent to me");
        assert!(!findings.conflicts_found);
        assert_eq!(findings.validation_gaps[0].gap, "Parse Error");
        assert_eq!(findings.validation_gaps[0].what_cannot_be_verified, "Response parsing failed");
    }

    #[tokio::test]
    async fn test_goal_and_proposal_required() {
        let (_temp, ctx) = context(untouched());
        let err = ConsistencyCheckHandler
            .execute(json!({"proposal": PROPOSAL}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "goal is required");

        let err = ConsistencyCheckHandler
            .execute(json!({"goal": GOAL, "proposal": PROPOSAL, "maxOutputTokens": 100}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "maxOutputTokens must be at least 200");
    }

    #[tokio::test]
    async fn test_result_summary() {
        let reply = r#"{"conflicts_found": true, "conflicts": [{"element_a": "offline mode", "element_b": "in memory", "conflict_type": "goal_vs_proposal", "description": "Memory is lost on restart"}], "validation_gaps": [{"gap": "no test plan", "what_cannot_be_verified": "offline sync"}]}"#;
        let (_temp, ctx) = context(replying(reply));

        let result = ConsistencyCheckHandler
            .execute(json!({"goal": GOAL, "proposal": PROPOSAL}), &ctx)
            .await
            .unwrap();

        assert_eq!(result["conflicts_found"], true);
        assert_eq!(result["summary"]["total_conflicts"], 1);
        assert_eq!(result["summary"]["total_gaps"], 1);
        assert_eq!(result["summary"]["overall_consistency"], "major_issues");
        assert_eq!(result["metadata"]["tokenBudget"], 500);
        assert_eq!(result["metadata"]["modelUsed"], TEST_MODEL);
    }

    #[tokio::test]
    async fn test_prompt_sections_and_temperature() {
        let mut mock = MockModelClient::new();
        mock.expect_generate()
            .withf(|prompt, options| {
                prompt.starts_with(&format!("# Consistency Check Request\n\n## Goal\n{GOAL}\n\n## Constraints\nNo new servers\n\n## Current Proposal\n{PROPOSAL}\n\n## Acceptance Criteria\nWorks in airplane mode\n\n"))
                    && options.temperature == 0.2
                    && options.max_tokens == 1200
            })
            .times(1)
            .returning(|_, _| Ok("{}".to_string()));
        mock.expect_model().returning(|| TEST_MODEL.to_string());
        let (_temp, ctx) = context(mock);

        let result = ConsistencyCheckHandler
            .execute(
                json!({
                    "goal": GOAL,
                    "proposal": PROPOSAL,
                    "constraints": "No new servers",
                    "acceptanceCriteria": "Works in airplane mode",
                    "maxOutputTokens": 1200
                }),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(result["summary"]["overall_consistency"], "consistent");
    }

    #[tokio::test]
    async fn test_system_instruction_forbids_fixes() {
        let mut mock = MockModelClient::new();
        mock.expect_generate()
            .withf(|_, options| {
                options.system_instruction.as_deref().is_some_and(|system| {
                    system.starts_with("You are a **Consistency Check Power**")
                        && system.contains("You MUST NOT suggest how to resolve conflicts")
                        && system.contains("You MUST NOT say \"you should fix this by...\"")
                        && system.contains("You MUST NOT be creative")
                })
            })
            .times(1)
            .returning(|_, _| Ok("{}".to_string()));
        mock.expect_model().returning(|| TEST_MODEL.to_string());
        let (_temp, ctx) = context(mock);

        ConsistencyCheckHandler
            .execute(json!({"goal": GOAL, "proposal": PROPOSAL}), &ctx)
            .await
            .unwrap();
    }
}
