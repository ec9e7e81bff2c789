// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `gemini_search` tool: answers grounded in Google Search results.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::error::ToolError;
use crate::tools::registry::{ToolContext, ToolHandler};
use crate::tools::to_output;
use crate::tools::validation::{enum_or, optional_string, required_string};
use crate::types::{GenerateOptions, GroundingMetadata, InputSchema, ThinkingLevel, ToolDefinition};

const SEARCH_SYSTEM_PROMPT: &str = "You are a helpful research assistant with access to Google Search.
When answering questions:
1. Use the search results to provide accurate, up-to-date information
2. Cite sources when possible
3. Be clear about what information comes from search results
4. If search results are insufficient, acknowledge limitations
5. Synthesize information from multiple sources when relevant";

/// Handler for the `gemini_search` tool.
pub struct SearchHandler;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    query: String,
    response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    grounding_metadata: Option<GroundingMetadata>,
    metadata: SearchMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchMetadata {
    model_used: String,
    thinking_level: ThinkingLevel,
}

fn build_prompt(query: &str, context: Option<&str>) -> String {
    match context {
        Some(context) => format!("Context: {context}\n\nQuestion: {query}"),
        None => query.to_string(),
    }
}

#[async_trait]
impl ToolHandler for SearchHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "gemini_search",
            "Search the web using Gemini's built-in Google Search grounding. Returns up-to-date information with source citations. Ideal for current events, latest documentation, real-time data, and fact-checking.",
        )
        .with_schema(
            InputSchema::new()
                .with_property("query", json!({
                    "type": "string",
                    "description": "Search query or question to answer using web search"
                }))
                .with_property("context", json!({
                    "type": "string",
                    "description": "Optional: Additional context to help refine the search"
                }))
                .with_property("thinkingLevel", json!({
                    "type": "string",
                    "enum": ThinkingLevel::VALUES,
                    "description": "Thinking depth for complex queries (default: HIGH)",
                    "default": "HIGH"
                }))
                .with_required(&["query"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, fields(query_len)))]
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let query = required_string(&input, "query", 2)?;
        let context = optional_string(&input, "context", 2)?;
        let thinking_level: ThinkingLevel = enum_or(&input, "thinkingLevel", &ThinkingLevel::VALUES, "HIGH")?
            .parse()
            .map_err(ToolError::validation)?;

        #[cfg(feature = "telemetry")]
        tracing::Span::current().record("query_len", query.len());

        let prompt = build_prompt(&query, context.as_deref());
        let options = GenerateOptions {
            system_instruction: Some(SEARCH_SYSTEM_PROMPT.to_string()),
            ..GenerateOptions::default()
        }
        .with_thinking(thinking_level);

        let response = ctx.client.search(&prompt, &options).await?;

        #[cfg(feature = "telemetry")]
        debug!(
            grounded = response.grounding.is_some(),
            chars = response.text.len(),
            "Search complete"
        );

        to_output(&SearchResult {
            query,
            response: response.text,
            grounding_metadata: response.grounding,
            metadata: SearchMetadata {
                model_used: ctx.model(),
                thinking_level,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockModelClient;
    use crate::tools::test_support::{context, untouched, TEST_MODEL};
    use crate::types::{SearchResponse, WebSource};

    #[test]
    fn test_build_prompt() {
        assert_eq!(build_prompt("rust 2024?", None), "rust 2024?");
        assert_eq!(
            build_prompt("latest?", Some("tokio")),
            "Context: tokio\n\nQuestion: latest?"
        );
    }

    #[tokio::test]
    async fn test_short_query_is_rejected_before_search() {
        let (_temp, ctx) = context(untouched());
        let err = SearchHandler
            .execute(json!({"query": "x"}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "query must be at least 2 characters long");
    }

    #[tokio::test]
    async fn test_bad_thinking_level() {
        let (_temp, ctx) = context(untouched());
        let err = SearchHandler
            .execute(json!({"query": "news", "thinkingLevel": "MAX"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[tokio::test]
    async fn test_search_result_shape() {
        let mut mock = MockModelClient::new();
        mock.expect_search()
            .withf(|prompt, options| {
                prompt == "Context: crates\n\nQuestion: latest serde"
                    && options.thinking_level == Some(ThinkingLevel::Low)
            })
            .times(1)
            .returning(|_, _| {
                Ok(SearchResponse {
                    text: "serde 1.0".to_string(),
                    grounding: Some(GroundingMetadata {
                        search_queries: Some(vec!["serde latest".to_string()]),
                        web_search_sources: Some(vec![WebSource {
                            title: Some("serde 1.0".to_string()),
                            uri: Some("https://crates.io/crates/serde".to_string()),
                        }]),
                    }),
                })
            });
        mock.expect_model().returning(|| TEST_MODEL.to_string());
        let (_temp, ctx) = context(mock);

        let result = SearchHandler
            .execute(
                json!({"query": "latest serde", "context": "crates", "thinkingLevel": "LOW"}),
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(result["response"], "serde 1.0");
        assert_eq!(result["groundingMetadata"]["searchQueries"][0], "serde latest");
        assert_eq!(
            result["groundingMetadata"]["webSearchSources"][0]["uri"],
            "https://crates.io/crates/serde"
        );
        assert_eq!(result["metadata"]["modelUsed"], TEST_MODEL);
        assert_eq!(result["metadata"]["thinkingLevel"], "LOW");
    }
}
