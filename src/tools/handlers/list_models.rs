// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `list_models` tool: the static model catalog. Never calls the model.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ToolError;
use crate::providers::models::catalog;
use crate::tools::registry::{ToolContext, ToolHandler};
use crate::tools::to_output;
use crate::types::{InputSchema, ToolDefinition};

/// Handler for the `list_models` tool.
pub struct ListModelsHandler;

#[async_trait]
impl ToolHandler for ListModelsHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "list_models",
            "List all available Gemini models with their capabilities, context windows, and use cases.",
        )
        .with_schema(InputSchema::new())
    }

    async fn execute(&self, _input: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        to_output(&catalog())
    }
}
