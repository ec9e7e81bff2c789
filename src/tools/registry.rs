// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool registry and handler trait.
//!
//! This module defines the core abstractions for the tool system:
//! - [`ToolHandler`] trait that all tools must implement
//! - [`ToolContext`] handed to every call (model client and file reader)
//! - [`ToolRegistry`] for listing tools in catalog order and dispatching calls

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "telemetry")]
use tracing::{debug, info_span, Instrument};

use crate::error::ToolError;
use crate::providers::SharedClient;
#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;
#[cfg(feature = "telemetry")]
use crate::tools::{truncate_text, TELEMETRY_PREVIEW_MAX_BYTES};
use crate::tools::files::FileReader;
use crate::types::ToolDefinition;

/// Everything a handler may touch while running.
#[derive(Clone)]
pub struct ToolContext {
    pub client: SharedClient,
    pub files: FileReader,
}

impl ToolContext {
    pub fn new(client: SharedClient, files: FileReader) -> Self {
        Self { client, files }
    }

    /// Model id the client will use for the next call.
    pub fn model(&self) -> String {
        self.client.model()
    }
}

/// Trait that all tool handlers must implement.
///
/// Each tool is a unit struct providing its definition and execution logic.
/// Handlers validate every argument before touching files or the model.
///
/// # Example
///
/// ```rust,ignore
/// use gemini_mcp::tools::{ToolContext, ToolHandler};
/// use gemini_mcp::types::ToolDefinition;
///
/// struct EchoTool;
///
/// #[async_trait]
/// impl ToolHandler for EchoTool {
///     fn definition(&self) -> ToolDefinition {
///         ToolDefinition::new("echo", "Echo the input back")
///     }
///
///     async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
///         Ok(input)
///     }
/// }
/// ```
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition (name, description, input schema).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given arguments.
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError>;
}

/// Registry of available tools. Keeps registration order for `tools/list`.
pub struct ToolRegistry {
    handlers: Vec<Arc<dyn ToolHandler>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create a registry with the full tool catalog.
    pub fn with_defaults() -> Self {
        use super::handlers::*;

        let mut builder = ToolRegistryBuilder::new();

        builder.register(GenerateUiHandler);
        builder.register(MultimodalQueryHandler);
        builder.register(FixUiHandler);
        builder.register(CreateAnimationHandler);
        builder.register(AnalyzeContentHandler);
        builder.register(AnalyzeCodebaseHandler);
        builder.register(BrainstormHandler);
        builder.register(SearchHandler);
        builder.register(ListModelsHandler);

        // Advisory and critique tools
        builder.register(ResearchAdvisorHandler);
        builder.register(DevilsAdvocateHandler);
        builder.register(ConsistencyCheckHandler);

        builder.build()
    }

    /// Get a handler by tool name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.index.get(name).map(|&i| Arc::clone(&self.handlers[i]))
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All tool definitions, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.handlers.iter().map(|h| h.definition()).collect()
    }

    /// All tool names, in registration order.
    pub fn tool_names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.definition().name).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch a tool call.
    ///
    /// Unknown names fail with [`ToolError::NotFound`] before any handler
    /// runs. When the `telemetry` feature is enabled the call is wrapped in a
    /// `tool_execute` span and recorded in the global metrics.
    pub async fn dispatch(
        &self,
        tool_name: &str,
        input: Value,
        ctx: &ToolContext,
    ) -> Result<DispatchResult, ToolError> {
        let handler = self
            .get(tool_name)
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;

        #[cfg(feature = "telemetry")]
        debug!(tool = %tool_name, "Executing tool");

        let start = Instant::now();

        #[cfg(feature = "telemetry")]
        let result = handler
            .execute(input, ctx)
            .instrument(info_span!("tool_execute", tool = %tool_name))
            .await;

        #[cfg(not(feature = "telemetry"))]
        let result = handler.execute(input, ctx).await;

        let duration = start.elapsed();

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_tool(tool_name, duration, result.is_ok());

        match result {
            Ok(output) => {
                #[cfg(feature = "telemetry")]
                debug!(
                    tool = %tool_name,
                    duration_ms = duration.as_secs_f64() * 1000.0,
                    preview = %truncate_text(&output.to_string(), TELEMETRY_PREVIEW_MAX_BYTES),
                    "Tool execution succeeded"
                );
                Ok(DispatchResult {
                    tool_name: tool_name.to_string(),
                    output,
                    duration,
                })
            }
            Err(err) => {
                #[cfg(feature = "telemetry")]
                debug!(
                    tool = %tool_name,
                    duration_ms = duration.as_secs_f64() * 1000.0,
                    error = %err,
                    "Tool execution failed"
                );
                Err(err)
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a successful tool call.
#[derive(Debug)]
pub struct DispatchResult {
    /// Name of the tool that was called
    pub tool_name: String,
    /// Structured result from the handler
    pub output: Value,
    /// Duration of execution
    pub duration: Duration,
}

impl DispatchResult {
    /// Text rendering used in the `content` block: strings verbatim,
    /// everything else as 2-space indented JSON.
    pub fn text(&self) -> String {
        match &self.output {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}

/// Builder for constructing a ToolRegistry.
pub struct ToolRegistryBuilder {
    handlers: Vec<Arc<dyn ToolHandler>>,
    index: HashMap<String, usize>,
}

impl ToolRegistryBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool handler.
    pub fn register<T: ToolHandler + 'static>(&mut self, handler: T) -> &mut Self {
        self.register_boxed(Arc::new(handler))
    }

    /// Register a shared handler. A later registration with the same name
    /// replaces the earlier one in place.
    pub fn register_boxed(&mut self, handler: Arc<dyn ToolHandler>) -> &mut Self {
        let name = handler.definition().name;
        match self.index.get(&name) {
            Some(&i) => self.handlers[i] = handler,
            None => {
                self.index.insert(name, self.handlers.len());
                self.handlers.push(handler);
            }
        }
        self
    }

    /// Build the final registry.
    pub fn build(self) -> ToolRegistry {
        ToolRegistry {
            handlers: self.handlers,
            index: self.index,
        }
    }
}

impl Default for ToolRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
