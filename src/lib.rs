// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Gemini MCP server.
//!
//! Exposes Gemini-backed tools (UI generation, screenshot-driven fixes,
//! codebase analysis, brainstorming, grounded search and a set of review
//! tools) over the Model Context Protocol: JSON-RPC 2.0, one message per
//! line on stdio.
//!
//! # Architecture
//!
//! - [`protocol`] - JSON-RPC envelopes, the [`protocol::Session`] state and the request loop
//! - [`tools`] - Tool handlers, argument validation, reply extraction, file ingestion
//! - [`providers`] - The [`providers::ModelClient`] seam and the Gemini REST client
//! - [`config`] - Configuration layering (files, environment, CLI)
//! - [`error`] - Error types and JSON-RPC error codes
//! - [`telemetry`] - Tracing to stderr and in-process metrics
//! - [`types`] - Shared definitions (tool schemas, generation options)
//!
//! # Example
//!
//! ```rust,ignore
//! use gemini_mcp::config::{load_config, CliOptions};
//! use gemini_mcp::protocol::Session;
//! use gemini_mcp::providers::env_client_factory;
//! use gemini_mcp::tools::FileReader;
//!
//! let config = load_config(&std::env::current_dir()?, CliOptions::default())?;
//! let files = FileReader::new(&config.root)?;
//! let mut session = Session::with_defaults(env_client_factory(config), files);
//! session
//!     .serve(tokio::io::BufReader::new(tokio::io::stdin()), tokio::io::stdout())
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod providers;
pub mod telemetry;
pub mod tools;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ConfigError, ProviderError, Result, RpcError, ToolError};
pub use protocol::{Request, Response, Session};
pub use providers::{create_client, env_client_factory, ClientFactory, ModelClient, SharedClient};
pub use tools::{FileReader, ToolContext, ToolHandler, ToolRegistry};
pub use types::{GenerateOptions, InputSchema, SearchResponse, ThinkingLevel, ToolDefinition};

/// Server version reported in `initialize`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
