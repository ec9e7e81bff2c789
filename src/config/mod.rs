// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration for the server.
//!
//! Handles loading and merging configuration from multiple sources:
//! - Global config: ~/.gemini-mcp/config.json
//! - Workspace config: .gemini-mcp.json, .gemini-mcp.yaml or .gemini-mcp.yml
//!   in the current directory, or an explicit `--config` file
//! - Environment: GEMINI_MODEL, GEMINI_TIMEOUT_MS, GEMINI_MAX_RETRIES,
//!   GEMINI_BASE_URL, GEMINI_MCP_ROOT and the usual proxy variables
//! - CLI options
//!
//! The Gemini API key is deliberately absent: it is read from
//! `GEMINI_API_KEY` when the first tool call needs a client.

mod loader;
mod merger;
mod types;

pub use loader::{
    get_global_config_path, load_config_file, load_global_config, load_workspace_config,
    CONFIG_FILES, GLOBAL_CONFIG_DIR, GLOBAL_CONFIG_FILE,
};
pub use merger::{merge_config, CliOptions, EnvOverrides, PROXY_ENV_VARS};
pub use types::{
    FileConfig, ResolvedConfig, DEFAULT_BASE_URL, DEFAULT_MAX_IMAGE_BYTES, DEFAULT_MAX_RETRIES,
    DEFAULT_MODEL, DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_MS,
};

use crate::error::ConfigError;
use std::path::Path;

/// Load and merge every configuration source.
pub fn load_config(cwd: &Path, cli: CliOptions) -> Result<ResolvedConfig, ConfigError> {
    let global = load_global_config()?;
    let workspace = match cli.config {
        Some(ref path) => Some(load_config_file(&cwd.join(path))?),
        None => load_workspace_config(cwd)?,
    };
    let env = EnvOverrides::from_env()?;

    merge_config(global, workspace, &env, &cli, cwd)
}
