// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Precedence (highest to lowest):
//! 1. CLI options
//! 2. Environment variables
//! 3. Workspace config (`.gemini-mcp.json` or `--config`)
//! 4. Global config (`~/.gemini-mcp/config.json`)
//! 5. Default values

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::{FileConfig, ResolvedConfig};

/// Proxy variables, first one set wins.
pub const PROXY_ENV_VARS: &[&str] = &["HTTP_PROXY", "HTTPS_PROXY", "http_proxy", "https_proxy"];

/// CLI options that can override configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub model: Option<String>,
    pub root: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub base_url: Option<String>,
    pub proxy: Option<String>,
}

/// Settings taken from the environment. The API key is not among them; it
/// is only looked up when the first tool call builds the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub model: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub base_url: Option<String>,
    pub root: Option<PathBuf>,
    pub proxy: Option<String>,
}

impl EnvOverrides {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            model: get("GEMINI_MODEL"),
            timeout_ms: get("GEMINI_TIMEOUT_MS")
                .map(|v| parse_number("GEMINI_TIMEOUT_MS", &v))
                .transpose()?,
            max_retries: get("GEMINI_MAX_RETRIES")
                .map(|v| parse_number("GEMINI_MAX_RETRIES", &v))
                .transpose()?,
            base_url: get("GEMINI_BASE_URL"),
            root: get("GEMINI_MCP_ROOT").map(PathBuf::from),
            proxy: PROXY_ENV_VARS.iter().find_map(|key| get(key)),
        })
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("expected a non-negative integer, got \"{value}\""),
    })
}

/// Merge all layers. Relative roots are resolved against `cwd`.
pub fn merge_config(
    global: Option<FileConfig>,
    workspace: Option<FileConfig>,
    env: &EnvOverrides,
    cli: &CliOptions,
    cwd: &Path,
) -> Result<ResolvedConfig, ConfigError> {
    let mut result = ResolvedConfig {
        root: cwd.to_path_buf(),
        ..ResolvedConfig::default()
    };

    for config in [global, workspace].into_iter().flatten() {
        apply_file_config(&mut result, config);
    }

    apply_env(&mut result, env);
    apply_cli_options(&mut result, cli);

    if result.root.is_relative() {
        result.root = cwd.join(&result.root);
    }

    validate(&result)?;
    Ok(result)
}

fn apply_file_config(result: &mut ResolvedConfig, config: FileConfig) {
    if let Some(model) = config.model {
        result.model = model;
    }
    if let Some(timeout) = config.timeout_ms {
        result.timeout_ms = timeout;
    }
    if let Some(retries) = config.max_retries {
        result.max_retries = retries;
    }
    if let Some(delay) = config.retry_delay_ms {
        result.retry_delay_ms = delay;
    }
    if let Some(max) = config.max_image_bytes {
        result.max_image_bytes = max;
    }
    if let Some(url) = config.base_url {
        result.base_url = url;
    }
    if let Some(root) = config.root {
        result.root = root;
    }
    if config.proxy.is_some() {
        result.proxy = config.proxy;
    }
}

fn apply_env(result: &mut ResolvedConfig, env: &EnvOverrides) {
    if let Some(ref model) = env.model {
        result.model = model.clone();
    }
    if let Some(timeout) = env.timeout_ms {
        result.timeout_ms = timeout;
    }
    if let Some(retries) = env.max_retries {
        result.max_retries = retries;
    }
    if let Some(ref url) = env.base_url {
        result.base_url = url.clone();
    }
    if let Some(ref root) = env.root {
        result.root = root.clone();
    }
    if env.proxy.is_some() {
        result.proxy = env.proxy.clone();
    }
}

fn apply_cli_options(result: &mut ResolvedConfig, cli: &CliOptions) {
    if let Some(ref model) = cli.model {
        result.model = model.clone();
    }
    if let Some(timeout) = cli.timeout_ms {
        result.timeout_ms = timeout;
    }
    if let Some(retries) = cli.max_retries {
        result.max_retries = retries;
    }
    if let Some(ref url) = cli.base_url {
        result.base_url = url.clone();
    }
    if let Some(ref root) = cli.root {
        result.root = root.clone();
    }
    if cli.proxy.is_some() {
        result.proxy = cli.proxy.clone();
    }
}

fn validate(config: &ResolvedConfig) -> Result<(), ConfigError> {
    if config.model.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "model".to_string(),
            message: "must not be empty".to_string(),
        });
    }
    if config.timeout_ms == 0 {
        return Err(ConfigError::InvalidValue {
            field: "timeoutMs".to_string(),
            message: "must be greater than 0".to_string(),
        });
    }
    if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
        return Err(ConfigError::InvalidValue {
            field: "baseUrl".to_string(),
            message: format!("must be an http(s) URL, got \"{}\"", config.base_url),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> EnvOverrides {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvOverrides::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_defaults_use_cwd_as_root() {
        let config = merge_config(
            None,
            None,
            &EnvOverrides::default(),
            &CliOptions::default(),
            Path::new("/work"),
        )
        .unwrap();

        assert_eq!(config.root, PathBuf::from("/work"));
        assert_eq!(config.model, "gemini-3-pro-preview");
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_precedence() {
        let global = FileConfig {
            model: Some("global-model".to_string()),
            timeout_ms: Some(1000),
            max_retries: Some(9),
            ..Default::default()
        };
        let workspace = FileConfig {
            model: Some("workspace-model".to_string()),
            timeout_ms: Some(2000),
            ..Default::default()
        };
        let env = env_from(&[("GEMINI_MODEL", "env-model")]);
        let cli = CliOptions {
            timeout_ms: Some(3000),
            ..Default::default()
        };

        let config = merge_config(Some(global), Some(workspace), &env, &cli, Path::new("/w")).unwrap();

        assert_eq!(config.model, "env-model");
        assert_eq!(config.timeout_ms, 3000);
        assert_eq!(config.max_retries, 9);
    }

    #[test]
    fn test_relative_root_resolved_against_cwd() {
        let cli = CliOptions {
            root: Some(PathBuf::from("sub/dir")),
            ..Default::default()
        };
        let config =
            merge_config(None, None, &EnvOverrides::default(), &cli, Path::new("/base")).unwrap();
        assert_eq!(config.root, PathBuf::from("/base/sub/dir"));
    }

    #[test]
    fn test_proxy_env_order() {
        let env = env_from(&[
            ("https_proxy", "http://lower:1"),
            ("HTTPS_PROXY", "http://upper:2"),
        ]);
        assert_eq!(env.proxy.as_deref(), Some("http://upper:2"));

        let env = env_from(&[("http_proxy", "http://only:3")]);
        assert_eq!(env.proxy.as_deref(), Some("http://only:3"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let env = env_from(&[("GEMINI_MODEL", "  "), ("GEMINI_BASE_URL", "")]);
        assert_eq!(env, EnvOverrides::default());
    }

    #[test]
    fn test_invalid_numeric_env() {
        let result = EnvOverrides::from_lookup(|key| {
            (key == "GEMINI_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let cli = CliOptions {
            timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(merge_config(None, None, &EnvOverrides::default(), &cli, Path::new("/")).is_err());

        let cli = CliOptions {
            base_url: Some("ftp://example".to_string()),
            ..Default::default()
        };
        assert!(merge_config(None, None, &EnvOverrides::default(), &cli, Path::new("/")).is_err());
    }
}
