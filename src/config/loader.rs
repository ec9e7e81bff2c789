// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading from files.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::FileConfig;

/// Workspace config file names, searched in order.
pub const CONFIG_FILES: &[&str] = &[".gemini-mcp.json", ".gemini-mcp.yaml", ".gemini-mcp.yml"];

/// Global config directory name.
pub const GLOBAL_CONFIG_DIR: &str = ".gemini-mcp";

/// Global config file name.
pub const GLOBAL_CONFIG_FILE: &str = "config.json";

/// Get the global config file path.
pub fn get_global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILE))
}

/// Load global configuration from ~/.gemini-mcp/config.json.
pub fn load_global_config() -> Result<Option<FileConfig>, ConfigError> {
    match get_global_config_path() {
        Some(path) if path.exists() => load_config_file(&path).map(Some),
        _ => Ok(None),
    }
}

/// Load the first workspace config file found in `dir`.
pub fn load_workspace_config(dir: &Path) -> Result<Option<FileConfig>, ConfigError> {
    for filename in CONFIG_FILES {
        let path = dir.join(filename);
        if path.exists() {
            return load_config_file(&path).map(Some);
        }
    }
    Ok(None)
}

/// Load a configuration file. `.yaml`/`.yml` are parsed as YAML, anything else as JSON.
pub fn load_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
        _ => ConfigError::IoError(format!("{}: {}", path.display(), e)),
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(ConfigError::from),
        _ => serde_json::from_str(&content).map_err(ConfigError::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_workspace_json() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".gemini-mcp.json"),
            r#"{"model": "gemini-2.5-flash"}"#,
        )
        .unwrap();

        let config = load_workspace_config(temp.path()).unwrap().unwrap();
        assert_eq!(config.model.as_deref(), Some("gemini-2.5-flash"));
    }

    #[test]
    fn test_json_wins_over_yaml() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".gemini-mcp.json"), r#"{"maxRetries": 1}"#).unwrap();
        std::fs::write(temp.path().join(".gemini-mcp.yaml"), "maxRetries: 7\n").unwrap();

        let config = load_workspace_config(temp.path()).unwrap().unwrap();
        assert_eq!(config.max_retries, Some(1));
    }

    #[test]
    fn test_load_workspace_yml() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".gemini-mcp.yml"), "timeoutMs: 1234\n").unwrap();

        let config = load_workspace_config(temp.path()).unwrap().unwrap();
        assert_eq!(config.timeout_ms, Some(1234));
    }

    #[test]
    fn test_no_workspace_config() {
        let temp = TempDir::new().unwrap();
        assert!(load_workspace_config(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_json_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".gemini-mcp.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::JsonError(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let result = load_config_file(&temp.path().join("nope.json"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }
}
