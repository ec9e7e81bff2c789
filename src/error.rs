// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the Gemini MCP server.
//!
//! Errors are classified once, where they happen: the model client returns a
//! typed [`ProviderError`], tool handlers return a [`ToolError`], and the
//! protocol layer turns either into an [`RpcError`] with a stable JSON-RPC code.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// JSON-RPC error codes
// ============================================================================

/// Stable JSON-RPC error codes. Never renumber these.
pub mod codes {
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const PARSE_ERROR: i32 = -32700;
    pub const API_ERROR: i32 = -32000;
    pub const TIMEOUT: i32 = -32001;
    pub const RATE_LIMIT: i32 = -32002;
    pub const MODEL_NOT_SUPPORTED: i32 = -32003;
}

// ============================================================================
// Provider errors
// ============================================================================

/// Errors returned by the model client.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// The backend gave up on its own deadline (HTTP 504 / `DEADLINE_EXCEEDED`).
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("Model not supported: {0}")]
    ModelNotSupported(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Response parsing error: {0}")]
    Parse(String),

    #[error("{0}")]
    NotConfigured(String),

    #[error("{0}")]
    UnsupportedImage(String),

    #[error("Image file not found: {0}")]
    ImageNotFound(String),

    #[error("Security validation failed: {0}")]
    ImageOutsideWorkspace(String),

    #[error("Failed to read image file \"{path}\": {message}")]
    ImageRead { path: String, message: String },

    #[error("Image \"{path}\" is {size} bytes, exceeding the {limit} byte limit")]
    ImageTooLarge { path: String, size: u64, limit: u64 },
}

impl ProviderError {
    /// Create an API error with status code.
    pub fn api(message: impl Into<String>, status_code: u16) -> Self {
        Self::Api {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create an API error without status code.
    pub fn api_message(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            status_code: None,
        }
    }

    /// Whether a retry might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_)
            | Self::Network(_)
            | Self::Timeout(_)
            | Self::DeadlineExceeded(_) => true,
            Self::Api {
                status_code: Some(code),
                ..
            } => *code >= 500,
            _ => false,
        }
    }

    /// Classify a failed HTTP response.
    ///
    /// `status` is the Google RPC status string from the error body
    /// (e.g. `RESOURCE_EXHAUSTED`) when the body could be parsed.
    pub fn from_status(status_code: u16, status: Option<&str>, message: String) -> Self {
        match (status_code, status) {
            (_, Some("UNAUTHENTICATED")) | (_, Some("PERMISSION_DENIED")) | (401, _) | (403, _) => {
                Self::Auth(message)
            }
            (_, Some("RESOURCE_EXHAUSTED")) | (429, _) => Self::RateLimited(message),
            (_, Some("NOT_FOUND")) | (404, _) => Self::ModelNotSupported(message),
            (_, Some("DEADLINE_EXCEEDED")) | (504, _) => Self::DeadlineExceeded(message),
            // Gemini reports a bad key as 400 INVALID_ARGUMENT.
            (400, _) if message.contains("API key") => Self::Auth(message),
            _ => Self::api(message, status_code),
        }
    }
}

// ============================================================================
// Tool errors
// ============================================================================

/// Errors raised while executing a tool.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Parameter validation failure. The message is shown to the caller verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("{0} is not yet implemented")]
    NotImplemented(String),

    #[error("Security validation failed: {0}")]
    SecurityViolation(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(String),

    /// Any other failure while running a tool, shown verbatim.
    #[error("{0}")]
    Execution(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ToolError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

// ============================================================================
// Configuration errors
// ============================================================================

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

// ============================================================================
// Protocol errors
// ============================================================================

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error() -> Self {
        Self::new(codes::PARSE_ERROR, "Invalid JSON-RPC request")
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_REQUEST, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn not_initialized() -> Self {
        Self::new(codes::INTERNAL_ERROR, "Server not initialized")
    }

    fn backend(code: i32, message: impl Into<String>, original: &str) -> Self {
        Self::new(code, message).with_data(json!({ "originalError": original }))
    }
}

impl From<&ProviderError> for RpcError {
    fn from(err: &ProviderError) -> Self {
        let original = redact_secrets(&err.to_string());
        match err {
            ProviderError::Auth(_) => Self::backend(
                codes::API_ERROR,
                "Invalid API key. Please check your GEMINI_API_KEY environment variable.",
                &original,
            ),
            ProviderError::RateLimited(_) => Self::backend(
                codes::RATE_LIMIT,
                "API quota exceeded or rate limit reached. Please try again later.",
                &original,
            ),
            ProviderError::Timeout(_) | ProviderError::DeadlineExceeded(_) => Self::backend(
                codes::TIMEOUT,
                "Request timeout. The operation took too long to complete.",
                &original,
            ),
            ProviderError::ModelNotSupported(_) => Self::backend(
                codes::MODEL_NOT_SUPPORTED,
                "The specified model is not supported or not available.",
                &original,
            ),
            ProviderError::NotConfigured(_) => Self::new(codes::API_ERROR, original),
            _ => Self::backend(codes::API_ERROR, original.clone(), &original),
        }
    }
}

impl From<&ToolError> for RpcError {
    fn from(err: &ToolError) -> Self {
        match err {
            ToolError::Validation(msg) => Self::new(codes::INVALID_PARAMS, msg.clone()),
            ToolError::NotFound(_) => Self::new(codes::METHOD_NOT_FOUND, err.to_string()),
            ToolError::NotImplemented(_) => Self::new(codes::INTERNAL_ERROR, err.to_string()),
            ToolError::Provider(inner) => Self::from(inner),
            _ => {
                let message = redact_secrets(&err.to_string());
                Self::backend(codes::API_ERROR, message.clone(), &message)
            }
        }
    }
}

static SECRET_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)apiKey\s*=\s*[^\s&]+").expect("static regex"),
        Regex::new(r"(?i)([?&]key=)[^\s&]+").expect("static regex"),
    ]
});

/// Mask API keys that leaked into an error message.
pub fn redact_secrets(message: &str) -> String {
    let masked = SECRET_PATTERNS[0].replace_all(message, "apiKey=***");
    SECRET_PATTERNS[1]
        .replace_all(&masked, "${1}***")
        .into_owned()
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_retryable() {
        assert!(ProviderError::RateLimited("slow down".to_string()).is_retryable());
        assert!(ProviderError::Network("reset".to_string()).is_retryable());
        assert!(ProviderError::Timeout(60000).is_retryable());
        assert!(ProviderError::api("boom", 503).is_retryable());
        assert!(!ProviderError::api("bad", 400).is_retryable());
        assert!(!ProviderError::Auth("invalid key".to_string()).is_retryable());
    }

    #[test]
    fn test_from_status_classification() {
        assert!(matches!(
            ProviderError::from_status(429, None, "x".into()),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            ProviderError::from_status(400, Some("RESOURCE_EXHAUSTED"), "quota".into()),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            ProviderError::from_status(400, Some("INVALID_ARGUMENT"), "API key not valid".into()),
            ProviderError::Auth(_)
        ));
        assert!(matches!(
            ProviderError::from_status(404, None, "models/foo".into()),
            ProviderError::ModelNotSupported(_)
        ));
        assert!(matches!(
            ProviderError::from_status(500, Some("INTERNAL"), "oops".into()),
            ProviderError::Api { status_code: Some(500), .. }
        ));
    }

    #[test]
    fn test_deadline_keeps_backend_message() {
        let err = ProviderError::from_status(504, None, "Deadline expired before operation could complete.".into());
        assert_eq!(err.to_string(), "Deadline exceeded: Deadline expired before operation could complete.");
        assert!(err.is_retryable());

        let err = ProviderError::from_status(400, Some("DEADLINE_EXCEEDED"), "took too long".into());
        assert!(matches!(err, ProviderError::DeadlineExceeded(ref m) if m == "took too long"));

        let rpc = RpcError::from(&err);
        assert_eq!(rpc.code, codes::TIMEOUT);
        assert_eq!(rpc.data.unwrap()["originalError"], "Deadline exceeded: took too long");
        assert!(!rpc.message.contains("0ms"));
    }

    #[test]
    fn test_image_outside_workspace_message() {
        let err = ProviderError::ImageOutsideWorkspace("Path \"../a.png\" is outside the allowed workspace".into());
        assert_eq!(
            err.to_string(),
            "Security validation failed: Path \"../a.png\" is outside the allowed workspace"
        );
        assert_eq!(RpcError::from(&err).code, codes::API_ERROR);
    }

    #[test]
    fn test_rpc_error_codes_for_provider_errors() {
        let rate = RpcError::from(&ProviderError::RateLimited("quota".into()));
        assert_eq!(rate.code, codes::RATE_LIMIT);
        assert!(rate.data.is_some());

        let timeout = RpcError::from(&ProviderError::Timeout(1000));
        assert_eq!(timeout.code, codes::TIMEOUT);

        let model = RpcError::from(&ProviderError::ModelNotSupported("gemini-x".into()));
        assert_eq!(model.code, codes::MODEL_NOT_SUPPORTED);

        let auth = RpcError::from(&ProviderError::Auth("bad".into()));
        assert_eq!(auth.code, codes::API_ERROR);
        assert!(auth.message.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_rpc_error_codes_for_tool_errors() {
        let invalid = RpcError::from(&ToolError::validation("topic is required"));
        assert_eq!(invalid.code, codes::INVALID_PARAMS);
        assert_eq!(invalid.message, "topic is required");
        assert!(invalid.data.is_none());

        let missing = RpcError::from(&ToolError::NotFound("nope".into()));
        assert_eq!(missing.code, codes::METHOD_NOT_FOUND);
        assert_eq!(missing.message, "Unknown tool: nope");

        let todo = RpcError::from(&ToolError::NotImplemented("streaming".into()));
        assert_eq!(todo.code, codes::INTERNAL_ERROR);

        let security = RpcError::from(&ToolError::SecurityViolation("outside root".into()));
        assert_eq!(security.code, codes::API_ERROR);
        assert!(security.message.starts_with("Security validation failed"));
    }

    #[test]
    fn test_redact_secrets() {
        assert_eq!(
            redact_secrets("request failed apiKey=AIza123 status 400"),
            "request failed apiKey=*** status 400"
        );
        assert_eq!(
            redact_secrets("GET https://host/v1?key=AIza123&alt=json"),
            "GET https://host/v1?key=***&alt=json"
        );
    }

    #[test]
    fn test_tool_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let tool_err: ToolError = io_err.into();
        assert!(matches!(tool_err, ToolError::FileNotFound(_)));
    }

    #[test]
    fn test_config_error_from_json() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("nope");
        let config_err: ConfigError = result.unwrap_err().into();
        assert!(matches!(config_err, ConfigError::JsonError(_)));
    }
}
