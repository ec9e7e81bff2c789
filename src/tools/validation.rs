// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Parameter guards shared by every tool.
//!
//! Each guard fails with a [`ToolError::Validation`] whose message is
//! returned to the caller unchanged, so the wording here is part of the
//! protocol surface.

use serde_json::Value;

use crate::error::ToolError;

/// Allowed values for enumerations that several tools share.
pub mod enums {
    pub const FRAMEWORKS: &[&str] = &["vanilla", "react", "vue", "svelte"];
    pub const ANIMATION_TECHNOLOGIES: &[&str] = &["css", "canvas", "webgl", "threejs"];
    pub const UI_STYLES: &[&str] = &["modern", "minimal", "glassmorphism", "neumorphism"];
    pub const CONTENT_TYPES: &[&str] = &["code", "document", "data", "auto"];
    pub const ANALYSIS_TASKS: &[&str] = &["summarize", "review", "explain", "optimize", "debug"];
    pub const CODEBASE_FOCUS: &[&str] =
        &["architecture", "security", "performance", "dependencies", "patterns"];
    pub const BRAINSTORM_STYLES: &[&str] = &["innovative", "practical", "radical"];
    pub const FEASIBILITY_LEVELS: &[&str] = &["low", "medium", "high"];
    pub const SEVERITY_LEVELS: &[&str] = &["high", "medium", "low"];
}

fn is_blank(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null)) || value.and_then(Value::as_str) == Some("")
}

/// Render a value the way it appears in "Got: ..." messages.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Field must be present, non-null and not the empty string.
pub fn required<'a>(args: &'a Value, field: &str) -> Result<&'a Value, ToolError> {
    let value = args.get(field);
    if is_blank(value) {
        return Err(ToolError::validation(format!("{field} is required")));
    }
    value.ok_or_else(|| ToolError::validation(format!("{field} is required")))
}

/// Value must be a string of at least `min_len` characters.
pub fn string<'a>(value: &'a Value, field: &str, min_len: usize) -> Result<&'a str, ToolError> {
    let s = value
        .as_str()
        .ok_or_else(|| ToolError::validation(format!("{field} must be a string")))?;
    if s.chars().count() < min_len {
        return Err(ToolError::validation(format!(
            "{field} must be at least {min_len} characters long"
        )));
    }
    Ok(s)
}

/// Value must be a number within the closed range.
pub fn number(value: &Value, field: &str, min: Option<f64>, max: Option<f64>) -> Result<f64, ToolError> {
    let n = value
        .as_f64()
        .ok_or_else(|| ToolError::validation(format!("{field} must be a number")))?;
    if let Some(min) = min {
        if n < min {
            return Err(ToolError::validation(format!("{field} must be at least {min}")));
        }
    }
    if let Some(max) = max {
        if n > max {
            return Err(ToolError::validation(format!("{field} must be at most {max}")));
        }
    }
    Ok(n)
}

pub fn boolean(value: &Value, field: &str) -> Result<bool, ToolError> {
    value
        .as_bool()
        .ok_or_else(|| ToolError::validation(format!("{field} must be a boolean")))
}

/// Value must be one of `allowed`; the message lists every allowed value.
pub fn one_of<'a>(value: &Value, field: &str, allowed: &[&'a str]) -> Result<&'a str, ToolError> {
    value
        .as_str()
        .and_then(|s| allowed.iter().find(|a| **a == s).copied())
        .ok_or_else(|| {
            ToolError::validation(format!(
                "{field} must be one of: {}. Got: {}",
                allowed.join(", "),
                display(value)
            ))
        })
}

/// Value must be an array with at least `min_len` items.
pub fn array<'a>(value: &'a Value, field: &str, min_len: usize) -> Result<&'a [Value], ToolError> {
    let items = value
        .as_array()
        .ok_or_else(|| ToolError::validation(format!("{field} must be an array")))?;
    if items.len() < min_len {
        return Err(ToolError::validation(format!(
            "{field} must have at least {min_len} item(s)"
        )));
    }
    Ok(items)
}

// ============================================================================
// Argument accessors built on the guards above
// ============================================================================

/// Required string field.
pub fn required_string(args: &Value, field: &str, min_len: usize) -> Result<String, ToolError> {
    string(required(args, field)?, field, min_len).map(str::to_string)
}

/// Optional string field. Missing, null and empty values are treated as absent.
pub fn optional_string(args: &Value, field: &str, min_len: usize) -> Result<Option<String>, ToolError> {
    if is_blank(args.get(field)) {
        return Ok(None);
    }
    required_string(args, field, min_len).map(Some)
}

/// Optional number in range, falling back to `default`.
pub fn number_or(
    args: &Value,
    field: &str,
    min: Option<f64>,
    max: Option<f64>,
    default: f64,
) -> Result<f64, ToolError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => number(value, field, min, max),
    }
}

/// Optional boolean, falling back to `default`.
pub fn bool_or(args: &Value, field: &str, default: bool) -> Result<bool, ToolError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => boolean(value, field),
    }
}

/// Optional enumeration, falling back to `default`.
pub fn enum_or<'a>(
    args: &Value,
    field: &str,
    allowed: &[&'a str],
    default: &'a str,
) -> Result<&'a str, ToolError> {
    if is_blank(args.get(field)) {
        return Ok(default);
    }
    one_of(&args[field], field, allowed)
}

/// Optional array of strings. Non-string items are dropped.
pub fn string_list(args: &Value, field: &str, min_len: usize) -> Result<Option<Vec<String>>, ToolError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => {
            let items = array(value, field, min_len)?;
            Ok(Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(err: ToolError) -> String {
        err.to_string()
    }

    #[test]
    fn test_required() {
        let args = json!({"a": "x", "b": "", "c": null, "d": 0});
        assert!(required(&args, "a").is_ok());
        assert!(required(&args, "d").is_ok());
        assert_eq!(message(required(&args, "b").unwrap_err()), "b is required");
        assert_eq!(message(required(&args, "c").unwrap_err()), "c is required");
        assert_eq!(message(required(&args, "zzz").unwrap_err()), "zzz is required");
    }

    #[test]
    fn test_string_length() {
        assert_eq!(string(&json!("hello"), "topic", 5).unwrap(), "hello");
        assert_eq!(
            message(string(&json!("hey"), "topic", 5).unwrap_err()),
            "topic must be at least 5 characters long"
        );
        assert_eq!(
            message(string(&json!(42), "topic", 1).unwrap_err()),
            "topic must be a string"
        );
    }

    #[test]
    fn test_number_range() {
        assert_eq!(number(&json!(60), "fps", Some(1.0), Some(120.0)).unwrap(), 60.0);
        assert_eq!(
            message(number(&json!(0), "fps", Some(1.0), Some(120.0)).unwrap_err()),
            "fps must be at least 1"
        );
        assert_eq!(
            message(number(&json!(121), "fps", Some(1.0), Some(120.0)).unwrap_err()),
            "fps must be at most 120"
        );
        assert_eq!(
            message(number(&json!("60"), "fps", None, None).unwrap_err()),
            "fps must be a number"
        );
    }

    #[test]
    fn test_one_of() {
        assert_eq!(one_of(&json!("vue"), "framework", enums::FRAMEWORKS).unwrap(), "vue");
        assert_eq!(
            message(one_of(&json!("angular"), "framework", enums::FRAMEWORKS).unwrap_err()),
            "framework must be one of: vanilla, react, vue, svelte. Got: angular"
        );
        assert_eq!(
            message(one_of(&json!(3), "style", enums::UI_STYLES).unwrap_err()),
            "style must be one of: modern, minimal, glassmorphism, neumorphism. Got: 3"
        );
    }

    #[test]
    fn test_array() {
        assert_eq!(array(&json!(["a"]), "images", 1).unwrap().len(), 1);
        assert_eq!(
            message(array(&json!([]), "images", 1).unwrap_err()),
            "images must have at least 1 item(s)"
        );
        assert_eq!(
            message(array(&json!("a.png"), "images", 1).unwrap_err()),
            "images must be an array"
        );
    }

    #[test]
    fn test_accessors() {
        let args = json!({"name": "", "count": 3, "flag": false, "style": "radical", "list": ["a", 1, "b"]});
        assert_eq!(optional_string(&args, "name", 5).unwrap(), None);
        assert_eq!(number_or(&args, "count", Some(1.0), Some(20.0), 5.0).unwrap(), 3.0);
        assert_eq!(number_or(&args, "missing", None, None, 5.0).unwrap(), 5.0);
        assert!(!bool_or(&args, "flag", true).unwrap());
        assert!(bool_or(&args, "other", true).unwrap());
        assert_eq!(
            enum_or(&args, "style", enums::BRAINSTORM_STYLES, "innovative").unwrap(),
            "radical"
        );
        assert_eq!(
            enum_or(&args, "nope", enums::BRAINSTORM_STYLES, "innovative").unwrap(),
            "innovative"
        );
        assert_eq!(string_list(&args, "list", 1).unwrap().unwrap(), vec!["a", "b"]);
        assert_eq!(string_list(&args, "absent", 1).unwrap(), None);
    }
}
