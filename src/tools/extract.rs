// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bounded extraction of structured data from model replies.
//!
//! Models are asked for JSON but often wrap it in a fenced block or
//! surround it with prose. [`parse_object`] finds the payload; the field
//! helpers then read it defensively: strings default to `""`, categorical
//! fields fall back to a fixed default when the value is not one of the
//! allowed values, and lists are truncated to a cap in their original order.
//!
//! Nothing here fails. A handler that gets `None` from [`parse_object`]
//! builds its own degraded result.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("static regex"));

static ANY_FENCE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[a-z]*\n").expect("static regex"));

static ANY_FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\n?").expect("static regex"));

static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[\s\S]*?```").expect("static regex"));

/// Contents of the first fenced block (optionally tagged `json`), trimmed.
pub fn fenced_payload(text: &str) -> Option<&str> {
    JSON_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Parse the JSON payload of a reply: the fenced block if there is one,
/// otherwise the whole text.
pub fn parse_json(text: &str) -> Option<Value> {
    let payload = fenced_payload(text).unwrap_or_else(|| text.trim());
    serde_json::from_str(payload).ok()
}

/// Like [`parse_json`] but only accepts a JSON object.
pub fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match parse_json(text)? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Strip Markdown code fences from generated code.
pub fn clean_code(code: &str) -> String {
    let without_open = ANY_FENCE_OPEN.replace_all(code, "");
    ANY_FENCE_CLOSE
        .replace_all(&without_open, "")
        .trim()
        .to_string()
}

/// Every fenced block in `text`, each cleaned, joined by blank lines.
/// Falls back to the whole text when there are none.
pub fn code_blocks_or_text(text: &str) -> String {
    let blocks: Vec<String> = CODE_BLOCK
        .find_iter(text)
        .map(|m| clean_code(m.as_str()))
        .collect();

    if blocks.is_empty() {
        text.to_string()
    } else {
        blocks.join("\n\n")
    }
}

// ============================================================================
// Field readers
// ============================================================================

/// String field, `""` when missing or not a string.
pub fn text(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// String field, `None` when missing, empty or not a string.
pub fn opt_text(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Categorical field coerced into `allowed`, else `default`.
pub fn choice(item: &Value, key: &str, allowed: &[&str], default: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .filter(|v| allowed.contains(v))
        .unwrap_or(default)
        .to_string()
}

/// At most `cap` items of an array field, each mapped through `normalize`.
pub fn list<T, F>(obj: &Map<String, Value>, key: &str, cap: usize, normalize: F) -> Vec<T>
where
    F: FnMut(&Value) -> T,
{
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().take(cap).map(normalize).collect())
        .unwrap_or_default()
}

/// At most `cap` string items. Non-string items are rendered as JSON text.
pub fn string_list(obj: &Map<String, Value>, key: &str, cap: usize) -> Vec<String> {
    list(obj, key, cap, |v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Shorten `text` to `max_chars` characters, appending `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_json_equals_bare_json() {
        let bare = r#"{"conflicts_found": true, "conflicts": [{"description": "x"}]}"#;
        let fenced = format!("Here you go:\n```json\n{bare}\n```\nThanks");

        assert_eq!(parse_json(&fenced), parse_json(bare));
        assert!(parse_json(bare).is_some());
    }

    #[test]
    fn test_untagged_fence() {
        let text = "```\n{\"a\": 1}\n```";
        assert_eq!(parse_json(text), Some(json!({"a": 1})));
    }

    #[test]
    fn test_non_json_is_none() {
        assert!(parse_json("I could not do that.").is_none());
        assert!(parse_object("[1, 2, 3]").is_none());
    }

    #[test]
    fn test_choice_coerces_unknown_values() {
        let item = json!({"severity": "catastrophic", "level": "low"});
        let allowed = ["high", "medium", "low"];
        assert_eq!(choice(&item, "severity", &allowed, "medium"), "medium");
        assert_eq!(choice(&item, "level", &allowed, "medium"), "low");
        assert_eq!(choice(&item, "missing", &allowed, "medium"), "medium");
    }

    #[test]
    fn test_list_caps_in_order() {
        let obj = parse_object(&json!({"items": (0..15).collect::<Vec<_>>()}).to_string()).unwrap();
        let items = list(&obj, "items", 10, |v| v.as_u64().unwrap());
        assert_eq!(items, (0..10).collect::<Vec<u64>>());
        assert!(list(&obj, "absent", 10, |v| v.clone()).is_empty());
    }

    #[test]
    fn test_string_list() {
        let obj = parse_object(r#"{"q": ["why?", 42, "how?"]}"#).unwrap();
        assert_eq!(string_list(&obj, "q", 8), vec!["why?", "42", "how?"]);
    }

    #[test]
    fn test_clean_code() {
        assert_eq!(clean_code("```html\n<div></div>\n```"), "<div></div>");
        assert_eq!(clean_code("  plain  "), "plain");
        assert_eq!(clean_code(&clean_code("```js\nx()\n```")), "x()");
    }

    #[test]
    fn test_code_blocks_or_text() {
        let text = "Fix:\n```css\na{}\n```\nand\n```js\nb()\n```";
        assert_eq!(code_blocks_or_text(text), "a{}\n\nb()");
        assert_eq!(code_blocks_or_text("no code"), "no code");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 200), "short");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("日本語テキスト", 3), "日本語...");
    }
}
