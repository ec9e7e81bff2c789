// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Static catalog of supported Gemini models.

use serde::Serialize;

/// Description of one supported model.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub context_window: u32,
    pub output_limit: u32,
    pub features: &'static [&'static str],
    pub best_for: &'static [&'static str],
    pub thinking: bool,
    pub last_update: &'static str,
    pub is_default: bool,
}

const ALL_FEATURES: &[&str] = &[
    "thinking",
    "multimodal",
    "function_calling",
    "grounding",
    "system_instructions",
];

/// Supported models, default first.
pub const SUPPORTED_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gemini-3-pro-preview",
        name: "Gemini 3.0 Pro Preview",
        description: "Latest and most powerful model, #1 on WebDev Arena for UI generation",
        context_window: 1_048_576,
        output_limit: 65_536,
        features: ALL_FEATURES,
        best_for: &[
            "UI generation",
            "Frontend development",
            "Design to code",
            "Interactive animations",
            "Complex reasoning",
        ],
        thinking: true,
        last_update: "November 2025",
        is_default: true,
    },
    ModelInfo {
        id: "gemini-2.5-pro",
        name: "Gemini 2.5 Pro",
        description: "Stable production model with excellent coding capabilities",
        context_window: 1_048_576,
        output_limit: 65_536,
        features: ALL_FEATURES,
        best_for: &["General coding", "Large codebase analysis", "Fallback option"],
        thinking: true,
        last_update: "June 2025",
        is_default: false,
    },
    ModelInfo {
        id: "gemini-2.5-flash",
        name: "Gemini 2.5 Flash",
        description: "Fast and cost-effective model with best price/performance ratio",
        context_window: 1_048_576,
        output_limit: 65_536,
        features: ALL_FEATURES,
        best_for: &["High-frequency tasks", "Batch processing", "Cost optimization"],
        thinking: true,
        last_update: "June 2025",
        is_default: false,
    },
    ModelInfo {
        id: "gemini-2.5-flash-lite",
        name: "Gemini 2.5 Flash Lite",
        description: "Ultra-fast and most cost-efficient model for simple tasks",
        context_window: 1_048_576,
        output_limit: 65_536,
        features: &["thinking", "multimodal", "function_calling", "system_instructions"],
        best_for: &["Simple queries", "Quick prototypes", "Maximum cost savings"],
        thinking: true,
        last_update: "July 2025",
        is_default: false,
    },
];

/// Suggested model per kind of task.
#[derive(Debug, Clone, Serialize)]
pub struct ModelRecommendations {
    pub ui_generation: &'static str,
    pub animation: &'static str,
    pub multimodal: &'static str,
    pub codebase_analysis: &'static str,
    pub batch_processing: &'static str,
    pub simple_tasks: &'static str,
    pub fallback: &'static str,
}

pub const MODEL_RECOMMENDATIONS: ModelRecommendations = ModelRecommendations {
    ui_generation: "gemini-3-pro-preview",
    animation: "gemini-3-pro-preview",
    multimodal: "gemini-3-pro-preview",
    codebase_analysis: "gemini-2.5-pro",
    batch_processing: "gemini-2.5-flash",
    simple_tasks: "gemini-2.5-flash-lite",
    fallback: "gemini-2.5-pro",
};

pub fn default_model() -> &'static ModelInfo {
    &SUPPORTED_MODELS[0]
}

pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    SUPPORTED_MODELS.iter().find(|m| m.id == id)
}

pub fn is_model_supported(id: &str) -> bool {
    find_model(id).is_some()
}

/// The catalog as returned by `list_models`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelCatalog {
    pub models: &'static [ModelInfo],
    pub recommended: &'static str,
    pub recommendations: ModelRecommendations,
    pub total: usize,
}

pub fn catalog() -> ModelCatalog {
    ModelCatalog {
        models: SUPPORTED_MODELS,
        recommended: MODEL_RECOMMENDATIONS.ui_generation,
        recommendations: MODEL_RECOMMENDATIONS,
        total: SUPPORTED_MODELS.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_default() {
        assert_eq!(SUPPORTED_MODELS.iter().filter(|m| m.is_default).count(), 1);
        assert_eq!(default_model().id, "gemini-3-pro-preview");
    }

    #[test]
    fn test_lookup() {
        assert!(is_model_supported("gemini-2.5-flash"));
        assert!(!is_model_supported("gpt-4o"));
        assert!(!find_model("gemini-2.5-flash-lite").unwrap().features.contains(&"grounding"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(default_model()).unwrap();
        assert_eq!(json["contextWindow"], 1_048_576);
        assert_eq!(json["bestFor"][0], "UI generation");
        assert_eq!(json["isDefault"], true);
    }

    #[test]
    fn test_catalog() {
        let json = serde_json::to_value(catalog()).unwrap();
        assert_eq!(json["total"], 4);
        assert_eq!(json["recommended"], "gemini-3-pro-preview");
        assert_eq!(json["recommendations"]["simple_tasks"], "gemini-2.5-flash-lite");
        assert_eq!(json["models"].as_array().unwrap().len(), 4);
    }
}
