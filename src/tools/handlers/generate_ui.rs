// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `gemini_generate_ui` tool: UI components from a description or a design image.
//!
//! The target tech stack comes from an explicit `techContext`, from the
//! dependencies of a `package.json` named by `configPath`, or both. Explicit
//! fields win over detected ones.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};
use tracing::warn;

use crate::error::ToolError;
use crate::tools::extract::clean_code;
use crate::tools::registry::{ToolContext, ToolHandler};
use crate::tools::to_output;
use crate::tools::validation::{bool_or, boolean, enum_or, enums, one_of, optional_string, required_string};
use crate::types::{GenerateOptions, InputSchema, ToolDefinition};

const UI_GENERATION_SYSTEM_PROMPT: &str = "You are an expert frontend developer specializing in UI/UX implementation.

Your strengths:
- Converting design mockups into pixel-perfect HTML/CSS/JavaScript
- Creating smooth animations and transitions
- Writing clean, semantic, accessible HTML
- Implementing responsive layouts (mobile-first approach)
- Adding interactive JavaScript with modern ES6+ syntax

Output requirements:
1. Return ONLY complete, working code
2. For vanilla HTML:
   - Use inline <style> tags with organized CSS
   - Use inline <script> tags with modern JavaScript
   - Include all necessary HTML structure
3. For React/Vue/Svelte:
   - Return component code with all imports
   - Use modern hooks/composition API
   - Include prop types and documentation
4. Make it production-ready:
   - Semantic HTML5 elements
   - Accessible (ARIA labels, keyboard navigation)
   - Responsive (mobile, tablet, desktop)
   - Smooth animations (CSS transitions/keyframes)
5. Code quality:
   - No explanations unless explicitly asked
   - Well-organized and commented
   - Follow best practices and conventions

When given a design image:
- Match colors, spacing, typography exactly
- Implement all visible hover states and interactions
- Ensure pixel-perfect accuracy
- Infer missing details intelligently

When given only description:
- Create a beautiful, modern design
- Use current design trends (2025)
- Choose appropriate color schemes
- Add delightful micro-interactions";

const CSS_FRAMEWORKS: &[&str] = &["tailwind", "bootstrap", "styled-components", "css-modules", "emotion"];
const UI_LIBRARIES: &[&str] = &["shadcn", "antd", "mui", "chakra", "radix"];
const STATE_MANAGEMENT: &[&str] = &["zustand", "redux", "jotai", "recoil"];

/// Handler for the `gemini_generate_ui` tool.
pub struct GenerateUiHandler;

/// Target stack for generated code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TechContext {
    css_framework: Option<String>,
    ui_library: Option<String>,
    typescript: Option<bool>,
    state_management: Option<String>,
}

impl TechContext {
    /// Validated `techContext` argument.
    fn from_input(input: &Value) -> Result<Option<Self>, ToolError> {
        let value = match input.get("techContext") {
            None | Some(Value::Null) => return Ok(None),
            Some(value) if value.is_object() => value,
            Some(_) => return Err(ToolError::validation("techContext must be an object")),
        };

        let pick = |key: &str, allowed: &[&str]| -> Result<Option<String>, ToolError> {
            match value.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(v) => one_of(v, &format!("techContext.{key}"), allowed).map(|s| Some(s.to_string())),
            }
        };

        Ok(Some(Self {
            css_framework: pick("cssFramework", CSS_FRAMEWORKS)?,
            ui_library: pick("uiLibrary", UI_LIBRARIES)?,
            typescript: match value.get("typescript") {
                None | Some(Value::Null) => None,
                Some(v) => Some(boolean(v, "techContext.typescript")?),
            },
            state_management: pick("stateManagement", STATE_MANAGEMENT)?,
        }))
    }

    /// Infer the stack from a parsed `package.json`.
    fn detect(package: &Value) -> Self {
        let deps: Vec<&str> = ["dependencies", "devDependencies", "peerDependencies"]
            .iter()
            .filter_map(|section| package.get(*section).and_then(Value::as_object))
            .flat_map(|map| map.keys().map(String::as_str))
            .collect();
        let has = |name: &str| deps.contains(&name);
        let has_prefix = |prefix: &str| deps.iter().any(|d| d.starts_with(prefix));

        let css_framework = if has("tailwindcss") {
            Some("tailwind")
        } else if has("bootstrap") || has("react-bootstrap") {
            Some("bootstrap")
        } else if has("styled-components") {
            Some("styled-components")
        } else if has("@emotion/react") || has("@emotion/styled") {
            Some("emotion")
        } else {
            None
        };

        let ui_library = if has("@mui/material") {
            Some("mui")
        } else if has("antd") {
            Some("antd")
        } else if has("@chakra-ui/react") {
            Some("chakra")
        } else if has_prefix("@radix-ui/") && has("class-variance-authority") {
            Some("shadcn")
        } else if has_prefix("@radix-ui/") {
            Some("radix")
        } else {
            None
        };

        let state_management = if has("zustand") {
            Some("zustand")
        } else if has("@reduxjs/toolkit") || has("redux") {
            Some("redux")
        } else if has("jotai") {
            Some("jotai")
        } else if has("recoil") {
            Some("recoil")
        } else {
            None
        };

        Self {
            css_framework: css_framework.map(str::to_string),
            ui_library: ui_library.map(str::to_string),
            typescript: has("typescript").then_some(true),
            state_management: state_management.map(str::to_string),
        }
    }

    /// `self` with any field set in `explicit` replaced.
    fn overridden_by(self, explicit: Self) -> Self {
        Self {
            css_framework: explicit.css_framework.or(self.css_framework),
            ui_library: explicit.ui_library.or(self.ui_library),
            typescript: explicit.typescript.or(self.typescript),
            state_management: explicit.state_management.or(self.state_management),
        }
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn typescript(&self) -> bool {
        self.typescript.unwrap_or(false)
    }

    fn render(&self) -> String {
        let mut block = String::from("Tech Stack:\n");
        if let Some(css) = &self.css_framework {
            block.push_str(&format!("- CSS Framework: {css}\n"));
        }
        if let Some(ui) = &self.ui_library {
            block.push_str(&format!("- UI Library: {ui}\n"));
        }
        if let Some(ts) = self.typescript {
            block.push_str(&format!(
                "- TypeScript: {}\n",
                if ts { "Yes (include full type definitions)" } else { "No" }
            ));
        }
        if let Some(state) = &self.state_management {
            block.push_str(&format!("- State Management: {state}\n"));
        }
        block
    }
}

#[derive(Debug, Serialize)]
struct GenerateUiResult {
    code: String,
    framework: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview: Option<String>,
}

struct PromptArgs<'a> {
    description: &'a str,
    framework: &'a str,
    style: Option<&'a str>,
    include_animation: bool,
    responsive: bool,
    tech: &'a TechContext,
}

fn build_prompt(args: &PromptArgs<'_>) -> String {
    let yes_no = |b: bool| if b { "Yes" } else { "No" };
    let framework = args.framework;

    let mut prompt = format!("Generate a {framework} UI component based on the following requirements:\n\n");
    prompt.push_str(&format!("Description: {}\n\n", args.description));

    if let Some(style) = args.style {
        prompt.push_str(&format!("Design Style: {style}\n"));
    }

    prompt.push_str(&format!("Framework: {framework}\n"));
    prompt.push_str(&format!("Include Animations: {}\n", yes_no(args.include_animation)));
    prompt.push_str(&format!("Responsive: {}\n\n", yes_no(args.responsive)));

    if !args.tech.is_empty() {
        prompt.push_str(&args.tech.render());
        prompt.push('\n');
    }

    if framework == "vanilla" {
        prompt.push_str("Please provide a complete HTML file with inline CSS and JavaScript.\n");
    } else {
        prompt.push_str(&format!(
            "Please provide a complete {framework} component with all necessary imports.\n"
        ));
    }

    prompt.push_str("Return ONLY the code, no explanations.");
    prompt
}

fn component_file_name(framework: &str, typescript: bool) -> String {
    let extension = match (framework, typescript) {
        ("react", true) => "tsx",
        ("react", false) => "jsx",
        ("vue", _) => "vue",
        ("svelte", _) => "svelte",
        (_, true) => "ts",
        _ => "js",
    };
    format!("Component.{extension}")
}

/// Read `configPath` and detect the stack. Unreadable or malformed files are
/// logged and ignored.
async fn detect_from_config(ctx: &ToolContext, path: &str) -> Result<TechContext, ToolError> {
    let file = match ctx.files.read_file(path).await {
        Ok(file) => file,
        Err(e @ ToolError::SecurityViolation(_)) => return Err(e),
        Err(e) => {
            warn!(path = %path, error = %e, "Could not read configPath, ignoring");
            return Ok(TechContext::default());
        }
    };

    match serde_json::from_str::<Value>(&file.content) {
        Ok(package) => Ok(TechContext::detect(&package)),
        Err(e) => {
            warn!(path = %path, error = %e, "configPath is not valid JSON, ignoring");
            Ok(TechContext::default())
        }
    }
}

#[async_trait]
impl ToolHandler for GenerateUiHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "gemini_generate_ui",
            "Generate HTML/CSS/JavaScript UI components from description or design image. Specializes in pixel-perfect implementations, responsive layouts, and smooth animations. Supports technology stack context for generating code that matches your project.",
        )
        .with_schema(
            InputSchema::new()
                .with_property("description", json!({
                    "type": "string",
                    "description": "Description of the UI component to generate"
                }))
                .with_property("designImage", json!({
                    "type": "string",
                    "description": "Optional: Design image as file path (e.g., ./images/design.png) or Base64 data URI. File paths will be automatically converted to Base64."
                }))
                .with_property("framework", json!({
                    "type": "string",
                    "enum": enums::FRAMEWORKS,
                    "description": "Target framework (default: vanilla)",
                    "default": "vanilla"
                }))
                .with_property("techContext", json!({
                    "type": "object",
                    "properties": {
                        "cssFramework": {
                            "type": "string",
                            "enum": CSS_FRAMEWORKS,
                            "description": "CSS framework to use for styling"
                        },
                        "uiLibrary": {
                            "type": "string",
                            "enum": UI_LIBRARIES,
                            "description": "UI component library to use"
                        },
                        "typescript": {
                            "type": "boolean",
                            "description": "Use TypeScript with full type definitions"
                        },
                        "stateManagement": {
                            "type": "string",
                            "enum": STATE_MANAGEMENT,
                            "description": "State management library if needed"
                        }
                    },
                    "description": "Technology stack context for generating code that matches your project"
                }))
                .with_property("configPath", json!({
                    "type": "string",
                    "description": "Path to package.json for auto-detecting tech stack. The tool will analyze dependencies to determine CSS framework, UI library, TypeScript usage, etc."
                }))
                .with_property("includeAnimation", json!({
                    "type": "boolean",
                    "description": "Include animations and transitions (default: true)",
                    "default": true
                }))
                .with_property("responsive", json!({
                    "type": "boolean",
                    "description": "Make the UI responsive (default: true)",
                    "default": true
                }))
                .with_property("style", json!({
                    "type": "string",
                    "enum": enums::UI_STYLES,
                    "description": "Optional: Design style preference"
                }))
                .with_required(&["description"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, fields(framework, multimodal)))]
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let description = required_string(&input, "description", 10)?;
        let design_image = optional_string(&input, "designImage", 1)?;
        let framework = enum_or(&input, "framework", enums::FRAMEWORKS, "vanilla")?;
        let style = match input.get("style") {
            None | Some(Value::Null) => None,
            Some(v) => Some(one_of(v, "style", enums::UI_STYLES)?),
        };
        let include_animation = bool_or(&input, "includeAnimation", true)?;
        let responsive = bool_or(&input, "responsive", true)?;
        let explicit = TechContext::from_input(&input)?;
        let config_path = optional_string(&input, "configPath", 1)?;

        #[cfg(feature = "telemetry")]
        {
            let span = tracing::Span::current();
            span.record("framework", framework);
            span.record("multimodal", design_image.is_some());
        }

        let detected = match &config_path {
            Some(path) => detect_from_config(ctx, path).await?,
            None => TechContext::default(),
        };
        let tech = detected.overridden_by(explicit.unwrap_or_default());

        #[cfg(feature = "telemetry")]
        debug!(tech = ?tech, "Resolved tech stack");

        let prompt = build_prompt(&PromptArgs {
            description: &description,
            framework,
            style,
            include_animation,
            responsive,
            tech: &tech,
        });
        let options = GenerateOptions::new(UI_GENERATION_SYSTEM_PROMPT, 0.7, 8192);

        let raw = match design_image {
            Some(image) => {
                ctx.client
                    .generate_multimodal(&prompt, std::slice::from_ref(&image), &options)
                    .await?
            }
            None => ctx.client.generate(&prompt, &options).await?,
        };
        let code = clean_code(&raw);

        let (files, preview) = if framework == "vanilla" {
            (None, Some(code.clone()))
        } else {
            let name = component_file_name(framework, tech.typescript());
            (Some(BTreeMap::from([(name, code.clone())])), None)
        };

        to_output(&GenerateUiResult {
            code,
            framework: framework.to_string(),
            files,
            preview,
        })
    }
}
