// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `gemini_create_animation` tool: self-contained HTML animations.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::error::ToolError;
use crate::tools::extract::clean_code;
use crate::tools::registry::{ToolContext, ToolHandler};
use crate::tools::to_output;
use crate::tools::validation::{bool_or, enum_or, enums, number, number_or, required_string};
use crate::types::{GenerateOptions, InputSchema, ToolDefinition};

const ANIMATION_SYSTEM_PROMPT: &str = "You are a creative coding expert specializing in interactive animations.

Your expertise:
- CSS animations and transitions (keyframes, timing functions)
- Canvas 2D API (particles, effects, games)
- WebGL and shaders (3D graphics, visual effects)
- Three.js (3D scenes, materials, lighting)
- Animation principles (easing, timing, motion design)

Creation guidelines:
1. Performance:
   - Use requestAnimationFrame for smooth 60fps
   - Optimize rendering (only draw what changes)
   - Use hardware acceleration when possible
   - Implement proper cleanup (event listeners, timers)

2. Interactivity:
   - Respond to mouse/touch events
   - Add keyboard controls when relevant
   - Provide smooth, natural interactions
   - Handle edge cases (window resize, visibility)

3. Code quality:
   - Well-structured and modular
   - Configurable parameters
   - Clear comments explaining logic
   - Self-contained (minimal dependencies)

4. Visual quality:
   - Smooth, polished animations
   - Appropriate easing functions
   - Consistent style and feel
   - Attention to detail

Output format:
- Complete, working code
- Embedded in HTML with inline scripts
- Includes all necessary setup and initialization
- Ready to copy-paste and run";

const THREEJS_CDN: &str = "https://cdn.jsdelivr.net/npm/three@latest/build/three.module.js";

/// Handler for the `gemini_create_animation` tool.
pub struct CreateAnimationHandler;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Dimensions {
    width: f64,
    height: f64,
}

#[derive(Debug, Serialize)]
struct AnimationResult {
    code: String,
    technology: String,
    preview: String,
    dependencies: Vec<String>,
    usage: String,
}

fn dimensions(input: &Value) -> Result<Option<Dimensions>, ToolError> {
    let value = match input.get("dimensions") {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };
    if !value.is_object() {
        return Err(ToolError::validation("dimensions must be an object"));
    }
    let field = |name: &str| {
        let full = format!("dimensions.{name}");
        value
            .get(name)
            .ok_or_else(|| ToolError::validation(format!("{full} is required")))
            .and_then(|v| number(v, &full, Some(1.0), None))
    };
    Ok(Some(Dimensions {
        width: field("width")?,
        height: field("height")?,
    }))
}

fn build_prompt(
    description: &str,
    technology: &str,
    interactive: bool,
    fps: f64,
    dimensions: Option<Dimensions>,
) -> String {
    let mut prompt = format!(
        "Create an interactive animation using {technology} based on this description:\n\n{description}\n\n"
    );

    prompt.push_str("Requirements:\n");
    prompt.push_str(&format!("- Technology: {technology}\n"));
    prompt.push_str(&format!(
        "- Interactive: {}\n",
        if interactive { "Yes (respond to mouse/touch)" } else { "No" }
    ));
    prompt.push_str(&format!("- Target FPS: {fps}\n"));
    if let Some(Dimensions { width, height }) = dimensions {
        prompt.push_str(&format!("- Canvas Size: {width}x{height}px\n"));
    }
    prompt.push('\n');

    match technology {
        "css" => prompt.push_str("Provide a complete HTML file with CSS animations using keyframes.\n"),
        "webgl" => prompt.push_str("Provide a complete HTML file with WebGL shader animation.\n"),
        "threejs" => {
            prompt.push_str("Provide a complete HTML file with Three.js 3D animation.\n");
            prompt.push_str(&format!("Include Three.js from CDN: {THREEJS_CDN}\n"));
        }
        _ => prompt.push_str("Provide a complete HTML file with Canvas 2D animation.\n"),
    }

    prompt.push_str("\nReturn ONLY the complete HTML code, no explanations.");
    prompt
}

/// Libraries the generated code pulls in.
fn dependencies(code: &str, technology: &str) -> Vec<String> {
    let mut deps = Vec::new();
    if technology == "threejs" {
        deps.push("three.js (from CDN)".to_string());
    }
    if code.contains("gsap") {
        deps.push("GSAP".to_string());
    }
    if code.contains("anime.js") || code.contains("anime(") {
        deps.push("anime.js".to_string());
    }
    deps
}

#[async_trait]
impl ToolHandler for CreateAnimationHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "gemini_create_animation",
            "Create interactive animations using CSS, Canvas, WebGL, or Three.js. Generates production-ready animation code with smooth 60fps performance.",
        )
        .with_schema(
            InputSchema::new()
                .with_property("description", json!({
                    "type": "string",
                    "description": "Description of the desired animation"
                }))
                .with_property("technology", json!({
                    "type": "string",
                    "enum": enums::ANIMATION_TECHNOLOGIES,
                    "description": "Animation technology (default: canvas)",
                    "default": "canvas"
                }))
                .with_property("interactive", json!({
                    "type": "boolean",
                    "description": "Make it interactive (mouse/touch) (default: true)",
                    "default": true
                }))
                .with_property("fps", json!({
                    "type": "number",
                    "minimum": 1,
                    "maximum": 120,
                    "description": "Target frames per second (default: 60)",
                    "default": 60
                }))
                .with_property("dimensions", json!({
                    "type": "object",
                    "properties": {
                        "width": {"type": "number"},
                        "height": {"type": "number"}
                    },
                    "description": "Optional: Canvas dimensions"
                }))
                .with_required(&["description"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, fields(technology)))]
    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let description = required_string(&input, "description", 10)?;
        let technology = enum_or(&input, "technology", enums::ANIMATION_TECHNOLOGIES, "canvas")?;
        let interactive = bool_or(&input, "interactive", true)?;
        let fps = number_or(&input, "fps", Some(1.0), Some(120.0), 60.0)?;
        let dimensions = dimensions(&input)?;

        #[cfg(feature = "telemetry")]
        tracing::Span::current().record("technology", technology);

        let prompt = build_prompt(&description, technology, interactive, fps, dimensions);
        let options = GenerateOptions::new(ANIMATION_SYSTEM_PROMPT, 0.8, 8192);
        let raw = ctx.client.generate(&prompt, &options).await?;

        let code = clean_code(&raw);
        let dependencies = dependencies(&code, technology);

        #[cfg(feature = "telemetry")]
        debug!(chars = code.len(), deps = dependencies.len(), "Animation generated");

        let usage = format!(
            "Open this HTML file in a modern web browser to see the animation. {}",
            if interactive { "Use mouse/touch to interact." } else { "" }
        );

        to_output(&AnimationResult {
            preview: code.clone(),
            code,
            technology: technology.to_string(),
            dependencies,
            usage,
        })
    }
}
