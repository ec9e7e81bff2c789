// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool handler implementations.
//!
//! One handler per tool in the catalog. Each validates its arguments before
//! touching the model, builds a deterministic prompt, and shapes the reply.

mod analyze_codebase;
mod analyze_content;
mod brainstorm;
mod consistency_check;
mod create_animation;
mod devils_advocate;
mod fix_ui;
mod generate_ui;
mod list_models;
mod multimodal_query;
mod research_advisor;
mod search;

pub use analyze_codebase::AnalyzeCodebaseHandler;
pub use analyze_content::{detect_content_type, AnalyzeContentHandler};
pub use brainstorm::BrainstormHandler;
pub use consistency_check::ConsistencyCheckHandler;
pub use create_animation::CreateAnimationHandler;
pub use devils_advocate::DevilsAdvocateHandler;
pub use fix_ui::FixUiHandler;
pub use generate_ui::GenerateUiHandler;
pub use list_models::ListModelsHandler;
pub use multimodal_query::MultimodalQueryHandler;
pub use research_advisor::ResearchAdvisorHandler;
pub use search::SearchHandler;
