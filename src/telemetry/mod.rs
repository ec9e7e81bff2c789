// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tracing and metrics infrastructure.
//!
//! - **Tracing**: structured logs on stderr, one span per request and per tool call
//! - **Metrics**: counters and latency histograms kept in-process
//! - **Correlation IDs**: server-side ids attached to request spans
//!
//! # Usage
//!
//! ```rust,ignore
//! use gemini_mcp::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::default())?;
//! ```

mod correlation;
mod init;
pub mod metrics;

pub use correlation::CorrelationId;
pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
pub use metrics::{Metrics, MetricsSnapshot, GLOBAL_METRICS};
