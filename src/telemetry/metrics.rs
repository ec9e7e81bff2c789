// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-process metrics for the server.
//!
//! Tracks tool calls, model round-trips, token usage and protocol errors.
//! Nothing is exported; a report is logged when the server shuts down.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

/// Global metrics instance.
pub static GLOBAL_METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Central metrics collection.
#[derive(Debug)]
pub struct Metrics {
    tools: RwLock<BTreeMap<String, ToolMetrics>>,
    operations: RwLock<BTreeMap<String, OperationMetrics>>,
    requests: RwLock<BTreeMap<String, u64>>,
    rpc_errors: RwLock<BTreeMap<i32, u64>>,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(BTreeMap::new()),
            operations: RwLock::new(BTreeMap::new()),
            requests: RwLock::new(BTreeMap::new()),
            rpc_errors: RwLock::new(BTreeMap::new()),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a tool execution.
    pub fn record_tool(&self, name: &str, duration: Duration, success: bool) {
        write(&self.tools)
            .entry(name.to_string())
            .or_default()
            .record(duration, success);
    }

    /// Record a timed operation such as a model round-trip.
    pub fn record_operation(&self, name: &str, duration: Duration) {
        write(&self.operations)
            .entry(name.to_string())
            .or_default()
            .record(duration);
    }

    /// Count an inbound request by method.
    pub fn record_request(&self, method: &str) {
        *write(&self.requests).entry(method.to_string()).or_insert(0) += 1;
    }

    /// Count an error response by code.
    pub fn record_rpc_error(&self, code: i32) {
        *write(&self.rpc_errors).entry(code).or_insert(0) += 1;
    }

    /// Record token usage reported by the backend.
    pub fn record_tokens(&self, input: u64, output: u64) {
        self.input_tokens.fetch_add(input, Ordering::Relaxed);
        self.output_tokens.fetch_add(output, Ordering::Relaxed);
    }

    pub fn tool_metrics(&self, name: &str) -> Option<ToolMetrics> {
        read(&self.tools).get(name).cloned()
    }

    pub fn token_counts(&self) -> (u64, u64) {
        (
            self.input_tokens.load(Ordering::Relaxed),
            self.output_tokens.load(Ordering::Relaxed),
        )
    }

    /// Take a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (input_tokens, output_tokens) = self.token_counts();
        MetricsSnapshot {
            tools: read(&self.tools).clone(),
            operations: read(&self.operations).clone(),
            requests: read(&self.requests).clone(),
            rpc_errors: read(&self.rpc_errors).clone(),
            input_tokens,
            output_tokens,
            uptime: self.start_time.elapsed(),
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        write(&self.tools).clear();
        write(&self.operations).clear();
        write(&self.requests).clear();
        write(&self.rpc_errors).clear();
        self.input_tokens.store(0, Ordering::Relaxed);
        self.output_tokens.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics for a single tool.
#[derive(Debug, Clone)]
pub struct ToolMetrics {
    pub invocations: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_duration: Duration,
    pub max_duration: Duration,
}

impl ToolMetrics {
    pub fn record(&mut self, duration: Duration, success: bool) {
        self.invocations += 1;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.total_duration += duration;
        self.max_duration = self.max_duration.max(duration);
    }

    pub fn avg_duration(&self) -> Duration {
        match u32::try_from(self.invocations) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_duration / n,
        }
    }

    /// Fraction of successful calls, 1.0 when never called.
    pub fn success_rate(&self) -> f64 {
        if self.invocations == 0 {
            1.0
        } else {
            self.successes as f64 / self.invocations as f64
        }
    }
}

impl Default for ToolMetrics {
    fn default() -> Self {
        Self {
            invocations: 0,
            successes: 0,
            failures: 0,
            total_duration: Duration::ZERO,
            max_duration: Duration::ZERO,
        }
    }
}

/// Latency metrics for a named operation.
#[derive(Debug, Clone, Default)]
pub struct OperationMetrics {
    pub count: u64,
    pub total_duration: Duration,
    pub histogram: Histogram,
}

impl OperationMetrics {
    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total_duration += duration;
        self.histogram.record(duration);
    }

    pub fn avg_duration(&self) -> Duration {
        match u32::try_from(self.count) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_duration / n,
        }
    }
}

/// Fixed-bucket latency histogram. Model calls take seconds, so buckets
/// run from 100ms to 2 minutes.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Upper bounds in milliseconds.
    buckets: Vec<u64>,
    counts: Vec<u64>,
}

impl Histogram {
    pub fn with_buckets(buckets: Vec<u64>) -> Self {
        let counts = vec![0; buckets.len() + 1];
        Self { buckets, counts }
    }

    pub fn record(&mut self, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let idx = self
            .buckets
            .iter()
            .position(|&b| millis <= b)
            .unwrap_or(self.buckets.len());
        self.counts[idx] += 1;
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Upper bucket bound containing the given percentile.
    pub fn percentile(&self, p: f64) -> Duration {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return Duration::ZERO;
        }

        let target = (total as f64 * p / 100.0).ceil() as u64;
        let mut cumulative = 0u64;
        for (i, &count) in self.counts.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                let millis = self
                    .buckets
                    .get(i)
                    .copied()
                    .unwrap_or_else(|| self.buckets.last().copied().unwrap_or(0) * 2);
                return Duration::from_millis(millis);
            }
        }
        Duration::ZERO
    }

    pub fn p50(&self) -> Duration {
        self.percentile(50.0)
    }

    pub fn p99(&self) -> Duration {
        self.percentile(99.0)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::with_buckets(vec![100, 500, 1_000, 5_000, 15_000, 30_000, 60_000, 120_000])
    }
}

/// A point-in-time copy of all metrics.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub tools: BTreeMap<String, ToolMetrics>,
    pub operations: BTreeMap<String, OperationMetrics>,
    pub requests: BTreeMap<String, u64>,
    pub rpc_errors: BTreeMap<i32, u64>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Human-readable report for the shutdown log.
    pub fn format_report(&self) -> String {
        let mut report = format!(
            "Metrics after {:.1?}: {} input tokens, {} output tokens\n",
            self.uptime, self.input_tokens, self.output_tokens
        );

        for (method, count) in &self.requests {
            report.push_str(&format!("  request {method}: {count}\n"));
        }
        for (code, count) in &self.rpc_errors {
            report.push_str(&format!("  error {code}: {count}\n"));
        }
        for (name, m) in &self.tools {
            report.push_str(&format!(
                "  tool {}: {} calls, {:.1}% success, avg {:.2?}, max {:.2?}\n",
                name,
                m.invocations,
                m.success_rate() * 100.0,
                m.avg_duration(),
                m.max_duration
            ));
        }
        for (name, m) in &self.operations {
            report.push_str(&format!(
                "  op {}: {} calls, avg {:.2?}, p50 {:.2?}, p99 {:.2?}\n",
                name,
                m.count,
                m.avg_duration(),
                m.histogram.p50(),
                m.histogram.p99()
            ));
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_metrics() {
        let mut metrics = ToolMetrics::default();
        metrics.record(Duration::from_millis(100), true);
        metrics.record(Duration::from_millis(200), true);
        metrics.record(Duration::from_millis(60), false);

        assert_eq!(metrics.invocations, 3);
        assert_eq!(metrics.failures, 1);
        assert_eq!(metrics.max_duration, Duration::from_millis(200));
        assert!((metrics.success_rate() - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_histogram_buckets() {
        let mut hist = Histogram::default();
        hist.record(Duration::from_millis(50));
        hist.record(Duration::from_millis(700));
        hist.record(Duration::from_secs(200));

        assert_eq!(hist.counts()[0], 1);
        assert_eq!(hist.counts()[2], 1);
        assert_eq!(*hist.counts().last().unwrap(), 1);
    }

    #[test]
    fn test_histogram_percentiles() {
        let mut hist = Histogram::default();
        for _ in 0..100 {
            hist.record(Duration::from_millis(2_000));
        }
        assert_eq!(hist.p50(), Duration::from_millis(5_000));
        assert_eq!(hist.p99(), Duration::from_millis(5_000));
    }

    #[test]
    fn test_snapshot_and_reset() {
        let metrics = Metrics::new();
        metrics.record_tool("gemini_brainstorm", Duration::from_millis(10), true);
        metrics.record_request("tools/call");
        metrics.record_rpc_error(-32602);
        metrics.record_tokens(1000, 500);

        let snapshot = metrics.snapshot();
        assert!(snapshot.tools.contains_key("gemini_brainstorm"));
        assert_eq!(snapshot.requests["tools/call"], 1);
        assert_eq!(snapshot.rpc_errors[&-32602], 1);
        assert!(snapshot.format_report().contains("1000 input tokens"));

        metrics.reset();
        assert!(metrics.tool_metrics("gemini_brainstorm").is_none());
        assert_eq!(metrics.token_counts(), (0, 0));
    }
}
