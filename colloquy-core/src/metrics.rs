//! Protocol metrics
//!
//! One [`RequestMetric`] per wire exchange, an append-only recorder shared
//! between the client and the adapter, and a pure aggregation computed after
//! the writers are done. The aggregate ships with evaluation results so
//! protocol overhead can be compared against local-agent baselines.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};

/// Rough token count for English text, ~4 characters per token.
///
/// Good enough for overhead accounting; swap in a real tokeniser if exact
/// counts ever matter.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.len() / 4) as u64
}

/// Performance measurements for one protocol exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetric {
    pub request_id: String,
    pub endpoint: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub latency_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl RequestMetric {
    /// Start a metric for a request; latency and outcome are filled in later.
    pub fn new(
        request_id: impl Into<String>,
        endpoint: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            endpoint: endpoint.into(),
            method: method.into(),
            status_code: None,
            latency_ms: 0.0,
            input_tokens: None,
            output_tokens: None,
            context_id: None,
            error: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.unwrap_or(0) + self.output_tokens.unwrap_or(0)
    }
}

/// Aggregate over a run's request metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedMetrics {
    pub total_requests: u64,
    pub total_tokens: u64,
    pub total_latency_ms: f64,
    pub avg_latency_ms: f64,
    pub error_count: u64,
}

impl AggregatedMetrics {
    /// Pure fold over a metric list.
    pub fn from_requests(metrics: &[RequestMetric]) -> Self {
        let total_requests = metrics.len() as u64;
        let total_tokens = metrics.iter().map(RequestMetric::total_tokens).sum();
        let total_latency_ms: f64 = metrics.iter().map(|m| m.latency_ms).sum();
        let avg_latency_ms = if total_requests > 0 {
            total_latency_ms / total_requests as f64
        } else {
            0.0
        };
        let error_count = metrics.iter().filter(|m| m.error.is_some()).count() as u64;

        Self {
            total_requests,
            total_tokens,
            total_latency_ms,
            avg_latency_ms,
            error_count,
        }
    }
}

/// Append-only metric log, cheap to clone and safe to write from any thread.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder {
    inner: Arc<Mutex<Vec<RequestMetric>>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<RequestMetric>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append one metric.
    pub fn record(&self, metric: RequestMetric) {
        self.entries().push(metric);
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<RequestMetric> {
        self.entries().clone()
    }

    /// Number of entries recorded so far.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Drop all recorded entries, e.g. between evaluation runs.
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Aggregate the current contents.
    pub fn aggregate(&self) -> AggregatedMetrics {
        AggregatedMetrics::from_requests(&self.entries())
    }

    /// JSON export for inclusion in evaluation results.
    pub fn export(&self, task_id: Option<&str>) -> Value {
        let entries = self.snapshot();
        let summary = AggregatedMetrics::from_requests(&entries);
        json!({
            "taskId": task_id,
            "agentType": "remote",
            "protocolMetrics": entries,
            "summary": summary,
        })
    }
}
