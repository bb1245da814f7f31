use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

/// How a single executor call ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestOutcome {
    Success,
    /// The service answered but reported an error; carries the error code.
    ApiError(String),
    /// No response was received.
    Transport,
}

#[derive(Debug, Clone)]
pub struct RequestMetrics {
    pub endpoint: String,
    pub method: String,
    pub status_code: Option<u16>,
    pub response_time: Duration,
    pub outcome: RequestOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub api_errors: u64,
    pub transport_errors: u64,
    pub last_request_time: Option<SystemTime>,
    pub errors_by_code: HashMap<String, u64>,
    pub requests_by_endpoint: HashMap<String, EndpointMetrics>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EndpointMetrics {
    pub request_count: u64,
    pub success_count: u64,
    pub total_response_time: Duration,
    pub max_response_time: Duration,
}

impl EndpointMetrics {
    fn update(&mut self, metrics: &RequestMetrics) {
        self.request_count += 1;
        self.total_response_time += metrics.response_time;
        self.max_response_time = self.max_response_time.max(metrics.response_time);
        if metrics.outcome == RequestOutcome::Success {
            self.success_count += 1;
        }
    }

    pub fn average_response_time(&self) -> Duration {
        if self.request_count == 0 {
            Duration::ZERO
        } else {
            self.total_response_time / self.request_count as u32
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.request_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.request_count as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<ApiMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_request(&self, request_metrics: RequestMetrics) {
        let mut metrics = self.metrics.write().await;

        metrics.total_requests += 1;
        metrics.last_request_time = Some(SystemTime::now());

        match &request_metrics.outcome {
            RequestOutcome::Success => metrics.successful_requests += 1,
            RequestOutcome::ApiError(code) => {
                metrics.api_errors += 1;
                *metrics.errors_by_code.entry(code.clone()).or_insert(0) += 1;
            }
            RequestOutcome::Transport => metrics.transport_errors += 1,
        }

        metrics
            .requests_by_endpoint
            .entry(request_metrics.endpoint.clone())
            .or_default()
            .update(&request_metrics);
    }

    pub async fn get_metrics(&self) -> ApiMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn get_endpoint_metrics(&self, endpoint: &str) -> Option<EndpointMetrics> {
        let metrics = self.metrics.read().await;
        metrics.requests_by_endpoint.get(endpoint).cloned()
    }

    pub async fn reset_metrics(&self) {
        let mut metrics = self.metrics.write().await;
        *metrics = ApiMetrics::default();
    }

    pub async fn export_metrics(&self) -> Result<String, serde_json::Error> {
        let metrics = self.get_metrics().await;
        serde_json::to_string_pretty(&metrics)
    }
}
