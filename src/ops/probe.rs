//! Endpoint descriptors and the concurrent probe runner.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::{derive_metrics_status, summarize, MetricsLens, OpsError, StatusSummary};

/// Fixed per-request timeout for every probe and proxy call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(8000);

/// Descriptor id whose raw JSON body doubles as the metrics snapshot for
/// derived statuses.
pub const METRICS_PROBE_ID: &str = "admin-metrics";

/// Whether a descriptor issues its own request or reads the metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    Probe,
    Metrics,
}

/// Detail extraction applied to a probe response body.
#[derive(Debug, Clone, Copy)]
pub enum DetailExtractor {
    /// First few interesting fields of a JSON object.
    JsonHighlights,
    /// Leading lines of a newline-delimited text body.
    LogLines,
}

/// One endpoint check against the operations service.
#[derive(Debug, Clone)]
pub struct EndpointSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub method: Method,
    pub path: &'static str,
    pub mode: ProbeMode,
    pub expect_json: bool,
    pub requires_admin: bool,
    pub extractor: Option<DetailExtractor>,
    pub lens: MetricsLens,
}

impl EndpointSpec {
    fn probe(id: &'static str, label: &'static str, method: Method, path: &'static str) -> Self {
        Self {
            id,
            label,
            method,
            path,
            mode: ProbeMode::Probe,
            expect_json: true,
            requires_admin: false,
            extractor: None,
            lens: MetricsLens::RequestStats,
        }
    }

    fn metrics(id: &'static str, label: &'static str, method: Method, path: &'static str) -> Self {
        Self {
            mode: ProbeMode::Metrics,
            ..Self::probe(id, label, method, path)
        }
    }

    fn admin(mut self) -> Self {
        self.requires_admin = true;
        self
    }

    fn text(mut self, extractor: Option<DetailExtractor>) -> Self {
        self.expect_json = false;
        self.extractor = extractor;
        self
    }

    fn lens(mut self, lens: MetricsLens) -> Self {
        self.lens = lens;
        self
    }
}

/// A titled group of endpoint checks.
#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub items: Vec<EndpointSpec>,
}

/// The endpoint table probed by the mission-control route.
pub fn default_sections() -> Vec<SectionSpec> {
    vec![
        SectionSpec {
            id: "health",
            title: "Health & Probes",
            description: "Direct health checks consumed by uptime monitors and deep diagnostics.",
            items: vec![
                EndpointSpec::probe("health-alive", "Alive Probe", Method::GET, "/health"),
                EndpointSpec::probe("health-deep", "Composite Health", Method::GET, "/health/deep"),
                EndpointSpec::probe(
                    "admin-health-deep",
                    "Admin Deep Health",
                    Method::GET,
                    "/admin/api/health/deep",
                )
                .admin(),
            ],
        },
        SectionSpec {
            id: "runtime",
            title: "Runtime & Streams",
            description: "Command execution latency, stream continuity, and raw runtime metrics.",
            items: vec![
                EndpointSpec::metrics("rpc-command", "JSON-RPC Command", Method::POST, "/mcp"),
                EndpointSpec::metrics("rpc-stream", "Progress Stream", Method::GET, "/mcp")
                    .lens(MetricsLens::StreamCounters),
                EndpointSpec::probe(
                    METRICS_PROBE_ID,
                    "Metrics Snapshot",
                    Method::GET,
                    "/admin/api/metrics",
                )
                .admin(),
                EndpointSpec::probe(
                    "admin-logs",
                    "Structured Logs",
                    Method::GET,
                    "/admin/api/logs",
                )
                .admin()
                .text(Some(DetailExtractor::LogLines)),
            ],
        },
        SectionSpec {
            id: "admin",
            title: "Admin Surface",
            description: "Privileged console and configuration endpoints that shape health signals.",
            items: vec![
                EndpointSpec::probe("admin-console", "Admin Console", Method::GET, "/admin")
                    .admin()
                    .text(None),
                EndpointSpec::metrics(
                    "admin-settings",
                    "Settings Updates",
                    Method::POST,
                    "/admin/settings",
                ),
            ],
        },
    ]
}

/// Outcome of one endpoint check.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    pub id: String,
    pub label: String,
    pub method: String,
    pub path: String,
    pub mode: ProbeMode,
    pub ok: bool,
    pub badge: String,
    pub details: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    pub http_status: Option<u16>,
    pub timestamp: DateTime<Utc>,
}

impl ProbeOutcome {
    /// Failure outcome used when no request could be made or interpreted.
    pub fn failure(
        spec: &EndpointSpec,
        badge: &str,
        details: Vec<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: spec.id.to_string(),
            label: spec.label.to_string(),
            method: spec.method.to_string(),
            path: spec.path.to_string(),
            mode: spec.mode,
            ok: false,
            badge: badge.to_string(),
            details,
            latency_ms: None,
            http_status: None,
            timestamp,
        }
    }
}

/// One section of the mission-control report.
#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub items: Vec<ProbeOutcome>,
}

/// Full mission-control report: per-endpoint statuses plus the batch summary.
#[derive(Debug, Clone, Serialize)]
pub struct OpsReport {
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<SectionReport>,
    pub summary: StatusSummary,
}

/// Probes the operations service and proxies selected endpoints.
#[derive(Debug, Clone)]
pub struct Prober {
    http: reqwest::Client,
    base_url: Url,
    admin_token: Option<String>,
}

impl Prober {
    pub fn new(base_url: Url, admin_token: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url,
            admin_token,
        }
    }

    /// Run one live probe, returning its outcome and, for JSON responses, the
    /// decoded body.
    pub async fn probe(&self, spec: &EndpointSpec) -> (ProbeOutcome, Option<Value>) {
        let timestamp = Utc::now();

        let url = match self.base_url.join(spec.path) {
            Ok(url) => url,
            Err(e) => {
                return (
                    ProbeOutcome::failure(spec, "Error", vec![e.to_string()], timestamp),
                    None,
                )
            }
        };

        let mut request = self.http.request(spec.method.clone(), url).header(
            ACCEPT,
            if spec.expect_json {
                "application/json"
            } else {
                "*/*"
            },
        );
        if spec.requires_admin {
            if let Some(token) = &self.admin_token {
                request = request.bearer_auth(token);
            }
        }

        let start = Instant::now();
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                let badge = if e.is_timeout() {
                    "Timeout"
                } else if e.is_connect() {
                    "ConnectError"
                } else {
                    "Error"
                };
                let details = vec![e.to_string(), "Will retry on next poll.".to_string()];
                return (ProbeOutcome::failure(spec, badge, details, timestamp), None);
            }
        };

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        let status = response.status();
        let ok = status.is_success();
        let badge = format!("HTTP {}", status.as_u16());

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let mut raw = None;
        let mut details = if !spec.expect_json && spec.extractor.is_some() {
            let text = response.text().await.unwrap_or_default();
            extract_details(spec.extractor.unwrap_or(DetailExtractor::LogLines), &text)
        } else if content_type.contains("application/json") {
            match response.json::<Value>().await {
                Ok(value) => {
                    let lines = json_highlights(&value, 3);
                    raw = Some(value);
                    lines
                }
                Err(e) => vec![format!("Body decode failed: {}", e)],
            }
        } else {
            match response.text().await {
                Ok(text) if !text.is_empty() => vec![truncate(&text, 140)],
                _ => Vec::new(),
            }
        };

        if details.is_empty() {
            details = vec![if ok {
                "No additional details returned.".to_string()
            } else {
                "No response body received.".to_string()
            }];
        }

        let outcome = ProbeOutcome {
            id: spec.id.to_string(),
            label: spec.label.to_string(),
            method: spec.method.to_string(),
            path: spec.path.to_string(),
            mode: spec.mode,
            ok,
            badge,
            details,
            latency_ms: ok.then_some(latency_ms),
            http_status: Some(status.as_u16()),
            timestamp,
        };

        (outcome, raw)
    }

    /// Run every live probe concurrently, derive metrics-based statuses from
    /// the fetched snapshot, and summarize the whole batch.
    ///
    /// Total latency is bounded by the slowest probe, not the sum; each probe
    /// is capped by the client timeout.
    pub async fn run_sections(&self, sections: &[SectionSpec]) -> OpsReport {
        let generated_at = Utc::now();

        let live_specs: Vec<&EndpointSpec> = sections
            .iter()
            .flat_map(|s| s.items.iter())
            .filter(|i| i.mode == ProbeMode::Probe)
            .collect();

        let results = join_all(live_specs.iter().map(|spec| self.probe(spec))).await;

        let mut metrics_snapshot: Option<Value> = None;
        let mut by_id: HashMap<String, ProbeOutcome> = HashMap::new();
        for (spec, (outcome, raw)) in live_specs.iter().zip(results) {
            if spec.id == METRICS_PROBE_ID {
                metrics_snapshot = raw;
            }
            by_id.insert(outcome.id.clone(), outcome);
        }

        let mut report_sections = Vec::with_capacity(sections.len());
        for section in sections {
            let mut items = Vec::with_capacity(section.items.len());
            for spec in &section.items {
                let outcome = match spec.mode {
                    ProbeMode::Probe => match by_id.remove(spec.id) {
                        Some(outcome) => outcome,
                        None => continue,
                    },
                    ProbeMode::Metrics => {
                        derive_metrics_status(spec, metrics_snapshot.as_ref(), generated_at)
                    }
                };
                items.push(outcome);
            }
            report_sections.push(SectionReport {
                id: section.id,
                title: section.title,
                description: section.description,
                items,
            });
        }

        let all: Vec<&ProbeOutcome> = report_sections
            .iter()
            .flat_map(|s| s.items.iter())
            .collect();
        let summary = summarize(&all);

        OpsReport {
            generated_at,
            sections: report_sections,
            summary,
        }
    }

    /// Proxy a JSON endpoint, attaching the bearer token when requested and
    /// available.
    pub async fn proxy_json(&self, path: &str, admin: bool) -> Result<Value, OpsError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| OpsError::Transport(e.to_string()))?;

        let mut request = self.http.get(url).header(ACCEPT, "application/json");
        if admin {
            if let Some(token) = &self.admin_token {
                request = request.bearer_auth(token);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| OpsError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OpsError::Upstream {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| OpsError::Transport(e.to_string()))
    }

    /// Fetch the upstream log feed and split it into trimmed non-empty lines.
    ///
    /// The log endpoint is admin-gated; a missing token is an error rather
    /// than an anonymous attempt.
    pub async fn fetch_log_lines(&self) -> Result<Vec<String>, OpsError> {
        let token = self.admin_token.as_ref().ok_or(OpsError::MissingToken)?;

        let url = self
            .base_url
            .join("/admin/api/logs")
            .map_err(|e| OpsError::Transport(e.to_string()))?;

        let response = self
            .http
            .get(url)
            .header(ACCEPT, "text/plain")
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| OpsError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OpsError::Upstream {
                status: response.status().as_u16(),
                path: "/admin/api/logs".to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| OpsError::Transport(e.to_string()))?;

        Ok(body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn extract_details(extractor: DetailExtractor, text: &str) -> Vec<String> {
    match extractor {
        DetailExtractor::LogLines => log_lines(text),
        DetailExtractor::JsonHighlights => {
            if text.is_empty() {
                Vec::new()
            } else {
                vec![truncate(text, 140)]
            }
        }
    }
}

/// First three non-empty log lines, each capped at 120 characters.
pub fn log_lines(text: &str) -> Vec<String> {
    let lines: Vec<String> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(3)
        .map(|l| truncate(l, 120))
        .collect();

    if lines.is_empty() {
        vec!["No log lines returned".to_string()]
    } else {
        lines
    }
}

/// Highlight the first few interesting fields of a JSON object.
///
/// Nested objects with a string `status` or boolean `ok` field are collapsed
/// to that signal; everything else is summarized inline.
pub fn json_highlights(payload: &Value, limit: usize) -> Vec<String> {
    let object = match payload.as_object() {
        Some(o) => o,
        None => return vec![summarize_value(payload)],
    };

    let mut lines = Vec::new();
    for (key, value) in object {
        if lines.len() >= limit {
            break;
        }
        if let Some(nested) = value.as_object() {
            if let Some(status) = nested.get("status").and_then(Value::as_str) {
                lines.push(format!("{}: {}", key, status));
                continue;
            }
            if let Some(ok) = nested.get("ok").and_then(Value::as_bool) {
                lines.push(format!("{}: {}", key, if ok { "ok" } else { "issue" }));
                continue;
            }
        }
        lines.push(format!("{}: {}", key, summarize_value(value)));
    }

    if lines.is_empty() {
        vec!["JSON payload received".to_string()]
    } else {
        lines
    }
}

fn summarize_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => truncate(s, 80),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => truncate(&other.to_string(), 80),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{routing::get, routing::post, Json, Router};
    use serde_json::json;

    async fn spawn(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{}", addr)).unwrap()
    }

    #[test]
    fn test_json_highlights_collapses_status_fields() {
        let payload = json!({
            "database": { "status": "connected", "pool": 10 },
            "cache": { "ok": true },
            "uptime": 12345,
            "zz_extra": "ignored past the limit"
        });
        let lines = json_highlights(&payload, 3);
        assert_eq!(lines.len(), 3);
        assert!(lines.contains(&"database: connected".to_string()));
        assert!(lines.contains(&"cache: ok".to_string()));
        assert!(lines.contains(&"uptime: 12345".to_string()));
    }

    #[test]
    fn test_json_highlights_non_object() {
        assert_eq!(json_highlights(&json!("plain"), 3), vec!["plain"]);
    }

    #[test]
    fn test_log_lines_caps_and_truncates() {
        let long = "x".repeat(300);
        let text = format!("first\n\n{}\nthird\nfourth", long);
        let lines = log_lines(&text);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "first");
        assert_eq!(lines[1].chars().count(), 120);
        assert_eq!(lines[2], "third");
    }

    #[test]
    fn test_log_lines_empty_body() {
        assert_eq!(log_lines(""), vec!["No log lines returned"]);
    }

    #[tokio::test]
    async fn test_probe_success_records_latency() {
        let router = Router::new().route(
            "/health",
            get(|| async { Json(json!({ "status": "ok", "uptime": 7 })) }),
        );
        let base = spawn(router).await;

        let prober = Prober::new(base, None);
        let spec = EndpointSpec::probe("health-alive", "Alive Probe", Method::GET, "/health");
        let (outcome, raw) = prober.probe(&spec).await;

        assert!(outcome.ok);
        assert_eq!(outcome.badge, "HTTP 200");
        assert_eq!(outcome.http_status, Some(200));
        assert!(outcome.latency_ms.is_some());
        assert!(raw.is_some());
        assert!(outcome.details.contains(&"status: ok".to_string()));
    }

    #[tokio::test]
    async fn test_probe_failure_has_no_latency() {
        let router =
            Router::new().route("/health", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let base = spawn(router).await;

        let prober = Prober::new(base, None);
        let spec = EndpointSpec::probe("health-alive", "Alive Probe", Method::GET, "/health");
        let (outcome, _) = prober.probe(&spec).await;

        assert!(!outcome.ok);
        assert_eq!(outcome.badge, "HTTP 503");
        assert!(outcome.latency_ms.is_none());
        assert_eq!(outcome.details, vec!["No response body received."]);
    }

    #[tokio::test]
    async fn test_probe_transport_error() {
        // Nothing is listening on this port.
        let base = Url::parse("http://127.0.0.1:1").unwrap();
        let prober = Prober::new(base, None);
        let spec = EndpointSpec::probe("health-alive", "Alive Probe", Method::GET, "/health");
        let (outcome, raw) = prober.probe(&spec).await;

        assert!(!outcome.ok);
        assert!(outcome.http_status.is_none());
        assert!(raw.is_none());
        assert_eq!(outcome.details.len(), 2);
    }

    #[tokio::test]
    async fn test_run_sections_derives_metrics_statuses() {
        let router = Router::new()
            .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
            .route(
                "/health/deep",
                get(|| async { Json(json!({ "status": "ok" })) }),
            )
            .route(
                "/admin/api/health/deep",
                get(|| async { Json(json!({ "status": "ok" })) }),
            )
            .route(
                "/admin/api/metrics",
                get(|| async {
                    Json(json!({
                        "per_path": {
                            "POST /mcp": { "requests": 100, "errors": 1 },
                            "POST /admin/settings": { "requests": 10, "errors": 9 }
                        },
                        "streams": { "active": 3, "auth_failures": 0 }
                    }))
                }),
            )
            .route("/admin/api/logs", get(|| async { "line one\nline two" }))
            .route("/admin", get(|| async { "<html>console</html>" }))
            .route("/admin/settings", post(|| async { StatusCode::OK }));
        let base = spawn(router).await;

        let prober = Prober::new(base, Some("secret".to_string()));
        let report = prober.run_sections(&default_sections()).await;

        assert_eq!(report.sections.len(), 3);

        let runtime = &report.sections[1];
        let rpc = runtime.items.iter().find(|i| i.id == "rpc-command").unwrap();
        assert!(rpc.ok);
        assert_eq!(rpc.badge, "Healthy");

        let stream = runtime.items.iter().find(|i| i.id == "rpc-stream").unwrap();
        assert!(stream.ok);
        assert!(stream.details.contains(&"Active streams: 3".to_string()));

        let admin = &report.sections[2];
        let settings = admin
            .items
            .iter()
            .find(|i| i.id == "admin-settings")
            .unwrap();
        assert!(!settings.ok);
        assert_eq!(settings.badge, "Degraded");

        assert_eq!(report.summary.total, 9);
        assert!(report.summary.failing >= 1);
    }

    #[tokio::test]
    async fn test_run_sections_without_metrics_snapshot() {
        let router = Router::new()
            .route("/health", get(|| async { Json(json!({ "status": "ok" })) }));
        let base = spawn(router).await;

        let prober = Prober::new(base, None);
        let report = prober.run_sections(&default_sections()).await;

        let runtime = &report.sections[1];
        let rpc = runtime.items.iter().find(|i| i.id == "rpc-command").unwrap();
        assert!(!rpc.ok);
        assert_eq!(rpc.badge, "No metrics");
    }

    #[tokio::test]
    async fn test_proxy_json_forwards_upstream_status() {
        let router = Router::new().route("/health", get(|| async { StatusCode::BAD_GATEWAY }));
        let base = spawn(router).await;

        let prober = Prober::new(base, None);
        let err = prober.proxy_json("/health", false).await.unwrap_err();
        assert!(matches!(err, OpsError::Upstream { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_fetch_log_lines_requires_token() {
        let base = Url::parse("http://127.0.0.1:1").unwrap();
        let prober = Prober::new(base, None);
        let err = prober.fetch_log_lines().await.unwrap_err();
        assert!(matches!(err, OpsError::MissingToken));
    }

    #[tokio::test]
    async fn test_fetch_log_lines_splits_and_trims() {
        let router = Router::new().route(
            "/admin/api/logs",
            get(|| async { "  alpha  \n\nbeta\r\n   \ngamma" }),
        );
        let base = spawn(router).await;

        let prober = Prober::new(base, Some("secret".to_string()));
        let lines = prober.fetch_log_lines().await.unwrap();
        assert_eq!(lines, vec!["alpha", "beta", "gamma"]);
    }
}
