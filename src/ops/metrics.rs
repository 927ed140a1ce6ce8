//! Metrics-derived statuses.
//!
//! Some endpoints are not probed directly; their health is read out of the
//! metrics snapshot fetched by the live metrics probe. The upstream snapshot
//! schema is not stable, so entry lookup walks a registered, prioritized list
//! of container keys instead of a hardcoded shape.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::Value;

use super::{EndpointSpec, ProbeOutcome};

/// Error-rate threshold above which an endpoint is reported degraded.
const ERROR_RATE_THRESHOLD: f64 = 0.05;

/// Containers consulted, in order, when locating a per-endpoint entry.
/// A new upstream snapshot shape is supported by adding its key here.
const CONTAINER_KEYS: &[&str] = &["per_path", "paths", "endpoints"];

/// How a metrics-derived descriptor reads the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsLens {
    /// Per-endpoint request/error counters keyed by method and path.
    RequestStats,
    /// Stream connection counters (`streams`/`sse`/`sse_progress`).
    StreamCounters,
}

/// Result of reading the snapshot through a lens.
#[derive(Debug, Clone)]
pub struct MetricsExtraction {
    pub ok: bool,
    pub details: Vec<String>,
    pub badge: Option<String>,
}

/// Derive the status of a metrics-mode endpoint from the snapshot.
pub fn derive_metrics_status(
    spec: &EndpointSpec,
    metrics: Option<&Value>,
    timestamp: DateTime<Utc>,
) -> ProbeOutcome {
    let metrics = match metrics {
        Some(m) => m,
        None => {
            return ProbeOutcome::failure(
                spec,
                "No metrics",
                vec!["metrics snapshot unavailable".to_string()],
                timestamp,
            )
        }
    };

    match spec.lens {
        MetricsLens::StreamCounters => {
            let extraction = extract_stream_counters(metrics);
            let badge = extraction.badge.unwrap_or_else(|| {
                if extraction.ok {
                    "Healthy".to_string()
                } else {
                    "Issue".to_string()
                }
            });
            outcome(spec, extraction.ok, badge, extraction.details, timestamp)
        }
        MetricsLens::RequestStats => {
            let entry = match lookup_entry(metrics, &spec.method, spec.path) {
                Some(e) => e,
                None => {
                    return ProbeOutcome::failure(
                        spec,
                        "Missing",
                        vec![format!(
                            "No record for {} {} in the metrics snapshot.",
                            spec.method, spec.path
                        )],
                        timestamp,
                    )
                }
            };

            let (ok, details) = format_metric_details(entry);
            let badge = if ok { "Healthy" } else { "Degraded" };
            outcome(spec, ok, badge.to_string(), details, timestamp)
        }
    }
}

fn outcome(
    spec: &EndpointSpec,
    ok: bool,
    badge: String,
    details: Vec<String>,
    timestamp: DateTime<Utc>,
) -> ProbeOutcome {
    ProbeOutcome {
        id: spec.id.to_string(),
        label: spec.label.to_string(),
        method: spec.method.to_string(),
        path: spec.path.to_string(),
        mode: spec.mode,
        ok,
        badge,
        details,
        latency_ms: None,
        http_status: None,
        timestamp,
    }
}

/// Locate the snapshot entry for an endpoint.
///
/// Tries each registered container, then the snapshot root, against the key
/// spellings upstream has been seen to use.
pub fn lookup_entry<'a>(metrics: &'a Value, method: &Method, path: &str) -> Option<&'a Value> {
    let keys = [
        format!("{} {}", method, path),
        format!("{}:{}", method, path),
        path.to_string(),
        path.trim_start_matches('/').to_string(),
    ];

    let containers = CONTAINER_KEYS
        .iter()
        .filter_map(|k| metrics.get(k))
        .filter(|v| v.is_object())
        .chain(std::iter::once(metrics));

    for container in containers {
        for key in &keys {
            if let Some(entry) = container.get(key.as_str()) {
                if entry.is_object() {
                    return Some(entry);
                }
            }
        }
    }

    None
}

/// Summarize a per-endpoint entry and judge its health.
///
/// Healthy when the error rate is below the threshold; when no rate is
/// computable the endpoint is assumed healthy.
pub fn format_metric_details(entry: &Value) -> (bool, Vec<String>) {
    let requests = pick_number(Some(entry), &["count", "requests", "total", "hits"]);
    let errors = pick_number(Some(entry), &["errors", "error_count"]);
    let error_rate = pick_number(Some(entry), &["error_rate", "errorRate"]);
    let p95 = pick_number(Some(entry), &["p95", "p95_ms", "latency_p95"])
        .or_else(|| pick_number(entry.get("latency_ms"), &["p95"]));

    let mut details = Vec::new();
    if let Some(requests) = requests {
        details.push(format!("Requests: {}", requests));
    }
    if let Some(errors) = errors {
        details.push(format!("Errors: {}", errors));
    }
    if let Some(rate) = error_rate {
        details.push(format!("Error rate: {:.2}%", rate * 100.0));
    }
    if let Some(p95) = p95 {
        details.push(format!("p95 latency: {} ms", p95.round()));
    }
    if details.is_empty() {
        let raw = entry.to_string();
        details.push(raw.chars().take(120).collect());
    }

    let ok = match error_rate {
        Some(rate) => rate < ERROR_RATE_THRESHOLD,
        None => match (errors, requests) {
            (Some(errors), Some(requests)) => errors / requests.max(1.0) < ERROR_RATE_THRESHOLD,
            _ => true,
        },
    };

    (ok, details)
}

/// Read the stream counters out of the snapshot.
pub fn extract_stream_counters(metrics: &Value) -> MetricsExtraction {
    let candidate = ["streams", "sse", "sse_progress"]
        .iter()
        .filter_map(|k| metrics.get(k))
        .find(|v| v.is_object());

    let data = match candidate {
        Some(d) => d,
        None => {
            return MetricsExtraction {
                ok: false,
                details: vec!["No stream metrics present".to_string()],
                badge: None,
            }
        }
    };

    let active = pick_number(Some(data), &["active", "connections", "current"]);
    let auth_failures = pick_number(Some(data), &["auth_failures", "auth", "unauthorized"]);
    let heartbeats_missed = pick_number(Some(data), &["heartbeats_missed", "missed", "dropped"]);

    let mut details = Vec::new();
    if let Some(active) = active {
        details.push(format!("Active streams: {}", active));
    }
    if let Some(failures) = auth_failures {
        details.push(format!("Auth failures: {}", failures));
    }
    if let Some(missed) = heartbeats_missed {
        details.push(format!("Heartbeat misses: {}", missed));
    }
    if details.is_empty() {
        details.push("Stream metrics available".to_string());
    }

    let no_streams = active == Some(0.0);
    MetricsExtraction {
        ok: active.map(|a| a > 0.0).unwrap_or(true),
        details,
        badge: no_streams.then(|| "No streams".to_string()),
    }
}

fn pick_number(source: Option<&Value>, keys: &[&str]) -> Option<f64> {
    let object = source?.as_object()?;
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> EndpointSpec {
        let sections = super::super::default_sections();
        sections[1]
            .items
            .iter()
            .find(|i| i.id == "rpc-command")
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_lookup_entry_container_priority() {
        let metrics = json!({
            "per_path": { "POST /mcp": { "requests": 1 } },
            "paths": { "POST /mcp": { "requests": 2 } }
        });
        let entry = lookup_entry(&metrics, &Method::POST, "/mcp").unwrap();
        assert_eq!(entry["requests"], 1);
    }

    #[test]
    fn test_lookup_entry_key_spellings() {
        let colon = json!({ "endpoints": { "POST:/mcp": { "requests": 3 } } });
        assert!(lookup_entry(&colon, &Method::POST, "/mcp").is_some());

        let bare = json!({ "paths": { "/mcp": { "requests": 4 } } });
        assert!(lookup_entry(&bare, &Method::POST, "/mcp").is_some());

        let stripped = json!({ "mcp": { "requests": 5 } });
        assert!(lookup_entry(&stripped, &Method::POST, "/mcp").is_some());
    }

    #[test]
    fn test_lookup_entry_missing() {
        let metrics = json!({ "per_path": { "GET /other": { "requests": 1 } } });
        assert!(lookup_entry(&metrics, &Method::POST, "/mcp").is_none());
    }

    #[test]
    fn test_error_rate_threshold() {
        let (ok, _) = format_metric_details(&json!({ "error_rate": 0.049 }));
        assert!(ok);

        let (ok, _) = format_metric_details(&json!({ "error_rate": 0.051 }));
        assert!(!ok);
    }

    #[test]
    fn test_error_ratio_fallback() {
        let (ok, details) = format_metric_details(&json!({ "requests": 200, "errors": 4 }));
        assert!(ok);
        assert!(details.contains(&"Requests: 200".to_string()));

        let (ok, _) = format_metric_details(&json!({ "requests": 100, "errors": 20 }));
        assert!(!ok);
    }

    #[test]
    fn test_no_counters_defaults_healthy() {
        let (ok, details) = format_metric_details(&json!({ "whatever": "else" }));
        assert!(ok);
        assert_eq!(details.len(), 1);
    }

    #[test]
    fn test_nested_p95() {
        let (_, details) =
            format_metric_details(&json!({ "latency_ms": { "p95": 812.4 }, "requests": 10 }));
        assert!(details.contains(&"p95 latency: 812 ms".to_string()));
    }

    #[test]
    fn test_stream_counters_no_streams_badge() {
        let extraction = extract_stream_counters(&json!({ "streams": { "active": 0 } }));
        assert!(!extraction.ok);
        assert_eq!(extraction.badge.as_deref(), Some("No streams"));
    }

    #[test]
    fn test_stream_counters_alternate_container() {
        let extraction = extract_stream_counters(&json!({
            "sse_progress": { "connections": 2, "missed": 1 }
        }));
        assert!(extraction.ok);
        assert!(extraction
            .details
            .contains(&"Active streams: 2".to_string()));
        assert!(extraction
            .details
            .contains(&"Heartbeat misses: 1".to_string()));
    }

    #[test]
    fn test_derive_without_snapshot() {
        let outcome = derive_metrics_status(&spec(), None, Utc::now());
        assert!(!outcome.ok);
        assert_eq!(outcome.badge, "No metrics");
    }

    #[test]
    fn test_derive_missing_entry() {
        let metrics = json!({ "per_path": {} });
        let outcome = derive_metrics_status(&spec(), Some(&metrics), Utc::now());
        assert!(!outcome.ok);
        assert_eq!(outcome.badge, "Missing");
        assert!(outcome.details[0].contains("POST /mcp"));
    }
}
