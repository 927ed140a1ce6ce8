//! Batch summary statistics over probe outcomes.

use serde::Serialize;

use super::ProbeOutcome;

/// Successful probes slower than this count as degraded.
const DEGRADED_LATENCY_MS: f64 = 1200.0;
/// Upper bound of the "fast" latency bucket.
const FAST_LATENCY_MS: f64 = 400.0;
/// Badge labels that mark a successful probe as degraded anyway.
const DEGRADATION_KEYWORDS: &[&str] = &["degraded", "slow", "no streams"];

/// One slice of a percentage histogram.
#[derive(Debug, Clone, Serialize)]
pub struct SummarySlice {
    pub key: &'static str,
    pub label: &'static str,
    pub value: f64,
}

/// Derived aggregate over a batch of probe outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub failing: usize,
    pub avg_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<f64>,
    pub max_latency_ms: Option<f64>,
    pub sample_size: usize,
    pub health_mix: Vec<SummarySlice>,
    pub latency_buckets: Vec<SummarySlice>,
}

/// Summarize a batch of outcomes.
///
/// Health buckets cover every outcome; latency statistics and buckets cover
/// only the outcomes that carry a latency sample (successful probes). An
/// empty batch yields zero counts, zero percentages, and null latencies.
pub fn summarize(outcomes: &[&ProbeOutcome]) -> StatusSummary {
    let total = outcomes.len();
    let mut healthy = 0;
    let mut degraded = 0;
    let mut failing = 0;
    let mut latencies: Vec<f64> = Vec::new();

    for outcome in outcomes {
        if !outcome.ok {
            failing += 1;
            continue;
        }

        let slow = outcome
            .latency_ms
            .map(|l| l > DEGRADED_LATENCY_MS)
            .unwrap_or(false);
        let badge = outcome.badge.to_lowercase();
        let flagged = DEGRADATION_KEYWORDS.iter().any(|k| badge.contains(k));

        if slow || flagged {
            degraded += 1;
        } else {
            healthy += 1;
        }

        if let Some(latency) = outcome.latency_ms {
            latencies.push(latency);
        }
    }

    latencies.sort_by(f64::total_cmp);
    let sample_size = latencies.len();

    let avg_latency_ms = if latencies.is_empty() {
        None
    } else {
        Some(latencies.iter().sum::<f64>() / sample_size as f64)
    };
    let p95_latency_ms = nearest_rank(&latencies, 0.95);
    let max_latency_ms = latencies.last().copied();

    let fast = latencies.iter().filter(|&&l| l < FAST_LATENCY_MS).count();
    let slow = latencies
        .iter()
        .filter(|&&l| l > DEGRADED_LATENCY_MS)
        .count();
    let steady = sample_size - fast - slow;

    let health_mix = vec![
        slice("healthy", "Healthy", healthy, total),
        slice("degraded", "Degraded", degraded, total),
        slice("failing", "Failing", failing, total),
    ];
    let latency_buckets = vec![
        slice("fast", "< 400 ms", fast, sample_size),
        slice("steady", "400-1200 ms", steady, sample_size),
        slice("slow", "> 1200 ms", slow, sample_size),
    ];

    StatusSummary {
        total,
        healthy,
        degraded,
        failing,
        avg_latency_ms,
        p95_latency_ms,
        max_latency_ms,
        sample_size,
        health_mix,
        latency_buckets,
    }
}

fn slice(key: &'static str, label: &'static str, part: usize, denominator: usize) -> SummarySlice {
    let value = if denominator == 0 {
        0.0
    } else {
        part as f64 / denominator as f64 * 100.0
    };
    SummarySlice { key, label, value }
}

/// Nearest-rank quantile: pick the sample at the computed rank of the sorted
/// list, clamped into bounds. Ten samples at q=0.95 select the ninth.
///
/// For tiny batches the rank formula can land below the middle of the list;
/// an upper quantile is floored at the upper-median index so two samples at
/// q=0.95 yield the larger one.
fn nearest_rank(sorted: &[f64], quantile: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    let rank = (quantile * n as f64).floor() as usize;
    let mut index = rank.saturating_sub(1).min(n - 1);
    if quantile >= 0.5 {
        index = index.max(n / 2).min(n - 1);
    }
    Some(sorted[index])
}
