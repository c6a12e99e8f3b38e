//! Observability sink injected into the pipeline and the graph builder.

use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Success,
    Error,
    Cancelled,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait MetricsSink: Send + Sync {
    fn record_duration(&self, stage: &str, outcome: Outcome, seconds: f64);

    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]);
}

/// Emits every signal as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn record_duration(&self, stage: &str, outcome: Outcome, seconds: f64) {
        tracing::debug!(stage, outcome = %outcome, seconds, "duration recorded");
    }

    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]) {
        tracing::debug!(counter = name, ?labels, "counter incremented");
    }
}

/// Counter key: metric name plus its sorted label pairs.
pub type CounterKey = (String, Vec<(String, String)>);

/// Keeps every signal in memory; useful for embedders and tests.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: Mutex<BTreeMap<CounterKey, u64>>,
    durations: Mutex<Vec<(String, Outcome, f64)>>,
}

impl InMemoryMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.counters
            .lock()
            .get(&counter_key(name, labels))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of a counter across every label combination.
    #[must_use]
    pub fn counter_total(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .iter()
            .filter(|((n, _), _)| n == name)
            .map(|(_, v)| *v)
            .sum()
    }

    #[must_use]
    pub fn durations(&self, stage: &str) -> Vec<(Outcome, f64)> {
        self.durations
            .lock()
            .iter()
            .filter(|(s, _, _)| s == stage)
            .map(|(_, o, secs)| (*o, *secs))
            .collect()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn record_duration(&self, stage: &str, outcome: Outcome, seconds: f64) {
        self.durations
            .lock()
            .push((stage.to_string(), outcome, seconds));
    }

    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]) {
        *self
            .counters
            .lock()
            .entry(counter_key(name, labels))
            .or_insert(0) += 1;
    }
}

fn counter_key(name: &str, labels: &[(&str, &str)]) -> CounterKey {
    let mut pairs: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    pairs.sort();
    (name.to_string(), pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_labels_order_insensitive() {
        let metrics = InMemoryMetrics::new();
        metrics.increment_counter("docs", &[("status", "success"), ("kind", "text")]);
        metrics.increment_counter("docs", &[("kind", "text"), ("status", "success")]);
        metrics.increment_counter("docs", &[("status", "error")]);

        assert_eq!(
            metrics.counter("docs", &[("status", "success"), ("kind", "text")]),
            2
        );
        assert_eq!(metrics.counter("docs", &[("status", "error")]), 1);
        assert_eq!(metrics.counter_total("docs"), 3);
        assert_eq!(metrics.counter("missing", &[]), 0);
    }

    #[test]
    fn test_durations_by_stage() {
        let metrics = InMemoryMetrics::new();
        metrics.record_duration("pipeline_document", Outcome::Success, 0.5);
        metrics.record_duration("pipeline_document", Outcome::Error, 0.1);
        metrics.record_duration("nlp", Outcome::Success, 0.2);

        let samples = metrics.durations("pipeline_document");
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].0, Outcome::Error);
    }
}
