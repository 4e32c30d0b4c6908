//! Session-wide counters and observability aggregates.
//!
//! `SessionStats` is the only state in the pipeline that is mutated from
//! multiple threads. Every operation, mutating or reading, takes the same
//! single lock; nothing blocks beyond lock contention.

use crate::audio::gate::SkipReason;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Thread-safe session statistics aggregator.
#[derive(Debug, Default)]
pub struct SessionStats {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    saved_chunks: u64,
    skip_reasons: BTreeMap<&'static str, u64>,
    latencies: Vec<f64>,
    first_latency: Option<f64>,
    chunk_durations: Vec<f64>,
    languages: BTreeMap<String, u64>,
}

/// Aggregated latency statistics in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

/// Snapshot of session statistics, produced under the lock.
#[derive(Debug, Clone)]
pub struct StatsSummary {
    pub saved_chunks: u64,
    pub skipped_chunks: u64,
    pub skip_reasons: BTreeMap<&'static str, u64>,
    pub latency: Option<LatencySummary>,
    pub first_latency: Option<f64>,
    pub mean_chunk_duration: Option<f64>,
    pub top_language: Option<(String, u64)>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one persisted speech chunk.
    pub fn increment_saved(&self) {
        self.lock().saved_chunks += 1;
    }

    /// Record one skipped chunk under its skip reason.
    pub fn increment_skipped(&self, reason: SkipReason) {
        *self.lock().skip_reasons.entry(reason.as_str()).or_insert(0) += 1;
    }

    /// Record a transcription latency sample in seconds. The first sample is
    /// also retained separately: it includes engine warm-up and is reported
    /// on its own in the session summary.
    pub fn add_latency(&self, seconds: f64) {
        let mut inner = self.lock();
        if inner.first_latency.is_none() {
            inner.first_latency = Some(seconds);
        }
        inner.latencies.push(seconds);
    }

    /// Record the audio duration of a transcribed chunk in seconds.
    pub fn add_chunk_duration(&self, seconds: f64) {
        self.lock().chunk_durations.push(seconds);
    }

    /// Record a detected language code.
    pub fn add_language(&self, code: &str) {
        *self.lock().languages.entry(code.to_string()).or_insert(0) += 1;
    }

    /// Produce a snapshot summary under the lock.
    pub fn summary(&self) -> StatsSummary {
        let inner = self.lock();

        StatsSummary {
            saved_chunks: inner.saved_chunks,
            skipped_chunks: inner.skip_reasons.values().sum(),
            skip_reasons: inner.skip_reasons.clone(),
            latency: latency_summary(&inner.latencies),
            first_latency: inner.first_latency,
            mean_chunk_duration: mean(&inner.chunk_durations),
            top_language: inner
                .languages
                .iter()
                .max_by_key(|(_, count)| **count)
                .map(|(code, count)| (code.clone(), *count)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means another thread panicked mid-update;
        // the counters remain usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

fn latency_summary(samples: &[f64]) -> Option<LatencySummary> {
    let mean = mean(samples)?;
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    // Sample standard deviation (n-1 denominator), zero for a single sample.
    let stddev = if samples.len() < 2 {
        0.0
    } else {
        let variance = samples
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>()
            / (samples.len() - 1) as f64;
        variance.sqrt()
    };

    Some(LatencySummary {
        mean,
        min,
        max,
        stddev,
    })
}
