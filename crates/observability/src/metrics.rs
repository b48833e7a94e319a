//! Dispatcher metrics
//!
//! Prometheus counters/gauges/histograms for the delivery path, plus an
//! in-memory aggregator for end-of-run summaries.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record messages accepted by the trigger
pub fn record_messages_enqueued(topic: &str, count: usize) {
    counter!("change_dispatcher_messages_enqueued_total", "topic" => topic.to_string())
        .increment(count as u64);
}

/// Record a confirmed send
///
/// `latency` is the time between enqueue and acknowledgement.
pub fn record_message_sent(topic: &str, latency: Duration) {
    counter!("change_dispatcher_messages_sent_total", "topic" => topic.to_string()).increment(1);
    histogram!("change_dispatcher_delivery_latency_ms", "topic" => topic.to_string())
        .record(latency.as_secs_f64() * 1000.0);
}

/// Record a failed send attempt
pub fn record_send_failure(topic: &str, connectivity: bool) {
    let kind = if connectivity { "connectivity" } else { "transport" };
    counter!(
        "change_dispatcher_send_failures_total",
        "topic" => topic.to_string(),
        "kind" => kind
    )
    .increment(1);
}

/// Record a failed client close
pub fn record_close_failure(topic: &str) {
    counter!("change_dispatcher_close_failures_total", "topic" => topic.to_string()).increment(1);
}

/// Record current pending queue depth
pub fn record_queue_depth(topic: &str, depth: usize) {
    gauge!("change_dispatcher_queue_depth", "topic" => topic.to_string()).set(depth as f64);
}

/// Record a backoff sleep before retrying
pub fn record_backoff(topic: &str, delay: Duration) {
    histogram!("change_dispatcher_backoff_ms", "topic" => topic.to_string())
        .record(delay.as_secs_f64() * 1000.0);
}

/// Record a dispatch loop start
pub fn record_dispatch_loop_started(topic: &str) {
    counter!("change_dispatcher_loops_started_total", "topic" => topic.to_string()).increment(1);
}

/// Record the outcome of topic provisioning
pub fn record_topic_provisioned(topic: &str, outcome: &'static str) {
    counter!(
        "change_dispatcher_topic_provisioning_total",
        "topic" => topic.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Delivery statistics aggregator
///
/// Aggregates in memory for summaries printed at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct DeliveryStatsAggregator {
    /// Confirmed sends
    pub total_sent: u64,

    /// Failed send attempts
    pub total_failures: u64,

    /// Enqueue-to-ack latency (ms)
    pub latency_stats: RunningStats,
}

impl DeliveryStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one confirmed delivery
    pub fn record_delivery(&mut self, latency: Duration) {
        self.total_sent += 1;
        self.latency_stats.push(latency.as_secs_f64() * 1000.0);
    }

    /// Record failed attempts
    pub fn record_failures(&mut self, count: u64) {
        self.total_failures += count;
    }

    /// Build a summary report
    pub fn summary(&self) -> DeliverySummary {
        let attempts = self.total_sent + self.total_failures;
        DeliverySummary {
            total_sent: self.total_sent,
            total_failures: self.total_failures,
            failure_rate: if attempts > 0 {
                self.total_failures as f64 / attempts as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Delivery summary
#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    pub total_sent: u64,
    pub total_failures: u64,
    pub failure_rate: f64,
    pub latency_ms: StatsSummary,
}

impl std::fmt::Display for DeliverySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Delivery Summary ===")?;
        writeln!(f, "Messages sent: {}", self.total_sent)?;
        writeln!(
            f,
            "Failed attempts: {} ({:.2}%)",
            self.total_failures, self.failure_rate
        )?;
        writeln!(f, "Delivery latency (ms): {}", self.latency_ms)
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
