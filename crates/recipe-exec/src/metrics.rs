//! Execution metrics (spec §6 `collectMetrics`) — a plain counters struct
//! behind a mutex, updated as steps complete. Optional: callers that don't
//! care just never read it.

use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExecutionMetrics {
    pub steps_completed: u32,
    pub steps_failed: u32,
    pub steps_skipped: u32,
    pub steps_cancelled: u32,
    pub steps_timed_out: u32,
    pub total_retries: u32,
    pub total_duration: Duration,
}

/// Shared sink for metrics updates across concurrently-running steps.
#[derive(Default)]
pub struct MetricsCollector(Mutex<ExecutionMetrics>);

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, status: recipe_core::StepStatus, retries: u32, duration: Duration) {
        let mut metrics = self.0.lock().unwrap();
        match status {
            recipe_core::StepStatus::Completed => metrics.steps_completed += 1,
            recipe_core::StepStatus::Failed => metrics.steps_failed += 1,
            recipe_core::StepStatus::Skipped => metrics.steps_skipped += 1,
            recipe_core::StepStatus::Cancelled => metrics.steps_cancelled += 1,
            recipe_core::StepStatus::TimedOut => metrics.steps_timed_out += 1,
        }
        metrics.total_retries += retries;
        metrics.total_duration += duration;
    }

    pub fn snapshot(&self) -> ExecutionMetrics {
        *self.0.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_core::StepStatus;

    #[test]
    fn records_accumulate_across_calls() {
        let collector = MetricsCollector::new();
        collector.record(StepStatus::Completed, 1, Duration::from_millis(10));
        collector.record(StepStatus::Failed, 0, Duration::from_millis(5));
        let snapshot = collector.snapshot();
        assert_eq!(snapshot.steps_completed, 1);
        assert_eq!(snapshot.steps_failed, 1);
        assert_eq!(snapshot.total_retries, 1);
        assert_eq!(snapshot.total_duration, Duration::from_millis(15));
    }
}
