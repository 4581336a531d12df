//! Telemetry for the ask pipeline
//!
//! Collects per-request events and cumulative statistics. The collector is
//! cheap to clone and shared by every request the pipeline serves.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Events kept for inspection; older ones are dropped
const MAX_EVENTS: usize = 1024;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    RequestStarted {
        request_id: String,
        timestamp: Instant,
    },
    StateTransition {
        from: String,
        to: String,
        timestamp: Instant,
    },
    StageCompleted {
        stage: String,
        duration_ms: u64,
    },
    /// A local fragment was kept with the fallback score
    FragmentFallback {
        index: usize,
        reason: String,
    },
    TranscriptFailed {
        reason: String,
    },
    RequestFinished {
        request_id: String,
        success: bool,
        duration_ms: u64,
    },
}

/// Cumulative statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub requests: usize,
    pub answered: usize,
    pub failed: usize,
    pub state_transitions: usize,
    pub fragment_fallbacks: usize,
    pub transcript_failures: usize,
}

/// Telemetry collector
#[derive(Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<VecDeque<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::RequestStarted { .. } => stats.requests += 1,
                TelemetryEvent::StateTransition { .. } => stats.state_transitions += 1,
                TelemetryEvent::StageCompleted { .. } => {}
                TelemetryEvent::FragmentFallback { .. } => stats.fragment_fallbacks += 1,
                TelemetryEvent::TranscriptFailed { .. } => stats.transcript_failures += 1,
                TelemetryEvent::RequestFinished { success, .. } => {
                    if *success {
                        stats.answered += 1;
                    } else {
                        stats.failed += 1;
                    }
                }
            }
        }

        let mut events = lock(&self.events);
        if events.len() == MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Get retained event count
    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events.iter().skip(start).cloned().collect()
    }

    /// Share of finished requests that produced an answer
    pub fn success_rate(&self) -> f64 {
        let stats = lock(&self.stats);
        let total = stats.answered + stats.failed;
        if total == 0 {
            1.0
        } else {
            stats.answered as f64 / total as f64
        }
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        let stats = self.get_stats();
        format!(
            "uptime={:?} requests={} answered={} failed={} fragment_fallbacks={} transcript_failures={}",
            self.elapsed(),
            stats.requests,
            stats.answered,
            stats.failed,
            stats.fragment_fallbacks,
            stats.transcript_failures,
        )
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_creation() {
        let collector = TelemetryCollector::new();
        assert_eq!(collector.event_count(), 0);
        assert_eq!(collector.get_stats(), TelemetryStats::default());
    }

    #[test]
    fn test_request_outcomes() {
        let collector = TelemetryCollector::new();

        for success in [true, true, false] {
            collector.record(TelemetryEvent::RequestFinished {
                request_id: "r".to_string(),
                success,
                duration_ms: 10,
            });
        }

        let stats = collector.get_stats();
        assert_eq!(stats.answered, 2);
        assert_eq!(stats.failed, 1);
        assert!((collector.success_rate() - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_fallback_and_transcript_counts() {
        let collector = TelemetryCollector::new();
        collector.record(TelemetryEvent::FragmentFallback {
            index: 2,
            reason: "timeout".to_string(),
        });
        collector.record(TelemetryEvent::TranscriptFailed {
            reason: "read-only".to_string(),
        });

        let stats = collector.get_stats();
        assert_eq!(stats.fragment_fallbacks, 1);
        assert_eq!(stats.transcript_failures, 1);
        assert!(collector.summary().contains("fragment_fallbacks=1"));
    }

    #[test]
    fn test_event_log_is_bounded() {
        let collector = TelemetryCollector::new();
        for i in 0..(MAX_EVENTS + 10) {
            collector.record(TelemetryEvent::StageCompleted {
                stage: format!("stage{}", i),
                duration_ms: 1,
            });
        }

        assert_eq!(collector.event_count(), MAX_EVENTS);
        match collector.recent_events(1).pop() {
            Some(TelemetryEvent::StageCompleted { stage, .. }) => {
                assert_eq!(stage, format!("stage{}", MAX_EVENTS + 9));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_clones_share_state() {
        let collector = TelemetryCollector::new();
        let clone = collector.clone();
        clone.record(TelemetryEvent::RequestStarted {
            request_id: "abc".to_string(),
            timestamp: Instant::now(),
        });
        assert_eq!(collector.get_stats().requests, 1);
    }
}
