//! Request tracing hooks
//!
//! A client may carry one [`RequestLogger`]. It observes every request and
//! response on both the blocking and the streaming path and never affects
//! the outcome of a call.

use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Sink for per-request debug traces
pub trait RequestLogger: Send + Sync {
    /// Called before the request is sent
    fn request(&self, url: &str, payload: &Map<String, Value>);

    /// Called after a blocking response has been decoded
    fn response(&self, url: &str, text: &[String]);

    /// Called for every decoded stream frame
    fn frame(&self, url: &str, index: usize, text: &[String]) {
        let _ = (url, index, text);
    }

    /// Called when a stream ends without error
    fn finished(&self, url: &str, frames: usize) {
        let _ = (url, frames);
    }
}

/// Logger that forwards traces to `tracing` at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl RequestLogger for TracingLogger {
    fn request(&self, url: &str, payload: &Map<String, Value>) {
        let body = Value::Object(payload.clone());
        tracing::debug!(
            target: "vllm_client",
            url,
            payload = %body,
            "sending generate request"
        );
    }

    fn response(&self, url: &str, text: &[String]) {
        tracing::debug!(
            target: "vllm_client",
            url,
            completions = text.len(),
            text = ?text,
            "received generate response"
        );
    }

    fn frame(&self, url: &str, index: usize, text: &[String]) {
        tracing::trace!(target: "vllm_client", url, index, text = ?text, "received stream frame");
    }

    fn finished(&self, url: &str, frames: usize) {
        tracing::debug!(target: "vllm_client", url, frames, "stream finished");
    }
}

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    Request {
        url: String,
        payload: Map<String, Value>,
        timestamp: Instant,
    },
    Response {
        url: String,
        text: Vec<String>,
        timestamp: Instant,
    },
    Frame {
        url: String,
        index: usize,
        text: Vec<String>,
        timestamp: Instant,
    },
    StreamFinished {
        url: String,
        frames: usize,
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub requests: usize,
    pub responses: usize,
    pub frames: usize,
    pub streams_finished: usize,
    pub completions: usize,
}

/// Logger that keeps every event in memory
///
/// Cloning shares the underlying event log.
#[derive(Debug, Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::Request { .. } => stats.requests += 1,
                TelemetryEvent::Response { text, .. } => {
                    stats.responses += 1;
                    stats.completions += text.len();
                }
                TelemetryEvent::Frame { .. } => stats.frames += 1,
                TelemetryEvent::StreamFinished { .. } => stats.streams_finished += 1,
            }
        }

        lock(&self.events).push(event);
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    /// Payloads of every recorded request, oldest first
    pub fn payloads(&self) -> Vec<Map<String, Value>> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                TelemetryEvent::Request { payload, .. } => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestLogger for TelemetryCollector {
    fn request(&self, url: &str, payload: &Map<String, Value>) {
        self.record(TelemetryEvent::Request {
            url: url.to_string(),
            payload: payload.clone(),
            timestamp: Instant::now(),
        });
    }

    fn response(&self, url: &str, text: &[String]) {
        self.record(TelemetryEvent::Response {
            url: url.to_string(),
            text: text.to_vec(),
            timestamp: Instant::now(),
        });
    }

    fn frame(&self, url: &str, index: usize, text: &[String]) {
        self.record(TelemetryEvent::Frame {
            url: url.to_string(),
            index,
            text: text.to_vec(),
            timestamp: Instant::now(),
        });
    }

    fn finished(&self, url: &str, frames: usize) {
        self.record(TelemetryEvent::StreamFinished {
            url: url.to_string(),
            frames,
            timestamp: Instant::now(),
        });
    }
}

// A panicking logger must not take the client down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collector_counts_events() {
        let collector = TelemetryCollector::new();
        let mut payload = Map::new();
        payload.insert("prompt".to_string(), json!("Hi"));

        collector.request("http://x/generate", &payload);
        collector.response("http://x/generate", &["Hi there".to_string(), "Hi you".to_string()]);
        collector.frame("http://x/generate", 0, &["Hi".to_string()]);
        collector.finished("http://x/generate", 1);

        let stats = collector.get_stats();
        assert_eq!(stats.requests, 1);
        assert_eq!(stats.responses, 1);
        assert_eq!(stats.completions, 2);
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.streams_finished, 1);
        assert_eq!(collector.event_count(), 4);
        assert_eq!(collector.payloads(), vec![payload]);
    }

    #[test]
    fn test_recent_events() {
        let collector = TelemetryCollector::new();
        for i in 0..5 {
            collector.frame("u", i, &[]);
        }

        let recent = collector.recent_events(2);
        assert_eq!(recent.len(), 2);
        assert!(matches!(recent[1], TelemetryEvent::Frame { index: 4, .. }));
    }

    #[test]
    fn test_clones_share_log() {
        let collector = TelemetryCollector::new();
        let shared = collector.clone();
        shared.finished("u", 3);
        assert_eq!(collector.event_count(), 1);
    }

    #[test]
    fn test_tracing_logger_is_silent_without_subscriber() {
        let logger = TracingLogger;
        logger.request("u", &Map::new());
        logger.response("u", &[]);
        logger.frame("u", 0, &[]);
        logger.finished("u", 0);
    }

    #[test]
    fn test_tracing_logger_formats_payload() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut payload = Map::new();
            payload.insert("prompt".to_string(), json!("Hello"));
            payload.insert("n".to_string(), json!(2));

            let logger = TracingLogger;
            logger.request("http://localhost:8000/generate", &payload);
            logger.frame("http://localhost:8000/generate", 0, &["Hello".to_string()]);
            logger.finished("http://localhost:8000/generate", 1);
        });
    }
}
