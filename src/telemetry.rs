//! Sink-facing telemetry data structures and utilities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Severity scale accepted by every sink, ordered from least to most severe.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Strict parse; unlike `From<&str>` unknown names are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" | "VERBOSE" => Some(LogLevel::Trace),
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" | "INFORMATION" => Some(LogLevel::Info),
            "WARN" | "WARNING" => Some(LogLevel::Warn),
            "ERROR" | "ERR" => Some(LogLevel::Error),
            "FATAL" | "CRITICAL" => Some(LogLevel::Fatal),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        LogLevel::parse(s).unwrap_or(LogLevel::Info)
    }
}

/// Body of a log record: either a key/value document or raw text.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LogBody {
    Text(String),
    Document(Value),
}

impl LogBody {
    /// Render the body the way it travels on the wire (documents as JSON text).
    pub fn render(&self) -> crate::Result<String> {
        match self {
            LogBody::Text(text) => Ok(text.clone()),
            LogBody::Document(doc) => Ok(serde_json::to_string(doc)?),
        }
    }
}

/// One record handed to a sink.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub level: LogLevel,
    pub service_name: String,
    pub body: LogBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, service_name: impl Into<String>, body: LogBody) -> Self {
        Self {
            timestamp: current_timestamp_ms(),
            level,
            service_name: service_name.into(),
            body,
            attributes: None,
            trace_id: None,
            span_id: None,
        }
    }

    pub fn with_trace_context(mut self, trace_id: String, span_id: String) -> Self {
        self.trace_id = Some(trace_id);
        self.span_id = Some(span_id);
        self
    }

    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn system_time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.timestamp)
    }
}

/// A locally tracked span, used by the non-OTLP sinks.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TraceSpan {
    pub trace_id: String,
    pub span_id: String,
    pub operation_name: String,
    pub service_name: String,
    /// Milliseconds since the Unix epoch
    pub start_time: u64,
    pub end_time: u64,
    pub duration_ms: u64,
    pub status: SpanStatus,
    pub attributes: Map<String, Value>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SpanStatus {
    Ok,
    Error,
}

impl std::fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpanStatus::Ok => write!(f, "OK"),
            SpanStatus::Error => write!(f, "ERROR"),
        }
    }
}

impl TraceSpan {
    pub fn new(
        operation_name: impl Into<String>,
        service_name: impl Into<String>,
        attributes: Map<String, Value>,
    ) -> Self {
        let now = current_timestamp_ms();
        Self {
            trace_id: generate_trace_id(),
            span_id: generate_span_id(),
            operation_name: operation_name.into(),
            service_name: service_name.into(),
            start_time: now,
            end_time: now,
            duration_ms: 0,
            status: SpanStatus::Ok,
            attributes,
        }
    }

    pub fn finish(mut self, status: SpanStatus) -> Self {
        self.end_time = current_timestamp_ms().max(self.start_time);
        self.duration_ms = self.end_time - self.start_time;
        self.status = status;
        self
    }
}

/// Generate a new trace ID
pub fn generate_trace_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Generate a new span ID
pub fn generate_span_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// Get current timestamp in milliseconds since Unix epoch
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from("INFO"), LogLevel::Info);
        assert_eq!(LogLevel::from("error"), LogLevel::Error);
        assert_eq!(LogLevel::from("WARNING"), LogLevel::Warn);
        assert_eq!(LogLevel::from("CRITICAL"), LogLevel::Fatal);
        assert_eq!(LogLevel::from("unknown"), LogLevel::Info);
        assert_eq!(LogLevel::parse("unknown"), None);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn test_log_entry_creation() {
        let mut attrs = Map::new();
        attrs.insert("status".to_string(), json!(200));

        let log = LogEntry::new(LogLevel::Info, "NGINX", LogBody::Text("GET /".to_string()))
            .with_attributes(attrs)
            .with_trace_context("trace-123".to_string(), "span-456".to_string());

        assert_eq!(log.level, LogLevel::Info);
        assert_eq!(log.service_name, "NGINX");
        assert_eq!(log.trace_id.as_deref(), Some("trace-123"));
        assert_eq!(log.attributes.unwrap()["status"], json!(200));
    }

    #[test]
    fn test_document_body_renders_as_json() {
        let body = LogBody::Document(json!({"count": "ten"}));
        assert_eq!(body.render().unwrap(), r#"{"count":"ten"}"#);

        let body = LogBody::Text("plain".to_string());
        assert_eq!(body.render().unwrap(), "plain");
    }

    #[test]
    fn test_trace_span_finish() {
        let span = TraceSpan::new("ALB.request", "ALB", Map::new()).finish(SpanStatus::Error);

        assert_eq!(span.trace_id.len(), 32);
        assert_eq!(span.span_id.len(), 16);
        assert_eq!(span.operation_name, "ALB.request");
        assert_eq!(span.status, SpanStatus::Error);
        assert!(span.end_time >= span.start_time);
    }
}
