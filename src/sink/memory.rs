//! In-memory sink that records everything it is handed.

use crate::errors::{GeneratorError, Result};
use crate::records::SimulatedService;
use crate::sink::{LocalSpan, SinkFactory, SpanScope, TelemetrySink};
use crate::telemetry::{LogEntry, TraceSpan};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Default)]
struct JournalState {
    created: Vec<SimulatedService>,
    logs: Vec<LogEntry>,
    spans: Vec<TraceSpan>,
    flushes: Vec<SimulatedService>,
    shutdowns: Vec<SimulatedService>,
}

/// Shared view over everything the memory sinks of one factory received.
#[derive(Debug, Clone, Default)]
pub struct MemoryJournal {
    state: Arc<Mutex<JournalState>>,
}

impl MemoryJournal {
    /// Services in the order their sinks were created.
    pub fn created(&self) -> Vec<SimulatedService> {
        self.state.lock().created.clone()
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.state.lock().logs.clone()
    }

    pub fn spans(&self) -> Vec<TraceSpan> {
        self.state.lock().spans.clone()
    }

    pub fn flush_count(&self, service: SimulatedService) -> usize {
        self.state
            .lock()
            .flushes
            .iter()
            .filter(|flushed| **flushed == service)
            .count()
    }

    pub fn total_flushes(&self) -> usize {
        self.state.lock().flushes.len()
    }

    pub fn shutdowns(&self) -> Vec<SimulatedService> {
        self.state.lock().shutdowns.clone()
    }
}

/// Factory for [`MemorySink`]s sharing one journal.
#[derive(Debug, Clone, Default)]
pub struct MemorySinkFactory {
    journal: MemoryJournal,
    fail_emits: bool,
}

impl MemorySinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sinks from this factory reject every emitted record.
    pub fn failing() -> Self {
        Self {
            journal: MemoryJournal::default(),
            fail_emits: true,
        }
    }

    pub fn journal(&self) -> MemoryJournal {
        self.journal.clone()
    }
}

impl SinkFactory for MemorySinkFactory {
    fn create(&self, service: SimulatedService) -> Result<Box<dyn TelemetrySink>> {
        self.journal.state.lock().created.push(service);
        Ok(Box::new(MemorySink {
            service,
            journal: self.journal.clone(),
            fail_emits: self.fail_emits,
            active_span: Arc::new(Mutex::new(None)),
        }))
    }
}

pub struct MemorySink {
    service: SimulatedService,
    journal: MemoryJournal,
    fail_emits: bool,
    /// `(trace_id, span_id)` of the span currently open on this sink
    active_span: Arc<Mutex<Option<(String, String)>>>,
}

impl TelemetrySink for MemorySink {
    fn emit(&self, entry: LogEntry) -> Result<()> {
        if self.fail_emits {
            return Err(GeneratorError::Export(format!(
                "{} sink rejected the record",
                self.service
            )));
        }

        let entry = match self.active_span.lock().clone() {
            Some((trace_id, span_id)) => entry.with_trace_context(trace_id, span_id),
            None => entry,
        };
        self.journal.state.lock().logs.push(entry);
        Ok(())
    }

    fn start_span(&self, name: &str, attributes: &Map<String, Value>) -> SpanScope {
        let span = TraceSpan::new(name, self.service.as_str(), attributes.clone());
        *self.active_span.lock() = Some((span.trace_id.clone(), span.span_id.clone()));

        let active_span = Arc::clone(&self.active_span);
        let journal = self.journal.clone();
        SpanScope::new(Box::new(LocalSpan::new(span, move |finished: TraceSpan| {
            *active_span.lock() = None;
            journal.state.lock().spans.push(finished);
        })))
    }

    fn flush(&self) -> Result<()> {
        self.journal.state.lock().flushes.push(self.service);
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        self.journal.state.lock().shutdowns.push(self.service);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{LogBody, LogLevel};

    fn entry() -> LogEntry {
        LogEntry::new(LogLevel::Info, "multiline", LogBody::Text("boom".to_string()))
    }

    #[test]
    fn test_logs_outside_spans_have_no_trace_context() {
        let factory = MemorySinkFactory::new();
        let journal = factory.journal();
        let sink = factory.create(SimulatedService::Multiline).unwrap();

        sink.emit(entry()).unwrap();
        let scope = sink.start_span("op", &Map::new());
        scope.end();
        sink.emit(entry()).unwrap();

        let logs = journal.logs();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|log| log.trace_id.is_none()));
        assert_eq!(journal.spans().len(), 1);
    }

    #[test]
    fn test_failing_factory_rejects_emits() {
        let factory = MemorySinkFactory::failing();
        let journal = factory.journal();
        let sink = factory.create(SimulatedService::Alb).unwrap();

        let err = sink.emit(entry()).unwrap_err();
        assert_eq!(err.kind(), "export");
        assert!(journal.logs().is_empty());
    }
}
