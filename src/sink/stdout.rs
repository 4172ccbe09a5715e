//! JSON-lines sink for running without a collector.

use crate::errors::Result;
use crate::records::SimulatedService;
use crate::sink::{LocalSpan, SinkFactory, SpanScope, TelemetrySink};
use crate::telemetry::{LogEntry, TraceSpan};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Write;
use std::sync::Arc;
use tracing::warn;

/// One output line: `{"log":{...}}` or `{"span":{...}}`.
#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum StdoutLine<'a> {
    Log(&'a LogEntry),
    Span(&'a TraceSpan),
}

fn write_line(line: &StdoutLine<'_>) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, line)?;
    stdout.write_all(b"\n")?;
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSinkFactory;

impl SinkFactory for StdoutSinkFactory {
    fn create(&self, service: SimulatedService) -> Result<Box<dyn TelemetrySink>> {
        Ok(Box::new(StdoutSink {
            service,
            active_span: Arc::new(Mutex::new(None)),
        }))
    }
}

pub struct StdoutSink {
    service: SimulatedService,
    active_span: Arc<Mutex<Option<(String, String)>>>,
}

impl TelemetrySink for StdoutSink {
    fn emit(&self, entry: LogEntry) -> Result<()> {
        let entry = match self.active_span.lock().clone() {
            Some((trace_id, span_id)) => entry.with_trace_context(trace_id, span_id),
            None => entry,
        };
        write_line(&StdoutLine::Log(&entry))
    }

    fn start_span(&self, name: &str, attributes: &Map<String, Value>) -> SpanScope {
        let span = TraceSpan::new(name, self.service.as_str(), attributes.clone());
        *self.active_span.lock() = Some((span.trace_id.clone(), span.span_id.clone()));

        let active_span = Arc::clone(&self.active_span);
        SpanScope::new(Box::new(LocalSpan::new(span, move |finished: TraceSpan| {
            *active_span.lock() = None;
            if let Err(e) = write_line(&StdoutLine::Span(&finished)) {
                warn!(span = %finished.operation_name, error = %e, "Failed to write span");
            }
        })))
    }

    fn flush(&self) -> Result<()> {
        std::io::stdout().lock().flush()?;
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        self.flush()
    }
}
