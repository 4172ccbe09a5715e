//! Telemetry sinks: where generated records are delivered.
//!
//! One sink exists per [`SimulatedService`], created lazily by a
//! [`SinkFactory`] the first time the driver routes a record to that service and
//! kept until shutdown. Sinks may buffer; `emit` never waits for delivery.

#[cfg(test)]
pub mod memory;
pub mod otlp;
pub mod stdout;

use crate::errors::Result;
use crate::records::SimulatedService;
use crate::telemetry::{LogEntry, SpanStatus, TraceSpan};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
pub use memory::{MemoryJournal, MemorySinkFactory};
pub use otlp::OtlpSinkFactory;
pub use stdout::StdoutSinkFactory;

/// Delivery endpoint for one simulated service.
pub trait TelemetrySink: Send + Sync {
    /// Hand one record to the transport.
    fn emit(&self, entry: LogEntry) -> Result<()>;

    /// Open a span that stays current until the returned scope ends; records
    /// emitted meanwhile are correlated with it.
    fn start_span(&self, name: &str, attributes: &Map<String, Value>) -> SpanScope;

    /// Best-effort push of buffered data. Must not wait on network delivery.
    fn flush(&self) -> Result<()>;

    /// Flush what is left and release the transport. May block.
    fn shutdown(&self) -> Result<()>;
}

/// Builds the sink for a service on first use.
pub trait SinkFactory: Send {
    fn create(&self, service: SimulatedService) -> Result<Box<dyn TelemetrySink>>;
}

/// An open span owned by a sink implementation.
pub trait ActiveSpan {
    fn end(self: Box<Self>, status: SpanStatus);
}

/// Scoped span handle; the span ends when the scope is ended or dropped.
pub struct SpanScope {
    span: Option<Box<dyn ActiveSpan>>,
    status: SpanStatus,
}

impl SpanScope {
    pub fn new(span: Box<dyn ActiveSpan>) -> Self {
        Self {
            span: Some(span),
            status: SpanStatus::Ok,
        }
    }

    pub fn mark_error(&mut self) {
        self.status = SpanStatus::Error;
    }

    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if let Some(span) = self.span.take() {
            span.end(self.status);
        }
    }
}

impl Drop for SpanScope {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Span tracked in-process and handed to a callback when it ends.
pub(crate) struct LocalSpan<F: FnOnce(TraceSpan)> {
    span: TraceSpan,
    on_end: F,
}

impl<F: FnOnce(TraceSpan)> LocalSpan<F> {
    pub(crate) fn new(span: TraceSpan, on_end: F) -> Self {
        Self { span, on_end }
    }
}

impl<F: FnOnce(TraceSpan)> ActiveSpan for LocalSpan<F> {
    fn end(self: Box<Self>, status: SpanStatus) {
        let LocalSpan { span, on_end } = *self;
        on_end(span.finish(status));
    }
}

/// Lazily populated map of service to sink, owned by the emission driver.
pub struct SinkRegistry<F> {
    factory: F,
    sinks: HashMap<SimulatedService, Arc<dyn TelemetrySink>>,
}

impl<F: SinkFactory> SinkRegistry<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            sinks: HashMap::new(),
        }
    }

    /// Sink for `service`, creating it on first use.
    pub fn get_or_create(&mut self, service: SimulatedService) -> Result<&dyn TelemetrySink> {
        let sink = match self.sinks.entry(service) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let sink = self.factory.create(service)?;
                info!(service = %service, "Created telemetry sink");
                entry.insert(Arc::from(sink))
            }
        };
        Ok(&**sink)
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn contains(&self, service: SimulatedService) -> bool {
        self.sinks.contains_key(&service)
    }

    /// Ask every sink created so far to flush; failures are logged, not
    /// returned. Returns how many sinks accepted the request.
    pub fn flush_all(&self) -> usize {
        let mut flushed = 0;
        for (service, sink) in &self.sinks {
            match sink.flush() {
                Ok(()) => {
                    flushed += 1;
                    debug!(service = %service, "Flushed telemetry sink");
                }
                Err(e) => warn!(service = %service, error = %e, "Failed to flush telemetry sink"),
            }
        }
        flushed
    }

    /// Shut every sink down concurrently on the blocking pool, then forget
    /// them. Returns how many shut down cleanly.
    pub async fn shutdown_all(&mut self) -> usize {
        let pending: Vec<_> = self
            .sinks
            .drain()
            .map(|(service, sink)| {
                let handle = tokio::task::spawn_blocking(move || sink.shutdown());
                (service, handle)
            })
            .collect();

        let mut clean = 0;
        for (service, handle) in pending {
            match handle.await {
                Ok(Ok(())) => {
                    clean += 1;
                    debug!(service = %service, "Telemetry sink shut down");
                }
                Ok(Err(e)) => warn!(service = %service, error = %e, "Sink shutdown failed"),
                Err(e) => warn!(service = %service, error = %e, "Sink shutdown task failed"),
            }
        }
        clean
    }
}
