//! OTLP/gRPC sink: one logger provider and one tracer provider per service.

use crate::errors::{GeneratorError, Result};
use crate::records::SimulatedService;
use crate::sink::{ActiveSpan, SinkFactory, SpanScope, TelemetrySink};
use crate::telemetry::{LogEntry, LogLevel, SpanStatus};
use opentelemetry::logs::{AnyValue, LogRecord as _, Logger as _, LoggerProvider as _, Severity};
use opentelemetry::trace::{Status, TraceContextExt, Tracer, TracerProvider as _};
use opentelemetry::{Context, ContextGuard, Key, KeyValue, StringValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::{LogExporter, SdkLogger, SdkLoggerProvider};
use opentelemetry_sdk::trace::{
    BatchConfigBuilder, BatchSpanProcessor, SdkTracer, SdkTracerProvider, SpanExporter,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};
use uuid::Uuid;

const INSTRUMENTATION_SCOPE: &str = "loggremlin";

/// Builds an [`OtlpSink`] per service, all pointing at one collector.
#[derive(Debug, Clone)]
pub struct OtlpSinkFactory {
    endpoint: String,
    span_export_delay: Duration,
    instance_id: Uuid,
}

impl OtlpSinkFactory {
    pub fn new(
        endpoint: impl Into<String>,
        span_export_delay: Duration,
        instance_id: Uuid,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            span_export_delay,
            instance_id,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn resource(&self, service: SimulatedService) -> Resource {
        Resource::builder()
            .with_attributes([
                KeyValue::new("service.name", service.as_str()),
                KeyValue::new("service.instance.id", self.instance_id.to_string()),
                KeyValue::new("telemetry.generator", INSTRUMENTATION_SCOPE),
            ])
            .build()
    }

    /// Sink for `service` exporting through the given exporters.
    pub fn build_sink<L, S>(
        &self,
        service: SimulatedService,
        log_exporter: L,
        span_exporter: S,
    ) -> OtlpSink
    where
        L: LogExporter + 'static,
        S: SpanExporter + 'static,
    {
        let resource = self.resource(service);

        let logger_provider = SdkLoggerProvider::builder()
            .with_resource(resource.clone())
            .with_batch_exporter(log_exporter)
            .build();

        let span_processor = BatchSpanProcessor::builder(span_exporter)
            .with_batch_config(
                BatchConfigBuilder::default()
                    .with_scheduled_delay(self.span_export_delay)
                    .build(),
            )
            .build();
        let tracer_provider = SdkTracerProvider::builder()
            .with_span_processor(span_processor)
            .with_resource(resource)
            .build();

        OtlpSink {
            service,
            logger: logger_provider.logger(INSTRUMENTATION_SCOPE),
            tracer: tracer_provider.tracer(INSTRUMENTATION_SCOPE),
            logger_provider,
            tracer_provider,
            flush_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SinkFactory for OtlpSinkFactory {
    fn create(&self, service: SimulatedService) -> Result<Box<dyn TelemetrySink>> {
        let log_exporter = opentelemetry_otlp::LogExporter::builder()
            .with_tonic()
            .with_endpoint(self.endpoint.clone())
            .build()
            .map_err(|e| GeneratorError::Export(format!("failed to build log exporter: {}", e)))?;

        let span_exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(self.endpoint.clone())
            .build()
            .map_err(|e| GeneratorError::Export(format!("failed to build span exporter: {}", e)))?;

        debug!(service = %service, endpoint = %self.endpoint, "Built OTLP exporters");
        Ok(Box::new(self.build_sink(service, log_exporter, span_exporter)))
    }
}

pub struct OtlpSink {
    service: SimulatedService,
    logger_provider: SdkLoggerProvider,
    tracer_provider: SdkTracerProvider,
    logger: SdkLogger,
    tracer: SdkTracer,
    flush_in_flight: Arc<AtomicBool>,
}

impl OtlpSink {
    /// Flush both providers and wait for the exporters.
    pub fn force_flush(&self) -> Result<()> {
        force_flush_providers(&self.logger_provider, &self.tracer_provider)
    }
}

impl TelemetrySink for OtlpSink {
    fn emit(&self, entry: LogEntry) -> Result<()> {
        let (severity, severity_text) = severity_for(entry.level);

        let mut record = self.logger.create_log_record();
        record.set_body(AnyValue::String(entry.body.render()?.into()));
        record.set_severity_number(severity);
        record.set_severity_text(severity_text);
        record.set_timestamp(entry.system_time());
        record.set_observed_timestamp(SystemTime::now());
        if let Some(attributes) = entry.attributes {
            for (key, value) in attributes {
                record.add_attribute(Key::new(key), json_to_any_value(&value));
            }
        }

        // Trace and span ids come from the active context.
        self.logger.emit(record);
        Ok(())
    }

    fn start_span(&self, name: &str, attributes: &Map<String, Value>) -> SpanScope {
        let attributes: Vec<KeyValue> = attributes
            .iter()
            .map(|(key, value)| KeyValue::new(key.clone(), json_to_otel_value(value)))
            .collect();
        let span = self
            .tracer
            .span_builder(name.to_string())
            .with_attributes(attributes)
            .start(&self.tracer);

        let cx = Context::current_with_span(span);
        let guard = cx.clone().attach();
        SpanScope::new(Box::new(OtlpSpan { cx, _guard: guard }))
    }

    /// Hands the force-flush to the blocking pool; a flush already in
    /// flight absorbs the request.
    fn flush(&self) -> Result<()> {
        let logs = self.logger_provider.clone();
        let spans = self.tracer_provider.clone();
        let service = self.service;
        let started = run_in_background(&self.flush_in_flight, move || {
            if let Err(e) = force_flush_providers(&logs, &spans) {
                warn!(service = %service, error = %e, "Failed to flush telemetry sink");
            }
        });
        if !started {
            debug!(service = %service, "Flush already in flight");
        }
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        combine(
            "shutdown",
            self.logger_provider.shutdown(),
            self.tracer_provider.shutdown(),
        )
    }
}

fn force_flush_providers(logs: &SdkLoggerProvider, spans: &SdkTracerProvider) -> Result<()> {
    combine("flush", logs.force_flush(), spans.force_flush())
}

/// Both providers are always driven; their failures are reported together.
fn combine<E: Display>(
    action: &str,
    logs: std::result::Result<(), E>,
    spans: std::result::Result<(), E>,
) -> Result<()> {
    match (logs, spans) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(l), Ok(())) => Err(GeneratorError::Export(format!("log {} failed: {}", action, l))),
        (Ok(()), Err(s)) => Err(GeneratorError::Export(format!("span {} failed: {}", action, s))),
        (Err(l), Err(s)) => Err(GeneratorError::Export(format!(
            "log {} failed: {}; span {} failed: {}",
            action, l, action, s
        ))),
    }
}

/// Run `job` off the caller's thread unless one is already running.
/// Returns whether `job` was started.
fn run_in_background<F>(in_flight: &Arc<AtomicBool>, job: F) -> bool
where
    F: FnOnce() + Send + 'static,
{
    if in_flight.swap(true, Ordering::AcqRel) {
        return false;
    }

    let in_flight = Arc::clone(in_flight);
    let task = move || {
        job();
        in_flight.store(false, Ordering::Release);
    };
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(task);
        }
        Err(_) => {
            std::thread::spawn(task);
        }
    }
    true
}

/// Span that is the current context until it ends.
struct OtlpSpan {
    cx: Context,
    _guard: ContextGuard,
}

impl ActiveSpan for OtlpSpan {
    fn end(self: Box<Self>, status: SpanStatus) {
        let OtlpSpan { cx, _guard } = *self;
        let span = cx.span();
        if status == SpanStatus::Error {
            span.set_status(Status::error("emission failed"));
        }
        span.end();
        drop(_guard);
    }
}

/// OTel severity number and text; the text uses the WARNING/CRITICAL spelling
/// collectors see from Python-style producers.
pub fn severity_for(level: LogLevel) -> (Severity, &'static str) {
    match level {
        LogLevel::Trace => (Severity::Trace, "TRACE"),
        LogLevel::Debug => (Severity::Debug, "DEBUG"),
        LogLevel::Info => (Severity::Info, "INFO"),
        LogLevel::Warn => (Severity::Warn, "WARNING"),
        LogLevel::Error => (Severity::Error, "ERROR"),
        LogLevel::Fatal => (Severity::Fatal, "CRITICAL"),
    }
}

pub fn json_to_any_value(value: &Value) -> AnyValue {
    match value {
        Value::Null => AnyValue::String("null".into()),
        Value::Bool(b) => AnyValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AnyValue::Int(i),
            None => AnyValue::Double(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => AnyValue::String(s.clone().into()),
        Value::Array(items) => {
            AnyValue::ListAny(Box::new(items.iter().map(json_to_any_value).collect()))
        }
        Value::Object(fields) => AnyValue::Map(Box::new(
            fields
                .iter()
                .map(|(key, value)| (Key::new(key.clone()), json_to_any_value(value)))
                .collect::<HashMap<Key, AnyValue>>(),
        )),
    }
}

/// Span attributes are flat; nested values travel as JSON text.
pub fn json_to_otel_value(value: &Value) -> opentelemetry::Value {
    match value {
        Value::Bool(b) => opentelemetry::Value::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => opentelemetry::Value::I64(i),
            None => opentelemetry::Value::F64(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => opentelemetry::Value::String(StringValue::from(s.clone())),
        other => opentelemetry::Value::String(StringValue::from(other.to_string())),
    }
}
