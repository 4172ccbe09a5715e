//! Emission driver: builds records in batches and routes them to sinks.

use crate::choice::WeightedChoice;
use crate::config::Config;
use crate::errors::{GeneratorError, Result};
use crate::records::{LogStyle, RecordGenerator};
use crate::sink::{SinkFactory, SinkRegistry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error as _;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Cadence settings for the emission loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverConfig {
    pub batch_size: usize,
    pub sleep_interval: Duration,
    /// Flush every sink after this many successful emissions; 0 disables
    pub flush_every: u64,
    /// End the current batch right after a flush
    pub break_on_flush: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            batch_size: 30,
            sleep_interval: Duration::from_secs(1),
            flush_every: 10,
            break_on_flush: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
    Building,
    Emitting,
    Stopping,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed,
    /// A flush ended the batch before `batch_size` records
    FlushedEarly,
}

/// Totals reported once the driver stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverReport {
    pub emitted: u64,
    pub failed: u64,
    pub batches: u64,
}

pub struct EmissionDriver<R, F> {
    config: DriverConfig,
    generator: RecordGenerator<R>,
    styles: WeightedChoice<LogStyle>,
    registry: SinkRegistry<F>,
    state: DriverState,
    report: DriverReport,
}

impl<F: SinkFactory> EmissionDriver<StdRng, F> {
    /// Driver wired from the process configuration. A seed makes the record
    /// stream reproducible.
    pub fn from_config(config: &Config, factory: F) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let generator = RecordGenerator::new(rng)
            .with_services(config.service_choice()?)
            .with_severity(config.severity_mode()?);

        Ok(Self::new(
            generator,
            config.style_choice()?,
            factory,
            config.driver_config()?,
        ))
    }
}

impl<R: Rng, F: SinkFactory> EmissionDriver<R, F> {
    pub fn new(
        generator: RecordGenerator<R>,
        styles: WeightedChoice<LogStyle>,
        factory: F,
        config: DriverConfig,
    ) -> Self {
        Self {
            config,
            generator,
            styles,
            registry: SinkRegistry::new(factory),
            state: DriverState::Idle,
            report: DriverReport::default(),
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn emitted(&self) -> u64 {
        self.report.emitted
    }

    pub fn report(&self) -> DriverReport {
        self.report
    }

    /// Run batches until `shutdown` is cancelled, then shut down every sink.
    /// Cancellation is observed between batches only.
    pub async fn run(&mut self, shutdown: CancellationToken) -> DriverReport {
        self.state = DriverState::Running;
        info!(
            batch_size = self.config.batch_size,
            sleep_interval_ms = self.config.sleep_interval.as_millis() as u64,
            "Emission driver started"
        );

        while !shutdown.is_cancelled() {
            self.run_batch();

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.sleep_interval) => {}
            }
        }

        self.state = DriverState::Stopping;
        let sinks = self.registry.len();
        info!(sinks, "Emission driver stopping");
        let clean = self.registry.shutdown_all().await;
        self.state = DriverState::Stopped;

        info!(
            emitted = self.report.emitted,
            failed = self.report.failed,
            batches = self.report.batches,
            sinks_shut_down = clean,
            sinks,
            "Emission driver stopped"
        );
        self.report
    }

    /// Emit up to `batch_size` records. Failed records are logged and skipped.
    pub fn run_batch(&mut self) -> BatchOutcome {
        self.report.batches += 1;

        for _ in 0..self.config.batch_size {
            match self.emit_one() {
                Ok(()) => {
                    self.report.emitted += 1;
                    if self.flush_due() {
                        let flushed = self.registry.flush_all();
                        info!(
                            emitted = self.report.emitted,
                            sinks = flushed,
                            "Emitted {} logs so far",
                            self.report.emitted
                        );
                        if self.config.break_on_flush {
                            return BatchOutcome::FlushedEarly;
                        }
                    }
                }
                Err(e) => {
                    self.state = DriverState::Running;
                    self.report.failed += 1;
                    log_failure(&e);
                }
            }
        }

        BatchOutcome::Completed
    }

    /// Build one record and hand it to its service's sink, inside a span when
    /// the record style calls for one.
    pub fn emit_one(&mut self) -> Result<()> {
        self.state = DriverState::Building;
        let style = self.styles.pick(self.generator.rng_mut());
        let record = self.generator.generate(style)?;
        let level = self.generator.severity();
        let entry = record.to_log_entry(level)?;
        debug!(service = %record.service, style = %style, "Built record");

        self.state = DriverState::Emitting;
        let sink = self.registry.get_or_create(record.service)?;
        let result = match record.span_request() {
            Some(request) => {
                let mut scope = sink.start_span(&request.name, &request.attributes);
                let result = sink.emit(entry);
                if result.is_err() {
                    scope.mark_error();
                }
                scope.end();
                result
            }
            None => sink.emit(entry),
        };
        self.state = DriverState::Running;
        result?;

        debug!(service = %record.service, style = %style, "Emitted record");
        Ok(())
    }

    fn flush_due(&self) -> bool {
        self.config.flush_every > 0 && self.report.emitted % self.config.flush_every == 0
    }
}

fn log_failure(e: &GeneratorError) {
    let mut causes = Vec::new();
    let mut source = e.source();
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    error!(kind = e.kind(), error = %e, causes = ?causes, "Failed to emit log");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::STATUS_CODES;
    use crate::records::{AlbLog, SimulatedService};
    use crate::sink::MemorySinkFactory;
    use crate::telemetry::{LogBody, SpanStatus};
    use serde_json::Value;
    use tokio_test::assert_ok;

    fn driver(
        factory: MemorySinkFactory,
        config: DriverConfig,
        seed: u64,
    ) -> EmissionDriver<StdRng, MemorySinkFactory> {
        let styles = WeightedChoice::uniform(&LogStyle::ALL).unwrap();
        EmissionDriver::new(
            RecordGenerator::new(StdRng::seed_from_u64(seed)),
            styles,
            factory,
            config,
        )
    }

    #[tokio::test]
    async fn test_stop_before_first_batch_emits_nothing() {
        let factory = MemorySinkFactory::new();
        let journal = factory.journal();
        let mut driver = driver(factory, DriverConfig::default(), 1);

        let token = CancellationToken::new();
        token.cancel();
        let report = driver.run(token).await;

        assert_eq!(report, DriverReport::default());
        assert!(journal.logs().is_empty());
        assert!(journal.created().is_empty());
        assert_eq!(driver.state(), DriverState::Stopped);
    }

    #[test]
    fn test_flush_after_ten_emissions_ends_batch() {
        let factory = MemorySinkFactory::new();
        let journal = factory.journal();
        let mut driver = driver(factory, DriverConfig::default(), 2);

        assert_eq!(driver.run_batch(), BatchOutcome::FlushedEarly);
        assert_eq!(driver.emitted(), 10);
        assert_eq!(journal.logs().len(), 10);

        let created = journal.created();
        assert!(!created.is_empty());
        for service in created {
            assert_eq!(journal.flush_count(service), 1, "{} not flushed", service);
        }
    }

    #[test]
    fn test_batch_runs_to_completion_without_break() {
        let factory = MemorySinkFactory::new();
        let journal = factory.journal();
        let config = DriverConfig {
            batch_size: 25,
            break_on_flush: false,
            ..DriverConfig::default()
        };
        let mut driver = driver(factory, config, 3);

        assert_eq!(driver.run_batch(), BatchOutcome::Completed);
        assert_eq!(journal.logs().len(), 25);
        assert!(journal.total_flushes() >= 2);
    }

    #[test]
    fn test_structured_alb_batch_end_to_end() {
        let factory = MemorySinkFactory::new();
        let journal = factory.journal();
        let config = DriverConfig {
            batch_size: 5,
            ..DriverConfig::default()
        };
        let mut driver = EmissionDriver::new(
            RecordGenerator::new(StdRng::seed_from_u64(4))
                .with_services(WeightedChoice::only(SimulatedService::Alb)),
            WeightedChoice::only(LogStyle::Structured),
            factory,
            config,
        );

        assert_eq!(driver.run_batch(), BatchOutcome::Completed);
        assert_eq!(journal.created(), vec![SimulatedService::Alb]);

        let expected: Vec<String> = match serde_json::to_value(AlbLog::generate(
            &mut StdRng::seed_from_u64(0),
            chrono::Utc::now(),
        ))
        .unwrap()
        {
            Value::Object(doc) => doc.keys().cloned().collect(),
            other => panic!("unexpected ALB shape {:?}", other),
        };
        assert_eq!(expected.len(), 30);

        let logs = journal.logs();
        let spans = journal.spans();
        assert_eq!(logs.len(), 5);
        assert_eq!(spans.len(), 5);

        for (log, span) in logs.iter().zip(&spans) {
            let doc = match &log.body {
                LogBody::Document(Value::Object(doc)) => doc,
                other => panic!("unexpected body {:?}", other),
            };
            let keys: Vec<String> = doc.keys().cloned().collect();
            assert_eq!(keys, expected);

            let status = doc["elb_status_code"].as_u64().unwrap() as u16;
            assert!(STATUS_CODES.contains(&status));
            assert!(doc["request_processing_time"].is_f64());
            assert!(doc["received_bytes"].is_u64());
            assert!(doc["time"].is_string());

            assert_eq!(span.operation_name, "ALB.request");
            assert_eq!(span.status, SpanStatus::Ok);
            assert_eq!(span.attributes["http.status_code"], doc["elb_status_code"]);
            assert_eq!(log.trace_id.as_deref(), Some(span.trace_id.as_str()));
        }
    }

    #[test]
    fn test_failing_sink_is_logged_and_skipped() {
        let factory = MemorySinkFactory::failing();
        let journal = factory.journal();
        let config = DriverConfig {
            batch_size: 12,
            ..DriverConfig::default()
        };
        let mut driver = driver(factory, config, 5);

        assert_eq!(driver.run_batch(), BatchOutcome::Completed);
        let report = driver.report();
        assert_eq!(report.emitted, 0);
        assert_eq!(report.failed, 12);
        assert_eq!(journal.total_flushes(), 0);
        assert!(journal.spans().iter().all(|span| span.status == SpanStatus::Error));
        assert_eq!(driver.state(), DriverState::Running);
    }

    #[test]
    fn test_plain_styles_emit_without_spans() {
        let factory = MemorySinkFactory::new();
        let journal = factory.journal();
        let mut driver = EmissionDriver::new(
            RecordGenerator::new(StdRng::seed_from_u64(6)),
            WeightedChoice::only(LogStyle::Multiline),
            factory,
            DriverConfig::default(),
        );

        assert_ok!(driver.emit_one());
        assert_eq!(journal.created(), vec![SimulatedService::Multiline]);
        assert!(journal.spans().is_empty());
        assert!(journal.logs()[0].trace_id.is_none());
    }

    #[tokio::test]
    async fn test_cancel_stops_running_driver() {
        let factory = MemorySinkFactory::new();
        let journal = factory.journal();
        let config = DriverConfig {
            batch_size: 3,
            sleep_interval: Duration::from_millis(10),
            flush_every: 0,
            break_on_flush: true,
        };
        let mut driver = driver(factory, config, 7);

        let token = CancellationToken::new();
        let handle = tokio::spawn({
            let token = token.clone();
            async move {
                let report = driver.run(token).await;
                (report, driver.state())
            }
        });

        tokio::time::sleep(Duration::from_millis(60)).await;
        token.cancel();
        let (report, state) = handle.await.unwrap();

        assert_eq!(state, DriverState::Stopped);
        assert!(report.batches >= 1);
        assert_eq!(report.emitted, report.batches * 3);
        assert_eq!(journal.logs().len() as u64, report.emitted);

        let mut created = journal.created();
        let mut shut_down = journal.shutdowns();
        created.sort();
        shut_down.sort();
        assert_eq!(created, shut_down);
    }
}
