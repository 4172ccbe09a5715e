//! Configuration management for the telemetry generator

use crate::choice::{WeightedChoice, parse_weights};
use crate::driver::DriverConfig;
use crate::errors::{GeneratorError, Result};
use crate::records::{LogStyle, SeverityMode, SimulatedService};
use clap::{ArgAction, Parser, ValueEnum};
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_OTEL_HOST: &str = "localhost";
pub const DEFAULT_OTEL_PORT: u16 = 4317;
pub const DEFAULT_BATCH_SIZE: usize = 30;
pub const DEFAULT_SLEEP_INTERVAL_SECS: f64 = 1.0;
pub const DEFAULT_FLUSH_EVERY: u64 = 10;
pub const DEFAULT_SPAN_EXPORT_DELAY_MS: u64 = 1000;
pub const DEFAULT_STYLE_WEIGHTS: &str =
    "structured=1,unstructured=1,multiline=1,mapping_exception=1";
pub const DEFAULT_SERVICE_WEIGHTS: &str = "ALB=1,ELB=1,NGINX=1,VPCFLOW=1";
pub const DEFAULT_SEVERITY: &str = "info";

/// Where generated telemetry goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Exporter {
    /// OTLP over gRPC to the collector
    Otlp,
    /// JSON lines on stdout
    Stdout,
}

#[derive(Debug, Clone, Parser, Serialize)]
#[command(author, version, about = "Synthetic log and trace generator", long_about = None)]
pub struct Config {
    /// Collector host
    #[arg(long, env = "OTEL_HOST", default_value = DEFAULT_OTEL_HOST)]
    pub otel_host: String,

    /// Collector gRPC port
    #[arg(long, env = "OTEL_PORT", default_value = "4317")]
    pub otel_port: u16,

    #[arg(long, env = "LOGGREMLIN_EXPORTER", value_enum, default_value = "otlp")]
    pub exporter: Exporter,

    /// Records per cycle
    #[arg(long, env = "BATCH_SIZE", default_value = "30")]
    pub batch_size: usize,

    /// Sleep between cycles, in seconds
    #[arg(long, env = "SLEEP_INTERVAL_SECONDS", default_value = "1.0")]
    pub sleep_interval_secs: f64,

    /// Flush every sink after this many emissions (0 disables)
    #[arg(long, env = "FLUSH_EVERY", default_value = "10")]
    pub flush_every: u64,

    /// Cut the cycle short after a flush
    #[arg(long, env = "BREAK_ON_FLUSH", default_value = "true", action = ArgAction::Set)]
    pub break_on_flush: bool,

    /// Schedule delay of the batch span processor
    #[arg(long, env = "SPAN_EXPORT_DELAY_MS", default_value = "1000")]
    pub span_export_delay_ms: u64,

    /// Seed for a reproducible record stream
    #[arg(long, env = "LOGGREMLIN_SEED")]
    pub seed: Option<u64>,

    /// Record style mix, e.g. `structured=3,multiline=1`
    #[arg(long, env = "STYLE_WEIGHTS", default_value = DEFAULT_STYLE_WEIGHTS)]
    pub style_weights: String,

    /// Service mix for structured and unstructured records
    #[arg(long, env = "SERVICE_WEIGHTS", default_value = DEFAULT_SERVICE_WEIGHTS)]
    pub service_weights: String,

    /// Fixed severity name, or `random`
    #[arg(long, env = "SEVERITY", default_value = DEFAULT_SEVERITY)]
    pub severity: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            otel_host: DEFAULT_OTEL_HOST.to_string(),
            otel_port: DEFAULT_OTEL_PORT,
            exporter: Exporter::Otlp,
            batch_size: DEFAULT_BATCH_SIZE,
            sleep_interval_secs: DEFAULT_SLEEP_INTERVAL_SECS,
            flush_every: DEFAULT_FLUSH_EVERY,
            break_on_flush: true,
            span_export_delay_ms: DEFAULT_SPAN_EXPORT_DELAY_MS,
            seed: None,
            style_weights: DEFAULT_STYLE_WEIGHTS.to_string(),
            service_weights: DEFAULT_SERVICE_WEIGHTS.to_string(),
            severity: DEFAULT_SEVERITY.to_string(),
        }
    }
}

impl Config {
    /// Collector endpoint for the gRPC exporters
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.otel_host, self.otel_port)
    }

    /// Inter-batch sleep; rejects negative, non-finite and out-of-range values.
    pub fn sleep_interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.sleep_interval_secs).map_err(|e| {
            GeneratorError::Config(format!(
                "invalid sleep interval {}: {}",
                self.sleep_interval_secs, e
            ))
        })
    }

    pub fn span_export_delay(&self) -> Duration {
        Duration::from_millis(self.span_export_delay_ms)
    }

    pub fn style_choice(&self) -> Result<WeightedChoice<LogStyle>> {
        parse_weights(&self.style_weights)
    }

    /// Only access-log services can be mixed; the other two are tied to
    /// their own record styles.
    pub fn service_choice(&self) -> Result<WeightedChoice<SimulatedService>> {
        let choice = parse_weights::<SimulatedService>(&self.service_weights)?;
        if let Some(service) = choice.options().find(|service| !service.is_access_log()) {
            return Err(GeneratorError::Config(format!(
                "{} cannot be part of the service mix",
                service
            )));
        }
        Ok(choice)
    }

    pub fn severity_mode(&self) -> Result<SeverityMode> {
        self.severity.parse().map_err(GeneratorError::Config)
    }

    pub fn driver_config(&self) -> Result<DriverConfig> {
        Ok(DriverConfig {
            batch_size: self.batch_size,
            sleep_interval: self.sleep_interval()?,
            flush_every: self.flush_every,
            break_on_flush: self.break_on_flush,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.otel_host.trim().is_empty() {
            return Err("otel_host cannot be empty".to_string());
        }

        if self.otel_port == 0 {
            return Err("otel_port must be greater than 0".to_string());
        }

        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }

        self.sleep_interval().map_err(|e| format!("sleep_interval_secs: {}", e))?;
        self.style_choice().map_err(|e| format!("style_weights: {}", e))?;
        self.service_choice().map_err(|e| format!("service_weights: {}", e))?;
        self.severity_mode().map_err(|e| format!("severity: {}", e))?;

        Ok(())
    }
}
