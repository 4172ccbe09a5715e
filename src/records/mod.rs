//! Record builders for the simulated services.
//!
//! A [`RecordGenerator`] owns the random source and composes field generators
//! into one of four record styles. Every generated record knows which
//! [`SimulatedService`] it belongs to so the caller can route it to that
//! service's sink.

pub mod mapping;
pub mod multiline;
pub mod structured;
pub mod unstructured;

use crate::choice::WeightedChoice;
use crate::errors::{GeneratorError, Result};
use crate::fields;
use crate::telemetry::{LogBody, LogEntry, LogLevel};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

pub use mapping::MAPPING_TEMPLATE_COUNT;
pub use multiline::MultilineTemplate;
pub use structured::{AlbLog, Direction, ElbLog, NginxLog, StructuredRecord, VpcFlowLog};

/// Service identity a record is attributed to; doubles as the OTel `service.name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SimulatedService {
    #[serde(rename = "ALB")]
    Alb,
    #[serde(rename = "ELB")]
    Elb,
    #[serde(rename = "NGINX")]
    Nginx,
    #[serde(rename = "VPCFLOW")]
    VpcFlow,
    #[serde(rename = "multiline")]
    Multiline,
    #[serde(rename = "mapping_exception")]
    MappingException,
}

impl SimulatedService {
    /// Services that produce access/flow logs in both structured and unstructured form.
    pub const ACCESS_LOG: [SimulatedService; 4] = [
        SimulatedService::Alb,
        SimulatedService::Elb,
        SimulatedService::Nginx,
        SimulatedService::VpcFlow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SimulatedService::Alb => "ALB",
            SimulatedService::Elb => "ELB",
            SimulatedService::Nginx => "NGINX",
            SimulatedService::VpcFlow => "VPCFLOW",
            SimulatedService::Multiline => "multiline",
            SimulatedService::MappingException => "mapping_exception",
        }
    }

    pub fn is_access_log(&self) -> bool {
        Self::ACCESS_LOG.contains(self)
    }
}

impl fmt::Display for SimulatedService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimulatedService {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ALB" | "alb" => Ok(SimulatedService::Alb),
            "ELB" | "elb" => Ok(SimulatedService::Elb),
            "NGINX" | "nginx" => Ok(SimulatedService::Nginx),
            "VPCFLOW" | "vpcflow" => Ok(SimulatedService::VpcFlow),
            "multiline" => Ok(SimulatedService::Multiline),
            "mapping_exception" => Ok(SimulatedService::MappingException),
            other => Err(format!("unknown service '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStyle {
    Structured,
    Unstructured,
    Multiline,
    MappingException,
}

impl LogStyle {
    pub const ALL: [LogStyle; 4] = [
        LogStyle::Structured,
        LogStyle::Unstructured,
        LogStyle::Multiline,
        LogStyle::MappingException,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogStyle::Structured => "structured",
            LogStyle::Unstructured => "unstructured",
            LogStyle::Multiline => "multiline",
            LogStyle::MappingException => "mapping_exception",
        }
    }
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "structured" => Ok(LogStyle::Structured),
            "unstructured" => Ok(LogStyle::Unstructured),
            "multiline" => Ok(LogStyle::Multiline),
            "mapping_exception" => Ok(LogStyle::MappingException),
            other => Err(format!("unknown log style '{}'", other)),
        }
    }
}

/// How the severity of an emitted record is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityMode {
    Fixed(LogLevel),
    /// Draw from the log-level field generator per record
    Random,
}

impl Default for SeverityMode {
    fn default() -> Self {
        SeverityMode::Fixed(LogLevel::Info)
    }
}

impl FromStr for SeverityMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("random") {
            return Ok(SeverityMode::Random);
        }
        LogLevel::parse(s)
            .map(SeverityMode::Fixed)
            .ok_or_else(|| format!("unknown severity '{}'", s))
    }
}

/// One generated log record in one of the four shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    Structured(StructuredRecord),
    Unstructured(String),
    Multiline(Vec<String>),
    /// Document whose field types deliberately drift between templates
    MappingException(Value),
}

impl LogRecord {
    pub fn style(&self) -> LogStyle {
        match self {
            LogRecord::Structured(_) => LogStyle::Structured,
            LogRecord::Unstructured(_) => LogStyle::Unstructured,
            LogRecord::Multiline(_) => LogStyle::Multiline,
            LogRecord::MappingException(_) => LogStyle::MappingException,
        }
    }
}

/// Span to open around the emission of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRequest {
    pub name: String,
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedRecord {
    pub service: SimulatedService,
    pub record: LogRecord,
}

impl GeneratedRecord {
    pub fn style(&self) -> LogStyle {
        self.record.style()
    }

    /// Convert into the entry handed to the service's sink.
    pub fn to_log_entry(&self, level: LogLevel) -> Result<LogEntry> {
        let service = self.service.as_str();
        let entry = match &self.record {
            LogRecord::Structured(record) => {
                let document = record.to_document()?;
                LogEntry::new(level, service, LogBody::Document(Value::Object(document.clone())))
                    .with_attributes(document)
            }
            LogRecord::Unstructured(line) => {
                LogEntry::new(level, service, LogBody::Text(line.clone()))
            }
            LogRecord::Multiline(lines) => {
                LogEntry::new(level, service, LogBody::Text(lines.join("\n")))
            }
            LogRecord::MappingException(document) => {
                let attributes = document.as_object().cloned().ok_or_else(|| {
                    GeneratorError::Generation("mapping exception is not a document".to_string())
                })?;
                LogEntry::new(level, service, LogBody::Document(document.clone()))
                    .with_attributes(attributes)
            }
        };
        Ok(entry)
    }

    /// Structured and unstructured records are emitted inside a span; the
    /// other styles are plain logs.
    pub fn span_request(&self) -> Option<SpanRequest> {
        match &self.record {
            LogRecord::Structured(record) => {
                let (method, status, url) = record.http_attributes();
                let mut attributes = Map::new();
                attributes.insert("http.method".to_string(), json!(method));
                attributes.insert("http.status_code".to_string(), json!(status));
                attributes.insert("http.url".to_string(), json!(url));
                Some(SpanRequest {
                    name: format!("{}.request", self.service),
                    attributes,
                })
            }
            LogRecord::Unstructured(_) => {
                let mut attributes = Map::new();
                attributes.insert("log.type".to_string(), json!("unstructured"));
                Some(SpanRequest {
                    name: format!("{}.operation", self.service),
                    attributes,
                })
            }
            LogRecord::Multiline(_) | LogRecord::MappingException(_) => None,
        }
    }
}

/// Wall clock used to stamp generated records.
pub type Clock = fn() -> DateTime<Utc>;

/// Owns the random source and composes field generators into records.
pub struct RecordGenerator<R> {
    rng: R,
    clock: Clock,
    services: WeightedChoice<SimulatedService>,
    severity: SeverityMode,
}

impl<R: Rng> RecordGenerator<R> {
    /// Uniform service mix, fixed INFO severity, wall-clock time.
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            clock: Utc::now,
            services: WeightedChoice::uniform(&SimulatedService::ACCESS_LOG)
                .unwrap_or_else(|_| WeightedChoice::only(SimulatedService::Alb)),
            severity: SeverityMode::default(),
        }
    }

    pub fn with_services(mut self, services: WeightedChoice<SimulatedService>) -> Self {
        self.services = services;
        self
    }

    pub fn with_severity(mut self, severity: SeverityMode) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Build one record of the requested style, picking the service from the
    /// configured mix where the style allows it.
    pub fn generate(&mut self, style: LogStyle) -> Result<GeneratedRecord> {
        match style {
            LogStyle::Structured => {
                let service = self.services.pick(&mut self.rng);
                self.structured(service)
            }
            LogStyle::Unstructured => {
                let service = self.services.pick(&mut self.rng);
                self.unstructured(service)
            }
            LogStyle::Multiline => Ok(self.multiline()),
            LogStyle::MappingException => Ok(self.mapping_exception()),
        }
    }

    pub fn structured(&mut self, service: SimulatedService) -> Result<GeneratedRecord> {
        let now = (self.clock)();
        let record = StructuredRecord::generate(service, &mut self.rng, now)?;
        Ok(GeneratedRecord {
            service,
            record: LogRecord::Structured(record),
        })
    }

    pub fn unstructured(&mut self, service: SimulatedService) -> Result<GeneratedRecord> {
        let now = (self.clock)();
        let line = unstructured::generate(service, &mut self.rng, now)?;
        Ok(GeneratedRecord {
            service,
            record: LogRecord::Unstructured(line),
        })
    }

    pub fn multiline(&mut self) -> GeneratedRecord {
        let now = (self.clock)();
        GeneratedRecord {
            service: SimulatedService::Multiline,
            record: LogRecord::Multiline(multiline::generate(&mut self.rng, now)),
        }
    }

    pub fn mapping_exception(&mut self) -> GeneratedRecord {
        let now = (self.clock)();
        GeneratedRecord {
            service: SimulatedService::MappingException,
            record: LogRecord::MappingException(mapping::generate(&mut self.rng, now)),
        }
    }

    /// Severity for the next emitted record.
    pub fn severity(&mut self) -> LogLevel {
        match self.severity {
            SeverityMode::Fixed(level) => level,
            SeverityMode::Random => fields::log_level(&mut self.rng),
        }
    }
}
