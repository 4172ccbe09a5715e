//! Synthetic telemetry generator
//!
//! Fabricates access, flow, multi-line and type-drifting log records for a set
//! of simulated infrastructure services, wraps request-shaped records in
//! spans, and delivers them per service to an OpenTelemetry collector or to
//! stdout.

pub mod choice;
pub mod config;
pub mod driver;
pub mod errors;
pub mod fields;
pub mod records;
pub mod sink;
pub mod telemetry;

pub use choice::WeightedChoice;
pub use config::Config;
pub use driver::{DriverConfig, DriverReport, DriverState, EmissionDriver};
pub use errors::{GeneratorError, Result};
pub use records::{GeneratedRecord, LogRecord, LogStyle, RecordGenerator, SimulatedService};
pub use sink::{SinkFactory, SinkRegistry, TelemetrySink};
pub use telemetry::{LogEntry, LogLevel, TraceSpan};
