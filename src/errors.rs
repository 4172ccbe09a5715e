//! Error types for the telemetry generator

use std::fmt;

pub type Result<T> = std::result::Result<T, GeneratorError>;

#[derive(Debug)]
pub enum GeneratorError {
    /// IO operation failed
    Io(std::io::Error),

    /// JSON serialization failed
    Json(serde_json::Error),

    /// Configuration error
    Config(String),

    /// A record could not be composed
    Generation(String),

    /// Exporter construction, flush or shutdown failed
    Export(String),

    /// The driver task panicked or was aborted
    Task(String),
}

impl GeneratorError {
    /// Short stable name of the error kind, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            GeneratorError::Io(_) => "io",
            GeneratorError::Json(_) => "json",
            GeneratorError::Config(_) => "config",
            GeneratorError::Generation(_) => "generation",
            GeneratorError::Export(_) => "export",
            GeneratorError::Task(_) => "task",
        }
    }
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorError::Io(err) => write!(f, "IO error: {}", err),
            GeneratorError::Json(err) => write!(f, "JSON error: {}", err),
            GeneratorError::Config(msg) => write!(f, "Configuration error: {}", msg),
            GeneratorError::Generation(msg) => write!(f, "Generation error: {}", msg),
            GeneratorError::Export(msg) => write!(f, "Export error: {}", msg),
            GeneratorError::Task(msg) => write!(f, "Task error: {}", msg),
        }
    }
}

impl std::error::Error for GeneratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeneratorError::Io(err) => Some(err),
            GeneratorError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GeneratorError {
    fn from(err: std::io::Error) -> Self {
        GeneratorError::Io(err)
    }
}

impl From<serde_json::Error> for GeneratorError {
    fn from(err: serde_json::Error) -> Self {
        GeneratorError::Json(err)
    }
}

impl From<tokio::task::JoinError> for GeneratorError {
    fn from(err: tokio::task::JoinError) -> Self {
        GeneratorError::Task(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_and_kind() {
        let err = GeneratorError::Config("batch_size must be greater than 0".to_string());
        assert_eq!(err.kind(), "config");
        assert_eq!(
            err.to_string(),
            "Configuration error: batch_size must be greater than 0"
        );
    }

    #[test]
    fn test_json_error_keeps_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = GeneratorError::from(json_err);
        assert_eq!(err.kind(), "json");
        assert!(err.source().is_some());
    }
}
