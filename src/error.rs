use thiserror::Error;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Invalid crew: {0}")]
    InvalidCrew(String),

    #[error("Invalid flow: {0}")]
    InvalidFlow(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("Flow method failed: {0}")]
    FlowMethodFailed(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

impl OrchestrationError {
    /// Whether a model call that failed with this error is worth repeating
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrchestrationError::NetworkError(_))
    }
}

// Local file and console output failures
impl From<std::io::Error> for OrchestrationError {
    fn from(err: std::io::Error) -> Self {
        OrchestrationError::RuntimeError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_errors_are_retryable() {
        assert!(OrchestrationError::NetworkError("reset".to_string()).is_retryable());
        assert!(!OrchestrationError::LlmError("bad request".to_string()).is_retryable());
        assert!(!OrchestrationError::MissingInput("topic".to_string()).is_retryable());
    }

    #[test]
    fn test_boxed_error_downcasts() {
        let boxed: Box<dyn std::error::Error + Send + Sync> =
            OrchestrationError::InvalidCrew("no tasks".to_string()).into();
        assert!(matches!(
            boxed.downcast_ref::<OrchestrationError>(),
            Some(OrchestrationError::InvalidCrew(_))
        ));
        assert_eq!(boxed.to_string(), "Invalid crew: no tasks");
    }

    #[test]
    fn test_io_error_converts_to_runtime_error() {
        let io = std::io::Error::new(std::io::ErrorKind::AlreadyExists, "File exists");
        let boxed: Box<dyn std::error::Error + Send + Sync> = OrchestrationError::from(io).into();

        match boxed.downcast_ref::<OrchestrationError>() {
            Some(OrchestrationError::RuntimeError(msg)) => assert_eq!(msg, "File exists"),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(boxed.to_string(), "Runtime error: File exists");
    }
}
