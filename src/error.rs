use thiserror::Error;

/// Errors surfaced by the forecasting pipeline.
///
/// Every variant is reported to the caller as-is; nothing in the pipeline
/// retries or substitutes a fallback forecast.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ForecastError {
    /// Model or scaler artifact missing, corrupt, or incompatible at load time.
    /// A later call may retry the load.
    #[error("{resource} unavailable: {reason}")]
    ResourceUnavailable { resource: String, reason: String },

    #[error("insufficient history: need at least {required} hourly records, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    /// The model raised or returned output of the wrong shape or with NaN values.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl ForecastError {
    pub fn resource_unavailable(resource: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ResourceUnavailable {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable identifier for the error kind, used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ResourceUnavailable { .. } => "ResourceUnavailable",
            Self::InsufficientHistory { .. } => "InsufficientHistory",
            Self::InferenceFailed(_) => "InferenceFailed",
            Self::MalformedInput(_) => "MalformedInput",
        }
    }
}

impl From<validator::ValidationErrors> for ForecastError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ForecastError::MalformedInput(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ForecastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ForecastError::resource_unavailable("model", "missing").kind(),
            "ResourceUnavailable"
        );
        assert_eq!(
            ForecastError::InsufficientHistory { required: 48, actual: 3 }.kind(),
            "InsufficientHistory"
        );
        assert_eq!(
            ForecastError::InferenceFailed("nan".to_string()).kind(),
            "InferenceFailed"
        );
        assert_eq!(
            ForecastError::MalformedInput("x".to_string()).kind(),
            "MalformedInput"
        );
    }

    #[test]
    fn test_error_display() {
        let error = ForecastError::InsufficientHistory { required: 48, actual: 47 };
        assert_eq!(
            error.to_string(),
            "insufficient history: need at least 48 hourly records, got 47"
        );

        let error = ForecastError::resource_unavailable("feature scaler", "file not found");
        assert_eq!(error.to_string(), "feature scaler unavailable: file not found");
    }
}
