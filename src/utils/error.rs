use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Backend request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Document decoding error: {0}")]
    DecodeError(#[from] base64::DecodeError),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Shipment {code} cannot move from {from} to {to}")]
    InvalidTransition {
        code: String,
        from: String,
        to: String,
    },

    #[error("Backend returned {status}: {body}")]
    BackendError { status: u16, body: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    Storage,
    Workflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::ConfigError { .. }
            | AppError::InvalidConfigValueError { .. }
            | AppError::MissingConfigError { .. } => ErrorCategory::Configuration,
            AppError::HttpError(_) | AppError::BackendError { .. } => ErrorCategory::Network,
            AppError::CsvError(_)
            | AppError::SerializationError(_)
            | AppError::DecodeError(_)
            | AppError::TomlError(_)
            | AppError::ValidationError { .. } => ErrorCategory::Data,
            AppError::ZipError(_) | AppError::IoError(_) => ErrorCategory::Storage,
            AppError::NotFound { .. } | AppError::InvalidTransition { .. } => {
                ErrorCategory::Workflow
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::NotFound { .. } | AppError::InvalidTransition { .. } => ErrorSeverity::Low,
            AppError::HttpError(_) | AppError::BackendError { .. } => ErrorSeverity::Medium,
            AppError::CsvError(_)
            | AppError::SerializationError(_)
            | AppError::DecodeError(_)
            | AppError::TomlError(_)
            | AppError::ValidationError { .. }
            | AppError::ConfigError { .. }
            | AppError::InvalidConfigValueError { .. }
            | AppError::MissingConfigError { .. } => ErrorSeverity::High,
            AppError::ZipError(_) | AppError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::HttpError(_) | AppError::BackendError { .. } => {
                format!("Could not reach the data backend: {}", self)
            }
            AppError::IoError(e) => format!("File access failed: {}", e),
            AppError::NotFound { entity, id } => format!("No {} with id '{}'", entity, id),
            AppError::InvalidTransition { code, from, to } => format!(
                "Shipment {} is '{}' and cannot go back to '{}'",
                code, from, to
            ),
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the configuration file and command-line flags",
            ErrorCategory::Network => "Verify the backend endpoint, API key and network access",
            ErrorCategory::Data => "Inspect the input data for malformed or missing values",
            ErrorCategory::Storage => "Check that the output directory exists and is writable",
            ErrorCategory::Workflow => "Review the shipment code and its current status",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_is_low_severity_workflow_error() {
        let err = AppError::InvalidTransition {
            code: "EMB-1".to_string(),
            from: "delivered".to_string(),
            to: "in_transit".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Workflow);
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert!(err.user_friendly_message().contains("EMB-1"));
    }

    #[test]
    fn test_backend_error_maps_to_network() {
        let err = AppError::BackendError {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.to_string().contains("503"));
    }
}
