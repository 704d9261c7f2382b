use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::project::ProjectStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("project {from:?} has no successor status")]
    TerminalStatus { from: ProjectStatus },
    #[error("unknown {kind} `{value}`")]
    UnknownVariant { kind: &'static str, value: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Error taxonomy shared by the tool layer, the HTTP layer and the CLI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    ApiFailure,
    NetworkError,
    AuthError,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::ApiFailure => "API_FAILURE",
            Self::NetworkError => "NETWORK_ERROR",
            Self::AuthError => "AUTH_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Domain(_) | Self::Validation(_) => ErrorCode::ValidationError,
            Self::Integration(_) => ErrorCode::ApiFailure,
            Self::Network(_) => ErrorCode::NetworkError,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Persistence(_) | Self::Configuration(_) => ErrorCode::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::project::ProjectStatus;
    use crate::errors::{ApplicationError, DomainError, ErrorCode, FieldError};

    #[test]
    fn domain_errors_map_to_validation_code() {
        let error = ApplicationError::from(DomainError::TerminalStatus {
            from: ProjectStatus::Active,
        });
        assert_eq!(error.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn network_and_integration_errors_are_distinguished() {
        assert_eq!(
            ApplicationError::Network("timed out".to_owned()).code(),
            ErrorCode::NetworkError
        );
        assert_eq!(
            ApplicationError::Integration("bad json".to_owned()).code(),
            ErrorCode::ApiFailure
        );
    }

    #[test]
    fn validation_error_counts_fields() {
        let error = ApplicationError::Validation(vec![
            FieldError::new("initial_concept", "must not be empty"),
            FieldError::new("word_limit", "must be between 1 and 5000"),
        ]);
        assert_eq!(error.to_string(), "validation failed on 2 field(s)");
    }

    #[test]
    fn error_codes_serialize_in_screaming_snake_case() {
        let encoded = serde_json::to_string(&ErrorCode::ApiFailure).expect("serialize");
        assert_eq!(encoded, "\"API_FAILURE\"");
        assert_eq!(ErrorCode::AuthError.as_str(), "AUTH_ERROR");
    }
}
